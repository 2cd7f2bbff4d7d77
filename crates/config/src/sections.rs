use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use betas_extract::{APPLE_TV_FAMILY, APPLE_TV_MIN_MAJOR_VERSION, DEFAULT_MIN_MAJOR_VERSION, PageFilter};
use betas_signing::{DEFAULT_DEVICE_API_URL, DEFAULT_EXECUTABLE, SigningOptions};
use betas_wiki::{ClientOptions, DEFAULT_API_URL, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};

/// How to talk to the wiki.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// MediaWiki `api.php` endpoint.
    pub api_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}
impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}
impl WikiConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            api_url: self.api_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Which pages to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Search query every beta firmware page title starts with.
    pub search_prefix: String,
    /// Device family groups; each group is scraped by its own task and a page
    /// belongs to a group when its title contains any of the group's names.
    pub families: Vec<Vec<String>>,
    pub min_major_version: u32,
    /// Per-family minimum major versions, matched against page titles.
    pub min_major_version_overrides: BTreeMap<String, u32>,
    /// Family groups scraped at the same time.
    pub concurrency: usize,
}
impl Default for ScrapeConfig {
    fn default() -> Self {
        let families: [&[&str]; 4] =
            [&["Apple TV"], &["iPod touch"], &["iPhone"], &["iPad", "iPad Air", "iPad Pro", "iPad Mini"]];
        Self {
            search_prefix: "Beta Firmware/".to_string(),
            families: families.iter().map(|group| group.iter().map(|f| f.to_string()).collect()).collect(),
            min_major_version: DEFAULT_MIN_MAJOR_VERSION,
            min_major_version_overrides: BTreeMap::from([(APPLE_TV_FAMILY.to_string(), APPLE_TV_MIN_MAJOR_VERSION)]),
            concurrency: 4,
        }
    }
}
impl ScrapeConfig {
    /// The page filter for one family group.
    pub fn page_filter(&self, group: &[String]) -> PageFilter {
        PageFilter::new(group.iter().cloned())
            .with_min_major_version(self.min_major_version)
            .with_overrides(self.min_major_version_overrides.clone())
    }
}

/// Whether and how to check signing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub enabled: bool,
    /// Device lookup endpoint; the device identifier is appended.
    pub device_api_url: String,
    /// tsschecker executable name or path.
    pub tsschecker: String,
    /// Devices checked at the same time.
    pub concurrency: usize,
    pub timeout_secs: u64,
}
impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_api_url: DEFAULT_DEVICE_API_URL.to_string(),
            tsschecker: DEFAULT_EXECUTABLE.to_string(),
            concurrency: 8,
            timeout_secs: 60,
        }
    }
}
impl SigningConfig {
    pub fn options(&self, user_agent: &str) -> SigningOptions {
        SigningOptions {
            device_api_url: self.device_api_url.clone(),
            user_agent: user_agent.to_string(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Where the API gets written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Replaced wholesale on every run.
    pub directory: PathBuf,
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("betas") }
    }
}
