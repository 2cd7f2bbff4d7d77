pub mod error;
mod sections;

use std::path::{Path, PathBuf};

use betas_wiki::Url;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ErrorKind, Result};
pub use crate::sections::{OutputConfig, ScrapeConfig, SigningConfig, WikiConfig};

/// Environment variables with this prefix override config values; nested keys
/// are separated by `__`, e.g. `BETAS_SCRAPE__CONCURRENCY=2`.
pub const ENV_PREFIX: &str = "BETAS_";
/// Config files are named `betas.toml`, `betas.yaml`, or `betas.json`.
pub const FILE_STEM: &str = "betas";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub wiki: WikiConfig,
    pub scrape: ScrapeConfig,
    pub signing: SigningConfig,
    pub output: OutputConfig,
}
impl Config {
    /// The platform config directory, e.g. `~/.config/betas` on Linux.
    pub fn directory() -> Option<PathBuf> {
        ProjectDirs::from("", "", FILE_STEM).map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Layers every config source: built-in defaults, then the config file,
    /// then environment variables.
    ///
    /// With an explicit `file`, only that file is read and it must exist.
    /// Otherwise any `betas.{toml,yaml,yml,json}` in the platform config
    /// directory is merged, in that order.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(file) => {
                if !file.is_file() {
                    exn::bail!(ErrorKind::NotFound(file.display().to_string()));
                }
                let file = std::path::absolute(file).or_raise(|| ErrorKind::NotFound(file.display().to_string()))?;
                figment = merge_file(figment, &file)?;
            },
            None => {
                if let Some(directory) = Self::directory() {
                    for extension in ["toml", "yaml", "yml", "json"] {
                        figment = merge_file(figment, &directory.join(format!("{FILE_STEM}.{extension}")))?;
                    }
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extracts and validates a config from already-layered sources.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    #[instrument]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scrape.families.is_empty() {
            exn::bail!(ErrorKind::Invalid("at least one device family group is required".to_string()));
        }
        let incomplete = |group: &&Vec<String>| group.is_empty() || group.iter().any(String::is_empty);
        if let Some(group) = self.scrape.families.iter().find(incomplete) {
            exn::bail!(ErrorKind::Invalid(format!("device family group {group:?} must list non-empty names")));
        }
        if self.scrape.search_prefix.is_empty() {
            exn::bail!(ErrorKind::Invalid("scrape.search_prefix must not be empty".to_string()));
        }
        if self.scrape.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("scrape.concurrency must be at least 1".to_string()));
        }
        if self.signing.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("signing.concurrency must be at least 1".to_string()));
        }
        let urls = [("wiki.api_url", &self.wiki.api_url), ("signing.device_api_url", &self.signing.device_api_url)];
        for (key, url) in urls {
            Url::parse(url).or_raise(|| ErrorKind::Invalid(format!("{key} is not a URL: {url}")))?;
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|extension| extension.to_str()).unwrap_or_default();
    Ok(match extension {
        "toml" => figment.merge(Toml::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        "json" => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::Invalid(format!("unsupported config format: {}", path.display()))),
    })
}
