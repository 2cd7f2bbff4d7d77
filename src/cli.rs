//! Command-line arguments.

use std::path::PathBuf;

use betas_config::Config;
use clap::Parser;

#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "betas", version, about = "Scrape beta firmware from The iPhone Wiki into a per-device JSON API")]
pub struct Args {
    /// Config file (TOML, YAML or JSON); defaults to betas.* in the platform config directory
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory the API is written to; replaced on every run
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Don't check signing status, and don't require tsschecker
    #[arg(long)]
    pub skip_signing: bool,

    /// Only scrape page titles containing this family name; repeat for one group per family
    #[arg(short, long = "family", value_name = "NAME")]
    pub families: Vec<String>,

    /// More logging; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
impl Args {
    /// Command-line flags win over every other config source.
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output.directory = output.clone();
        }
        if self.skip_signing {
            config.signing.enabled = false;
        }
        if !self.families.is_empty() {
            config.scrape.families = self.families.iter().map(|family| vec![family.clone()]).collect();
        }
    }

    /// Log filter directive used when `RUST_LOG` isn't set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
