mod cli;
mod error;
mod runner;

use std::process::ExitCode;
use std::sync::Arc;

use betas_config::Config;
use betas_signing::{SigningChecker, Tsschecker};
use betas_wiki::{MediaWikiClient, SourceHandle};
use clap::Parser;
use exn::ResultExt;
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::error::{ErrorKind, Result};
use crate::runner::Runner;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

/// Logs go to stderr. `RUST_LOG` is honoured unless `-v` was given.
fn init_tracing(args: &Args) {
    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        _ => EnvFilter::new(args.log_level()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(args: Args) -> Result<()> {
    if cfg!(windows) {
        exn::bail!(ErrorKind::UnsupportedPlatform("Windows"));
    }

    let mut config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    args.apply(&mut config);
    config.validate().or_raise(|| ErrorKind::Config)?;
    tracing::debug!(?config, "Configuration loaded");

    let source: SourceHandle =
        Arc::new(MediaWikiClient::new(config.wiki.client_options()).or_raise(|| ErrorKind::Scrape)?);
    let mut runner = Runner::new(source, config.scrape.clone());
    if config.signing.enabled {
        let tsschecker = Tsschecker::discover(&config.signing.tsschecker).or_raise(|| ErrorKind::Signing)?;
        tracing::debug!(path = %tsschecker.path().display(), "Found tsschecker");
        let options = config.signing.options(&config.wiki.user_agent);
        let checker = SigningChecker::new(&options, Arc::new(tsschecker)).or_raise(|| ErrorKind::Signing)?;
        runner = runner.with_checker(checker, config.signing.concurrency);
    }

    runner.run(&config.output.directory).await?;
    Ok(())
}
