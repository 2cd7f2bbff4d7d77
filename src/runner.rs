//! Scrape, sign, write.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use betas_config::ScrapeConfig;
use betas_extract::PageFilter;
use betas_extract::models::DeviceTable;
use betas_signing::SigningChecker;
use betas_wiki::SourceHandle;
use exn::ResultExt;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

pub struct Runner {
    source: SourceHandle,
    scrape: ScrapeConfig,
    signing: Option<(SigningChecker, usize)>,
}
impl Runner {
    pub fn new(source: SourceHandle, scrape: ScrapeConfig) -> Self {
        Self { source, scrape, signing: None }
    }

    /// Check signing status with `checker`, `concurrency` devices at a time.
    pub fn with_checker(mut self, checker: SigningChecker, concurrency: usize) -> Self {
        self.signing = Some((checker, concurrency));
        self
    }

    /// Runs every phase and writes the result to `output`, returning the
    /// number of device files written.
    pub async fn run(&self, output: &Path) -> Result<usize> {
        let started = Instant::now();

        tracing::info!(groups = self.scrape.families.len(), "[1] Scraping the wiki");
        let table = self.scrape().await?;
        tracing::info!(devices = table.len(), records = table.record_count(), "Scrape finished");

        let table = match &self.signing {
            Some((checker, concurrency)) => {
                tracing::info!(devices = table.len(), "[2] Checking signing status, this will take a while");
                sign(checker, *concurrency, table).await?
            },
            None => {
                tracing::info!("[2] Signing checks disabled");
                table
            },
        };

        tracing::info!(directory = %output.display(), "[3] Writing out the API");
        let written = betas_storage::write_table(output, &table)
            .await
            .or_raise(|| ErrorKind::Write(output.display().to_string()))?;
        tracing::info!(devices = written, elapsed_secs = started.elapsed().as_secs(), "Done");
        Ok(written)
    }

    /// Builds the device table from every family group, one task per group.
    ///
    /// A group whose search fails contributes nothing; the scrape only fails
    /// when every group does.
    pub async fn scrape(&self) -> Result<DeviceTable> {
        let table = Arc::new(Mutex::new(DeviceTable::new()));
        let permits = Arc::new(Semaphore::new(self.scrape.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for group in &self.scrape.families {
            let source = Arc::clone(&self.source);
            let table = Arc::clone(&table);
            let permits = Arc::clone(&permits);
            let filter = self.scrape.page_filter(group);
            let prefix = self.scrape.search_prefix.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                scrape_group(source, &prefix, &filter, &table).await
            });
        }

        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined.or_raise(|| ErrorKind::Task)?.is_err() {
                failed += 1;
            }
        }
        if failed > 0 && failed == self.scrape.families.len() {
            exn::bail!(ErrorKind::Scrape);
        }
        Ok(std::mem::take(&mut *table.lock().await))
    }
}

/// Searches, filters, fetches and extracts the pages of one family group.
/// Returns the number of pages read.
#[instrument(skip_all, fields(families = ?filter.families()))]
async fn scrape_group(
    source: SourceHandle,
    prefix: &str,
    filter: &PageFilter,
    table: &Mutex<DeviceTable>,
) -> betas_wiki::error::Result<usize> {
    let hits = source.search(prefix).await.inspect_err(|err| {
        tracing::warn!(error = ?err, "Search failed, skipping family group");
    })?;

    let mut pages = 0;
    for hit in hits.iter().filter(|hit| filter.accepts(&hit.title)) {
        let wikitext = match source.fetch(&hit.title).await {
            Ok(wikitext) => wikitext,
            Err(err) => {
                tracing::warn!(title = %hit.title, error = ?err, "Fetch failed, skipping page");
                continue;
            },
        };
        let page = betas_extract::extract(&wikitext);
        let found = page.record_count();
        let added = table.lock().await.merge(page);
        tracing::debug!(title = %hit.title, found, added, "Page extracted");
        pages += 1;
    }
    Ok(pages)
}

/// Fills in signing status, one task per device.
///
/// A device that can't be checked keeps its records without `signed`.
async fn sign(checker: &SigningChecker, concurrency: usize, mut table: DeviceTable) -> Result<DeviceTable> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for (device, records) in &table {
        let checker = checker.clone();
        let permits = Arc::clone(&permits);
        let device = device.clone();
        let records = records.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let checked = checker.check(&device, records).await;
            (device, checked)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (device, checked) = joined.or_raise(|| ErrorKind::Task)?;
        match checked {
            Ok(records) => table.replace(device, records),
            Err(err) => {
                tracing::warn!(device = %device, error = ?err, "Signing check failed, leaving device unchecked");
            },
        }
    }
    Ok(table)
}
