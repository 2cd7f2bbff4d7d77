use std::sync::Arc;
use std::time::Duration;

use betas_extract::models::FirmwareRecord;
use exn::ResultExt;
use reqwest::Client;
use tracing::instrument;

use crate::board::{DEFAULT_DEVICE_API_URL, DeviceApi};
use crate::error::{ErrorKind, Result};
use crate::manifest::fetch_manifest;
use crate::tsschecker::SigningOracle;
use crate::remote::{HttpRangeSource, RangeSource};

#[derive(Debug, Clone)]
pub struct SigningOptions {
    pub device_api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}
impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            device_api_url: DEFAULT_DEVICE_API_URL.to_string(),
            user_agent: concat!("betas/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Fills in the signing status of a device's firmware records.
#[derive(Clone)]
pub struct SigningChecker {
    http: Client,
    devices: DeviceApi,
    oracle: Arc<dyn SigningOracle>,
}
impl SigningChecker {
    pub fn new(options: &SigningOptions, oracle: Arc<dyn SigningOracle>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(&options.user_agent)
            .timeout(options.timeout)
            .build()
            .or_raise(|| ErrorKind::Network("failed to build HTTP client".to_string()))?;
        let devices = DeviceApi::new(http.clone(), &options.device_api_url)?;
        Ok(Self { http, devices, oracle })
    }

    /// Checks every record of one device.
    ///
    /// Fails only when the device itself can't be checked (no board config,
    /// or the oracle is broken); see [`check_records`] for what happens to
    /// individual records.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn check(&self, device: &str, records: Vec<FirmwareRecord>) -> Result<Vec<FirmwareRecord>> {
        let board = self.devices.board(device).await?;
        check_records(device, &board, records, self.oracle.as_ref(), |url| {
            HttpRangeSource::new(self.http.clone(), url)
        })
        .await
    }
}

/// Sets `signed` on each record whose build manifest can be fetched, and drops
/// the records whose download doesn't resolve.
///
/// `open` turns a record's download URL into something the IPSW can be read
/// from. Manifests are written to a temporary directory that lives as long as
/// the call.
pub async fn check_records<S, F>(
    device: &str,
    board: &str,
    records: Vec<FirmwareRecord>,
    oracle: &dyn SigningOracle,
    mut open: F,
) -> Result<Vec<FirmwareRecord>>
where
    S: RangeSource + Clone + 'static,
    F: FnMut(&str) -> Result<S>,
{
    let workdir = tempfile::tempdir().or_raise(|| ErrorKind::Io)?;
    let mut checked = Vec::with_capacity(records.len());
    for record in records {
        let manifest = match open(&record.url) {
            Ok(source) => fetch_manifest(source, workdir.path()).await,
            Err(err) => Err(err),
        };
        let manifest = match manifest {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(
                    device,
                    buildid = %record.buildid,
                    error = %err,
                    "Firmware download does not resolve; dropping record"
                );
                continue;
            },
        };
        let signed = oracle.is_signed(device, board, &manifest).await?;
        tracing::debug!(device, buildid = %record.buildid, signed, "Signing status checked");
        checked.push(record.with_signed(signed));
    }
    Ok(checked)
}
