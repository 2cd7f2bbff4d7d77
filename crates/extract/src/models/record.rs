use crate::error::{ErrorKind, Result};

/// One downloadable beta firmware build for one device.
///
/// Every field except [`signed`](Self::signed) is required; a record is
/// either complete or it doesn't exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareRecord {
    /// Human-readable version label, e.g. `14.5 beta 1`
    pub version: String,
    /// Vendor build identifier, e.g. `18E5154a`
    pub buildid: String,
    /// Direct IPSW download URL
    pub url: String,
    /// IPSW file size in bytes
    pub size: u64,
    /// Whether the build is currently being signed (unknown until checked)
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub signed: Option<bool>,
}
impl FirmwareRecord {
    /// Builds a record, rejecting it if any required field is empty.
    pub fn new(
        version: impl Into<String>,
        buildid: impl Into<String>,
        url: impl Into<String>,
        size: u64,
    ) -> Result<Self> {
        let record = Self {
            version: version.into(),
            buildid: buildid.into(),
            url: url.into(),
            size,
            signed: None,
        };
        if record.version.is_empty() {
            exn::bail!(ErrorKind::MissingField("version"));
        }
        if record.buildid.is_empty() {
            exn::bail!(ErrorKind::MissingField("buildid"));
        }
        if record.url.is_empty() {
            exn::bail!(ErrorKind::MissingField("url"));
        }
        if record.size == 0 {
            exn::bail!(ErrorKind::MissingField("size"));
        }
        Ok(record)
    }

    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = Some(signed);
        self
    }
}
