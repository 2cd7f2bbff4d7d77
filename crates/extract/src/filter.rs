//! Which wiki pages are worth fetching at all.

use std::collections::BTreeMap;

use crate::consts;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};

/// Decides from a search result's title alone whether a page should be
/// fetched and extracted.
///
/// Beta firmware pages are titled like `Beta Firmware/iPhone/14.x`. A page
/// is accepted when the title is for a whole major release, names one of
/// the requested device families, and its major version is at least the
/// minimum for that family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFilter {
    families: Vec<String>,
    min_major_version: u32,
    overrides: BTreeMap<String, u32>,
}
impl PageFilter {
    /// A filter for `families` with the default minimums: 9, except Apple TV at 7.
    pub fn new(families: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            families: families.into_iter().map(Into::into).collect(),
            min_major_version: consts::DEFAULT_MIN_MAJOR_VERSION,
            overrides: BTreeMap::from([(consts::APPLE_TV_FAMILY.to_string(), consts::APPLE_TV_MIN_MAJOR_VERSION)]),
        }
    }

    pub fn with_min_major_version(mut self, version: u32) -> Self {
        self.min_major_version = version;
        self
    }

    /// Replaces every per-family minimum.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (impl Into<String>, u32)>) -> Self {
        self.overrides = overrides.into_iter().map(|(family, version)| (family.into(), version)).collect();
        self
    }

    pub fn families(&self) -> &[String] {
        &self.families
    }

    /// The minimum major version for a page; the first family override the
    /// title mentions wins over the default.
    pub fn min_major_version_for(&self, title: &str) -> u32 {
        self.overrides
            .iter()
            .find(|(family, _)| title.contains(family.as_str()))
            .map_or(self.min_major_version, |(_, version)| *version)
    }

    pub fn accepts(&self, title: &str) -> bool {
        if !title.contains(consts::VERSION_RANGE_MARKER) || !self.families.iter().any(|f| title.contains(f.as_str())) {
            return false;
        }
        match major_version(title) {
            Ok(major) => major >= self.min_major_version_for(title),
            Err(err) => {
                tracing::debug!(title, error = %err, "Skipping page with unreadable version");
                false
            },
        }
    }
}

/// Parses the major version out of a title like `Beta Firmware/iPhone/14.x`.
pub fn major_version(title: &str) -> Result<u32> {
    let segment = title.split('/').nth(2).ok_or_raise(|| ErrorKind::ParseError {
        field: "major_version",
        value: title.to_string(),
    })?;
    let digits = segment.strip_suffix(consts::VERSION_RANGE_MARKER).ok_or_raise(|| ErrorKind::ParseError {
        field: "major_version",
        value: segment.to_string(),
    })?;
    digits.parse::<u32>().or_raise(|| ErrorKind::ParseError {
        field: "major_version",
        value: digits.to_string(),
    })
}
