use derive_more::Display;

/// What a column of a firmware table holds.
///
/// Wiki editors reorder, add, and rename columns between page revisions, so
/// only the device column is found by its label. The others sit at fixed
/// positions relative to the (compacted) row.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    /// Version label, always the first cell.
    #[display("version")]
    Version,
    /// Build identifier(s), always the second cell.
    #[display("build")]
    Build,
    /// Device links, under a "Codename" or "Keys" heading.
    #[display("devices")]
    Devices,
    /// File sizes, always the last cell.
    #[display("size")]
    Size,
}
impl ColumnRole {
    /// Header substrings that identify a labelled column.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Self::Devices => &["Codename", "Keys"],
            Self::Version | Self::Build | Self::Size => &[],
        }
    }

    /// Whether a header label marks this column. Positional roles never match a label.
    pub fn matches(&self, label: &str) -> bool {
        self.labels().iter().any(|needle| label.contains(needle))
    }
}

/// The header row of a table, used only to resolve column roles to positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    labels: Vec<String>,
}
impl Template {
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { labels: labels.into_iter().map(Into::into).collect() }
    }

    /// Builds a template from a grid row; uncovered positions get an empty label.
    pub fn from_row(row: &[Option<String>]) -> Self {
        Self::new(row.iter().map(|label| label.clone().unwrap_or_default()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Resolves `role` to an index into a compacted row of `row_len` cells.
    ///
    /// Returns `None` when the template has no such column or the row is too
    /// short to contain it.
    pub fn position(&self, role: ColumnRole, row_len: usize) -> Option<usize> {
        let position = match role {
            ColumnRole::Version => 0,
            ColumnRole::Build => 1,
            ColumnRole::Size => row_len.checked_sub(1)?,
            ColumnRole::Devices => self.labels.iter().position(|label| role.matches(label))?,
        };
        (position < row_len).then_some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["Version", "Build", "Keys", "Baseband", "Release Date", "Size"], Some(2))]
    #[case(&["Version", "Build", "Codename", "Release Date", "Download", "Size"], Some(2))]
    #[case(&["Version", "Build", "Device Codename(s)", "Size"], Some(2))]
    #[case(&["Version", "Keys", "Codename"], Some(1))]
    #[case(&["Version", "Build", "Release Date"], None)]
    fn test_device_column(#[case] labels: &[&str], #[case] expected: Option<usize>) {
        let template = Template::new(labels.iter().copied());
        assert_eq!(template.position(ColumnRole::Devices, 6), expected);
    }

    #[test]
    fn test_positional_roles() {
        let template = Template::new(["Version", "Build", "Keys", "Size"]);
        assert_eq!(template.position(ColumnRole::Version, 4), Some(0));
        assert_eq!(template.position(ColumnRole::Build, 4), Some(1));
        assert_eq!(template.position(ColumnRole::Size, 4), Some(3));
        assert_eq!(template.position(ColumnRole::Size, 0), None);
        assert_eq!(template.position(ColumnRole::Build, 1), None);
    }

    #[test]
    fn test_device_column_beyond_short_row() {
        let template = Template::new(["Version", "Build", "Baseband", "Keys"]);
        assert_eq!(template.position(ColumnRole::Devices, 3), None);
    }

    #[test]
    fn test_label_matching_is_substring_and_case_sensitive() {
        assert!(ColumnRole::Devices.matches("Keys / Codename"));
        assert!(!ColumnRole::Devices.matches("keys"));
        assert!(!ColumnRole::Version.matches("Version"));
    }
}
