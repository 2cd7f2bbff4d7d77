use super::template::{ColumnRole, Template};
use crate::consts;
use crate::models::FirmwareRecord;
use crate::wikitext::{external_links, wikilinks};
use derive_more::Display;

/// Why a table row produced no firmware.
///
/// None of these are errors: community-edited tables are full of rows for
/// internal builds, OTA-only releases, and half-filled entries.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The template has no such column, or the row is too short to reach it.
    #[display("row has no {_0} column")]
    MissingColumn(ColumnRole),
    /// The build cell's template markup held no entries.
    #[display("no build identifier")]
    NoBuildId,
    /// No cell carries an external link; nothing was distributed.
    #[display("no download links")]
    NoDownloads,
    /// Links exist, but none of them point at an IPSW.
    #[display("no IPSW downloads")]
    NotIpsw,
    /// Sizes can't be paired with downloads one-to-one.
    #[display("found {sizes} sizes for {downloads} downloads")]
    SizeMismatch { sizes: usize, downloads: usize },
    /// No link in the device column names a device identifier.
    #[display("no device identifiers")]
    NoDevices,
}

/// Drops grid positions no cell covers, keeping the rest in order.
pub fn compact(row: &[Option<String>]) -> Vec<String> {
    row.iter().flatten().cloned().collect()
}

/// Which build variant a device gets, by its position in the row.
///
/// On the wiki a four-device row lists two devices per build variant, and a
/// two-device row lists the primary build's device first. Everything else
/// takes the second variant, which [`FirmwareRow::records`] folds back to
/// the only variant when there's just one.
pub fn firm_index(device_count: usize, position: usize) -> usize {
    match (device_count, position) {
        (4, 0 | 1) | (2, 0) => 0,
        _ => 1,
    }
}

/// Everything a table row says about a firmware release, before it's split
/// into per-device records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareRow {
    pub devices: Vec<String>,
    pub version: String,
    pub buildids: Vec<String>,
    pub downloads: Vec<String>,
    pub sizes: Vec<u64>,
}
impl FirmwareRow {
    /// Reads a compacted row against its table's template.
    pub fn extract(template: &Template, row: &[String]) -> Result<Self, SkipReason> {
        let cell = |role: ColumnRole| {
            template.position(role, row.len()).map(|index| row[index].as_str()).ok_or(SkipReason::MissingColumn(role))
        };
        let devices = Self::devices(cell(ColumnRole::Devices)?);
        let version = Self::version(cell(ColumnRole::Version)?);
        let buildids = Self::buildids(cell(ColumnRole::Build)?);
        if buildids.is_empty() {
            return Err(SkipReason::NoBuildId);
        }
        let downloads = Self::downloads(row)?;
        let sizes = Self::sizes(cell(ColumnRole::Size)?);
        if sizes.len() != downloads.len() {
            return Err(SkipReason::SizeMismatch { sizes: sizes.len(), downloads: downloads.len() });
        }
        if devices.is_empty() {
            return Err(SkipReason::NoDevices);
        }
        Ok(Self { devices, version, buildids, downloads, sizes })
    }

    /// Device identifiers linked from the device column, in order. Links
    /// that aren't device identifiers (footnotes, codenames) are ignored.
    fn devices(cell: &str) -> Vec<String> {
        wikilinks(cell)
            .iter()
            .filter_map(|link| consts::DEVICE_REGEX.find(link.display()))
            .map(|found| found.as_str().to_string())
            .collect()
    }

    /// The version label with its first link unwrapped to plain text.
    fn version(cell: &str) -> String {
        match wikilinks(cell).first() {
            Some(link) => cell.replace(link.raw, link.display()),
            None => cell.to_string(),
        }
    }

    /// Build identifiers, one per variant.
    ///
    /// Multi-variant cells use a template whose parameters sit on their own
    /// lines (`{{Build\n   | A = 18E5154a\n   | B = 18E5154b\n   | }}`). The
    /// first and last pieces are the template's opening and closing, and
    /// each value still carries its line terminator.
    fn buildids(cell: &str) -> Vec<String> {
        let parts: Vec<&str> = cell.split(consts::BUILDID_SEPARATOR).collect();
        if parts.len() == 1 {
            return vec![cell.to_string()];
        }
        parts[1..parts.len() - 1]
            .iter()
            .copied()
            .map(|part| {
                let value = part.rsplit(consts::BUILDID_ASSIGNMENT).next().unwrap_or(part);
                let mut chars = value.chars();
                chars.next_back();
                chars.as_str().to_string()
            })
            .collect()
    }

    /// Links from the first cell that has any.
    fn downloads(row: &[String]) -> Result<Vec<String>, SkipReason> {
        let links = row
            .iter()
            .map(|cell| external_links(cell))
            .find(|links| !links.is_empty())
            .ok_or(SkipReason::NoDownloads)?;
        if !links.iter().any(|link| link.url.ends_with(consts::IPSW_SUFFIX)) {
            return Err(SkipReason::NotIpsw);
        }
        Ok(links.iter().map(|link| link.url.to_string()).collect())
    }

    /// Byte counts from the size cell; small numbers are footnote markers.
    fn sizes(cell: &str) -> Vec<u64> {
        cell.split_whitespace()
            .map(|token| token.replace([',', '\n'], ""))
            .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|token| token.parse::<u64>().ok())
            .filter(|size| *size > consts::MIN_SIZE_TOKEN)
            .collect()
    }

    /// Pairs each device with its build, download, and size.
    ///
    /// A device whose variant has no build, download, or size of its own,
    /// or whose record would be incomplete, is left out.
    pub fn records(&self) -> Vec<(String, FirmwareRecord)> {
        let mut records = Vec::with_capacity(self.devices.len());
        for (position, device) in self.devices.iter().enumerate() {
            let index = firm_index(self.devices.len(), position);
            let pick = |len: usize| if len > 1 { index } else { 0 };
            let buildid = self.buildids.get(pick(self.buildids.len()));
            let url = self.downloads.get(pick(self.downloads.len()));
            let size = self.sizes.get(pick(self.downloads.len()));
            let (Some(buildid), Some(url), Some(size)) = (buildid, url, size) else {
                tracing::trace!(device = %device, index, "No firmware variant for device");
                continue;
            };
            match FirmwareRecord::new(&self.version, buildid, url, *size) {
                Ok(record) => records.push((device.clone(), record)),
                Err(err) => tracing::trace!(device = %device, error = %err, "Incomplete firmware record skipped"),
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TEMPLATE: [&str; 6] = ["Version", "Build", "Keys", "Baseband", "Release Date", "Size"];

    fn template() -> Template {
        Template::new(TEMPLATE)
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn two_variant_build(a: &str, b: &str) -> String {
        format!("{{{{Build\n   | A = {a}\n   | B = {b}\n   | }}}}")
    }

    #[rstest]
    #[case(4, 0, 0)]
    #[case(4, 1, 0)]
    #[case(4, 2, 1)]
    #[case(4, 3, 1)]
    #[case(2, 0, 0)]
    #[case(2, 1, 1)]
    #[case(1, 0, 1)]
    #[case(3, 0, 1)]
    fn test_firm_index(#[case] device_count: usize, #[case] position: usize, #[case] expected: usize) {
        assert_eq!(firm_index(device_count, position), expected);
    }

    #[test]
    fn test_example_row() {
        let row = row(&[
            "14.5 beta 1",
            "   | A = 18E5154a   |   | B = 18E5154b   |",
            "[[iPhone12,1]][[iPhone12,3]]",
            "-",
            "Feb 1 2021",
            "[http://example/a.ipsw a] [http://example/b.ipsw b] 5,432,100,000 6,123,400,000",
        ]);
        let firmware = FirmwareRow::extract(&template(), &row).unwrap();
        assert_eq!(firmware.devices, vec!["iPhone12,1", "iPhone12,3"]);
        assert_eq!(firmware.downloads, vec!["http://example/a.ipsw", "http://example/b.ipsw"]);
        assert_eq!(firmware.sizes, vec![5_432_100_000, 6_123_400_000]);
        let records = firmware.records();
        assert_eq!(records.len(), 2);
        let (first, second) = (&records[0], &records[1]);
        assert_eq!(first.0, "iPhone12,1");
        assert_eq!((first.1.url.as_str(), first.1.size), ("http://example/a.ipsw", 5_432_100_000));
        assert_eq!(second.0, "iPhone12,3");
        assert_eq!((second.1.url.as_str(), second.1.size), ("http://example/b.ipsw", 6_123_400_000));
        // Only one entry sits between the outer separators of this cell, so
        // both devices share it, minus its terminator.
        assert_eq!(firmware.buildids, vec!["18E5154"]);
        assert!(records.iter().all(|(_, record)| record.buildid == "18E5154" && record.version == "14.5 beta 1"));
    }

    #[test]
    fn test_two_devices_two_builds() {
        let row = row(&[
            "14.5 beta 1",
            &two_variant_build("18E5154a", "18E5154b"),
            "[[N104AP|iPhone12,1]] [[N142AP|iPhone12,3]]",
            "-",
            "Feb 1 2021",
            "[http://example/a.ipsw a] [http://example/b.ipsw b] 5,432,100,000 6,123,400,000",
        ]);
        let records = FirmwareRow::extract(&template(), &row).unwrap().records();
        let summary: Vec<_> = records.iter().map(|(device, r)| (device.as_str(), r.buildid.as_str())).collect();
        assert_eq!(summary, vec![("iPhone12,1", "18E5154a"), ("iPhone12,3", "18E5154b")]);
    }

    #[test]
    fn test_four_devices_two_builds() {
        let row = row(&[
            "[[iOS 14.5 beta 1|14.5 beta 1]]",
            &two_variant_build("18E5154a", "18E5154b"),
            "[[iPad8,1]], [[iPad8,2]], [[iPad8,3]], [[iPad8,4]]<ref>[[Footnote]]</ref>",
            "Feb 1 2021",
            "[http://example/a.ipsw] [http://example/b.ipsw]",
            "4,000,000,000 4,100,000,000",
        ]);
        let records = FirmwareRow::extract(&template(), &row).unwrap().records();
        let summary: Vec<_> =
            records.iter().map(|(device, r)| (device.as_str(), r.buildid.as_str(), r.size)).collect();
        assert_eq!(
            summary,
            vec![
                ("iPad8,1", "18E5154a", 4_000_000_000),
                ("iPad8,2", "18E5154a", 4_000_000_000),
                ("iPad8,3", "18E5154b", 4_100_000_000),
                ("iPad8,4", "18E5154b", 4_100_000_000),
            ]
        );
        assert!(records.iter().all(|(_, r)| r.version == "14.5 beta 1"));
    }

    #[test]
    fn test_single_device_single_build() {
        let row = row(&["10.1 beta 1", "14B5055a", "[[iPhone9,1]]", "-", "[https://example/x.ipsw]", "2,812,345,678"]);
        let records = FirmwareRow::extract(&template(), &row).unwrap().records();
        assert_eq!(records.len(), 1);
        let (device, record) = &records[0];
        assert_eq!(device, "iPhone9,1");
        assert_eq!(record.buildid, "14B5055a");
        assert_eq!(record.url, "https://example/x.ipsw");
        assert_eq!(record.size, 2_812_345_678);
    }

    #[test]
    fn test_one_build_shared_by_all_devices() {
        let row = row(&[
            "10.1 beta 1",
            "14B5055a",
            "[[iPhone9,1]] [[iPhone9,3]]",
            "-",
            "[https://example/x.ipsw]",
            "2,812,345,678",
        ]);
        let records = FirmwareRow::extract(&template(), &row).unwrap().records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|(_, r)| r.buildid == "14B5055a" && r.url == "https://example/x.ipsw"));
    }

    #[rstest]
    #[case::four_devices_one_build(
        "14B5055a".to_string(),
        "[[iPad6,3]] [[iPad6,4]] [[iPad6,7]] [[iPad6,8]]",
        &[("iPad6,3", "14B5055a"), ("iPad6,4", "14B5055a"), ("iPad6,7", "14B5055a"), ("iPad6,8", "14B5055a")]
    )]
    #[case::one_device_two_builds(
        two_variant_build("18E5154a", "18E5154b"),
        "[[iPhone12,1]]",
        &[("iPhone12,1", "18E5154b")]
    )]
    fn test_device_build_pairing(#[case] build: String, #[case] devices: &str, #[case] expected: &[(&str, &str)]) {
        let row = row(&["10.1 beta 1", &build, devices, "-", "[https://example/x.ipsw]", "2,812,345,678"]);
        let records = FirmwareRow::extract(&template(), &row).unwrap().records();
        let summary: Vec<_> = records.iter().map(|(device, r)| (device.as_str(), r.buildid.as_str())).collect();
        assert_eq!(summary, expected);
        assert!(records.iter().all(|(_, r)| r.url == "https://example/x.ipsw" && r.size == 2_812_345_678));
    }

    #[rstest]
    #[case("[[iOS 10.1 beta 1]]", "iOS 10.1 beta 1")]
    #[case("[[iOS 10.1 beta 1|10.1 beta 1]]", "10.1 beta 1")]
    #[case("10.1 beta 2", "10.1 beta 2")]
    #[case("10.1 beta 3 [[Footnote|*]]", "10.1 beta 3 *")]
    fn test_version(#[case] cell: &str, #[case] expected: &str) {
        assert_eq!(FirmwareRow::version(cell), expected);
    }

    #[rstest]
    #[case("[[iPhone12,1]]", &["iPhone12,1"])]
    #[case("[[N104AP|iPhone12,1]]", &["iPhone12,1"])]
    #[case("[[AppleTV5,3]] [[iPod9,1]]", &["AppleTV5,3", "iPod9,1"])]
    #[case("[[Kihei 18E5154a (iPhone12,1)]]", &[])]
    #[case("[[iPhone12,1b]]", &["iPhone12,1"])]
    #[case("[[Watch5,1]] [[Footnote]]", &[])]
    fn test_devices(#[case] cell: &str, #[case] expected: &[&str]) {
        assert_eq!(FirmwareRow::devices(cell), expected);
    }

    #[rstest]
    #[case("5,432,100,000 6,123,400,000", &[5_432_100_000, 6_123_400_000])]
    #[case("3 [[Footnote]] 1,234,567", &[1_234_567])]
    #[case("10 11", &[11])]
    #[case("2.4 GB", &[])]
    #[case("", &[])]
    fn test_sizes(#[case] cell: &str, #[case] expected: &[u64]) {
        assert_eq!(FirmwareRow::sizes(cell), expected);
    }

    #[test]
    fn test_no_downloads() {
        let row = row(&["14.5 beta 1", "18E5154a", "[[iPhone12,1]]", "-", "Feb 1 2021", "N/A"]);
        assert_eq!(FirmwareRow::extract(&template(), &row), Err(SkipReason::NoDownloads));
    }

    #[test]
    fn test_only_ota_links() {
        let row = row(&["14.5 beta 1", "18E5154a", "[[iPhone12,1]]", "-", "[http://example/ota.zip]", "123,456"]);
        assert_eq!(FirmwareRow::extract(&template(), &row), Err(SkipReason::NotIpsw));
    }

    #[test]
    fn test_size_count_mismatch() {
        let row = row(&[
            "14.5 beta 1",
            "18E5154a",
            "[[iPhone12,1]] [[iPhone12,3]]",
            "-",
            "[http://example/a.ipsw] [http://example/b.ipsw]",
            "5,432,100,000",
        ]);
        assert_eq!(
            FirmwareRow::extract(&template(), &row),
            Err(SkipReason::SizeMismatch { sizes: 1, downloads: 2 })
        );
    }

    #[test]
    fn test_row_too_short_for_device_column() {
        let row = row(&["14.5 beta 1", "18E5154a"]);
        assert_eq!(
            FirmwareRow::extract(&template(), &row),
            Err(SkipReason::MissingColumn(ColumnRole::Devices))
        );
    }

    #[test]
    fn test_template_without_device_column() {
        let template = Template::new(["Version", "Build", "Size"]);
        let row = row(&["14.5 beta 1", "18E5154a", "[http://example/a.ipsw] 123,456"]);
        assert_eq!(FirmwareRow::extract(&template, &row), Err(SkipReason::MissingColumn(ColumnRole::Devices)));
    }

    #[test]
    fn test_no_matching_devices_is_a_skip_not_an_error() {
        let row = row(&["14.5 beta 1", "18E5154a", "[[Footnote]]", "-", "[http://example/a.ipsw]", "123,456"]);
        assert_eq!(FirmwareRow::extract(&template(), &row), Err(SkipReason::NoDevices));
    }

    #[test]
    fn test_empty_build_template() {
        let row = row(&["14.5 beta 1", "{{Build   | }}", "[[iPhone12,1]]", "-", "[http://example/a.ipsw]", "123,456"]);
        assert_eq!(FirmwareRow::extract(&template(), &row), Err(SkipReason::NoBuildId));
    }

    #[test]
    fn test_missing_variant_drops_only_that_device() {
        // The second variant's build is blank, so only the first device
        // ends up with a complete record.
        let row = row(&[
            "14.5 beta 1",
            &two_variant_build("18E5154a", ""),
            "[[iPhone12,1]] [[iPhone12,3]]",
            "-",
            "[http://example/a.ipsw]",
            "5,432,100,000",
        ]);
        let records = FirmwareRow::extract(&template(), &row).unwrap().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "iPhone12,1");
    }

    #[test]
    fn test_compact_drops_uncovered_positions() {
        let row = vec![Some("a".to_string()), None, Some(String::new()), None, Some("b".to_string())];
        assert_eq!(compact(&row), vec!["a", "", "b"]);
    }
}
