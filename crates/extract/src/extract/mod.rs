//! Firmware table extraction for The iPhone Wiki's beta firmware pages.

mod row;
mod template;

use std::convert::Infallible;
use std::str::FromStr;

pub use self::row::{FirmwareRow, SkipReason, compact, firm_index};
pub use self::template::{ColumnRole, Template};
use crate::models::DeviceTable;
use crate::wikitext::{Document, Table};
use tracing::instrument;

#[derive(Debug)]
pub struct Extractor {
    document: Document,
}
impl Extractor {
    pub fn from_document(document: Document) -> Self {
        Self { document }
    }

    pub fn from_wikitext(wikitext: &str) -> Self {
        Self::from_document(Document::parse(wikitext))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Every data row of every table, read against its table's header row.
    ///
    /// The first row of each table is its template; it's never data.
    pub fn rows(&self) -> impl Iterator<Item = Result<FirmwareRow, SkipReason>> + '_ {
        self.document.tables().iter().flat_map(Self::table_rows)
    }

    fn table_rows(table: &Table) -> Vec<Result<FirmwareRow, SkipReason>> {
        let data = table.data();
        let Some((header, rows)) = data.split_first() else {
            return Vec::new();
        };
        let template = Template::from_row(header);
        rows.iter().map(|row| FirmwareRow::extract(&template, &compact(row))).collect()
    }

    /// Collects the firmware records of every usable row, grouped by device.
    ///
    /// Unusable rows are skipped and traced, never reported as errors. Within
    /// a page, the first record seen for a device's build wins.
    #[instrument(skip(self), fields(tables = self.document.tables().len(), rows, skipped, devices))]
    pub fn device_table(&self) -> DeviceTable {
        let mut table = DeviceTable::new();
        let (mut rows, mut skipped) = (0usize, 0usize);
        for row in self.rows() {
            rows += 1;
            match row {
                Ok(firmware) => {
                    for (device, record) in firmware.records() {
                        table.insert(device, record);
                    }
                },
                Err(reason) => {
                    skipped += 1;
                    tracing::trace!(%reason, "Table row skipped");
                },
            }
        }
        let span = tracing::Span::current();
        span.record("rows", rows);
        span.record("skipped", skipped);
        span.record("devices", table.len());
        table
    }
}
impl FromStr for Extractor {
    type Err = Infallible;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_wikitext(s))
    }
}
impl From<String> for Extractor {
    fn from(value: String) -> Self {
        Self::from_wikitext(&value)
    }
}
impl From<Document> for Extractor {
    fn from(document: Document) -> Self {
        Self::from_document(document)
    }
}
impl From<Extractor> for DeviceTable {
    fn from(extractor: Extractor) -> Self {
        extractor.device_table()
    }
}
