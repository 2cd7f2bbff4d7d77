mod consts;
pub mod error;
mod extract;
mod filter;
pub mod models;
pub mod wikitext;

use tracing::instrument;

pub use crate::consts::{APPLE_TV_FAMILY, APPLE_TV_MIN_MAJOR_VERSION, DEFAULT_MIN_MAJOR_VERSION};
pub use crate::extract::{ColumnRole, Extractor, FirmwareRow, SkipReason, Template, compact, firm_index};
pub use crate::filter::{PageFilter, major_version};
use crate::models::DeviceTable;

/// Easy, top-level entrypoint for extracting firmware records from the raw
/// wikitext of one beta firmware page.
///
/// Never fails: rows that can't be read are skipped, and a page without any
/// usable rows produces an empty [`DeviceTable`]. See [`Extractor`] for
/// more details.
#[instrument(skip(wikitext), fields(wikitext_size = wikitext.len()))]
pub fn extract(wikitext: &str) -> DeviceTable {
    Extractor::from_wikitext(wikitext).device_table()
}
