use super::FirmwareRecord;
use std::collections::BTreeMap;
use std::collections::btree_map::{IntoIter, Iter};

/// Firmware records grouped by device identifier (e.g. `iPhone14,2`).
///
/// Records keep their insertion order; sorting only happens on the way out,
/// see [`sorted_records`](Self::sorted_records). A device never holds two
/// records with the same build identifier: the first one seen wins and later
/// duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTable {
    devices: BTreeMap<String, Vec<FirmwareRecord>>,
}
impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for `device`, unless that device already has a
    /// record with the same build identifier. Returns `true` if the record
    /// was added.
    pub fn insert(&mut self, device: impl Into<String>, record: FirmwareRecord) -> bool {
        let records = self.devices.entry(device.into()).or_default();
        if records.iter().any(|existing| existing.buildid == record.buildid) {
            return false;
        }
        records.push(record);
        true
    }

    /// Folds another table into this one, record by record, so the
    /// first-seen rule holds across pages.
    pub fn merge(&mut self, other: DeviceTable) -> usize {
        let mut inserted = 0;
        for (device, records) in other.devices {
            for record in records {
                if self.insert(device.clone(), record) {
                    inserted += 1;
                }
            }
        }
        inserted
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn records(&self, device: &str) -> Option<&[FirmwareRecord]> {
        self.devices.get(device).map(Vec::as_slice)
    }

    pub fn records_mut(&mut self, device: &str) -> Option<&mut Vec<FirmwareRecord>> {
        self.devices.get_mut(device)
    }

    /// Swaps in a new list of records for `device`, e.g. after signing checks.
    pub fn replace(&mut self, device: impl Into<String>, records: Vec<FirmwareRecord>) {
        self.devices.insert(device.into(), records);
    }

    /// Keeps only the records of `device` for which `keep` returns `true`.
    pub fn retain(&mut self, device: &str, keep: impl FnMut(&FirmwareRecord) -> bool) {
        if let Some(records) = self.devices.get_mut(device) {
            records.retain(keep);
        }
    }

    /// Records for `device`, newest build first.
    pub fn sorted_records(&self, device: &str) -> Vec<FirmwareRecord> {
        let mut records = self.records(device).map(<[_]>::to_vec).unwrap_or_default();
        records.sort_by(|a, b| b.buildid.cmp(&a.buildid));
        records
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Total number of records across every device.
    pub fn record_count(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> Iter<'_, String, Vec<FirmwareRecord>> {
        self.devices.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<FirmwareRecord>> {
        self.devices
    }
}
impl IntoIterator for DeviceTable {
    type Item = (String, Vec<FirmwareRecord>);
    type IntoIter = IntoIter<String, Vec<FirmwareRecord>>;
    fn into_iter(self) -> Self::IntoIter {
        self.devices.into_iter()
    }
}
impl<'a> IntoIterator for &'a DeviceTable {
    type Item = (&'a String, &'a Vec<FirmwareRecord>);
    type IntoIter = Iter<'a, String, Vec<FirmwareRecord>>;
    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}
impl FromIterator<(String, FirmwareRecord)> for DeviceTable {
    fn from_iter<T: IntoIterator<Item = (String, FirmwareRecord)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (device, record) in iter {
            table.insert(device, record);
        }
        table
    }
}
