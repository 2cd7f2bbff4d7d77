mod device_table;
mod record;

pub use self::device_table::DeviceTable;
pub use self::record::FirmwareRecord;
