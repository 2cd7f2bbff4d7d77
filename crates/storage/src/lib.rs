pub mod error;
mod path;
mod table;

pub use crate::path::validate as validate_device;
pub use crate::table::{read_device, write_table};
