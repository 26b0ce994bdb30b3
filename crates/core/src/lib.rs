pub mod cell;
pub mod datafile;
pub mod mapping;
pub mod rule;
pub mod transaction;

pub use cell::CellValue;
pub use datafile::DataFile;
pub use mapping::{ColumnMapping, DateFormat, DecimalSeparator};
pub use rule::{Rule, PLACEHOLDER_CODE};
pub use transaction::{Transaction, INVALID_DATE};
