pub mod deadletter;
pub mod metric;
pub mod participant;
pub mod records;
pub mod value;
