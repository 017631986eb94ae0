// Table I/O operations

pub mod csv;
pub mod report;
pub mod sheet_name;
pub mod xlsx;
