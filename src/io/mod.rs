//! Reading average expression tables and writing result tables.

pub mod average_expression;
pub mod export;

pub use average_expression::{LoadReport, load_average_expression, read_average_expression};
pub use export::{save_result_csv, write_result_csv};
