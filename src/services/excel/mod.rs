pub mod analyzer;
pub mod exporter;
pub mod loader;
pub mod types;
pub mod utils;

pub use analyzer::TableAnalyzer;
pub use exporter::export_table;
pub use loader::SpreadsheetFile;
