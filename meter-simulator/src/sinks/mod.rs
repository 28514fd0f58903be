pub mod csv_file;

pub use csv_file::{to_csv_string, CsvFileSink, CsvRecord};
