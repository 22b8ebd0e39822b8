//! Core data structures: tabular values, tables, and paired datasets.

mod dataset;
mod table;

pub use dataset::{read_annotation, Dataset, BENCHMARK_COLS};
pub use table::{Table, Value};
