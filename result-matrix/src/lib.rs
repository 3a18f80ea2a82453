//! Turn a flat list of benchmark results into a text table:
//! one row per benchmark name, one column per value of a single parameter.
//!
//! ```rust
//! use result_matrix::{format_as_matrix, BenchmarkResult};
//!
//! let results = vec![
//!     BenchmarkResult::new("lookup", 12.2, "ns/op").with_param("size", "1"),
//!     BenchmarkResult::new("lookup", 30.5, "ns/op").with_param("size", "8"),
//! ];
//! let matrix = format_as_matrix(&results, "size").unwrap();
//! assert_eq!(matrix.to_string(), "Units: ns/op   1   8\nlookup        12  31\n");
//! ```

mod error;
pub mod json;
mod matrix;
mod result;

pub use error::Error;
pub use matrix::{format_as_matrix, MatrixRow, ResultMatrix};
pub use result::BenchmarkResult;
