//! Mathematical utilities: least squares, small symmetric-matrix helpers, and
//! sample statistics.

pub mod linalg;
pub mod ols;
pub mod stats;

pub use linalg::*;
pub use ols::*;
pub use stats::*;
