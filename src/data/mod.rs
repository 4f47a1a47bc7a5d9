//! Data layer: deriving model inputs from the raw economic table, joining raw
//! downloads, and generating synthetic samples.

pub mod join;
pub mod prepare;
pub mod sample;

pub use join::*;
pub use prepare::*;
pub use sample::*;
