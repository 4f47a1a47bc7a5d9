//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - forecast/diagnostics/report exports (`export`)
//! - model JSON save/load (`model_file`)

pub mod export;
pub mod ingest;
pub mod model_file;

pub use export::*;
pub use ingest::*;
pub use model_file::*;
