//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the three modelled variables (`Variable`) and fixed-size vector aliases
//! - the raw month-keyed input table (`RawObservationTable`)
//! - the derived model input (`VarSeriesTable`)
//! - model outputs (`LagSelection`, `FittedVar`, `ForecastTable`, etc.)
//! - run configuration (`RunConfig`)

pub mod types;

pub use types::*;
