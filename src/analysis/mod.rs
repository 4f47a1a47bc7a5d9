//! Forecast utilities layered over a fitted [`VarModelBuilder`].
//!
//! - multi-horizon batches and scenario comparison (`scenarios`)
//! - approximate confidence bands (`intervals`)
//! - quarterly aggregation of monthly forecasts (`scenarios::quarterly_summary`)
//!
//! [`VarModelBuilder`]: crate::var::VarModelBuilder

pub mod intervals;
pub mod scenarios;

pub use intervals::*;
pub use scenarios::*;
