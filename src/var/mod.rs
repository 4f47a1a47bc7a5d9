//! VAR model building and analysis.
//!
//! Responsibilities:
//!
//! - estimate a VAR(p) by equation-wise least squares (`fitter`)
//! - choose a lag order by information-criteria voting (`selection`)
//! - deterministic multi-step point forecasts (`forecast`)
//! - impulse responses, FEVD, and forecast MSE (`irf`)
//! - the stateful `VarModelBuilder` tying it together (`builder`)

pub mod builder;
pub mod fitter;
pub mod forecast;
pub mod irf;
pub mod selection;

pub use builder::*;
pub use fitter::*;
pub use selection::*;
