//! `macro-var` library crate.
//!
//! A three-variable VAR workflow for monthly macro data (GDP growth, CPI
//! change, and the 10y-3m yield spread): prepare, select lags, fit, forecast,
//! and analyse. The binary (`mvar`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the CLI and the TUI share one pipeline

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
pub mod var;
