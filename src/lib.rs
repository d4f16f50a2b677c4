//! `probe-budget` library crate.
//!
//! Chooses per-dataset `(mismatches, cover_extension)` design parameters so
//! that the total probe count across datasets stays under a budget while the
//! parameters stay as small as possible.
//!
//! The binary (`probe-budget`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the grid, interpolation and optimizer modules are reusable on their own

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod grid;
pub mod io;
pub mod logging;
pub mod math;
pub mod optimize;
pub mod plot;
pub mod report;
