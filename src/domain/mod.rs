//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - grid coordinates and measurements (`ParamPair`, `GridPoint`)
//! - the canonical dataset order and flat parameter vectors
//! - optimizer outputs (`Solution`, `ParamChoice`) and run configuration

pub mod types;

pub use types::*;
