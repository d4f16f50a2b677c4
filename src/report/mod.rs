//! Reporting utilities: run summaries, parameter listings, and grid matrices.

pub mod format;

pub use format::*;
