//! Input/output helpers.
//!
//! - results-directory ingest (`ingest`)
//! - tab-separated grid tables (`grid_tsv`)
//! - parameter files read/write (`params`)
//! - JSON run exports (`export`)

pub mod export;
pub mod grid_tsv;
pub mod ingest;
pub mod params;

pub use export::*;
pub use grid_tsv::*;
pub use ingest::*;
pub use params::*;
