//! Terminal plots of dataset grids.

pub mod ascii;

pub use ascii::*;
