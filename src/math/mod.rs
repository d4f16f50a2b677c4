//! Numerical utilities: bound-constrained minimization.

pub mod minimize;

pub use minimize::*;
