//! Measurement grid: storage, bounding-box search and interpolation.
//!
//! Responsibilities:
//!
//! - hold per-dataset sparse probe counts (`store`)
//! - find measured rectangles around fractional queries (`locate`)
//! - interpolate probe counts inside those rectangles (`interp`)

pub mod interp;
pub mod locate;
pub mod store;

pub use interp::*;
pub use locate::*;
pub use store::*;
