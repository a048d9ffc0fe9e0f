//! Umbrella crate for the `sonar-seg` workspace.
//!
//! Re-exports the image primitives, beam scanning, region growing and the
//! peak search segmenter.

pub use ss_beam::*;
pub use ss_core::*;
pub use ss_region::*;
pub use ss_search::*;
