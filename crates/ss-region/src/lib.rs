//! Seeded region growing against a shared visited mask.
//!
//! Segments are grown one at a time from seed pixels. Every pixel accepted
//! into any segment is marked in a [`VisitMask`] that is shared by all
//! segments of one image, so a pixel belongs to at most one segment and
//! whichever segment is grown first claims it.
//!
//! Segment storage is pooled: [`SegmentPool::segment`] hands out a cleared,
//! reusable handle by index so repeated images do not reallocate pixel lists.
//!
//! Connectivity options:
//! - [`Connectivity::C4`]: axis-aligned neighbors only.
//! - [`Connectivity::C8`]: includes diagonals (default).

mod grow;
mod mask;
mod segment;

pub use grow::{Connectivity, FloodFillGrower, GrowConfig, RegionGrower};
pub use mask::VisitMask;
pub use segment::{BoundingBox, Segment, SegmentPool};
