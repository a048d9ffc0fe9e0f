//! Foundational primitives for sonar image segmentation.
//!
//! ## Image Views and Stride
//! Images use element stride (not byte stride). `stride` is the distance, in
//! elements, between adjacent row starts and may be greater than `width`.
//! This allows borrowed views over padded buffers.
//!
//! ## Sampling Coordinates
//! Beam sampling uses truncating conversion: a floating point position
//! `(x, y)` maps to pixel `(trunc(x), trunc(y))`. Positions whose truncated
//! coordinates fall outside the image are reported as
//! [`Error::OutOfBounds`] instead of being read.

mod error;
mod geom;
mod image;
mod sample;

pub use error::Error;
pub use geom::{Pixel, Point2f, Vec2f};
pub use image::{Image, ImageView, to_u16};
pub use sample::{pixel_truncated, sample_truncated};
