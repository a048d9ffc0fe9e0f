//! Per-beam primitives for sonar fan images.
//!
//! A fan image is scanned as `n_beams` straight rays leaving a sonar apex
//! placed just below the bottom-center of the image. Along each ray, bins are
//! sampled one pixel apart starting `start_bin` samples away from the apex.
//!
//! Peak detection compares each bin against the mean of the most recent
//! background bins ([`RunningWindow`]). Bins inside an open peak run are never
//! fed to the window, so the mean keeps tracking the background level while a
//! bright return is crossed.
//!
//! Geometry is not clamped: [`BeamSampler::sample`] reports
//! [`ss_core::Error::OutOfBounds`] for any bin whose pixel lies outside the
//! image.

pub mod geometry;
pub mod peak;
pub mod window;

pub use geometry::{BeamRay, BeamSampler, FanGeometry};
pub use peak::{BinStep, ClosedRun, PeakDetector, PeakRecord, PeakRun, ScanState};
pub use window::RunningWindow;
