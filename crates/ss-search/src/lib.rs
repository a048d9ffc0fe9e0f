//! Object segmentation of sonar fan images by threshold-ordered peak search.
//!
//! Core strategy:
//! - Scan every beam of the fan bin by bin and close one peak record per run
//!   of bins standing more than `h_min` above the running background mean.
//! - Give each record an acceptance threshold (background mean plus the
//!   run's weakest height) and a seed (the run's strongest bin).
//! - Grow regions from all records in ascending threshold order against one
//!   shared visited mask, keeping those with at least `min_sample_size`
//!   pixels.
//!
//! Growing weak peaks first lets them claim their low-intensity halo before
//! a stronger, wider flood can absorb it, which keeps one object from being
//! split into several segments. Discarded regions keep their pixels marked.
//!
//! Beam-level inspection for parameter tuning lives in [`calib`].

pub mod calib;
mod config;
mod searcher;

pub use calib::{BeamTrace, CalibAction, CalibState, TraceBin, grow_trace_peaks, trace_beam};
pub use config::{
    ConfigError, ConfigSource, GENERAL_SECTION, GROW_SECTION, JsonConfigSource, SEARCH_SECTION,
    SearchConfig, load_grow_config,
};
pub use searcher::{PeakSearchSegmenter, SegmentationStats};
