use serde::Serialize;
use ss_beam::{BeamSampler, FanGeometry, PeakDetector, PeakRecord};
use ss_core::{Error, ImageView, pixel_truncated};
use ss_region::{RegionGrower, Segment, SegmentPool};

use crate::config::SearchConfig;

/// Counters from the most recent [`PeakSearchSegmenter::segment`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentationStats {
    pub beams: usize,
    pub peaks: usize,
    pub kept: usize,
    pub discarded: usize,
    pub visited_px: usize,
}

/// Drives a [`RegionGrower`] from the peaks found along every beam.
///
/// One instance processes one image at a time. The pool passed to
/// [`Self::segment`] is reset at the start of every call, so concurrent
/// callers need their own pools.
#[derive(Debug, Clone)]
pub struct PeakSearchSegmenter {
    cfg: SearchConfig,
    detector: PeakDetector,
    peaks: Vec<PeakRecord>,
    stats: SegmentationStats,
}

impl PeakSearchSegmenter {
    pub fn new(cfg: SearchConfig) -> Self {
        Self {
            detector: PeakDetector::new(cfg.h_min, cfg.mean_window_size),
            peaks: Vec::with_capacity(cfg.peak_capacity_hint),
            stats: SegmentationStats::default(),
            cfg,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, cfg: SearchConfig) {
        self.detector.set_h_min(cfg.h_min);
        self.detector.set_window_size(cfg.mean_window_size);
        self.cfg = cfg;
    }

    pub fn geometry(&self, width: usize, height: usize) -> FanGeometry {
        FanGeometry::new(
            width,
            height,
            self.cfg.n_beams,
            self.cfg.field_of_view_deg,
            self.cfg.start_bin,
            self.cfg.sonar_vertical_offset,
        )
    }

    /// Peak records from the last call: emission order after
    /// [`Self::detect_peaks`], growth order after [`Self::segment`].
    pub fn peaks(&self) -> &[PeakRecord] {
        &self.peaks
    }

    pub fn last_stats(&self) -> SegmentationStats {
        self.stats
    }

    /// Scans every beam and collects the peak records, beam by beam.
    pub fn detect_peaks(&mut self, img: &ImageView<'_, u16>) -> Result<&[PeakRecord], Error> {
        let geom = self.geometry(img.width(), img.height());
        self.peaks.clear();
        self.peaks.reserve(self.cfg.peak_capacity_hint);

        for ray in geom.beams() {
            let sampler = BeamSampler::new(*img, ray);
            let n_bins = if self.cfg.clip_beams_to_image {
                sampler.leading_inside(geom.n_bins())
            } else {
                geom.n_bins()
            };
            self.detector.scan_beam(&sampler, n_bins, &mut self.peaks)?;
        }

        Ok(&self.peaks)
    }

    /// Segments `img` and returns the kept segments in growth order.
    ///
    /// Peaks are grown from the lowest threshold up; equal thresholds keep
    /// emission order. Every grown pixel stays claimed in the pool's mask,
    /// including pixels of segments smaller than `min_sample_size`.
    pub fn segment<'p, G>(
        &mut self,
        img: &ImageView<'_, u16>,
        grower: &mut G,
        pool: &'p mut SegmentPool,
    ) -> Result<&'p [Segment], Error>
    where
        G: RegionGrower + ?Sized,
    {
        self.stats = SegmentationStats::default();
        self.detect_peaks(img)?;
        self.peaks.sort_by_key(|p| p.threshold);

        pool.reset_mask(img.height(), img.width());

        let mut kept = 0usize;
        for peak in &self.peaks {
            let seed = pixel_truncated(peak.seed, img.width(), img.height())?;
            let (seg, mask) = pool.slot(kept);

            grower.set_threshold(peak.threshold);
            grower.create_segment(seg, mask, img, seed)?;

            if seg.n() >= self.cfg.min_sample_size {
                kept += 1;
            }
        }

        self.stats = SegmentationStats {
            beams: self.cfg.n_beams,
            peaks: self.peaks.len(),
            kept,
            discarded: self.peaks.len() - kept,
            visited_px: pool.mask().visited_count(),
        };
        tracing::debug!(
            "peak search: {} beams, {} peaks, {} segments kept, {} discarded",
            self.stats.beams,
            self.stats.peaks,
            self.stats.kept,
            self.stats.discarded
        );

        Ok(&pool.segments()[..kept])
    }
}
