//! Single-beam inspection for tuning `h_min` and the background window.
//!
//! [`trace_beam`] replays the peak detector along one bearing and keeps every
//! intermediate value, so the profile can be plotted against the acceptance
//! level. [`grow_trace_peaks`] grows the peaks of that one beam, ignoring
//! the minimum segment size.

use ss_beam::{BeamSampler, ClosedRun, FanGeometry, PeakDetector, PeakRecord};
use ss_core::{Error, ImageView, Point2f, pixel_truncated};
use ss_region::{RegionGrower, Segment, SegmentPool};

use crate::config::SearchConfig;

const MAX_BEARING_DEG: f32 = 65.0;
const BEARING_STEP_DEG: f32 = 1.0;
const H_MIN_STEP: i32 = 2;

/// One keyboard command of the calibration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibAction {
    /// `a`: rotate the inspected beam one degree to the left.
    BearingLeft,
    /// `d`: rotate one degree to the right.
    BearingRight,
    /// `w`
    RaiseHMin,
    /// `s`
    LowerHMin,
    /// `r`
    GrowWindow,
    /// `f`
    ShrinkWindow,
}

impl CalibAction {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'a' => Some(Self::BearingLeft),
            'd' => Some(Self::BearingRight),
            'w' => Some(Self::RaiseHMin),
            's' => Some(Self::LowerHMin),
            'r' => Some(Self::GrowWindow),
            'f' => Some(Self::ShrinkWindow),
            _ => None,
        }
    }
}

/// Parameters under adjustment while calibrating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibState {
    pub bearing_deg: f32,
    pub h_min: i32,
    pub mean_window_size: usize,
}

impl CalibState {
    /// Starts on the first beam of the fan with the configured parameters.
    pub fn from_config(cfg: &SearchConfig) -> Self {
        Self {
            bearing_deg: -cfg.field_of_view_deg / 2.0,
            h_min: cfg.h_min,
            mean_window_size: cfg.mean_window_size,
        }
    }

    pub fn apply(&mut self, action: CalibAction) {
        match action {
            CalibAction::BearingLeft => {
                if self.bearing_deg < MAX_BEARING_DEG {
                    self.bearing_deg += BEARING_STEP_DEG;
                }
            }
            CalibAction::BearingRight => {
                if self.bearing_deg > -MAX_BEARING_DEG {
                    self.bearing_deg -= BEARING_STEP_DEG;
                }
            }
            CalibAction::RaiseHMin => self.h_min += H_MIN_STEP,
            CalibAction::LowerHMin => {
                if self.h_min >= H_MIN_STEP {
                    self.h_min -= H_MIN_STEP;
                }
            }
            CalibAction::GrowWindow => self.mean_window_size += 1,
            CalibAction::ShrinkWindow => {
                self.mean_window_size = self.mean_window_size.saturating_sub(1);
            }
        }
        tracing::debug!(
            "calibration {:?}: bearing {:.1}, h_min {}, mean_window_size {}",
            action,
            self.bearing_deg,
            self.h_min,
            self.mean_window_size
        );
    }

    /// `base` with this state's detector parameters.
    pub fn search_config(&self, base: &SearchConfig) -> SearchConfig {
        SearchConfig {
            h_min: self.h_min,
            mean_window_size: self.mean_window_size,
            ..base.clone()
        }
    }

    /// Output file name encoding the current parameters, e.g.
    /// `CalibPlot_B-65.0_Hp110_Wsz5.png`.
    pub fn file_name(&self, kind: &str) -> String {
        format!(
            "{kind}_B{:.1}_Hp{}_Wsz{}.png",
            self.bearing_deg, self.h_min, self.mean_window_size
        )
    }
}

/// Detector state at one bin of a traced beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceBin {
    pub bin: usize,
    pub intensity: i32,
    pub mean: i32,
    /// Intensity a bin must exceed to open a run: `mean + h_min`.
    pub accept_level: i32,
    pub in_peak: bool,
    pub position: Point2f,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeamTrace {
    pub bearing_deg: f32,
    pub bins: Vec<TraceBin>,
    pub runs: Vec<ClosedRun>,
    pub peaks: Vec<PeakRecord>,
}

/// Runs the peak detector along the beam at `bearing_deg` and records every
/// bin.
pub fn trace_beam(
    cfg: &SearchConfig,
    img: &ImageView<'_, u16>,
    bearing_deg: f32,
) -> Result<BeamTrace, Error> {
    let geom = FanGeometry::new(
        img.width(),
        img.height(),
        cfg.n_beams,
        cfg.field_of_view_deg,
        cfg.start_bin,
        cfg.sonar_vertical_offset,
    );
    let ray = geom.ray_at(bearing_deg.to_radians());
    let sampler = BeamSampler::new(*img, ray);
    let n_bins = if cfg.clip_beams_to_image {
        sampler.leading_inside(geom.n_bins())
    } else {
        geom.n_bins()
    };

    let mut detector = PeakDetector::new(cfg.h_min, cfg.mean_window_size);
    let mut bins = Vec::with_capacity(n_bins);
    let mut runs = Vec::new();
    let mut peaks = Vec::new();
    detector.scan_beam_with(&sampler, n_bins, &mut peaks, |step| {
        bins.push(TraceBin {
            bin: step.bin,
            intensity: step.intensity,
            mean: step.mean,
            accept_level: step.mean + cfg.h_min,
            in_peak: step.in_peak,
            position: ray.bin_position(step.bin),
        });
        if let Some(closed) = step.closed {
            runs.push(closed);
        }
    })?;

    Ok(BeamTrace {
        bearing_deg,
        bins,
        runs,
        peaks,
    })
}

/// Grows every peak of `trace` in ascending threshold order and returns a
/// copy of each segment, empty ones included.
///
/// All peaks share pool handle 0 and the pool's mask, which is reset first.
pub fn grow_trace_peaks<G>(
    trace: &BeamTrace,
    img: &ImageView<'_, u16>,
    grower: &mut G,
    pool: &mut SegmentPool,
) -> Result<Vec<Segment>, Error>
where
    G: RegionGrower + ?Sized,
{
    let mut order: Vec<&PeakRecord> = trace.peaks.iter().collect();
    order.sort_by_key(|p| p.threshold);

    pool.reset_mask(img.height(), img.width());
    let mut out = Vec::with_capacity(order.len());
    for peak in order {
        let seed = pixel_truncated(peak.seed, img.width(), img.height())?;
        let (seg, mask) = pool.slot(0);
        grower.set_threshold(peak.threshold);
        grower.create_segment(seg, mask, img, seed)?;
        out.push(seg.clone());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use ss_core::Image;
    use ss_region::{FloodFillGrower, GrowConfig, SegmentPool};

    use super::{CalibAction, CalibState, grow_trace_peaks, trace_beam};
    use crate::config::SearchConfig;

    #[test]
    fn keys_map_to_actions() {
        let keys: Vec<Option<CalibAction>> = "adwsrfx".chars().map(CalibAction::from_key).collect();
        assert_eq!(
            keys,
            vec![
                Some(CalibAction::BearingLeft),
                Some(CalibAction::BearingRight),
                Some(CalibAction::RaiseHMin),
                Some(CalibAction::LowerHMin),
                Some(CalibAction::GrowWindow),
                Some(CalibAction::ShrinkWindow),
                None,
            ]
        );
    }

    #[test]
    fn starts_at_first_beam() {
        let state = CalibState::from_config(&SearchConfig::default());
        assert_eq!(state.bearing_deg, -65.0);
        assert_eq!(state.h_min, 110);
        assert_eq!(state.mean_window_size, 5);
    }

    #[test]
    fn apply_respects_limits() {
        let mut state = CalibState {
            bearing_deg: -65.0,
            h_min: 3,
            mean_window_size: 1,
        };

        state.apply(CalibAction::BearingRight);
        assert_eq!(state.bearing_deg, -65.0);
        state.apply(CalibAction::BearingLeft);
        assert_eq!(state.bearing_deg, -64.0);

        state.apply(CalibAction::LowerHMin);
        assert_eq!(state.h_min, 1);
        state.apply(CalibAction::LowerHMin);
        assert_eq!(state.h_min, 1);
        state.apply(CalibAction::RaiseHMin);
        assert_eq!(state.h_min, 3);

        state.apply(CalibAction::ShrinkWindow);
        state.apply(CalibAction::ShrinkWindow);
        assert_eq!(state.mean_window_size, 0);
        state.apply(CalibAction::GrowWindow);
        assert_eq!(state.mean_window_size, 1);
    }

    #[test]
    fn bearing_stops_at_upper_limit() {
        let mut state = CalibState {
            bearing_deg: 64.0,
            h_min: 10,
            mean_window_size: 1,
        };
        state.apply(CalibAction::BearingLeft);
        state.apply(CalibAction::BearingLeft);
        assert_eq!(state.bearing_deg, 65.0);
    }

    #[test]
    fn file_name_encodes_parameters() {
        let state = CalibState {
            bearing_deg: -12.0,
            h_min: 110,
            mean_window_size: 5,
        };
        assert_eq!(state.file_name("CalibPlot"), "CalibPlot_B-12.0_Hp110_Wsz5.png");

        let cfg = state.search_config(&SearchConfig {
            h_min: 1,
            n_beams: 3,
            ..SearchConfig::default()
        });
        assert_eq!(cfg.h_min, 110);
        assert_eq!(cfg.n_beams, 3);
    }

    /// Column 4 of a 9x30 image, read upwards by a vertical beam.
    fn traced_image() -> Image<u16> {
        let profile = [10u16, 20, 30, 40, 50, 50, 50, 50, 80, 95, 90, 50, 50, 200, 50];
        Image::from_fn(9, 30, |x, y| {
            let bin = 29 - y;
            if x == 4 && bin < profile.len() {
                profile[bin]
            } else {
                50
            }
        })
    }

    fn trace_config() -> SearchConfig {
        SearchConfig {
            n_beams: 1,
            start_bin: 1,
            field_of_view_deg: 0.0,
            sonar_vertical_offset: 0,
            h_min: 20,
            mean_window_size: 3,
            min_sample_size: 1000,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn trace_records_every_bin() {
        let img = traced_image();
        let trace = trace_beam(&trace_config(), &img.as_view(), 0.0).expect("inside");

        assert_eq!(trace.bins.len(), 29);
        assert_eq!(trace.runs.len(), 2);
        assert_eq!(trace.peaks.len(), 2);
        assert_eq!(trace.peaks[0].threshold, 80);
        assert_eq!(trace.peaks[0].bin, 9);
        assert_eq!(trace.peaks[1].threshold, 200);

        let b8 = trace.bins[8];
        assert_eq!(b8.intensity, 80);
        assert_eq!(b8.mean, 50);
        assert_eq!(b8.accept_level, 70);
        assert!(b8.in_peak);
        assert!(trace.bins[10].in_peak);
        assert!(!trace.bins[11].in_peak);
        assert!((b8.position.y - 21.0).abs() < 1e-4);
    }

    #[test]
    fn trace_peaks_grow_regardless_of_min_size() {
        let img = traced_image();
        let trace = trace_beam(&trace_config(), &img.as_view(), 0.0).expect("inside");
        let mut grower = FloodFillGrower::new(GrowConfig {
            max_gap_px: 0,
            ..GrowConfig::default()
        });
        let mut pool = SegmentPool::new();

        let segs = grow_trace_peaks(&trace, &img.as_view(), &mut grower, &mut pool)
            .expect("inside");
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].threshold(), 80);
        // Rows 20 and 19 exceed 80, row 21 sits on it; the 200 bin on row
        // 16 is cut off by 50s.
        assert_eq!(segs[0].n(), 2);
        assert_eq!(segs[1].n(), 1);
        assert_eq!(pool.segments().len(), 1);
        assert_eq!(pool.mask().visited_count(), 3);
    }
}
