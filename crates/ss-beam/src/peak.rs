use ss_core::{Error, Point2f};

use crate::geometry::BeamSampler;
use crate::window::RunningWindow;

/// Extremes of the current above-background run on one beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakRun {
    pub start_bin: usize,
    pub min_height: i32,
    pub min_bin: usize,
    pub max_height: i32,
    pub max_bin: usize,
}

impl PeakRun {
    fn open(bin: usize, height: i32) -> Self {
        Self {
            start_bin: bin,
            min_height: height,
            min_bin: bin,
            max_height: height,
            max_bin: bin,
        }
    }

    // At most one extreme moves per bin, and only on strict improvement:
    // equal heights keep the earliest bin.
    fn update(&mut self, bin: usize, height: i32) {
        if height > self.max_height {
            self.max_height = height;
            self.max_bin = bin;
        } else if height < self.min_height {
            self.min_height = height;
            self.min_bin = bin;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Background,
    InPeak(PeakRun),
}

/// A peak run that ended on a background bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedRun {
    pub run: PeakRun,
    /// First background bin after the run.
    pub end_bin: usize,
    /// Background mean at `end_bin`.
    pub mean: i32,
    /// Region acceptance level: `mean + run.min_height`.
    pub threshold: i32,
}

/// Outcome of feeding one bin to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinStep {
    pub bin: usize,
    pub intensity: i32,
    pub mean: i32,
    pub height: i32,
    /// Whether the detector is inside a run after this bin.
    pub in_peak: bool,
    pub closed: Option<ClosedRun>,
}

/// Seed for region growing produced by one closed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakRecord {
    pub threshold: i32,
    /// Position of the run's strongest bin.
    pub seed: Point2f,
    pub beam: usize,
    pub bin: usize,
}

/// Background/peak state machine applied bin by bin along a beam.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    h_min: i32,
    window: RunningWindow,
    state: ScanState,
}

impl PeakDetector {
    pub fn new(h_min: i32, mean_window_size: usize) -> Self {
        Self {
            h_min,
            window: RunningWindow::new(mean_window_size),
            state: ScanState::Background,
        }
    }

    pub fn set_h_min(&mut self, h_min: i32) {
        self.h_min = h_min;
    }

    pub fn set_window_size(&mut self, size: usize) {
        if size != self.window.capacity() {
            self.window.resize(size);
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Resets the background window and leaves any open run behind.
    pub fn begin_beam(&mut self) {
        self.window.clear();
        self.state = ScanState::Background;
    }

    pub fn step(&mut self, bin: usize, intensity: i32) -> BinStep {
        let mean = self.window.mean();
        let height = intensity - mean;
        let mut closed = None;

        self.state = match self.state {
            ScanState::Background if height > self.h_min => {
                ScanState::InPeak(PeakRun::open(bin, height))
            }
            ScanState::Background => ScanState::Background,
            ScanState::InPeak(mut run) if height > self.h_min => {
                run.update(bin, height);
                ScanState::InPeak(run)
            }
            ScanState::InPeak(run) => {
                closed = Some(ClosedRun {
                    run,
                    end_bin: bin,
                    mean,
                    threshold: mean + run.min_height,
                });
                ScanState::Background
            }
        };

        let in_peak = matches!(self.state, ScanState::InPeak(_));
        if !in_peak {
            self.window.push(intensity);
        }

        BinStep {
            bin,
            intensity,
            mean,
            height,
            in_peak,
            closed,
        }
    }

    /// Runs a whole profile as one beam. A run still open after the last
    /// value is dropped.
    pub fn scan_profile(&mut self, profile: &[i32]) -> Vec<ClosedRun> {
        self.begin_beam();
        profile
            .iter()
            .enumerate()
            .filter_map(|(bin, &v)| self.step(bin, v).closed)
            .collect()
    }

    /// Scans `n_bins` bins of one beam and appends a record per closed run.
    ///
    /// Returns the number of records appended.
    pub fn scan_beam(
        &mut self,
        sampler: &BeamSampler<'_>,
        n_bins: usize,
        out: &mut Vec<PeakRecord>,
    ) -> Result<usize, Error> {
        self.scan_beam_with(sampler, n_bins, out, |_| {})
    }

    /// Same as [`Self::scan_beam`], reporting every bin to `observe`.
    pub fn scan_beam_with<F: FnMut(&BinStep)>(
        &mut self,
        sampler: &BeamSampler<'_>,
        n_bins: usize,
        out: &mut Vec<PeakRecord>,
        mut observe: F,
    ) -> Result<usize, Error> {
        self.begin_beam();
        let ray = *sampler.ray();
        let before = out.len();

        for bin in 0..n_bins {
            let step = self.step(bin, sampler.sample(bin)?);
            observe(&step);

            if let Some(closed) = step.closed {
                out.push(PeakRecord {
                    threshold: closed.threshold,
                    seed: ray.bin_position(closed.run.max_bin),
                    beam: ray.index,
                    bin: closed.run.max_bin,
                });
            }
        }

        Ok(out.len() - before)
    }
}
