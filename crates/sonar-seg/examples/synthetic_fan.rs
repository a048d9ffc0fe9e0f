//! Example: segmentation of a synthetic sonar fan.
//!
//! Renders a speckled fan with a handful of circular targets, runs the peak
//! search segmenter on it and writes one JSON record per kept segment.
//! Timing and per-stage counters are printed to stdout.
//!
//! Run from the workspace root:
//!   cargo run -p sonar-seg --example synthetic_fan -- --help
//!   cargo run -p sonar-seg --example synthetic_fan -- --h-min 90 --out segs.json

use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use sonar_seg::{
    FloodFillGrower, GrowConfig, Image, PeakSearchSegmenter, SearchConfig, SegmentPool,
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Segment a synthetic sonar fan image")]
struct Args {
    #[arg(long, default_value_t = 1200)]
    width: usize,

    #[arg(long, default_value_t = 512)]
    height: usize,

    /// Number of circular targets scattered over the fan
    #[arg(long, default_value_t = 6)]
    targets: usize,

    /// Minimum peak height above the background mean
    #[arg(long, default_value_t = 110)]
    h_min: i32,

    /// Background bins averaged for the running mean
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// Longest dark gap the region grower may bridge
    #[arg(long, default_value_t = 2)]
    max_gap: usize,

    /// Seed for the speckle and target placement
    #[arg(long, default_value_t = 7)]
    seed: u32,

    /// Output JSON path
    #[arg(long, default_value = "synthetic_fan_segments.json")]
    out: String,
}

// ── JSON DTOs ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SegmentDto {
    seed: [usize; 2],
    threshold: i32,
    n: usize,
    mean_intensity: f32,
    max_intensity: u16,
}

#[derive(Serialize)]
struct Report {
    width: usize,
    height: usize,
    /// Wall-clock time of the segmentation call, in milliseconds.
    elapsed_ms: f64,
    peaks: usize,
    segments: Vec<SegmentDto>,
}

// ── Scene ─────────────────────────────────────────────────────────────────────

struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    fn unit(&mut self) -> f32 {
        (self.next() % 10_000) as f32 / 10_000.0
    }
}

/// Targets land in the central upper part of the image, where the default
/// fan covers them.
fn render_scene(args: &Args) -> Image<u16> {
    let mut rng = XorShift(args.seed.max(1));
    let (w, h) = (args.width as f32, args.height as f32);
    let targets: Vec<(f32, f32, f32, u16)> = (0..args.targets)
        .map(|_| {
            let cx = w * (0.3 + 0.4 * rng.unit());
            let cy = h * (0.1 + 0.4 * rng.unit());
            let r = 6.0 + 20.0 * rng.unit();
            let level = 500 + (rng.next() % 1500) as u16;
            (cx, cy, r, level)
        })
        .collect();

    Image::from_fn(args.width, args.height, |x, y| {
        let speckle = (rng.next() % 40) as u16;
        let mut value = 40 + speckle;
        for &(cx, cy, r, level) in &targets {
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            if dx * dx + dy * dy < r * r {
                value = value.max(level + speckle);
            }
        }
        value
    })
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    if args.width == 0 || args.height == 0 {
        bail!("image size must be non-zero, got {}x{}", args.width, args.height);
    }

    let img = render_scene(&args);
    println!(
        "rendered {}x{} fan with {} targets",
        args.width, args.height, args.targets
    );

    let cfg = SearchConfig {
        h_min: args.h_min,
        mean_window_size: args.window,
        clip_beams_to_image: true,
        ..SearchConfig::default()
    };
    println!(
        "config: h_min={}, window={}, max_gap={}",
        cfg.h_min, cfg.mean_window_size, args.max_gap
    );

    let mut segmenter = PeakSearchSegmenter::new(cfg);
    let mut grower = FloodFillGrower::new(GrowConfig {
        max_gap_px: args.max_gap,
        ..GrowConfig::default()
    });
    let mut pool = SegmentPool::new();

    let t0 = Instant::now();
    let segments = segmenter
        .segment(&img.as_view(), &mut grower, &mut pool)
        .context("segmenting synthetic fan")?;
    let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;

    let stats = segmenter.last_stats();
    println!(
        "{} peaks, {} segments kept, {} discarded, {} px claimed ({elapsed_ms:.2} ms)",
        stats.peaks, stats.kept, stats.discarded, stats.visited_px
    );

    if stats.peaks == 0 {
        println!("no peaks above h_min={}; try a lower --h-min", args.h_min);
    }

    let report = Report {
        width: args.width,
        height: args.height,
        elapsed_ms,
        peaks: stats.peaks,
        segments: segments
            .iter()
            .map(|s| SegmentDto {
                seed: [s.seed().x, s.seed().y],
                threshold: s.threshold(),
                n: s.n(),
                mean_intensity: s.mean_intensity(),
                max_intensity: s.max_intensity(),
            })
            .collect(),
    };

    let out_file =
        std::fs::File::create(&args.out).with_context(|| format!("creating {}", args.out))?;
    serde_json::to_writer_pretty(out_file, &report)
        .with_context(|| format!("writing JSON to {}", args.out))?;

    println!("results written to {}", args.out);
    Ok(())
}
