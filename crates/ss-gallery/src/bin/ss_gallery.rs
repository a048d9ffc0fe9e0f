use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use serde::Serialize;
use ss_core::{Image, Point2f, to_u16};
use ss_region::{FloodFillGrower, GrowConfig, Segment, SegmentPool};
use ss_search::{
    BeamTrace, CalibAction, CalibState, JsonConfigSource, PeakSearchSegmenter, SearchConfig,
    SegmentationStats, grow_trace_peaks, load_grow_config, trace_beam,
};

const PALETTE: [Rgb<u8>; 8] = [
    Rgb([230, 25, 75]),
    Rgb([60, 180, 75]),
    Rgb([255, 225, 25]),
    Rgb([0, 130, 200]),
    Rgb([245, 130, 48]),
    Rgb([145, 30, 180]),
    Rgb([70, 240, 240]),
    Rgb([240, 50, 230]),
];

const PLOT_HEIGHT: u32 = 256;

#[derive(Parser, Debug)]
#[command(name = "ss_gallery")]
#[command(about = "Run sonar segmentation and beam calibration on image files")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(name = "segment")]
    Segment(SegmentArgs),
    #[command(name = "calib")]
    Calib(CalibArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// 8 or 16-bit grayscale sonar image
    #[arg(long, required = true)]
    input: PathBuf,
    /// JSON file with `general`, `peak_search` and `grow` sections
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "out")]
    out: PathBuf,
}

#[derive(Args, Debug, Clone)]
struct SegmentArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
struct CalibArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Beam bearing in degrees; defaults to the first beam of the fan
    #[arg(long, allow_negative_numbers = true)]
    bearing: Option<f32>,
    #[arg(long)]
    h_min: Option<i32>,
    #[arg(long)]
    window: Option<usize>,
    /// Key presses applied in order: a/d bearing, w/s h_min, r/f window
    #[arg(long, default_value = "")]
    actions: String,
}

#[derive(Debug, Clone, Serialize)]
struct SegmentDto {
    index: usize,
    seed: [usize; 2],
    threshold: i32,
    n: usize,
    /// `[min_x, min_y, max_x, max_y]`
    bbox: Option<[usize; 4]>,
    mean_intensity: f32,
    max_intensity: u16,
}

#[derive(Debug, Clone, Serialize)]
struct SegmentsReport {
    width: usize,
    height: usize,
    config: SearchConfig,
    stats: SegmentationStats,
    segments: Vec<SegmentDto>,
}

#[derive(Debug, Clone, Serialize)]
struct PeakDto {
    beam: usize,
    bin: usize,
    threshold: i32,
    seed: [f32; 2],
}

#[derive(Debug, Clone, Serialize)]
struct MetaCalib {
    bearing_deg: f32,
    h_min: i32,
    mean_window_size: usize,
    bins: usize,
    peaks: Vec<PeakDto>,
    segment_sizes: Vec<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Segment(args) => run_segment(args),
        Command::Calib(args) => run_calib(args),
    }
}

fn run_segment(args: SegmentArgs) -> Result<()> {
    let out_dir = prepare_out_dir(&args.common)?;
    let (cfg, grow_cfg) = load_configs(args.common.config.as_deref())?;
    let img = load_input_u16(&args.common.input)?;

    let mut segmenter = PeakSearchSegmenter::new(cfg.clone());
    let mut grower = FloodFillGrower::new(grow_cfg);
    let mut pool = SegmentPool::new();
    let segments = segmenter
        .segment(&img.as_view(), &mut grower, &mut pool)
        .with_context(|| format!("segmenting {}", args.common.input.display()))?;
    let stats = segmenter.last_stats();
    tracing::info!(
        "{}: {} peaks, {} segments kept, {} discarded",
        args.common.input.display(),
        stats.peaks,
        stats.kept,
        stats.discarded
    );

    write_json(
        out_dir.join("segments.json"),
        &SegmentsReport {
            width: img.width(),
            height: img.height(),
            config: cfg,
            stats,
            segments: segments.iter().enumerate().map(segment_dto).collect(),
        },
    )?;
    let peaks: Vec<PeakDto> = segmenter
        .peaks()
        .iter()
        .map(|p| PeakDto {
            beam: p.beam,
            bin: p.bin,
            threshold: p.threshold,
            seed: [p.seed.x, p.seed.y],
        })
        .collect();
    write_json(out_dir.join("peaks.json"), &peaks)?;

    let mut overlay = gray_to_rgb(&img)?;
    paint_segments(&mut overlay, segments);
    for seg in segments {
        let seed = seg.seed();
        draw_dot(&mut overlay, seed.x as f32, seed.y as f32, Rgb([255, 255, 255]));
    }
    overlay
        .save(out_dir.join("overlay.png"))
        .context("writing segment overlay.png")?;

    Ok(())
}

fn run_calib(args: CalibArgs) -> Result<()> {
    let out_dir = prepare_out_dir(&args.common)?;
    let (cfg, grow_cfg) = load_configs(args.common.config.as_deref())?;
    let img = load_input_u16(&args.common.input)?;

    let mut state = CalibState::from_config(&cfg);
    if let Some(bearing) = args.bearing {
        state.bearing_deg = bearing;
    }
    if let Some(h_min) = args.h_min {
        state.h_min = h_min;
    }
    if let Some(window) = args.window {
        state.mean_window_size = window;
    }
    for key in args.actions.chars() {
        let Some(action) = CalibAction::from_key(key) else {
            bail!("unknown calibration key '{key}', expected one of a, d, w, s, r, f");
        };
        state.apply(action);
    }

    let trace_cfg = state.search_config(&cfg);
    let trace = trace_beam(&trace_cfg, &img.as_view(), state.bearing_deg)
        .with_context(|| format!("tracing beam at {:.1} deg", state.bearing_deg))?;
    let mut grower = FloodFillGrower::new(grow_cfg);
    let mut pool = SegmentPool::new();
    let segments = grow_trace_peaks(&trace, &img.as_view(), &mut grower, &mut pool)
        .context("growing traced peaks")?;
    tracing::info!(
        "bearing {:.1}: {} bins, {} peaks",
        state.bearing_deg,
        trace.bins.len(),
        trace.peaks.len()
    );

    let profile_path = out_dir.join(state.file_name("CalibProfile")).with_extension("csv");
    write_profile_csv(profile_path, &trace)?;

    render_plot(&trace)
        .save(out_dir.join(state.file_name("CalibPlot")))
        .context("writing calibration plot")?;

    let mut overlay = gray_to_rgb(&img)?;
    paint_segments(&mut overlay, &segments);
    for bin in &trace.bins {
        let color = if bin.in_peak {
            Rgb([255, 64, 64])
        } else {
            Rgb([255, 255, 0])
        };
        put_checked(&mut overlay, bin.position, color);
    }
    for peak in &trace.peaks {
        draw_dot(&mut overlay, peak.seed.x, peak.seed.y, Rgb([255, 255, 255]));
    }
    overlay
        .save(out_dir.join(state.file_name("CalibResult")))
        .context("writing calibration overlay")?;

    write_json(
        out_dir.join(state.file_name("CalibMeta")).with_extension("json"),
        &MetaCalib {
            bearing_deg: state.bearing_deg,
            h_min: state.h_min,
            mean_window_size: state.mean_window_size,
            bins: trace.bins.len(),
            peaks: trace
                .peaks
                .iter()
                .map(|p| PeakDto {
                    beam: p.beam,
                    bin: p.bin,
                    threshold: p.threshold,
                    seed: [p.seed.x, p.seed.y],
                })
                .collect(),
            segment_sizes: segments.iter().map(Segment::n).collect(),
        },
    )?;

    Ok(())
}

fn prepare_out_dir(common: &CommonArgs) -> Result<PathBuf> {
    ensure_file_exists(&common.input, "input")?;
    if let Some(config) = &common.config {
        ensure_file_exists(config, "config")?;
    }
    fs::create_dir_all(&common.out)
        .with_context(|| format!("creating output directory {}", common.out.display()))?;
    Ok(common.out.clone())
}

fn load_configs(path: Option<&Path>) -> Result<(SearchConfig, GrowConfig)> {
    let mut cfg = SearchConfig::default();
    let mut grow_cfg = GrowConfig::default();
    if let Some(path) = path {
        let src = JsonConfigSource::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?;
        cfg.load(&src);
        load_grow_config(&mut grow_cfg, &src);
    }
    Ok((cfg, grow_cfg))
}

/// 16-bit inputs keep their values; everything else is read as 8-bit luma
/// and widened without rescaling.
fn load_input_u16(path: &Path) -> Result<Image<u16>> {
    let dyn_img =
        image::open(path).with_context(|| format!("opening input image {}", path.display()))?;
    let is_16bit = matches!(
        dyn_img,
        DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_)
    );

    if is_16bit {
        let luma = dyn_img.into_luma16();
        let (w, h) = luma.dimensions();
        return Image::from_vec(w as usize, h as usize, luma.into_raw())
            .with_context(|| format!("constructing image from {}", path.display()));
    }

    let luma = dyn_img.into_luma8();
    let (w, h) = luma.dimensions();
    let img8 = Image::from_vec(w as usize, h as usize, luma.into_raw())
        .with_context(|| format!("constructing image from {}", path.display()))?;
    Ok(to_u16(&img8.as_view()))
}

fn segment_dto((index, seg): (usize, &Segment)) -> SegmentDto {
    SegmentDto {
        index,
        seed: [seg.seed().x, seg.seed().y],
        threshold: seg.threshold(),
        n: seg.n(),
        bbox: seg.bbox().map(|b| [b.min_x, b.min_y, b.max_x, b.max_y]),
        mean_intensity: seg.mean_intensity(),
        max_intensity: seg.max_intensity(),
    }
}

/// Min-max stretch of the 16-bit input into a displayable RGB image.
fn gray_to_rgb(img: &Image<u16>) -> Result<RgbImage> {
    let (lo, hi) = img
        .data()
        .iter()
        .fold((u16::MAX, 0u16), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = f32::from(hi.saturating_sub(lo)).max(1.0);
    let data = img
        .data()
        .iter()
        .map(|&v| (f32::from(v - lo) * 255.0 / range).round() as u8)
        .collect();

    let gray = GrayImage::from_raw(img.width() as u32, img.height() as u32, data)
        .context("constructing GrayImage from raw bytes")?;
    Ok(DynamicImage::ImageLuma8(gray).to_rgb8())
}

fn paint_segments(img: &mut RgbImage, segments: &[Segment]) {
    for (i, seg) in segments.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        for px in seg.pixels() {
            let (x, y) = (px.x as u32, px.y as u32);
            if x < img.width() && y < img.height() {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Intensity (black), background mean (blue) and acceptance level (red)
/// against bin, with closed-run maxima marked.
fn render_plot(trace: &BeamTrace) -> RgbImage {
    let width = trace.bins.len().max(1) as u32;
    let mut plot = RgbImage::from_pixel(width, PLOT_HEIGHT, Rgb([255, 255, 255]));
    let top = trace
        .bins
        .iter()
        .map(|b| b.intensity.max(b.accept_level))
        .max()
        .unwrap_or(1)
        .max(1) as f32;
    let to_y = |v: i32| {
        let t = (v.max(0) as f32 / top).min(1.0);
        ((1.0 - t) * (PLOT_HEIGHT - 1) as f32).round() as u32
    };

    for (x, b) in trace.bins.iter().enumerate() {
        let x = x as u32;
        if b.in_peak {
            for y in 0..PLOT_HEIGHT {
                plot.put_pixel(x, y, Rgb([235, 235, 235]));
            }
        }
        plot.put_pixel(x, to_y(b.accept_level), Rgb([220, 40, 40]));
        plot.put_pixel(x, to_y(b.mean), Rgb([40, 40, 220]));
        plot.put_pixel(x, to_y(b.intensity), Rgb([0, 0, 0]));
    }

    for (i, run) in trace.runs.iter().enumerate() {
        let x = run.run.max_bin as f32;
        let y = to_y(run.mean + run.run.max_height) as f32;
        draw_dot(&mut plot, x, y, PALETTE[i % PALETTE.len()]);
    }

    plot
}

fn write_profile_csv(path: PathBuf, trace: &BeamTrace) -> Result<()> {
    let mut file =
        fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    writeln!(file, "bin,intensity,mean,accept,in_peak").context("writing csv header")?;
    for b in &trace.bins {
        writeln!(
            file,
            "{},{},{},{},{}",
            b.bin,
            b.intensity,
            b.mean,
            b.accept_level,
            u8::from(b.in_peak)
        )
        .context("writing csv row")?;
    }
    Ok(())
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}

fn put_checked(img: &mut RgbImage, p: Point2f, color: Rgb<u8>) {
    if p.x < 0.0 || p.y < 0.0 {
        return;
    }
    let (x, y) = (p.x as u32, p.y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

fn draw_dot(img: &mut RgbImage, x: f32, y: f32, color: Rgb<u8>) {
    let xi = x.round() as i32;
    let yi = y.round() as i32;

    for dy in -1..=1 {
        for dx in -1..=1 {
            let nx = xi + dx;
            let ny = yi + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            let (ux, uy) = (nx as u32, ny as u32);
            if ux >= img.width() || uy >= img.height() {
                continue;
            }
            img.put_pixel(ux, uy, color);
        }
    }
}

fn ensure_file_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} file does not exist: {}", what, path.display());
    }
    if !path.is_file() {
        bail!("{} path is not a file: {}", what, path.display());
    }
    Ok(())
}
