//! bulltrack CLI — arena calibration and offline tracking over frame folders.

use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use bulltrack::{
    render_overlay, to_svg_string, write_csv, ArenaCalibration, RunSummary, SessionConfig,
    TrackResult, TrackingSession,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "bulltrack")]
#[command(about = "Measure distance traveled by a tracked target inside a circular arena")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the pixel ↔ meter homographies from four border clicks.
    Calibrate(CliCalibrateArgs),

    /// Track the selected target over a folder of frames.
    Track(CliTrackArgs),
}

#[derive(Debug, Clone, Args)]
struct CliCalibrateArgs {
    /// Border clicks as `x,y` in N, E, S, W order (pixels).
    #[arg(
        long,
        num_args = 4,
        required = true,
        allow_hyphen_values = true,
        value_parser = parse_point
    )]
    points: Vec<[f64; 2]>,

    /// Arena diameter in meters.
    #[arg(long)]
    diameter: f64,

    /// Path to write the calibration (JSON). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Session configuration (JSON, schema bulltrack.session.v1).
    #[arg(long)]
    config: PathBuf,

    /// Directory of PNG/JPEG frames, processed in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Path to write the trajectory table (CSV).
    #[arg(long)]
    csv: PathBuf,

    /// Path to write the top-down trajectory plot (SVG).
    #[arg(long)]
    svg: PathBuf,

    /// Path to write the run summary (JSON).
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Path to write the last frame with boundary, trail and match drawn on it.
    #[arg(long)]
    overlay: Option<PathBuf>,
}

fn parse_point(s: &str) -> Result<[f64; 2], String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok([x, y])
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Track(args) => run_track(&args),
    }
}

fn run_calibrate(args: &CliCalibrateArgs) -> CliResult<()> {
    let clicks: [[f64; 2]; 4] = args
        .points
        .as_slice()
        .try_into()
        .map_err(|_| -> CliError { "exactly four --points are required".into() })?;
    let calibration = ArenaCalibration::from_compass_points(clicks, args.diameter)?;

    let json = serde_json::to_string_pretty(&calibration)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Calibration written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// PNG/JPEG files in `dir`, sorted by file name.
fn list_frames(dir: &Path) -> CliResult<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_frame = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
            .unwrap_or(false);
        if is_frame {
            frames.push(path);
        }
    }
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

fn load_frame(path: &Path) -> CliResult<image::RgbImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open frame {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_rgb8())
}

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    tracing::info!("Loading session config: {}", args.config.display());
    let cfg = SessionConfig::from_json_file(&args.config)?;

    let frames = list_frames(&args.frames)?;
    let Some(first_path) = frames.first() else {
        return Err(format!("No PNG/JPEG frames in {}", args.frames.display()).into());
    };
    tracing::info!("Found {} frames in {}", frames.len(), args.frames.display());

    let mut session = TrackingSession::from_config(&cfg);
    session.calibrate(cfg.calibration_px, cfg.arena_diameter_m)?;

    let mut last_frame = load_frame(first_path)?;
    let (w, h) = last_frame.dimensions();
    tracing::info!("Frame size: {}x{}", w, h);
    session.select_target(&last_frame, cfg.selection)?;

    let mut last_track: Option<TrackResult> = session
        .process_frame(cfg.frame_time_ms(0), &last_frame)
        .map(|out| out.track);
    for (i, path) in frames.iter().enumerate().skip(1) {
        let frame = load_frame(path)?;
        match session.process_frame(cfg.frame_time_ms(i), &frame) {
            Some(out) => last_track = Some(out.track),
            None => tracing::warn!("No match in {}", path.display()),
        }
        last_frame = frame;
    }

    tracing::info!(
        "Tracked {} frames, total distance {:.2} m",
        session.n_frames(),
        session.total_distance_m()
    );

    if let Some(overlay_path) = &args.overlay {
        let overlay = render_overlay(
            &last_frame,
            session.calibration(),
            session.trajectory(),
            last_track.as_ref(),
        );
        overlay.save(overlay_path)?;
        tracing::info!("Overlay written to {}", overlay_path.display());
    }

    let summary = RunSummary {
        total_distance_m: session.total_distance_m(),
        n_samples: session.trajectory().len(),
        n_frames: session.n_frames(),
        n_rejected_steps: session.n_rejected_steps(),
        arena_diameter_m: Some(cfg.arena_diameter_m),
        pixel_to_metric: session.calibration().map(|c| c.pixel_to_metric),
    };
    let trajectory = session.finish();

    let mut csv = std::io::BufWriter::new(std::fs::File::create(&args.csv)?);
    write_csv(&trajectory, &mut csv)?;
    csv.flush()?;
    tracing::info!("Trajectory table written to {}", args.csv.display());

    std::fs::write(&args.svg, to_svg_string(&trajectory, cfg.arena_diameter_m))?;
    tracing::info!("Trajectory plot written to {}", args.svg.display());

    if let Some(summary_path) = &args.summary {
        std::fs::write(summary_path, summary.to_json_string()?)?;
        tracing::info!("Summary written to {}", summary_path.display());
    }

    Ok(())
}
