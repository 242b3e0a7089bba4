//! shape-targets CLI: polygon detection on grayscale images.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use shape_targets::detect::{self, DetectError};
use shape_targets::{PolygonDetectorConfig, PolygonDetectorParams, ThresholdConfig};

#[derive(Parser)]
#[command(name = "shape-targets")]
#[command(about = "Detect polygonal targets (squares, triangles, ...) in grayscale images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect polygons in an image and print them as JSON.
    Detect(DetectArgs),

    /// Print the default detector configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image (any format the `image` crate reads).
    #[arg(long)]
    image: PathBuf,

    /// Detector configuration (JSON, flat form as printed by `default-config`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Allowed vertex counts, overriding the configuration (e.g. `4` or `3,4`).
    #[arg(long, value_delimiter = ',')]
    sides: Option<Vec<usize>>,

    /// Binarization: `otsu`, `fixed:<0-255>` or `local:<radius>`.
    #[arg(long, default_value = "otsu", value_parser = parse_threshold_arg)]
    threshold: ThresholdArg,

    /// Shapes are lighter than the background.
    #[arg(long)]
    light: bool,

    /// Keep raw contours and per-contour outcomes in the output.
    #[arg(long)]
    diagnostics: bool,

    /// Write the result here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace. With the `tracing`
    /// feature, `RUST_LOG` overrides it when set.
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ThresholdArg {
    Otsu,
    Fixed(u8),
    Local(usize),
}

/// Offset below the local mean a pixel must reach to count as foreground.
const LOCAL_MEAN_BIAS: f32 = 5.0;

impl ThresholdArg {
    fn to_config(self, light: bool) -> ThresholdConfig {
        let down = !light;
        match self {
            ThresholdArg::Otsu => ThresholdConfig::Otsu { down },
            ThresholdArg::Fixed(threshold) => ThresholdConfig::Fixed { threshold, down },
            ThresholdArg::Local(radius) => ThresholdConfig::LocalMean {
                radius,
                bias: LOCAL_MEAN_BIAS,
                down,
            },
        }
    }
}

fn parse_threshold_arg(s: &str) -> Result<ThresholdArg, String> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("otsu") {
        return Ok(ThresholdArg::Otsu);
    }
    let (kind, value) = s
        .split_once(':')
        .ok_or_else(|| format!("unknown threshold '{s}' (expected otsu, fixed:N or local:R)"))?;
    match kind {
        "fixed" => value
            .parse::<u8>()
            .map(ThresholdArg::Fixed)
            .map_err(|e| format!("invalid fixed threshold '{value}': {e}")),
        "local" => match value.parse::<usize>() {
            Ok(0) => Err("local radius must be at least 1".to_string()),
            Ok(r) => Ok(ThresholdArg::Local(r)),
            Err(e) => Err(format!("invalid local radius '{value}': {e}")),
        },
        _ => Err(format!(
            "unknown threshold kind '{kind}' (expected fixed or local)"
        )),
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidConfig(#[from] shape_targets::polygon::PolygonConfigError),
    #[error(transparent)]
    Detect(#[from] DetectError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::DefaultConfig => print_default_config(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: LevelFilter) {
    #[cfg(feature = "tracing")]
    shape_targets::init_tracing(false, level);
    #[cfg(not(feature = "tracing"))]
    {
        let _ = shape_targets::init_with_level(level);
    }
}

fn print_default_config() -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&PolygonDetectorConfig::default())?;
    println!("{json}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PolygonDetectorConfig, CliError> {
    let Some(path) = path else {
        return Ok(PolygonDetectorConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })
}

fn build_params(args: &DetectArgs) -> Result<PolygonDetectorParams, CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(sides) = &args.sides {
        config.number_of_sides = sides.clone();
    }
    if args.diagnostics {
        config.diagnostics = true;
    }
    Ok(config.into_params()?)
}

fn run_detect(args: &DetectArgs) -> Result<(), CliError> {
    init_logging(args.log_level);

    let params = build_params(args)?;
    let threshold = args.threshold.to_config(args.light);

    let img = image::open(&args.image)
        .map_err(|source| CliError::Image {
            path: args.image.clone(),
            source,
        })?
        .to_luma8();
    log::info!(
        "{}: {}x{}, sides {:?}, threshold {:?}",
        args.image.display(),
        img.width(),
        img.height(),
        params.number_of_sides,
        threshold
    );

    let result = detect::detect_polygons(&img, &threshold, params)?;
    log::info!("detected {} polygons", result.polygons.len());

    let json = serde_json::to_string_pretty(&result)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).map_err(|source| CliError::Write {
                path: path.clone(),
                source,
            })?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
