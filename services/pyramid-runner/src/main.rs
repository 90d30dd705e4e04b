//! Forest-loss pyramid runner.
//!
//! Loads native-resolution loss rasters (or generates synthetic ones),
//! builds the zoom-level pyramid, quantizes each level, and exports PNG
//! tiles to a local directory.

mod provider;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pyramid::{testdata, PyramidBuilder, PyramidError, ScalingConfig, ZoomConfig};
use tiler::{pack, ObjectStoreSink, TileExporter};

#[derive(Parser, Debug)]
#[command(name = "pyramid-runner")]
#[command(about = "Builds and exports forest-loss tile pyramids")]
struct Args {
    /// Directory holding raw f32 band files (year, quantity, secondary,
    /// uncertainty)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for exported tiles
    #[arg(short, long)]
    out: PathBuf,

    /// Native grid width in cells
    #[arg(long, default_value_t = 512)]
    width: usize,

    /// Native grid height in cells
    #[arg(long, default_value_t = 512)]
    height: usize,

    /// Generate synthetic test data instead of reading band files
    #[arg(long)]
    synthetic: bool,

    /// Tile edge length in cells
    #[arg(long, default_value_t = 256)]
    tile_size: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Configuration problems must surface before any reduction begins.
    if args.width == 0 || args.height == 0 {
        anyhow::bail!("--width and --height must be nonzero");
    }
    let zoom_config = ZoomConfig::from_env();
    zoom_config.validate().context("invalid zoom level table")?;
    let scaling = ScalingConfig::from_env();
    scaling.validate().context("invalid scaling configuration")?;

    info!(
        levels = zoom_config.num_levels(),
        threshold = zoom_config.canopy_threshold,
        "starting pyramid run"
    );

    let native_resolution = zoom_config.native().resolution_m;
    let native = if args.synthetic {
        info!(width = args.width, height = args.height, "generating synthetic bands");
        testdata::synthetic_bands(args.width, args.height, native_resolution)?
    } else {
        let input = args
            .input
            .as_deref()
            .context("--input is required unless --synthetic is set")?;
        provider::load_bands(input, args.width, args.height, native_resolution)?
    };

    // Ctrl-C requests cancellation; the builder checks the flag between
    // work units.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("cancellation requested");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;
    let sink = Arc::new(ObjectStoreSink::local(&args.out)?);
    let exporter = TileExporter::new(sink, args.tile_size)?;

    let threshold = zoom_config.canopy_threshold;
    let builder = PyramidBuilder::new(zoom_config).with_cancel(cancel);
    let handle = tokio::runtime::Handle::current();

    // The build is CPU-bound; run it off the async executor and bridge back
    // for tile writes.
    tokio::task::spawn_blocking(move || {
        builder.build(native, |level| {
            let (packed, stats) =
                pack(&level.bands, &scaling).map_err(|e| PyramidError::config(e.to_string()))?;

            if stats.total() > 0 {
                warn!(
                    zoom = level.zoom,
                    quantity = stats.quantity,
                    secondary = stats.secondary,
                    uncertainty = stats.uncertainty,
                    "values clamped during quantization; review scaling maxima"
                );
            }

            let report = handle
                .block_on(exporter.export_level(threshold, level.zoom, &packed))
                .map_err(|e| PyramidError::config(e.to_string()))?;

            if !report.failed.is_empty() {
                warn!(
                    zoom = level.zoom,
                    failed = report.failed.len(),
                    "tiles failed to persist; keys logged above for retry"
                );
            }

            info!(
                zoom = level.zoom,
                width = level.bands.width(),
                height = level.bands.height(),
                tiles = report.written,
                "level exported"
            );
            Ok(())
        })
    })
    .await??;

    info!("pyramid run complete");
    Ok(())
}
