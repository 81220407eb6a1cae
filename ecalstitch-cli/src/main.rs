//! ecalstitch CLI: stitch ECAL barrel and endcap hits into per-event images.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

use clap::{Parser, Subcommand, ValueEnum};

use ecalstitch_algorithms::{EcalStitcher, RunStatistics, StitchConfig, StitchLayout};
use ecalstitch_core::EndcapSide;
use ecalstitch_io::{
    load_geometry, EventReader, ImageFileWriter, ImageFormat, ImageSink, MonitorFormat,
    MonitorWriter,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    StitchIo(#[from] ecalstitch_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] ecalstitch_core::Error),

    #[error("event {index}: {source}")]
    Event {
        index: usize,
        source: ecalstitch_core::Error,
    },
}

/// Output image encoding.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Little-endian f32, one image after another
    Bin,
    /// One comma-separated line per event
    Csv,
}

impl From<Format> for ImageFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Bin => ImageFormat::Binary,
            Format::Csv => ImageFormat::Csv,
        }
    }
}

/// ECAL barrel/endcap image stitcher.
#[derive(Parser)]
#[command(name = "ecalstitch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stitch every event of a JSON-lines file into images
    Process {
        /// Input events, one JSON object per line
        #[arg(short, long)]
        events: PathBuf,

        /// Endcap geometry dump (JSON)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,

        /// Monitor profile output (.json or .csv)
        #[arg(short, long)]
        monitor: Option<PathBuf>,

        /// Stitch configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output image encoding
        #[arg(short, long, value_enum, default_value = "bin")]
        format: Format,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the image layout derived from a configuration
    Layout {
        /// Stitch configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<StitchConfig> {
    match path {
        Some(path) => Ok(StitchConfig::from_file(path)?),
        None => Ok(StitchConfig::default()),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn print_layout(layout: &StitchLayout) {
    let minus = layout.endcap_offsets(EndcapSide::Minus);
    let plus = layout.endcap_offsets(EndcapSide::Plus);
    let barrel = layout.barrel_ieta_max();
    let endcap = layout.endcap_rows();

    println!(
        "Image: {} rows x {} columns ({} pixels)",
        layout.rows(),
        layout.cols(),
        layout.len()
    );
    println!(
        "Signed ieta range: [{}, {})",
        layout.signed_row_min(),
        layout.signed_row_end()
    );
    println!(
        "{:<6} | {:<12} | {:<12}",
        "Band", "Image rows", "Signed ieta"
    );
    println!("{:-<36}", "");
    println!(
        "{:<6} | {:<12} | {:<12}",
        "EE-",
        format!("[{}, {})", minus.global, minus.global + endcap),
        format!("[{}, {})", minus.signed, minus.signed + endcap as i32),
    );
    println!(
        "{:<6} | {:<12} | {:<12}",
        "EB",
        format!(
            "[{}, {})",
            layout.barrel_global_row(-(barrel as i32)),
            layout.barrel_global_row(barrel as i32 - 1) + 1
        ),
        format!("[{}, {})", -(barrel as i32), barrel),
    );
    println!(
        "{:<6} | {:<12} | {:<12}",
        "EE+",
        format!("[{}, {})", plus.global, plus.global + endcap),
        format!("[{}, {})", plus.signed, plus.signed + endcap as i32),
    );
    println!(
        "Endcap phi column c lands at image column (c + {}) mod {}",
        layout.endcap_column(0),
        layout.cols()
    );
}

fn process(
    events: &Path,
    geometry: &Path,
    output: &Path,
    monitor_path: Option<&Path>,
    config: Option<&Path>,
    format: Format,
) -> Result<()> {
    let config = load_config(config)?;
    let geometry = load_geometry(geometry)?;
    let mut stitcher = EcalStitcher::new(&config, geometry)?;
    let mut image = stitcher.new_image();
    let mut monitor = stitcher.new_monitor();

    log::debug!(
        "layout: {} x {}, barrel offset {}",
        stitcher.layout().rows(),
        stitcher.layout().cols(),
        stitcher.layout().barrel_offset()
    );

    let mut sink = ImageFileWriter::create(output, format.into(), stitcher.layout().len())?;
    log::info!("writing images to {}", output.display());

    let start = Instant::now();
    let mut run = RunStatistics::default();
    for (index, event) in EventReader::open(events)?.enumerate() {
        let event = event?;
        let stats = stitcher
            .process_event(&event, &mut image, &mut monitor)
            .map_err(|source| CliError::Event { index, source })?;
        sink.write_image(image.as_slice())?;
        run.record(stats);
    }
    sink.flush()?;

    let snapshot = monitor.finalize();
    if let Some(path) = monitor_path {
        MonitorWriter::create(path, MonitorFormat::from_path(path))?.write(&snapshot)?;
        log::info!("monitor written to {}", path.display());
    }

    let elapsed = start.elapsed();
    println!(
        "Processed {} events in {:.2}s",
        run.events,
        elapsed.as_secs_f64()
    );
    println!("Barrel hits: {}", run.totals.barrel_hits);
    println!(
        "Endcap hits: {} ({} bins)",
        run.totals.endcap_hits, run.totals.endcap_bins
    );
    println!("Zero-energy hits skipped: {}", run.totals.zero_energy_skipped);
    if run.events > 0 {
        println!(
            "Mean filled pixels per event: {:.1}",
            (run.totals.barrel_hits + run.totals.endcap_bins) as f64 / run.events as f64
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            events,
            geometry,
            output,
            monitor,
            config,
            format,
            verbose,
        } => {
            init_logging(verbose);
            process(
                &events,
                &geometry,
                &output,
                monitor.as_deref(),
                config.as_deref(),
                format,
            )?;
        }

        Commands::Layout { config } => {
            init_logging(false);
            let config = load_config(config.as_deref())?;
            print_layout(&config.layout());
        }
    }

    Ok(())
}
