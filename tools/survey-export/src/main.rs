//! survey-export: batch jobs over body-map survey files.
//!
//! Usage:
//!   survey-export export -i survey.json -o pixelmaps.zip   (-o - streams to stdout)
//!   survey-export areas  -i survey.json [-o areas.json]
//!   survey-export bins   -i survey.json --side FemaleFront [--bin-width 10 --bin-height 10]
//!   survey-export merge  -i survey.json --side MaleBack [-o merged.json]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bodymap_core::bin_factory::BinFactory;
use bodymap_core::config::{BinAllocation, Config};
use bodymap_core::export::{AreaJob, ExportJob};
use bodymap_core::model::{AnatomicalSide, PersonaDrawing};
use bodymap_core::progress::ProgressEvent;
use bodymap_core::sensation_map::drawn_points;
use bodymap_core::surface::RgbaSurfaceProvider;
use bodymap_core::survey::{parse_records, Survey};
use bodymap_core::worker::{BinningEvent, BinningWorker, ExportEvent, ExportWorker};

#[derive(Parser, Debug)]
#[command(name = "survey-export")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write every participant's drawn points into one zip archive
    Export {
        #[arg(short, long)]
        input: PathBuf,
        /// Archive path, or `-` to stream to stdout
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Drawn area per sensation for every participant
    Areas {
        #[arg(short, long)]
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rectangular bins of the drawn points of one side
    Bins {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        side: AnatomicalSide,
        #[arg(long)]
        bin_width: Option<f64>,
        #[arg(long)]
        bin_height: Option<f64>,
        /// Allocate bins only where points land
        #[arg(long)]
        lazy: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge all drawings of one side into per-pixel cells
    Merge {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        side: AnatomicalSide,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Export { input, output } => run_export(&input, &output, config),
        Commands::Areas { input, output } => run_areas(&input, output.as_deref(), &config),
        Commands::Bins {
            input,
            side,
            bin_width,
            bin_height,
            lazy,
            output,
        } => {
            let mut binning = config.binning.clone();
            binning.bin_width = bin_width.unwrap_or(binning.bin_width);
            binning.bin_height = bin_height.unwrap_or(binning.bin_height);
            if lazy {
                binning.allocation = BinAllocation::Lazy;
            }
            let config = Config { binning, ..config };
            run_bins(&input, side, output.as_deref(), &config)
        }
        Commands::Merge {
            input,
            side,
            output,
        } => run_merge(&input, side, output.as_deref()),
    }
}

fn log_progress(event: &ProgressEvent) {
    info!(
        phase = %event.phase,
        done = format_args!("{:.0}%", 100.0 * event.fraction()),
        "{}",
        event.message
    );
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut out, value)?;
            out.flush()?;
            info!(path = %path.display(), "results written");
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn load_survey(input: &Path) -> anyhow::Result<Survey> {
    Survey::from_json_file(input).with_context(|| format!("loading survey {}", input.display()))
}

fn run_export(input: &Path, output: &Path, config: Config) -> anyhow::Result<()> {
    let survey = load_survey(input)?;
    if output == Path::new("-") {
        let mut provider = RgbaSurfaceProvider::new(config.surface.clone());
        let stdout = io::stdout();
        let summary = ExportJob::new(config.export).run_stream(
            &survey,
            &mut provider,
            stdout.lock(),
            &mut |e: ProgressEvent| log_progress(&e),
        )?;
        info!(entries = summary.entries.len(), points = summary.total_points(), "archive streamed");
        return Ok(());
    }
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;

    let worker = ExportWorker::spawn(config)?;
    worker.request_archive(survey, Box::new(BufWriter::new(file)))?;

    loop {
        match worker.recv() {
            Some(ExportEvent::Progress(event)) => log_progress(&event),
            Some(ExportEvent::PixelMapsDone { summary, .. }) => {
                info!(
                    archive = %output.display(),
                    entries = summary.entries.len(),
                    points = summary.total_points(),
                    "archive delivered"
                );
                return Ok(());
            }
            Some(ExportEvent::Failed { phase, message }) => bail!("{} failed: {}", phase, message),
            Some(ExportEvent::AreasDone(_)) => {}
            None => bail!("export worker stopped unexpectedly"),
        }
    }
}

fn run_areas(input: &Path, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let records = parse_records(&text)?;
    let mut provider = RgbaSurfaceProvider::new(config.surface.clone());

    let areas = AreaJob::new(records).run(&mut provider, &mut |e: ProgressEvent| log_progress(&e))?;
    write_json(&areas, output)
}

fn run_bins(input: &Path, side: AnatomicalSide, output: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    let survey = load_survey(input)?;
    let drawings = survey.drawings_for_side(side);
    let mut provider = RgbaSurfaceProvider::new(config.surface.clone());

    let mut points = Vec::new();
    for drawing in &drawings {
        points.extend(drawn_points(drawing, &mut provider)?);
    }
    let width = drawings.iter().map(|d| d.img_width).max().unwrap_or(0);
    let height = drawings.iter().map(|d| d.img_height).max().unwrap_or(0);

    let mut factory = BinFactory::from_config(
        [0.0, f64::from(width)],
        [0.0, f64::from(height)],
        &config.binning,
    )?;
    let tenth = (points.len() / 10).max(1);
    factory.bin_points_with_progress(&points, |done, total| {
        if done % tenth == 0 || done == total {
            info!(done, total, "binning points");
        }
    })?;

    let bins = factory.into_bins();
    info!(%side, drawings = drawings.len(), bins = bins.len(), "bins ready");
    write_json(&bins, output)
}

fn run_merge(input: &Path, side: AnatomicalSide, output: Option<&Path>) -> anyhow::Result<()> {
    let survey = load_survey(input)?;
    let drawings: Vec<PersonaDrawing> = survey.drawings_for_side(side).into_iter().cloned().collect();

    let worker = BinningWorker::spawn()?;
    worker.request_bins(side, drawings)?;
    let bins = worker.wait_for_bins(side, |event| {
        if let BinningEvent::Progress { event, .. } = event {
            log_progress(event);
        }
    })?;
    write_json(&bins, output)
}
