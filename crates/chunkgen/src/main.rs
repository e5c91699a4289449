//! chunkgen: lay out a room graph from a catalogue of prefab rooms
//!
//! Reads a room catalogue and a connectivity graph (both JSON), runs the
//! placement search, and writes the resulting layout as JSON.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use cg_core::{Catalog, ChunkSpec, GenerationOutcome, Generator, GeneratorConfig, Graph, Layout};

/// Dungeon layout generator
#[derive(Parser, Debug)]
#[command(name = "chunkgen")]
#[command(
    author,
    version,
    about = "Place prefab rooms onto a room graph",
    long_about = None
)]
struct Args {
    /// Room catalogue (JSON array of rooms)
    catalog: PathBuf,

    /// Room graph (JSON)
    graph: PathBuf,

    /// Generator config (JSON); missing fields take defaults
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// RNG seed, overriding the config
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Step ceiling, overriding the config
    #[arg(long = "step-limit")]
    step_limit: Option<u32>,

    /// Do not add mirrored copies of the rooms
    #[arg(long = "no-mirror")]
    no_mirror: bool,

    /// Write the layout here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// More log output (repeat for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// WARN by default, raised by `-v`; RUST_LOG takes precedence
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &Args) -> cg_core::Result<GeneratorConfig> {
    let mut config = match &args.config {
        Some(path) => GeneratorConfig::from_path(path)?,
        None => GeneratorConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(limit) = args.step_limit {
        config.step_limit = limit;
    }
    if args.no_mirror {
        config.mirror_rooms = false;
    }
    config.validate()?;
    Ok(config)
}

/// Returns whether a complete layout was produced
fn run(args: &Args) -> cg_core::Result<bool> {
    let config = load_config(args)?;

    let text = std::fs::read_to_string(&args.catalog)?;
    let specs: Vec<ChunkSpec> = serde_json::from_str(&text)?;
    let catalog = Catalog::for_config(&specs, &config)?;
    let graph = Graph::from_path(&args.graph)?;
    info!(
        rooms = specs.len(),
        templates = catalog.len(),
        nodes = graph.len(),
        "inputs loaded"
    );

    let mut generator = Generator::new(graph, &catalog, config)?;
    let seed = generator.seed();
    match generator.run()? {
        GenerationOutcome::Complete(layout) => {
            info!(seed, rooms = layout.rooms.len(), "layout ready");
            write_layout(&layout, args.output.as_ref())?;
            Ok(true)
        }
        GenerationOutcome::Exhausted { steps } => {
            warn!(seed, steps, "no layout exists for this catalogue and graph");
            Ok(false)
        }
    }
}

fn write_layout(layout: &Layout, output: Option<&PathBuf>) -> cg_core::Result<()> {
    match output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut out, layout)?;
            writeln!(out)?;
            out.flush()?;
            info!(path = %path.display(), "layout written");
        }
        None => {
            let mut out = io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, layout)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
