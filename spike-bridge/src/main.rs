//! `spike-bridge` binary: encode an IDX image dataset into spike artifacts,
//! run the simulator on each batch and report accuracy.
//!
//! # Usage
//!
//! ```bash
//! spike-bridge run --config bridge.toml --images t10k-images-idx3-ubyte --labels t10k-labels-idx1-ubyte
//! spike-bridge run --data-dir ./data/mnist --simulator ../target/debug/main --max-batches 1
//! spike-bridge encode --data-dir ./data/mnist --work-dir simulation
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use spike_bridge::{BatchLoader, BridgeConfig, BridgeResult, IdxDataset, Pipeline};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "spike-bridge", version, about = "Rate-encode image batches for an external SNN simulator and score its output")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode, simulate and score every batch.
    Run(RunArgs),
    /// Encode the first batch and write its artifacts without running the simulator.
    Encode(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the MNIST test split (t10k-*-ubyte files).
    #[arg(long, value_name = "DIR", conflicts_with_all = ["images", "labels"])]
    data_dir: Option<PathBuf>,

    /// IDX images file (idx3-ubyte).
    #[arg(long, value_name = "FILE", requires = "labels")]
    images: Option<PathBuf>,

    /// IDX labels file (idx1-ubyte).
    #[arg(long, value_name = "FILE", requires = "images")]
    labels: Option<PathBuf>,

    /// Override the simulator executable.
    #[arg(long, value_name = "PATH")]
    simulator: Option<PathBuf>,

    /// Override the artifact / simulator working directory.
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Override the encoder seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the batch size.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Stop after this many batches (1 = single-batch run).
    #[arg(long)]
    max_batches: Option<usize>,
}

impl RunArgs {
    fn load_config(&self) -> BridgeResult<BridgeConfig> {
        let mut config = BridgeConfig::load(self.config.as_deref())?;
        if let Some(exe) = &self.simulator {
            config.simulator.executable = exe.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.artifacts.work_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.encoder.seed = seed;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(n) = self.max_batches {
            config.max_batches = n;
        }
        config.validate()?;
        Ok(config)
    }

    fn dataset_paths(&self) -> (PathBuf, PathBuf) {
        match (&self.images, &self.labels) {
            (Some(images), Some(labels)) => (images.clone(), labels.clone()),
            _ => IdxDataset::mnist_test_split(self.data_dir.as_deref().unwrap_or(Path::new("data/mnist"))),
        }
    }
}

fn run(args: &RunArgs) -> BridgeResult<()> {
    let config = args.load_config()?;
    info!("spike-bridge v{}", spike_bridge::VERSION);
    info!("  batch size : {}", config.batch_size);
    info!("  num steps  : {}", config.encoder.num_steps);
    info!("  gain       : {}", config.encoder.gain);
    info!("  simulator  : {}", config.simulator.executable.display());
    info!("  work dir   : {}", config.artifacts.work_dir.display());

    let (images, labels) = args.dataset_paths();
    let dataset = IdxDataset::open(&images, &labels)?;
    let loader = BatchLoader::new(&dataset, config.batch_size)?;

    let mut pipeline = Pipeline::new(config)?;
    let summary = pipeline.run(&loader)?;

    for (i, accuracy) in summary.batches.iter().enumerate() {
        println!("Batch {}: accuracy {}", i, accuracy);
    }
    if let Some(mean) = summary.mean_accuracy() {
        println!("Test set accuracy over {} batch(es): {:.2}%", summary.batches.len(), mean * 100.0);
    }
    Ok(())
}

fn encode(args: &RunArgs) -> BridgeResult<()> {
    let config = args.load_config()?;
    let (images, labels) = args.dataset_paths();
    let dataset = IdxDataset::open(&images, &labels)?;
    let loader = BatchLoader::new(&dataset, config.batch_size)?;

    let input = config.artifacts.input();
    let targets = config.artifacts.targets();
    let mut pipeline = Pipeline::new(config)?;
    let (batch, batch_labels) = loader.batch(0)?;
    pipeline.write_artifacts(&batch, &batch_labels)?;

    println!("Wrote {} and {}", input.display(), targets.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = spike_bridge::logging::init_tracing(&cli.log_level) {
        eprintln!("failed to initialise logging: {e}");
    }

    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Encode(args) => encode(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
