//! CIFAR-10 training command line.
//!
//! Reproduces the historical script interface: flags use underscore
//! spellings (`--batch_size`, `--lr_init`, ...), the verbatim command
//! line is written to `command.sh` in the run directory, and the
//! per-epoch metrics table is printed to the console.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use clap::{Parser, ValueEnum};
use tracing::info;

use cifar_core::cli::{prepare_run_dir, record_command, setup_cli_logging};
use cifar_core::device::log_device_report;
use cifar_core::{ModelVariant, RunConfig};
use cifar_dataset::{Cifar10Data, Cifar10TensorDataset, Split};
use cifar_training::model::{MultiScaleResNet34Config, ResNet32Config};
use cifar_training::{fit, seed_everything, FitSummary};

type TrainBackend = Autodiff<NdArray>;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Arch {
    /// CIFAR-style ResNet-32
    Resnet32,
    /// ResNet-34 trunk with multi-scale feature pooling
    MultiscaleResnet34,
}

/// CIFAR-10 classifier training
#[derive(Parser, Debug)]
#[command(name = "train", about = "Train CIFAR-10 image classifiers")]
struct Args {
    /// Run directory for command.sh, checkpoints, and logs
    #[arg(long)]
    dir: PathBuf,

    /// Directory holding the CIFAR-10 binary batch files
    #[arg(long, default_value = "data/cifar-10-batches-bin")]
    data: PathBuf,

    /// Model architecture
    #[arg(long, value_enum, default_value_t = Arch::Resnet32)]
    arch: Arch,

    /// Use squeeze-and-excitation blocks (resnet32 only)
    #[arg(long)]
    se: bool,

    /// Batch size (defaults to the architecture's historical value)
    #[arg(long = "batch_size")]
    batch_size: Option<usize>,

    /// Number of data loading workers
    #[arg(long = "num_workers", default_value_t = 4)]
    num_workers: usize,

    /// Number of epochs to train
    #[arg(long, default_value_t = 200)]
    epochs: usize,

    /// Initial learning rate
    #[arg(long = "lr_init", default_value_t = 0.01)]
    lr_init: f64,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    momentum: f64,

    /// Weight decay (L2 penalty)
    #[arg(long = "wd", default_value_t = 1e-4)]
    weight_decay: f64,

    /// Random seed
    #[arg(long, default_value_t = 100)]
    seed: u64,

    /// Verbose logging
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn variant(&self) -> ModelVariant {
        match (self.arch, self.se) {
            (Arch::MultiscaleResnet34, _) => ModelVariant::MultiScaleResNet34,
            (Arch::Resnet32, true) => ModelVariant::SeResNet32,
            (Arch::Resnet32, false) => ModelVariant::ResNet32,
        }
    }

    fn into_config(self) -> RunConfig {
        let variant = self.variant();
        RunConfig {
            batch_size: self
                .batch_size
                .unwrap_or(variant.policy().default_batch_size),
            dir: self.dir,
            data_dir: self.data,
            num_workers: self.num_workers,
            epochs: self.epochs,
            lr_init: self.lr_init,
            momentum: self.momentum,
            weight_decay: self.weight_decay,
            seed: self.seed,
            variant,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_cli_logging(args.verbose)?;

    let config = args.into_config();
    config.validate()?;

    prepare_run_dir(&config.dir)?;
    let argv: Vec<String> = std::env::args().collect();
    record_command(&config.dir, &argv)?;

    info!("CIFAR-10 training");
    info!("  arch:        {}", config.variant);
    info!("  run dir:     {}", config.dir.display());
    info!("  data dir:    {}", config.data_dir.display());
    info!("  batch size:  {}", config.batch_size);
    info!("  epochs:      {}", config.epochs);
    info!("  lr init:     {}", config.lr_init);
    info!("  momentum:    {}", config.momentum);
    info!("  wd:          {}", config.weight_decay);
    info!("  seed:        {}", config.seed);

    log_device_report("ndarray");
    let device = NdArrayDevice::default();
    seed_everything::<TrainBackend>(config.seed);

    let train = Cifar10Data::load(&config.data_dir, Split::Train)
        .context("failed to load the training split")?;
    let test = Cifar10Data::load(&config.data_dir, Split::Test)
        .context("failed to load the test split")?;
    let train = Cifar10TensorDataset::from_data(&train);
    let test = Cifar10TensorDataset::from_data(&test);

    let summary = run(&config, &train, &test, &device)?;

    info!(
        "finished {} epochs, best accuracy {:.6}, {} checkpoint saves",
        summary.history.len(),
        summary.best_accuracy,
        summary.saves
    );
    println!("training is over");
    Ok(())
}

fn run(
    config: &RunConfig,
    train: &Cifar10TensorDataset,
    test: &Cifar10TensorDataset,
    device: &NdArrayDevice,
) -> Result<FitSummary> {
    let summary = match config.variant {
        ModelVariant::MultiScaleResNet34 => {
            let model = MultiScaleResNet34Config::new()
                .with_num_classes(config.num_classes)
                .init::<TrainBackend>(device);
            fit::<TrainBackend, _>(config, model, train, test, device)?
        }
        ModelVariant::ResNet32 => {
            let model = ResNet32Config::new()
                .with_num_classes(config.num_classes)
                .init::<TrainBackend>(device);
            fit::<TrainBackend, _>(config, model, train, test, device)?
        }
        ModelVariant::SeResNet32 => {
            let model = ResNet32Config::new()
                .with_num_classes(config.num_classes)
                .with_se(true)
                .init::<TrainBackend>(device);
            fit::<TrainBackend, _>(config, model, train, test, device)?
        }
    };
    Ok(summary)
}
