//! The epoch loop.
//!
//! One config-driven loop serves every architecture. Per epoch:
//! advance the learning-rate schedule, run the training pass, evaluate
//! on the test split, append the confusion-matrix block, decide on a
//! checkpoint save, and print the metrics row.

use std::time::Instant;

use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{GradientsParams, Optimizer, SgdConfig};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use tracing::debug;

use cifar_core::{
    BestTracker, EpochReport, MatrixLog, MetricsTable, PassMetrics, Result, RunConfig,
};
use cifar_dataset::{Cifar10Batcher, Cifar10TensorDataset};

use crate::checkpoint::{CheckpointSlot, TrainState, TrainStateMetadata};
use crate::evaluator::evaluate;
use crate::lr_schedule::LrScheduler;
use crate::model::Classifier;

/// What `fit` hands back once the loop finishes.
pub struct FitSummary {
    /// One report per epoch, in order.
    pub history: Vec<EpochReport>,
    /// Final checkpoint threshold (stays 0 under the frozen policy).
    pub best_accuracy: f64,
    /// Number of checkpoint saves that happened.
    pub saves: usize,
}

/// Trains `model` for `config.epochs` epochs and returns the per-epoch
/// history.
pub fn fit<B, M>(
    config: &RunConfig,
    mut model: M,
    train: &Cifar10TensorDataset,
    test: &Cifar10TensorDataset,
    device: &B::Device,
) -> Result<FitSummary>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
{
    let policy = config.policy();

    let batcher = Cifar10Batcher::<B>::with_flip(device.clone(), config.seed);
    let mut builder = DataLoaderBuilder::new(batcher)
        .batch_size(config.batch_size)
        .shuffle(config.seed);
    if config.num_workers > 0 {
        builder = builder.num_workers(config.num_workers);
    }
    let train_loader = builder.build(train.clone());

    let loss_fn = CrossEntropyLossConfig::new().init(device);
    let mut optimizer = SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(config.momentum)
                .with_dampening(0.0),
        ))
        .with_weight_decay(Some(WeightDecayConfig::new(config.weight_decay)))
        .init();

    let mut scheduler = LrScheduler::new(policy.schedule.clone(), config.lr_init);
    let mut best = BestTracker::new(policy.best);
    let table = MetricsTable::new(policy.header_period);
    let slot = CheckpointSlot::new(&config.dir);
    let matrix_log = MatrixLog::new(&config.dir);

    let mut history = Vec::with_capacity(config.epochs);
    let mut saves = 0usize;

    for epoch in 0..config.epochs {
        scheduler.step();
        let lr = scheduler.lr();
        let started = Instant::now();

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut total = 0usize;

        for batch in train_loader.iter() {
            let [count, _, _, _] = batch.images.dims();

            let logits = model.forward(batch.images);
            let loss = loss_fn.forward(logits.clone(), batch.targets.clone());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(lr, model, grads);

            loss_sum += loss.into_scalar().elem::<f64>() * count as f64;
            let hits = logits
                .argmax(1)
                .flatten::<1>(0, 1)
                .equal(batch.targets)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();
            correct += hits as usize;
            total += count;
        }

        let train_metrics = PassMetrics {
            loss: if total > 0 { loss_sum / total as f64 } else { 0.0 },
            accuracy: if total > 0 {
                correct as f64 / total as f64
            } else {
                0.0
            },
        };

        let valid_model = model.valid();
        let eval = evaluate::<B::InnerBackend, _>(
            &valid_model,
            test,
            config.num_classes,
            config.batch_size,
            config.num_workers,
            device,
        )?;

        matrix_log.append(epoch, &eval.metrics, &eval.matrix)?;

        if best.observe(eval.metrics.accuracy) {
            let state = TrainState::new(
                epoch,
                lr,
                eval.metrics.accuracy,
                best.threshold(),
                TrainStateMetadata {
                    architecture: config.variant.to_string(),
                    num_classes: config.num_classes,
                    seed: config.seed,
                },
            );
            slot.save::<B, _, _>(&model, &optimizer, &state)?;
            saves += 1;
        }

        let report = EpochReport {
            epoch,
            lr,
            train: train_metrics,
            test: eval.metrics,
            minutes: started.elapsed().as_secs_f64() / 60.0,
        };
        for line in table.render(&report) {
            println!("{line}");
        }
        debug!(epoch, lr, accuracy = report.test.accuracy, "epoch done");
        history.push(report);
    }

    Ok(FitSummary {
        history,
        best_accuracy: best.threshold(),
        saves,
    })
}
