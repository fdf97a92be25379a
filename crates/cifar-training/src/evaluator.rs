//! Test-split evaluation pass.

use burn::data::dataloader::DataLoaderBuilder;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;

use cifar_core::{ConfusionMatrix, Error, PassMetrics, Result};
use cifar_dataset::{Cifar10Batcher, Cifar10TensorDataset};

use crate::model::Classifier;

/// Metrics and per-class confusion counts from one evaluation pass.
pub struct EvalReport {
    pub metrics: PassMetrics,
    pub matrix: ConfusionMatrix,
}

/// Runs the model over the whole dataset without gradients.
///
/// Loss is the sample-weighted mean of per-batch cross-entropy, so the
/// result is independent of the batch size.
pub fn evaluate<B, M>(
    model: &M,
    dataset: &Cifar10TensorDataset,
    num_classes: usize,
    batch_size: usize,
    num_workers: usize,
    device: &B::Device,
) -> Result<EvalReport>
where
    B: Backend,
    M: Classifier<B>,
{
    let batcher = Cifar10Batcher::<B>::new(device.clone());
    let mut builder = DataLoaderBuilder::new(batcher).batch_size(batch_size);
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }
    let loader = builder.build(dataset.clone());

    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut matrix = ConfusionMatrix::new(num_classes);
    let mut loss_sum = 0.0f64;
    let mut correct = 0usize;
    let mut total = 0usize;

    for batch in loader.iter() {
        let [count, _, _, _] = batch.images.dims();

        let logits = model.forward(batch.images);
        let loss = loss_fn.forward(logits.clone(), batch.targets.clone());
        loss_sum += loss.into_scalar().elem::<f64>() * count as f64;

        let predictions = logits.argmax(1).flatten::<1>(0, 1);
        let predicted = to_labels(predictions.into_data())?;
        let actual = to_labels(batch.targets.into_data())?;

        for (&truth, &guess) in actual.iter().zip(&predicted) {
            matrix.record(truth as usize, guess as usize);
            if truth == guess {
                correct += 1;
            }
        }
        total += count;
    }

    let metrics = PassMetrics {
        loss: if total > 0 { loss_sum / total as f64 } else { 0.0 },
        accuracy: if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        },
    };

    Ok(EvalReport { metrics, matrix })
}

fn to_labels(data: burn::tensor::TensorData) -> Result<Vec<i64>> {
    data.convert::<i64>()
        .to_vec()
        .map_err(|e| Error::Training(format!("failed to read label tensor: {e:?}")))
}
