//! Collates CIFAR-10 items into Burn tensors.

use std::sync::{Arc, Mutex};

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::augmentation::maybe_flip;
use crate::dataset::Cifar10Item;
use crate::{CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH};

/// One batch: `[batch, 3, 32, 32]` images and `[batch]` class targets.
#[derive(Debug, Clone)]
pub struct Cifar10Batch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher holding the target device and, for the training split, the
/// augmentation RNG. The RNG lives behind a mutex because the data
/// loader clones the batcher across workers.
#[derive(Clone)]
pub struct Cifar10Batcher<B: Backend> {
    device: B::Device,
    augment: Option<Arc<Mutex<ChaCha8Rng>>>,
}

impl<B: Backend> Cifar10Batcher<B> {
    /// Batcher without augmentation, for evaluation.
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            augment: None,
        }
    }

    /// Batcher with seeded random horizontal flip, for training.
    pub fn with_flip(device: B::Device, seed: u64) -> Self {
        Self {
            device,
            augment: Some(Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed)))),
        }
    }
}

impl<B: Backend> Batcher<Cifar10Item, Cifar10Batch<B>> for Cifar10Batcher<B> {
    fn batch(&self, items: Vec<Cifar10Item>) -> Cifar10Batch<B> {
        let items: Vec<Cifar10Item> = match &self.augment {
            Some(rng) => match rng.lock() {
                Ok(mut rng) => items
                    .into_iter()
                    .map(|item| maybe_flip(item, &mut *rng))
                    .collect(),
                Err(_) => items,
            },
            None => items,
        };

        let images: Vec<Tensor<B, 3>> = items
            .iter()
            .map(|item| {
                let data = TensorData::new(
                    item.image.clone(),
                    [CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH],
                )
                .convert::<B::FloatElem>();
                Tensor::from_data(data, &self.device)
            })
            .collect();

        let targets: Vec<Tensor<B, 1, Int>> = items
            .iter()
            .map(|item| {
                Tensor::from_data(
                    [(item.label as i64).elem::<B::IntElem>()],
                    &self.device,
                )
            })
            .collect();

        Cifar10Batch {
            images: Tensor::stack(images, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IMAGE_LEN;
    use burn::backend::NdArray;

    type B = NdArray;

    fn item(label: usize, fill: f32) -> Cifar10Item {
        Cifar10Item {
            image: vec![fill; IMAGE_LEN],
            label,
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = Cifar10Batcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![item(0, 0.1), item(3, 0.2), item(9, 0.3)]);

        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [3]);
    }

    #[test]
    fn test_batch_targets() {
        let batcher = Cifar10Batcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![item(1, 0.0), item(7, 0.0)]);

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![1, 7]);
    }

    #[test]
    fn test_eval_batcher_does_not_augment() {
        let mut image = vec![0.0f32; IMAGE_LEN];
        image[0] = 1.0;
        let batcher = Cifar10Batcher::<B>::new(Default::default());
        let batch = batcher.batch(vec![Cifar10Item { image, label: 0 }]);

        let pixels: Vec<f32> = batch.images.into_data().to_vec().unwrap();
        assert_eq!(pixels[0], 1.0);
    }

    #[test]
    fn test_flip_batcher_is_deterministic_per_seed() {
        let mut image = vec![0.0f32; IMAGE_LEN];
        image[0] = 1.0;
        let items: Vec<Cifar10Item> = (0..16)
            .map(|_| Cifar10Item {
                image: image.clone(),
                label: 0,
            })
            .collect();

        let first = Cifar10Batcher::<B>::with_flip(Default::default(), 42)
            .batch(items.clone())
            .images
            .into_data();
        let second = Cifar10Batcher::<B>::with_flip(Default::default(), 42)
            .batch(items)
            .images
            .into_data();

        assert_eq!(
            first.to_vec::<f32>().unwrap(),
            second.to_vec::<f32>().unwrap()
        );
    }
}
