//! In-memory Burn dataset over CIFAR-10 items.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::cifar10::Cifar10Data;

/// A single image ready for batching: normalized `f32` pixels in
/// channel-planar CHW order, values in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cifar10Item {
    pub image: Vec<f32>,
    pub label: usize,
}

/// All items of one split, held in memory.
///
/// CIFAR-10 is small enough (~180 MB as f32) that eager conversion is
/// cheaper than decoding records on every epoch.
#[derive(Debug, Clone)]
pub struct Cifar10TensorDataset {
    items: Vec<Cifar10Item>,
}

impl Cifar10TensorDataset {
    pub fn new(items: Vec<Cifar10Item>) -> Self {
        Self { items }
    }

    /// Converts a loaded split, normalizing pixel bytes to [0, 1].
    pub fn from_data(data: &Cifar10Data) -> Self {
        let items = data
            .images
            .iter()
            .map(|image| Cifar10Item {
                image: image.pixels.iter().map(|&p| p as f32 / 255.0).collect(),
                label: image.label,
            })
            .collect();
        Self { items }
    }
}

impl Dataset<Cifar10Item> for Cifar10TensorDataset {
    fn get(&self, index: usize) -> Option<Cifar10Item> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cifar10::{Cifar10Image, Split};
    use crate::IMAGE_LEN;

    #[test]
    fn test_from_data_normalizes_pixels() {
        let data = Cifar10Data {
            images: vec![Cifar10Image {
                pixels: vec![255; IMAGE_LEN],
                label: 3,
            }],
            split: Split::Train,
        };

        let dataset = Cifar10TensorDataset::from_data(&data);
        assert_eq!(dataset.len(), 1);

        let item = dataset.get(0).unwrap();
        assert_eq!(item.label, 3);
        assert_eq!(item.image.len(), IMAGE_LEN);
        assert!((item.image[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_get_out_of_range() {
        let dataset = Cifar10TensorDataset::new(Vec::new());
        assert!(dataset.get(0).is_none());
        assert_eq!(dataset.len(), 0);
    }
}
