//! Train-time augmentation.
//!
//! The training split gets a random horizontal flip with probability
//! 0.5; the test split is never augmented.

use rand::Rng;

use crate::dataset::Cifar10Item;
use crate::{CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH};

/// Mirrors a channel-planar CHW image along the horizontal axis.
pub fn horizontal_flip(image: &[f32]) -> Vec<f32> {
    debug_assert_eq!(image.len(), CHANNELS * IMAGE_HEIGHT * IMAGE_WIDTH);
    let mut flipped = vec![0.0f32; image.len()];

    for c in 0..CHANNELS {
        for y in 0..IMAGE_HEIGHT {
            let row = c * IMAGE_HEIGHT * IMAGE_WIDTH + y * IMAGE_WIDTH;
            for x in 0..IMAGE_WIDTH {
                flipped[row + x] = image[row + (IMAGE_WIDTH - 1 - x)];
            }
        }
    }

    flipped
}

/// Flips an item with probability 0.5.
pub fn maybe_flip(item: Cifar10Item, rng: &mut impl Rng) -> Cifar10Item {
    if rng.gen_bool(0.5) {
        Cifar10Item {
            image: horizontal_flip(&item.image),
            label: item.label,
        }
    } else {
        item
    }
}
