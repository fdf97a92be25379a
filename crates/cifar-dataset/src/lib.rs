//! CIFAR-10 dataset loading and Burn integration.
//!
//! This crate reads the CIFAR-10 binary distribution, exposes the
//! images as an in-memory Burn dataset, and provides the batcher and
//! train-time augmentation used by the training loop.

pub mod augmentation;
pub mod batcher;
pub mod cifar10;
pub mod dataset;

pub use batcher::{Cifar10Batch, Cifar10Batcher};
pub use cifar10::{Cifar10Data, Cifar10Image, Split, CLASS_NAMES};
pub use dataset::{Cifar10Item, Cifar10TensorDataset};

/// CIFAR-10 images are 32x32 RGB.
pub const IMAGE_WIDTH: usize = 32;
/// CIFAR-10 images are 32x32 RGB.
pub const IMAGE_HEIGHT: usize = 32;
/// Number of color channels.
pub const CHANNELS: usize = 3;
/// Flattened pixel count of one image.
pub const IMAGE_LEN: usize = CHANNELS * IMAGE_HEIGHT * IMAGE_WIDTH;
