//! Model definitions and the training loop.
//!
//! The three supported architectures share one config-driven loop in
//! [`trainer`]; the per-architecture differences (learning-rate
//! schedule, checkpoint policy, table header period) are carried by
//! `VariantPolicy` from `cifar-core`.

pub mod checkpoint;
pub mod evaluator;
pub mod lr_schedule;
pub mod model;
pub mod seed;
pub mod trainer;

pub use checkpoint::{CheckpointSlot, TrainState};
pub use lr_schedule::LrScheduler;
pub use model::{Classifier, MultiScaleResNet34, MultiScaleResNet34Config, ResNet32, ResNet32Config};
pub use seed::seed_everything;
pub use trainer::{fit, FitSummary};
