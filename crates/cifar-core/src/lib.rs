//! Core types and utilities for CIFAR-10 classifier training.
//!
//! This crate provides the configuration, error, metric, and CLI helper
//! types shared by the dataset and training crates.

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod metrics;

pub use config::*;
pub use error::{Error, Result};
pub use metrics::*;
