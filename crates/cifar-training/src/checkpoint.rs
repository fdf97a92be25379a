//! Single-slot checkpointing.
//!
//! A run keeps exactly one checkpoint, overwritten on every qualifying
//! epoch: the model record, the optimizer record (momentum buffers),
//! and a small JSON state file describing both.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::{AutodiffModule, Module};
use burn::optim::Optimizer;
use burn::record::{CompactRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use cifar_core::{Error, Result};

/// Training state written next to the model and optimizer records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainState {
    pub epoch: usize,
    pub learning_rate: f64,
    pub test_accuracy: f64,
    pub best_accuracy: f64,
    pub timestamp: String,
    pub metadata: TrainStateMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainStateMetadata {
    pub architecture: String,
    pub num_classes: usize,
    pub seed: u64,
}

impl TrainState {
    pub fn new(
        epoch: usize,
        learning_rate: f64,
        test_accuracy: f64,
        best_accuracy: f64,
        metadata: TrainStateMetadata,
    ) -> Self {
        Self {
            epoch,
            learning_rate,
            test_accuracy,
            best_accuracy,
            timestamp: Utc::now().to_rfc3339(),
            metadata,
        }
    }
}

/// The one checkpoint location of a run directory.
pub struct CheckpointSlot {
    dir: PathBuf,
}

impl CheckpointSlot {
    pub const STATE_FILE: &'static str = "checkpoint.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Model record path, without the recorder's extension.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join("checkpoint")
    }

    /// Optimizer record path, without the recorder's extension.
    pub fn optimizer_path(&self) -> PathBuf {
        self.dir.join("optimizer")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(Self::STATE_FILE)
    }

    /// Overwrites the slot with the given model, optimizer, and state.
    pub fn save<B, M, O>(&self, model: &M, optimizer: &O, state: &TrainState) -> Result<()>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        fs::create_dir_all(&self.dir)?;

        let recorder = CompactRecorder::new();
        model
            .clone()
            .save_file(self.model_path(), &recorder)
            .map_err(|e| Error::Checkpoint(format!("failed to save model record: {e}")))?;

        Recorder::<B>::record(&recorder, optimizer.to_record(), self.optimizer_path())
            .map_err(|e| Error::Checkpoint(format!("failed to save optimizer record: {e}")))?;

        let json = serde_json::to_string_pretty(state)?;
        fs::write(self.state_path(), json)?;

        info!(
            epoch = state.epoch,
            accuracy = state.test_accuracy,
            "checkpoint saved to {}",
            self.dir.display()
        );
        Ok(())
    }

    /// Reads back the JSON state, if the slot has been written.
    pub fn load_state(&self) -> Result<TrainState> {
        let json = fs::read_to_string(self.state_path())?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
