//! Model training.
//!
//! A custom training loop built directly on Burn's optimizer API rather
//! than the high-level Learner, which keeps batch construction, freezing,
//! and artifact persistence explicit.

pub mod trainer;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use trainer::{read_class_names, run_training, TrainingSummary};

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Dataset directory (class-named subfolders of images)
    pub data_dir: PathBuf,
    /// Directory for trained artifacts
    pub output_dir: PathBuf,
    /// Number of training epochs
    pub epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Fraction of each class held out for validation
    pub validation_fraction: f64,
    /// Random seed for splitting and shuffling
    pub seed: u64,
    /// Apply data augmentation to training batches
    pub augment: bool,
    /// Freeze the backbone (requires pretrained weights)
    pub freeze_backbone: bool,
    /// Record file with pretrained backbone weights
    pub backbone_weights: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(crate::DEFAULT_DATASET_DIR),
            output_dir: PathBuf::from(crate::DEFAULT_OUTPUT_DIR),
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_fraction: 0.2,
            seed: 123,
            augment: true,
            freeze_backbone: true,
            backbone_weights: None,
        }
    }
}
