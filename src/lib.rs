//! # Flower Classifier
//!
//! An end-to-end flower image classification pipeline built on the Burn
//! framework. The pipeline is three independent stages wired together only
//! through files on disk:
//!
//! 1. `scrape`: collect labeled flower photos from Bing image search into a
//!    directory of class-named folders
//! 2. `train`: fit a CNN (optionally on top of a frozen pretrained backbone)
//!    and persist the model record plus an ordered class-names file
//! 3. `infer` / the desktop GUI: load the artifacts and classify images
//!
//! ## Modules
//!
//! - `scrape`: Bing image search client and per-class collection loop
//! - `dataset`: loading, train/validation splitting, augmentation, batching
//! - `model`: CNN architecture built with Burn
//! - `training`: custom training loop and artifact persistence
//! - `inference`: predictor over saved artifacts
//! - `utils`: logging and error types

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod scrape;
pub mod training;
pub mod utils;

pub use dataset::loader::{DatasetStats, FlowerDataset, ImageSample};
pub use dataset::split::{DatasetSplit, SplitConfig};
pub use dataset::{FlowerBatch, FlowerBatcher, FlowerBurnDataset, FlowerItem};
pub use inference::predictor::{ClassScore, Prediction, Predictor};
pub use model::cnn::{Backbone, FlowerNet, FlowerNetConfig};
pub use training::{run_training, TrainConfig, TrainingSummary};
pub use utils::error::{FlowerError, Result};

/// Model input size (square images). The pretrained backbone this project
/// fine-tunes on was exported at this resolution.
pub const IMAGE_SIZE: usize = 180;

/// Default directory the scraper fills and the trainer reads.
pub const DEFAULT_DATASET_DIR: &str = "datasets";

/// Default directory for trained artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// File stem of the model record (`CompactRecorder` appends `.mpk`).
pub const MODEL_FILE: &str = "flower_model";

/// Architecture hyperparameters saved next to the record.
pub const MODEL_CONFIG_FILE: &str = "model_config.json";

/// Ordered label list, one per line. Line order matches the model's
/// output-index order; both are written from the same vector during
/// training and nothing else enforces the pairing.
pub const CLASS_NAMES_FILE: &str = "class_names.txt";

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
