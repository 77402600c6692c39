//! Application state.
//!
//! The model is loaded once (on startup or via the load command) and then
//! shared read-only across inference calls. Status is tracked separately
//! so the frontend can poll it while loading runs on a blocking thread.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use flower_classifier::backend::DefaultBackend;
use flower_classifier::Predictor;

/// Predictor instantiated on the default (CPU) backend
pub type AppPredictor = Predictor<DefaultBackend>;

/// Model loading status reported to the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail")]
pub enum ModelStatus {
    NotLoaded,
    Loading,
    Ready {
        num_classes: usize,
        input_size: usize,
        artifact_dir: String,
    },
    Error(String),
}

/// Application state shared across commands
pub struct AppState {
    /// Loaded predictor; a plain mutex because forward passes are
    /// synchronous and short
    pub predictor: Mutex<Option<AppPredictor>>,
    /// Current loading status
    pub status: RwLock<ModelStatus>,
    /// Directory the artifacts were loaded from
    pub artifact_dir: RwLock<PathBuf>,
}

impl AppState {
    pub fn new(artifact_dir: PathBuf) -> Self {
        Self {
            predictor: Mutex::new(None),
            status: RwLock::new(ModelStatus::NotLoaded),
            artifact_dir: RwLock::new(artifact_dir),
        }
    }
}
