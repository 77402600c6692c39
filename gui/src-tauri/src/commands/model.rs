//! Model loading and status commands.

use std::path::PathBuf;
use std::sync::Arc;

use tauri::State;
use tracing::{error, info};

use flower_classifier::backend::default_device;
use flower_classifier::Predictor;

use crate::state::{AppPredictor, AppState, ModelStatus};

/// Load artifacts into the shared state, updating status around the
/// blocking load. Used by the startup task and the explicit command.
pub async fn load_model_into_state(state: Arc<AppState>, dir_override: Option<PathBuf>) {
    if let Some(dir) = dir_override {
        *state.artifact_dir.write().await = dir;
    }
    let dir = state.artifact_dir.read().await.clone();

    *state.status.write().await = ModelStatus::Loading;

    let load_dir = dir.clone();
    let result = tauri::async_runtime::spawn_blocking(move || -> Result<AppPredictor, String> {
        let device = default_device();
        Predictor::from_artifacts(&load_dir, &device).map_err(|e| format!("{:#}", e))
    })
    .await;

    match result {
        Ok(Ok(predictor)) => {
            info!("Model loaded from {:?}", dir);
            let status = ModelStatus::Ready {
                num_classes: predictor.num_classes(),
                input_size: predictor.input_size(),
                artifact_dir: dir.to_string_lossy().to_string(),
            };
            *state.predictor.lock().expect("predictor lock poisoned") = Some(predictor);
            *state.status.write().await = status;
        }
        Ok(Err(message)) => {
            error!("Failed to load model: {}", message);
            *state.status.write().await = ModelStatus::Error(message);
        }
        Err(e) => {
            error!("Model loading task failed: {}", e);
            *state.status.write().await = ModelStatus::Error(e.to_string());
        }
    }
}

/// (Re)load the model, optionally from a different artifact directory.
#[tauri::command]
pub async fn load_model(
    artifact_dir: Option<String>,
    state: State<'_, Arc<AppState>>,
) -> Result<ModelStatus, String> {
    load_model_into_state(state.inner().clone(), artifact_dir.map(PathBuf::from)).await;
    Ok(state.status.read().await.clone())
}

/// Current model status for the frontend to poll.
#[tauri::command]
pub async fn get_model_status(state: State<'_, Arc<AppState>>) -> Result<ModelStatus, String> {
    Ok(state.status.read().await.clone())
}

/// Labels in output-index order.
#[tauri::command]
pub async fn get_labels(state: State<'_, Arc<AppState>>) -> Result<Vec<String>, String> {
    let predictor = state.predictor.lock().map_err(|e| e.to_string())?;
    predictor
        .as_ref()
        .map(|p| p.labels().to_vec())
        .ok_or_else(|| "Model not loaded".to_string())
}
