//! Classification and preview commands.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tauri::State;

use flower_classifier::Prediction;

use crate::state::AppState;

/// Preview payload for the frontend image element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewImage {
    /// Base64 data URL (PNG)
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

/// Longest edge of the preview shown in the window
const PREVIEW_MAX_EDGE: u32 = 450;

fn run_prediction<F>(state: &Arc<AppState>, predict: F) -> Result<Prediction, String>
where
    F: FnOnce(&crate::state::AppPredictor) -> Result<Prediction, String>,
{
    let predictor = state.predictor.lock().map_err(|e| e.to_string())?;
    let predictor = predictor
        .as_ref()
        .ok_or("Model not loaded. Please wait for loading to finish.")?;
    predict(predictor)
}

/// Classify an image file by path (file dialog or drag-and-drop).
#[tauri::command]
pub async fn classify_image(
    image_path: String,
    state: State<'_, Arc<AppState>>,
) -> Result<Prediction, String> {
    let path = Path::new(&image_path);
    if !path.exists() {
        return Err(format!("Image not found: {}", image_path));
    }

    let state = state.inner().clone();
    let image_path_owned = image_path.clone();
    tauri::async_runtime::spawn_blocking(move || {
        run_prediction(&state, |predictor| {
            predictor
                .predict_file(Path::new(&image_path_owned))
                .map_err(|e| format!("{:#}", e))
        })
    })
    .await
    .map_err(|e| e.to_string())?
}

/// Classify raw image bytes.
#[tauri::command]
pub async fn classify_image_bytes(
    image_bytes: Vec<u8>,
    state: State<'_, Arc<AppState>>,
) -> Result<Prediction, String> {
    let state = state.inner().clone();
    tauri::async_runtime::spawn_blocking(move || {
        run_prediction(&state, |predictor| {
            predictor
                .predict_bytes(&image_bytes)
                .map_err(|e| format!("{:#}", e))
        })
    })
    .await
    .map_err(|e| e.to_string())?
}

/// Encode a down-scaled preview of an image file as a PNG data URL.
#[tauri::command]
pub async fn load_preview(image_path: String) -> Result<PreviewImage, String> {
    tauri::async_runtime::spawn_blocking(move || {
        let image = image::open(&image_path)
            .map_err(|e| format!("Failed to open image: {}", e))?;

        let preview = image.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE);
        let (width, height) = (preview.width(), preview.height());

        let mut png_bytes: Vec<u8> = Vec::new();
        preview
            .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .map_err(|e| format!("Failed to encode preview: {}", e))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&png_bytes);

        Ok(PreviewImage {
            data_url: format!("data:image/png;base64,{}", encoded),
            width,
            height,
        })
    })
    .await
    .map_err(|e| e.to_string())?
}
