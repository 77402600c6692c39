//! Flower Classifier GUI - Tauri backend.
//!
//! Hosts the commands the HTML frontend invokes: model loading and status,
//! image classification (by path and by raw bytes), and preview encoding.
//! The model starts loading right after the window appears so the user
//! sees a loading message instead of a frozen window.

mod commands;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use state::AppState;

/// Default directory with trained artifacts, relative to the working dir
const DEFAULT_ARTIFACT_DIR: &str = "output";

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let artifact_dir = std::env::var("FLOWER_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ARTIFACT_DIR));

    let app_state = Arc::new(AppState::new(artifact_dir));

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .manage(app_state.clone())
        .setup(move |_app| {
            // Kick off model loading in the background; the frontend polls
            // get_model_status while this runs.
            let state = app_state.clone();
            tauri::async_runtime::spawn(async move {
                commands::model::load_model_into_state(state, None).await;
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::model::load_model,
            commands::model::get_model_status,
            commands::model::get_labels,
            commands::classify::classify_image,
            commands::classify::classify_image_bytes,
            commands::classify::load_preview,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
