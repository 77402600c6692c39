//! Error types for the flower classifier library.
//!
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for flower classifier operations
#[derive(Error, Debug)]
pub enum FlowerError {
    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error while scraping images
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// Error with model operations
    #[error("Model error: {0}")]
    Model(String),

    /// Error with training
    #[error("Training error: {0}")]
    Training(String),

    /// Error with inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode or encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Convenience Result type for flower classifier operations
pub type Result<T> = std::result::Result<T, FlowerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowerError::Dataset("no classes found".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no classes found");
    }

    #[test]
    fn test_path_not_found_display() {
        let err = FlowerError::PathNotFound(PathBuf::from("/missing/dir"));
        assert!(format!("{}", err).contains("/missing/dir"));
    }
}
