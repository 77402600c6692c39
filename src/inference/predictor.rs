//! Predictor over trained artifacts.
//!
//! Loads the three files the trainer writes (model record, architecture
//! config, class-names file) and runs forward passes on single images.
//! The class-names file is trusted for label lookup; an output index past
//! its end maps to "Unknown".

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use burn::config::Config;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::rescale_chw;
use crate::model::cnn::{FlowerNet, FlowerNetConfig};
use crate::training::read_class_names;
use crate::{CLASS_NAMES_FILE, MODEL_CONFIG_FILE, MODEL_FILE};

/// A single class with its probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassScore {
    pub index: usize,
    pub label: String,
    pub probability: f32,
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Path to the input image (if applicable)
    pub image_path: Option<PathBuf>,
    /// Predicted class index (argmax)
    pub class_index: usize,
    /// Predicted label
    pub label: String,
    /// Probability of the predicted class
    pub confidence: f32,
    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,
    /// Top-5 classes by probability
    pub top_k: Vec<ClassScore>,
    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl Prediction {
    /// Build a prediction from a probability vector.
    pub fn from_probabilities(
        probabilities: Vec<f32>,
        labels: &[String],
        inference_time: Duration,
        image_path: Option<PathBuf>,
    ) -> Self {
        let (class_index, &confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &0.0));

        let mut indexed: Vec<(usize, f32)> = probabilities
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, p))
            .collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let top_k: Vec<ClassScore> = indexed
            .iter()
            .take(5)
            .map(|&(index, probability)| ClassScore {
                index,
                label: label_for(labels, index),
                probability,
            })
            .collect();

        Self {
            image_path,
            class_index,
            label: label_for(labels, class_index),
            confidence,
            probabilities,
            top_k,
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    /// Confidence as a percentage
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.2}%)",
            self.label,
            self.confidence_percent()
        )
    }
}

fn label_for(labels: &[String], index: usize) -> String {
    labels
        .get(index)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Predictor holding a loaded model and its label list
pub struct Predictor<B: Backend> {
    model: FlowerNet<B>,
    labels: Vec<String>,
    input_size: usize,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load a predictor from a directory of training artifacts.
    ///
    /// Expects `flower_model.mpk`, `model_config.json`, and
    /// `class_names.txt` as written by the trainer.
    pub fn from_artifacts(dir: &Path, device: &B::Device) -> Result<Self> {
        info!("Loading model artifacts from {:?}", dir);

        let labels = read_class_names(&dir.join(CLASS_NAMES_FILE))?;
        if labels.is_empty() {
            anyhow::bail!("Class names file in {:?} is empty", dir);
        }

        let config = FlowerNetConfig::load(dir.join(MODEL_CONFIG_FILE))
            .map_err(|e| anyhow::anyhow!("Failed to load model config: {:?}", e))?;

        if config.num_classes != labels.len() {
            anyhow::bail!(
                "Model expects {} classes but class names file lists {}",
                config.num_classes,
                labels.len()
            );
        }

        let model = FlowerNet::<B>::new(&config, device)
            .load_file(dir.join(MODEL_FILE), &CompactRecorder::new(), device)
            .map_err(|e| anyhow::anyhow!("Failed to load model record: {:?}", e))?;

        info!("Model loaded: {} classes", labels.len());

        Ok(Self {
            model,
            labels,
            input_size: config.input_size,
            device: device.clone(),
        })
    }

    /// Labels in output-index order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    /// Model input size (square)
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Classify a decoded image.
    pub fn predict_image(&self, image: &DynamicImage) -> Prediction {
        let size = self.input_size;
        let rgb = image
            .resize_exact(size as u32, size as u32, FilterType::Triangle)
            .to_rgb8();
        let data = rescale_chw(&rgb);

        let start = Instant::now();
        let tensor = Tensor::<B, 1>::from_floats(data.as_slice(), &self.device)
            .reshape([1, 3, size, size]);
        let probs = self.model.forward_softmax(tensor);
        let elapsed = start.elapsed();

        let probabilities: Vec<f32> = probs
            .into_data()
            .to_vec()
            .expect("probability tensor should convert to a vector");

        Prediction::from_probabilities(probabilities, &self.labels, elapsed, None)
    }

    /// Classify an image file.
    pub fn predict_file(&self, path: &Path) -> Result<Prediction> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open image {:?}", path))?;

        let mut prediction = self.predict_image(&image);
        prediction.image_path = Some(path.to_path_buf());
        Ok(prediction)
    }

    /// Classify image bytes (e.g. from a drag-and-drop payload).
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let image = image::load_from_memory(bytes).context("Failed to decode image bytes")?;
        Ok(self.predict_image(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use crate::model::cnn::FlowerNetConfig;
    use std::fs;

    fn labels() -> Vec<String> {
        ["Daisy", "Lavender", "Lily", "Marigold", "Rose"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_prediction_argmax_and_top_k() {
        let mut probs = vec![0.0f32; 5];
        probs[2] = 0.7;
        probs[0] = 0.2;
        probs[4] = 0.1;

        let prediction =
            Prediction::from_probabilities(probs, &labels(), Duration::from_millis(12), None);

        assert_eq!(prediction.class_index, 2);
        assert_eq!(prediction.label, "Lily");
        assert!((prediction.confidence - 0.7).abs() < 1e-6);
        assert_eq!(prediction.top_k.len(), 5);
        assert_eq!(prediction.top_k[0].label, "Lily");
        assert_eq!(prediction.top_k[1].label, "Daisy");
        // descending order
        for pair in prediction.top_k.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
    }

    #[test]
    fn test_prediction_out_of_range_label() {
        let probs = vec![0.1f32, 0.9];
        let short_labels = vec!["Daisy".to_string()];

        let prediction = Prediction::from_probabilities(
            probs,
            &short_labels,
            Duration::from_millis(1),
            None,
        );

        assert_eq!(prediction.class_index, 1);
        assert_eq!(prediction.label, "Unknown");
    }

    #[test]
    fn test_confidence_percent() {
        let prediction = Prediction::from_probabilities(
            vec![0.25, 0.75],
            &labels(),
            Duration::from_millis(1),
            None,
        );
        assert!((prediction.confidence_percent() - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_predictor_artifact_round_trip() {
        let dir = std::env::temp_dir().join(format!(
            "flower_predictor_test_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        // Write artifacts the way the trainer does, with a tiny model
        let device = Default::default();
        let config = FlowerNetConfig::new()
            .with_num_classes(3)
            .with_input_size(32)
            .with_base_filters(4);
        let model = FlowerNet::<DefaultBackend>::new(&config, &device);

        model
            .save_file(dir.join(MODEL_FILE), &CompactRecorder::new())
            .unwrap();
        config.save(dir.join(MODEL_CONFIG_FILE)).unwrap();
        fs::write(dir.join(CLASS_NAMES_FILE), "Daisy\nRose\nTulip\n").unwrap();

        let predictor = Predictor::<DefaultBackend>::from_artifacts(&dir, &device).unwrap();
        assert_eq!(predictor.num_classes(), 3);
        assert_eq!(predictor.input_size(), 32);

        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            48,
            48,
            image::Rgb([200, 30, 90]),
        ));
        let prediction = predictor.predict_image(&image);

        assert_eq!(prediction.probabilities.len(), 3);
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(["Daisy", "Rose", "Tulip"].contains(&prediction.label.as_str()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_predictor_label_count_mismatch() {
        let dir = std::env::temp_dir().join(format!(
            "flower_predictor_mismatch_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let device = Default::default();
        let config = FlowerNetConfig::new()
            .with_num_classes(3)
            .with_input_size(32)
            .with_base_filters(4);
        let model = FlowerNet::<DefaultBackend>::new(&config, &device);

        model
            .save_file(dir.join(MODEL_FILE), &CompactRecorder::new())
            .unwrap();
        config.save(dir.join(MODEL_CONFIG_FILE)).unwrap();
        // Two labels for a three-class model
        fs::write(dir.join(CLASS_NAMES_FILE), "Daisy\nRose\n").unwrap();

        let result = Predictor::<DefaultBackend>::from_artifacts(&dir, &device);
        assert!(result.is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
