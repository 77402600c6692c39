//! Deterministic train/validation splitting.
//!
//! The split is stratified by default: each class contributes the same
//! fraction of its samples to the validation set, so small classes are not
//! accidentally excluded from evaluation. A fixed seed makes the split
//! reproducible across runs.

use std::collections::HashMap;
use std::path::PathBuf;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{FlowerError, Result};

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of each class held out for validation
    pub validation_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Ensure class balance in the split
    pub stratified: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_fraction: 0.2,
            seed: 123,
            stratified: true,
        }
    }
}

impl SplitConfig {
    pub fn new(validation_fraction: f64, seed: u64) -> Result<Self> {
        if !(0.0..1.0).contains(&validation_fraction) {
            return Err(FlowerError::Config(
                "Validation fraction must be in [0.0, 1.0)".to_string(),
            ));
        }

        Ok(Self {
            validation_fraction,
            seed,
            stratified: true,
        })
    }
}

/// A labeled image with known ground truth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledImage {
    /// Path to the image file
    pub path: PathBuf,
    /// Ground truth class label
    pub label: usize,
    /// Class name (e.g. "Sunflower")
    pub class_name: String,
}

/// Train/validation split of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSplit {
    /// Training pool
    pub train: Vec<LabeledImage>,
    /// Validation set
    pub validation: Vec<LabeledImage>,
    /// Class names present in the input
    pub class_names: Vec<String>,
    /// Configuration used to create this split
    pub config: SplitConfig,
}

impl DatasetSplit {
    /// Create a split from a list of (path, label, class_name) tuples.
    pub fn from_samples(
        images: Vec<(PathBuf, usize, String)>,
        config: SplitConfig,
    ) -> Result<Self> {
        if images.is_empty() {
            return Err(FlowerError::Dataset(
                "No images provided for splitting".to_string(),
            ));
        }

        let mut class_names: Vec<String> = images
            .iter()
            .map(|(_, _, name)| name.clone())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        class_names.sort();

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let (train, validation) = if config.stratified {
            Self::stratified_split(images, &config, &mut rng)
        } else {
            Self::random_split(images, &config, &mut rng)
        };

        Ok(Self {
            train,
            validation,
            class_names,
            config,
        })
    }

    /// Split each class proportionally, keeping class balance
    fn stratified_split(
        images: Vec<(PathBuf, usize, String)>,
        config: &SplitConfig,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<LabeledImage>, Vec<LabeledImage>) {
        let mut by_class: HashMap<usize, Vec<(PathBuf, usize, String)>> = HashMap::new();
        for img in images {
            by_class.entry(img.1).or_default().push(img);
        }

        // Iterate classes in label order so the split is deterministic
        let mut labels: Vec<usize> = by_class.keys().copied().collect();
        labels.sort_unstable();

        let mut train = Vec::new();
        let mut validation = Vec::new();

        for label in labels {
            let mut class_images = by_class.remove(&label).unwrap_or_default();
            class_images.shuffle(rng);

            let n_val = (class_images.len() as f64 * config.validation_fraction).ceil() as usize;
            let n_val = n_val.min(class_images.len());

            for (i, (path, label, class_name)) in class_images.into_iter().enumerate() {
                let image = LabeledImage {
                    path,
                    label,
                    class_name,
                };
                if i < n_val {
                    validation.push(image);
                } else {
                    train.push(image);
                }
            }
        }

        (train, validation)
    }

    /// Plain random split over the whole pool
    fn random_split(
        mut images: Vec<(PathBuf, usize, String)>,
        config: &SplitConfig,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<LabeledImage>, Vec<LabeledImage>) {
        images.shuffle(rng);

        let n_val = (images.len() as f64 * config.validation_fraction).ceil() as usize;
        let n_val = n_val.min(images.len());

        let mut train = Vec::new();
        let mut validation = Vec::new();

        for (i, (path, label, class_name)) in images.into_iter().enumerate() {
            let image = LabeledImage {
                path,
                label,
                class_name,
            };
            if i < n_val {
                validation.push(image);
            } else {
                train.push(image);
            }
        }

        (train, validation)
    }

    /// Number of samples across both pools
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    /// Per-class validation counts, useful for sanity checks
    pub fn validation_counts(&self) -> HashMap<usize, usize> {
        let mut counts = HashMap::new();
        for img in &self.validation {
            *counts.entry(img.label).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_samples(per_class: &[(&str, usize, usize)]) -> Vec<(PathBuf, usize, String)> {
        let mut out = Vec::new();
        for (name, label, count) in per_class {
            for i in 0..*count {
                out.push((
                    PathBuf::from(format!("{}/{}.jpg", name, i)),
                    *label,
                    name.to_string(),
                ));
            }
        }
        out
    }

    #[test]
    fn test_stratified_fraction_per_class() {
        let samples = make_samples(&[("Daisy", 0, 20), ("Rose", 1, 10)]);
        let split = DatasetSplit::from_samples(samples, SplitConfig::default()).unwrap();

        let counts = split.validation_counts();
        // ceil(20 * 0.2) = 4, ceil(10 * 0.2) = 2
        assert_eq!(counts[&0], 4);
        assert_eq!(counts[&1], 2);
        assert_eq!(split.total(), 30);
    }

    #[test]
    fn test_split_is_deterministic() {
        let samples = make_samples(&[("Daisy", 0, 12), ("Rose", 1, 8)]);
        let a = DatasetSplit::from_samples(samples.clone(), SplitConfig::default()).unwrap();
        let b = DatasetSplit::from_samples(samples, SplitConfig::default()).unwrap();

        let paths_a: Vec<_> = a.validation.iter().map(|i| i.path.clone()).collect();
        let paths_b: Vec<_> = b.validation.iter().map(|i| i.path.clone()).collect();
        assert_eq!(paths_a, paths_b);
    }

    #[test]
    fn test_different_seed_changes_split() {
        let samples = make_samples(&[("Daisy", 0, 30)]);
        let a = DatasetSplit::from_samples(samples.clone(), SplitConfig::default()).unwrap();
        let mut config = SplitConfig::default();
        config.seed = 999;
        let b = DatasetSplit::from_samples(samples, config).unwrap();

        let paths_a: Vec<_> = a.validation.iter().map(|i| i.path.clone()).collect();
        let paths_b: Vec<_> = b.validation.iter().map(|i| i.path.clone()).collect();
        assert_ne!(paths_a, paths_b);
    }

    #[test]
    fn test_empty_input_errors() {
        let result = DatasetSplit::from_samples(Vec::new(), SplitConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        assert!(SplitConfig::new(1.0, 42).is_err());
        assert!(SplitConfig::new(-0.1, 42).is_err());
        assert!(SplitConfig::new(0.2, 42).is_ok());
    }
}
