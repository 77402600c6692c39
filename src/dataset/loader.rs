//! Flower dataset loader.
//!
//! Scans a directory of class-named subfolders and builds the sample list
//! and label mappings used by the trainer and the stats command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageReader};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::is_image_file;
use crate::IMAGE_SIZE;

/// A single image sample with its label and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (the directory name, e.g. "Tulip")
    pub class_name: String,
    /// Unique sample ID
    pub id: usize,
}

/// Flower dataset with lazy image loading
#[derive(Debug)]
pub struct FlowerDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples in the dataset
    pub samples: Vec<ImageSample>,
    /// Mapping from class name to label index
    pub class_to_idx: HashMap<String, usize>,
    /// Mapping from label index to class name
    pub idx_to_class: HashMap<usize, String>,
    /// Target image size (width, height)
    pub image_size: (u32, u32),
}

impl FlowerDataset {
    /// Create a new dataset from a directory.
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── Daisy/
    /// │   ├── Image_1.jpg
    /// │   └── Image_2.jpg
    /// ├── Rose/
    /// │   └── ...
    /// └── ...
    /// ```
    ///
    /// Subdirectory names are sorted to make label indices deterministic.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading flower dataset from: {:?}", root_dir);

        if !root_dir.exists() {
            anyhow::bail!("Dataset directory does not exist: {:?}", root_dir);
        }

        // Discover all class directories
        let mut class_dirs: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if !name.starts_with('.') {
                        class_dirs.push(name.to_string());
                    }
                }
            }
        }
        class_dirs.sort();

        info!("Found {} classes", class_dirs.len());

        let class_to_idx: HashMap<String, usize> = class_dirs
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let idx_to_class: HashMap<usize, String> = class_dirs
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx, name.clone()))
            .collect();

        // Collect all samples
        let mut samples = Vec::new();
        let mut sample_id: usize = 0;

        for class_name in &class_dirs {
            let class_dir = root_dir.join(class_name);
            let label = class_to_idx[class_name];

            for entry in WalkDir::new(&class_dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();
                if is_image_file(&path) {
                    samples.push(ImageSample {
                        path,
                        label,
                        class_name: class_name.clone(),
                        id: sample_id,
                    });
                    sample_id += 1;
                }
            }

            debug!("Class '{}' assigned label {}", class_name, label);
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            root_dir,
            samples,
            class_to_idx,
            idx_to_class,
            image_size: (IMAGE_SIZE as u32, IMAGE_SIZE as u32),
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.class_to_idx.len()
    }

    /// Class names ordered by label index.
    ///
    /// This is the exact order written to the class-names file.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<(usize, String)> = self
            .idx_to_class
            .iter()
            .map(|(idx, name)| (*idx, name.clone()))
            .collect();
        names.sort_by_key(|(idx, _)| *idx);
        names.into_iter().map(|(_, name)| name).collect()
    }

    /// Load an image from disk and resize it to the model input size
    pub fn load_image(&self, sample: &ImageSample) -> Result<DynamicImage> {
        let img = ImageReader::open(&sample.path)
            .with_context(|| format!("Failed to open image: {:?}", sample.path))?
            .decode()
            .with_context(|| format!("Failed to decode image: {:?}", sample.path))?;

        Ok(img.resize_exact(
            self.image_size.0,
            self.image_size.1,
            image::imageops::FilterType::Triangle,
        ))
    }

    /// Shuffle the samples in place with a given seed
    pub fn shuffle(&mut self, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.samples.shuffle(&mut rng);
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.class_names(),
        }
    }
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\nDataset statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        for (idx, name) in self.class_names.iter().enumerate() {
            let count = self.class_counts[idx];
            let bar_len = if self.total_samples > 0 {
                (count as f32 / self.total_samples as f32 * 40.0) as usize
            } else {
                0
            };
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:20} {:5} {}", idx, name, count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_test_dataset(root: &Path, classes: &[(&str, usize)]) {
        for (name, count) in classes {
            let dir = root.join(name);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..*count {
                let img = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 80, 40]));
                img.save(dir.join(format!("Image_{}.png", i + 1))).unwrap();
            }
        }
    }

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "flower_loader_test_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_class_order_is_sorted() {
        let root = temp_root("sorted");
        write_test_dataset(&root, &[("Tulip", 2), ("Daisy", 1), ("Rose", 3)]);

        let dataset = FlowerDataset::new(&root).unwrap();

        assert_eq!(dataset.num_classes(), 3);
        assert_eq!(dataset.class_names(), vec!["Daisy", "Rose", "Tulip"]);
        assert_eq!(dataset.class_to_idx["Daisy"], 0);
        assert_eq!(dataset.class_to_idx["Tulip"], 2);
        assert_eq!(dataset.len(), 6);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_stats_counts_per_class() {
        let root = temp_root("stats");
        write_test_dataset(&root, &[("Lily", 4), ("Violet", 2)]);

        let dataset = FlowerDataset::new(&root).unwrap();
        let stats = dataset.get_stats();

        assert_eq!(stats.total_samples, 6);
        assert_eq!(stats.class_counts, vec![4, 2]);
        assert_eq!(stats.class_names, vec!["Lily", "Violet"]);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_directory_errors() {
        let result = FlowerDataset::new("/definitely/not/a/real/dir");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_image_resizes_to_model_input() {
        let root = temp_root("resize");
        write_test_dataset(&root, &[("Daisy", 1)]);

        let dataset = FlowerDataset::new(&root).unwrap();
        let image = dataset.load_image(&dataset.samples[0]).unwrap();

        assert_eq!(image.width(), dataset.image_size.0);
        assert_eq!(image.height(), dataset.image_size.1);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let root = temp_root("shuffle");
        write_test_dataset(&root, &[("Daisy", 5), ("Rose", 5)]);

        let mut a = FlowerDataset::new(&root).unwrap();
        let mut b = FlowerDataset::new(&root).unwrap();
        a.shuffle(7);
        b.shuffle(7);

        let ids_a: Vec<usize> = a.samples.iter().map(|s| s.id).collect();
        let ids_b: Vec<usize> = b.samples.iter().map(|s| s.id).collect();
        assert_eq!(ids_a, ids_b);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_non_image_files_ignored() {
        let root = temp_root("mixed");
        write_test_dataset(&root, &[("Rose", 2)]);
        fs::write(root.join("Rose").join("notes.txt"), "not an image").unwrap();

        let dataset = FlowerDataset::new(&root).unwrap();
        assert_eq!(dataset.len(), 2);

        let _ = fs::remove_dir_all(&root);
    }
}
