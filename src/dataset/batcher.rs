//! Burn dataset and batcher integration.
//!
//! Items carry decoded, already-resized RGB images so the batcher only has
//! to augment (training batches) and convert to tensors. Batches rescale
//! pixels to [-1, 1], the range the pretrained backbone expects.

use std::path::PathBuf;
use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};

use super::augmentation::Augmenter;
use crate::IMAGE_SIZE;

/// A single training item ready for batching
#[derive(Clone, Debug)]
pub struct FlowerItem {
    /// Decoded RGB image, resized to the model input size
    pub image: RgbImage,
    /// Class label index
    pub label: usize,
    /// Image path (for debugging/logging)
    pub path: String,
}

impl FlowerItem {
    /// Create a new item by loading and resizing an image from disk
    pub fn from_path(path: &PathBuf, label: usize, image_size: usize) -> anyhow::Result<Self> {
        let image = ImageReader::open(path)?
            .decode()?
            .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
            .to_rgb8();

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Create from a decoded image
    pub fn from_image(image: RgbImage, label: usize, path: String) -> Self {
        Self { image, label, path }
    }
}

/// Convert an RGB image to a flat CHW float vector rescaled to [-1, 1].
pub fn rescale_chw(img: &RgbImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let num_pixels = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in img.pixels().enumerate() {
        data[i] = pixel[0] as f32 / 127.5 - 1.0;
        data[num_pixels + i] = pixel[1] as f32 / 127.5 - 1.0;
        data[2 * num_pixels + i] = pixel[2] as f32 / 127.5 - 1.0;
    }

    data
}

/// Flower dataset implementing Burn's Dataset trait.
///
/// Images can be cached in memory up front (training, where every epoch
/// touches every sample) or loaded on demand.
#[derive(Clone)]
pub struct FlowerBurnDataset {
    /// List of (image_path, label) pairs
    samples: Vec<(PathBuf, usize)>,
    /// Target image size
    image_size: usize,
    /// Cached items, when preloading was requested
    cached_items: Option<Vec<FlowerItem>>,
}

impl FlowerBurnDataset {
    /// Create a lazy dataset from a list of samples
    pub fn new(samples: Vec<(PathBuf, usize)>, image_size: usize) -> Self {
        Self {
            samples,
            image_size,
            cached_items: None,
        }
    }

    /// Create a dataset with all images decoded into memory
    pub fn new_cached(samples: Vec<(PathBuf, usize)>, image_size: usize) -> anyhow::Result<Self> {
        let cached_items: Result<Vec<_>, _> = samples
            .iter()
            .map(|(path, label)| FlowerItem::from_path(path, *label, image_size))
            .collect();

        Ok(Self {
            samples,
            image_size,
            cached_items: Some(cached_items?),
        })
    }

    /// Number of distinct labels referenced by the samples
    pub fn num_classes(&self) -> usize {
        self.samples
            .iter()
            .map(|(_, label)| *label)
            .max()
            .map(|m| m + 1)
            .unwrap_or(0)
    }
}

impl Dataset<FlowerItem> for FlowerBurnDataset {
    fn get(&self, index: usize) -> Option<FlowerItem> {
        if index >= self.samples.len() {
            return None;
        }

        if let Some(ref cached) = self.cached_items {
            return cached.get(index).cloned();
        }

        let (path, label) = &self.samples[index];
        FlowerItem::from_path(path, *label, self.image_size).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A batch of flower images
#[derive(Clone, Debug)]
pub struct FlowerBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width], rescaled to [-1, 1]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher for flower training and validation batches
#[derive(Clone)]
pub struct FlowerBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
    augmenter: Option<Arc<Augmenter>>,
}

impl<B: Backend> FlowerBatcher<B> {
    /// Create a new batcher for the given device
    pub fn new(device: B::Device) -> Self {
        Self {
            device,
            image_size: IMAGE_SIZE,
            augmenter: None,
        }
    }

    /// Create a batcher with a custom image size
    pub fn with_image_size(device: B::Device, image_size: usize) -> Self {
        Self {
            device,
            image_size,
            augmenter: None,
        }
    }

    /// Attach an augmenter; every batched image gets a random variant.
    pub fn with_augmenter(mut self, augmenter: Arc<Augmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }
}

impl<B: Backend> Batcher<B, FlowerItem, FlowerBatch<B>> for FlowerBatcher<B> {
    fn batch(&self, items: Vec<FlowerItem>, _device: &B::Device) -> FlowerBatch<B> {
        let batch_size = items.len();
        let (channels, height, width) = (3, self.image_size, self.image_size);

        let mut images_data: Vec<f32> = Vec::with_capacity(batch_size * channels * height * width);
        let mut targets_data: Vec<i64> = Vec::with_capacity(batch_size);

        for item in &items {
            let rgb = match &self.augmenter {
                Some(augmenter) => augmenter
                    .augment(&DynamicImage::ImageRgb8(item.image.clone()))
                    .to_rgb8(),
                None => item.image.clone(),
            };

            images_data.extend(rescale_chw(&rgb));
            targets_data.push(item.label as i64);
        }

        let images = Tensor::<B, 1>::from_floats(images_data.as_slice(), &self.device)
            .reshape([batch_size, channels, height, width]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets_data.as_slice(), &self.device);

        FlowerBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use crate::dataset::augmentation::AugmentConfig;

    fn test_item(label: usize, size: u32) -> FlowerItem {
        let image = RgbImage::from_pixel(size, size, image::Rgb([255, 0, 127]));
        FlowerItem::from_image(image, label, format!("test_{}.png", label))
    }

    #[test]
    fn test_rescale_range() {
        let mut img = RgbImage::from_pixel(2, 2, image::Rgb([0, 255, 127]));
        img.put_pixel(0, 0, image::Rgb([0, 0, 0]));

        let data = rescale_chw(&img);
        assert_eq!(data.len(), 3 * 4);
        // 0 -> -1.0
        assert!((data[0] + 1.0).abs() < 1e-6);
        // 255 -> 1.0 (green channel of the uniform pixels)
        assert!((data[5] - 1.0).abs() < 1e-6);
        // everything stays within [-1, 1]
        assert!(data.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_batch_shapes() {
        let device = Default::default();
        let batcher = FlowerBatcher::<DefaultBackend>::with_image_size(device, 32);

        let items = vec![test_item(0, 32), test_item(1, 32), test_item(2, 32)];
        let batch = batcher.batch(items, &Default::default());

        assert_eq!(batch.images.dims(), [3, 3, 32, 32]);
        assert_eq!(batch.targets.dims(), [3]);
    }

    #[test]
    fn test_batch_targets_order() {
        let device = Default::default();
        let batcher = FlowerBatcher::<DefaultBackend>::with_image_size(device, 16);

        let items = vec![test_item(2, 16), test_item(0, 16)];
        let batch = batcher.batch(items, &Default::default());

        let targets: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![2, 0]);
    }

    #[test]
    fn test_batcher_with_augmenter_keeps_shapes() {
        let device = Default::default();
        let augmenter = Arc::new(Augmenter::new(AugmentConfig::default(), 5));
        let batcher =
            FlowerBatcher::<DefaultBackend>::with_image_size(device, 24).with_augmenter(augmenter);

        let batch = batcher.batch(vec![test_item(1, 24)], &Default::default());
        assert_eq!(batch.images.dims(), [1, 3, 24, 24]);
    }

    #[test]
    fn test_dataset_len_and_oob() {
        let dataset = FlowerBurnDataset::new(
            vec![
                (PathBuf::from("a.jpg"), 0),
                (PathBuf::from("b.jpg"), 1),
            ],
            32,
        );

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.num_classes(), 2);
        assert!(dataset.get(5).is_none());
    }
}
