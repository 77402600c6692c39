//! Data augmentation for training batches.
//!
//! Mirrors the classic recipe for small image datasets: random horizontal
//! flip, coarse rotation, and a mild zoom-crop. Applied per batch so each
//! epoch sees different variants of the same images.

use std::sync::Mutex;

use image::{DynamicImage, GenericImageView};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Augmentation configuration
#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Apply horizontal flip with probability 0.5
    pub horizontal_flip: bool,
    /// Maximum rotation in degrees (sampled in [-range, range])
    pub rotation_range: f32,
    /// Maximum zoom factor above 1.0 (0.1 means up to 10% zoom-in)
    pub zoom_range: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            horizontal_flip: true,
            rotation_range: 36.0,
            zoom_range: 0.1,
        }
    }
}

impl AugmentConfig {
    /// Identity transform
    pub fn none() -> Self {
        Self {
            horizontal_flip: false,
            rotation_range: 0.0,
            zoom_range: 0.0,
        }
    }
}

/// Augmentation pipeline with its own seeded RNG.
///
/// The RNG lives behind a mutex so the augmenter can be shared by a batcher
/// that only has `&self` during batch construction.
pub struct Augmenter {
    config: AugmentConfig,
    rng: Mutex<ChaCha8Rng>,
}

impl Augmenter {
    pub fn new(config: AugmentConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Apply the configured random transforms to an image
    pub fn augment(&self, image: &DynamicImage) -> DynamicImage {
        let mut rng = self.rng.lock().expect("augmenter rng poisoned");
        let mut augmented = image.clone();

        if self.config.horizontal_flip && rng.gen_bool(0.5) {
            augmented = augmented.fliph();
        }

        if self.config.rotation_range > 0.0 {
            let angle = rng.gen_range(-self.config.rotation_range..=self.config.rotation_range);
            augmented = rotate(&augmented, angle);
        }

        if self.config.zoom_range > 0.0 {
            let factor = rng.gen_range(1.0..=1.0 + self.config.zoom_range);
            augmented = zoom_crop(&augmented, factor, &mut rng);
        }

        augmented
    }
}

/// Rotate an image by the given angle in degrees.
///
/// Arbitrary-angle rotation would need resampling support the image crate
/// does not provide, so angles snap to the nearest quarter turn.
fn rotate(image: &DynamicImage, angle: f32) -> DynamicImage {
    let normalized = ((angle % 360.0 + 360.0) % 360.0) as i32;

    match normalized {
        45..=135 => DynamicImage::ImageRgb8(image::imageops::rotate90(&image.to_rgb8())),
        136..=225 => DynamicImage::ImageRgb8(image::imageops::rotate180(&image.to_rgb8())),
        226..=315 => DynamicImage::ImageRgb8(image::imageops::rotate270(&image.to_rgb8())),
        _ => image.clone(),
    }
}

/// Crop a random window scaled down by `factor` and resize back.
fn zoom_crop(image: &DynamicImage, factor: f32, rng: &mut ChaCha8Rng) -> DynamicImage {
    let (width, height) = image.dimensions();

    let crop_width = (width as f32 / factor) as u32;
    let crop_height = (height as f32 / factor) as u32;

    if crop_width == 0 || crop_height == 0 || crop_width > width || crop_height > height {
        return image.clone();
    }

    let x = rng.gen_range(0..=(width - crop_width));
    let y = rng.gen_range(0..=(height - crop_height));

    image
        .crop_imm(x, y, crop_width, crop_height)
        .resize_exact(width, height, image::imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image() -> DynamicImage {
        let img = ImageBuffer::from_fn(64, 64, |x, y| {
            if x < 32 && y < 32 {
                Rgb([255u8, 0u8, 0u8])
            } else {
                Rgb([0u8, 0u8, 255u8])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_augment_preserves_dimensions() {
        let augmenter = Augmenter::new(AugmentConfig::default(), 42);
        let image = create_test_image();

        for _ in 0..10 {
            let out = augmenter.augment(&image);
            assert_eq!(out.dimensions(), image.dimensions());
        }
    }

    #[test]
    fn test_identity_config_is_identity() {
        let augmenter = Augmenter::new(AugmentConfig::none(), 7);
        let image = create_test_image();

        let out = augmenter.augment(&image);
        assert_eq!(out.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_augment_is_deterministic_for_seed() {
        let image = create_test_image();

        let a = Augmenter::new(AugmentConfig::default(), 99);
        let b = Augmenter::new(AugmentConfig::default(), 99);

        let out_a = a.augment(&image);
        let out_b = b.augment(&image);
        assert_eq!(out_a.to_rgb8().as_raw(), out_b.to_rgb8().as_raw());
    }

    #[test]
    fn test_rotate_quarter_turns() {
        let image = create_test_image();

        let quarter = rotate(&image, 90.0);
        assert_eq!(quarter.dimensions(), (64, 64));

        let none = rotate(&image, 10.0);
        assert_eq!(none.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_zoom_crop_dimensions() {
        let image = create_test_image();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let zoomed = zoom_crop(&image, 1.1, &mut rng);
        assert_eq!(zoomed.dimensions(), image.dimensions());
    }
}
