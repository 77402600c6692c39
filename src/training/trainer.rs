//! Training loop and artifact persistence.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use burn::{
    config::Config,
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    record::CompactRecorder,
    tensor::backend::{AutodiffBackend, Backend},
    tensor::ElementConversion,
};
use chrono::Local;
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::TrainConfig;
use crate::dataset::augmentation::{AugmentConfig, Augmenter};
use crate::dataset::{DatasetSplit, FlowerBatcher, FlowerBurnDataset, FlowerDataset, SplitConfig};
use crate::model::cnn::{Backbone, FlowerNet, FlowerNetConfig};
use crate::{CLASS_NAMES_FILE, IMAGE_SIZE, MODEL_CONFIG_FILE, MODEL_FILE};

/// Result of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub train_samples: usize,
    pub validation_samples: usize,
    pub epochs: usize,
    pub best_validation_accuracy: f64,
    pub final_train_accuracy: f64,
    pub model_path: PathBuf,
    pub started_at: String,
}

/// Run training with the given configuration.
///
/// Loads the dataset, splits it, fits the model, and writes three
/// artifacts to the output directory: the model record, the architecture
/// config, and the ordered class-names file. The class-names file line
/// order is the model's output-index order.
pub fn run_training<B>(config: &TrainConfig) -> Result<TrainingSummary>
where
    B: AutodiffBackend,
{
    println!("{}", "Initializing training...".green().bold());
    let started_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let device = B::Device::default();
    std::fs::create_dir_all(&config.output_dir)?;

    // Load the dataset
    println!("{}", "Loading dataset...".cyan());
    let dataset = FlowerDataset::new(&config.data_dir)?;
    let stats = dataset.get_stats();
    stats.print();

    if stats.total_samples == 0 {
        anyhow::bail!(
            "No images found in {:?}. Run the scraper first: flower_classifier scrape",
            config.data_dir
        );
    }

    let class_names = dataset.class_names();
    let num_classes = class_names.len();
    info!("Found classes: {:?}", class_names);

    // Stratified train/validation split
    let samples: Vec<(PathBuf, usize, String)> = dataset
        .samples
        .iter()
        .map(|s| (s.path.clone(), s.label, s.class_name.clone()))
        .collect();

    let split_config = SplitConfig {
        validation_fraction: config.validation_fraction,
        seed: config.seed,
        stratified: true,
    };
    let split = DatasetSplit::from_samples(samples, split_config)?;

    let train_samples: Vec<(PathBuf, usize)> = split
        .train
        .iter()
        .map(|img| (img.path.clone(), img.label))
        .collect();
    let val_samples: Vec<(PathBuf, usize)> = split
        .validation
        .iter()
        .map(|img| (img.path.clone(), img.label))
        .collect();

    if train_samples.len() < config.batch_size {
        anyhow::bail!(
            "Not enough training data ({}) for batch size {}",
            train_samples.len(),
            config.batch_size
        );
    }

    println!();
    println!("{}", "Dataset splits:".cyan().bold());
    println!("  Training samples:   {}", train_samples.len());
    println!("  Validation samples: {}", val_samples.len());

    println!();
    println!("{}", "Pre-loading training data...".cyan());
    let train_dataset = FlowerBurnDataset::new_cached(train_samples.clone(), IMAGE_SIZE)
        .context("Failed to load training dataset")?;

    println!("{}", "Pre-loading validation data...".cyan());
    let val_dataset = FlowerBurnDataset::new_cached(val_samples.clone(), IMAGE_SIZE)
        .context("Failed to load validation dataset")?;

    let mut train_batcher = FlowerBatcher::<B>::with_image_size(device.clone(), IMAGE_SIZE);
    if config.augment {
        let augmenter = Arc::new(Augmenter::new(AugmentConfig::default(), config.seed));
        train_batcher = train_batcher.with_augmenter(augmenter);
    }

    // Create the model, optionally with pretrained backbone weights
    println!();
    println!("{}", "Creating model...".cyan());
    let model_config = FlowerNetConfig::new()
        .with_num_classes(num_classes)
        .with_input_size(IMAGE_SIZE);

    let mut model = FlowerNet::<B>::new(&model_config, &device);
    let recorder = CompactRecorder::new();

    let mut freeze = config.freeze_backbone;
    match &config.backbone_weights {
        Some(path) => {
            let backbone = Backbone::<B>::new(&model_config, &device)
                .load_file(path, &recorder, &device)
                .map_err(|e| anyhow::anyhow!("Failed to load backbone weights: {:?}", e))?;
            model = model.with_backbone(backbone);
            println!("  Loaded backbone weights from {:?}", path);
        }
        None => {
            if freeze {
                warn!("No backbone weights given; training the whole network instead");
                println!(
                    "  {} no pretrained backbone, training end to end",
                    "Note:".yellow()
                );
                freeze = false;
            }
        }
    }

    let mut optimizer = AdamConfig::new().init();

    println!();
    println!("{}", "Training configuration:".cyan().bold());
    println!("  Epochs:        {}", config.epochs);
    println!("  Batch size:    {}", config.batch_size);
    println!("  Learning rate: {}", config.learning_rate);
    println!("  Augmentation:  {}", config.augment);
    println!("  Frozen backbone: {}", freeze);
    println!("  Backend:       {}", crate::backend::backend_name());
    println!();

    println!("{}", "Starting training...".green().bold());
    println!();

    let mut best_val_acc = 0.0f64;
    let mut final_train_acc = 0.0f64;
    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);

    for epoch in 0..config.epochs {
        println!(
            "{}",
            format!("Epoch {}/{}", epoch + 1, config.epochs).yellow().bold()
        );

        let mut epoch_loss = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        // Shuffle indices instead of materializing batches up front
        let mut indices: Vec<usize> = (0..train_dataset.len()).collect();
        indices.shuffle(&mut epoch_rng);
        let num_batches = indices.len().div_ceil(config.batch_size);

        for batch_idx in 0..num_batches {
            let start = batch_idx * config.batch_size;
            let end = (start + config.batch_size).min(indices.len());
            let items: Vec<_> = indices[start..end]
                .iter()
                .filter_map(|&i| train_dataset.get(i))
                .collect();

            if items.is_empty() {
                continue;
            }

            let batch = train_batcher.batch(items, &device);
            let batch_len = batch.targets.dims()[0];

            let logits = if freeze {
                model.forward_frozen(batch.images.clone())
            } else {
                model.forward(batch.images.clone())
            };

            let loss = CrossEntropyLossConfig::new()
                .init(&logits.device())
                .forward(logits.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;

            let predictions = logits.argmax(1).reshape([batch_len]);
            let batch_correct: i64 = predictions
                .equal(batch.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            seen += batch_len;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);

            if (batch_idx + 1) % 10 == 0 || batch_idx == num_batches - 1 {
                let running_acc = 100.0 * correct as f64 / seen.max(1) as f64;
                println!(
                    "  Batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                    batch_idx + 1,
                    num_batches,
                    loss_value,
                    running_acc
                );
            }
        }

        let avg_loss = epoch_loss / num_batches.max(1) as f64;
        let train_acc = 100.0 * correct as f64 / seen.max(1) as f64;
        final_train_acc = train_acc;

        let val_acc = evaluate::<B>(&model, &val_dataset, config.batch_size);

        let is_best = val_acc > best_val_acc;
        if is_best {
            best_val_acc = val_acc;
        }

        println!(
            "  {} loss: {:.4} | train acc: {:.2}% | val acc: {:.2}%{}",
            "→".cyan(),
            avg_loss,
            train_acc,
            val_acc,
            if is_best {
                " (best)".green().to_string()
            } else {
                String::new()
            }
        );
        println!();
    }

    // Persist artifacts
    println!("{}", "Saving model...".cyan());
    let model_path = config.output_dir.join(MODEL_FILE);
    model
        .clone()
        .save_file(&model_path, &recorder)
        .map_err(|e| anyhow::anyhow!("Failed to save model: {:?}", e))?;

    model_config
        .save(config.output_dir.join(MODEL_CONFIG_FILE))
        .context("Failed to save model config")?;

    write_class_names(&config.output_dir.join(CLASS_NAMES_FILE), &class_names)?;

    let summary = TrainingSummary {
        num_classes,
        class_names,
        train_samples: train_samples.len(),
        validation_samples: val_samples.len(),
        epochs: config.epochs,
        best_validation_accuracy: best_val_acc,
        final_train_accuracy: final_train_acc,
        model_path: model_path.clone(),
        started_at,
    };

    let summary_json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(config.output_dir.join("training_summary.json"), summary_json)?;

    println!("  Saved to: {:?}", model_path);
    println!();
    println!("{}", "Training complete!".green().bold());
    println!("  Best validation accuracy: {:.2}%", best_val_acc);

    Ok(summary)
}

/// Evaluate accuracy on a dataset using the inner (non-autodiff) backend.
fn evaluate<B: AutodiffBackend>(
    model: &FlowerNet<B>,
    dataset: &FlowerBurnDataset,
    batch_size: usize,
) -> f64 {
    let device = <B::InnerBackend as Backend>::Device::default();
    let batcher = FlowerBatcher::<B::InnerBackend>::with_image_size(device.clone(), IMAGE_SIZE);

    let inner_model = model.clone().valid();
    let len = dataset.len();
    let mut correct = 0usize;
    let mut total = 0usize;

    for start in (0..len).step_by(batch_size.max(1)) {
        let end = (start + batch_size).min(len);
        let items: Vec<_> = (start..end).filter_map(|i| dataset.get(i)).collect();

        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch(items, &device);
        let batch_len = batch.targets.dims()[0];

        let output = inner_model.forward(batch.images);
        let predictions = output.argmax(1).reshape([batch_len]);

        let batch_correct: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();

        correct += batch_correct as usize;
        total += batch_len;
    }

    if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    }
}

/// Write the ordered label list, one per line.
fn write_class_names(path: &PathBuf, class_names: &[String]) -> Result<()> {
    let mut content = class_names.join("\n");
    content.push('\n');
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write class names to {:?}", path))
}

/// Read the label list back, preserving line order.
pub fn read_class_names(path: &std::path::Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read class names from {:?}", path))?;

    Ok(content
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "flower_trainer_test_{}_{}.txt",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn test_class_names_round_trip() {
        let path = temp_file("roundtrip");
        let names: Vec<String> = ["Daisy", "Rose", "Tulip"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        write_class_names(&path, &names).unwrap();
        let read = read_class_names(&path).unwrap();

        assert_eq!(read, names);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_class_names_skips_blank_lines() {
        let path = temp_file("blank");
        std::fs::write(&path, "Daisy\n\nRose\n").unwrap();

        let read = read_class_names(&path).unwrap();
        assert_eq!(read, vec!["Daisy".to_string(), "Rose".to_string()]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_missing_class_names_errors() {
        assert!(read_class_names(std::path::Path::new("/missing/class_names.txt")).is_err());
    }
}
