//! Flower Classifier CLI
//!
//! Entry point for the scraping, training, and inference stages of the
//! pipeline. Each subcommand runs to completion; defaults reproduce the
//! standard pipeline so bare invocations need no flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use flower_classifier::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use flower_classifier::dataset::is_image_file;
use flower_classifier::scrape::{scrape_all, ScrapeConfig, FLOWER_TYPES, SAMPLES_PER_CLASS};
use flower_classifier::training::TrainConfig;
use flower_classifier::utils::logging::{init_logging, LogConfig};
use flower_classifier::{
    FlowerDataset, Predictor, DEFAULT_DATASET_DIR, DEFAULT_OUTPUT_DIR,
};

/// Flower image classification pipeline
///
/// Scrape a labeled flower photo dataset, train a CNN classifier on it,
/// and classify new images from the command line.
#[derive(Parser, Debug)]
#[command(name = "flower_classifier")]
#[command(version)]
#[command(about = "Scrape, train, and classify flower images", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download flower images from Bing into class folders
    Scrape {
        /// Output directory for the dataset
        #[arg(short, long, default_value = DEFAULT_DATASET_DIR)]
        output_dir: String,

        /// Images to collect per class
        #[arg(short, long, default_value_t = SAMPLES_PER_CLASS)]
        samples: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Re-download classes that already have enough images
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// Train the classifier on a dataset directory
    Train {
        /// Path to the dataset directory
        #[arg(short, long, default_value = DEFAULT_DATASET_DIR)]
        data_dir: String,

        /// Number of training epochs
        #[arg(short, long, default_value = "50")]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Fraction of each class held out for validation
        #[arg(long, default_value = "0.2")]
        validation_split: f64,

        /// Random seed for splitting and shuffling
        #[arg(long, default_value = "123")]
        seed: u64,

        /// Output directory for trained artifacts
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: String,

        /// Disable data augmentation
        #[arg(long, default_value = "false")]
        no_augment: bool,

        /// Record file with pretrained backbone weights
        #[arg(long)]
        backbone: Option<String>,

        /// Train the backbone too instead of freezing it
        #[arg(long, default_value = "false")]
        no_freeze: bool,
    },

    /// Classify an image or a directory of images
    Infer {
        /// Path to input image or directory
        #[arg(short, long)]
        input: String,

        /// Directory with trained artifacts
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        model_dir: String,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the dataset directory
        #[arg(short, long, default_value = DEFAULT_DATASET_DIR)]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    match cli.command {
        Commands::Scrape {
            output_dir,
            samples,
            timeout,
            force,
        } => cmd_scrape(&output_dir, samples, timeout, force),

        Commands::Train {
            data_dir,
            epochs,
            batch_size,
            learning_rate,
            validation_split,
            seed,
            output_dir,
            no_augment,
            backbone,
            no_freeze,
        } => {
            let config = TrainConfig {
                data_dir: PathBuf::from(data_dir),
                output_dir: PathBuf::from(output_dir),
                epochs,
                batch_size,
                learning_rate,
                validation_fraction: validation_split,
                seed,
                augment: !no_augment,
                freeze_backbone: !no_freeze,
                backbone_weights: backbone.map(PathBuf::from),
            };

            flower_classifier::training::run_training::<TrainingBackend>(&config)?;
            Ok(())
        }

        Commands::Infer { input, model_dir } => cmd_infer(&input, &model_dir),

        Commands::Stats { data_dir } => cmd_stats(&data_dir),
    }
}

fn cmd_scrape(output_dir: &str, samples: usize, timeout: u64, force: bool) -> Result<()> {
    println!("{}", "Starting image scraping with Bing...".green().bold());
    info!(
        "Scraping {} classes, {} images each, into {}",
        FLOWER_TYPES.len(),
        samples,
        output_dir
    );

    let config = ScrapeConfig {
        output_dir: PathBuf::from(output_dir),
        samples_per_class: samples,
        timeout: Duration::from_secs(timeout),
        force,
    };

    let summary = scrape_all(&FLOWER_TYPES, &config)?;

    println!();
    println!("{}", "Scraping complete".green().bold());
    println!("  Classes completed: {}", summary.completed.len());
    println!("  Images downloaded: {}", summary.downloaded);
    if !summary.failed.is_empty() {
        println!(
            "  {} {}",
            "Classes failed:".red(),
            summary.failed.join(", ")
        );
    }

    Ok(())
}

fn cmd_infer(input: &str, model_dir: &str) -> Result<()> {
    println!("{}", "Inference configuration:".cyan().bold());
    println!("  Input:   {}", input);
    println!("  Model:   {}", model_dir);
    println!("  Backend: {}", backend_name());
    println!();

    let input_path = Path::new(input);
    if !input_path.exists() {
        println!("{} Input path not found: {}", "Error:".red(), input);
        return Ok(());
    }

    println!("{}", "Loading model...".cyan());
    let device = default_device();
    let predictor = Predictor::<DefaultBackend>::from_artifacts(Path::new(model_dir), &device)?;

    let files: Vec<PathBuf> = if input_path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(input_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_image_file(p))
            .collect();
        files.sort();
        files
    } else {
        vec![input_path.to_path_buf()]
    };

    if files.is_empty() {
        println!("{} No image files under {}", "Error:".red(), input);
        return Ok(());
    }

    println!("{}", "Running inference...".cyan());
    println!();

    for file_path in &files {
        match predictor.predict_file(file_path) {
            Ok(prediction) => {
                println!(
                    "{}",
                    file_path.file_name().unwrap_or_default().to_string_lossy()
                );
                println!(
                    "  Result: {} ({:.2}%)",
                    prediction.label.green().bold(),
                    prediction.confidence_percent()
                );
                println!("  Time: {:.2}ms", prediction.inference_time_ms);
                println!("  Top-5:");
                for (i, score) in prediction.top_k.iter().enumerate() {
                    println!(
                        "    {}. {} ({:.1}%)",
                        i + 1,
                        score.label,
                        score.probability * 100.0
                    );
                }
                println!();
            }
            Err(e) => {
                println!("  {} {:?}: {:#}", "Error analyzing".red(), file_path, e);
            }
        }
    }

    Ok(())
}

fn cmd_stats(data_dir: &str) -> Result<()> {
    info!("Computing dataset statistics for: {}", data_dir);

    if !Path::new(data_dir).exists() {
        println!(
            "{} Dataset directory not found: {}",
            "Error:".red(),
            data_dir
        );
        println!();
        println!("Scrape a dataset first:");
        println!("  flower_classifier scrape --output-dir {}", data_dir);
        return Ok(());
    }

    match FlowerDataset::new(data_dir) {
        Ok(dataset) => {
            dataset.get_stats().print();
        }
        Err(e) => {
            println!("{} Failed to load dataset: {:#}", "Error:".red(), e);
        }
    }

    Ok(())
}
