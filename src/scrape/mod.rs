//! Flower image scraping.
//!
//! Builds the training dataset by querying Bing image search for each
//! flower in a fixed list and downloading the results into class-named
//! folders. The downloader writes into a folder named after the search
//! query; after a class finishes, that folder is renamed to the canonical
//! class name, merging into an existing folder when one is already there.
//!
//! A failure for one class is logged and the loop continues with the next
//! class, so a flaky search result cannot abort a whole scraping run.

pub mod bing;
pub mod collector;

use std::path::PathBuf;
use std::time::Duration;

pub use bing::{extract_image_urls, BingClient};
pub use collector::{scrape_all, ScrapeSummary};

/// Flower classes to scrape. The search query for each is "<name> flower".
pub const FLOWER_TYPES: [&str; 8] = [
    "Rose", "Sunflower", "Tulip", "Daisy", "Lavender", "Marigold", "Violet", "Lily",
];

/// Images to collect per class
pub const SAMPLES_PER_CLASS: usize = 20;

/// Scraper configuration
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Directory the class folders are created in
    pub output_dir: PathBuf,
    /// Target number of images per class
    pub samples_per_class: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Re-download classes whose folders already hold enough images
    pub force: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(crate::DEFAULT_DATASET_DIR),
            samples_per_class: SAMPLES_PER_CLASS,
            timeout: Duration::from_secs(60),
            force: false,
        }
    }
}

/// Search query derived from a class name
pub fn query_for(flower: &str) -> String {
    format!("{} flower", flower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_for() {
        assert_eq!(query_for("Rose"), "Rose flower");
    }

    #[test]
    fn test_default_config() {
        let config = ScrapeConfig::default();
        assert_eq!(config.samples_per_class, 20);
        assert_eq!(config.output_dir, PathBuf::from("datasets"));
        assert!(!config.force);
    }
}
