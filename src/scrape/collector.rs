//! Per-class collection loop and dataset folder management.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use super::bing::BingClient;
use super::{query_for, ScrapeConfig};
use crate::dataset::is_image_file;

/// Outcome of a scraping run
#[derive(Debug, Clone, Default)]
pub struct ScrapeSummary {
    /// Classes that reached their target (or were skipped as complete)
    pub completed: Vec<String>,
    /// Classes that failed entirely
    pub failed: Vec<String>,
    /// Total images written
    pub downloaded: usize,
}

/// Scrape every class in `flowers` into `config.output_dir`.
///
/// Errors for individual classes are logged and recorded in the summary;
/// only setup failures (output directory, HTTP client) abort the run.
pub fn scrape_all(flowers: &[&str], config: &ScrapeConfig) -> Result<ScrapeSummary> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create dataset dir {:?}", config.output_dir))?;

    let client = BingClient::new(config.timeout)?;
    let mut summary = ScrapeSummary::default();

    for flower in flowers {
        println!("Processing {}...", flower.cyan());

        match collect_class(&client, flower, config) {
            Ok(count) => {
                println!("  {} {} ({} images)", "Finished".green(), flower, count);
                summary.completed.push(flower.to_string());
                summary.downloaded += count;
            }
            Err(e) => {
                warn!("Error scraping {}: {:#}", flower, e);
                println!("  {} {}: {:#}", "Error scraping".red(), flower, e);
                summary.failed.push(flower.to_string());
            }
        }
    }

    Ok(summary)
}

/// Download up to the configured number of images for one class.
///
/// Returns the number of images written. Images land in a folder named
/// after the search query first and are moved to the class folder once the
/// class is done, so a crashed run never leaves a half-filled class folder
/// that looks complete.
fn collect_class(client: &BingClient, flower: &str, config: &ScrapeConfig) -> Result<usize> {
    let target_dir = config.output_dir.join(flower);

    if !config.force {
        let existing = count_images(&target_dir);
        if existing >= config.samples_per_class {
            info!(
                "Skipping '{}': {} images already present",
                flower, existing
            );
            return Ok(0);
        }
    }

    let query = query_for(flower);
    let query_dir = config.output_dir.join(&query);
    fs::create_dir_all(&query_dir)?;

    let candidates = client.image_urls(&query, config.samples_per_class * 3)?;

    let mut saved = 0usize;
    for url in &candidates {
        if saved >= config.samples_per_class {
            break;
        }

        match download_image(client, url) {
            Ok((bytes, ext)) => {
                let file_name = format!("Image_{}.{}", saved + 1, ext);
                fs::write(query_dir.join(&file_name), &bytes)?;
                saved += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", url, e);
            }
        }
    }

    if saved == 0 {
        // Nothing usable; don't leave the empty query folder around
        let _ = fs::remove_dir(&query_dir);
        anyhow::bail!("No downloadable images for '{}'", query);
    }

    finalize_class_dir(&query_dir, &target_dir)?;

    Ok(saved)
}

/// Fetch one image and validate that it decodes, returning the bytes and
/// the file extension of the detected format.
fn download_image(client: &BingClient, url: &str) -> Result<(Vec<u8>, &'static str)> {
    let bytes = client.download(url)?;

    let format = image::guess_format(&bytes).context("Unrecognized image format")?;
    // Reject corrupt payloads up front instead of at training time
    image::load_from_memory(&bytes).context("Image failed to decode")?;

    let ext = format
        .extensions_str()
        .first()
        .copied()
        .unwrap_or("jpg");

    Ok((bytes, ext))
}

/// Rename the query folder to the canonical class folder, merging file by
/// file when the class folder already exists.
pub fn finalize_class_dir(query_dir: &Path, target_dir: &Path) -> Result<()> {
    if !query_dir.exists() {
        return Ok(());
    }

    if target_dir.exists() {
        for entry in fs::read_dir(query_dir)? {
            let entry = entry?;
            let dest = next_free_name(target_dir, &entry.file_name().to_string_lossy());
            fs::rename(entry.path(), dest)?;
        }
        fs::remove_dir(query_dir)?;
    } else {
        fs::rename(query_dir, target_dir)?;
    }

    Ok(())
}

/// Pick a destination name that does not clobber an existing file
fn next_free_name(dir: &Path, file_name: &str) -> std::path::PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), e.to_string()),
        None => (file_name.to_string(), String::new()),
    };

    for n in 1.. {
        let name = if ext.is_empty() {
            format!("{}_{}", stem, n)
        } else {
            format!("{}_{}.{}", stem, n, ext)
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }

    unreachable!()
}

fn count_images(dir: &Path) -> usize {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| is_image_file(&e.path()))
            .count(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "flower_collector_test_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_finalize_renames_when_target_missing() {
        let root = temp_root("rename");
        let query_dir = root.join("Rose flower");
        fs::create_dir_all(&query_dir).unwrap();
        fs::write(query_dir.join("Image_1.jpg"), b"fake").unwrap();

        let target = root.join("Rose");
        finalize_class_dir(&query_dir, &target).unwrap();

        assert!(!query_dir.exists());
        assert!(target.join("Image_1.jpg").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_finalize_merges_into_existing_target() {
        let root = temp_root("merge");
        let query_dir = root.join("Tulip flower");
        let target = root.join("Tulip");
        fs::create_dir_all(&query_dir).unwrap();
        fs::create_dir_all(&target).unwrap();

        fs::write(query_dir.join("Image_1.jpg"), b"new").unwrap();
        fs::write(query_dir.join("Image_2.jpg"), b"new2").unwrap();
        fs::write(target.join("Image_1.jpg"), b"old").unwrap();

        finalize_class_dir(&query_dir, &target).unwrap();

        assert!(!query_dir.exists());
        // The existing file is kept, the colliding one gets a new name
        assert_eq!(fs::read(target.join("Image_1.jpg")).unwrap(), b"old");
        assert!(target.join("Image_1_1.jpg").exists());
        assert!(target.join("Image_2.jpg").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_count_images() {
        let root = temp_root("count");
        fs::write(root.join("a.jpg"), b"x").unwrap();
        fs::write(root.join("b.png"), b"x").unwrap();
        fs::write(root.join("c.txt"), b"x").unwrap();

        assert_eq!(count_images(&root), 2);
        assert_eq!(count_images(Path::new("/missing/dir")), 0);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_next_free_name() {
        let root = temp_root("freename");
        fs::write(root.join("Image_1.jpg"), b"x").unwrap();

        let free = next_free_name(&root, "Image_1.jpg");
        assert_eq!(free.file_name().unwrap(), "Image_1_1.jpg");

        let untouched = next_free_name(&root, "Image_2.jpg");
        assert_eq!(untouched.file_name().unwrap(), "Image_2.jpg");

        let _ = fs::remove_dir_all(&root);
    }
}
