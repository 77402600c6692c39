//! Bing image search client.
//!
//! Talks to the public `images/async` endpoint Bing serves its own image
//! grid from. Each result embeds the full-resolution media URL as a
//! `"murl"` field in the result markup; paging is driven by the `first`
//! offset parameter.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::utils::error::{FlowerError, Result};

const SEARCH_URL: &str = "https://www.bing.com/images/async";

/// Results per page the endpoint returns
const PAGE_SIZE: usize = 35;

/// Upper bound on pages fetched per query
const MAX_PAGES: usize = 10;

/// Blocking HTTP client for Bing image search
pub struct BingClient {
    client: Client,
}

impl BingClient {
    /// Create a client with the given per-request timeout.
    ///
    /// A browser user agent is required; the endpoint returns an empty
    /// grid for unknown clients.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
            )
            .build()?;

        Ok(Self { client })
    }

    /// Collect candidate image URLs for a query.
    ///
    /// Pages through results until at least `limit` URLs are found or the
    /// result pages run dry. Duplicates across pages are dropped.
    pub fn image_urls(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let mut urls: Vec<String> = Vec::new();

        for page in 0..MAX_PAGES {
            if urls.len() >= limit {
                break;
            }

            let body = self.fetch_page(query, page * PAGE_SIZE)?;
            let page_urls = extract_image_urls(&body);
            debug!(
                "Query '{}' page {}: {} candidate urls",
                query,
                page,
                page_urls.len()
            );

            if page_urls.is_empty() {
                break;
            }

            for url in page_urls {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }

        if urls.is_empty() {
            return Err(FlowerError::Scrape(format!(
                "No image results for query '{}'",
                query
            )));
        }

        Ok(urls)
    }

    /// Download raw bytes from an image URL
    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(FlowerError::Scrape(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        Ok(response.bytes()?.to_vec())
    }

    fn fetch_page(&self, query: &str, first: usize) -> Result<String> {
        let first = first.to_string();
        let count = PAGE_SIZE.to_string();
        let params = [
            ("q", query),
            ("first", first.as_str()),
            ("count", count.as_str()),
            ("adlt", "off"),
        ];

        let response = self.client.get(SEARCH_URL).query(&params).send()?;

        if !response.status().is_success() {
            return Err(FlowerError::Scrape(format!(
                "Search request for '{}' failed: HTTP {}",
                query,
                response.status()
            )));
        }

        Ok(response.text()?)
    }
}

/// Extract `"murl"` media URLs from a result page.
///
/// The grid markup embeds per-result JSON blobs; scanning for the quoted
/// field is enough and avoids pulling in an HTML parser for one key.
pub fn extract_image_urls(body: &str) -> Vec<String> {
    const NEEDLE: &str = "\"murl\":\"";

    let mut urls = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find(NEEDLE) {
        rest = &rest[start + NEEDLE.len()..];

        match rest.find('"') {
            Some(end) => {
                let raw = &rest[..end];
                let url = raw.replace("\\/", "/");
                if url.starts_with("http") {
                    urls.push(url);
                }
                rest = &rest[end..];
            }
            None => break,
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_image_urls() {
        let body = r#"
            <a m='{"murl":"https:\/\/example.com\/rose1.jpg","turl":"x"}'>
            <a m='{"murl":"https:\/\/example.com\/rose2.png"}'>
        "#;

        let urls = extract_image_urls(body);
        assert_eq!(
            urls,
            vec![
                "https://example.com/rose1.jpg".to_string(),
                "https://example.com/rose2.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_extract_ignores_non_http() {
        let body = r#"{"murl":"data:image\/png;base64,xyz"}{"murl":"http:\/\/a.com\/b.jpg"}"#;
        let urls = extract_image_urls(body);
        assert_eq!(urls, vec!["http://a.com/b.jpg".to_string()]);
    }

    #[test]
    fn test_extract_handles_truncated_field() {
        let body = r#"{"murl":"https:\/\/a.com\/ok.jpg"}{"murl":"https:\/\/trunc"#;
        let urls = extract_image_urls(body);
        assert_eq!(urls, vec!["https://a.com/ok.jpg".to_string()]);
    }

    #[test]
    fn test_extract_empty_body() {
        assert!(extract_image_urls("<html></html>").is_empty());
    }
}
