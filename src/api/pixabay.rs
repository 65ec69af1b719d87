use crate::history::HistoryStore;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

const SEARCH_URL: &str = "https://pixabay.com/api/";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: u64,
    #[serde(rename = "largeImageURL")]
    large_image_url: String,
}

#[derive(Debug, Clone)]
pub struct PhotoCandidate {
    pub id: String,
    pub url: String,
}

/// Search for vertical nature photographs. Returns up to one page of
/// candidates; an empty page is a fatal condition for the caller.
pub async fn search_photos(client: &Client, key: &str, query: &str) -> Result<Vec<PhotoCandidate>> {
    let per_page = PAGE_SIZE.to_string();
    let resp = client
        .get(SEARCH_URL)
        .query(&[
            ("key", key),
            ("q", query),
            ("orientation", "vertical"),
            ("image_type", "photo"),
            ("safesearch", "true"),
            ("per_page", per_page.as_str()),
        ])
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("Pixabay search request failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("Pixabay HTTP {}", resp.status().as_u16());
    }

    let parsed: SearchResponse = resp
        .json()
        .await
        .context("Pixabay search returned malformed JSON")?;

    Ok(parsed
        .hits
        .into_iter()
        .map(|hit| PhotoCandidate {
            id: hit.id.to_string(),
            url: hit.large_image_url,
        })
        .collect())
}

/// First candidate whose identifier is not in the ledger, in the order
/// given (shuffle before calling to decorrelate consecutive runs).
pub fn pick_unused<'a>(
    candidates: &'a [PhotoCandidate],
    ledger: &dyn HistoryStore,
) -> Option<&'a PhotoCandidate> {
    candidates.iter().find(|c| !ledger.contains(&c.id))
}

pub async fn download_photo(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let resp = client
        .get(url)
        .timeout(std::time::Duration::from_secs(60))
        .send()
        .await
        .context("image download failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("image download HTTP {}", resp.status().as_u16());
    }

    let bytes = resp.bytes().await.context("image body read failed")?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("write image: {}", dest.display()))?;
    Ok(())
}
