use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

const SEARCH_URL: &str = "https://freesound.org/apiv2/search/text/";
const SOUND_URL: &str = "https://freesound.org/apiv2/sounds/";
const DURATION_FILTER: &str = "duration:[20 TO 120]";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SoundRef>,
}

#[derive(Debug, Deserialize)]
struct SoundRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SoundInfo {
    previews: Previews,
}

#[derive(Debug, Deserialize)]
struct Previews {
    #[serde(rename = "preview-hq-mp3")]
    preview_hq_mp3: String,
}

/// Find a short music clip matching the mood query and save its preview
/// locally. Callers treat any failure here as non-fatal.
pub async fn fetch_music_clip(
    client: &Client,
    token: &str,
    query: &str,
    dest: &Path,
) -> Result<PathBuf> {
    let resp = client
        .get(SEARCH_URL)
        .query(&[("query", query), ("token", token), ("filter", DURATION_FILTER)])
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("Freesound search request failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("Freesound HTTP {}", resp.status().as_u16());
    }

    let parsed: SearchResponse = resp
        .json()
        .await
        .context("Freesound search returned malformed JSON")?;
    if parsed.results.is_empty() {
        anyhow::bail!("Freesound returned no sounds for '{query}'");
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(crate::now_seed());
    let pick = &parsed.results[rng.gen_range(0..parsed.results.len())];

    let info_url = format!("{SOUND_URL}{}/", pick.id);
    let info: SoundInfo = client
        .get(&info_url)
        .query(&[("token", token)])
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("Freesound sound-info request failed")?
        .json()
        .await
        .context("Freesound sound info returned malformed JSON")?;

    let bytes = client
        .get(&info.previews.preview_hq_mp3)
        .timeout(std::time::Duration::from_secs(60))
        .send()
        .await
        .context("Freesound preview download failed")?
        .bytes()
        .await
        .context("Freesound preview read failed")?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("write music clip: {}", dest.display()))?;

    Ok(dest.to_path_buf())
}
