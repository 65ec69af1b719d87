use crate::api::{catbox, freesound, openrouter, pixabay, quotes, telegram, webhook};
use crate::config::{Config, ContentProvider, ExhaustedPolicy};
use crate::content::{self, ContentItem};
use crate::ffmpeg;
use crate::history::{FileHistory, HistoryStore};
use crate::init;
use crate::retry::{with_retries, RetryPolicy};
use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

const CONTENT_RETRY: RetryPolicy = RetryPolicy::new(5, Duration::from_secs(2));
const IMAGE_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(2));
const AUDIO_RETRY: RetryPolicy = RetryPolicy::new(2, Duration::from_secs(2));
const UPLOAD_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_secs(5));

/// One full pipeline run: content, background, music, render, upload,
/// notification fan-out. Returns the process exit code.
pub async fn run_generation(cfg: &Config) -> Result<i32> {
    let client = Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .build()
        .context("Failed to build HTTP client")?;

    init::ensure_directories(cfg).await?;

    info!("Clearing stale artifacts in {}", cfg.work_dir.display());
    clear_directory_contents(&cfg.work_dir).await?;

    let mut quote_history = FileHistory::load(&cfg.quote_history_path).await?;
    let mut image_ledger = FileHistory::load(&cfg.image_ledger_path).await?;
    info!(
        "Ledgers loaded: {} quotes, {} images",
        quote_history.len(),
        image_ledger.len()
    );

    let item = fetch_content(cfg, &client, &mut quote_history).await?;
    info!("Content ready: \"{}\"", item.quote);

    let bg_image = fetch_background(cfg, &client, &mut image_ledger).await?;
    let audio = fetch_music(cfg, &client).await;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let out_mp4 = cfg.output_dir.join(format!("short_{stamp}.mp4"));
    info!("Rendering {}", out_mp4.display());
    ffmpeg::render_short(cfg, &item.quote, &bg_image, audio.as_deref(), &out_mp4).await?;

    info!("Uploading {}", out_mp4.display());
    let upload_client = client.clone();
    let upload_src = out_mp4.clone();
    let video_url = with_retries("catbox upload", UPLOAD_RETRY, move || {
        let client = upload_client.clone();
        let path = upload_src.clone();
        async move { catbox::upload_file(&client, &path).await }
    })
    .await
    .context("upload never produced a URL")?;
    info!("Published video: {video_url}");

    let caption = format_caption(&item, &cfg.author);

    let telegram_task = telegram::send_video(
        &client,
        &cfg.telegram_token,
        &cfg.telegram_chat_id,
        &video_url,
        &caption,
    );
    let webhook_task = async {
        match cfg.webhook_url.as_deref() {
            Some(url) => {
                let payload = webhook::WebhookPayload {
                    video_url: video_url.clone(),
                    title: item.title.clone(),
                    caption: caption.clone(),
                    hashtags: item.hashtags.clone(),
                };
                webhook::notify(&client, url, &payload).await.map(|_| true)
            }
            None => Ok(false),
        }
    };

    let (tg_result, wh_result) = tokio::join!(telegram_task, webhook_task);
    match tg_result {
        Ok(()) => info!("Telegram notification sent"),
        Err(err) => warn!("Telegram notification failed: {err:#}"),
    }
    match wh_result {
        Ok(true) => info!("Webhook notification sent"),
        Ok(false) => info!("No webhook configured; skipping"),
        Err(err) => warn!("Webhook notification failed: {err:#}"),
    }

    info!("Run complete: {video_url}");
    Ok(0)
}

async fn fetch_content(
    cfg: &Config,
    client: &Client,
    history: &mut FileHistory,
) -> Result<ContentItem> {
    let attempt = match cfg.provider {
        ContentProvider::Generate => {
            info!("Requesting generated content...");
            let history_view = &*history;
            with_retries("content generation", CONTENT_RETRY, move || async move {
                let raw = openrouter::generate_content_text(client, cfg).await?;
                let item = ContentItem::from_ai_text(&raw)?;
                if history_view.contains(&item.quote) {
                    anyhow::bail!("duplicate quote: {}", item.quote);
                }
                Ok(item)
            })
            .await
        }
        ContentProvider::StaticQuote => {
            info!("Requesting static quote...");
            with_retries("quote fetch", CONTENT_RETRY, move || async move {
                let quote = quotes::fetch_random_quote(client).await?;
                Ok(content::static_item(&quote))
            })
            .await
        }
    };

    match attempt {
        Ok(item) => {
            if cfg.provider == ContentProvider::Generate {
                history.add(&item.quote).await?;
            }
            Ok(item)
        }
        Err(err) => match cfg.on_exhausted {
            ExhaustedPolicy::Fallback => {
                warn!("Content retries exhausted ({err:#}); publishing fallback item");
                Ok(content::fallback_item())
            }
            ExhaustedPolicy::Abort => Err(err.context("content retries exhausted")),
        },
    }
}

async fn fetch_background(
    cfg: &Config,
    client: &Client,
    ledger: &mut FileHistory,
) -> Result<PathBuf> {
    info!("Searching for an unused background photo...");
    let mut candidates = with_retries("pixabay search", IMAGE_RETRY, move || async move {
        pixabay::search_photos(client, &cfg.pixabay_key, &cfg.image_query).await
    })
    .await?;

    if candidates.is_empty() {
        anyhow::bail!("Pixabay returned no results for '{}'", cfg.image_query);
    }

    // shuffle so consecutive runs don't converge on the same top hit
    let mut rng = rand::rngs::StdRng::seed_from_u64(crate::now_seed());
    candidates.shuffle(&mut rng);

    let pick = pixabay::pick_unused(&candidates, &*ledger)
        .with_context(|| {
            format!(
                "all {} Pixabay candidates already in the image ledger",
                candidates.len()
            )
        })?
        .clone();

    let dest = cfg.work_dir.join("bg.jpg");
    let download_client = client.clone();
    let url = pick.url.clone();
    let download_dest = dest.clone();
    with_retries("image download", IMAGE_RETRY, move || {
        let client = download_client.clone();
        let url = url.clone();
        let dest = download_dest.clone();
        async move { pixabay::download_photo(&client, &url, &dest).await }
    })
    .await?;

    ledger.add(&pick.id).await?;
    info!("Background photo {} -> {}", pick.id, dest.display());
    Ok(dest)
}

async fn fetch_music(cfg: &Config, client: &Client) -> Option<PathBuf> {
    let Some(token) = cfg.freesound_key.as_deref() else {
        info!("No Freesound key configured; rendering silent video");
        return None;
    };

    let dest = cfg.work_dir.join("music.mp3");
    let music_client = client.clone();
    let result = with_retries("music fetch", AUDIO_RETRY, move || {
        let client = music_client.clone();
        let dest = dest.clone();
        async move { freesound::fetch_music_clip(&client, token, &cfg.music_query, &dest).await }
    })
    .await;

    match result {
        Ok(path) => Some(path),
        Err(err) => {
            warn!("Music fetch failed ({err:#}); rendering silent video");
            None
        }
    }
}

pub fn format_caption(item: &ContentItem, author: &str) -> String {
    format!(
        "✨ {}\n\n{}\n- {}\n\n{}\n\n{}",
        item.title,
        item.quote,
        author,
        item.caption,
        item.hashtags.join(" ")
    )
}

async fn clear_directory_contents(dir_path: &Path) -> Result<()> {
    let is_dir = fs::metadata(dir_path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Ok(());
    }

    for entry in WalkDir::new(dir_path).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir(path).await.ok();
        } else {
            fs::remove_file(path).await.ok();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::fallback_item;

    #[test]
    fn caption_carries_title_quote_and_all_hashtags() {
        let item = fallback_item();
        let caption = format_caption(&item, "Lucas Hart");

        assert!(caption.contains(&item.title));
        assert!(caption.contains(&item.quote));
        assert!(caption.contains(&item.caption));
        assert!(caption.contains("- Lucas Hart"));
        for tag in &item.hashtags {
            assert!(caption.contains(tag.as_str()), "missing {tag}");
        }
    }

    #[tokio::test]
    async fn clearing_a_missing_directory_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        clear_directory_contents(&missing).await.unwrap();
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn clearing_removes_files_but_keeps_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        tokio::fs::create_dir_all(work.join("nested")).await.unwrap();
        tokio::fs::write(work.join("bg.jpg"), b"x").await.unwrap();
        tokio::fs::write(work.join("nested/music.mp3"), b"x")
            .await
            .unwrap();

        clear_directory_contents(&work).await.unwrap();

        assert!(work.exists());
        let mut entries = tokio::fs::read_dir(&work).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
