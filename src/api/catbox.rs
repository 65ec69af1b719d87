use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use tokio::fs;

const UPLOAD_URL: &str = "https://catbox.moe/user/api.php";

// Uploads can be slow on a cold CDN edge; the per-attempt budget is
// deliberately generous instead of failing fast and burning retries.
const UPLOAD_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(180);

/// Multipart upload of the rendered video. The endpoint answers with the
/// hosted file's URL as raw text; anything else counts as a failed attempt.
pub async fn upload_file(client: &Client, path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("read upload source: {}", path.display()))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.mp4")
        .to_string();
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("video/mp4")
        .context("invalid upload mime type")?;
    let form = Form::new()
        .text("reqtype", "fileupload")
        .part("fileToUpload", part);

    let resp = client
        .post(UPLOAD_URL)
        .multipart(form)
        .timeout(UPLOAD_TIMEOUT)
        .send()
        .await
        .context("catbox upload request failed")?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        anyhow::bail!("catbox HTTP {}", status.as_u16());
    }

    let url = body.trim().to_string();
    if !looks_like_url(&url) {
        let snippet = url.chars().take(120).collect::<String>();
        anyhow::bail!("catbox response is not a URL: {snippet}");
    }
    Ok(url)
}

pub fn looks_like_url(text: &str) -> bool {
    (text.starts_with("http://") || text.starts_with("https://"))
        && !text.contains(char::is_whitespace)
        && text.len() > "https://".len()
}
