use anyhow::{Context, Result};
use reqwest::Client;

/// Send the published video URL plus caption to the configured chat.
pub async fn send_video(
    client: &Client,
    token: &str,
    chat_id: &str,
    video_url: &str,
    caption: &str,
) -> Result<()> {
    let url = format!("https://api.telegram.org/bot{token}/sendVideo");
    let params = [
        ("chat_id", chat_id),
        ("video", video_url),
        ("caption", caption),
    ];

    let resp = client
        .post(&url)
        .form(&params)
        .timeout(std::time::Duration::from_secs(60))
        .send()
        .await
        .context("Telegram request failed")?;

    let status = resp.status();
    let body: serde_json::Value = resp
        .json()
        .await
        .context("Telegram returned malformed JSON")?;

    let ok = body.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if !status.is_success() || !ok {
        let desc = body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("no description");
        anyhow::bail!("Telegram sendVideo failed (HTTP {}): {desc}", status.as_u16());
    }
    Ok(())
}
