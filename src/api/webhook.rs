use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

/// Payload for the downstream no-code automation. A superset of the field
/// sets the various consumers expect, so each finds what it reads.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub video_url: String,
    pub title: String,
    pub caption: String,
    pub hashtags: Vec<String>,
}

pub async fn notify(client: &Client, url: &str, payload: &WebhookPayload) -> Result<()> {
    let resp = client
        .post(url)
        .json(payload)
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("webhook request failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("webhook HTTP {}", resp.status().as_u16());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::default_hashtags;

    #[test]
    fn payload_carries_every_field() {
        let payload = WebhookPayload {
            video_url: "https://files.catbox.moe/abc.mp4".to_string(),
            title: "Daily Motivation".to_string(),
            caption: "Stay consistent.".to_string(),
            hashtags: default_hashtags(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["video_url"], "https://files.catbox.moe/abc.mp4");
        assert_eq!(value["title"], "Daily Motivation");
        assert_eq!(value["caption"], "Stay consistent.");
        assert_eq!(value["hashtags"].as_array().unwrap().len(), 8);
    }
}
