use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::warn;

const CHAT_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "google/gemini-2.0-flash-exp:free";

/// Ask the completion endpoint for a fresh quote package. Returns the raw
/// message text; decoding and validation live in `content`.
pub async fn generate_content_text(client: &Client, cfg: &Config) -> Result<String> {
    let body = json!({
        "model": MODEL,
        "messages": [{"role": "user", "content": build_prompt(&cfg.author)}],
    });

    let resp = client
        .post(CHAT_URL)
        .bearer_auth(&cfg.openrouter_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(60))
        .send()
        .await
        .context("OpenRouter request failed")?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        if !raw.is_empty() {
            let snippet = raw.chars().take(400).collect::<String>();
            warn!("OpenRouter raw body: {snippet}");
        }
        anyhow::bail!("OpenRouter HTTP {}", status.as_u16());
    }

    extract_message_text(&raw).context("OpenRouter response had no message content")
}

fn build_prompt(author: &str) -> String {
    format!(
        "Write one unique short motivational quote attributed to {author}. \
         Reply with STRICT JSON only, no prose and no Markdown fences, shaped as \
         {{\"title\":\"...\",\"quote\":\"...\",\"caption\":\"...\",\"hashtags\":[\"#...\"]}}. \
         The title must be at most 40 characters, the quote at most 100 characters, \
         the caption one or two short lines, and hashtags exactly 8 entries. \
         No labels like 'Quote:' and no stars."
    )
}

fn extract_message_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            warn!("OpenRouter error message: {msg}");
        }
        if let Some(code) = err.get("code") {
            warn!("OpenRouter error code: {code}");
        }
        return None;
    }

    root.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice_text() {
        let resp = r#"{"choices":[{"message":{"role":"assistant","content":"  {\"quote\":\"x\"}  "}}]}"#;
        assert_eq!(extract_message_text(resp).unwrap(), r#"{"quote":"x"}"#);
    }

    #[test]
    fn error_payload_yields_none() {
        let resp = r#"{"error":{"message":"rate limited","code":429}}"#;
        assert!(extract_message_text(resp).is_none());
    }

    #[test]
    fn garbage_yields_none() {
        assert!(extract_message_text("<html>oops</html>").is_none());
        assert!(extract_message_text(r#"{"choices":[]}"#).is_none());
    }

    #[test]
    fn prompt_embeds_author_and_constraints() {
        let prompt = build_prompt("Lucas Hart");
        assert!(prompt.contains("Lucas Hart"));
        assert!(prompt.contains("100 characters"));
        assert!(prompt.contains("exactly 8"));
    }
}
