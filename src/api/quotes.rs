use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

const QUOTES_URL: &str = "https://zenquotes.io/api/random";

// The API also returns an author field; it is discarded because the
// attribution string is fixed.
#[derive(Debug, Deserialize)]
struct QuoteRow {
    q: String,
}

/// Fetch one random quote from the static quote API.
pub async fn fetch_random_quote(client: &Client) -> Result<String> {
    let resp = client
        .get(QUOTES_URL)
        .timeout(std::time::Duration::from_secs(30))
        .send()
        .await
        .context("quote API request failed")?;

    if !resp.status().is_success() {
        anyhow::bail!("quote API HTTP {}", resp.status().as_u16());
    }

    let rows: Vec<QuoteRow> = resp.json().await.context("quote API returned malformed JSON")?;
    let first = rows
        .into_iter()
        .next()
        .context("quote API returned an empty list")?;

    let quote = first.q.trim().to_string();
    if quote.is_empty() {
        anyhow::bail!("quote API returned an empty quote");
    }
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_parses_and_ignores_author() {
        let rows: Vec<QuoteRow> =
            serde_json::from_str(r#"[{"q":"Keep going.","a":"Someone Famous"}]"#).unwrap();
        assert_eq!(rows[0].q, "Keep going.");
    }
}
