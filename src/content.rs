use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_TITLE_CHARS: usize = 40;
pub const MAX_QUOTE_CHARS: usize = 100;
pub const HASHTAG_COUNT: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub quote: String,
    pub caption: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("model output is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("quote is empty")]
    EmptyQuote,
    #[error("quote is {0} chars, limit is 100")]
    QuoteTooLong(usize),
    #[error("title is {0} chars, limit is 40")]
    TitleTooLong(usize),
    #[error("expected 8 hashtags, got {0}")]
    BadHashtagCount(usize),
}

impl ContentItem {
    /// Decode a generation-endpoint answer into a validated item. The model
    /// is asked for bare JSON but frequently wraps it in Markdown fences
    /// anyway, so those are stripped first.
    pub fn from_ai_text(text: &str) -> Result<Self, ContentError> {
        let body = strip_code_fences(text);
        let mut item: ContentItem = serde_json::from_str(body)?;
        item.normalize();
        item.validate()?;
        Ok(item)
    }

    fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.quote = self.quote.trim().trim_matches('"').trim().to_string();
        self.caption = self.caption.trim().to_string();
        self.hashtags = self
            .hashtags
            .iter()
            .map(|tag| normalize_hashtag(tag))
            .filter(|tag| tag.len() > 1)
            .collect();
    }

    fn validate(&self) -> Result<(), ContentError> {
        if self.quote.is_empty() {
            return Err(ContentError::EmptyQuote);
        }
        let quote_chars = self.quote.chars().count();
        if quote_chars > MAX_QUOTE_CHARS {
            return Err(ContentError::QuoteTooLong(quote_chars));
        }
        let title_chars = self.title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(ContentError::TitleTooLong(title_chars));
        }
        if self.hashtags.len() != HASHTAG_COUNT {
            return Err(ContentError::BadHashtagCount(self.hashtags.len()));
        }
        Ok(())
    }
}

/// Canned item published when content generation exhausts its retries and
/// the fallback policy is active.
pub fn fallback_item() -> ContentItem {
    ContentItem {
        title: "Daily Motivation".to_string(),
        quote: "Small steps daily build unstoppable momentum.".to_string(),
        caption: "Stay consistent.".to_string(),
        hashtags: default_hashtags(),
    }
}

/// Item built around a quote from the static quote API. No originality
/// constraint applies on this path.
pub fn static_item(quote: &str) -> ContentItem {
    ContentItem {
        title: "Daily Motivation".to_string(),
        quote: truncate_chars(quote.trim(), MAX_QUOTE_CHARS),
        caption: "Stay consistent.".to_string(),
        hashtags: default_hashtags(),
    }
}

pub fn default_hashtags() -> Vec<String> {
    [
        "#motivation",
        "#success",
        "#mindset",
        "#goals",
        "#focus",
        "#growth",
        "#discipline",
        "#shorts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn normalize_hashtag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{tag}")
    }
}

pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect()
}

fn strip_code_fences(text: &str) -> &str {
    static FENCE_RE: OnceCell<Regex> = OnceCell::new();
    let re = FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("fence regex is valid")
    });

    let trimmed = text.trim();
    match re.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(trimmed),
        None => trimmed,
    }
}
