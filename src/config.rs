use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Where the quote and metadata come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentProvider {
    /// Ask a text-generation endpoint for a fresh quote with title,
    /// caption and hashtags.
    Generate,
    /// Fetch a random quote from a static quote API and attach the
    /// default title/caption/hashtags.
    StaticQuote,
}

impl FromStr for ContentProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate" | "ai" => Ok(Self::Generate),
            "static" | "quotes" => Ok(Self::StaticQuote),
            other => anyhow::bail!("unknown CONTENT_PROVIDER: {other} (use 'generate' or 'static')"),
        }
    }
}

/// What happens once the content retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustedPolicy {
    /// Publish the canned fallback item.
    Fallback,
    /// Abort the run with a non-zero exit.
    Abort,
}

impl FromStr for ExhaustedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "abort" => Ok(Self::Abort),
            other => anyhow::bail!("unknown CONTENT_EXHAUSTED: {other} (use 'fallback' or 'abort')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_key: String,
    pub pixabay_key: String,
    pub freesound_key: Option<String>,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub webhook_url: Option<String>,

    pub provider: ContentProvider,
    pub on_exhausted: ExhaustedPolicy,

    pub author: String,
    pub duration_secs: u32,
    pub image_query: String,
    pub music_query: String,
    pub font_file: PathBuf,

    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub quote_history_path: PathBuf,
    pub image_ledger_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let provider = match env_opt("CONTENT_PROVIDER") {
            Some(raw) => raw.parse::<ContentProvider>()?,
            None => ContentProvider::Generate,
        };
        let on_exhausted = match env_opt("CONTENT_EXHAUSTED") {
            Some(raw) => raw.parse::<ExhaustedPolicy>()?,
            None => ExhaustedPolicy::Fallback,
        };

        let duration_secs = match env_opt("VIDEO_DURATION_SECS") {
            Some(raw) => raw
                .parse::<u32>()
                .context("VIDEO_DURATION_SECS must be an integer number of seconds")?,
            None => 5,
        };
        if duration_secs == 0 || duration_secs > 60 {
            anyhow::bail!("VIDEO_DURATION_SECS must be between 1 and 60");
        }

        // The generation key is only needed when the generated provider is
        // selected; the static provider runs without it.
        let openrouter_key = match provider {
            ContentProvider::Generate => env_required("OPENROUTER_API_KEY")?,
            ContentProvider::StaticQuote => env_opt("OPENROUTER_API_KEY").unwrap_or_default(),
        };

        Ok(Self {
            openrouter_key,
            pixabay_key: env_required("PIXABAY_API_KEY")?,
            freesound_key: env_opt("FREESOUND_API_KEY"),
            telegram_token: env_required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: env_required("TELEGRAM_CHAT_ID")?,
            webhook_url: env_opt("WEBHOOK_URL"),
            provider,
            on_exhausted,
            author: env_or("QUOTE_AUTHOR", "Lucas Hart"),
            duration_secs,
            image_query: env_or("IMAGE_QUERY", "nature landscape"),
            music_query: env_or("MUSIC_QUERY", "piano soft"),
            font_file: PathBuf::from(env_or(
                "FONT_FILE",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            )),
            work_dir: PathBuf::from(env_or("WORK_DIR", "work")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "output")),
            quote_history_path: PathBuf::from(env_or("QUOTE_HISTORY_FILE", "quote_history.txt")),
            image_ledger_path: PathBuf::from(env_or("IMAGE_HISTORY_FILE", "video_history.txt")),
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_required(name: &str) -> Result<String> {
    env_opt(name).with_context(|| format!("{name} is not set"))
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}
