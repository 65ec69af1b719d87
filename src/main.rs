use anyhow::Result;
use quote_shorts::config::Config;
use quote_shorts::generator::run_generation;
use quote_shorts::init;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cfg = Config::from_env()?;

    init::ensure_directories(&cfg).await?;

    if !init::check_ffmpeg().await {
        warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let code = run_generation(&cfg).await?;
    std::process::exit(code);
}
