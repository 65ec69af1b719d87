use crate::config::Config;
use anyhow::Result;
use tokio::fs;
use tracing::info;

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    let mut dirs = vec![cfg.work_dir.clone(), cfg.output_dir.clone()];
    for ledger in [&cfg.quote_history_path, &cfg.image_ledger_path] {
        if let Some(parent) = ledger.parent() {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent.to_path_buf());
            }
        }
    }

    for dir in dirs {
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            info!("Created directory: {}", dir.display());
        }
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
