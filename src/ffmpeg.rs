use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tracing::info;

pub const FRAME_RATE: u32 = 24;

const FRAME_W: u32 = 1080;
const FRAME_H: u32 = 1920;
const TEXT_BOX_WIDTH: u32 = 800;
const SHADOW_BOX_W: u32 = 900;
const SHADOW_BOX_H: u32 = 400;
const DARKEN_FACTOR: f64 = 0.65;
const AUDIO_VOLUME: f64 = 0.30;

async fn run_cmd(args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd.status().await.context("Command execution failed")?;
    if !status.success() {
        return Err(anyhow::anyhow!("Command failed: {:?}", args));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed"));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(anyhow::anyhow!("Invalid duration"));
    }
    Ok(duration)
}

/// Shrink the face as the quote grows so the caption block stays inside
/// the shadow box.
pub fn pick_font_size(quote: &str) -> u32 {
    let chars = quote.chars().count();
    if chars > 80 {
        54
    } else if chars > 50 {
        64
    } else {
        75
    }
}

/// Per-line character budget for the 800px text column, assuming ~0.55em
/// average advance for a bold face.
pub fn line_budget(font_size: u32) -> usize {
    let budget = (TEXT_BOX_WIDTH as f64) / (font_size as f64 * 0.55);
    (budget.floor() as usize).max(8)
}

pub fn wrap_caption(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn compose_display_text(quote: &str, author: &str, max_chars: usize) -> String {
    let mut lines = wrap_caption(quote, max_chars);
    lines.push(String::new());
    lines.push(format!("- {author}"));
    lines.join("\n")
}

pub fn render_args(
    bg_image: &Path,
    audio: Option<&Path>,
    caption_file: &Path,
    font_file: &Path,
    font_size: u32,
    duration_secs: u32,
    out_mp4: &Path,
) -> Vec<String> {
    // caption_file and font_file land inside drawtext's option string, so
    // neither path may contain ':' or ','.
    let mut filter = format!(
        "[0:v]scale={FRAME_W}:{FRAME_H}:force_original_aspect_ratio=increase,crop={FRAME_W}:{FRAME_H},\
         colorchannelmixer=rr={DARKEN_FACTOR}:gg={DARKEN_FACTOR}:bb={DARKEN_FACTOR},\
         drawbox=x=(iw-{SHADOW_BOX_W})/2:y=(ih-{SHADOW_BOX_H})/2:w={SHADOW_BOX_W}:h={SHADOW_BOX_H}:color=black@0.5:t=fill,\
         drawtext=textfile={}:fontfile={}:fontsize={}:fontcolor=white:borderw=2:bordercolor=black:line_spacing=18:x=(w-text_w)/2:y=(h-text_h)/2[v]",
        caption_file.display(),
        font_file.display(),
        font_size
    );
    if audio.is_some() {
        filter.push_str(&format!(
            ";[1:a]atrim=0:{duration_secs},asetpts=PTS-STARTPTS,volume={AUDIO_VOLUME}[a]"
        ));
    }

    let mut args = vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        FRAME_RATE.to_string(),
        "-i".to_string(),
        bg_image.display().to_string(),
    ];

    if let Some(audio_path) = audio {
        // loop short clips so the track covers the full duration before
        // atrim cuts it back
        args.push("-stream_loop".to_string());
        args.push("-1".to_string());
        args.push("-i".to_string());
        args.push(audio_path.display().to_string());
    }

    args.push("-filter_complex".to_string());
    args.push(filter);
    args.push("-map".to_string());
    args.push("[v]".to_string());
    if audio.is_some() {
        args.push("-map".to_string());
        args.push("[a]".to_string());
    }

    args.push("-t".to_string());
    args.push(duration_secs.to_string());
    args.push("-r".to_string());
    args.push(FRAME_RATE.to_string());
    args.push("-c:v".to_string());
    args.push("libx264".to_string());
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push("-preset".to_string());
    args.push("veryfast".to_string());
    args.push("-crf".to_string());
    args.push("22".to_string());

    if audio.is_some() {
        args.push("-c:a".to_string());
        args.push("aac".to_string());
        args.push("-b:a".to_string());
        args.push("192k".to_string());
    }

    args.push("-movflags".to_string());
    args.push("+faststart".to_string());
    args.push(out_mp4.display().to_string());
    args
}

/// Composite background, caption and optional music into the final short,
/// then verify the container duration landed on target.
pub async fn render_short(
    cfg: &Config,
    quote: &str,
    bg_image: &Path,
    audio: Option<&Path>,
    out_mp4: &Path,
) -> Result<()> {
    let font_size = pick_font_size(quote);
    let text = compose_display_text(quote, &cfg.author, line_budget(font_size));

    let caption_file = tempfile::Builder::new()
        .prefix("caption_")
        .suffix(".txt")
        .tempfile_in(&cfg.work_dir)
        .context("create caption file")?;
    fs::write(caption_file.path(), &text)
        .await
        .context("write caption file")?;

    let args = render_args(
        bg_image,
        audio,
        caption_file.path(),
        &cfg.font_file,
        font_size,
        cfg.duration_secs,
        out_mp4,
    );
    run_cmd(&args).await.context("ffmpeg render failed")?;

    if !out_mp4.exists() {
        anyhow::bail!("ffmpeg produced no output at {}", out_mp4.display());
    }

    let rendered = ffprobe_duration_seconds(out_mp4).await?;
    let tolerance = 1.0 / FRAME_RATE as f64 + 0.05;
    if (rendered - cfg.duration_secs as f64).abs() > tolerance {
        anyhow::bail!(
            "rendered duration {:.3}s is off the {}s target",
            rendered,
            cfg.duration_secs
        );
    }

    info!("Rendered short: {} ({:.3}s)", out_mp4.display(), rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn font_size_steps_down_with_length() {
        assert_eq!(pick_font_size("Short."), 75);
        assert_eq!(pick_font_size(&"a".repeat(60)), 64);
        assert_eq!(pick_font_size(&"a".repeat(95)), 54);
    }

    #[test]
    fn line_budget_tracks_font_size() {
        assert!(line_budget(75) < line_budget(54));
        assert!(line_budget(200) >= 8);
    }

    #[test]
    fn wraps_words_within_budget() {
        let lines = wrap_caption("Small steps daily build unstoppable momentum.", 19);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 19, "line too long: {line}");
        }
        assert_eq!(
            lines.join(" "),
            "Small steps daily build unstoppable momentum."
        );
    }

    #[test]
    fn single_long_word_gets_its_own_line() {
        let lines = wrap_caption("tiny supercalifragilisticexpialidocious end", 10);
        assert_eq!(lines[0], "tiny");
        assert_eq!(lines[1], "supercalifragilisticexpialidocious");
        assert_eq!(lines[2], "end");
    }

    #[test]
    fn display_text_ends_with_attribution() {
        let text = compose_display_text("Keep going.", "Lucas Hart", 20);
        assert!(text.starts_with("Keep going."));
        assert!(text.ends_with("- Lucas Hart"));
        assert!(text.contains("\n\n"));
    }

    #[test]
    fn render_args_with_audio() {
        let args = render_args(
            &PathBuf::from("work/bg.jpg"),
            Some(&PathBuf::from("work/music.mp3")),
            &PathBuf::from("work/caption.txt"),
            &PathBuf::from("fonts/Bold.ttf"),
            75,
            5,
            &PathBuf::from("output/short.mp4"),
        );

        assert_eq!(args[0], "ffmpeg");
        assert!(args.contains(&"-stream_loop".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert!(args.contains(&"[a]".to_string()));
        assert!(args.contains(&"libx264".to_string()));

        let t_pos = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_pos + 1], "5");

        let filter = args
            .iter()
            .find(|a| a.contains("drawtext"))
            .expect("filter present");
        assert!(filter.contains("scale=1080:1920"));
        assert!(filter.contains("drawbox"));
        assert!(filter.contains("fontsize=75"));
        assert!(filter.contains("atrim=0:5"));
        assert!(filter.contains("volume=0.3"));
    }

    #[test]
    fn render_args_without_audio_stay_silent() {
        let args = render_args(
            &PathBuf::from("work/bg.jpg"),
            None,
            &PathBuf::from("work/caption.txt"),
            &PathBuf::from("fonts/Bold.ttf"),
            64,
            8,
            &PathBuf::from("output/short.mp4"),
        );

        assert!(!args.contains(&"-stream_loop".to_string()));
        assert!(!args.contains(&"aac".to_string()));
        assert!(!args.contains(&"[a]".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);

        let filter = args.iter().find(|a| a.contains("drawtext")).unwrap();
        assert!(!filter.contains("atrim"));

        let t_pos = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t_pos + 1], "8");
    }
}
