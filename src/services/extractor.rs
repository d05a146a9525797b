//! yt-dlp subprocess wrapper that turns a media URL into an MP3 on disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::DownloadConfig;

#[derive(Clone)]
pub struct ExtractorService {
    config: DownloadConfig,
}

impl ExtractorService {
    #[must_use]
    pub const fn new(config: DownloadConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn audio_path(&self, filename: &str) -> PathBuf {
        PathBuf::from(&self.config.audio_dir).join(filename)
    }

    /// Runs yt-dlp for `url`, writing `<id>-<title>.mp3` into the audio dir,
    /// then renames the result to strip the id prefix. Returns the final
    /// filename.
    pub async fn extract(&self, id: &str, url: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.config.audio_dir).await?;

        let template = format!("{}/{}-%(title).200s.%(ext)s", self.config.audio_dir, id);

        let mut cmd = Command::new(&self.config.ytdlp_path);
        cmd.arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("-o")
            .arg(&template);
        if let Some(ffmpeg) = &self.config.ffmpeg_location {
            cmd.arg("--ffmpeg-location").arg(ffmpeg);
        }
        cmd.arg(url);

        info!(id, url, "Starting audio extraction");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.ytdlp_path))?;

        if !output.status.success() {
            warn!(
                id,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "yt-dlp failed"
            );
            anyhow::bail!("yt-dlp exited with {}", output.status);
        }

        let original = self
            .find_output(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("yt-dlp produced no MP3 for {id}"))?;

        // "<id>-Title.mp3" -> "Title.mp3"
        let trimmed = original[id.len() + 1..].to_string();
        tokio::fs::rename(self.audio_path(&original), self.audio_path(&trimmed)).await?;

        info!(id, filename = trimmed, "Audio extraction finished");
        Ok(trimmed)
    }

    async fn find_output(&self, id: &str) -> Result<Option<String>> {
        let prefix = format!("{id}-");
        let mut entries = tokio::fs::read_dir(&self.config.audio_dir)
            .await
            .context("Failed to read audio dir")?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".mp3") {
                return Ok(Some(name));
            }
        }

        Ok(None)
    }

    /// Best-effort file removal; a missing file is not an error.
    pub async fn remove_file(&self, filename: &str) {
        let path = self.audio_path(filename);
        if let Err(e) = tokio::fs::remove_file(&path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "Failed to remove audio file");
        }
    }
}
