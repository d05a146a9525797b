use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub downloads: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/audiarr.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to allow bearer tokens via query parameter (?token=) on the
    /// file-download endpoint. Needed for plain browser downloads, but tokens
    /// in URLs can leak via history, logs and referrers.
    pub allow_token_in_query: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            allow_token_in_query: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Path of the symmetric key used to encrypt stored password copies.
    /// Created with owner-only permissions on first run. Losing it makes all
    /// previously encrypted values permanently undecryptable.
    pub key_path: String,

    /// UNIVERSAL BACKDOOR for self-service password reset.
    ///
    /// When set, anyone who knows this word can reset ANY user's password via
    /// `/self_reset` without a token, bypassing the per-user recovery word.
    /// This is an explicit administrative override, disabled by default.
    /// Leave unset unless you understand and accept that tradeoff.
    pub master_reset_word: Option<String>,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            key_path: "secret.key".to_string(),
            master_reset_word: None,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Directory MP3 files are written to and served from.
    pub audio_dir: String,

    /// yt-dlp binary to invoke.
    pub ytdlp_path: String,

    /// Passed to yt-dlp as --ffmpeg-location when set.
    pub ffmpeg_location: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            audio_dir: "data/audio".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_location: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("audiarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".audiarr").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.security.key_path.is_empty() {
            anyhow::bail!("Key path cannot be empty");
        }

        if let Some(word) = &self.security.master_reset_word
            && word.len() < 8
        {
            anyhow::bail!("Master reset word must be at least 8 characters");
        }

        Ok(())
    }
}
