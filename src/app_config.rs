use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::{
    ADVANCE_DELAY, DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS, MAX_UPLOAD_MB,
    MIN_DISPLAY_TIME, POEM_POST_DISPLAY_TIME, PRIMARY_CHAR_DELAY, SECONDARY_CHAR_DELAY,
};

const CONFIG_PATH: &str = ".nvshu/config.json";
const BACKEND_URL_ENV: &str = "NVSHU_BACKEND_URL";
const TIMEOUT_ENV: &str = "NVSHU_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub pacing: PacingConfig,
    pub reveal: RevealConfig,
    pub upload: UploadConfig,
    pub pipeline: PipelineLogConfig,
}

impl AppConfig {
    /// Load from `.nvshu/config.json` in the working directory, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(Path::new(CONFIG_PATH))?;
        config.apply_env();
        Ok(config)
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn apply_env(&mut self) {
        if let Some(url) = std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.backend.base_url = url;
        }
        if let Some(secs) = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
        {
            self.backend.timeout_secs = secs;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_display_ms: u64,
    pub poem_post_display_ms: u64,
    pub advance_delay_ms: u64,
}

impl PacingConfig {
    pub fn min_display(&self) -> Duration {
        Duration::from_millis(self.min_display_ms)
    }

    pub fn poem_post_display(&self) -> Duration {
        Duration::from_millis(self.poem_post_display_ms)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_display_ms: MIN_DISPLAY_TIME.as_millis() as u64,
            poem_post_display_ms: POEM_POST_DISPLAY_TIME.as_millis() as u64,
            advance_delay_ms: ADVANCE_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub primary_char_ms: u64,
    pub secondary_char_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            primary_char_ms: PRIMARY_CHAR_DELAY.as_millis() as u64,
            secondary_char_ms: SECONDARY_CHAR_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_mb: u64,
}

impl UploadConfig {
    pub fn max_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_mb: MAX_UPLOAD_MB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineLogConfig {
    pub enabled: bool,
    pub log_dir: String,
}

impl Default for PipelineLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: ".nvshu/runs/".to_string(),
        }
    }
}
