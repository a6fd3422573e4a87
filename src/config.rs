use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::analysis::KeywordConfig;

/// Environment variable holding the completion API key
pub const API_KEY_ENV: &str = "SARVAM_API_KEY";
pub const HOST_ENV: &str = "DOC_INSIGHTS_HOST";
pub const PORT_ENV: &str = "DOC_INSIGHTS_PORT";
pub const DATA_DIR_ENV: &str = "DOC_INSIGHTS_DATA_DIR";
pub const AI_URL_ENV: &str = "DOC_INSIGHTS_AI_URL";

pub const DEFAULT_AI_URL: &str = "https://api.sarvam.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sarvam-m";

const APP_DIR: &str = "doc-insights";
const DATABASE_FILE: &str = "document_insights.db";
const UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub ai_url: String,
    pub model: String,
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    /// Extracted text is cut to this many characters before it is sent upstream
    pub max_prompt_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_upload_bytes: usize,
    pub keywords: KeywordConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            ai_url: DEFAULT_AI_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: None,
            request_timeout_secs: 30,
            max_prompt_chars: 12_000,
            max_tokens: 500,
            temperature: 0.7,
            max_upload_bytes: 20 * 1024 * 1024,
            keywords: KeywordConfig::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join(APP_DIR))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file (or defaults), then apply `.env` and environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        } else {
            Config::default()
        };

        dotenvy::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Save config to file with secure permissions (600)
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Config path has no parent directory"))?;

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory {:?}", dir))?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, &content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        // The file may carry the API key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)
                .with_context(|| "Failed to set config file permissions")?;
        }

        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a valid port, got {:?}", PORT_ENV, port))?;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup(AI_URL_ENV) {
            self.ai_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.ai_url)
            .with_context(|| format!("Invalid completion endpoint URL: {}", self.ai_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Completion endpoint must be http(s), got {}", url.scheme());
        }
        if self.keywords.top_n == 0 {
            anyhow::bail!("keywords.top_n must be at least 1");
        }
        Ok(())
    }

    /// Check if the completion API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// The API key, ignoring blank values
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{}", tail)
            }
        })
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let base = dirs::data_dir().context("Could not determine data directory")?;
                Ok(base.join(APP_DIR))
            }
        }
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(DATABASE_FILE))
    }

    pub fn uploads_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(UPLOADS_DIR))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
