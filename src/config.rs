// Configuration File Support
//
// TOML configuration with environment variable overrides.
// Loaded from the XDG config directory: ~/.config/twitch-tools/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chat::{ChatConfig, DEFAULT_CHAT_URL};
use crate::helix::{HelixConfig, DEFAULT_BASE_URL};
use crate::pagination::PROVIDER_PAGE_CAP;
use crate::rate_limit::{RateLimitConfig, DEFAULT_COMMAND_LIMIT, DEFAULT_COMMAND_PERIOD_SECS};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Helix REST API access
    pub api: ApiConfig,

    /// Chat connection used by `bantool`
    pub chat: ChatSectionConfig,

    /// Defaults for `bantool`
    pub bantool: BanToolConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Helix API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub client_id: Option<String>,

    pub token: Option<String>,

    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Page size hint sent with follow listings
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            page_size: PROVIDER_PAGE_CAP,
        }
    }
}

/// Chat configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatSectionConfig {
    pub login: Option<String>,

    pub token: Option<String>,

    pub url: String,

    /// Keep-alive interval in seconds
    pub ping_interval_secs: u64,

    /// Time allowed for the login handshake, in seconds
    pub ready_timeout_secs: u64,
}

impl Default for ChatSectionConfig {
    fn default() -> Self {
        Self {
            login: None,
            token: None,
            url: DEFAULT_CHAT_URL.to_string(),
            ping_interval_secs: 240,
            ready_timeout_secs: 30,
        }
    }
}

/// Bulk command defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BanToolConfig {
    /// Commands allowed per period
    pub limit: u32,

    /// Window length in seconds
    pub period_secs: u64,

    /// Command used when none is given on the command line
    pub command: String,
}

impl Default for BanToolConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_COMMAND_LIMIT,
            period_secs: DEFAULT_COMMAND_PERIOD_SECS,
            command: "ban".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::debug!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/twitch-tools/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "twitch-tools") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("twitch-tools")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - TW_CLIENT_ID
    /// - TW_TOKEN (API and chat)
    /// - TW_LOGIN
    /// - TWITCH_TOOLS_LOG_LEVEL
    /// - TWITCH_TOOLS_LOG_FORMAT
    fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = var("TW_CLIENT_ID") {
            self.api.client_id = Some(client_id);
        }
        if let Some(token) = var("TW_TOKEN") {
            self.api.token = Some(token.clone());
            self.chat.token = Some(token);
        }
        if let Some(login) = var("TW_LOGIN") {
            self.chat.login = Some(login);
        }

        if let Some(level) = var("TWITCH_TOOLS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("TWITCH_TOOLS_LOG_FORMAT") {
            self.logging.format = format;
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.api.page_size == 0 || self.api.page_size > PROVIDER_PAGE_CAP {
            anyhow::bail!("API page size must be between 1 and {}", PROVIDER_PAGE_CAP);
        }
        if self.api.timeout_secs == 0 {
            anyhow::bail!("API timeout must be > 0");
        }

        if !(self.chat.url.starts_with("ws://") || self.chat.url.starts_with("wss://")) {
            anyhow::bail!("Chat URL must use ws:// or wss://, got {}", self.chat.url);
        }
        if self.chat.ready_timeout_secs == 0 {
            anyhow::bail!("Chat ready timeout must be > 0");
        }
        if self.chat.ping_interval_secs == 0 {
            anyhow::bail!("Chat ping interval must be > 0");
        }

        self.rate_limit()
            .validate()
            .context("Invalid [bantool] rate limit")?;
        if self.bantool.command.trim_start_matches('/').trim().is_empty() {
            anyhow::bail!("Default bantool command must not be empty");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Helix client settings
    pub fn helix(&self) -> HelixConfig {
        HelixConfig {
            base_url: self.api.base_url.clone(),
            client_id: self.api.client_id.clone(),
            token: self.api.token.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    /// Command rate limit from the `[bantool]` section
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.bantool.limit, self.bantool.period_secs)
    }

    /// Chat settings, with explicit credentials taking precedence
    ///
    /// # Errors
    ///
    /// Returns an error if no login or token is available.
    pub fn chat(&self, login: Option<&str>, token: Option<&str>) -> Result<ChatConfig> {
        let login = login
            .map(str::to_string)
            .or_else(|| self.chat.login.clone())
            .context("Login not set. Use --login, TW_LOGIN or [chat] login")?;
        let token = token
            .map(str::to_string)
            .or_else(|| self.chat.token.clone())
            .context("Token not set. Use --token, TW_TOKEN or [chat] token")?;

        Ok(ChatConfig::new(login, token)
            .with_url(self.chat.url.clone())
            .with_ping_interval(Duration::from_secs(self.chat.ping_interval_secs)))
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.ready_timeout_secs)
    }
}
