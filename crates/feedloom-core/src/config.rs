use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Feed URLs registered when the watcher starts
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between the end of one poll cycle and the start of the next
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Attempts per fetch before reporting a network error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// HTTP proxy URL for feed fetching (e.g., "http://127.0.0.1:7890" or "socks5://127.0.0.1:1080")
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// AllOrigins-style relay; when set, feeds are fetched as
    /// `<relay>?disableCache=true&url=<feed url>` and unwrapped from JSON
    #[serde(default)]
    pub cors_proxy_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            proxy_url: None,
            cors_proxy_url: None,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl AppConfig {
    /// Load configuration from file or return defaults
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, self.to_toml()?)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/feedloom/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("feedloom")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.sync.poll_interval_secs, 5);
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(5));
        assert!(config.sync.cors_proxy_url.is_none());
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            feeds = ["https://example.com/feed.xml"]

            [sync]
            poll_interval_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.feeds, vec!["https://example.com/feed.xml".to_string()]);
        assert_eq!(config.sync.poll_interval_secs, 60);
        assert_eq!(config.sync.request_timeout_secs, 30);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("sync = 3").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip_preserves_relay() {
        let mut config = AppConfig::default();
        config.sync.cors_proxy_url = Some("https://allorigins.hexlet.app/get".to_string());

        let text = config.to_toml().unwrap();
        let loaded = AppConfig::from_toml(&text).unwrap();
        assert_eq!(
            loaded.sync.cors_proxy_url.as_deref(),
            Some("https://allorigins.hexlet.app/get")
        );
    }
}
