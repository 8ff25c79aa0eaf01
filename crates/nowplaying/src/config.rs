use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub now_playing: NowPlayingConfig,
    #[serde(default)]
    pub stations: StationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Refresh cadence and transport settings for the now-playing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NowPlayingConfig {
    /// Seconds between polls of a JSON now-playing endpoint.
    #[serde(default = "default_rest_interval")]
    pub rest_interval_secs: u64,
    /// Seconds between ICY reconnects.
    #[serde(default = "default_icy_interval")]
    pub icy_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Station list source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Local TOML station file.  The built-in registry is used when it does
    /// not exist.
    #[serde(default = "default_stations_toml")]
    pub stations_toml: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            log_file: default_log_file(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for NowPlayingConfig {
    fn default() -> Self {
        Self {
            rest_interval_secs: default_rest_interval(),
            icy_interval_secs: default_icy_interval(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl NowPlayingConfig {
    pub fn rest_interval(&self) -> Duration {
        Duration::from_secs(self.rest_interval_secs.max(1))
    }

    pub fn icy_interval(&self) -> Duration {
        Duration::from_secs(self.icy_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            stations_toml: default_stations_toml(),
        }
    }
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("state.json")
}

fn default_log_file() -> PathBuf {
    platform::data_dir().join("daemon.log")
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8989
}

fn default_rest_interval() -> u64 {
    30
}

fn default_icy_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("radio-nowplaying/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_stations_toml() -> PathBuf {
    platform::config_dir().join("stations.toml")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 8989);
        assert_eq!(config.http.bind_address, "127.0.0.1");
        assert_eq!(config.now_playing.rest_interval(), Duration::from_secs(30));
        assert_eq!(config.now_playing.icy_interval(), Duration::from_secs(15));
        assert!(config
            .stations
            .stations_toml
            .ends_with("radio-nowplaying/stations.toml"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [now_playing]
            rest_interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.now_playing.rest_interval_secs, 60);
        assert_eq!(config.now_playing.icy_interval_secs, 15);
        assert_eq!(config.http.port, 8989);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let cfg = NowPlayingConfig {
            icy_interval_secs: 0,
            ..NowPlayingConfig::default()
        };
        assert_eq!(cfg.icy_interval(), Duration::from_secs(1));
    }
}
