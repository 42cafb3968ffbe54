//! Configuration management for the roulette table
//!
//! Defaults, TOML loading, `ROULETTE_*` environment overrides and
//! validation.

use crate::errors::{ConfigurationError, RouletteResult};
use crate::games::pocket::MAX_POCKET;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete table configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouletteConfig {
    pub server: ServerConfig,
    pub table: TableConfig,
    pub random: RandomConfig,
    pub testing: TestingConfig,
}

/// HTTP / WebSocket listener settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6000,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Round timing and client limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Bet window length; zero together with `pause_window_ms` selects manual mode
    pub open_window_ms: u64,
    pub pause_window_ms: u64,
    pub settlement_timeout_ms: u64,
    /// Outbound queue capacity per client; a full queue evicts the client
    pub client_queue_capacity: usize,
    pub max_stake: u64,
    /// Remote settlement service; settles in-process when unset
    pub settlement_url: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            open_window_ms: 30_000,
            pause_window_ms: 10_000,
            settlement_timeout_ms: 2_000,
            client_queue_capacity: 16,
            max_stake: 1_000_000,
            settlement_url: None,
        }
    }
}

impl TableConfig {
    /// Manual mode: rounds resolve only on an explicit trigger
    pub fn is_manual(&self) -> bool {
        self.open_window_ms == 0 && self.pause_window_ms == 0
    }

    pub fn open_window(&self) -> Duration {
        Duration::from_millis(self.open_window_ms)
    }

    pub fn pause_window(&self) -> Duration {
        Duration::from_millis(self.pause_window_ms)
    }

    pub fn settlement_timeout(&self) -> Duration {
        Duration::from_millis(self.settlement_timeout_ms)
    }
}

/// Raw random stream settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Base URL of a remote RNG service (`GET {url}/rng?nums=N`)
    pub remote_url: Option<String>,
    /// Keep the in-process sources behind the remote one
    pub local_fallback: bool,
    /// Raw values fetched per refill
    pub block_size: usize,
    /// Seed for the pseudorandom fallback; derived from the clock when unset
    pub fallback_seed: Option<u64>,
    pub request_timeout_ms: u64,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            local_fallback: true,
            block_size: 256,
            fallback_seed: None,
            request_timeout_ms: 1_000,
        }
    }
}

/// Test-only hooks. Never wired to the client command stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    pub allow_override_pocket: bool,
    pub override_pocket: Option<u8>,
}

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> RouletteResult<RouletteConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            RouletteConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> RouletteResult<RouletteConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut RouletteConfig) -> RouletteResult<()> {
        if let Ok(host) = env::var("ROULETTE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("ROULETTE_PORT") {
            config.server.port = parse_env("ROULETTE_PORT", port, "Invalid port number")?;
        }
        if let Ok(ms) = env::var("ROULETTE_OPEN_WINDOW_MS") {
            config.table.open_window_ms = parse_env("ROULETTE_OPEN_WINDOW_MS", ms, "Invalid duration")?;
        }
        if let Ok(ms) = env::var("ROULETTE_PAUSE_WINDOW_MS") {
            config.table.pause_window_ms = parse_env("ROULETTE_PAUSE_WINDOW_MS", ms, "Invalid duration")?;
        }
        if let Ok(ms) = env::var("ROULETTE_SETTLEMENT_TIMEOUT_MS") {
            config.table.settlement_timeout_ms =
                parse_env("ROULETTE_SETTLEMENT_TIMEOUT_MS", ms, "Invalid duration")?;
        }
        if let Ok(url) = env::var("ROULETTE_SETTLEMENT_URL") {
            config.table.settlement_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Ok(url) = env::var("ROULETTE_RNG_URL") {
            config.random.remote_url = Some(url).filter(|u| !u.is_empty());
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &RouletteConfig) -> RouletteResult<()> {
        if config.server.port == 0 {
            return Err(invalid("server.port", "0", "Port cannot be zero"));
        }

        let table = &config.table;
        if table.open_window_ms == 0 && table.pause_window_ms != 0 {
            return Err(invalid(
                "table.open_window_ms",
                "0",
                "Manual mode requires both windows to be zero",
            ));
        }
        if table.settlement_timeout_ms < 100 {
            return Err(invalid(
                "table.settlement_timeout_ms",
                &table.settlement_timeout_ms.to_string(),
                "Timeout must be at least 100ms",
            ));
        }
        if table.client_queue_capacity == 0 {
            return Err(invalid("table.client_queue_capacity", "0", "Queue capacity cannot be zero"));
        }
        if table.max_stake == 0 {
            return Err(invalid("table.max_stake", "0", "Max stake cannot be zero"));
        }

        if config.random.block_size == 0 {
            return Err(invalid("random.block_size", "0", "Block size cannot be zero"));
        }
        if config.random.remote_url.is_none() && !config.random.local_fallback {
            return Err(ConfigurationError::MissingRequired(
                "random.remote_url (local_fallback is disabled)".to_string(),
            )
            .into());
        }

        if let Some(pocket) = config.testing.override_pocket {
            if !config.testing.allow_override_pocket {
                return Err(invalid(
                    "testing.override_pocket",
                    &pocket.to_string(),
                    "Requires testing.allow_override_pocket = true",
                ));
            }
            if pocket > MAX_POCKET {
                return Err(invalid(
                    "testing.override_pocket",
                    &pocket.to_string(),
                    "Pocket must be between 0 and 36",
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &RouletteConfig, path: &str) -> RouletteResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> RouletteResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::errors::RouletteError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: RouletteConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RouletteConfig::default(),
        }
    }

    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    pub fn table(mut self, table: TableConfig) -> Self {
        self.config.table = table;
        self
    }

    pub fn random(mut self, random: RandomConfig) -> Self {
        self.config.random = random;
        self
    }

    pub fn testing(mut self, testing: TestingConfig) -> Self {
        self.config.testing = testing;
        self
    }

    /// Shorthand for a table resolved only by explicit triggers
    pub fn manual(mut self) -> Self {
        self.config.table.open_window_ms = 0;
        self.config.table.pause_window_ms = 0;
        self
    }

    pub fn build(self) -> RouletteConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> RouletteResult<()> {
    ConfigLoader::new().save(&RouletteConfig::default(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = RouletteConfig::default();
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.table.open_window_ms, 30_000);
        assert_eq!(config.table.pause_window_ms, 10_000);
        assert!(!config.table.is_manual());
        assert!(config.random.local_fallback);
    }

    #[test]
    fn test_config_validation() {
        let loader = ConfigLoader::new();
        let mut config = RouletteConfig::default();
        assert!(loader.validate(&config).is_ok());

        config.server.port = 0;
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_manual_mode_requires_both_windows_zero() {
        let loader = ConfigLoader::new();

        let manual = ConfigBuilder::new().manual().build();
        assert!(manual.table.is_manual());
        assert!(loader.validate(&manual).is_ok());

        let mut half = ConfigBuilder::new().manual().build();
        half.table.pause_window_ms = 500;
        assert!(loader.validate(&half).is_err());

        // Timed mode without a pause wait is fine
        let mut no_pause = RouletteConfig::default();
        no_pause.table.pause_window_ms = 0;
        assert!(!no_pause.table.is_manual());
        assert!(loader.validate(&no_pause).is_ok());
    }

    #[test]
    fn test_override_pocket_is_gated() {
        let loader = ConfigLoader::new();
        let mut config = RouletteConfig::default();

        config.testing.override_pocket = Some(17);
        assert!(loader.validate(&config).is_err());

        config.testing.allow_override_pocket = true;
        assert!(loader.validate(&config).is_ok());

        config.testing.override_pocket = Some(37);
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_remote_or_local_source_required() {
        let loader = ConfigLoader::new();
        let mut config = RouletteConfig::default();
        config.random.local_fallback = false;
        assert!(loader.validate(&config).is_err());

        config.random.remote_url = Some("http://127.0.0.1:6001".to_string());
        assert!(loader.validate(&config).is_ok());
    }

    #[test]
    fn test_save_and_load_config() -> RouletteResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut original = RouletteConfig::default();
        original.table.open_window_ms = 2_000;
        original.table.pause_window_ms = 1_000;

        ConfigLoader::new().save(&original, path)?;
        let loaded = ConfigLoader::new().with_path(path).load()?;

        assert_eq!(loaded.table.open_window_ms, 2_000);
        assert_eq!(loaded.table.pause_window_ms, 1_000);
        assert_eq!(loaded.table.settlement_timeout_ms, original.table.settlement_timeout_ms);

        Ok(())
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: RouletteConfig = toml::from_str("[table]\nopen_window_ms = 0\npause_window_ms = 0\n").unwrap();
        assert!(config.table.is_manual());
        assert_eq!(config.table.client_queue_capacity, 16);
        assert_eq!(config.server.port, 6000);
    }
}
