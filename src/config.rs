use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub ice: IceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the relay's HTTP side, used once for registration
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceConfig {
    /// STUN servers handed to the media engine
    #[serde(default = "default_stun_servers")]
    pub stun_servers: Vec<String>,
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: u8,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_stun_servers() -> Vec<String> {
    vec![
        "stun:stun1.l.google.com:19302".to_string(),
        "stun:stun2.l.google.com:19302".to_string(),
    ]
}

fn default_candidate_pool_size() -> u8 {
    10
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            stun_servers: default_stun_servers(),
            candidate_pool_size: default_candidate_pool_size(),
        }
    }
}

impl Config {
    /// Load config from file, or create default if doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }
}

/// Get the parley directory (~/.parley)
pub fn get_parley_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}

/// Get the config file path (~/.parley/config.toml)
pub fn get_config_path() -> PathBuf {
    get_parley_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.relay.base_url, "http://localhost:3000");
        assert_eq!(config.ice.stun_servers.len(), 2);
        assert_eq!(config.ice.candidate_pool_size, 10);
    }

    #[test]
    fn test_config_partial_file_fills_defaults() {
        let content = r#"
[relay]
base_url = "http://relay.example.com:3000"
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.relay.base_url, "http://relay.example.com:3000");
        assert_eq!(config.ice.candidate_pool_size, 10);
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;

        // Mock the config path
        std::env::set_var("HOME", temp_dir.path());

        let mut config = Config::default();
        config.relay.base_url = "http://10.0.0.1:3000".to_string();
        config.save()?;

        assert!(get_config_path().exists());

        let loaded = Config::load()?;
        assert_eq!(loaded.relay.base_url, "http://10.0.0.1:3000");

        Ok(())
    }
}
