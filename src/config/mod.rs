//! Configuration module
//!
//! Handles loading and saving the remote's configuration: where the media
//! center lives, its library paths, and how to wake it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::NetworkConfig;
use crate::protocol::DEFAULT_PORT;
use crate::wol::{DEFAULT_BROADCAST_ADDRESS, DEFAULT_BROADCAST_PORT};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Media center endpoint
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Library locations used by the scan commands
    #[serde(default)]
    pub library: LibraryConfig,

    /// Wake-on-LAN settings
    #[serde(default)]
    pub wake: WakeConfig,
}

/// Media center endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Host name or IP address of the media center
    #[serde(default = "default_host")]
    pub host: String,
    /// JSON-RPC TCP port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection timeout in ms
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> u64 {
    5000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl RemoteConfig {
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig::new(self.connect_timeout_ms)
    }
}

/// Library paths, as the media center sees them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub tv_path: Option<String>,
    pub movie_path: Option<String>,
    pub music_path: Option<String>,
}

/// Wake-on-LAN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeConfig {
    /// Hardware address of the media center, `XX:XX:XX:XX:XX:XX`
    pub mac_addr: Option<String>,
    /// Broadcast address of the media center's subnet
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: String,
    #[serde(default = "default_broadcast_port")]
    pub broadcast_port: u16,
}

fn default_broadcast_address() -> String {
    DEFAULT_BROADCAST_ADDRESS.to_string()
}

fn default_broadcast_port() -> u16 {
    DEFAULT_BROADCAST_PORT
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            mac_addr: None,
            broadcast_address: default_broadcast_address(),
            broadcast_port: default_broadcast_port(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Candidate locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("xbmc-remote/config.toml")),
            Some(PathBuf::from("./xbmc-remote.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load configuration from the default location
    pub fn load_default() -> Self {
        Self::load_first(&Self::default_paths())
    }

    /// Load the first of `paths` that exists.
    ///
    /// A file that cannot be read or parsed is skipped with a warning so that
    /// commands not needing it (e.g. `wake --mac`) still run.
    pub fn load_first(paths: &[PathBuf]) -> Self {
        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load(path) {
                Ok(config) => {
                    tracing::debug!("Loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Ignoring {}: {}", path.display(), e);
                }
            }
        }

        // Return default config if no usable file found
        Self::default()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Configuration with every setting filled in
pub fn sample_config() -> Config {
    Config {
        remote: RemoteConfig {
            host: "192.168.1.20".to_string(),
            ..Default::default()
        },
        library: LibraryConfig {
            tv_path: Some("smb://nas/tv/".to_string()),
            movie_path: Some("/path/to/movies".to_string()),
            music_path: Some("/path/to/music".to_string()),
        },
        wake: WakeConfig {
            mac_addr: Some("00:0a:95:9d:68:16".to_string()),
            broadcast_address: "192.168.1.255".to_string(),
            ..Default::default()
        },
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> ConfigResult<String> {
    Ok(toml::to_string_pretty(&sample_config())?)
}
