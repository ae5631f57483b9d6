//! Remote commands
//!
//! Each command carries its own arguments and resolves, together with the
//! configuration, into either a JSON-RPC call or a wake request.

use clap::Subcommand;
use thiserror::Error;

use crate::config::Config;
use crate::protocol::Params;

/// Errors turning a command into an action
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("'{command}' needs '{setting}' to be set in the configuration file")]
    MissingSetting {
        command: &'static str,
        setting: &'static str,
    },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Commands sent to the media center
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
#[command(rename_all = "lower")]
pub enum Command {
    /// Send a JSON-RPC ping
    Ping,

    /// Reboot the system
    Reboot,

    /// Put the system into suspend mode
    Suspend,

    /// Scan the video library, or a specific path
    Scan {
        /// Path to scan (whole library if omitted)
        path: Option<String>,
    },

    /// Scan the configured TV path for new episodes
    ScanTv,

    /// Scan the configured movie path for new movies
    ScanMovies,

    /// Scan the configured music path
    ScanMusic,

    /// Clean the video library of entries that no longer exist
    Clean,

    /// Clean the music library of entries that no longer exist
    CleanMusic,

    /// Send text as input (quote strings with spaces)
    SendText {
        text: String,
    },

    /// Show a notification
    Notify {
        title: String,
        message: String,
    },

    /// Set the volume (0-100)
    SetVolume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: u8,
    },

    /// Toggle play/pause
    #[command(name = "pause")]
    PlayPause {
        /// Player to toggle
        #[arg(long = "player", default_value_t = 1)]
        player_id: i64,
    },

    /// Send a Wake-on-LAN magic packet
    Wake {
        /// MAC address (overrides wake.mac_addr)
        #[arg(short, long)]
        mac: Option<String>,

        /// Broadcast address (overrides wake.broadcast_address)
        #[arg(short, long)]
        broadcast: Option<String>,

        /// Broadcast port (overrides wake.broadcast_port)
        #[arg(short, long)]
        port: Option<String>,
    },
}

/// A JSON-RPC call ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub method: &'static str,
    pub params: Params,
}

impl RemoteCall {
    fn new(method: &'static str) -> Self {
        Self::with_params(method, Params::new())
    }

    fn with_params(method: &'static str, params: Params) -> Self {
        Self { method, params }
    }
}

/// Where and what to wake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeTarget {
    pub mac_addr: String,
    pub broadcast_address: String,
    pub broadcast_port: String,
}

/// What a command boils down to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Rpc(RemoteCall),
    Wake(WakeTarget),
}

impl Command {
    /// Name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Reboot => "reboot",
            Command::Suspend => "suspend",
            Command::Scan { .. } => "scan",
            Command::ScanTv => "scantv",
            Command::ScanMovies => "scanmovies",
            Command::ScanMusic => "scanmusic",
            Command::Clean => "clean",
            Command::CleanMusic => "cleanmusic",
            Command::SendText { .. } => "sendtext",
            Command::Notify { .. } => "notify",
            Command::SetVolume { .. } => "setvolume",
            Command::PlayPause { .. } => "pause",
            Command::Wake { .. } => "wake",
        }
    }

    /// Turn the command into an action, filling in values from `config`
    pub fn resolve(self, config: &Config) -> ResolveResult<Action> {
        let name = self.name();
        let require = |value: &Option<String>, setting: &'static str| {
            value.clone().ok_or(ResolveError::MissingSetting {
                command: name,
                setting,
            })
        };

        let call = match self {
            Command::Ping => RemoteCall::new("JSONRPC.Ping"),
            Command::Reboot => RemoteCall::new("System.Reboot"),
            Command::Suspend => RemoteCall::new("System.Suspend"),
            Command::Scan { path: None } => RemoteCall::new("VideoLibrary.Scan"),
            Command::Scan { path: Some(path) } => RemoteCall::with_params(
                "VideoLibrary.Scan",
                Params::new().with("directory", path),
            ),
            Command::ScanTv => RemoteCall::with_params(
                "VideoLibrary.Scan",
                Params::new().with("directory", require(&config.library.tv_path, "library.tv_path")?),
            ),
            Command::ScanMovies => RemoteCall::with_params(
                "VideoLibrary.Scan",
                Params::new().with(
                    "directory",
                    require(&config.library.movie_path, "library.movie_path")?,
                ),
            ),
            Command::ScanMusic => RemoteCall::with_params(
                "AudioLibrary.Scan",
                Params::new().with(
                    "directory",
                    require(&config.library.music_path, "library.music_path")?,
                ),
            ),
            Command::Clean => RemoteCall::new("VideoLibrary.Clean"),
            Command::CleanMusic => RemoteCall::new("AudioLibrary.Clean"),
            Command::SendText { text } => {
                RemoteCall::with_params("Input.SendText", Params::new().with("text", text))
            }
            Command::Notify { title, message } => RemoteCall::with_params(
                "GUI.ShowNotification",
                Params::new().with("title", title).with("message", message),
            ),
            Command::SetVolume { volume } => RemoteCall::with_params(
                "Application.SetVolume",
                Params::new().with("volume", i64::from(volume)),
            ),
            Command::PlayPause { player_id } => RemoteCall::with_params(
                "Player.PlayPause",
                Params::new().with("playerid", player_id),
            ),
            Command::Wake { mac, broadcast, port } => {
                let mac_addr = match mac {
                    Some(mac) => mac,
                    None => require(&config.wake.mac_addr, "wake.mac_addr")?,
                };
                return Ok(Action::Wake(WakeTarget {
                    mac_addr,
                    broadcast_address: broadcast
                        .unwrap_or_else(|| config.wake.broadcast_address.clone()),
                    broadcast_port: port.unwrap_or_else(|| config.wake.broadcast_port.to_string()),
                }));
            }
        };

        Ok(Action::Rpc(call))
    }
}
