//! TOML-based configuration for the host.
//!
//! Read from the platform-appropriate config file unless `--config` names
//! another one:
//! - Windows:  `%APPDATA%\Padlink\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/padlink/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/Padlink/config.toml`
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration.  Command-line flags override whatever the file says.
//!
//! ```toml
//! log_level = "debug"
//!
//! [device]
//! name = "Yoke"
//! id = 2
//! backend = "platform"
//! default_layout = "j1,b1"
//!
//! [network]
//! interface = "auto"
//! port = 5005
//!
//! [aliases]
//! fire = "BTN_TRIGGER"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::virtual_device::BackendKind;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub network: NetworkSettings,
    #[serde(default)]
    pub assets: AssetSettings,
    /// Extra alias entries; they replace built-in aliases of the same name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Virtual gamepad identity and driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSettings {
    #[serde(default = "default_name")]
    pub name: String,
    /// Device number; also the vJoy device id on Windows.
    #[serde(default = "default_id")]
    pub id: u8,
    #[serde(default)]
    pub backend: BackendKind,
    /// Negotiation text of the layout active before any peer connects and
    /// after every timeout.  Empty means no controls.
    #[serde(default)]
    pub default_layout: String,
}

/// Socket and loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkSettings {
    /// `"auto"` or an IP address.
    #[serde(default = "default_interface")]
    pub interface: String,
    /// UDP port for controllers (and TCP port for assets).  0 = OS-assigned.
    #[serde(default)]
    pub port: u16,
    /// Default receive size and `SO_RCVBUF`, in bytes.
    #[serde(default = "default_receive_buffer")]
    pub receive_buffer: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Peer silence tolerated before the session returns to idle.
    #[serde(default = "default_liveness_ms")]
    pub liveness_ms: u64,
    #[serde(default = "default_true")]
    pub advertise: bool,
}

/// Client asset server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory holding the controller web client.
    #[serde(default = "default_client_path")]
    pub client_path: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_name() -> String {
    "Yoke".to_string()
}
fn default_id() -> u8 {
    1
}
fn default_interface() -> String {
    "auto".to_string()
}
fn default_receive_buffer() -> usize {
    64
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_liveness_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}
fn default_client_path() -> PathBuf {
    PathBuf::from("client")
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device: DeviceSettings::default(),
            network: NetworkSettings::default(),
            assets: AssetSettings::default(),
            aliases: BTreeMap::new(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            id: default_id(),
            backend: BackendKind::default(),
            default_layout: String::new(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            port: 0,
            receive_buffer: default_receive_buffer(),
            poll_interval_ms: default_poll_interval_ms(),
            liveness_ms: default_liveness_ms(),
            advertise: default_true(),
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            client_path: default_client_path(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the platform config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(platform_config_dir()
        .ok_or(ConfigError::NoPlatformConfigDir)?
        .join("config.toml"))
}

/// Loads the config from `path`, or from the platform file when `None`.
///
/// A missing file yields `HostConfig::default()`.  Without an explicit path
/// an undeterminable platform directory also yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<HostConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Ok(path) => path,
            Err(ConfigError::NoPlatformConfigDir) => return Ok(HostConfig::default()),
            Err(e) => return Err(e),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Writes `config` to `path`, creating parent directories.
///
/// The TOML is staged in `<path>.tmp` and renamed over `path`, so readers see
/// either the old file or the new one.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &HostConfig, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    std::fs::write(&staging, content).map_err(io_error(&staging))?;
    std::fs::rename(&staging, path).map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io { path, source }
}

/// `%APPDATA%\Padlink`, `~/Library/Application Support/Padlink`, or the XDG
/// config home's `padlink` on other Unixes.
fn platform_config_dir() -> Option<PathBuf> {
    let var = |name: &str| std::env::var_os(name).map(PathBuf::from);
    if cfg!(target_os = "windows") {
        var("APPDATA").map(|dir| dir.join("Padlink"))
    } else if cfg!(target_os = "macos") {
        var("HOME").map(|home| home.join("Library").join("Application Support").join("Padlink"))
    } else if cfg!(unix) {
        var("XDG_CONFIG_HOME")
            .or_else(|| var("HOME").map(|home| home.join(".config")))
            .map(|dir| dir.join("padlink"))
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
