//! Daemon configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;
use voidlink_core::protocol::SIDETONE_MAX;
use voidlink_hid::device::{CORSAIR_VID, VOID_PRO_WIRELESS_PID};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Receiver settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Status file settings
    #[serde(default)]
    pub status: StatusConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level(), log_json: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Receiver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// USB Vendor ID (hex)
    #[serde(default = "default_vid")]
    pub vendor_id: String,
    /// USB Product ID (hex)
    #[serde(default = "default_pid")]
    pub product_id: String,
    /// How often to look for the receiver while it is absent
    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,
    /// Report read timeout; bounds how long shutdown waits for the reader
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: i32,
    /// Sidetone level applied every time the headset connects
    #[serde(default)]
    pub sidetone: Option<u8>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vid(),
            product_id: default_pid(),
            rescan_interval_ms: default_rescan_interval_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            sidetone: None,
        }
    }
}

impl DeviceConfig {
    /// Parsed vendor and product ids.
    pub fn usb_ids(&self) -> Result<(u16, u16)> {
        Ok((parse_usb_id(&self.vendor_id)?, parse_usb_id(&self.product_id)?))
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }
}

fn default_vid() -> String {
    format!("{CORSAIR_VID:04x}")
}

fn default_pid() -> String {
    format!("{VOID_PRO_WIRELESS_PID:04x}")
}

fn default_rescan_interval_ms() -> u64 {
    2000
}

fn default_read_timeout_ms() -> i32 {
    250
}

fn parse_usb_id(id: &str) -> Result<u16> {
    let digits = id.trim().trim_start_matches("0x");
    u16::from_str_radix(digits, 16).with_context(|| format!("Invalid USB id: {id:?}"))
}

/// Status file settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusConfig {
    /// JSON snapshot rewritten on every headset change (disabled if unset)
    pub file: Option<PathBuf>,
}

impl Config {
    /// Reject values the daemon cannot act on.
    pub fn validate(&self) -> Result<()> {
        self.device.usb_ids()?;
        if let Some(level) = self.device.sidetone
            && level > SIDETONE_MAX
        {
            bail!("device.sidetone must be 0-{SIDETONE_MAX}, got {level}");
        }
        if self.device.read_timeout_ms <= 0 {
            bail!("device.read_timeout_ms must be positive");
        }
        Ok(())
    }
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Load configuration from a specific path, using defaults if it is missing.
pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let config = if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {config_path:?}"))?
    } else {
        info!(?config_path, "Config file not found, using defaults");
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "voidlink", "Voidlink")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
