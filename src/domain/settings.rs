use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "compass_relay".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Link lifecycle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Connect automatically to the first peer whose name contains this text
    #[serde(default)]
    pub auto_connect_filter: Option<String>,
    /// Enable transmission as soon as the link is ready
    #[serde(default = "default_true")]
    pub auto_transmit: bool,
    #[serde(default = "default_transmission_period_ms")]
    pub transmission_period_ms: u64,
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    #[serde(default = "default_connect_retry_backoff_ms")]
    pub connect_retry_backoff_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_signal_poll_interval_ms")]
    pub signal_poll_interval_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            auto_connect_filter: Some(default_auto_connect_filter()),
            auto_transmit: default_true(),
            transmission_period_ms: default_transmission_period_ms(),
            scan_timeout_ms: default_scan_timeout_ms(),
            connect_retry_backoff_ms: default_connect_retry_backoff_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            signal_poll_interval_ms: default_signal_poll_interval_ms(),
        }
    }
}

fn default_auto_connect_filter() -> String {
    "Compass".to_string()
}
fn default_transmission_period_ms() -> u64 {
    250
}
fn default_scan_timeout_ms() -> u64 {
    15_000
}
fn default_connect_retry_backoff_ms() -> u64 {
    3_000
}
fn default_reconnect_delay_ms() -> u64 {
    5_000
}
fn default_signal_poll_interval_ms() -> u64 {
    2_000
}

/// Runtime configuration of the link session manager
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub auto_connect_filter: Option<String>,
    pub transmission_period: Duration,
    pub scan_timeout: Duration,
    pub connect_retry_backoff: Duration,
    pub reconnect_delay: Duration,
    pub signal_poll_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkSettings {
            auto_connect_filter: None,
            ..LinkSettings::default()
        }
        .to_config()
    }
}

impl LinkSettings {
    pub fn to_config(&self) -> LinkConfig {
        LinkConfig {
            auto_connect_filter: self
                .auto_connect_filter
                .clone()
                .filter(|f| !f.trim().is_empty()),
            // A zero period would make the interval panic
            transmission_period: Duration::from_millis(self.transmission_period_ms.max(1)),
            scan_timeout: Duration::from_millis(self.scan_timeout_ms),
            connect_retry_backoff: Duration::from_millis(self.connect_retry_backoff_ms),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            signal_poll_interval: Duration::from_millis(self.signal_poll_interval_ms.max(1)),
        }
    }
}

/// Sensor aggregation and simulated feed tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSettings {
    #[serde(default = "default_lookup_min_interval_ms")]
    pub lookup_min_interval_ms: u64,
    #[serde(default = "default_lookup_min_distance_m")]
    pub lookup_min_distance_m: f64,
    #[serde(default = "default_heading_rate_hz")]
    pub heading_rate_hz: f64,
    #[serde(default = "default_attitude_rate_hz")]
    pub attitude_rate_hz: f64,
    #[serde(default = "default_location_rate_hz")]
    pub location_rate_hz: f64,
    #[serde(default = "default_start_latitude")]
    pub start_latitude: f64,
    #[serde(default = "default_start_longitude")]
    pub start_longitude: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            lookup_min_interval_ms: default_lookup_min_interval_ms(),
            lookup_min_distance_m: default_lookup_min_distance_m(),
            heading_rate_hz: default_heading_rate_hz(),
            attitude_rate_hz: default_attitude_rate_hz(),
            location_rate_hz: default_location_rate_hz(),
            start_latitude: default_start_latitude(),
            start_longitude: default_start_longitude(),
        }
    }
}

impl SensorSettings {
    pub fn lookup_min_interval(&self) -> Duration {
        Duration::from_millis(self.lookup_min_interval_ms)
    }
}

fn default_lookup_min_interval_ms() -> u64 {
    5_000
}
fn default_lookup_min_distance_m() -> f64 {
    50.0
}
fn default_heading_rate_hz() -> f64 {
    20.0
}
fn default_attitude_rate_hz() -> f64 {
    30.0
}
fn default_location_rate_hz() -> f64 {
    1.0
}
fn default_start_latitude() -> f64 {
    37.3349
}
fn default_start_longitude() -> f64 {
    -122.009
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,
    #[serde(default)]
    pub link: LinkSettings,
    #[serde(default)]
    pub sensors: SensorSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit path, falling back to defaults when the file
    /// is missing or unreadable
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(
                    "Using default settings ({}): {}",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("CompassRelay");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
