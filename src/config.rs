use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// IANA time zone the sheet's times are written in.
    pub timezone: String,
    /// Fixed delay before the single retry of a failed sink call.
    pub retry_delay_secs: u64,
    /// Timeout for the pre-flight connectivity probe.
    pub connect_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            retry_delay_secs: 1,
            connect_timeout_secs: 15,
        }
    }
}

/// One person or group to sync: a row-selection token bound to a sheet
/// and a target calendar. Profiles are independent of each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Initials matched against the assignment column, or `ANY`.
    pub initials: String,
    /// Path or URL of the sheet's CSV export.
    pub sheet: String,
    /// Header of the column the initials are matched against.
    #[serde(default = "default_assignment_column")]
    pub assignment_column: String,
    /// chrono format of the sheet's date cells, e.g. `Saturday-Mar-05-22`.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Target calendar this profile owns. Two profiles must not share one.
    pub calendar_id: String,
    #[serde(default)]
    pub color: EventColor,
    /// Environment variable holding the calendar API bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_assignment_column() -> String {
    "SOUND".to_string()
}

fn default_date_format() -> String {
    "%A-%b-%d-%y".to_string()
}

fn default_token_env() -> String {
    "SHEETCAL_TOKEN".to_string()
}

/// Google Calendar event palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventColor {
    Lavender,
    Sage,
    Grape,
    Flamingo,
    Banana,
    Tangerine,
    Peacock,
    Graphite,
    Blueberry,
    Basil,
    #[default]
    Tomato,
}

impl EventColor {
    /// Numeric colorId the calendar API expects.
    pub fn id(self) -> u8 {
        match self {
            EventColor::Lavender => 1,
            EventColor::Sage => 2,
            EventColor::Grape => 3,
            EventColor::Flamingo => 4,
            EventColor::Banana => 5,
            EventColor::Tangerine => 6,
            EventColor::Peacock => 7,
            EventColor::Graphite => 8,
            EventColor::Blueberry => 9,
            EventColor::Basil => 10,
            EventColor::Tomato => 11,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            profiles: vec![Profile {
                name: "example".to_string(),
                initials: "ADH".to_string(),
                sheet: "/tmp/schedule.csv".to_string(),
                assignment_column: default_assignment_column(),
                date_format: default_date_format(),
                calendar_id: "you@example.com".to_string(),
                color: EventColor::Tomato,
                token_env: default_token_env(),
            }],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        // If config doesn't exist, create default
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}

fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "sheetcal", "sheetcal")
        .context("Failed to determine config directory")?;

    Ok(proj_dirs.config_dir().join("config.toml"))
}

/// Directory for runtime state (the watcher's reference-row file).
pub fn state_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "sheetcal", "sheetcal")
        .context("Failed to determine state directory")?;

    Ok(proj_dirs.data_dir().to_path_buf())
}
