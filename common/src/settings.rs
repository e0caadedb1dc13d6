use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::card::DeviceCard;
use crate::schedule::PollTiming;

/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User settings of the dashboard.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base url of the bridge. Without one, sample data is shown.
    pub bridge_url: Option<String>,
    pub username: String,
    pub password: Option<String>,
    /// Directory containing the `img/*.png` icons.
    pub assets_dir: PathBuf,
    /// The cards to show. Empty means one card per device the bridge reports.
    pub devices: Vec<DeviceCard>,
    pub startup_delay_secs: u64,
    pub max_wait_secs: u64,
    pub buffer_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bridge_url: None,
            username: "admin".into(),
            password: None,
            assets_dir: PathBuf::from("assets"),
            devices: Vec::new(),
            startup_delay_secs: PollTiming::STARTUP.as_secs(),
            max_wait_secs: PollTiming::CEILING.as_secs(),
            buffer_secs: PollTiming::BUFFER.as_secs(),
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Loads the settings file from the user's config directory and applies
    /// the environment on top of it.
    pub fn load() -> Result<Self, SettingsError> {
        let settings = match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            Some(path) => {
                log::info!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        Ok(settings.with_env(|key| std::env::var(key).ok()))
    }

    /// `settings.json` in the platform's config directory, if there is one.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("site", "aranet", "bridge-dashboard")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_owned(),
            source,
        })?;

        serde_json::from_str(&json).map_err(|source| SettingsError::Json {
            path: path.to_owned(),
            source,
        })
    }

    /// Overrides settings from `BRIDGE_URL`, `BRIDGE_USER`, `BRIDGE_PASSWORD`
    /// and `BRIDGE_ASSETS`, looked up through `var`.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("BRIDGE_URL") {
            self.bridge_url = Some(url);
        }
        if let Some(username) = var("BRIDGE_USER") {
            self.username = username;
        }
        if let Some(password) = var("BRIDGE_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(assets) = var("BRIDGE_ASSETS") {
            self.assets_dir = PathBuf::from(assets);
        }
        self
    }

    pub fn timing(&self) -> PollTiming {
        PollTiming {
            startup: Duration::from_secs(self.startup_delay_secs),
            ceiling: Duration::from_secs(self.max_wait_secs),
            buffer: Duration::from_secs(self.buffer_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
