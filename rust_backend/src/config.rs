//! Planner configuration file support.
//!
//! Profile and preference settings are read from a TOML file:
//!
//! ```toml
//! [profile]
//! id = "backyard"
//! latitude = 48.2
//! longitude = 16.4
//! elevation_m = 180.0
//!
//! [meridian_flip]
//! pause_before_minutes = 5.0
//! minutes_after = 10.0
//!
//! [preferences]
//! exposure_throttle_percent = 125.0
//! sampling_interval_secs = 60
//! preview = false
//! park_on_wait = true
//! ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No planner.toml found in standard locations")]
    NotFound,
}

/// Planner configuration from file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub profile: ProfileSettings,
    #[serde(default)]
    pub meridian_flip: MeridianFlipSettings,
    #[serde(default)]
    pub preferences: PreferenceSettings,
}

/// Observing site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation_m: f64,
}

/// Mount meridian flip behaviour; a zero pause disables flip clipping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeridianFlipSettings {
    #[serde(default)]
    pub pause_before_minutes: f64,
    #[serde(default)]
    pub minutes_after: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSettings {
    /// With grading enabled, treat an exposure plan as complete once this
    /// percentage of desired frames has been acquired.
    #[serde(default)]
    pub exposure_throttle_percent: Option<f64>,
    #[serde(default = "default_sampling_interval_secs")]
    pub sampling_interval_secs: u32,
    /// Coarser future probing for plan previews.
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub park_on_wait: bool,
}

fn default_sampling_interval_secs() -> u32 {
    60
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            exposure_throttle_percent: None,
            sampling_interval_secs: default_sampling_interval_secs(),
            preview: false,
            park_on_wait: false,
        }
    }
}

impl PlannerConfig {
    /// Configuration for a profile with default preferences and no flip pause.
    pub fn for_profile(profile_id: &str) -> Self {
        Self {
            profile: ProfileSettings {
                id: profile_id.to_string(),
                latitude: 0.0,
                longitude: 0.0,
                elevation_m: 0.0,
            },
            meridian_flip: MeridianFlipSettings::default(),
            preferences: PreferenceSettings::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load planner configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(PlannerConfig)` if successful
    /// * `Err(ConfigError)` if the file cannot be read, parsed or validated
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load planner configuration from the default location.
    ///
    /// Searches for `planner.toml` in:
    /// 1. Current directory
    /// 2. `rust_backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("planner.toml"),
            PathBuf::from("rust_backend/planner.toml"),
            PathBuf::from("../planner.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ConfigError::NotFound)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profile.id.trim().is_empty() {
            return Err(ConfigError::Invalid("'profile.id' must not be empty".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.profile.latitude) {
            return Err(ConfigError::Invalid(format!(
                "'profile.latitude' {} is outside -90..90",
                self.profile.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.profile.longitude) {
            return Err(ConfigError::Invalid(format!(
                "'profile.longitude' {} is outside -180..180",
                self.profile.longitude
            )));
        }
        if self.meridian_flip.pause_before_minutes < 0.0 || self.meridian_flip.minutes_after < 0.0 {
            return Err(ConfigError::Invalid(
                "meridian flip minutes must not be negative".to_string(),
            ));
        }
        if self.preferences.sampling_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "'preferences.sampling_interval_secs' must be positive".to_string(),
            ));
        }
        if let Some(throttle) = self.preferences.exposure_throttle_percent {
            if throttle <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "'preferences.exposure_throttle_percent' {} must be positive",
                    throttle
                )));
            }
        }
        Ok(())
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::seconds(self.preferences.sampling_interval_secs as i64)
    }
}
