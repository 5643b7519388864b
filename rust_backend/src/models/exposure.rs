use qtty::{Degrees, Seconds};
use serde::{Deserialize, Serialize};

use super::rejection::ExposureReason;
use super::twilight::TwilightLevel;

crate::define_id_type!(
    /// Identifier of an exposure plan within the data store.
    i64,
    ExposurePlanId
);

/// Moon avoidance parameters of one exposure plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonAvoidanceSettings {
    pub enabled: bool,
    /// Separation required at full moon.
    pub separation: Degrees,
    /// Lorentzian width in days around full moon.
    pub width: f64,
    /// Degrees of separation relaxed per degree of moon altitude below
    /// `relax_max_altitude`; zero disables relaxation.
    #[serde(default)]
    pub relax_scale: f64,
    #[serde(default = "default_relax_max_altitude")]
    pub relax_max_altitude: Degrees,
    #[serde(default = "default_relax_min_altitude")]
    pub relax_min_altitude: Degrees,
    /// Only image while the moon is below `relax_min_altitude`.
    #[serde(default)]
    pub moon_must_be_down: bool,
}

fn default_relax_max_altitude() -> Degrees {
    Degrees::new(5.0)
}

fn default_relax_min_altitude() -> Degrees {
    Degrees::new(-15.0)
}

impl Default for MoonAvoidanceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            separation: Degrees::new(60.0),
            width: 7.0,
            relax_scale: 0.0,
            relax_max_altitude: default_relax_max_altitude(),
            relax_min_altitude: default_relax_min_altitude(),
            moon_must_be_down: false,
        }
    }
}

/// One filter/cadence unit of a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposurePlan {
    pub id: ExposurePlanId,
    pub filter_name: String,
    pub exposure_length: Seconds,
    pub desired: u32,
    #[serde(default)]
    pub acquired: u32,
    #[serde(default)]
    pub accepted: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub twilight_level: TwilightLevel,
    #[serde(default)]
    pub moon_avoidance: MoonAvoidanceSettings,
    #[serde(default)]
    pub maximum_humidity: Option<f64>,
    /// Overrides the project's dither-every count for this filter.
    #[serde(default)]
    pub dither_every: Option<u32>,
    #[serde(skip)]
    rejection: Option<ExposureReason>,
}

fn enabled_by_default() -> bool {
    true
}

impl ExposurePlan {
    pub fn new(id: i64, filter_name: &str, exposure_length_secs: f64, desired: u32) -> Self {
        Self {
            id: ExposurePlanId(id),
            filter_name: filter_name.to_string(),
            exposure_length: Seconds::new(exposure_length_secs),
            desired,
            acquired: 0,
            accepted: 0,
            enabled: true,
            twilight_level: TwilightLevel::default(),
            moon_avoidance: MoonAvoidanceSettings::default(),
            maximum_humidity: None,
            dither_every: None,
            rejection: None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn rejection(&self) -> Option<ExposureReason> {
        self.rejection
    }

    pub fn reject(&mut self, reason: ExposureReason) {
        self.rejection = Some(reason);
    }

    pub fn clear_rejection(&mut self) {
        self.rejection = None;
    }

    /// Copy completion counts from a freshly reloaded plan.
    pub fn refresh_counts(&mut self, reloaded: &ExposurePlan) {
        self.desired = reloaded.desired;
        self.acquired = reloaded.acquired;
        self.accepted = reloaded.accepted;
        self.enabled = reloaded.enabled;
    }
}
