//! Lorentzian moon avoidance.
//!
//! The separation an exposure requires from the moon peaks at full moon and
//! falls off with a Lorentzian profile of the configured width (in days):
//!
//! ```text
//! required = separation / (1 + ((0.5 - age / 29.5) / (width / 29.5))^2)
//! ```
//!
//! When the moon is low the requirement can be relaxed linearly with its
//! altitude, and once it is below the relax minimum it is ignored entirely.

use chrono::{DateTime, Utc};
use qtty::Degrees;

use super::{MoonAvoidanceOracle, MoonEphemeris, OracleResult};
use crate::models::{ExposurePlan, MoonAvoidanceSettings, Target};

/// Mean synodic month, in days.
pub const SYNODIC_MONTH_DAYS: f64 = 29.5;

impl<E: MoonEphemeris + ?Sized> MoonEphemeris for &E {
    fn moon_altitude(&self, at: DateTime<Utc>) -> OracleResult<Degrees> {
        (**self).moon_altitude(at)
    }

    fn moon_age_days(&self, at: DateTime<Utc>) -> OracleResult<f64> {
        (**self).moon_age_days(at)
    }

    fn moon_separation(&self, at: DateTime<Utc>, target: &Target) -> OracleResult<Degrees> {
        (**self).moon_separation(at, target)
    }
}

/// Separation required at a given moon age, before altitude relaxation.
pub fn lorentzian_separation(settings: &MoonAvoidanceSettings, moon_age_days: f64) -> f64 {
    let width = settings.width / SYNODIC_MONTH_DAYS;
    if width <= 0.0 {
        return settings.separation.value();
    }
    let phase = (0.5 - moon_age_days / SYNODIC_MONTH_DAYS) / width;
    settings.separation.value() / (1.0 + phase * phase)
}

/// Required separation once the moon's altitude is taken into account.
pub fn relaxed_separation(settings: &MoonAvoidanceSettings, moon_age_days: f64, moon_altitude: Degrees) -> f64 {
    let required = lorentzian_separation(settings, moon_age_days);
    let altitude = moon_altitude.value();
    let relax_max = settings.relax_max_altitude.value();
    if settings.relax_scale > 0.0 && altitude < relax_max {
        (required + settings.relax_scale * (altitude - relax_max)).max(0.0)
    } else {
        required
    }
}

#[derive(Debug, Clone)]
pub struct LorentzianMoonAvoidance<E: MoonEphemeris> {
    ephemeris: E,
}

impl<E: MoonEphemeris> LorentzianMoonAvoidance<E> {
    pub fn new(ephemeris: E) -> Self {
        Self { ephemeris }
    }
}

impl<E: MoonEphemeris> MoonAvoidanceOracle for LorentzianMoonAvoidance<E> {
    fn is_rejected(&self, at: DateTime<Utc>, target: &Target, exposure: &ExposurePlan) -> OracleResult<bool> {
        let settings = &exposure.moon_avoidance;
        if !settings.enabled {
            return Ok(false);
        }

        let altitude = self.ephemeris.moon_altitude(at)?;
        let moon_down = altitude.value() <= settings.relax_min_altitude.value();
        if moon_down && (settings.relax_scale > 0.0 || settings.moon_must_be_down) {
            return Ok(false);
        }
        if settings.moon_must_be_down {
            return Ok(true);
        }

        Ok(self.avoidance_score(at, target, exposure)? < 0.0)
    }

    fn avoidance_score(&self, at: DateTime<Utc>, target: &Target, exposure: &ExposurePlan) -> OracleResult<f64> {
        let separation = self.ephemeris.moon_separation(at, target)?.value();
        if !exposure.moon_avoidance.enabled {
            return Ok(separation);
        }
        let age = self.ephemeris.moon_age_days(at)?;
        let altitude = self.ephemeris.moon_altitude(at)?;
        Ok(separation - relaxed_separation(&exposure.moon_avoidance, age, altitude))
    }
}
