//! Sky collaborators consumed by the planner.
//!
//! The planner never computes positions itself. Altitudes, visibility
//! windows, twilight and the moon come from implementations of the traits
//! below; [`tabulated::TabulatedSky`] answers them from explicit tables and
//! [`moon::LorentzianMoonAvoidance`] turns a moon ephemeris into per-exposure
//! avoidance decisions.

pub mod moon;
pub mod tabulated;

use chrono::{DateTime, Duration, Utc};
use qtty::Degrees;

use crate::models::{ExposurePlan, HorizonDefinition, Target, TimeInterval, TwilightLevel};

pub use moon::LorentzianMoonAvoidance;
pub use tabulated::TabulatedSky;

/// Result type for oracle queries
pub type OracleResult<T> = Result<T, OracleError>;

/// Failure of a sky collaborator
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Ephemeris unavailable: {0}")]
    EphemerisUnavailable(String),

    #[error("Computation failed: {0}")]
    ComputationFailed(String),
}

/// Target positions and visibility windows.
pub trait VisibilityOracle {
    /// True when the target never clears the horizon from this site.
    fn never_rises(&self, target: &Target, horizon: &HorizonDefinition) -> OracleResult<bool>;

    /// The next interval, starting no earlier than `at` and inside
    /// `twilight_span`, during which the target stays above `horizon` for at
    /// least `minimum`. `None` when no such interval exists tonight.
    fn next_visible_interval(
        &self,
        at: DateTime<Utc>,
        target: &Target,
        twilight_span: &TimeInterval,
        horizon: &HorizonDefinition,
        minimum: Duration,
    ) -> OracleResult<Option<TimeInterval>>;

    fn altitude(&self, at: DateTime<Utc>, target: &Target) -> OracleResult<Degrees>;

    /// Meridian transit nearest to `at`, `None` when it cannot be determined.
    fn transit_time(&self, at: DateTime<Utc>, target: &Target) -> OracleResult<Option<DateTime<Utc>>>;
}

/// Site-level twilight.
pub trait TwilightOracle {
    /// Tonight's span during which the sky is no brighter than `level`.
    /// `None` when the sky never gets that dark (high-latitude summer).
    fn twilight_span(&self, at: DateTime<Utc>, level: TwilightLevel) -> OracleResult<Option<TimeInterval>>;

    /// Current sky level, `None` in daylight.
    fn twilight_level(&self, at: DateTime<Utc>) -> OracleResult<Option<TwilightLevel>>;
}

/// Per-exposure lunar interference decisions.
pub trait MoonAvoidanceOracle {
    fn is_rejected(&self, at: DateTime<Utc>, target: &Target, exposure: &ExposurePlan) -> OracleResult<bool>;

    /// Continuous margin in degrees (positive = clear of the moon), used for
    /// diagnostics.
    fn avoidance_score(&self, at: DateTime<Utc>, target: &Target, exposure: &ExposurePlan) -> OracleResult<f64>;
}

/// Raw moon data needed by [`LorentzianMoonAvoidance`].
pub trait MoonEphemeris {
    fn moon_altitude(&self, at: DateTime<Utc>) -> OracleResult<Degrees>;

    /// Days since new moon.
    fn moon_age_days(&self, at: DateTime<Utc>) -> OracleResult<f64>;

    fn moon_separation(&self, at: DateTime<Utc>, target: &Target) -> OracleResult<Degrees>;
}
