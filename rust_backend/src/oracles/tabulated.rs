//! Sky oracle backed by explicit tables.
//!
//! Each target is described by its rise, transit and set times and its peak
//! altitude; between those points the altitude follows a triangular profile
//! (linear climb to transit, linear descent after). Twilight is a set of
//! nested windows, one per level, and the moon is a single track with a
//! constant age. This is enough to drive the planner deterministically in
//! tests, benchmarks and night simulations without an ephemeris library.

use chrono::{DateTime, Duration, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};

use super::{MoonEphemeris, OracleError, OracleResult, TwilightOracle, VisibilityOracle};
use crate::models::{HorizonDefinition, Target, TargetId, TimeInterval, TwilightLevel};

/// Altitude reported for the moon outside its rise/set window.
pub const MOON_DOWN_ALTITUDE: f64 = -30.0;

const EAST: f64 = 90.0;
const WEST: f64 = 270.0;

/// Altitude track of one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetTrack {
    pub target_id: TargetId,
    /// Missing rise/set/transit means the target stays at its peak altitude
    /// all night.
    #[serde(default)]
    pub rise: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transit: Option<DateTime<Utc>>,
    #[serde(default)]
    pub set: Option<DateTime<Utc>>,
    pub peak_altitude: Degrees,
    #[serde(default = "far_from_moon")]
    pub moon_separation: Degrees,
}

fn far_from_moon() -> Degrees {
    Degrees::new(180.0)
}

impl TargetTrack {
    pub fn new(
        target_id: i64,
        rise: DateTime<Utc>,
        transit: DateTime<Utc>,
        set: DateTime<Utc>,
        peak_altitude: f64,
    ) -> Self {
        Self {
            target_id: TargetId(target_id),
            rise: Some(rise),
            transit: Some(transit),
            set: Some(set),
            peak_altitude: Degrees::new(peak_altitude),
            moon_separation: far_from_moon(),
        }
    }

    pub fn with_moon_separation(mut self, degrees: f64) -> Self {
        self.moon_separation = Degrees::new(degrees);
        self
    }

    fn profile(&self) -> Option<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
        match (self.rise, self.transit, self.set) {
            (Some(rise), Some(transit), Some(set)) if rise < transit && transit < set => {
                Some((rise, transit, set))
            }
            _ => None,
        }
    }

    fn altitude_at(&self, at: DateTime<Utc>) -> f64 {
        let peak = self.peak_altitude.value();
        let (rise, transit, set) = match self.profile() {
            Some(profile) => profile,
            None => return peak,
        };
        let fraction = if at <= transit {
            secs(transit - at) / secs(transit - rise)
        } else {
            secs(at - transit) / secs(set - transit)
        };
        peak * (1.0 - fraction)
    }

    /// Span during which the altitude stays at or above the given horizon
    /// altitudes (east before transit, west after). `(None, None)` means the
    /// whole night.
    fn above(&self, east: f64, west: f64) -> Option<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let peak = self.peak_altitude.value();
        let (rise, transit, set) = match self.profile() {
            Some(profile) => profile,
            None => return (peak > east.max(west)).then_some((None, None)),
        };
        if peak <= east && peak <= west {
            return None;
        }

        let first = if peak > east {
            transit - scale(transit - rise, 1.0 - east / peak)
        } else {
            transit
        };
        let last = if peak > west {
            transit + scale(set - transit, 1.0 - west / peak)
        } else {
            transit
        };
        Some((Some(first), Some(last)))
    }
}

fn secs(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::milliseconds((duration.num_milliseconds() as f64 * factor).round() as i64)
}

/// Window during which the sky is no brighter than `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwilightWindow {
    pub level: TwilightLevel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoonTrack {
    pub age_days: f64,
    /// Altitude while the moon is up.
    pub altitude: Degrees,
    #[serde(default)]
    pub rise: Option<DateTime<Utc>>,
    #[serde(default)]
    pub set: Option<DateTime<Utc>>,
}

impl Default for MoonTrack {
    fn default() -> Self {
        Self {
            age_days: 0.0,
            altitude: Degrees::new(MOON_DOWN_ALTITUDE),
            rise: None,
            set: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabulatedSky {
    #[serde(default)]
    pub twilight: Vec<TwilightWindow>,
    #[serde(default)]
    pub targets: Vec<TargetTrack>,
    #[serde(default)]
    pub moon: MoonTrack,
}

impl TabulatedSky {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_twilight(mut self, level: TwilightLevel, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.twilight.retain(|w| w.level != level);
        self.twilight.push(TwilightWindow { level, start, end });
        self
    }

    pub fn with_target(mut self, track: TargetTrack) -> Self {
        self.targets.retain(|t| t.target_id != track.target_id);
        self.targets.push(track);
        self
    }

    pub fn with_moon(mut self, moon: MoonTrack) -> Self {
        self.moon = moon;
        self
    }

    /// Earliest start and latest end over all twilight windows.
    pub fn night(&self) -> Option<TimeInterval> {
        let start = self.twilight.iter().map(|w| w.start).min()?;
        let end = self.twilight.iter().map(|w| w.end).max()?;
        Some(TimeInterval::new(start, end))
    }

    fn track(&self, target: &Target) -> OracleResult<&TargetTrack> {
        self.targets
            .iter()
            .find(|t| t.target_id == target.id)
            .ok_or_else(|| {
                OracleError::EphemerisUnavailable(format!("No track for target {} ({})", target.id, target.name))
            })
    }
}

impl VisibilityOracle for TabulatedSky {
    fn never_rises(&self, target: &Target, horizon: &HorizonDefinition) -> OracleResult<bool> {
        let track = self.track(target)?;
        Ok(track.peak_altitude.value() <= horizon.minimum_altitude.value())
    }

    fn next_visible_interval(
        &self,
        at: DateTime<Utc>,
        target: &Target,
        twilight_span: &TimeInterval,
        horizon: &HorizonDefinition,
        minimum: Duration,
    ) -> OracleResult<Option<TimeInterval>> {
        let track = self.track(target)?;
        let east = horizon.altitude_at(Degrees::new(EAST)).value();
        let west = horizon.altitude_at(Degrees::new(WEST)).value();

        let (rise, set) = match track.above(east, west) {
            Some(bounds) => bounds,
            None => return Ok(None),
        };

        let start = rise
            .map_or(twilight_span.start(), |r| r.max(twilight_span.start()))
            .max(at);
        let end = set.map_or(twilight_span.end(), |s| s.min(twilight_span.end()));
        let interval = TimeInterval::new(start, end);

        Ok((interval.duration() >= minimum && interval.duration() > Duration::zero()).then_some(interval))
    }

    fn altitude(&self, at: DateTime<Utc>, target: &Target) -> OracleResult<Degrees> {
        Ok(Degrees::new(self.track(target)?.altitude_at(at)))
    }

    fn transit_time(&self, _at: DateTime<Utc>, target: &Target) -> OracleResult<Option<DateTime<Utc>>> {
        Ok(self.track(target)?.transit)
    }
}

impl TwilightOracle for TabulatedSky {
    fn twilight_span(&self, _at: DateTime<Utc>, level: TwilightLevel) -> OracleResult<Option<TimeInterval>> {
        Ok(self
            .twilight
            .iter()
            .find(|w| w.level == level)
            .map(|w| TimeInterval::new(w.start, w.end)))
    }

    fn twilight_level(&self, at: DateTime<Utc>) -> OracleResult<Option<TwilightLevel>> {
        Ok(self
            .twilight
            .iter()
            .filter(|w| TimeInterval::new(w.start, w.end).contains(at))
            .map(|w| w.level)
            .min())
    }
}

impl MoonEphemeris for TabulatedSky {
    fn moon_altitude(&self, at: DateTime<Utc>) -> OracleResult<Degrees> {
        let up = self.moon.rise.map_or(true, |r| at >= r) && self.moon.set.map_or(true, |s| at < s);
        Ok(if up {
            self.moon.altitude
        } else {
            Degrees::new(MOON_DOWN_ALTITUDE)
        })
    }

    fn moon_age_days(&self, _at: DateTime<Utc>) -> OracleResult<f64> {
        Ok(self.moon.age_days)
    }

    fn moon_separation(&self, _at: DateTime<Utc>, target: &Target) -> OracleResult<Degrees> {
        Ok(self.track(target)?.moon_separation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, HorizonPoint};
    use chrono::TimeZone;

    fn dusk() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 5, 19, 0, 0).unwrap()
    }

    fn hours(h: i64) -> Duration {
        Duration::hours(h)
    }

    fn sky() -> TabulatedSky {
        TabulatedSky::new()
            .with_twilight(TwilightLevel::Civil, dusk() - Duration::minutes(90), dusk() + hours(11))
            .with_twilight(TwilightLevel::Night, dusk(), dusk() + hours(9))
            .with_target(TargetTrack::new(7, dusk() - hours(2), dusk() + hours(2), dusk() + hours(6), 60.0))
    }

    fn target() -> Target {
        Target::new(7, "M31", Coordinates::new(10.68, 41.27), Vec::new())
    }

    #[test]
    fn test_triangular_altitude() {
        let sky = sky();
        let t = target();
        assert_eq!(sky.altitude(dusk() + hours(2), &t).unwrap().value(), 60.0);
        assert!((sky.altitude(dusk(), &t).unwrap().value() - 30.0).abs() < 1e-9);
        assert!((sky.altitude(dusk() + hours(4), &t).unwrap().value() - 30.0).abs() < 1e-9);
        assert!(sky.altitude(dusk() + hours(7), &t).unwrap().value() < 0.0);
    }

    #[test]
    fn test_visible_interval_respects_horizon_and_twilight() {
        let sky = sky();
        let span = sky.twilight_span(dusk(), TwilightLevel::Night).unwrap().unwrap();
        let horizon = HorizonDefinition::flat(Degrees::new(30.0));
        let interval = sky
            .next_visible_interval(dusk() - hours(1), &target(), &span, &horizon, Duration::minutes(30))
            .unwrap()
            .unwrap();
        assert_eq!(interval.start(), dusk());
        assert_eq!(interval.end(), dusk() + hours(4));
    }

    #[test]
    fn test_visible_interval_starts_no_earlier_than_now() {
        let sky = sky();
        let span = sky.twilight_span(dusk(), TwilightLevel::Night).unwrap().unwrap();
        let now = dusk() + hours(1);
        let interval = sky
            .next_visible_interval(now, &target(), &span, &HorizonDefinition::default(), Duration::minutes(30))
            .unwrap()
            .unwrap();
        assert_eq!(interval.start(), now);
        assert_eq!(interval.end(), dusk() + hours(6));
    }

    #[test]
    fn test_too_short_interval_is_none() {
        let sky = sky();
        let span = sky.twilight_span(dusk(), TwilightLevel::Night).unwrap().unwrap();
        let now = dusk() + Duration::minutes(350);
        let result = sky
            .next_visible_interval(now, &target(), &span, &HorizonDefinition::default(), Duration::minutes(30))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_custom_horizon_sides() {
        let sky = sky();
        let span = sky.twilight_span(dusk(), TwilightLevel::Civil).unwrap().unwrap();
        let horizon = HorizonDefinition::with_custom(
            Degrees::new(0.0),
            vec![
                HorizonPoint { azimuth: Degrees::new(90.0), altitude: Degrees::new(0.0) },
                HorizonPoint { azimuth: Degrees::new(270.0), altitude: Degrees::new(30.0) },
            ],
            Degrees::new(0.0),
        );
        let interval = sky
            .next_visible_interval(dusk() - hours(3), &target(), &span, &horizon, Duration::minutes(30))
            .unwrap()
            .unwrap();
        // Rises above the low eastern horizon before civil dusk.
        assert_eq!(interval.start(), dusk() - Duration::minutes(90));
        assert_eq!(interval.end(), dusk() + hours(4));
    }

    #[test]
    fn test_never_rises_and_missing_track() {
        let sky = sky();
        assert!(!sky.never_rises(&target(), &HorizonDefinition::default()).unwrap());
        assert!(sky.never_rises(&target(), &HorizonDefinition::flat(Degrees::new(70.0))).unwrap());

        let unknown = Target::new(99, "Nowhere", Coordinates::new(0.0, -89.0), Vec::new());
        assert!(matches!(
            sky.altitude(dusk(), &unknown),
            Err(OracleError::EphemerisUnavailable(_))
        ));
    }

    #[test]
    fn test_twilight_level_is_darkest_window() {
        let sky = sky();
        assert_eq!(sky.twilight_level(dusk() + hours(1)).unwrap(), Some(TwilightLevel::Night));
        assert_eq!(
            sky.twilight_level(dusk() - Duration::minutes(30)).unwrap(),
            Some(TwilightLevel::Civil)
        );
        assert_eq!(sky.twilight_level(dusk() - hours(3)).unwrap(), None);
    }

    #[test]
    fn test_moon_track() {
        let sky = sky().with_moon(MoonTrack {
            age_days: 12.0,
            altitude: Degrees::new(35.0),
            rise: Some(dusk() + hours(3)),
            set: None,
        });
        assert_eq!(sky.moon_altitude(dusk()).unwrap().value(), MOON_DOWN_ALTITUDE);
        assert_eq!(sky.moon_altitude(dusk() + hours(4)).unwrap().value(), 35.0);
        assert_eq!(sky.moon_age_days(dusk()).unwrap(), 12.0);
        assert_eq!(sky.moon_separation(dusk(), &target()).unwrap().value(), 180.0);
    }
}
