//! Per-target imaging checks.
//!
//! [`TargetImagingExpert`] applies the visibility, altitude, meridian,
//! twilight and moon checks to a single target and records the outcome as
//! rejections on the target and its exposure plans. It holds only read-only
//! settings and collaborator references; all state lives on the target.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use super::meridian::MeridianFlipClipper;
use crate::config::PlannerConfig;
use crate::models::{ExposureReason, ProjectPolicy, Target, TargetReason, TimeInterval, TwilightLevel};
use crate::oracles::{MoonAvoidanceOracle, OracleResult, TwilightOracle, VisibilityOracle};

/// Probe step multiplier when previewing a plan.
pub const PREVIEW_STEP_FACTOR: i32 = 3;

/// Longest look-ahead of a future probe.
const MAX_PROBE_HOURS: i64 = 24;

/// Profile settings the expert needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagingSettings {
    pub sampling_interval: Duration,
    pub preview: bool,
    pub flip_pause_minutes: f64,
    pub flip_minutes_after: f64,
}

impl From<&PlannerConfig> for ImagingSettings {
    fn from(config: &PlannerConfig) -> Self {
        Self {
            sampling_interval: config.sampling_interval(),
            preview: config.preferences.preview,
            flip_pause_minutes: config.meridian_flip.pause_before_minutes,
            flip_minutes_after: config.meridian_flip.minutes_after,
        }
    }
}

#[derive(Clone, Copy)]
pub struct TargetImagingExpert<'a> {
    settings: ImagingSettings,
    visibility: &'a dyn VisibilityOracle,
    twilight: &'a dyn TwilightOracle,
    moon: &'a dyn MoonAvoidanceOracle,
}

impl<'a> TargetImagingExpert<'a> {
    pub fn new(
        settings: ImagingSettings,
        visibility: &'a dyn VisibilityOracle,
        twilight: &'a dyn TwilightOracle,
        moon: &'a dyn MoonAvoidanceOracle,
    ) -> Self {
        Self {
            settings,
            visibility,
            twilight,
            moon,
        }
    }

    pub fn settings(&self) -> &ImagingSettings {
        &self.settings
    }

    /// Current sky level as reported by the twilight collaborator.
    pub fn current_twilight(&self, at: DateTime<Utc>) -> OracleResult<Option<TwilightLevel>> {
        self.twilight.twilight_level(at)
    }

    // ==================== Visibility ====================

    /// Determine whether, and from when, the target can be imaged for at
    /// least the project's minimum time.
    ///
    /// On success the target's window fields are set with `start_time = at`.
    /// A target that only becomes visible later is rejected but keeps its
    /// future `start_time`/`end_time` so a later probe can find it.
    pub fn visibility(&self, at: DateTime<Utc>, policy: &ProjectPolicy, target: &mut Target) -> OracleResult<()> {
        target.clear_window();
        let horizon = policy.horizon();

        if self.visibility.never_rises(target, &horizon)? {
            reject(target, at, TargetReason::NeverRises);
            return Ok(());
        }

        // The brightest sky any remaining exposure tolerates.
        let level = target
            .incomplete_exposures()
            .map(|e| e.twilight_level)
            .max()
            .unwrap_or_default();
        let span = match self.twilight.twilight_span(at, level)? {
            Some(span) => span,
            None => {
                reject(target, at, TargetReason::NotVisible);
                return Ok(());
            }
        };

        let minimum = policy.minimum_time_span();
        let visible = match self
            .visibility
            .next_visible_interval(at, target, &span, &horizon, minimum)?
        {
            Some(visible) => visible,
            None => {
                reject(target, at, TargetReason::NotVisible);
                return Ok(());
            }
        };

        let transit = self.visibility.transit_time(at, target)?;
        let mut window = visible;
        let mut future_reason = TargetReason::NotYetVisible;

        if policy.meridian_window > 0 {
            if let Some(transit) = transit {
                let half = Duration::minutes(policy.meridian_window as i64);
                let meridian = TimeInterval::new(transit - half, transit + half);
                match window.intersection(&meridian) {
                    Some(clipped) if clipped.duration() >= minimum => {
                        if clipped.start() > window.start() {
                            future_reason = TargetReason::BeforeMeridianWindow;
                        }
                        window = clipped;
                    }
                    _ => {
                        reject(target, at, TargetReason::MeridianWindowClipped);
                        return Ok(());
                    }
                }
            }
        }

        if self.settings.flip_pause_minutes > 0.0 {
            let clipper = MeridianFlipClipper::new(
                transit,
                self.settings.flip_pause_minutes,
                self.settings.flip_minutes_after,
            );
            let clipped = clipper.clip(window).filter(|c| c.duration() >= minimum);
            let resumed = clipper
                .safe_after_time()
                .filter(|safe| *safe > window.start())
                .map(|safe| TimeInterval::new(safe, window.end()))
                .filter(|r| r.duration() >= minimum);

            match (clipped, resumed) {
                (Some(clipped), _) => {
                    if clipped.start() > window.start() {
                        future_reason = TargetReason::MeridianFlipClipped;
                    }
                    window = clipped;
                }
                (None, Some(resumed)) => {
                    // Not enough time before the flip; try again after it.
                    future_reason = TargetReason::MeridianFlipClipped;
                    window = resumed;
                }
                (None, None) => {
                    reject(target, at, TargetReason::MeridianFlipClipped);
                    return Ok(());
                }
            }
        }

        target.culmination_time = transit;
        if window.start() > at {
            target.start_time = Some(window.start());
            target.end_time = Some(window.end());
            reject(target, at, future_reason);
            return Ok(());
        }

        let minimum_end = at + minimum;
        target.start_time = Some(at);
        target.end_time = Some(window.end());
        target.minimum_time_span_end = Some(minimum_end);
        target.bonus_time_span_end = Some(minimum_end);
        Ok(())
    }

    /// Reject the target when it is above the project's altitude ceiling.
    pub fn check_maximum_altitude(
        &self,
        at: DateTime<Utc>,
        policy: &ProjectPolicy,
        target: &mut Target,
    ) -> OracleResult<()> {
        if target.is_rejected() || !policy.has_maximum_altitude() {
            return Ok(());
        }
        let altitude = self.visibility.altitude(at, target)?;
        if altitude.value() > policy.maximum_altitude.value() {
            reject(target, at, TargetReason::MaxAltitude);
        }
        Ok(())
    }

    // ==================== Exposure filters ====================

    /// Reject incomplete exposure plans the current sky is too bright for.
    pub fn twilight_filter(&self, target: &mut Target, current: Option<TwilightLevel>) {
        for idx in target.incomplete_indices().to_vec() {
            let plan = &mut target.exposure_plans[idx];
            if !plan.is_rejected() && !plan.twilight_level.permits(current) {
                plan.reject(ExposureReason::Twilight);
            }
        }
    }

    /// Reject incomplete exposure plans that are too close to the moon.
    pub fn moon_avoidance_filter(&self, at: DateTime<Utc>, target: &mut Target) -> OracleResult<()> {
        for idx in target.incomplete_indices().to_vec() {
            if target.exposure_plans[idx].is_rejected() {
                continue;
            }
            if self.moon.is_rejected(at, target, &target.exposure_plans[idx])? {
                target.exposure_plans[idx].reject(ExposureReason::MoonAvoidance);
            }
        }
        Ok(())
    }

    // ==================== Readiness ====================

    /// Whether the target can start now, allowing for polling granularity.
    pub fn ready_now(&self, at: DateTime<Utc>, target: &Target) -> bool {
        if target.is_rejected() {
            return false;
        }
        match target.start_time {
            Some(start) => {
                let offset = if at >= start { at - start } else { start - at };
                offset <= self.settings.sampling_interval * 2
            }
            None => false,
        }
    }

    /// Step used when probing the future.
    pub fn probe_step(&self) -> Duration {
        if self.settings.preview {
            self.settings.sampling_interval * PREVIEW_STEP_FACTOR
        } else {
            self.settings.sampling_interval
        }
    }

    /// Search forward from `at` for the first instant the target could be
    /// imaged. The caller clears the target's rejections beforehand.
    ///
    /// # Returns
    /// `true` with the target accepted and its window starting at the found
    /// instant, or `false` (target rejected) when nothing is left tonight.
    /// A non-positive probe step only follows visibility start times.
    pub fn check_future(&self, at: DateTime<Utc>, policy: &ProjectPolicy, target: &mut Target) -> OracleResult<bool> {
        let step = self.probe_step();
        let can_step = step > Duration::zero();
        let limit = at + Duration::hours(MAX_PROBE_HOURS);
        let mut probe = target.start_time.filter(|start| *start > at).unwrap_or(at);

        while probe <= limit {
            target.clear_rejection();
            target.clear_exposure_rejections();

            self.visibility(probe, policy, target)?;
            if let Some(reason) = target.rejection() {
                if !reason.may_become_visible() {
                    return Ok(false);
                }
                probe = match target.start_time {
                    Some(start) if start > probe => start,
                    _ if can_step => probe + step,
                    _ => break,
                };
                continue;
            }

            self.check_maximum_altitude(probe, policy, target)?;
            if !target.is_rejected() {
                self.moon_avoidance_filter(probe, target)?;
                let current = self.twilight.twilight_level(probe)?;
                self.twilight_filter(target, current);
                target.propagate_rejection();
            }

            if !target.is_rejected() {
                debug!("Imaging: '{}' can start at {}", target.name, probe);
                return Ok(true);
            }
            if !can_step {
                debug!("Imaging: probe step is {}, not searching past {} for '{}'", step, probe, target.name);
                break;
            }
            probe = probe + step;
        }

        Ok(false)
    }
}

fn reject(target: &mut Target, at: DateTime<Utc>, reason: TargetReason) {
    debug!("Imaging: rejecting '{}' at {}: {}", target.name, at, reason);
    target.reject(reason);
}
