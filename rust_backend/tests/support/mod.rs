//! Shared fixtures for planner integration tests.
#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use target_scheduler::config::PlannerConfig;
use target_scheduler::models::{
    Coordinates, ExposurePlan, ExposureReason, Project, ProjectPolicy, ProjectReason, Target, TargetId,
    TargetReason, TwilightLevel,
};
use target_scheduler::oracles::tabulated::TargetTrack;
use target_scheduler::oracles::TabulatedSky;
use target_scheduler::scoring::{ScoringContext, ScoringEngine};

pub const PROFILE: &str = "observatory";

/// Planning instant used by most tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 22, 0, 0).unwrap()
}

pub fn minutes(m: i64) -> Duration {
    Duration::minutes(m)
}

pub fn hours(h: i64) -> Duration {
    Duration::hours(h)
}

pub fn config() -> PlannerConfig {
    PlannerConfig::for_profile(PROFILE)
}

/// Full night from three hours before `t0` to seven hours after, with civil
/// twilight an hour wider on each side.
pub fn night_sky() -> TabulatedSky {
    TabulatedSky::new()
        .with_twilight(TwilightLevel::Civil, t0() - hours(4), t0() + hours(8))
        .with_twilight(TwilightLevel::Night, t0() - hours(3), t0() + hours(7))
}

/// Track rising at `t0 + rise`, transiting at `t0 + transit` and setting at
/// `t0 + set`.
pub fn track(target_id: i64, rise: Duration, transit: Duration, set: Duration, peak: f64) -> TargetTrack {
    TargetTrack::new(target_id, t0() + rise, t0() + transit, t0() + set, peak)
}

/// Track already up at `t0` and staying up for hours.
pub fn visible_track(target_id: i64) -> TargetTrack {
    track(target_id, -hours(2), hours(2), hours(5), 70.0)
}

pub fn plans(first_id: i64, filters: &[&str], exposure_secs: f64, desired: u32) -> Vec<ExposurePlan> {
    filters
        .iter()
        .enumerate()
        .map(|(i, f)| ExposurePlan::new(first_id + i as i64, f, exposure_secs, desired))
        .collect()
}

pub fn target(id: i64, plans: Vec<ExposurePlan>) -> Target {
    Target::new(id, &format!("Target {}", id), Coordinates::new(15.0 * id as f64, 35.0), plans)
}

pub fn project(id: i64, policy: ProjectPolicy, targets: Vec<Target>) -> Project {
    Project::new(id, &format!("Project {}", id), policy, targets)
}

/// Scoring engine returning a fixed score per target id.
pub struct FixedScores(pub HashMap<TargetId, f64>);

impl FixedScores {
    pub fn new(scores: &[(i64, f64)]) -> Self {
        Self(scores.iter().map(|(id, s)| (TargetId(*id), *s)).collect())
    }
}

impl ScoringEngine for FixedScores {
    fn score_target(&self, context: &ScoringContext<'_>) -> f64 {
        self.0.get(&context.target.id).copied().unwrap_or(0.0)
    }
}

/// Every rejection in the tree, for before/after comparisons.
pub type RejectionSnapshot = Vec<(
    Option<ProjectReason>,
    Vec<(Option<TargetReason>, Vec<Option<ExposureReason>>)>,
)>;

pub fn snapshot(projects: &[Project]) -> RejectionSnapshot {
    projects
        .iter()
        .map(|p| {
            (
                p.rejection(),
                p.targets
                    .iter()
                    .map(|t| (t.rejection(), t.exposure_plans.iter().map(|e| e.rejection()).collect()))
                    .collect(),
            )
        })
        .collect()
}
