//! Top-level planning cycle.
//!
//! Each call to [`Planner::get_plan`] works on a fresh copy of the active
//! projects:
//!
//! ```text
//! previous target ──► can continue? ──yes──► imaging plan
//!                          │ no
//!                          ▼
//!   load ─► incomplete ─► visibility ─► moon ─► twilight   (propagate after each)
//!                          │
//!                          ▼
//!   ready now: 1 ─► select │ >1 ─► score │ 0 ─► earliest future start ─► wait / no plan
//! ```
//!
//! The planner owns the only state that outlives a cycle: the dither history
//! and the identity/filter of the last planned target, used to emit slew,
//! filter and dither instructions.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::completion::ExposureCompletion;
use super::dither::DitherTracker;
use super::imaging::{ImagingSettings, TargetImagingExpert};
use super::plan::{ActiveTarget, ImagingPlan, PlanInstruction, SchedulerPlan};
use super::previous_target::PreviousTargetExpert;
use crate::config::PlannerConfig;
use crate::db::repository::ProjectRepository;
use crate::error::{PlannerError, PlannerResult};
use crate::models::{seconds_to_duration, Project, ProjectPolicy, TargetId, TargetReason, TimeInterval};
use crate::oracles::{MoonAvoidanceOracle, TwilightOracle, VisibilityOracle};
use crate::scoring::{ScoringContext, ScoringEngine};
use crate::selection::ExposureSelector;

/// Position of a target inside the working tree: `(project, target)`.
pub type TargetSlot = (usize, usize);

pub struct Planner<'a> {
    config: PlannerConfig,
    repository: &'a dyn ProjectRepository,
    visibility: &'a dyn VisibilityOracle,
    twilight: &'a dyn TwilightOracle,
    moon: &'a dyn MoonAvoidanceOracle,
    scoring: &'a dyn ScoringEngine,
    dither: DitherTracker,
    last_target: Option<TargetId>,
    last_filter: Option<String>,
}

impl<'a> Planner<'a> {
    pub fn new(
        config: PlannerConfig,
        repository: &'a dyn ProjectRepository,
        visibility: &'a dyn VisibilityOracle,
        twilight: &'a dyn TwilightOracle,
        moon: &'a dyn MoonAvoidanceOracle,
        scoring: &'a dyn ScoringEngine,
    ) -> Self {
        Self {
            config,
            repository,
            visibility,
            twilight,
            moon,
            scoring,
            dither: DitherTracker::new(),
            last_target: None,
            last_filter: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Forget dither history and the last planned target, e.g. when a new
    /// imaging session starts.
    pub fn start_session(&mut self) {
        debug!("Planner: starting new session for profile '{}'", self.config.profile.id);
        self.dither.clear();
        self.last_target = None;
        self.last_filter = None;
    }

    pub fn last_target(&self) -> Option<TargetId> {
        self.last_target
    }

    fn imaging(&self) -> TargetImagingExpert<'a> {
        TargetImagingExpert::new(
            ImagingSettings::from(&self.config),
            self.visibility,
            self.twilight,
            self.moon,
        )
    }

    fn completion_for(&self, policy: &ProjectPolicy) -> ExposureCompletion {
        ExposureCompletion::new(policy.grading_enabled, self.config.preferences.exposure_throttle_percent)
    }

    // ==================== Planning cycle ====================

    /// Decide what to do at `at`.
    ///
    /// # Arguments
    /// * `at` - Planning instant
    /// * `previous` - Target returned by the last imaging plan, if it is
    ///   still running
    ///
    /// # Returns
    /// An imaging plan, a wait until the next target becomes ready, or
    /// [`SchedulerPlan::NoPlan`] when nothing is left tonight. Collaborator
    /// failures abort the cycle with [`PlannerError::PlanningFailed`].
    pub fn get_plan(&mut self, at: DateTime<Utc>, previous: Option<ActiveTarget>) -> PlannerResult<SchedulerPlan> {
        match self.plan_cycle(at, previous) {
            Ok(plan) => {
                match &plan {
                    SchedulerPlan::Imaging(imaging) => info!(
                        "Planner: {} '{}' with {} until {}{}",
                        at,
                        imaging.active.target.name,
                        imaging.filter_name().unwrap_or("?"),
                        imaging.time_interval.end(),
                        if imaging.continuation { " (continuing)" } else { "" }
                    ),
                    SchedulerPlan::Wait { until, next_target, .. } => info!(
                        "Planner: {} waiting until {} for '{}'",
                        at,
                        until,
                        next_target.as_ref().map(|t| t.target.name.as_str()).unwrap_or("?")
                    ),
                    SchedulerPlan::NoPlan => info!("Planner: {} no target available for the rest of the night", at),
                }
                Ok(plan)
            }
            Err(err) => {
                error!("Planner: planning failed at {} for profile '{}': {}", at, self.config.profile.id, err);
                Err(err)
            }
        }
    }

    fn plan_cycle(&mut self, at: DateTime<Utc>, previous: Option<ActiveTarget>) -> PlannerResult<SchedulerPlan> {
        if let Some(mut active) = previous {
            let completion = self.completion_for(&active.policy);
            let expert = PreviousTargetExpert::new(self.repository, self.imaging(), completion);
            if expert.can_continue(at, &active.policy, &mut active.target)? {
                debug!("Planner: continuing with '{}'", active.target.name);
                return self.build_plan(at, active, true);
            }
        }

        let mut projects = self.repository.load_active_projects(&self.config.profile.id)?;
        if projects.is_empty() {
            debug!("Planner: no active projects for profile '{}'", self.config.profile.id);
            return Ok(SchedulerPlan::NoPlan);
        }

        self.run_filters(at, &mut projects)?;

        let ready = self.ready_targets(at, &mut projects);
        let chosen = match ready.len() {
            0 => None,
            1 => Some(ready[0]),
            _ => Some(self.select_target_by_score(at, &mut projects, &ready)?),
        };

        if let Some((p, t)) = chosen {
            let target = projects[p].targets.swap_remove(t);
            let active = ActiveTarget::from_project(&projects[p], target);
            return self.build_plan(at, active, false);
        }

        match self.get_next_possible_target(at, &mut projects)? {
            Some((p, t)) => {
                let target = projects[p].targets.swap_remove(t);
                let until = target.start_time.unwrap_or(at);
                Ok(SchedulerPlan::Wait {
                    until,
                    next_target: Some(ActiveTarget::from_project(&projects[p], target)),
                    park: self.config.preferences.park_on_wait,
                })
            }
            None => Ok(SchedulerPlan::NoPlan),
        }
    }

    // ==================== Filter pipeline ====================

    /// Run the four rejection stages over the working tree, re-deriving
    /// target and project rejections after each stage.
    pub fn run_filters(&self, at: DateTime<Utc>, projects: &mut [Project]) -> PlannerResult<()> {
        self.filter_for_incomplete(projects);
        self.filter_for_visibility(at, projects)?;
        self.filter_for_moon_avoidance(at, projects)?;
        self.filter_for_twilight(at, projects)?;
        Ok(())
    }

    fn filter_for_incomplete(&self, projects: &mut [Project]) {
        for project in projects.iter_mut() {
            let completion = self.completion_for(&project.policy);
            for target in project.targets.iter_mut() {
                target.partition_exposures(&completion);
            }
            propagate(project);
        }
    }

    fn filter_for_visibility(&self, at: DateTime<Utc>, projects: &mut [Project]) -> PlannerResult<()> {
        let imaging = self.imaging();
        for project in projects.iter_mut() {
            let policy = &project.policy;
            for target in project.targets.iter_mut().filter(|t| !t.is_rejected()) {
                imaging.visibility(at, policy, target)?;
                imaging.check_maximum_altitude(at, policy, target)?;
            }
            propagate(project);
        }
        Ok(())
    }

    fn filter_for_moon_avoidance(&self, at: DateTime<Utc>, projects: &mut [Project]) -> PlannerResult<()> {
        let imaging = self.imaging();
        for project in projects.iter_mut() {
            for target in project.targets.iter_mut().filter(|t| !t.is_rejected()) {
                imaging.moon_avoidance_filter(at, target)?;
            }
            propagate(project);
        }
        Ok(())
    }

    fn filter_for_twilight(&self, at: DateTime<Utc>, projects: &mut [Project]) -> PlannerResult<()> {
        let imaging = self.imaging();
        let current = imaging.current_twilight(at)?;
        for project in projects.iter_mut() {
            for target in project.targets.iter_mut().filter(|t| !t.is_rejected()) {
                imaging.twilight_filter(target, current);
            }
            propagate(project);
        }
        Ok(())
    }

    // ==================== Target selection ====================

    /// Targets that can start now, each with its next exposure selected.
    fn ready_targets(&self, at: DateTime<Utc>, projects: &mut [Project]) -> Vec<TargetSlot> {
        let imaging = self.imaging();
        let mut ready = Vec::new();
        for (p, project) in projects.iter_mut().enumerate() {
            let policy = &project.policy;
            for (t, target) in project.targets.iter_mut().enumerate() {
                if !imaging.ready_now(at, target) {
                    continue;
                }
                match target.exposure_selector.select(at, policy, target) {
                    Some(selection) => {
                        target.set_selected_exposure(Some(selection.index));
                        ready.push((p, t));
                    }
                    None => {
                        warn!(
                            "Planner: {} selector found no exposure for ready target '{}'",
                            target.exposure_selector.name(),
                            target.name
                        );
                        target.reject(TargetReason::AllExposurePlansRejected);
                    }
                }
            }
            propagate(project);
        }
        ready
    }

    /// Score the ready targets and keep the strictly highest; on a tie the
    /// first one wins. Every other ready target is rejected with
    /// [`TargetReason::LowerScore`].
    ///
    /// # Errors
    /// [`PlannerError::InvalidArgument`] when `ready` is empty.
    pub fn select_target_by_score(
        &self,
        at: DateTime<Utc>,
        projects: &mut [Project],
        ready: &[TargetSlot],
    ) -> PlannerResult<TargetSlot> {
        let mut best: Option<(TargetSlot, f64)> = None;
        for &(p, t) in ready {
            let project = &projects[p];
            let context = ScoringContext {
                at,
                policy: &project.policy,
                rule_weights: &project.rule_weights,
                target: &project.targets[t],
                previous_target: self.last_target,
                completion: self.completion_for(&project.policy),
            };
            let score = self.scoring.score_target(&context);
            debug!("Planner: '{}' scored {:.3}", project.targets[t].name, score);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some(((p, t), score));
            }
        }

        let (winner, _) = best.ok_or_else(|| {
            PlannerError::InvalidArgument("select_target_by_score requires at least one ready target".to_string())
        })?;

        for &(p, t) in ready.iter().filter(|slot| **slot != winner) {
            projects[p].targets[t].reject(TargetReason::LowerScore);
            propagate(&mut projects[p]);
        }
        Ok(winner)
    }

    /// Among targets that may still become imageable tonight, find the one
    /// with the earliest feasible start.
    pub fn get_next_possible_target(
        &self,
        at: DateTime<Utc>,
        projects: &mut [Project],
    ) -> PlannerResult<Option<TargetSlot>> {
        let imaging = self.imaging();
        let mut best: Option<(TargetSlot, DateTime<Utc>)> = None;

        for (p, project) in projects.iter_mut().enumerate() {
            let policy = &project.policy;
            for (t, target) in project.targets.iter_mut().enumerate() {
                if !target.rejection().map_or(true, |r| r.may_become_visible()) {
                    continue;
                }
                target.clear_rejection();
                target.clear_exposure_rejections();
                if !imaging.check_future(at, policy, target)? {
                    continue;
                }
                if let Some(start) = target.start_time {
                    if best.map_or(true, |(_, earliest)| start < earliest) {
                        best = Some(((p, t), start));
                    }
                }
            }
            propagate(project);
        }

        Ok(best.map(|(slot, _)| slot))
    }

    // ==================== Plan assembly ====================

    fn build_plan(&mut self, at: DateTime<Utc>, mut active: ActiveTarget, continuation: bool) -> PlannerResult<SchedulerPlan> {
        let selection = active
            .target
            .exposure_selector
            .select(at, &active.policy, &active.target)
            .ok_or_else(|| {
                PlannerError::InvalidArgument(format!("target '{}' has no exposure to take", active.target.name))
            })?;
        active.target.exposure_selector.advance(&selection);
        active.target.set_selected_exposure(Some(selection.index));
        self.repository
            .save_selector_state(active.target.id, &active.target.exposure_selector)?;

        let target_id = active.target.id;
        let plan = &active.target.exposure_plans[selection.index];
        let filter_name = plan.filter_name.clone();
        let exposure_length = plan.exposure_length;
        let dither_every = plan.dither_every.unwrap_or(active.policy.dither_every);

        let mut instructions = Vec::new();
        if self.last_target != Some(target_id) {
            instructions.push(PlanInstruction::Slew {
                target_id,
                target_name: active.target.name.clone(),
                coordinates: active.target.coordinates,
                rotation: active.target.rotation,
            });
            self.dither.invalidate(target_id);
            self.last_filter = None;
        }
        if self.last_filter.as_deref() != Some(filter_name.as_str()) {
            instructions.push(PlanInstruction::SwitchFilter {
                filter_name: filter_name.clone(),
            });
        }

        let dither = if active.target.exposure_selector.uses_dither_counters() {
            self.dither.dither_due(target_id, &filter_name, dither_every)
        } else {
            selection.dither_before
        };
        if dither {
            instructions.push(PlanInstruction::Dither);
            self.dither.record_dither();
        }

        instructions.push(PlanInstruction::TakeExposure {
            exposure_plan_id: plan.id,
            filter_name: filter_name.clone(),
            exposure_length,
        });
        self.dither.record_exposure(target_id, &filter_name);
        self.last_target = Some(target_id);
        self.last_filter = Some(filter_name);

        Ok(SchedulerPlan::Imaging(ImagingPlan {
            time_interval: TimeInterval::new(at, at + seconds_to_duration(exposure_length)),
            active,
            instructions,
            continuation,
        }))
    }
}

fn propagate(project: &mut Project) {
    for target in project.targets.iter_mut() {
        target.propagate_rejection();
    }
    project.propagate_rejection();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::models::{Coordinates, ExposurePlan, Target, TwilightLevel};
    use crate::oracles::tabulated::{TabulatedSky, TargetTrack};
    use crate::oracles::LorentzianMoonAvoidance;
    use crate::scoring::WeightedRuleEngine;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 21, 0, 0).unwrap()
    }

    fn sky() -> TabulatedSky {
        TabulatedSky::new()
            .with_twilight(TwilightLevel::Night, t0() - Duration::hours(1), t0() + Duration::hours(8))
            .with_target(TargetTrack::new(
                1,
                t0() - Duration::hours(2),
                t0() + Duration::hours(1),
                t0() + Duration::hours(4),
                60.0,
            ))
    }

    fn repository() -> LocalRepository {
        let repo = LocalRepository::new();
        let target = Target::new(
            1,
            "M101",
            Coordinates::new(210.8, 54.3),
            vec![ExposurePlan::new(1, "L", 120.0, 2), ExposurePlan::new(2, "R", 60.0, 2)],
        );
        repo.store_project("home", Project::new(1, "Pinwheel", ProjectPolicy::default(), vec![target]));
        repo
    }

    #[test]
    fn test_first_plan_slews_and_switches_filter() {
        let sky = sky();
        let moon = LorentzianMoonAvoidance::new(&sky);
        let scoring = WeightedRuleEngine::default();
        let repo = repository();
        let mut planner = Planner::new(PlannerConfig::for_profile("home"), &repo, &sky, &sky, &moon, &scoring);

        let plan = planner.get_plan(t0(), None).unwrap();
        let imaging = plan.imaging().expect("imaging plan");
        assert!(!imaging.continuation);
        assert_eq!(imaging.filter_name(), Some("L"));
        assert!(matches!(imaging.instructions[0], PlanInstruction::Slew { .. }));
        assert_eq!(
            imaging.instructions[1],
            PlanInstruction::SwitchFilter {
                filter_name: "L".to_string()
            }
        );
        assert_eq!(imaging.instructions.len(), 3);
        assert_eq!(planner.last_target(), Some(TargetId(1)));
    }

    #[test]
    fn test_continuation_skips_slew() {
        let sky = sky();
        let moon = LorentzianMoonAvoidance::new(&sky);
        let scoring = WeightedRuleEngine::default();
        let repo = repository();
        let mut planner = Planner::new(PlannerConfig::for_profile("home"), &repo, &sky, &sky, &moon, &scoring);

        let first = planner.get_plan(t0(), None).unwrap();
        let active = first.imaging().unwrap().active.clone();
        repo.record_exposure(crate::models::ExposurePlanId(1), true).unwrap();

        let second = planner.get_plan(t0() + Duration::minutes(2), Some(active)).unwrap();
        let imaging = second.imaging().unwrap();
        assert!(imaging.continuation);
        assert_eq!(imaging.filter_name(), Some("L"));
        assert_eq!(imaging.instructions.len(), 1);
    }

    #[test]
    fn test_start_session_forgets_last_target() {
        let sky = sky();
        let moon = LorentzianMoonAvoidance::new(&sky);
        let scoring = WeightedRuleEngine::default();
        let repo = repository();
        let mut planner = Planner::new(PlannerConfig::for_profile("home"), &repo, &sky, &sky, &moon, &scoring);

        planner.get_plan(t0(), None).unwrap();
        planner.start_session();
        assert_eq!(planner.last_target(), None);
    }

    #[test]
    fn test_select_by_score_rejects_empty() {
        let sky = sky();
        let moon = LorentzianMoonAvoidance::new(&sky);
        let scoring = WeightedRuleEngine::default();
        let repo = repository();
        let planner = Planner::new(PlannerConfig::for_profile("home"), &repo, &sky, &sky, &moon, &scoring);

        let mut projects = Vec::new();
        assert!(matches!(
            planner.select_target_by_score(t0(), &mut projects, &[]),
            Err(PlannerError::InvalidArgument(_))
        ));
    }
}
