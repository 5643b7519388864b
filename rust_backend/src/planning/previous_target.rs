//! Continuation of the previously selected target.
//!
//! When the target imaged on the last cycle can simply take its next
//! exposure, the planner skips the full pipeline. That keeps the rig on one
//! target instead of re-scoring every few minutes.

use chrono::{DateTime, Utc};
use log::debug;

use super::completion::ExposureCompletion;
use super::imaging::TargetImagingExpert;
use crate::db::repository::ProjectRepository;
use crate::error::CollaboratorError;
use crate::models::{seconds_to_duration, ProjectPolicy, Target};
use crate::selection::ExposureSelector;

pub struct PreviousTargetExpert<'a> {
    repository: &'a dyn ProjectRepository,
    imaging: TargetImagingExpert<'a>,
    completion: ExposureCompletion,
}

impl<'a> PreviousTargetExpert<'a> {
    pub fn new(
        repository: &'a dyn ProjectRepository,
        imaging: TargetImagingExpert<'a>,
        completion: ExposureCompletion,
    ) -> Self {
        Self {
            repository,
            imaging,
            completion,
        }
    }

    /// Decide whether `target` may keep running at `at` without a re-plan.
    ///
    /// Refreshes completion counts from the repository, re-partitions the
    /// exposure plans and re-runs moon avoidance. On success the target's
    /// selected exposure is set to the next one to take.
    pub fn can_continue(
        &self,
        at: DateTime<Utc>,
        policy: &ProjectPolicy,
        target: &mut Target,
    ) -> Result<bool, CollaboratorError> {
        let reloaded = self.repository.reload_exposure_plans(target.id)?;
        for plan in target.exposure_plans.iter_mut() {
            if let Some(fresh) = reloaded.iter().find(|r| r.id == plan.id) {
                plan.refresh_counts(fresh);
            }
        }

        let newly_complete = target.partition_exposures(&self.completion);
        if newly_complete > 0 {
            debug!("Continuation: {} exposure plan(s) of '{}' completed", newly_complete, target.name);
        }
        if target.incomplete_indices().is_empty() {
            return Ok(must_replan(target, at, "all exposure plans complete"));
        }

        target.clear_exposure_rejections();
        self.imaging.moon_avoidance_filter(at, target)?;
        if target.available_indices().is_empty() {
            return Ok(must_replan(target, at, "remaining exposure plans rejected for the moon"));
        }

        if let (Some(end), Some(minimum_end)) = (target.end_time, target.minimum_time_span_end) {
            if end - minimum_end < policy.minimum_time_span() {
                target.bonus_time_span_end = Some(end);
            }
        }

        let selection = match target.exposure_selector.select(at, policy, target) {
            Some(selection) => selection,
            None => return Ok(must_replan(target, at, "no exposure selected")),
        };
        let plan = &target.exposure_plans[selection.index];

        let current = self.imaging.current_twilight(at)?;
        if !plan.twilight_level.permits(current) {
            return Ok(must_replan(target, at, "twilight no longer appropriate"));
        }

        let exposure_end = at + seconds_to_duration(plan.exposure_length);
        match target.bonus_time_span_end {
            Some(bonus_end) if exposure_end <= bonus_end => {}
            _ => return Ok(must_replan(target, at, "next exposure would overrun the time span")),
        }

        target.set_selected_exposure(Some(selection.index));
        Ok(true)
    }
}

fn must_replan(target: &Target, at: DateTime<Utc>, why: &str) -> bool {
    debug!("Continuation: '{}' must re-plan at {}: {}", target.name, at, why);
    false
}
