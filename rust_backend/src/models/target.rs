use chrono::{DateTime, Utc};
use qtty::Degrees;
use serde::{Deserialize, Serialize};

use super::exposure::ExposurePlan;
use super::rejection::{ExposureReason, TargetReason};
use crate::planning::completion::ExposureCompletion;
use crate::selection::{ExposureSelector, SelectorKind};

crate::define_id_type!(
    /// Identifier of a target within the data store.
    i64,
    TargetId
);

/// J2000 sky position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub ra: Degrees,
    pub dec: Degrees,
}

impl Coordinates {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            ra: Degrees::new(ra_deg),
            dec: Degrees::new(dec_deg),
        }
    }
}

/// One sky position to image, with its exposure plans and the visibility
/// fields computed by the planner during a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub name: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "full_roi")]
    pub roi: f64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub exposure_plans: Vec<ExposurePlan>,
    #[serde(default)]
    pub exposure_selector: SelectorKind,

    #[serde(skip)]
    incomplete: Vec<usize>,
    #[serde(skip)]
    complete: Vec<usize>,
    #[serde(skip)]
    selected_exposure: Option<usize>,
    #[serde(skip)]
    rejection: Option<TargetReason>,

    #[serde(skip)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub culmination_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub minimum_time_span_end: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub bonus_time_span_end: Option<DateTime<Utc>>,
}

fn full_roi() -> f64 {
    1.0
}

fn enabled_by_default() -> bool {
    true
}

impl Target {
    pub fn new(id: i64, name: &str, coordinates: Coordinates, exposure_plans: Vec<ExposurePlan>) -> Self {
        Self {
            id: TargetId(id),
            name: name.to_string(),
            coordinates,
            rotation: 0.0,
            roi: full_roi(),
            enabled: true,
            exposure_plans,
            exposure_selector: SelectorKind::default(),
            incomplete: Vec::new(),
            complete: Vec::new(),
            selected_exposure: None,
            rejection: None,
            start_time: None,
            end_time: None,
            culmination_time: None,
            minimum_time_span_end: None,
            bonus_time_span_end: None,
        }
    }

    // ==================== Rejection state ====================

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn rejection(&self) -> Option<TargetReason> {
        self.rejection
    }

    pub fn reject(&mut self, reason: TargetReason) {
        self.rejection = Some(reason);
    }

    pub fn clear_rejection(&mut self) {
        self.rejection = None;
    }

    /// Clear rejections on every incomplete exposure plan, keeping the
    /// `complete` marks on finished ones.
    pub fn clear_exposure_rejections(&mut self) {
        for &idx in &self.incomplete {
            self.exposure_plans[idx].clear_rejection();
        }
    }

    /// Bottom-up rule: a target is rejected once every incomplete exposure
    /// plan is rejected. An earlier target-level reason is kept.
    pub fn propagate_rejection(&mut self) {
        if self.is_rejected() {
            return;
        }

        if self.incomplete.is_empty() {
            self.rejection = Some(TargetReason::Complete);
            return;
        }

        let mut all_rejected = true;
        let mut all_moon = true;
        for &idx in &self.incomplete {
            match self.exposure_plans[idx].rejection() {
                None => {
                    all_rejected = false;
                    break;
                }
                Some(ExposureReason::MoonAvoidance) => {}
                Some(_) => all_moon = false,
            }
        }

        if all_rejected {
            self.rejection = Some(if all_moon {
                TargetReason::MoonAvoidance
            } else {
                TargetReason::AllExposurePlansRejected
            });
        }
    }

    // ==================== Exposure subsets ====================

    /// Recompute the incomplete and completed subsets.
    ///
    /// Disabled plans belong to neither subset. Plans that are complete, have
    /// nothing desired, or are not covered by an override order are moved to
    /// the completed subset and marked rejected. Rejections already present on
    /// incomplete plans are left untouched.
    ///
    /// Returns the number of plans that were incomplete before and are
    /// complete now.
    pub fn partition_exposures(&mut self, completion: &ExposureCompletion) -> usize {
        let previously_incomplete = std::mem::take(&mut self.incomplete);
        self.complete.clear();

        for (idx, plan) in self.exposure_plans.iter_mut().enumerate() {
            if !plan.enabled {
                continue;
            }

            if plan.desired == 0 {
                plan.reject(ExposureReason::NoExposuresPlanned);
                self.complete.push(idx);
            } else if !completion.is_incomplete(plan)
                || !self.exposure_selector.contains_exposure_plan_idx(idx)
            {
                plan.reject(ExposureReason::Complete);
                self.complete.push(idx);
            } else {
                if matches!(
                    plan.rejection(),
                    Some(ExposureReason::Complete) | Some(ExposureReason::NoExposuresPlanned)
                ) {
                    plan.clear_rejection();
                }
                self.incomplete.push(idx);
            }
        }

        if let Some(selected) = self.selected_exposure {
            if !self.incomplete.contains(&selected) {
                self.selected_exposure = None;
            }
        }

        previously_incomplete
            .iter()
            .filter(|idx| self.complete.contains(idx))
            .count()
    }

    pub fn incomplete_indices(&self) -> &[usize] {
        &self.incomplete
    }

    pub fn complete_indices(&self) -> &[usize] {
        &self.complete
    }

    pub fn incomplete_exposures(&self) -> impl Iterator<Item = &ExposurePlan> {
        self.incomplete.iter().map(move |&idx| &self.exposure_plans[idx])
    }

    /// Incomplete plans that no filter has rejected yet, in plan order.
    pub fn available_indices(&self) -> Vec<usize> {
        self.incomplete
            .iter()
            .copied()
            .filter(|&idx| !self.exposure_plans[idx].is_rejected())
            .collect()
    }

    pub fn percent_complete(&self, completion: &ExposureCompletion) -> f64 {
        let plans: Vec<&ExposurePlan> = self.exposure_plans.iter().filter(|p| p.enabled).collect();
        if plans.is_empty() {
            return 100.0;
        }
        plans.iter().map(|p| completion.percent_complete(p)).sum::<f64>() / plans.len() as f64
    }

    // ==================== Selection ====================

    pub fn selected_exposure_index(&self) -> Option<usize> {
        self.selected_exposure
    }

    pub fn selected_exposure(&self) -> Option<&ExposurePlan> {
        self.selected_exposure.map(|idx| &self.exposure_plans[idx])
    }

    pub fn set_selected_exposure(&mut self, idx: Option<usize>) {
        self.selected_exposure = idx.filter(|i| *i < self.exposure_plans.len());
    }

    // ==================== Visibility window ====================

    pub fn clear_window(&mut self) {
        self.start_time = None;
        self.end_time = None;
        self.culmination_time = None;
        self.minimum_time_span_end = None;
        self.bonus_time_span_end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_with(plans: Vec<ExposurePlan>) -> Target {
        Target::new(1, "M42", Coordinates::new(83.82, -5.39), plans)
    }

    fn completion() -> ExposureCompletion {
        ExposureCompletion::new(false, None)
    }

    #[test]
    fn test_partition_exposures() {
        let mut done = ExposurePlan::new(2, "G", 60.0, 3);
        done.acquired = 3;
        let mut disabled = ExposurePlan::new(4, "B", 60.0, 3);
        disabled.enabled = false;
        let mut target = target_with(vec![
            ExposurePlan::new(1, "R", 60.0, 3),
            done,
            ExposurePlan::new(3, "L", 60.0, 0),
            disabled,
        ]);

        target.partition_exposures(&completion());

        assert_eq!(target.incomplete_indices(), &[0]);
        assert_eq!(target.complete_indices(), &[1, 2]);
        assert_eq!(target.exposure_plans[1].rejection(), Some(ExposureReason::Complete));
        assert_eq!(
            target.exposure_plans[2].rejection(),
            Some(ExposureReason::NoExposuresPlanned)
        );
        assert!(!target.exposure_plans[3].is_rejected());
    }

    #[test]
    fn test_partition_reports_newly_completed() {
        let mut target = target_with(vec![ExposurePlan::new(1, "R", 60.0, 2)]);
        assert_eq!(target.partition_exposures(&completion()), 0);
        target.exposure_plans[0].acquired = 2;
        assert_eq!(target.partition_exposures(&completion()), 1);
        assert!(target.incomplete_indices().is_empty());
    }

    #[test]
    fn test_propagate_complete_vs_rejected() {
        let mut done = ExposurePlan::new(1, "R", 60.0, 1);
        done.acquired = 1;
        let mut target = target_with(vec![done]);
        target.partition_exposures(&completion());
        target.propagate_rejection();
        assert_eq!(target.rejection(), Some(TargetReason::Complete));

        let mut target = target_with(vec![
            ExposurePlan::new(1, "R", 60.0, 5),
            ExposurePlan::new(2, "G", 60.0, 5),
        ]);
        target.partition_exposures(&completion());
        target.exposure_plans[0].reject(ExposureReason::MoonAvoidance);
        target.propagate_rejection();
        assert!(!target.is_rejected());

        target.exposure_plans[1].reject(ExposureReason::Twilight);
        target.propagate_rejection();
        assert_eq!(target.rejection(), Some(TargetReason::AllExposurePlansRejected));
    }

    #[test]
    fn test_propagate_all_moon() {
        let mut target = target_with(vec![ExposurePlan::new(1, "R", 60.0, 5)]);
        target.partition_exposures(&completion());
        target.exposure_plans[0].reject(ExposureReason::MoonAvoidance);
        target.propagate_rejection();
        assert_eq!(target.rejection(), Some(TargetReason::MoonAvoidance));
    }

    #[test]
    fn test_propagate_keeps_earlier_reason() {
        let mut target = target_with(vec![ExposurePlan::new(1, "R", 60.0, 5)]);
        target.partition_exposures(&completion());
        target.reject(TargetReason::NotVisible);
        target.exposure_plans[0].reject(ExposureReason::Twilight);
        target.propagate_rejection();
        assert_eq!(target.rejection(), Some(TargetReason::NotVisible));
    }

    #[test]
    fn test_selected_exposure_dropped_when_completed() {
        let mut target = target_with(vec![ExposurePlan::new(1, "R", 60.0, 1)]);
        target.partition_exposures(&completion());
        target.set_selected_exposure(Some(0));
        assert_eq!(target.selected_exposure().map(|p| p.filter_name.as_str()), Some("R"));

        target.exposure_plans[0].acquired = 1;
        target.partition_exposures(&completion());
        assert!(target.selected_exposure().is_none());
    }

    #[test]
    fn test_percent_complete() {
        let mut half = ExposurePlan::new(1, "R", 60.0, 4);
        half.acquired = 2;
        let mut full = ExposurePlan::new(2, "G", 60.0, 4);
        full.acquired = 4;
        let target = target_with(vec![half, full]);
        assert!((target.percent_complete(&completion()) - 75.0).abs() < 1e-9);
    }
}
