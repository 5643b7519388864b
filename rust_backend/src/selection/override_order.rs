use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExposureSelection, ExposureSelector};
use crate::models::{ProjectPolicy, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStep {
    /// Take an exposure from the plan at this index.
    Exposure(usize),
    Dither,
}

/// Follows an explicit list of steps, wrapping to the start when the end
/// is reached. Steps whose plan is complete or rejected are skipped.
///
/// An empty order behaves as "no override": every plan is covered and the
/// first available plan is returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideOrderSelector {
    steps: Vec<OverrideStep>,
    /// Number of exposure plans the target had when the order was authored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan_count: Option<usize>,
    #[serde(default)]
    cursor: usize,
}

impl OverrideOrderSelector {
    /// Create an order authored against a target with `plan_count` plans.
    pub fn new(steps: Vec<OverrideStep>, plan_count: usize) -> Self {
        Self {
            steps,
            plan_count: Some(plan_count),
            cursor: 0,
        }
    }

    pub fn steps(&self) -> &[OverrideStep] {
        &self.steps
    }

    pub fn plan_count(&self) -> Option<usize> {
        self.plan_count
    }

    /// True when the exposure plan set changed since the order was authored:
    /// plans were added or removed. Orders stored without a plan count are
    /// stale only when they name an index the target no longer has.
    pub fn is_stale(&self, plan_count: usize) -> bool {
        if self.steps.is_empty() {
            return false;
        }
        match self.plan_count {
            Some(authored) => authored != plan_count,
            None => self
                .steps
                .iter()
                .any(|step| matches!(step, OverrideStep::Exposure(idx) if *idx >= plan_count)),
        }
    }

    /// Drop the order after a breaking change to the plan set.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.plan_count = None;
        self.cursor = 0;
    }
}

impl ExposureSelector for OverrideOrderSelector {
    fn select(&self, _at: DateTime<Utc>, _policy: &ProjectPolicy, target: &Target) -> Option<ExposureSelection> {
        let available = target.available_indices();
        if self.steps.is_empty() {
            let first = *available.first()?;
            return Some(ExposureSelection {
                index: first,
                dither_before: false,
                step: 0,
            });
        }

        let len = self.steps.len();
        let mut saw_dither = false;
        for offset in 0..len {
            let position = (self.cursor + offset) % len;
            match self.steps[position] {
                OverrideStep::Dither => saw_dither = true,
                OverrideStep::Exposure(idx) if available.contains(&idx) => {
                    return Some(ExposureSelection {
                        index: idx,
                        dither_before: saw_dither,
                        step: position,
                    });
                }
                OverrideStep::Exposure(_) => {}
            }
        }

        None
    }

    fn advance(&mut self, selection: &ExposureSelection) {
        if !self.steps.is_empty() {
            self.cursor = (selection.step + 1) % self.steps.len();
        }
    }

    fn contains_exposure_plan_idx(&self, idx: usize) -> bool {
        self.steps.is_empty() || self.steps.contains(&OverrideStep::Exposure(idx))
    }

    fn uses_dither_counters(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, ExposurePlan, ExposureReason};
    use crate::planning::completion::ExposureCompletion;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap()
    }

    fn target(filters: &[&str], selector: OverrideOrderSelector) -> Target {
        let plans = filters
            .iter()
            .enumerate()
            .map(|(i, f)| ExposurePlan::new(i as i64 + 1, f, 60.0, 10))
            .collect();
        let mut target = Target::new(1, "IC 1805", Coordinates::new(38.2, 61.5), plans);
        target.exposure_selector = crate::selection::SelectorKind::OverrideOrder(selector);
        target.partition_exposures(&ExposureCompletion::new(false, None));
        target
    }

    use OverrideStep::{Dither, Exposure};

    #[test]
    fn test_follows_order_and_wraps() {
        let order = OverrideOrderSelector::new(vec![Exposure(2), Exposure(0), Dither], 3);
        let t = target(&["Ha", "OIII", "SII"], order.clone());
        let policy = ProjectPolicy::default();
        let mut selector = order;

        let mut picked = Vec::new();
        for _ in 0..4 {
            let selection = selector.select(at(), &policy, &t).unwrap();
            picked.push((selection.index, selection.dither_before));
            selector.advance(&selection);
        }
        assert_eq!(picked, vec![(2, false), (0, false), (2, true), (0, false)]);
    }

    #[test]
    fn test_skips_unavailable_steps() {
        let order = OverrideOrderSelector::new(vec![Exposure(0), Exposure(1)], 2);
        let mut t = target(&["Ha", "OIII"], order.clone());
        t.exposure_plans[0].reject(ExposureReason::MoonAvoidance);
        let selection = order.select(at(), &ProjectPolicy::default(), &t).unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.step, 1);
    }

    #[test]
    fn test_uncovered_plans_are_completed_by_partition() {
        let order = OverrideOrderSelector::new(vec![Exposure(0)], 2);
        let t = target(&["Ha", "OIII"], order);
        assert_eq!(t.incomplete_indices(), &[0]);
        assert_eq!(t.exposure_plans[1].rejection(), Some(ExposureReason::Complete));
    }

    #[test]
    fn test_contains_exposure_plan_idx() {
        let order = OverrideOrderSelector::new(vec![Exposure(1), Dither], 2);
        assert!(order.contains_exposure_plan_idx(1));
        assert!(!order.contains_exposure_plan_idx(0));
        assert!(!order.uses_dither_counters());
    }

    #[test]
    fn test_stale_when_plans_removed_or_added() {
        let order = OverrideOrderSelector::new(vec![Exposure(0), Exposure(1)], 2);
        assert!(!order.is_stale(2));
        assert!(order.is_stale(1));
        assert!(order.is_stale(3));
    }

    #[test]
    fn test_stale_without_plan_count_checks_indices() {
        let json = r#"{ "steps": [{ "exposure": 0 }, { "exposure": 3 }] }"#;
        let order: OverrideOrderSelector = serde_json::from_str(json).unwrap();
        assert_eq!(order.plan_count(), None);
        assert!(order.is_stale(2));
        assert!(!order.is_stale(4));
    }

    #[test]
    fn test_clear() {
        let mut order = OverrideOrderSelector::new(vec![Exposure(0), Exposure(3)], 4);
        order.clear();
        assert!(order.steps().is_empty());
        assert_eq!(order.plan_count(), None);
        assert!(!order.is_stale(7));
        assert!(order.contains_exposure_plan_idx(7));
    }

    #[test]
    fn test_nothing_available_returns_none() {
        let order = OverrideOrderSelector::new(vec![Exposure(0), Dither], 1);
        let mut t = target(&["Ha"], order.clone());
        t.exposure_plans[0].reject(ExposureReason::Twilight);
        assert!(order.select(at(), &ProjectPolicy::default(), &t).is_none());
    }
}
