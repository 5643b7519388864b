//! Exposure plan completion rules.
//!
//! With grading disabled every acquired frame counts. With grading enabled
//! only accepted frames count, but an optional throttle caps how many frames
//! may be acquired (as a percentage of desired) while waiting for grades.

use crate::models::ExposurePlan;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureCompletion {
    grading_enabled: bool,
    throttle_percent: Option<f64>,
}

impl ExposureCompletion {
    pub fn new(grading_enabled: bool, throttle_percent: Option<f64>) -> Self {
        Self {
            grading_enabled,
            throttle_percent: throttle_percent.filter(|p| *p > 0.0),
        }
    }

    fn counted(&self, plan: &ExposurePlan) -> u32 {
        if self.grading_enabled {
            plan.accepted
        } else {
            plan.acquired
        }
    }

    fn throttled(&self, plan: &ExposurePlan) -> bool {
        match self.throttle_percent {
            Some(percent) if self.grading_enabled => {
                plan.acquired as f64 >= plan.desired as f64 * percent / 100.0
            }
            _ => false,
        }
    }

    /// `max(0, desired - counted)`, or zero once throttled.
    pub fn needed(&self, plan: &ExposurePlan) -> u32 {
        if self.throttled(plan) {
            return 0;
        }
        plan.desired.saturating_sub(self.counted(plan))
    }

    pub fn is_incomplete(&self, plan: &ExposurePlan) -> bool {
        self.needed(plan) > 0
    }

    pub fn percent_complete(&self, plan: &ExposurePlan) -> f64 {
        if plan.desired == 0 || self.throttled(plan) {
            return 100.0;
        }
        (self.counted(plan) as f64 / plan.desired as f64 * 100.0).min(100.0)
    }
}
