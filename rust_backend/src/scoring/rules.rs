//! Default scoring rules.

use super::{ScoringContext, ScoringRule};
use crate::models::ProjectPriority;

/// Minutes over which "setting soonest" scales.
const SETTING_HORIZON_MINUTES: f64 = 720.0;

/// Higher project priority scores higher.
pub struct ProjectPriorityRule;

impl ScoringRule for ProjectPriorityRule {
    fn name(&self) -> &'static str {
        "Project Priority"
    }

    fn score(&self, context: &ScoringContext<'_>) -> f64 {
        match context.policy.priority {
            ProjectPriority::Low => 0.0,
            ProjectPriority::Normal => 0.5,
            ProjectPriority::High => 1.0,
        }
    }
}

/// Favour targets closer to completion.
pub struct PercentComplete;

impl ScoringRule for PercentComplete {
    fn name(&self) -> &'static str {
        "Percent Complete"
    }

    fn score(&self, context: &ScoringContext<'_>) -> f64 {
        context.target.percent_complete(&context.completion) / 100.0
    }
}

/// Favour targets whose visibility ends soonest.
pub struct SettingSoonest;

impl ScoringRule for SettingSoonest {
    fn name(&self) -> &'static str {
        "Setting Soonest"
    }

    fn score(&self, context: &ScoringContext<'_>) -> f64 {
        match context.target.end_time {
            Some(end) => {
                let minutes = (end - context.at).num_seconds() as f64 / 60.0;
                (1.0 - minutes / SETTING_HORIZON_MINUTES).clamp(0.0, 1.0)
            }
            None => 0.0,
        }
    }
}

/// Favour staying on the target imaged last, avoiding slews.
pub struct TargetSwitchPenalty;

impl ScoringRule for TargetSwitchPenalty {
    fn name(&self) -> &'static str {
        "Target Switch Penalty"
    }

    fn score(&self, context: &ScoringContext<'_>) -> f64 {
        if context.previous_target == Some(context.target.id) {
            1.0
        } else {
            0.0
        }
    }
}

/// Favour finishing mosaic panels.
pub struct MosaicCompletion;

impl ScoringRule for MosaicCompletion {
    fn name(&self) -> &'static str {
        "Mosaic Completion"
    }

    fn score(&self, context: &ScoringContext<'_>) -> f64 {
        if context.policy.is_mosaic {
            context.target.percent_complete(&context.completion) / 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, ExposurePlan, ProjectPolicy, RuleWeights, Target, TargetId};
    use crate::planning::completion::ExposureCompletion;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 12, 22, 0, 0).unwrap()
    }

    fn half_done() -> Target {
        let mut plan = ExposurePlan::new(1, "Ha", 300.0, 10);
        plan.acquired = 5;
        Target::new(9, "NGC 6888", Coordinates::new(303.0, 38.4), vec![plan])
    }

    fn score<R: ScoringRule>(rule: R, policy: &ProjectPolicy, target: &Target, previous: Option<TargetId>) -> f64 {
        let weights = RuleWeights::new();
        rule.score(&ScoringContext {
            at: at(),
            policy,
            rule_weights: &weights,
            target,
            previous_target: previous,
            completion: ExposureCompletion::new(false, None),
        })
    }

    #[test]
    fn test_percent_complete_rule() {
        let target = half_done();
        assert!((score(PercentComplete, &ProjectPolicy::default(), &target, None) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_setting_soonest() {
        let mut target = half_done();
        target.end_time = Some(at() + Duration::minutes(180));
        assert!((score(SettingSoonest, &ProjectPolicy::default(), &target, None) - 0.75).abs() < 1e-9);

        target.end_time = Some(at() + Duration::hours(20));
        assert_eq!(score(SettingSoonest, &ProjectPolicy::default(), &target, None), 0.0);

        target.end_time = None;
        assert_eq!(score(SettingSoonest, &ProjectPolicy::default(), &target, None), 0.0);
    }

    #[test]
    fn test_switch_penalty() {
        let target = half_done();
        assert_eq!(score(TargetSwitchPenalty, &ProjectPolicy::default(), &target, Some(TargetId(9))), 1.0);
        assert_eq!(score(TargetSwitchPenalty, &ProjectPolicy::default(), &target, Some(TargetId(2))), 0.0);
    }

    #[test]
    fn test_mosaic_only_for_mosaics() {
        let target = half_done();
        assert_eq!(score(MosaicCompletion, &ProjectPolicy::default(), &target, None), 0.0);
        let mosaic = ProjectPolicy {
            is_mosaic: true,
            ..ProjectPolicy::default()
        };
        assert!((score(MosaicCompletion, &mosaic, &target, None) - 0.5).abs() < 1e-9);
    }
}
