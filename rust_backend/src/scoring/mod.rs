//! Target scoring.
//!
//! When several targets are ready at the same time the planner asks a
//! [`ScoringEngine`] for a score per target and keeps the strictly highest.
//! The default engine is [`WeightedRuleEngine`]: a set of [`ScoringRule`]s,
//! each producing a value in `0..=1`, combined with the project's rule
//! weights:
//!
//! ```text
//! score = Σ rule(target) × weight(rule) / 100
//! ```
//!
//! Rules without a configured weight use [`DEFAULT_RULE_WEIGHT`].

pub mod rules;

use chrono::{DateTime, Utc};

use crate::models::{ProjectPolicy, RuleWeights, Target, TargetId};
use crate::planning::completion::ExposureCompletion;

pub use rules::{MosaicCompletion, PercentComplete, ProjectPriorityRule, SettingSoonest, TargetSwitchPenalty};

pub const DEFAULT_RULE_WEIGHT: f64 = 50.0;

/// Everything a rule may look at for one candidate target.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub at: DateTime<Utc>,
    pub policy: &'a ProjectPolicy,
    pub rule_weights: &'a RuleWeights,
    pub target: &'a Target,
    /// Target imaged on the previous plan, if any.
    pub previous_target: Option<TargetId>,
    pub completion: ExposureCompletion,
}

pub trait ScoringEngine {
    fn score_target(&self, context: &ScoringContext<'_>) -> f64;
}

/// One named scoring criterion.
pub trait ScoringRule: Send + Sync {
    /// Name used as the key in a project's rule weights.
    fn name(&self) -> &'static str;

    /// Raw score in `0..=1`.
    fn score(&self, context: &ScoringContext<'_>) -> f64;
}

pub struct WeightedRuleEngine {
    rules: Vec<Box<dyn ScoringRule>>,
}

impl WeightedRuleEngine {
    pub fn new(rules: Vec<Box<dyn ScoringRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Per-rule contributions, for diagnostics.
    pub fn breakdown(&self, context: &ScoringContext<'_>) -> Vec<(&'static str, f64)> {
        self.rules
            .iter()
            .map(|rule| {
                let weight = context
                    .rule_weights
                    .get(rule.name())
                    .unwrap_or(DEFAULT_RULE_WEIGHT);
                (rule.name(), rule.score(context).clamp(0.0, 1.0) * weight / 100.0)
            })
            .collect()
    }
}

impl Default for WeightedRuleEngine {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ProjectPriorityRule),
            Box::new(PercentComplete),
            Box::new(SettingSoonest),
            Box::new(TargetSwitchPenalty),
            Box::new(MosaicCompletion),
        ])
    }
}

impl ScoringEngine for WeightedRuleEngine {
    fn score_target(&self, context: &ScoringContext<'_>) -> f64 {
        self.breakdown(context).iter().map(|(_, value)| value).sum()
    }
}
