use std::collections::BTreeMap;

use chrono::Duration;
use qtty::Degrees;
use serde::{Deserialize, Serialize};

use super::horizon::{HorizonDefinition, HorizonPoint};
use super::rejection::{ProjectReason, TargetReason};
use super::target::Target;

crate::define_id_type!(
    /// Identifier of a project within the data store.
    i64,
    ProjectId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    Draft,
    Active,
    Inactive,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Imaging policy shared by every target of a project. Read-only to the
/// planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPolicy {
    /// Minimum imaging time per visit, in minutes.
    pub minimum_time: u32,
    #[serde(default = "default_minimum_altitude")]
    pub minimum_altitude: Degrees,
    /// Zero disables the ceiling.
    #[serde(default = "zero_degrees")]
    pub maximum_altitude: Degrees,
    #[serde(default)]
    pub custom_horizon: Option<Vec<HorizonPoint>>,
    #[serde(default = "zero_degrees")]
    pub horizon_offset: Degrees,
    /// Minutes either side of transit; zero disables the window.
    #[serde(default)]
    pub meridian_window: u32,
    /// Consecutive exposures of one filter before switching; zero repeats
    /// a filter until it is done.
    #[serde(default)]
    pub filter_switch_frequency: u32,
    /// Exposures of one filter between dithers; zero disables dithering.
    #[serde(default)]
    pub dither_every: u32,
    #[serde(default)]
    pub grading_enabled: bool,
    #[serde(default)]
    pub priority: ProjectPriority,
    #[serde(default)]
    pub is_mosaic: bool,
}

fn default_minimum_altitude() -> Degrees {
    Degrees::new(0.0)
}

fn zero_degrees() -> Degrees {
    Degrees::new(0.0)
}

impl ProjectPolicy {
    pub fn minimum_time_span(&self) -> Duration {
        Duration::minutes(self.minimum_time as i64)
    }

    pub fn horizon(&self) -> HorizonDefinition {
        match &self.custom_horizon {
            Some(points) => {
                HorizonDefinition::with_custom(self.minimum_altitude, points.clone(), self.horizon_offset)
            }
            None => HorizonDefinition::flat(self.minimum_altitude),
        }
    }

    pub fn has_maximum_altitude(&self) -> bool {
        self.maximum_altitude.value() > 0.0
    }
}

impl Default for ProjectPolicy {
    fn default() -> Self {
        Self {
            minimum_time: 30,
            minimum_altitude: default_minimum_altitude(),
            maximum_altitude: zero_degrees(),
            custom_horizon: None,
            horizon_offset: zero_degrees(),
            meridian_window: 0,
            filter_switch_frequency: 0,
            dither_every: 0,
            grading_enabled: false,
            priority: ProjectPriority::Normal,
            is_mosaic: false,
        }
    }
}

/// Named scoring rule weights, each clamped to `0..=100`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleWeights(BTreeMap<String, f64>);

impl RuleWeights {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, rule: &str, weight: f64) -> Self {
        self.set(rule, weight);
        self
    }

    pub fn set(&mut self, rule: &str, weight: f64) {
        self.0.insert(rule.to_string(), weight.clamp(0.0, 100.0));
    }

    pub fn get(&self, rule: &str) -> Option<f64> {
        self.0.get(rule).map(|w| w.clamp(0.0, 100.0))
    }
}

/// Policy container for a set of targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub profile_id: String,
    pub state: ProjectState,
    #[serde(default)]
    pub policy: ProjectPolicy,
    #[serde(default)]
    pub rule_weights: RuleWeights,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(skip)]
    rejection: Option<ProjectReason>,
}

impl Project {
    pub fn new(id: i64, name: &str, policy: ProjectPolicy, targets: Vec<Target>) -> Self {
        Self {
            id: ProjectId(id),
            name: name.to_string(),
            profile_id: String::new(),
            state: ProjectState::Active,
            policy,
            rule_weights: RuleWeights::new(),
            targets,
            rejection: None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn rejection(&self) -> Option<ProjectReason> {
        self.rejection
    }

    pub fn reject(&mut self, reason: ProjectReason) {
        self.rejection = Some(reason);
    }

    pub fn clear_rejection(&mut self) {
        self.rejection = None;
    }

    /// Re-derive the project rejection from its targets. A project is
    /// rejected iff every target is; the reason summarises why.
    pub fn propagate_rejection(&mut self) {
        let all_rejected = self.targets.iter().all(Target::is_rejected);
        if !all_rejected {
            self.rejection = None;
            return;
        }

        let reasons: Vec<TargetReason> = self.targets.iter().filter_map(Target::rejection).collect();
        let reason = if reasons.iter().all(|r| *r == TargetReason::Complete) {
            ProjectReason::Complete
        } else if reasons.iter().all(|r| *r == TargetReason::MoonAvoidance) {
            ProjectReason::MoonAvoidance
        } else if reasons
            .iter()
            .all(|r| r.is_visibility() || *r == TargetReason::Complete)
        {
            ProjectReason::NoVisibleTargets
        } else {
            ProjectReason::AllTargetsRejected
        };
        self.rejection = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, ExposurePlan};

    fn target(id: i64) -> Target {
        Target::new(
            id,
            &format!("T{}", id),
            Coordinates::new(10.0, 40.0),
            vec![ExposurePlan::new(id * 10, "L", 60.0, 5)],
        )
    }

    #[test]
    fn test_priority_defaults_to_normal() {
        assert_eq!(ProjectPriority::default(), ProjectPriority::Normal);
    }

    #[test]
    fn test_rule_weights_clamped() {
        let weights = RuleWeights::new().with("Project Priority", 250.0).with("Percent Complete", -3.0);
        assert_eq!(weights.get("Project Priority"), Some(100.0));
        assert_eq!(weights.get("Percent Complete"), Some(0.0));
        assert_eq!(weights.get("Missing"), None);
    }

    #[test]
    fn test_propagation_requires_every_target() {
        let mut project = Project::new(1, "P", ProjectPolicy::default(), vec![target(1), target(2)]);
        project.targets[0].reject(TargetReason::NotVisible);
        project.propagate_rejection();
        assert!(!project.is_rejected());

        project.targets[1].reject(TargetReason::NeverRises);
        project.propagate_rejection();
        assert_eq!(project.rejection(), Some(ProjectReason::NoVisibleTargets));
    }

    #[test]
    fn test_propagation_reason_summary() {
        let mut project = Project::new(1, "P", ProjectPolicy::default(), vec![target(1), target(2)]);
        project.targets[0].reject(TargetReason::Complete);
        project.targets[1].reject(TargetReason::Complete);
        project.propagate_rejection();
        assert_eq!(project.rejection(), Some(ProjectReason::Complete));

        let mut project = Project::new(2, "P", ProjectPolicy::default(), vec![target(1), target(2)]);
        project.targets[0].reject(TargetReason::MoonAvoidance);
        project.targets[1].reject(TargetReason::AllExposurePlansRejected);
        project.propagate_rejection();
        assert_eq!(project.rejection(), Some(ProjectReason::AllTargetsRejected));
    }

    #[test]
    fn test_policy_horizon() {
        let mut policy = ProjectPolicy::default();
        policy.minimum_altitude = Degrees::new(20.0);
        assert_eq!(policy.horizon().altitude_at(Degrees::new(10.0)).value(), 20.0);
        assert_eq!(policy.minimum_time_span(), Duration::minutes(30));
        assert!(!policy.has_maximum_altitude());
    }

    #[test]
    fn test_project_deserialize() {
        let json = r#"{
            "id": 3,
            "name": "Orion widefield",
            "state": "active",
            "policy": { "minimum_time": 45, "meridian_window": 60 },
            "rule_weights": { "Project Priority": 80 },
            "targets": []
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.policy.minimum_time, 45);
        assert_eq!(project.policy.meridian_window, 60);
        assert_eq!(project.rule_weights.get("Project Priority"), Some(80.0));
        assert!(!project.is_rejected());
    }
}
