//! Planner output consumed by the execution layer.

use chrono::{DateTime, Utc};
use qtty::Seconds;
use serde::Serialize;

use crate::models::{
    Coordinates, ExposurePlan, ExposurePlanId, Project, ProjectId, ProjectPolicy, RuleWeights, Target, TargetId,
    TimeInterval,
};

/// A target detached from its project for execution, carrying the project
/// data the planner needs on the next cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTarget {
    pub project_id: ProjectId,
    pub project_name: String,
    pub policy: ProjectPolicy,
    pub rule_weights: RuleWeights,
    pub target: Target,
}

impl ActiveTarget {
    pub fn from_project(project: &Project, target: Target) -> Self {
        Self {
            project_id: project.id,
            project_name: project.name.clone(),
            policy: project.policy.clone(),
            rule_weights: project.rule_weights.clone(),
            target,
        }
    }

    pub fn target_id(&self) -> TargetId {
        self.target.id
    }

    pub fn selected_exposure(&self) -> Option<&ExposurePlan> {
        self.target.selected_exposure()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanInstruction {
    Slew {
        target_id: TargetId,
        target_name: String,
        coordinates: Coordinates,
        rotation: f64,
    },
    SwitchFilter {
        filter_name: String,
    },
    Dither,
    TakeExposure {
        exposure_plan_id: ExposurePlanId,
        filter_name: String,
        exposure_length: Seconds,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagingPlan {
    pub active: ActiveTarget,
    /// `[at, at + exposure length]` of the selected exposure.
    pub time_interval: TimeInterval,
    pub instructions: Vec<PlanInstruction>,
    /// Produced by the continuation fast path rather than a full pass.
    pub continuation: bool,
}

impl ImagingPlan {
    pub fn filter_name(&self) -> Option<&str> {
        self.active.selected_exposure().map(|e| e.filter_name.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum SchedulerPlan {
    Imaging(ImagingPlan),
    /// Nothing can image now; `next_target` becomes ready at `until`.
    Wait {
        until: DateTime<Utc>,
        next_target: Option<ActiveTarget>,
        park: bool,
    },
    /// Nothing left to image tonight.
    NoPlan,
}

impl SchedulerPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerPlan::Imaging(_) => "imaging",
            SchedulerPlan::Wait { .. } => "wait",
            SchedulerPlan::NoPlan => "no plan",
        }
    }

    pub fn imaging(&self) -> Option<&ImagingPlan> {
        match self {
            SchedulerPlan::Imaging(plan) => Some(plan),
            _ => None,
        }
    }
}
