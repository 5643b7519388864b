//! Rejection reasons attached to projects, targets and exposure plans.
//!
//! Rejections are the normal output of the planning pipeline, not errors.
//! Later stages branch on them, so the vocabulary is closed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectReason {
    Complete,
    NoVisibleTargets,
    MoonAvoidance,
    AllTargetsRejected,
}

impl ProjectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectReason::Complete => "complete",
            ProjectReason::NoVisibleTargets => "no visible targets",
            ProjectReason::MoonAvoidance => "moon avoidance",
            ProjectReason::AllTargetsRejected => "all targets rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetReason {
    Complete,
    NeverRises,
    NotVisible,
    NotYetVisible,
    MaxAltitude,
    MeridianWindowClipped,
    BeforeMeridianWindow,
    MeridianFlipClipped,
    MoonAvoidance,
    LowerScore,
    AllExposurePlansRejected,
}

impl TargetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetReason::Complete => "complete",
            TargetReason::NeverRises => "never rises",
            TargetReason::NotVisible => "not visible",
            TargetReason::NotYetVisible => "not yet visible",
            TargetReason::MaxAltitude => "above maximum altitude",
            TargetReason::MeridianWindowClipped => "clipped by meridian window",
            TargetReason::BeforeMeridianWindow => "before meridian window",
            TargetReason::MeridianFlipClipped => "clipped by meridian flip",
            TargetReason::MoonAvoidance => "moon avoidance",
            TargetReason::LowerScore => "lower score",
            TargetReason::AllExposurePlansRejected => "all exposure plans rejected",
        }
    }

    /// Reasons under which the target could still become imageable later
    /// tonight, making it a candidate for a future-start probe.
    pub fn may_become_visible(&self) -> bool {
        matches!(
            self,
            TargetReason::NotYetVisible
                | TargetReason::BeforeMeridianWindow
                | TargetReason::MeridianFlipClipped
                | TargetReason::MaxAltitude
                | TargetReason::MoonAvoidance
                | TargetReason::AllExposurePlansRejected
        )
    }

    /// Reasons produced by the visibility stage.
    pub fn is_visibility(&self) -> bool {
        matches!(
            self,
            TargetReason::NeverRises
                | TargetReason::NotVisible
                | TargetReason::NotYetVisible
                | TargetReason::MaxAltitude
                | TargetReason::MeridianWindowClipped
                | TargetReason::BeforeMeridianWindow
                | TargetReason::MeridianFlipClipped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureReason {
    Complete,
    MoonAvoidance,
    Twilight,
    NoExposuresPlanned,
}

impl ExposureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureReason::Complete => "complete",
            ExposureReason::MoonAvoidance => "moon avoidance",
            ExposureReason::Twilight => "twilight",
            ExposureReason::NoExposuresPlanned => "no exposures planned",
        }
    }
}

macro_rules! impl_reason_display {
    ($($reason:ty),*) => {
        $(
            impl std::fmt::Display for $reason {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_reason_display!(ProjectReason, TargetReason, ExposureReason);
