//! Exposure ordering strategies.
//!
//! A selector decides which exposure plan of a target runs next. Every
//! strategy implements [`ExposureSelector`]; targets carry a
//! [`SelectorKind`] so the choice serializes with the target and can be
//! cloned into a plan.
//!
//! - [`sequential`]: cycle through incomplete plans, switching filter every
//!   `filter_switch_frequency` exposures
//! - [`override_order`]: follow an explicit, user-authored step list
//!
//! Selection is split from advancement: [`ExposureSelector::select`] only
//! reads state, so it can be called any number of times while probing, and
//! [`ExposureSelector::advance`] is called once the planner commits a plan.

pub mod override_order;
pub mod sequential;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProjectPolicy, Target};

pub use override_order::{OverrideOrderSelector, OverrideStep};
pub use sequential::SequentialRepeatSelector;

/// Outcome of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureSelection {
    /// Index into the target's exposure plans.
    pub index: usize,
    /// The strategy asks for a dither before this exposure.
    pub dither_before: bool,
    /// Strategy-specific position the selection was taken from.
    pub step: usize,
}

pub trait ExposureSelector {
    /// Pick the next exposure plan among the target's incomplete,
    /// non-rejected plans. `None` when nothing is available.
    fn select(&self, at: DateTime<Utc>, policy: &ProjectPolicy, target: &Target) -> Option<ExposureSelection>;

    /// Record that `selection` was committed to a plan.
    fn advance(&mut self, selection: &ExposureSelection);

    /// Whether the plan at `idx` takes part in this ordering.
    fn contains_exposure_plan_idx(&self, idx: usize) -> bool;

    /// Whether dithering is left to the dither-every counters rather than
    /// expressed by the ordering itself.
    fn uses_dither_counters(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SelectorKind {
    SequentialRepeat(SequentialRepeatSelector),
    OverrideOrder(OverrideOrderSelector),
}

impl Default for SelectorKind {
    fn default() -> Self {
        SelectorKind::SequentialRepeat(SequentialRepeatSelector::default())
    }
}

impl SelectorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SelectorKind::SequentialRepeat(_) => "sequential-repeat",
            SelectorKind::OverrideOrder(_) => "override-order",
        }
    }

    fn inner(&self) -> &dyn ExposureSelector {
        match self {
            SelectorKind::SequentialRepeat(s) => s,
            SelectorKind::OverrideOrder(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ExposureSelector {
        match self {
            SelectorKind::SequentialRepeat(s) => s,
            SelectorKind::OverrideOrder(s) => s,
        }
    }
}

impl ExposureSelector for SelectorKind {
    fn select(&self, at: DateTime<Utc>, policy: &ProjectPolicy, target: &Target) -> Option<ExposureSelection> {
        self.inner().select(at, policy, target)
    }

    fn advance(&mut self, selection: &ExposureSelection) {
        self.inner_mut().advance(selection)
    }

    fn contains_exposure_plan_idx(&self, idx: usize) -> bool {
        self.inner().contains_exposure_plan_idx(idx)
    }

    fn uses_dither_counters(&self) -> bool {
        self.inner().uses_dither_counters()
    }
}
