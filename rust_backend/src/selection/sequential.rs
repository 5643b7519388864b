use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExposureSelection, ExposureSelector};
use crate::models::{ProjectPolicy, Target};

/// Cycles through a target's incomplete exposure plans in plan order.
///
/// A filter is repeated `filter_switch_frequency` times before moving on to
/// the next available plan; a frequency of zero stays on a filter until it is
/// complete or rejected. With a single plan left it is always returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequentialRepeatSelector {
    current: Option<usize>,
    taken_in_run: u32,
}

impl SequentialRepeatSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExposureSelector for SequentialRepeatSelector {
    fn select(&self, _at: DateTime<Utc>, policy: &ProjectPolicy, target: &Target) -> Option<ExposureSelection> {
        let available = target.available_indices();
        let first = *available.first()?;

        let index = if available.len() == 1 {
            first
        } else {
            let frequency = policy.filter_switch_frequency;
            match self.current {
                Some(current)
                    if available.contains(&current)
                        && (frequency == 0 || self.taken_in_run < frequency) =>
                {
                    current
                }
                Some(current) => available
                    .iter()
                    .copied()
                    .find(|&idx| idx > current)
                    .unwrap_or(first),
                None => first,
            }
        };

        Some(ExposureSelection {
            index,
            dither_before: false,
            step: index,
        })
    }

    fn advance(&mut self, selection: &ExposureSelection) {
        if self.current == Some(selection.index) {
            self.taken_in_run += 1;
        } else {
            self.current = Some(selection.index);
            self.taken_in_run = 1;
        }
    }

    fn contains_exposure_plan_idx(&self, _idx: usize) -> bool {
        true
    }

    fn uses_dither_counters(&self) -> bool {
        true
    }
}
