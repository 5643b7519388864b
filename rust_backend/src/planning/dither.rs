//! Dither history for the currently imaged target.
//!
//! The tracker remembers which filters were exposed since the last dither,
//! for a single target. Switching target invalidates the history.

use crate::models::TargetId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DitherTracker {
    target: Option<TargetId>,
    since_dither: Vec<String>,
}

impl DitherTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `dither_every` exposures of `filter` were taken on `target`
    /// since the last dither. Zero disables dithering.
    pub fn dither_due(&self, target: TargetId, filter: &str, dither_every: u32) -> bool {
        if dither_every == 0 || self.target != Some(target) {
            return false;
        }
        let taken = self.since_dither.iter().filter(|f| f.as_str() == filter).count();
        taken >= dither_every as usize
    }

    pub fn record_exposure(&mut self, target: TargetId, filter: &str) {
        self.invalidate(target);
        self.since_dither.push(filter.to_string());
    }

    pub fn record_dither(&mut self) {
        self.since_dither.clear();
    }

    /// Drop the history if it belongs to a different target.
    pub fn invalidate(&mut self, target: TargetId) {
        if self.target != Some(target) {
            self.target = Some(target);
            self.since_dither.clear();
        }
    }

    /// Forget everything, e.g. at the start of a session.
    pub fn clear(&mut self) {
        self.target = None;
        self.since_dither.clear();
    }

    pub fn history_len(&self) -> usize {
        self.since_dither.len()
    }
}
