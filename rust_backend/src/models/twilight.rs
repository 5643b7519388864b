use serde::{Deserialize, Serialize};

/// Discrete sky brightness tiers, ordered from darkest to brightest.
///
/// An exposure plan's level is the *brightest* sky it tolerates: an exposure
/// marked `Nautical` may run during nautical, astronomical or full night,
/// but not during civil twilight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwilightLevel {
    #[default]
    Night,
    Astronomical,
    Nautical,
    Civil,
}

impl TwilightLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TwilightLevel::Night => "night",
            TwilightLevel::Astronomical => "astronomical",
            TwilightLevel::Nautical => "nautical",
            TwilightLevel::Civil => "civil",
        }
    }

    /// Whether an exposure tolerating `self` may run under a sky at `current`.
    /// An unknown current level (daylight) is never appropriate.
    pub fn permits(&self, current: Option<TwilightLevel>) -> bool {
        matches!(current, Some(level) if level <= *self)
    }
}

impl std::fmt::Display for TwilightLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
