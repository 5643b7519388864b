//! Meridian flip safety clipping.
//!
//! Some mounts cannot track through the meridian. The profile defines a pause
//! before transit and a settle time after it; together with a fixed safety
//! padding they form an unsafe zone `[P, A]` around the transit time `T`:
//!
//! ```text
//! P = T - pause - 30s
//! A = T + after + 30s
//! ```
//!
//! A candidate visibility span `[S, E]` is either left alone, clipped to one
//! side of the zone, or rejected when it lies entirely inside it.

use chrono::{DateTime, Duration, Utc};

use crate::models::{minutes_to_duration, TimeInterval};

/// Padding added to both edges of the unsafe zone.
pub const SAFETY_PADDING_SECS: i64 = 30;

/// How a span relates to the unsafe zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipCase {
    /// No pause configured or no transit known.
    Disabled,
    /// `E <= P`: the zone starts after the span ends.
    ZoneAfterSpan,
    /// `S >= A`: the zone ended before the span starts.
    ZoneBeforeSpan,
    /// `S < P` and `E > A`: end is clipped to `P`.
    SpansZone,
    /// `S < P` and `P < E <= A`: end is clipped to `P`.
    EndsInZone,
    /// `P <= S < A` and `E > A`: start is clipped to `A`.
    StartsInZone,
    /// `S >= P` and `E <= A`: nothing safe is left.
    InsideZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeridianFlipClipper {
    zone: Option<TimeInterval>,
}

impl MeridianFlipClipper {
    /// Build the clipper for one transit.
    ///
    /// # Arguments
    /// * `transit` - Meridian transit time, `None` when the target never transits
    /// * `pause_minutes` - Minutes before transit the mount must stop tracking
    /// * `minutes_after` - Minutes after transit before tracking may resume
    pub fn new(transit: Option<DateTime<Utc>>, pause_minutes: f64, minutes_after: f64) -> Self {
        let padding = Duration::seconds(SAFETY_PADDING_SECS);
        let zone = match transit {
            Some(t) if pause_minutes > 0.0 => Some(TimeInterval::new(
                t - minutes_to_duration(pause_minutes) - padding,
                t + minutes_to_duration(minutes_after.max(0.0)) + padding,
            )),
            _ => None,
        };
        Self { zone }
    }

    pub fn unsafe_zone(&self) -> Option<TimeInterval> {
        self.zone
    }

    /// First instant after the flip at which imaging may resume (`A`).
    pub fn safe_after_time(&self) -> Option<DateTime<Utc>> {
        self.zone.map(|z| z.end())
    }

    pub fn classify(&self, span: &TimeInterval) -> ClipCase {
        let zone = match self.zone {
            Some(zone) => zone,
            None => return ClipCase::Disabled,
        };
        let (p, a) = (zone.start(), zone.end());
        let (s, e) = (span.start(), span.end());

        if e <= p {
            ClipCase::ZoneAfterSpan
        } else if s >= a {
            ClipCase::ZoneBeforeSpan
        } else if s < p {
            if e > a {
                ClipCase::SpansZone
            } else {
                ClipCase::EndsInZone
            }
        } else if e > a {
            ClipCase::StartsInZone
        } else {
            ClipCase::InsideZone
        }
    }

    /// Clip `span` against the unsafe zone; `None` when nothing safe is left.
    pub fn clip(&self, span: TimeInterval) -> Option<TimeInterval> {
        let zone = match self.zone {
            Some(zone) => zone,
            None => return Some(span),
        };

        match self.classify(&span) {
            ClipCase::Disabled | ClipCase::ZoneAfterSpan | ClipCase::ZoneBeforeSpan => Some(span),
            ClipCase::SpansZone | ClipCase::EndsInZone => {
                Some(TimeInterval::new(span.start(), zone.start()))
            }
            ClipCase::StartsInZone => Some(TimeInterval::new(zone.end(), span.end())),
            ClipCase::InsideZone => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 14, 20, 0, 0).unwrap()
    }

    fn span(from_min: i64, to_min: i64) -> TimeInterval {
        TimeInterval::new(start() + Duration::minutes(from_min), start() + Duration::minutes(to_min))
    }

    #[test]
    fn test_zone_after_span_is_unchanged() {
        let transit = start() + Duration::hours(3);
        let clipper = MeridianFlipClipper::new(Some(transit), 5.0, 5.0);
        let s = span(0, 120);
        assert_eq!(clipper.classify(&s), ClipCase::ZoneAfterSpan);
        assert_eq!(clipper.clip(s), Some(s));
    }

    #[test]
    fn test_span_inside_zone_is_rejected() {
        let transit = start() + Duration::minutes(10);
        let clipper = MeridianFlipClipper::new(Some(transit), 20.0, 20.0);
        let s = span(0, 15);
        assert_eq!(clipper.classify(&s), ClipCase::InsideZone);
        assert_eq!(clipper.clip(s), None);
    }

    #[test]
    fn test_zone_edges_include_padding() {
        let transit = start() + Duration::hours(1);
        let clipper = MeridianFlipClipper::new(Some(transit), 10.0, 5.0);
        let zone = clipper.unsafe_zone().unwrap();
        assert_eq!(zone.start(), transit - Duration::seconds(630));
        assert_eq!(zone.end(), transit + Duration::seconds(330));
        assert_eq!(clipper.safe_after_time(), Some(zone.end()));
    }

    #[test]
    fn test_clip_cases() {
        let transit = start() + Duration::hours(2);
        let clipper = MeridianFlipClipper::new(Some(transit), 10.0, 10.0);
        let zone = clipper.unsafe_zone().unwrap();

        let s = span(60, 180);
        assert_eq!(clipper.classify(&s), ClipCase::SpansZone);
        assert_eq!(clipper.clip(s).unwrap().end(), zone.start());

        let s = span(60, 125);
        assert_eq!(clipper.classify(&s), ClipCase::EndsInZone);
        assert_eq!(clipper.clip(s).unwrap().end(), zone.start());

        let s = span(115, 180);
        assert_eq!(clipper.classify(&s), ClipCase::StartsInZone);
        assert_eq!(clipper.clip(s).unwrap().start(), zone.end());

        let s = span(150, 240);
        assert_eq!(clipper.classify(&s), ClipCase::ZoneBeforeSpan);
        assert_eq!(clipper.clip(s), Some(s));
    }

    #[test]
    fn test_zero_pause_is_noop() {
        let transit = start() + Duration::minutes(30);
        let clipper = MeridianFlipClipper::new(Some(transit), 0.0, 10.0);
        let s = span(0, 60);
        assert_eq!(clipper.classify(&s), ClipCase::Disabled);
        assert_eq!(clipper.clip(s), Some(s));
        assert!(clipper.safe_after_time().is_none());
    }

    #[test]
    fn test_missing_transit_is_noop() {
        let clipper = MeridianFlipClipper::new(None, 10.0, 10.0);
        let s = span(0, 60);
        assert_eq!(clipper.clip(s), Some(s));
    }

    proptest! {
        #[test]
        fn test_clip_result_matches_case(
            from in 0i64..600,
            len in 1i64..600,
            transit_min in 0i64..900,
            pause in 1u32..60,
            after in 0u32..60,
        ) {
            let s = span(from, from + len);
            let transit = start() + Duration::minutes(transit_min);
            let clipper = MeridianFlipClipper::new(Some(transit), pause as f64, after as f64);
            let zone = clipper.unsafe_zone().unwrap();
            let clipped = clipper.clip(s);

            match clipper.classify(&s) {
                ClipCase::ZoneAfterSpan | ClipCase::ZoneBeforeSpan => prop_assert_eq!(clipped, Some(s)),
                ClipCase::SpansZone | ClipCase::EndsInZone => {
                    let c = clipped.unwrap();
                    prop_assert_eq!(c.start(), s.start());
                    prop_assert_eq!(c.end(), zone.start());
                }
                ClipCase::StartsInZone => {
                    let c = clipped.unwrap();
                    prop_assert_eq!(c.start(), zone.end());
                    prop_assert_eq!(c.end(), s.end());
                }
                ClipCase::InsideZone => prop_assert!(clipped.is_none()),
                ClipCase::Disabled => prop_assert!(false, "clipper with a pause is never disabled"),
            }

            // Whatever survives never overlaps the unsafe zone.
            if let Some(c) = clipped {
                prop_assert!(c.intersection(&zone).is_none());
            }
        }
    }
}
