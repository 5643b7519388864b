//! Horizon definitions handed to the visibility oracle.

use qtty::Degrees;
use serde::{Deserialize, Serialize};

/// One sample of a measured local horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonPoint {
    pub azimuth: Degrees,
    pub altitude: Degrees,
}

/// The effective horizon for a project: a flat minimum altitude, or a
/// custom profile raised by `offset`, never below the minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonDefinition {
    pub minimum_altitude: Degrees,
    #[serde(default)]
    pub custom: Option<Vec<HorizonPoint>>,
    #[serde(default = "zero_degrees")]
    pub offset: Degrees,
}

fn zero_degrees() -> Degrees {
    Degrees::new(0.0)
}

impl HorizonDefinition {
    pub fn flat(minimum_altitude: Degrees) -> Self {
        Self {
            minimum_altitude,
            custom: None,
            offset: zero_degrees(),
        }
    }

    pub fn with_custom(minimum_altitude: Degrees, points: Vec<HorizonPoint>, offset: Degrees) -> Self {
        Self {
            minimum_altitude,
            custom: Some(points),
            offset,
        }
    }

    /// Altitude the target must clear at `azimuth`.
    ///
    /// Custom points are interpolated linearly, wrapping through 0°/360°.
    pub fn altitude_at(&self, azimuth: Degrees) -> Degrees {
        let points = match &self.custom {
            Some(points) if !points.is_empty() => points,
            _ => return self.minimum_altitude,
        };

        let mut sorted: Vec<HorizonPoint> = points.clone();
        sorted.sort_by(|a, b| {
            a.azimuth
                .value()
                .partial_cmp(&b.azimuth.value())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let az = azimuth.value().rem_euclid(360.0);
        let custom = if sorted.len() == 1 {
            sorted[0].altitude.value()
        } else {
            let upper = sorted.iter().position(|p| p.azimuth.value() >= az);
            let (lo, hi) = match upper {
                Some(0) | None => {
                    // Between the last point and the first one, across north.
                    (sorted[sorted.len() - 1], sorted[0])
                }
                Some(i) => (sorted[i - 1], sorted[i]),
            };
            let lo_az = lo.azimuth.value();
            let mut hi_az = hi.azimuth.value();
            let mut target_az = az;
            if hi_az < lo_az {
                hi_az += 360.0;
                if target_az < lo_az {
                    target_az += 360.0;
                }
            }
            let span = hi_az - lo_az;
            if span <= f64::EPSILON {
                lo.altitude.value()
            } else {
                let frac = (target_az - lo_az) / span;
                lo.altitude.value() + frac * (hi.altitude.value() - lo.altitude.value())
            }
        };

        Degrees::new((custom + self.offset.value()).max(self.minimum_altitude.value()))
    }
}

impl Default for HorizonDefinition {
    fn default() -> Self {
        Self::flat(zero_degrees())
    }
}
