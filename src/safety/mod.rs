// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Safety classification
//!
//! A position is classified against the tolerance polygon when one is
//! configured, otherwise against a fixed circle of radius
//! [`FALLBACK_RADIUS`] degrees.
//!
//! [`SafetyStatus::Borderline`] is part of the status vocabulary shared with
//! the plots and the session log, but neither rule produces it: both are
//! strictly in/out decisions.

pub mod polygon;

pub use polygon::{PolygonError, ReferencePolygon};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::signal::Position;

/// Radius of the circular tolerance used without a polygon.
pub const FALLBACK_RADIUS: f64 = 2.0;

/// Outcome of a safety check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyStatus {
    Nominal,
    Borderline,
    Fault,
}

impl SafetyStatus {
    /// Numeric code used in logs and plots.
    pub fn code(&self) -> u8 {
        match self {
            SafetyStatus::Nominal => 0,
            SafetyStatus::Borderline => 1,
            SafetyStatus::Fault => 2,
        }
    }
}

/// Classify `position` against `polygon`, or the fallback circle when `None`.
pub fn classify(position: Position, polygon: Option<&ReferencePolygon>) -> SafetyStatus {
    let inside = match polygon {
        Some(polygon) => polygon.contains(position),
        None => position.norm_squared() < FALLBACK_RADIUS * FALLBACK_RADIUS,
    };

    if inside {
        SafetyStatus::Nominal
    } else {
        SafetyStatus::Fault
    }
}

/// Tolerance region as it appears in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ToleranceShape {
    /// Explicit vertex list.
    Polygon { vertices: Vec<Position> },
    /// Random polygon drawn once at startup.
    Random {
        center: Position,
        average_radius: f64,
        irregularity: f64,
        spikeyness: f64,
        vertex_count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    /// No polygon: circle of radius [`FALLBACK_RADIUS`].
    Circle,
}

impl Default for ToleranceShape {
    fn default() -> Self {
        ToleranceShape::Polygon {
            vertices: polygon::default_vertices(),
        }
    }
}

impl ToleranceShape {
    /// Build the polygon this shape describes; `None` selects the circle.
    pub fn build(&self) -> Result<Option<ReferencePolygon>, PolygonError> {
        match self {
            ToleranceShape::Polygon { vertices } => ReferencePolygon::new(vertices.clone()).map(Some),
            ToleranceShape::Random {
                center,
                average_radius,
                irregularity,
                spikeyness,
                vertex_count,
                seed,
            } => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_os_rng(),
                };
                ReferencePolygon::random(
                    *center,
                    *average_radius,
                    *irregularity,
                    *spikeyness,
                    *vertex_count,
                    &mut rng,
                )
                .map(Some)
            }
            ToleranceShape::Circle => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn status_codes() {
        assert_eq!(SafetyStatus::Nominal.code(), 0);
        assert_eq!(SafetyStatus::Borderline.code(), 1);
        assert_eq!(SafetyStatus::Fault.code(), 2);
    }

    #[test]
    fn fallback_circle_threshold() {
        assert_eq!(classify(p(0.0, 0.0), None), SafetyStatus::Nominal);
        assert_eq!(classify(p(2.0, 0.0), None), SafetyStatus::Fault);
        assert_eq!(classify(p(1.0, 1.0), None), SafetyStatus::Nominal);
        assert_eq!(classify(p(0.0, -2.5), None), SafetyStatus::Fault);
    }

    #[test]
    fn polygon_path() {
        let polygon = ReferencePolygon::default_tolerance();
        assert_eq!(classify(p(0.0, 0.0), Some(&polygon)), SafetyStatus::Nominal);
        assert_eq!(classify(p(0.0, -2.5), Some(&polygon)), SafetyStatus::Nominal);
        assert_eq!(classify(p(50.0, -50.0), Some(&polygon)), SafetyStatus::Fault);
    }

    #[test]
    fn classify_is_idempotent_and_never_borderline() {
        let polygon = ReferencePolygon::default_tolerance();

        for i in -30..=30 {
            for j in -30..=30 {
                let position = p(i as f64 / 10.0, j as f64 / 10.0);
                for shape in [Some(&polygon), None] {
                    let first = classify(position, shape);
                    assert_eq!(first, classify(position, shape));
                    assert_ne!(first, SafetyStatus::Borderline);
                }
            }
        }
    }

    #[test]
    fn shapes_build_from_configuration() {
        let default = ToleranceShape::default().build().unwrap().unwrap();
        assert_eq!(default, ReferencePolygon::default_tolerance());

        assert_eq!(ToleranceShape::Circle.build().unwrap(), None);

        let random = ToleranceShape::Random {
            center: Position::ORIGIN,
            average_radius: 10.0,
            irregularity: 0.0,
            spikeyness: 0.0,
            vertex_count: 9,
            seed: Some(5),
        };
        let first = random.build().unwrap();
        assert_eq!(first, random.build().unwrap());

        let too_small = ToleranceShape::Polygon {
            vertices: vec![p(0.0, 0.0), p(1.0, 0.0)],
        };
        assert_eq!(too_small.build(), Err(PolygonError::TooFewVertices(2)));
    }

    #[test]
    fn shape_is_tagged_in_yaml() {
        let shape: ToleranceShape = serde_yml::from_str("shape: circle").unwrap();
        assert_eq!(shape, ToleranceShape::Circle);

        let yaml = "shape: polygon\nvertices:\n  - {x: 0, y: 0}\n  - {x: 1, y: 0}\n  - {x: 0, y: 1}\n";
        let shape: ToleranceShape = serde_yml::from_str(yaml).unwrap();
        assert!(shape.build().unwrap().unwrap().contains(p(0.2, 0.2)));
    }
}
