// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tolerance polygon geometry

use std::f64::consts::TAU;

use rand::Rng;
use thiserror::Error;

use crate::signal::Position;

/// Distance under which a point is considered to lie on an edge.
const BOUNDARY_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum PolygonError {
    #[error("a polygon needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    #[error("polygon vertex ({0}, {1}) is not finite")]
    NonFinite(f64, f64),
}

/// Closed ring of vertices delimiting the nominal region.
///
/// The ring always ends with a copy of its first vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePolygon {
    ring: Vec<Position>,
}

impl ReferencePolygon {
    /// Build a polygon from its vertices, closing the ring when the last
    /// vertex does not repeat the first one.
    pub fn new(vertices: Vec<Position>) -> Result<Self, PolygonError> {
        if let Some(bad) = vertices.iter().find(|v| !v.is_finite()) {
            return Err(PolygonError::NonFinite(bad.x, bad.y));
        }

        let mut distinct: Vec<Position> = Vec::with_capacity(vertices.len());
        for vertex in &vertices {
            if !distinct.contains(vertex) {
                distinct.push(*vertex);
            }
        }
        if distinct.len() < 3 {
            return Err(PolygonError::TooFewVertices(distinct.len()));
        }

        let mut ring = vertices;
        if ring.first() != ring.last() {
            ring.push(ring[0]);
        }
        Ok(Self { ring })
    }

    /// Field tolerance used when nothing else is configured.
    pub fn default_tolerance() -> Self {
        Self {
            ring: default_vertices()
                .into_iter()
                .chain(std::iter::once(Position::new(-2.0, 2.0)))
                .collect(),
        }
    }

    /// Random star-shaped polygon around `center`.
    ///
    /// Vertices are placed at increasing angles. `irregularity` (0..=1) jitters
    /// the angular steps, `spikeyness` (0..=1) the distance to the centre,
    /// which is drawn from a normal distribution around `average_radius` and
    /// clipped to `[0, 2 * average_radius]`. Coordinates are truncated to
    /// whole degrees.
    pub fn random<R: Rng>(
        center: Position,
        average_radius: f64,
        irregularity: f64,
        spikeyness: f64,
        vertex_count: usize,
        rng: &mut R,
    ) -> Result<Self, PolygonError> {
        if vertex_count < 3 {
            return Err(PolygonError::TooFewVertices(vertex_count));
        }

        let mean_step = TAU / vertex_count as f64;
        let jitter = irregularity.clamp(0.0, 1.0) * mean_step;
        let spread = spikeyness.clamp(0.0, 1.0) * average_radius;

        let steps: Vec<f64> = (0..vertex_count)
            .map(|_| rng.random_range(mean_step - jitter..=mean_step + jitter))
            .collect();
        let scale = steps.iter().sum::<f64>() / TAU;

        let mut angle = rng.random_range(0.0..TAU);
        let mut vertices = Vec::with_capacity(vertex_count);
        for step in steps {
            let radius =
                (average_radius + spread * standard_normal(rng)).clamp(0.0, 2.0 * average_radius);
            vertices.push(Position::new(
                (center.x + radius * angle.cos()).trunc(),
                (center.y + radius * angle.sin()).trunc(),
            ));
            angle += step / scale;
        }

        Self::new(vertices)
    }

    /// The closed ring, first vertex repeated at the end.
    pub fn ring(&self) -> &[Position] {
        &self.ring
    }

    /// Inclusive containment: points on an edge or a vertex are inside.
    pub fn contains(&self, point: Position) -> bool {
        let mut inside = false;

        for edge in self.ring.windows(2) {
            let (a, b) = (edge[0], edge[1]);
            if on_segment(point, a, b) {
                return true;
            }

            if (a.y > point.y) != (b.y > point.y) {
                let crossing = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if point.x < crossing {
                    inside = !inside;
                }
            }
        }

        inside
    }
}

/// Open vertex list of the field tolerance polygon.
pub fn default_vertices() -> Vec<Position> {
    [
        (-2.0, 2.0),
        (1.2, 2.2),
        (1.0, 0.0),
        (1.6, -1.8),
        (0.0, -2.5),
        (-1.0, -1.1),
        (-2.3, -1.1),
    ]
    .into_iter()
    .map(|(x, y)| Position::new(x, y))
    .collect()
}

fn on_segment(p: Position, a: Position, b: Position) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let length = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    if cross.abs() > BOUNDARY_EPSILON * length.max(1.0) {
        return false;
    }

    p.x >= a.x.min(b.x) - BOUNDARY_EPSILON
        && p.x <= a.x.max(b.x) + BOUNDARY_EPSILON
        && p.y >= a.y.min(b.y) - BOUNDARY_EPSILON
        && p.y <= a.y.max(b.y) + BOUNDARY_EPSILON
}

/// Box-Muller transform: z = sqrt(-2 * ln(u1)) * cos(2 * π * u2)
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // (0, 1] keeps ln finite
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
