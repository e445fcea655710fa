//! Quadric error metric.
//!
//! A quadric accumulates the squared distances from a point to a set of
//! planes. Summing the quadrics of two vertices ranks how much an edge
//! collapse would move the surface.

use std::ops::{Add, AddAssign};

/// Symmetric 4x4 matrix stored as its upper triangle:
///
/// ```text
/// [a b c d]
/// [  e f g]
/// [    h i]
/// [      j]
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quadric {
    m: [f64; 10],
}

impl Quadric {
    /// Quadric of the plane `ax + by + cz + d = 0` with a unit normal.
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            m: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    /// Quadric of the plane through a triangle, `None` if it has no area.
    pub fn from_triangle(p0: [f64; 3], p1: [f64; 3], p2: [f64; 3]) -> Option<Self> {
        let [a, b, c] = crate::mesh::triangle_normal(p0, p1, p2)?;
        let d = -(a * p0[0] + b * p0[1] + c * p0[2]);
        Some(Self::from_plane(a, b, c, d))
    }

    /// Sum of squared plane distances at `p`.
    pub fn evaluate(&self, p: [f64; 3]) -> f64 {
        let [a, b, c, d, e, f, g, h, i, j] = self.m;
        let [x, y, z] = p;
        a * x * x + 2.0 * b * x * y + 2.0 * c * x * z + 2.0 * d * x
            + e * y * y + 2.0 * f * y * z + 2.0 * g * y
            + h * z * z + 2.0 * i * z
            + j
    }

    /// Point minimizing the error, `None` when the system is singular.
    pub fn optimal_point(&self) -> Option<[f64; 3]> {
        let [a, b, c, d, e, f, g, h, i, _] = self.m;

        // Solve [a b c; b e f; c f h] * p = -[d g i] by cofactors
        let c00 = e * h - f * f;
        let c01 = c * f - b * h;
        let c02 = b * f - c * e;
        let det = a * c00 + b * c01 + c * c02;
        if det.abs() < 1e-10 {
            return None;
        }

        let c11 = a * h - c * c;
        let c12 = b * c - a * f;
        let c22 = a * e - b * b;
        let inv = 1.0 / det;
        Some([
            -(c00 * d + c01 * g + c02 * i) * inv,
            -(c01 * d + c11 * g + c12 * i) * inv,
            -(c02 * d + c12 * g + c22 * i) * inv,
        ])
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Self) {
        for (x, y) in self.m.iter_mut().zip(other.m) {
            *x += y;
        }
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}
