//! Oriented search volume between the receiver cluster and a transmitter.
//!
//! A canonical box `x ∈ [0, 1]`, `y, z ∈ [−w, w]` is sampled on a regular mesh, then
//! rotated so that its long axis points from the receiver centroid to the transmitter,
//! scaled and translated onto the centroid. The transmitter position is appended as the
//! last sample so every search carries its own reference score.
//!
//! Orientation
//! -----------------
//! With `d` the unit centroid → transmitter vector:
//!
//! ```text
//! angle_y = ± acos(d.x / |(d.x, d.z)|)     (− when d.z < 0)      Ry(angle_y) d  has z = 0
//! d'      = Ry(angle_y) d
//! angle_z = ± acos(d'.x / |(d'.x, d'.y)|)  (− when d'.y > 0)     Rz(angle_z) d' = x̂
//! mesh    = Ry(−angle_y) Rz(−angle_z) mesh
//! ```

use itertools::iproduct;
use nalgebra::Vector3;

use crate::auth_errors::AuthError;
use crate::ref_system::{rotmt, Axis};

use super::AuthParams;

/// `n` evenly spaced samples over `[start, end]`; a single sample sits at the middle.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.5 * (start + end)],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Sampled search volume for one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGrid {
    points: Vec<Vector3<f64>>,
}

impl SearchGrid {
    /// Unit mesh before orientation, enumerated `y` outer, `x` middle, `z` inner.
    pub fn canonical(params: &AuthParams) -> Vec<Vector3<f64>> {
        let w = params.cross_half_width;
        let xs = linspace(0.0, 1.0, params.long_axis_samples);
        let ys = linspace(-w, w, params.cross_axis_samples);
        let zs = linspace(-w, w, params.cross_axis_samples);

        iproduct!(ys.iter(), xs.iter(), zs.iter())
            .map(|(&y, &x, &z)| Vector3::new(x, y, z))
            .collect()
    }

    /// Rotation angles `(angle_y, angle_z)` that bring the unit vector `d` onto `x̂`.
    pub fn alignment_angles(d: &Vector3<f64>) -> (f64, f64) {
        let magnitude_xz = d.x.hypot(d.z);
        // Along ±y the first rotation is free
        let angle_y = if magnitude_xz > 0.0 {
            let angle = (d.x / magnitude_xz).clamp(-1.0, 1.0).acos();
            if d.z < 0.0 {
                -angle
            } else {
                angle
            }
        } else {
            0.0
        };

        let d2 = rotmt(angle_y, Axis::Y) * d;
        let magnitude_xy = d2.x.hypot(d2.y);
        let angle_z = (d2.x / magnitude_xy).clamp(-1.0, 1.0).acos();
        let angle_z = if d2.y > 0.0 { -angle_z } else { angle_z };

        (angle_y, angle_z)
    }

    /// Build the grid from `start` (receiver centroid) toward `end` (transmitter).
    ///
    /// Arguments
    /// -----------------
    /// * `start`, `end`: inertial positions (km).
    /// * `length_factor`: fraction of `|end − start|` covered by the long axis.
    /// * `params`: mesh resolution and cross-section width.
    ///
    /// Errors
    /// -----------------
    /// * [`AuthError::DegenerateGeometry`] when `start` and `end` coincide or the mesh
    ///   is not finite.
    pub fn build(
        start: &Vector3<f64>,
        end: &Vector3<f64>,
        length_factor: f64,
        params: &AuthParams,
    ) -> Result<SearchGrid, AuthError> {
        let direction = end - start;
        let magnitude = direction.norm();
        if !(magnitude > 0.0) || !magnitude.is_finite() {
            return Err(AuthError::DegenerateGeometry(format!(
                "centroid to transmitter distance is {magnitude} km"
            )));
        }

        let (angle_y, angle_z) = Self::alignment_angles(&(direction / magnitude));
        let rotation = rotmt(-angle_y, Axis::Y) * rotmt(-angle_z, Axis::Z);
        let scale = magnitude * length_factor;

        let mut points: Vec<Vector3<f64>> = Self::canonical(params)
            .iter()
            .map(|p| rotation * p * scale + start)
            .collect();
        points.push(*end);

        if points.iter().any(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(AuthError::DegenerateGeometry(
                "search grid has non-finite points".into(),
            ));
        }

        Ok(SearchGrid { points })
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the appended transmitter sample.
    pub fn reference_index(&self) -> usize {
        self.points.len() - 1
    }
}
