use std::f64::consts::PI;

use nalgebra::Vector3;
use roots::{find_root_newton_raphson, SimpleConvergency};
use serde::{Deserialize, Serialize};

use crate::{
    auth_errors::EphemerisError,
    constants::{Kilometer, Radian, DPI, EARTH_MU},
    ref_system::{rotmt, Axis},
    time::JulianDate,
};

use super::StateVector;

/// Keplerian orbital elements of an Earth-orbiting transmitter.
/// Units:
/// * `reference_epoch`: two-part Julian date (UTC)
/// * `semi_major_axis`: km
/// * `eccentricity`: unitless, in `[0, 1)`
/// * `inclination`: radians
/// * `ascending_node_longitude`: radians
/// * `periapsis_argument`: radians
/// * `mean_anomaly`: radians, at `reference_epoch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    pub reference_epoch: JulianDate,
    pub semi_major_axis: Kilometer,
    pub eccentricity: f64,
    pub inclination: Radian,
    pub ascending_node_longitude: Radian,
    pub periapsis_argument: Radian,
    pub mean_anomaly: Radian,
}

impl KeplerianElements {
    /// Mean motion in rad/s.
    pub fn mean_motion(&self) -> f64 {
        (EARTH_MU / self.semi_major_axis.powi(3)).sqrt()
    }

    /// Solve Kepler's equation `E - e sin E = M` for the eccentric anomaly.
    fn solve_kepler_equation(&self, mean_anomaly: Radian) -> Result<Radian, EphemerisError> {
        let ecc = self.eccentricity;
        let f = |e_anom: f64| -> f64 { e_anom - ecc * e_anom.sin() - mean_anomaly };
        let df = |e_anom: f64| -> f64 { 1.0 - ecc * e_anom.cos() };

        // Starting from π keeps Newton well behaved on highly eccentric orbits
        let x0 = if ecc > 0.8 { PI } else { mean_anomaly };

        let mut tol = SimpleConvergency {
            eps: f64::EPSILON * 1e2,
            max_iter: 25,
        };

        find_root_newton_raphson(x0, &f, &df, &mut tol)
            .map_err(|err| EphemerisError::KeplerNoConvergence(format!("{err:?}")))
    }

    /// Propagate the elements on the unperturbed two-body problem.
    ///
    /// Arguments
    /// ---------
    /// * `epoch`: the date at which the state is wanted.
    ///
    /// Return
    /// ------
    /// * Inertial position (km) and velocity (km/s) at `epoch`.
    ///
    /// Errors
    /// ------
    /// * [`EphemerisError::InvalidElements`] for non-elliptic or non-positive size orbits.
    /// * [`EphemerisError::KeplerNoConvergence`] if the Newton iteration fails.
    pub fn propagate(&self, epoch: &JulianDate) -> Result<StateVector, EphemerisError> {
        if !(self.semi_major_axis > 0.0) {
            return Err(EphemerisError::InvalidElements(format!(
                "semi-major axis must be positive, got {}",
                self.semi_major_axis
            )));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(EphemerisError::InvalidElements(format!(
                "eccentricity must lie in [0, 1), got {}",
                self.eccentricity
            )));
        }

        let n = self.mean_motion();
        let dt = epoch.seconds_since(&self.reference_epoch);
        let mean_anomaly = (self.mean_anomaly + n * dt).rem_euclid(DPI);
        let ecc_anomaly = self.solve_kepler_equation(mean_anomaly)?;

        let a = self.semi_major_axis;
        let ecc = self.eccentricity;
        let (sin_e, cos_e) = ecc_anomaly.sin_cos();
        let sqrt_one_minus_e2 = (1.0 - ecc * ecc).sqrt();

        // Perifocal frame: x toward periapsis, z along the angular momentum
        let radius = a * (1.0 - ecc * cos_e);
        let perifocal_position = Vector3::new(a * (cos_e - ecc), a * sqrt_one_minus_e2 * sin_e, 0.0);
        let v_scale = (EARTH_MU * a).sqrt() / radius;
        let perifocal_velocity =
            Vector3::new(-v_scale * sin_e, v_scale * sqrt_one_minus_e2 * cos_e, 0.0);

        let rot = rotmt(self.ascending_node_longitude, Axis::Z)
            * rotmt(self.inclination, Axis::X)
            * rotmt(self.periapsis_argument, Axis::Z);

        Ok(StateVector {
            position: rot * perifocal_position,
            velocity: rot * perifocal_velocity,
        })
    }
}

#[cfg(test)]
mod keplerian_test {
    use super::*;
    use approx::assert_relative_eq;

    fn leo(eccentricity: f64) -> KeplerianElements {
        KeplerianElements {
            reference_epoch: JulianDate::new(2459215.5, 0.0),
            semi_major_axis: 6_928.137,
            eccentricity,
            inclination: 53f64.to_radians(),
            ascending_node_longitude: 0.4,
            periapsis_argument: 1.1,
            mean_anomaly: 0.25,
        }
    }

    #[test]
    fn test_kepler_equation() {
        let elements = leo(0.3);
        let e_anom = elements.solve_kepler_equation(1.2).unwrap();
        assert_relative_eq!(e_anom - 0.3 * e_anom.sin(), 1.2, epsilon = 1e-13);
    }

    #[test]
    fn test_circular_orbit_radius_and_speed() {
        let elements = leo(0.0);
        let state = elements
            .propagate(&elements.reference_epoch.add_seconds(1234.0))
            .unwrap();

        assert_relative_eq!(state.position.norm(), 6_928.137, epsilon = 1e-6);
        let circular_speed = (EARTH_MU / 6_928.137).sqrt();
        assert_relative_eq!(state.velocity.norm(), circular_speed, epsilon = 1e-9);
        assert_relative_eq!(state.position.dot(&state.velocity), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_orbit_closes_after_one_period() {
        let elements = leo(0.1);
        let period = DPI / elements.mean_motion();

        let start = elements.propagate(&elements.reference_epoch).unwrap();
        let after = elements
            .propagate(&elements.reference_epoch.add_seconds(period))
            .unwrap();

        assert_relative_eq!(start.position, after.position, epsilon = 1e-4);
    }

    #[test]
    fn test_hyperbolic_elements_are_rejected() {
        let elements = leo(1.2);
        let err = elements.propagate(&elements.reference_epoch).unwrap_err();
        assert!(matches!(err, EphemerisError::InvalidElements(_)));
    }
}
