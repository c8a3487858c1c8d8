//! # Reference frames
//!
//! Ground receivers are fixed in an **Earth-fixed** (rotating) frame while transmitter
//! ephemerides are naturally expressed in an **inertial** frame. Every TDOA prediction has
//! to put both in the same frame at the same instant, which is the job of a
//! [`FrameConverter`].
//!
//! ```text
//! Earth-fixed  --(rotation about z by GMST)-->  inertial (equator of date)
//!      |
//!      +--(WGS84 ellipsoid)-->  geodetic (longitude, latitude, height)
//! ```
//!
//! [`EarthRotationFrame`] is the converter shipped with the crate: it ignores polar motion
//! and the UT1 − UTC offset, which displaces ground points by well under a kilometer and
//! has no influence on the disparity ranking. Callers needing a full IERS reduction plug
//! their own [`FrameConverter`].

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{
    Degree, Kilometer, EARTH_INV_FLATTENING, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS,
    EARTH_ROTATION_RATE,
};
use crate::time::{gmst_at, JulianDate};

/// Coordinate axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Elementary rotation of angle `alpha` (radians) about one coordinate axis.
///
/// The rotation is **applied to the vector** in a fixed frame (active, right-handed),
/// it does not represent a change of basis. `rotmt(a, axis).inverse() == rotmt(-a, axis)`.
pub fn rotmt(alpha: f64, axis: Axis) -> Rotation3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };

    Rotation3::from_axis_angle(&axis, alpha)
}

/// Geodetic coordinates on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    /// Longitude in degrees, east positive.
    pub longitude: Degree,
    /// Geodetic latitude in degrees.
    pub latitude: Degree,
    /// Height above the ellipsoid in kilometers.
    pub height: Kilometer,
}

/// Conversion between the Earth-fixed frame, the inertial frame and geodetic coordinates.
///
/// Implementations must be pure: the same inputs always yield the same outputs, and
/// concurrent read-only calls are allowed.
pub trait FrameConverter: Sync {
    /// Earth-fixed position (km) to inertial position (km) and velocity (km/s) at `epoch`.
    fn to_inertial(
        &self,
        fixed: &Vector3<f64>,
        epoch: &JulianDate,
    ) -> (Vector3<f64>, Vector3<f64>);

    /// Inertial state to Earth-fixed position (km) at `epoch`.
    fn to_fixed(
        &self,
        position: &Vector3<f64>,
        velocity: &Vector3<f64>,
        epoch: &JulianDate,
    ) -> Vector3<f64>;

    /// Earth-fixed position (km) to geodetic coordinates.
    fn to_geodetic(&self, fixed: &Vector3<f64>) -> Geodetic;
}

/// Earth-fixed ↔ inertial conversion by a single rotation about the polar axis.
///
/// The rotation angle is the Greenwich Mean Sidereal Time of the epoch
/// ([`gmst_at`]); velocities of Earth-fixed points are `ω × r` with the sidereal
/// rotation rate. Geodetic conversion uses the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarthRotationFrame;

impl FrameConverter for EarthRotationFrame {
    fn to_inertial(
        &self,
        fixed: &Vector3<f64>,
        epoch: &JulianDate,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let rot = rotmt(gmst_at(epoch), Axis::Z);
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE);

        (rot * fixed, rot * omega.cross(fixed))
    }

    fn to_fixed(
        &self,
        position: &Vector3<f64>,
        _velocity: &Vector3<f64>,
        epoch: &JulianDate,
    ) -> Vector3<f64> {
        rotmt(-gmst_at(epoch), Axis::Z) * position
    }

    fn to_geodetic(&self, fixed: &Vector3<f64>) -> Geodetic {
        fixed_to_geodetic(fixed)
    }
}

/// First eccentricity squared of the WGS84 ellipsoid.
fn eccentricity_squared() -> f64 {
    let f = 1.0 / EARTH_INV_FLATTENING;
    f * (2.0 - f)
}

/// Convert geodetic coordinates into an Earth-fixed cartesian position.
///
/// Arguments
/// ---------
/// * `longitude`: degrees, east positive.
/// * `latitude`: geodetic latitude in degrees.
/// * `height`: height above the ellipsoid in kilometers.
///
/// Return
/// ------
/// * Earth-fixed position in kilometers.
pub fn geodetic_to_fixed(longitude: Degree, latitude: Degree, height: Kilometer) -> Vector3<f64> {
    let e2 = eccentricity_squared();
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();

    // Prime vertical radius of curvature
    let n = EARTH_MAJOR_AXIS / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - e2) + height) * sin_lat,
    )
}

/// Convert an Earth-fixed cartesian position (km) into WGS84 geodetic coordinates.
///
/// The latitude is refined by fixed-point iteration on the prime vertical radius; the
/// height is evaluated with the form that stays regular at the poles.
pub fn fixed_to_geodetic(fixed: &Vector3<f64>) -> Geodetic {
    const MAX_ITER: usize = 10;
    const LAT_EPS: f64 = 1e-14;

    let e2 = eccentricity_squared();
    let p = fixed.x.hypot(fixed.y);
    let longitude = fixed.y.atan2(fixed.x).to_degrees();

    if p < 1e-9 {
        let latitude = if fixed.z >= 0.0 { 90.0 } else { -90.0 };
        return Geodetic {
            longitude,
            latitude,
            height: fixed.z.abs() - EARTH_MINOR_AXIS,
        };
    }

    // Height above the ellipsoid along the normal at latitude `lat`
    let height_at = |lat: f64| -> (f64, f64) {
        let sin_lat = lat.sin();
        let n = EARTH_MAJOR_AXIS / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let height = p * lat.cos() + fixed.z * sin_lat - EARTH_MAJOR_AXIS * EARTH_MAJOR_AXIS / n;
        (n, height)
    };

    let mut lat = fixed.z.atan2(p * (1.0 - e2));
    for _ in 0..MAX_ITER {
        let (n, height) = height_at(lat);
        let next = fixed.z.atan2(p * (1.0 - e2 * n / (n + height)));
        let converged = (next - lat).abs() < LAT_EPS;
        lat = next;
        if converged {
            break;
        }
    }

    Geodetic {
        longitude,
        latitude: lat.to_degrees(),
        height: height_at(lat).1,
    }
}
