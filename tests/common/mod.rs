#![allow(dead_code)]

use nalgebra::{DMatrix, Vector3};
use tdoa_auth::{
    constants::{EARTH_MAJOR_AXIS, VLIGHT},
    ephemeris::{EphemerisProvider, KeplerianElements, Motion, Transmitter, TransmitterCatalog},
    observations::{centroid, ObservationSet, Receiver},
    ref_system::{EarthRotationFrame, FrameConverter},
    time::JulianDate,
};

/// Receivers spread over central Europe, Paris first.
pub fn european_receivers() -> Vec<Receiver> {
    [
        ("PARIS", 2.35, 48.85, 0.035),
        ("MUNICH", 11.58, 48.14, 0.52),
        ("VIENNA", 16.37, 48.21, 0.19),
        ("MILAN", 9.19, 45.46, 0.12),
        ("FRANKFURT", 8.68, 50.11, 0.11),
        ("ZURICH", 8.54, 47.37, 0.41),
    ]
    .into_iter()
    .map(|(name, lon, lat, h)| Receiver {
        name: Some(name.into()),
        ..Receiver::from_geodetic(lon, lat, h)
    })
    .collect()
}

/// `n` epochs spaced by `step` seconds, starting 2021-01-01 06:00 UTC.
pub fn epochs(n: usize, step: f64) -> Vec<JulianDate> {
    let start = JulianDate::new(2459215.5, 0.25);
    (0..n).map(|k| start.add_seconds(step * k as f64)).collect()
}

/// Exact TDOA of a source whose inertial position at epoch `k` is `track[k]`.
pub fn synthesize_tdoa(
    receivers: &[Receiver],
    epochs: &[JulianDate],
    track: &[Vector3<f64>],
) -> ObservationSet {
    let frame = EarthRotationFrame;
    let tdoa = DMatrix::from_fn(epochs.len(), receivers.len(), |k, i| {
        let rec_i = frame.to_inertial(&receivers[i].position, &epochs[k]).0;
        let rec_0 = frame.to_inertial(&receivers[0].position, &epochs[k]).0;
        ((track[k] - rec_i).norm() - (track[k] - rec_0).norm()) / VLIGHT
    });
    ObservationSet::new(epochs.to_vec(), tdoa).unwrap()
}

/// TDOA of catalog transmitter `index`.
pub fn observe_transmitter(
    receivers: &[Receiver],
    epochs: &[JulianDate],
    catalog: &dyn EphemerisProvider,
    index: usize,
) -> ObservationSet {
    let track: Vec<_> = epochs
        .iter()
        .map(|e| catalog.state_at(index, e).unwrap().position)
        .collect();
    synthesize_tdoa(receivers, epochs, &track)
}

/// TDOA of an emitter fixed on the ground at Earth-fixed position `fixed`.
pub fn observe_ground_emitter(
    receivers: &[Receiver],
    epochs: &[JulianDate],
    fixed: &Vector3<f64>,
) -> ObservationSet {
    let frame = EarthRotationFrame;
    let track: Vec<_> = epochs.iter().map(|e| frame.to_inertial(fixed, e).0).collect();
    synthesize_tdoa(receivers, epochs, &track)
}

/// Inertial unit vector toward the receiver centroid at `epoch`.
pub fn centroid_direction(receivers: &[Receiver], epoch: &JulianDate) -> Vector3<f64> {
    EarthRotationFrame
        .to_inertial(&centroid(receivers), epoch)
        .0
        .normalize()
}

/// Circular orbit at `altitude` km that is exactly above inertial direction `direction` at
/// `epoch`. The inclination must exceed the latitude of `direction`.
pub fn orbit_over(
    direction: &Vector3<f64>,
    altitude: f64,
    inclination_deg: f64,
    epoch: JulianDate,
) -> KeplerianElements {
    let d = direction.normalize();
    let inclination = inclination_deg.to_radians();

    // Argument of latitude reaching the target latitude on the ascending pass
    let u = (d.z / inclination.sin()).asin();
    let in_plane = Vector3::new(u.cos(), u.sin() * inclination.cos(), u.sin() * inclination.sin());
    let node = d.y.atan2(d.x) - in_plane.y.atan2(in_plane.x);

    KeplerianElements {
        reference_epoch: epoch,
        semi_major_axis: EARTH_MAJOR_AXIS + altitude,
        eccentricity: 0.0,
        inclination,
        ascending_node_longitude: node,
        periapsis_argument: u,
        mean_anomaly: 0.0,
    }
}

/// Catalog with a LEO satellite over the receivers at the first epoch, two visible decoys
/// further away, and a transmitter on the far side of the Earth.
///
/// Indices: 0 `OVERHEAD-1`, 1 `DECOY-A`, 2 `DECOY-B`, 3 `FARSIDE`.
pub fn scenario_catalog(receivers: &[Receiver], epoch: &JulianDate) -> TransmitterCatalog {
    let up = centroid_direction(receivers, epoch);
    let east = Vector3::z().cross(&up).normalize();
    let north = up.cross(&east);

    TransmitterCatalog::new(vec![
        Transmitter::new(
            "OVERHEAD-1",
            Motion::Keplerian(orbit_over(&up, 550.0, 70.0, *epoch)),
        ),
        Transmitter::new(
            "DECOY-A",
            Motion::Keplerian(orbit_over(&(up + 0.08 * east), 780.0, 86.0, *epoch)),
        ),
        Transmitter::new(
            "DECOY-B",
            Motion::Inertial((up - 0.1 * north).normalize() * 26_560.0),
        ),
        Transmitter::new("FARSIDE", Motion::Inertial(-up * 26_560.0)),
    ])
}
