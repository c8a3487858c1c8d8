//! # Transmitter ephemerides
//!
//! The authentication stages never propagate orbits themselves: they ask an
//! [`EphemerisProvider`] for the inertial state of each catalog entry at each epoch.
//! A provider owns the catalog (names + motion models) for the duration of a call.
//!
//! ## Failure semantics
//!
//! [`EphemerisProvider::state_at`] returns an [`EphemerisError`] when a state cannot be
//! computed (e.g. the epoch is far outside the validity window of the elements).
//! Callers treat such a candidate as having **maximal disparity** for the call instead of
//! aborting the authentication.
//!
//! ## Provided implementation
//!
//! [`TransmitterCatalog`] holds named [`Transmitter`]s whose [`Motion`] is either a
//! two-body Keplerian orbit ([`KeplerianElements`]) or a fixed inertial position. An
//! optional validity window reproduces the failure mode of catalog propagators fed with
//! stale elements.
//!
//! ```rust
//! use nalgebra::Vector3;
//! use tdoa_auth::ephemeris::{EphemerisProvider, Motion, Transmitter, TransmitterCatalog};
//! use tdoa_auth::time::JulianDate;
//!
//! let catalog = TransmitterCatalog::new(vec![Transmitter::new(
//!     "BEACON-1",
//!     Motion::Inertial(Vector3::new(7000.0, 0.0, 0.0)),
//! )]);
//! let state = catalog.state_at(0, &JulianDate::new(2459215.5, 0.25)).unwrap();
//! assert_eq!(state.position.x, 7000.0);
//! ```

pub mod keplerian;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::auth_errors::EphemerisError;
use crate::constants::SECONDS_PER_DAY;
use crate::time::JulianDate;

pub use keplerian::KeplerianElements;

/// Inertial position (km) and velocity (km/s) of a transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// Source of transmitter states, indexed by catalog position.
///
/// Implementations must be pure and safe for concurrent read-only queries.
pub trait EphemerisProvider: Sync {
    /// Number of transmitters in the catalog.
    fn len(&self) -> usize;

    /// `true` when the catalog has no transmitter.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the transmitter at `index`.
    fn name(&self, index: usize) -> Option<&str>;

    /// Inertial state of transmitter `index` at `epoch`.
    fn state_at(&self, index: usize, epoch: &JulianDate) -> Result<StateVector, EphemerisError>;

    /// States of every transmitter at every epoch, indexed `[transmitter][epoch]`.
    fn states_at(&self, epochs: &[JulianDate]) -> Vec<Vec<Result<StateVector, EphemerisError>>> {
        (0..self.len())
            .map(|index| {
                epochs
                    .iter()
                    .map(|epoch| self.state_at(index, epoch))
                    .collect()
            })
            .collect()
    }
}

/// Motion model of a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Unperturbed two-body orbit.
    Keplerian(KeplerianElements),
    /// Constant inertial position, zero velocity.
    Inertial(Vector3<f64>),
}

/// A named transmitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmitter {
    pub name: String,
    pub motion: Motion,
}

impl Transmitter {
    pub fn new(name: impl Into<String>, motion: Motion) -> Self {
        Transmitter {
            name: name.into(),
            motion,
        }
    }
}

/// In-memory catalog of transmitters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransmitterCatalog {
    transmitters: Vec<Transmitter>,
    validity_window_days: Option<f64>,
}

impl TransmitterCatalog {
    pub fn new(transmitters: Vec<Transmitter>) -> Self {
        TransmitterCatalog {
            transmitters,
            validity_window_days: None,
        }
    }

    /// Refuse to propagate Keplerian elements further than `days` from their epoch.
    pub fn with_validity_window(mut self, days: f64) -> Self {
        self.validity_window_days = Some(days);
        self
    }

    pub fn transmitters(&self) -> &[Transmitter] {
        &self.transmitters
    }

    pub fn push(&mut self, transmitter: Transmitter) {
        self.transmitters.push(transmitter);
    }
}

impl EphemerisProvider for TransmitterCatalog {
    fn len(&self) -> usize {
        self.transmitters.len()
    }

    fn name(&self, index: usize) -> Option<&str> {
        self.transmitters.get(index).map(|t| t.name.as_str())
    }

    fn state_at(&self, index: usize, epoch: &JulianDate) -> Result<StateVector, EphemerisError> {
        let transmitter = self
            .transmitters
            .get(index)
            .ok_or(EphemerisError::UnknownTransmitter(index))?;

        match &transmitter.motion {
            Motion::Inertial(position) => Ok(StateVector {
                position: *position,
                velocity: Vector3::zeros(),
            }),
            Motion::Keplerian(elements) => {
                if let Some(window_days) = self.validity_window_days {
                    let offset_days = epoch.seconds_since(&elements.reference_epoch) / SECONDS_PER_DAY;
                    if offset_days.abs() > window_days {
                        return Err(EphemerisError::OutsideValidityWindow {
                            offset_days,
                            window_days,
                        });
                    }
                }
                elements.propagate(epoch)
            }
        }
    }
}
