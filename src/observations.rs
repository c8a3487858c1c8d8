//! # Receivers and TDOA observations
//!
//! - [`Receiver`]: a ground station fixed in the Earth-fixed frame (km).
//! - [`ObservationSet`]: the ordered arrival epochs and the `epochs × receivers` TDOA
//!   matrix (seconds). Column 0 is the timing reference; its TDOA is 0 but is kept so that
//!   column `r` always belongs to receiver `r`.
//! - [`ReceiverGeometry`]: receiver positions re-expressed in the inertial frame at every
//!   epoch, since the receivers rotate with the Earth under the transmitters.
//!
//! Shape invariants (at least one epoch, one TDOA row per epoch, equal row lengths) are
//! checked once at construction so the numeric stages can index freely.

use nalgebra::{DMatrix, RowDVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::auth_errors::AuthError;
use crate::constants::{Degree, Kilometer};
use crate::ref_system::{geodetic_to_fixed, FrameConverter};
use crate::time::JulianDate;

/// A ground receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: Option<String>,
    /// Earth-fixed position in kilometers.
    pub position: Vector3<f64>,
}

impl Receiver {
    pub fn new(position: Vector3<f64>) -> Self {
        Receiver {
            name: None,
            position,
        }
    }

    pub fn named(name: impl Into<String>, position: Vector3<f64>) -> Self {
        Receiver {
            name: Some(name.into()),
            position,
        }
    }

    /// Place a receiver from WGS84 geodetic coordinates (height in km).
    pub fn from_geodetic(longitude: Degree, latitude: Degree, height: Kilometer) -> Self {
        Receiver::new(geodetic_to_fixed(longitude, latitude, height))
    }
}

/// Arithmetic mean of the receivers' Earth-fixed positions.
pub fn centroid(receivers: &[Receiver]) -> Vector3<f64> {
    let sum = receivers
        .iter()
        .fold(Vector3::zeros(), |acc, r| acc + r.position);
    sum / receivers.len().max(1) as f64
}

/// Arrival epochs and the matching TDOA matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    epochs: Vec<JulianDate>,
    tdoa: DMatrix<f64>,
}

impl ObservationSet {
    /// Build an observation set from epochs and an `epochs × receivers` TDOA matrix.
    ///
    /// Errors
    /// ------
    /// * [`AuthError::EmptyObservations`] when `epochs` is empty.
    /// * [`AuthError::EpochCountMismatch`] when the matrix row count differs from the epoch count.
    pub fn new(epochs: Vec<JulianDate>, tdoa: DMatrix<f64>) -> Result<Self, AuthError> {
        if epochs.is_empty() {
            return Err(AuthError::EmptyObservations);
        }
        if tdoa.nrows() != epochs.len() {
            return Err(AuthError::EpochCountMismatch {
                epochs: epochs.len(),
                rows: tdoa.nrows(),
            });
        }
        Ok(ObservationSet { epochs, tdoa })
    }

    /// Build an observation set from one TDOA vector per epoch.
    ///
    /// Errors
    /// ------
    /// * [`AuthError::TdoaShapeMismatch`] when a row length differs from the first row's.
    /// * Same as [`ObservationSet::new`] otherwise.
    pub fn from_rows(epochs: Vec<JulianDate>, rows: Vec<Vec<f64>>) -> Result<Self, AuthError> {
        if epochs.is_empty() || rows.is_empty() {
            return Err(AuthError::EmptyObservations);
        }
        if rows.len() != epochs.len() {
            return Err(AuthError::EpochCountMismatch {
                epochs: epochs.len(),
                rows: rows.len(),
            });
        }

        let width = rows[0].len();
        if let Some((epoch, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(AuthError::TdoaShapeMismatch {
                epoch,
                expected: width,
                found: row.len(),
            });
        }

        let tdoa = DMatrix::from_rows(
            &rows
                .iter()
                .map(|row| RowDVector::from_row_slice(row))
                .collect::<Vec<_>>(),
        );
        ObservationSet::new(epochs, tdoa)
    }

    pub fn epochs(&self) -> &[JulianDate] {
        &self.epochs
    }

    pub fn tdoa(&self) -> &DMatrix<f64> {
        &self.tdoa
    }

    /// Observed TDOA of receiver `receiver` at epoch `epoch`, in seconds.
    #[inline]
    pub fn tdoa_at(&self, epoch: usize, receiver: usize) -> f64 {
        self.tdoa[(epoch, receiver)]
    }

    pub fn epoch_count(&self) -> usize {
        self.epochs.len()
    }

    pub fn receiver_count(&self) -> usize {
        self.tdoa.ncols()
    }

    pub fn first_epoch(&self) -> &JulianDate {
        &self.epochs[0]
    }

    pub fn last_epoch(&self) -> &JulianDate {
        &self.epochs[self.epochs.len() - 1]
    }

    /// Check that the TDOA matrix has one column per receiver.
    pub fn check_receivers(&self, receivers: usize) -> Result<(), AuthError> {
        if self.receiver_count() != receivers {
            return Err(AuthError::TdoaShapeMismatch {
                epoch: 0,
                expected: receivers,
                found: self.receiver_count(),
            });
        }
        Ok(())
    }

    /// Keep only the given epochs (rows), in the given order.
    pub(crate) fn select_epochs(&self, indices: &[usize]) -> ObservationSet {
        ObservationSet {
            epochs: indices.iter().map(|&i| self.epochs[i]).collect(),
            tdoa: self.tdoa.select_rows(indices.iter()),
        }
    }

    /// Keep only the given receivers (columns), in the given order.
    pub(crate) fn select_receivers(&self, indices: &[usize]) -> ObservationSet {
        ObservationSet {
            epochs: self.epochs.clone(),
            tdoa: self.tdoa.select_columns(indices.iter()),
        }
    }
}

/// Receiver positions in the inertial frame, one snapshot per observation epoch.
#[derive(Debug, Clone)]
pub struct ReceiverGeometry {
    positions: Vec<Vec<Vector3<f64>>>,
    centroids: Vec<Vector3<f64>>,
}

impl ReceiverGeometry {
    /// Rotate every receiver, and the receiver centroid, into the inertial frame at every epoch.
    pub fn new(
        receivers: &[Receiver],
        epochs: &[JulianDate],
        frame: &dyn FrameConverter,
    ) -> ReceiverGeometry {
        let fixed_centroid = centroid(receivers);

        let (positions, centroids): (Vec<Vec<Vector3<f64>>>, Vec<Vector3<f64>>) = epochs
            .iter()
            .map(|epoch| {
                let snapshot = receivers
                    .iter()
                    .map(|r| frame.to_inertial(&r.position, epoch).0)
                    .collect::<Vec<_>>();
                (snapshot, frame.to_inertial(&fixed_centroid, epoch).0)
            })
            .unzip();

        ReceiverGeometry {
            positions,
            centroids,
        }
    }

    /// Inertial receiver positions at epoch index `epoch`.
    #[inline]
    pub fn at(&self, epoch: usize) -> &[Vector3<f64>] {
        &self.positions[epoch]
    }

    /// Inertial receiver centroid at epoch index `epoch`.
    #[inline]
    pub fn centroid_at(&self, epoch: usize) -> Vector3<f64> {
        self.centroids[epoch]
    }

    pub fn epoch_count(&self) -> usize {
        self.positions.len()
    }

    pub fn receiver_count(&self) -> usize {
        self.positions.first().map_or(0, |snapshot| snapshot.len())
    }
}
