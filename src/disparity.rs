//! # TDOA disparity
//!
//! The disparity of a hypothesis is the RMS mismatch between the TDOA it predicts and the
//! TDOA the receivers observed:
//!
//! ```text
//!                  ┌                                                        ┐ 1/2
//!                  │      1       ⎲   ⎛ |p_k − r_k,i| − |p_k − r_k,0|          ⎞²│
//! disparity(p) =   │ ────────── · ⎳   ⎜ ───────────────────────────── − τ_k,i  ⎟ │
//!                  │ n_r · n_e   k,i  ⎝               c                        ⎠ │
//!                  └                                                        ┘
//! ```
//!
//! where `p_k` is the hypothesised source position at epoch `k`, `r_k,i` the inertial
//! position of receiver `i`, `τ_k,i` the observed TDOA and `c` the signal speed.
//! A disparity of 0 means the hypothesis reproduces every measurement.
//!
//! Both authentication stages go through [`DisparityEvaluator`]: the candidate stage with
//! one track per catalog transmitter, the grid stage with one track per mesh point.

use nalgebra::Vector3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::auth_errors::AuthError;
use crate::authentication::RunBudget;
use crate::observations::{ObservationSet, ReceiverGeometry};

/// Scores source position tracks against one observation set.
#[derive(Debug, Clone, Copy)]
pub struct DisparityEvaluator<'a> {
    geometry: &'a ReceiverGeometry,
    observations: &'a ObservationSet,
    signal_speed: f64,
}

impl<'a> DisparityEvaluator<'a> {
    /// Arguments
    /// ---------
    /// * `geometry`: inertial receiver positions at the observation epochs.
    /// * `observations`: observed TDOA, one row per epoch of `geometry`.
    /// * `signal_speed`: propagation speed in km/s.
    ///
    /// Errors
    /// ------
    /// * [`AuthError::EpochCountMismatch`] when `geometry` and `observations` disagree on
    ///   the number of epochs.
    /// * [`AuthError::TdoaShapeMismatch`] when they disagree on the number of receivers.
    pub fn new(
        geometry: &'a ReceiverGeometry,
        observations: &'a ObservationSet,
        signal_speed: f64,
    ) -> Result<Self, AuthError> {
        if geometry.epoch_count() != observations.epoch_count() {
            return Err(AuthError::EpochCountMismatch {
                epochs: geometry.epoch_count(),
                rows: observations.epoch_count(),
            });
        }
        observations.check_receivers(geometry.receiver_count())?;

        Ok(DisparityEvaluator {
            geometry,
            observations,
            signal_speed,
        })
    }

    /// Disparity of the track whose position at epoch index `k` is `position_at(k)`.
    pub fn evaluate_with<F>(&self, position_at: F) -> f64
    where
        F: Fn(usize) -> Vector3<f64>,
    {
        let n_epochs = self.observations.epoch_count();
        let n_receivers = self.observations.receiver_count();

        let sum_sq: f64 = (0..n_epochs)
            .map(|k| {
                let source = position_at(k);
                let receivers = self.geometry.at(k);
                let reference = (source - receivers[0]).norm() / self.signal_speed;

                receivers
                    .iter()
                    .enumerate()
                    .map(|(i, receiver)| {
                        let predicted = (source - receiver).norm() / self.signal_speed - reference;
                        (predicted - self.observations.tdoa_at(k, i)).powi(2)
                    })
                    .sum::<f64>()
            })
            .sum();

        (sum_sq / (n_receivers * n_epochs) as f64).sqrt()
    }

    /// Disparity of a track given as one position per epoch.
    ///
    /// Extra positions past the last epoch are ignored; a shorter track is an error.
    pub fn evaluate_track(&self, track: &[Vector3<f64>]) -> Result<f64, AuthError> {
        let epochs = self.observations.epoch_count();
        if track.len() < epochs {
            return Err(AuthError::TrackLengthMismatch {
                epochs,
                found: track.len(),
            });
        }
        Ok(self.evaluate_with(|k| track[k]))
    }

    /// Disparity of a source that does not move in the inertial frame.
    pub fn evaluate_static(&self, position: &Vector3<f64>) -> f64 {
        self.evaluate_with(|_| *position)
    }

    /// Disparity of many tracks, in input order.
    ///
    /// The budget is checked before every track. With the `parallel` feature the tracks
    /// are scored on the rayon thread pool.
    pub fn evaluate_many(
        &self,
        tracks: &[Vec<Vector3<f64>>],
        budget: &RunBudget,
    ) -> Result<Vec<f64>, AuthError> {
        #[cfg(feature = "parallel")]
        let iter = tracks.par_iter();
        #[cfg(not(feature = "parallel"))]
        let iter = tracks.iter();

        iter.map(|track| {
            budget.check()?;
            self.evaluate_track(track)
        })
        .collect()
    }
}
