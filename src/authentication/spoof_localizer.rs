//! Grid refinement of a provisional verdict.
//!
//! A satellite signal replayed from the ground is explained better by a point near the
//! receivers than by any orbiting transmitter. The localizer searches a [`SearchGrid`]
//! laid from the receiver centroid toward the selected transmitter, up to the height
//! threshold, and overrides the verdict when the best grid point is low enough and beats
//! the transmitter by the configured margin.
//!
//! The grid is rebuilt at every epoch from that epoch's centroid and transmitter position,
//! so grid point `i` follows the rotating receiver cluster. The reported spoofer position
//! is taken from the first epoch's grid.

use log::{debug, warn};
use nalgebra::Vector3;

use crate::auth_errors::AuthError;
use crate::disparity::DisparityEvaluator;
use crate::ephemeris::EphemerisProvider;
use crate::observations::{ObservationSet, Receiver};
use crate::ref_system::FrameConverter;

use super::{
    condition, first_minimum, AuthParams, AuthenticationAlgorithm, CandidateSelector, RunBudget,
    SearchGrid, Verdict,
};

/// Result of a grid search around one transmitter.
#[derive(Debug, Clone, PartialEq)]
pub struct GridOutcome {
    /// Index of the best grid point; the last index is the transmitter itself.
    pub best_index: usize,
    /// Inertial position (km) of the best point at the first epoch.
    pub best_position: Vector3<f64>,
    /// Geodetic height (km) of the best point.
    pub best_height_km: f64,
    pub best_disparity: f64,
    /// Disparity of the transmitter sample.
    pub baseline_disparity: f64,
    /// `1 − best / baseline`, 0 when the baseline is 0.
    pub improvement_ratio: f64,
    /// Height below the threshold and improvement above the margin.
    pub spoofed: bool,
}

/// Second stage: candidate selection followed by the near-ground grid search.
#[derive(Debug, Clone)]
pub struct SpoofLocalizer {
    selector: CandidateSelector,
}

impl SpoofLocalizer {
    pub fn new(selector: CandidateSelector) -> Self {
        SpoofLocalizer { selector }
    }

    pub fn selector(&self) -> &CandidateSelector {
        &self.selector
    }

    pub fn params(&self) -> &AuthParams {
        self.selector.params()
    }

    /// Search the grid between the receivers and transmitter `index`.
    ///
    /// Return
    /// -----------------
    /// * `Ok(None)` when the transmitter cannot be propagated at some epoch.
    ///
    /// Errors
    /// -----------------
    /// * Input validation errors, as for [`CandidateSelector::select`].
    /// * [`AuthError::DegenerateGeometry`] when the transmitter is not above the ellipsoid,
    ///   coincides with the centroid, or no grid point has a finite disparity.
    /// * [`AuthError::DeadlineExceeded`] / [`AuthError::Cancelled`].
    pub fn localize(
        &self,
        index: usize,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Option<GridOutcome>, AuthError> {
        let params = self.params();
        let input = condition(receivers, observations, catalog, frame, params)?;
        let epochs = input.observations.epochs();

        let mut grids = Vec::with_capacity(epochs.len());
        for (k, epoch) in epochs.iter().enumerate() {
            budget.check()?;
            let state = match catalog.state_at(index, epoch) {
                Ok(state) => state,
                Err(source) => {
                    let err = AuthError::EphemerisLookup { index, source };
                    warn!("Grid search skipped: {err}");
                    return Ok(None);
                }
            };

            let fixed = frame.to_fixed(&state.position, &state.velocity, epoch);
            let height = frame.to_geodetic(&fixed).height;
            if !(height > 0.0) {
                return Err(AuthError::DegenerateGeometry(format!(
                    "transmitter {index} height is {height} km at epoch {k}"
                )));
            }

            grids.push(SearchGrid::build(
                &input.geometry.centroid_at(k),
                &state.position,
                params.height_threshold_km / height,
                params,
            )?);
        }

        // One track per grid point, following that point through the epochs
        let tracks: Vec<Vec<Vector3<f64>>> = (0..params.grid_len())
            .map(|i| grids.iter().map(|grid| grid.points()[i]).collect())
            .collect();

        let evaluator = DisparityEvaluator::new(
            &input.geometry,
            &input.observations,
            params.signal_speed_km_s,
        )?;
        let scores = evaluator.evaluate_many(&tracks, budget)?;

        let (best_index, ties) = first_minimum(&scores)
            .filter(|&(best, _)| scores[best].is_finite())
            .ok_or_else(|| {
                AuthError::DegenerateGeometry("no grid point has a finite disparity".into())
            })?;
        if ties > 1 {
            debug!("{ties} grid points share the minimal disparity, keeping index {best_index}");
        }

        let best_disparity = scores[best_index];
        let baseline_disparity = scores[scores.len() - 1];
        let improvement_ratio = if baseline_disparity > 0.0 {
            1.0 - best_disparity / baseline_disparity
        } else {
            0.0
        };

        let best_position = grids[0].points()[best_index];
        let best_fixed = frame.to_fixed(&best_position, &Vector3::zeros(), &epochs[0]);
        let best_height_km = frame.to_geodetic(&best_fixed).height;

        let spoofed = best_height_km < params.height_threshold_km
            && improvement_ratio > params.improvement_margin;

        debug!(
            "Grid point {best_index}: height {best_height_km:.3} km, disparity {best_disparity:e} \
             vs {baseline_disparity:e}, improvement {improvement_ratio:.3}, spoofed: {spoofed}"
        );

        Ok(Some(GridOutcome {
            best_index,
            best_position,
            best_height_km,
            best_disparity,
            baseline_disparity,
            improvement_ratio,
            spoofed,
        }))
    }

    /// Confirm or override a provisional verdict.
    ///
    /// The provisional verdict is returned unchanged when it has no matched transmitter,
    /// when that transmitter cannot be propagated, or when the grid finds no spoofer.
    /// Otherwise the result is `authentic = false`, no matched index and the spoofer
    /// estimate.
    pub fn refine(
        &self,
        provisional: &Verdict,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Verdict, AuthError> {
        let Some(index) = provisional.matched_index else {
            return Ok(provisional.clone());
        };

        match self.localize(index, receivers, observations, catalog, frame, budget)? {
            Some(outcome) if outcome.spoofed => Ok(Verdict {
                authentic: false,
                matched_index: None,
                estimated_position: Some(outcome.best_position),
                disparity: outcome.best_disparity,
            }),
            _ => Ok(provisional.clone()),
        }
    }
}

impl AuthenticationAlgorithm for SpoofLocalizer {
    fn minimal_receivers(&self) -> usize {
        self.selector.minimal_receivers()
    }

    fn authenticate(
        &self,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Verdict, AuthError> {
        let provisional = self
            .selector
            .select(receivers, observations, catalog, frame, budget)?;
        self.refine(&provisional, receivers, observations, catalog, frame, budget)
    }
}
