//! Global candidate selection over the transmitter catalog.
//!
//! Every transmitter is propagated to the observation epochs and scored by its TDOA
//! disparity. A transmitter that is below the horizon of at least one receiver at the first
//! or the last epoch cannot have produced the whole arc, so its score is increased by the
//! largest disparity of the call (never by less than the smallest positive `f64`). The lowest
//! score wins, and on equal scores a visible transmitter ranks before an invisible one.

use log::{debug, warn};
use nalgebra::Vector3;

use crate::auth_errors::AuthError;
use crate::constants::MIN_RECEIVERS;
use crate::disparity::DisparityEvaluator;
use crate::ephemeris::EphemerisProvider;
use crate::observations::{ObservationSet, Receiver};
use crate::ref_system::FrameConverter;
use crate::visibility::visible_from_all;

use super::{condition, AuthParams, AuthenticationAlgorithm, RunBudget, Verdict};

/// Score of one catalog transmitter.
///
/// * `disparity` – raw RMS disparity, `+∞` when the transmitter could not be propagated.
/// * `visible` – above every receiver's horizon at both the first and last epoch.
/// * `score` – disparity plus the visibility penalty, used for the ranking.
/// * `first_position` – inertial position at the first epoch, when propagated.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub index: usize,
    pub disparity: f64,
    pub visible: bool,
    pub score: f64,
    pub first_position: Option<Vector3<f64>>,
}

/// First stage: picks the catalog transmitter that best explains the observations.
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    valid_names: Vec<String>,
    params: AuthParams,
}

impl CandidateSelector {
    /// Arguments
    /// -----------------
    /// * `valid_names`: whitelist of authorized transmitter names.
    /// * `params`: validated parameters, see [`AuthParams::builder`].
    pub fn new(valid_names: Vec<String>, params: AuthParams) -> Self {
        CandidateSelector {
            valid_names,
            params,
        }
    }

    pub fn params(&self) -> &AuthParams {
        &self.params
    }

    pub fn valid_names(&self) -> &[String] {
        &self.valid_names
    }

    /// `true` when `name` occurs, case-sensitively, inside some whitelist entry.
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.valid_names.iter().any(|entry| entry.contains(name))
    }

    /// Score every catalog transmitter, in catalog order.
    ///
    /// Errors
    /// -----------------
    /// * Input validation errors (receiver count, TDOA shape, empty catalog).
    /// * [`AuthError::NoUsableCandidate`] when no transmitter could be propagated.
    /// * [`AuthError::DeadlineExceeded`] / [`AuthError::Cancelled`].
    pub fn score(
        &self,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Vec<CandidateScore>, AuthError> {
        let input = condition(receivers, observations, catalog, frame, &self.params)?;
        let epochs = input.observations.epochs();
        let last = epochs.len() - 1;

        let mut tracks: Vec<Option<Vec<Vector3<f64>>>> = Vec::with_capacity(catalog.len());
        for index in 0..catalog.len() {
            budget.check()?;
            let track = epochs
                .iter()
                .map(|epoch| catalog.state_at(index, epoch).map(|state| state.position))
                .collect::<Result<Vec<_>, _>>();
            match track {
                Ok(track) => tracks.push(Some(track)),
                Err(source) => {
                    let err = AuthError::EphemerisLookup { index, source };
                    warn!("Candidate {index} excluded: {err}");
                    tracks.push(None);
                }
            }
        }

        let usable: Vec<Vec<Vector3<f64>>> = tracks.iter().flatten().cloned().collect();
        if usable.is_empty() {
            return Err(AuthError::NoUsableCandidate);
        }

        let evaluator = DisparityEvaluator::new(
            &input.geometry,
            &input.observations,
            self.params.signal_speed_km_s,
        )?;
        let usable_disparities = evaluator.evaluate_many(&usable, budget)?;
        let max_disparity = usable_disparities
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max);
        let penalty = max_disparity.max(f64::MIN_POSITIVE);
        let mut usable_disparities = usable_disparities.into_iter();

        let scores = tracks
            .iter()
            .enumerate()
            .map(|(index, track)| match track {
                Some(track) => {
                    let disparity = usable_disparities.next().unwrap_or(f64::INFINITY);
                    let visible = visible_from_all(input.geometry.at(0), &track[0])
                        && visible_from_all(input.geometry.at(last), &track[last]);
                    let score = if visible {
                        disparity
                    } else {
                        disparity + penalty
                    };
                    CandidateScore {
                        index,
                        disparity,
                        visible,
                        score,
                        first_position: Some(track[0]),
                    }
                }
                None => CandidateScore {
                    index,
                    disparity: f64::INFINITY,
                    visible: false,
                    score: f64::INFINITY,
                    first_position: None,
                },
            })
            .collect::<Vec<_>>();

        debug!(
            "Candidate scores: {:?}",
            scores.iter().map(|s| s.score).collect::<Vec<_>>()
        );
        Ok(scores)
    }

    /// Select the best matching transmitter and classify it against the whitelist.
    ///
    /// On equal scores visible transmitters come first, then the lowest catalog index. The
    /// verdict always carries the selected index and its first-epoch inertial position.
    pub fn select(
        &self,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Verdict, AuthError> {
        let scores = self.score(receivers, observations, catalog, frame, budget)?;

        let selected = scores
            .iter()
            .filter(|s| s.first_position.is_some() && !s.score.is_nan())
            .min_by(|a, b| {
                a.score
                    .total_cmp(&b.score)
                    .then_with(|| b.visible.cmp(&a.visible))
            })
            .ok_or(AuthError::NoUsableCandidate)?;
        let best = selected.index;

        let ties = scores
            .iter()
            .filter(|s| s.score == selected.score && s.visible == selected.visible)
            .count();
        if ties > 1 {
            debug!(
                "{ties} candidates share the minimal score {}, keeping index {best}",
                selected.score
            );
        }

        let authentic = catalog
            .name(best)
            .is_some_and(|name| self.is_whitelisted(name));
        debug!(
            "Selected candidate {best} ({:?}), disparity {:e}, authentic: {authentic}",
            catalog.name(best),
            selected.disparity
        );

        Ok(Verdict {
            authentic,
            matched_index: Some(best),
            estimated_position: selected.first_position,
            disparity: selected.disparity,
        })
    }
}

impl AuthenticationAlgorithm for CandidateSelector {
    fn minimal_receivers(&self) -> usize {
        self.params.used_receivers.unwrap_or(MIN_RECEIVERS)
    }

    fn authenticate(
        &self,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Verdict, AuthError> {
        self.select(receivers, observations, catalog, frame, budget)
    }
}
