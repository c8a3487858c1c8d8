//! # Two-stage TDOA authentication
//!
//! Decide whether a signal received by a ground network comes from a known orbiting
//! transmitter, and localize near-ground spoofers.
//!
//! Pipeline
//! -----------------
//! 1) **Conditioning** – receivers and epochs are thinned with the
//!    [`sampling`](crate::sampling) helpers when [`AuthParams::used_receivers`] /
//!    [`AuthParams::used_measurements`] are set.
//! 2) **Candidate selection** ([`CandidateSelector`]) – every catalog transmitter is scored
//!    by its [TDOA disparity](crate::disparity); transmitters below the horizon of a receiver
//!    at the first or last epoch receive a penalty. The best score wins, and the verdict is
//!    authentic when its name is whitelisted.
//! 3) **Grid refinement** ([`SpoofLocalizer`]) – a thin box stretched from the receiver
//!    centroid toward the selected transmitter ([`SearchGrid`]) is searched for a point that
//!    explains the measurements much better than the transmitter itself. Such a point
//!    below the height threshold overrides the verdict: the signal is spoofed and the
//!    point is the spoofer estimate.
//!
//! Both stages implement [`AuthenticationAlgorithm`]; [`Authenticator`] wraps them for
//! callers that pick the algorithm at run time.
//!
//! Frames
//! -----------------
//! Receivers are given Earth-fixed. Transmitter states, mesh points and every
//! `estimated_position` of a [`Verdict`] are inertial, at the first (retained) epoch.
//!
//! Example
//! -----------------
//! ```rust,no_run
//! use tdoa_auth::authentication::{
//!     AuthParams, AuthenticationAlgorithm, CandidateSelector, RunBudget, SpoofLocalizer,
//! };
//! use tdoa_auth::ephemeris::TransmitterCatalog;
//! use tdoa_auth::observations::{ObservationSet, Receiver};
//! use tdoa_auth::ref_system::EarthRotationFrame;
//!
//! # let receivers: Vec<Receiver> = unimplemented!();
//! # let observations: ObservationSet = unimplemented!();
//! # let catalog: TransmitterCatalog = unimplemented!();
//! let params = AuthParams::builder().used_receivers(8).build().unwrap();
//! let localizer = SpoofLocalizer::new(CandidateSelector::new(vec!["NAV-01".into()], params));
//!
//! let verdict = localizer
//!     .authenticate(&receivers, &observations, &catalog, &EarthRotationFrame, &RunBudget::unlimited())
//!     .unwrap();
//! println!("authentic: {}", verdict.authentic);
//! ```

pub mod budget;
pub mod candidate_selector;
pub mod search_grid;
pub mod spoof_localizer;

use std::cmp::Ordering::{Equal, Greater, Less};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::auth_errors::AuthError;
use crate::constants::{
    DEFAULT_CROSS_AXIS_SAMPLES, DEFAULT_CROSS_HALF_WIDTH, DEFAULT_HEIGHT_THRESHOLD,
    DEFAULT_IMPROVEMENT_MARGIN, DEFAULT_LONG_AXIS_SAMPLES, MIN_RECEIVERS, VLIGHT,
};
use crate::ephemeris::EphemerisProvider;
use crate::observations::{ObservationSet, Receiver, ReceiverGeometry};
use crate::ref_system::FrameConverter;
use crate::sampling::{limit_epochs, limit_receivers};

pub use budget::RunBudget;
pub use candidate_selector::{CandidateScore, CandidateSelector};
pub use search_grid::SearchGrid;
pub use spoof_localizer::{GridOutcome, SpoofLocalizer};

/// Tunable constants of both authentication stages.
///
/// Fields
/// -----------------
/// **Conditioning**
/// * `used_receivers` – keep at most this many receivers (evenly spread, first and last
///   kept). `None` uses every receiver.
/// * `used_measurements` – keep at most this many epochs. `None` uses every epoch.
///
/// **Disparity**
/// * `signal_speed_km_s` – propagation speed of the signal.
///
/// **Grid refinement**
/// * `height_threshold_km` – geodetic height below which a better grid point counts as a
///   spoofer. It also sets the grid length: the box ends where the centroid → transmitter
///   segment would reach this height.
/// * `improvement_margin` – minimal relative disparity improvement
///   `1 − best / baseline` of the best grid point over the transmitter.
/// * `long_axis_samples` – grid samples along the centroid → transmitter axis.
/// * `cross_axis_samples` – grid samples along each of the two cross axes.
/// * `cross_half_width` – half width of the cross section, relative to the grid length.
///
/// Defaults
/// -----------------
/// * `signal_speed_km_s`: 299 792.458
/// * `used_receivers`, `used_measurements`: `None`
/// * `height_threshold_km`: 100.0
/// * `improvement_margin`: 0.4
/// * `long_axis_samples`: 20, `cross_axis_samples`: 3, `cross_half_width`: 0.05
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthParams {
    pub signal_speed_km_s: f64,
    pub used_receivers: Option<usize>,
    pub used_measurements: Option<usize>,
    pub height_threshold_km: f64,
    pub improvement_margin: f64,
    pub long_axis_samples: usize,
    pub cross_axis_samples: usize,
    pub cross_half_width: f64,
}

impl AuthParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fluent, validated construction of [`AuthParams`].
    ///
    /// ```rust
    /// use tdoa_auth::authentication::AuthParams;
    ///
    /// let params = AuthParams::builder()
    ///     .used_measurements(10)
    ///     .long_axis_samples(40)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(params.cross_axis_samples, 3);
    /// ```
    pub fn builder() -> AuthParamsBuilder {
        AuthParamsBuilder::new()
    }

    /// Number of grid points per epoch, the reference transmitter sample included.
    pub fn grid_len(&self) -> usize {
        self.long_axis_samples * self.cross_axis_samples * self.cross_axis_samples + 1
    }
}

impl Default for AuthParams {
    fn default() -> Self {
        AuthParams {
            signal_speed_km_s: VLIGHT,
            used_receivers: None,
            used_measurements: None,
            height_threshold_km: DEFAULT_HEIGHT_THRESHOLD,
            improvement_margin: DEFAULT_IMPROVEMENT_MARGIN,
            long_axis_samples: DEFAULT_LONG_AXIS_SAMPLES,
            cross_axis_samples: DEFAULT_CROSS_AXIS_SAMPLES,
            cross_half_width: DEFAULT_CROSS_HALF_WIDTH,
        }
    }
}

/// Builder for [`AuthParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct AuthParamsBuilder {
    params: AuthParams,
}

impl AuthParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: AuthParams::default(),
        }
    }

    pub fn signal_speed_km_s(mut self, v: f64) -> Self {
        self.params.signal_speed_km_s = v;
        self
    }
    pub fn used_receivers(mut self, v: usize) -> Self {
        self.params.used_receivers = Some(v);
        self
    }
    pub fn used_measurements(mut self, v: usize) -> Self {
        self.params.used_measurements = Some(v);
        self
    }
    pub fn height_threshold_km(mut self, v: f64) -> Self {
        self.params.height_threshold_km = v;
        self
    }
    pub fn improvement_margin(mut self, v: f64) -> Self {
        self.params.improvement_margin = v;
        self
    }
    pub fn long_axis_samples(mut self, v: usize) -> Self {
        self.params.long_axis_samples = v;
        self
    }
    pub fn cross_axis_samples(mut self, v: usize) -> Self {
        self.params.cross_axis_samples = v;
        self
    }
    pub fn cross_half_width(mut self, v: f64) -> Self {
        self.params.cross_half_width = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Validate and produce the [`AuthParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `signal_speed_km_s > 0`, `height_threshold_km > 0`.
    /// * `0 ≤ improvement_margin < 1`.
    /// * `long_axis_samples ≥ 2`, `cross_axis_samples ≥ 1`, `cross_half_width ≥ 0`.
    /// * `used_receivers ≥ 4` and `used_measurements ≥ 1` when set.
    ///
    /// Returns
    /// -----------------
    /// * `Err(AuthError::InvalidParameter)` naming the first rule that fails.
    pub fn build(self) -> Result<AuthParams, AuthError> {
        let p = &self.params;

        if !Self::gt0(p.signal_speed_km_s) || !p.signal_speed_km_s.is_finite() {
            return Err(AuthError::InvalidParameter(
                "signal_speed_km_s must be a positive finite speed".into(),
            ));
        }
        if !Self::gt0(p.height_threshold_km) {
            return Err(AuthError::InvalidParameter(
                "height_threshold_km must be > 0".into(),
            ));
        }
        if !Self::ge0(p.improvement_margin) || p.improvement_margin.partial_cmp(&1.0) != Some(Less)
        {
            return Err(AuthError::InvalidParameter(
                "improvement_margin must lie in [0, 1)".into(),
            ));
        }
        if p.long_axis_samples < 2 {
            return Err(AuthError::InvalidParameter(
                "long_axis_samples must be >= 2".into(),
            ));
        }
        if p.cross_axis_samples < 1 {
            return Err(AuthError::InvalidParameter(
                "cross_axis_samples must be >= 1".into(),
            ));
        }
        if !Self::ge0(p.cross_half_width) {
            return Err(AuthError::InvalidParameter(
                "cross_half_width must be >= 0".into(),
            ));
        }
        if p.used_receivers.is_some_and(|n| n < MIN_RECEIVERS) {
            return Err(AuthError::InvalidParameter(format!(
                "used_receivers must be >= {MIN_RECEIVERS}"
            )));
        }
        if p.used_measurements == Some(0) {
            return Err(AuthError::InvalidParameter(
                "used_measurements must be >= 1".into(),
            ));
        }

        Ok(self.params)
    }
}

/// Outcome of an authentication call.
///
/// * `authentic` – the signal is attributed to a whitelisted transmitter.
/// * `matched_index` – catalog index of the selected transmitter, `None` when the grid
///   stage attributed the signal to a near-ground spoofer.
/// * `estimated_position` – inertial position (km) at the first epoch of the selected
///   transmitter, or of the spoofer estimate.
/// * `disparity` – RMS TDOA disparity (s) of that hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub authentic: bool,
    pub matched_index: Option<usize>,
    pub estimated_position: Option<Vector3<f64>>,
    pub disparity: f64,
}

/// Common interface of the authentication stages.
pub trait AuthenticationAlgorithm {
    /// Receiver count a campaign should provide to this algorithm.
    fn minimal_receivers(&self) -> usize;

    /// Attribute the observed signal.
    ///
    /// Arguments
    /// -----------------
    /// * `receivers`: Earth-fixed receivers, receiver 0 being the timing reference.
    /// * `observations`: epochs and TDOA matrix, one column per receiver.
    /// * `catalog`: known transmitters.
    /// * `frame`: Earth-fixed ↔ inertial conversion.
    /// * `budget`: deadline / cancellation checked during the search.
    fn authenticate(
        &self,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Verdict, AuthError>;
}

/// Run-time choice between the two stages.
#[derive(Debug, Clone)]
pub enum Authenticator {
    Candidate(CandidateSelector),
    Grid(SpoofLocalizer),
}

impl AuthenticationAlgorithm for Authenticator {
    fn minimal_receivers(&self) -> usize {
        match self {
            Authenticator::Candidate(selector) => selector.minimal_receivers(),
            Authenticator::Grid(localizer) => localizer.minimal_receivers(),
        }
    }

    fn authenticate(
        &self,
        receivers: &[Receiver],
        observations: &ObservationSet,
        catalog: &dyn EphemerisProvider,
        frame: &dyn FrameConverter,
        budget: &RunBudget,
    ) -> Result<Verdict, AuthError> {
        match self {
            Authenticator::Candidate(selector) => {
                selector.authenticate(receivers, observations, catalog, frame, budget)
            }
            Authenticator::Grid(localizer) => {
                localizer.authenticate(receivers, observations, catalog, frame, budget)
            }
        }
    }
}

impl From<CandidateSelector> for Authenticator {
    fn from(selector: CandidateSelector) -> Self {
        Authenticator::Candidate(selector)
    }
}

impl From<SpoofLocalizer> for Authenticator {
    fn from(localizer: SpoofLocalizer) -> Self {
        Authenticator::Grid(localizer)
    }
}

/// Validated and thinned inputs of one call, with the inertial receiver geometry.
#[derive(Debug, Clone)]
pub(crate) struct Conditioned {
    pub(crate) observations: ObservationSet,
    pub(crate) geometry: ReceiverGeometry,
}

/// Check the call inputs, apply the receiver / epoch caps and rotate the receivers into the
/// inertial frame.
pub(crate) fn condition(
    receivers: &[Receiver],
    observations: &ObservationSet,
    catalog: &dyn EphemerisProvider,
    frame: &dyn FrameConverter,
    params: &AuthParams,
) -> Result<Conditioned, AuthError> {
    if receivers.len() < MIN_RECEIVERS {
        return Err(AuthError::InsufficientReceivers {
            found: receivers.len(),
            required: MIN_RECEIVERS,
        });
    }
    observations.check_receivers(receivers.len())?;
    if catalog.is_empty() {
        return Err(AuthError::EmptyCatalog);
    }

    let (receivers, observations) = limit_receivers(receivers, observations, params.used_receivers);
    let observations = limit_epochs(&observations, params.used_measurements);
    let geometry = ReceiverGeometry::new(&receivers, observations.epochs(), frame);

    Ok(Conditioned {
        observations,
        geometry,
    })
}

/// Index of the first minimum of `scores`, ignoring NaN, with the number of entries equal
/// to it.
pub(crate) fn first_minimum(scores: &[f64]) -> Option<(usize, usize)> {
    let mut best: Option<usize> = None;
    for (i, &score) in scores.iter().enumerate() {
        if !score.is_nan() && best.map_or(true, |b| score < scores[b]) {
            best = Some(i);
        }
    }
    best.map(|b| (b, scores.iter().filter(|&&s| s == scores[b]).count()))
}
