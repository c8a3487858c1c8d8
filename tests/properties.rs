mod common;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use common::*;
use nalgebra::{DMatrix, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tdoa_auth::{
    auth_errors::{AuthError, EphemerisError},
    authentication::{
        AuthParams, AuthenticationAlgorithm, CandidateSelector, RunBudget, SpoofLocalizer, Verdict,
    },
    ephemeris::{KeplerianElements, Motion, Transmitter, TransmitterCatalog},
    observations::{ObservationSet, Receiver},
    ref_system::EarthRotationFrame,
    time::JulianDate,
};

fn selector() -> CandidateSelector {
    CandidateSelector::new(vec!["OVERHEAD-1".into()], AuthParams::default())
}

/// Random network of `n` receivers within a few degrees of (lon, lat).
fn random_receivers(rng: &mut StdRng, n: usize, lon: f64, lat: f64) -> Vec<Receiver> {
    (0..n)
        .map(|_| {
            Receiver::from_geodetic(
                lon + rng.random_range(-4.0..4.0),
                lat + rng.random_range(-3.0..3.0),
                rng.random_range(0.0..1.5),
            )
        })
        .collect()
}

#[test]
fn selection_is_invariant_to_receiver_reordering() {
    let receivers = european_receivers();
    let epochs = epochs(4, 10.0);
    let catalog = scenario_catalog(&receivers, &epochs[0]);

    // Slightly perturbed measurements so that every candidate has a non-zero disparity
    let mut observations = observe_transmitter(&receivers, &epochs, &catalog, 1);
    let mut rng = StdRng::seed_from_u64(7_u64);
    let noisy = observations
        .tdoa()
        .map(|t| if t == 0.0 { 0.0 } else { t + rng.random_range(-1e-7..1e-7) });
    observations = ObservationSet::new(epochs.clone(), noisy).unwrap();

    // Receiver 0 stays the timing reference
    let order = [0, 4, 2, 5, 1, 3];
    let permuted: Vec<Receiver> = order.iter().map(|&i| receivers[i].clone()).collect();
    let tdoa = observations.tdoa();
    let permuted_tdoa = DMatrix::from_fn(tdoa.nrows(), tdoa.ncols(), |k, i| tdoa[(k, order[i])]);
    let permuted_obs = ObservationSet::new(epochs.clone(), permuted_tdoa).unwrap();

    let budget = RunBudget::unlimited();
    let direct = selector()
        .score(&receivers, &observations, &catalog, &EarthRotationFrame, &budget)
        .unwrap();
    let reordered = selector()
        .score(&permuted, &permuted_obs, &catalog, &EarthRotationFrame, &budget)
        .unwrap();

    for (a, b) in direct.iter().zip(&reordered) {
        assert_relative_eq!(a.score, b.score, max_relative = 1e-9);
        assert_eq!(a.visible, b.visible);
    }

    let v1 = selector()
        .select(&receivers, &observations, &catalog, &EarthRotationFrame, &budget)
        .unwrap();
    let v2 = selector()
        .select(&permuted, &permuted_obs, &catalog, &EarthRotationFrame, &budget)
        .unwrap();
    assert_eq!(v1.matched_index, v2.matched_index);
    assert_eq!(v1.authentic, v2.authentic);
}

#[test]
fn visibility_penalty_only_hits_invisible_candidates() {
    let receivers = european_receivers();
    let epochs = epochs(3, 15.0);
    let catalog = scenario_catalog(&receivers, &epochs[0]);
    let observations = observe_transmitter(&receivers, &epochs, &catalog, 0);

    let scores = selector()
        .score(
            &receivers,
            &observations,
            &catalog,
            &EarthRotationFrame,
            &RunBudget::unlimited(),
        )
        .unwrap();

    for s in &scores {
        if s.visible {
            assert_eq!(s.score, s.disparity);
        } else {
            assert!(s.score > s.disparity);
        }
    }
    assert!(scores[..3].iter().all(|s| s.visible));
    assert!(!scores[3].visible);
}

#[test]
fn true_sources_are_never_overridden() {
    let mut rng = StdRng::seed_from_u64(42_u64);
    let epochs = epochs(4, 5.0);

    for _ in 0..5 {
        let lon = rng.random_range(-60.0..60.0);
        let lat = rng.random_range(-50.0..50.0);
        let receivers = random_receivers(&mut rng, 5, lon, lat);
        let catalog = scenario_catalog(&receivers, &epochs[0]);
        let target = rng.random_range(0..3);
        let observations = observe_transmitter(&receivers, &epochs, &catalog, target);

        let localizer = SpoofLocalizer::new(selector());
        let verdict = localizer
            .authenticate(
                &receivers,
                &observations,
                &catalog,
                &EarthRotationFrame,
                &RunBudget::unlimited(),
            )
            .unwrap();

        assert_eq!(verdict.matched_index, Some(target));
        assert_eq!(verdict.authentic, target == 0);
    }
}

#[test]
fn invisible_exact_fit_loses_to_visible_candidate() {
    let receivers = european_receivers();
    let epochs = epochs(3, 15.0);
    let scenario = scenario_catalog(&receivers, &epochs[0]);
    let catalog = TransmitterCatalog::new(vec![
        scenario.transmitters()[3].clone(),
        scenario.transmitters()[0].clone(),
    ]);
    let observations = observe_transmitter(&receivers, &epochs, &catalog, 0);
    let budget = RunBudget::unlimited();

    let scores = selector()
        .score(&receivers, &observations, &catalog, &EarthRotationFrame, &budget)
        .unwrap();
    assert!(!scores[0].visible);
    assert!(scores[0].disparity < 1e-12);
    assert!(scores[1].visible);
    assert!(scores[0].score >= scores[1].score);

    let verdict = selector()
        .select(&receivers, &observations, &catalog, &EarthRotationFrame, &budget)
        .unwrap();
    assert_eq!(verdict.matched_index, Some(1));
    assert!(verdict.authentic);

    // Alone in the catalog it is still selected, but its score stays above its disparity
    let alone = TransmitterCatalog::new(vec![scenario.transmitters()[3].clone()]);
    let scores = selector()
        .score(&receivers, &observations, &alone, &EarthRotationFrame, &budget)
        .unwrap();
    assert!(scores[0].score > scores[0].disparity);
}

fn stale_catalog(receivers: &[Receiver], epoch: &JulianDate) -> TransmitterCatalog {
    let fresh = scenario_catalog(receivers, epoch);
    let stale = |index: usize| -> Motion {
        match &fresh.transmitters()[index].motion {
            Motion::Keplerian(elements) => Motion::Keplerian(KeplerianElements {
                reference_epoch: epoch.add_seconds(-30.0 * 86_400.0),
                ..elements.clone()
            }),
            other => other.clone(),
        }
    };

    TransmitterCatalog::new(vec![
        Transmitter::new("OVERHEAD-1", stale(0)),
        Transmitter::new("DECOY-A", fresh.transmitters()[1].motion.clone()),
        Transmitter::new("DECOY-A-OLD", stale(1)),
    ])
    .with_validity_window(7.0)
}

#[test]
fn ephemeris_failures_are_absorbed() {
    let receivers = european_receivers();
    let epochs = epochs(3, 10.0);
    let catalog = stale_catalog(&receivers, &epochs[0]);
    let observations = observe_transmitter(&receivers, &epochs, &catalog, 1);

    let scores = selector()
        .score(
            &receivers,
            &observations,
            &catalog,
            &EarthRotationFrame,
            &RunBudget::unlimited(),
        )
        .unwrap();
    assert!(scores[0].disparity.is_infinite());
    assert!(scores[2].score.is_infinite());
    assert!(scores[1].disparity < 1e-12);

    let verdict = SpoofLocalizer::new(selector())
        .authenticate(
            &receivers,
            &observations,
            &catalog,
            &EarthRotationFrame,
            &RunBudget::unlimited(),
        )
        .unwrap();
    assert_eq!(verdict.matched_index, Some(1));
}

#[test]
fn every_candidate_failing_is_an_error() {
    let receivers = european_receivers();
    let epochs = epochs(3, 10.0);
    let stale = stale_catalog(&receivers, &epochs[0]);
    let catalog = TransmitterCatalog::new(vec![
        stale.transmitters()[0].clone(),
        stale.transmitters()[2].clone(),
    ])
    .with_validity_window(7.0);
    let observations = ObservationSet::from_rows(epochs.clone(), vec![vec![0.0; 6]; 3]).unwrap();

    let err = selector()
        .select(
            &receivers,
            &observations,
            &catalog,
            &EarthRotationFrame,
            &RunBudget::unlimited(),
        )
        .unwrap_err();
    assert_eq!(err, AuthError::NoUsableCandidate);
}

#[test]
fn refinement_keeps_verdict_when_ephemeris_fails() {
    let receivers = european_receivers();
    let epochs = epochs(3, 10.0);
    let catalog = stale_catalog(&receivers, &epochs[0]);
    let observations = observe_transmitter(&receivers, &epochs, &catalog, 1);

    let provisional = Verdict {
        authentic: true,
        matched_index: Some(0),
        estimated_position: None,
        disparity: 0.5,
    };
    let refined = SpoofLocalizer::new(selector())
        .refine(
            &provisional,
            &receivers,
            &observations,
            &catalog,
            &EarthRotationFrame,
            &RunBudget::unlimited(),
        )
        .unwrap();
    assert_eq!(refined, provisional);
}

#[test]
fn ephemeris_error_is_reported_as_source() {
    let err = AuthError::EphemerisLookup {
        index: 2,
        source: EphemerisError::UnknownTransmitter(2),
    };
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "Transmitter index 2 is not in the catalog");
}

#[test]
fn run_budget_interrupts_the_search() {
    let receivers = european_receivers();
    let epochs = epochs(3, 10.0);
    let catalog = scenario_catalog(&receivers, &epochs[0]);
    let observations = observe_transmitter(&receivers, &epochs, &catalog, 0);
    let localizer = SpoofLocalizer::new(selector());

    let cancelled = RunBudget::unlimited().with_cancel_flag(Arc::new(AtomicBool::new(true)));
    assert_eq!(
        localizer
            .authenticate(&receivers, &observations, &catalog, &EarthRotationFrame, &cancelled)
            .unwrap_err(),
        AuthError::Cancelled
    );

    let expired = RunBudget::unlimited().with_deadline(Instant::now());
    assert_eq!(
        localizer
            .authenticate(&receivers, &observations, &catalog, &EarthRotationFrame, &expired)
            .unwrap_err(),
        AuthError::DeadlineExceeded
    );

    let generous = RunBudget::unlimited().with_timeout(Duration::from_secs(600));
    assert!(localizer
        .authenticate(&receivers, &observations, &catalog, &EarthRotationFrame, &generous)
        .is_ok());
}

#[test]
fn malformed_inputs_fail_fast() {
    let receivers = european_receivers();
    let epochs = epochs(2, 10.0);
    let catalog = scenario_catalog(&receivers, &epochs[0]);

    let observations = ObservationSet::from_rows(epochs.clone(), vec![vec![0.0; 6]; 2]).unwrap();
    assert_eq!(
        selector()
            .select(
                &receivers[..3],
                &observations,
                &catalog,
                &EarthRotationFrame,
                &RunBudget::unlimited()
            )
            .unwrap_err(),
        AuthError::InsufficientReceivers {
            found: 3,
            required: 4
        }
    );

    let narrow = ObservationSet::from_rows(epochs.clone(), vec![vec![0.0; 5]; 2]).unwrap();
    assert_eq!(
        selector()
            .select(
                &receivers,
                &narrow,
                &catalog,
                &EarthRotationFrame,
                &RunBudget::unlimited()
            )
            .unwrap_err(),
        AuthError::TdoaShapeMismatch {
            epoch: 0,
            expected: 6,
            found: 5
        }
    );
}

#[test]
fn verdict_serialization() {
    let verdict = Verdict {
        authentic: false,
        matched_index: None,
        estimated_position: Some(Vector3::new(4100.5, 720.25, 4800.0)),
        disparity: 2.5e-6,
    };
    let json = serde_json::to_string(&verdict).unwrap();
    let back: Verdict = serde_json::from_str(&json).unwrap();
    assert_eq!(verdict, back);

    let authentic = Verdict {
        authentic: true,
        matched_index: Some(3),
        estimated_position: None,
        disparity: 0.0,
    };
    let value = serde_json::to_value(&authentic).unwrap();
    assert_eq!(value["matched_index"], 3);
    assert!(value["estimated_position"].is_null());
}
