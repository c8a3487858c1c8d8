//! Deterministic subsampling of receivers and epochs.
//!
//! Large campaigns are thinned to a fixed number of receivers / measurements before
//! scoring. Indices are spread evenly over the input, first and last included, and the
//! TDOA matrix is re-sliced so that rows stay paired with their epoch and columns with
//! their receiver.

use crate::observations::{ObservationSet, Receiver};

/// Evenly spaced indices over `0..n`, inclusive of both ends.
///
/// Index `i` of the output is `⌊i · (n − 1) / (target − 1)⌋`, computed on integers so the
/// selection never depends on floating point rounding. Returns `0..n` when `n <= target`.
pub fn evenly_spaced_indices(n: usize, target: usize) -> Vec<usize> {
    if n <= target {
        return (0..n).collect();
    }
    match target {
        0 => Vec::new(),
        1 => vec![0],
        _ => (0..target).map(|i| i * (n - 1) / (target - 1)).collect(),
    }
}

/// Keep at most `cap` receivers, slicing the TDOA columns to match.
///
/// Receiver 0 is always kept, so the timing reference is preserved.
pub fn limit_receivers(
    receivers: &[Receiver],
    observations: &ObservationSet,
    cap: Option<usize>,
) -> (Vec<Receiver>, ObservationSet) {
    match cap {
        Some(cap) if receivers.len() > cap => {
            let indices = evenly_spaced_indices(receivers.len(), cap);
            let kept = indices.iter().map(|&i| receivers[i].clone()).collect();
            (kept, observations.select_receivers(&indices))
        }
        _ => (receivers.to_vec(), observations.clone()),
    }
}

/// Keep at most `cap` epochs, slicing the TDOA rows to match.
pub fn limit_epochs(observations: &ObservationSet, cap: Option<usize>) -> ObservationSet {
    match cap {
        Some(cap) if observations.epoch_count() > cap => {
            observations.select_epochs(&evenly_spaced_indices(observations.epoch_count(), cap))
        }
        _ => observations.clone(),
    }
}
