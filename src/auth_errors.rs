use thiserror::Error;

/// Failure of an ephemeris provider to report a transmitter state.
///
/// These errors are **per candidate and per epoch**: the authentication stages absorb
/// them by giving the candidate an infinite disparity rather than aborting the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("Transmitter index {0} is not in the catalog")]
    UnknownTransmitter(usize),

    #[error("Epoch is {offset_days:.3} days away from the element epoch (validity window: {window_days} days)")]
    OutsideValidityWindow { offset_days: f64, window_days: f64 },

    #[error("Kepler equation did not converge: {0}")]
    KeplerNoConvergence(String),

    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),
}

/// Call-level failures of the authentication pipeline.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not enough receivers: found {found}, at least {required} required")]
    InsufficientReceivers { found: usize, required: usize },

    #[error("Observation set has no epoch")]
    EmptyObservations,

    #[error("TDOA row {epoch} has {found} entries, expected {expected}")]
    TdoaShapeMismatch {
        epoch: usize,
        expected: usize,
        found: usize,
    },

    #[error("Observation set has {epochs} epochs but {rows} TDOA rows")]
    EpochCountMismatch { epochs: usize, rows: usize },

    #[error("Source track has {found} positions, expected one per epoch ({epochs})")]
    TrackLengthMismatch { epochs: usize, found: usize },

    #[error("Transmitter catalog is empty")]
    EmptyCatalog,

    #[error("Ephemeris lookup failed for transmitter {index}: {source}")]
    EphemerisLookup {
        index: usize,
        #[source]
        source: EphemerisError,
    },

    #[error("No catalog transmitter could be propagated over the observation epochs")]
    NoUsableCandidate,

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Invalid authentication parameter: {0}")]
    InvalidParameter(String),

    #[error("Authentication deadline exceeded")]
    DeadlineExceeded,

    #[error("Authentication cancelled")]
    Cancelled,
}

impl PartialEq for AuthError {
    fn eq(&self, other: &Self) -> bool {
        use AuthError::*;
        match (self, other) {
            (
                InsufficientReceivers {
                    found: a,
                    required: b,
                },
                InsufficientReceivers {
                    found: c,
                    required: d,
                },
            ) => a == c && b == d,
            (
                TdoaShapeMismatch {
                    epoch: a,
                    expected: b,
                    found: c,
                },
                TdoaShapeMismatch {
                    epoch: d,
                    expected: e,
                    found: f,
                },
            ) => a == d && b == e && c == f,
            (
                EphemerisLookup {
                    index: a,
                    source: b,
                },
                EphemerisLookup {
                    index: c,
                    source: d,
                },
            ) => a == c && b == d,
            (
                EpochCountMismatch { epochs: a, rows: b },
                EpochCountMismatch { epochs: c, rows: d },
            ) => a == c && b == d,
            (
                TrackLengthMismatch {
                    epochs: a,
                    found: b,
                },
                TrackLengthMismatch {
                    epochs: c,
                    found: d,
                },
            ) => a == c && b == d,
            (DegenerateGeometry(a), DegenerateGeometry(b)) => a == b,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,

            // Unit variants
            (EmptyObservations, EmptyObservations) => true,
            (EmptyCatalog, EmptyCatalog) => true,
            (NoUsableCandidate, NoUsableCandidate) => true,
            (DeadlineExceeded, DeadlineExceeded) => true,
            (Cancelled, Cancelled) => true,

            _ => false,
        }
    }
}
