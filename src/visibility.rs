//! Horizon test between ground receivers and a transmitter.
//!
//! A transmitter is above the local horizon of a receiver when the receiver → transmitter
//! vector does not point into the half-space below the receiver's radial direction.
//! Both positions must be expressed in the same frame at the same instant.

use nalgebra::Vector3;

/// `true` when `transmitter` is on or above the horizon of `receiver`.
#[inline]
pub fn is_visible(receiver: &Vector3<f64>, transmitter: &Vector3<f64>) -> bool {
    receiver.dot(&(transmitter - receiver)) >= 0.0
}

/// `true` when `transmitter` is visible from every receiver.
pub fn visible_from_all(receivers: &[Vector3<f64>], transmitter: &Vector3<f64>) -> bool {
    receivers.iter().all(|r| is_visible(r, transmitter))
}
