//! Authentication of orbiting radio transmitters from multi-receiver TDOA measurements,
//! with localization of near-ground spoofers.
//!
//! Entry points live in [`authentication`].

pub mod auth_errors;
pub mod authentication;
pub mod constants;
pub mod disparity;
pub mod ephemeris;
pub mod observations;
pub mod ref_system;
pub mod sampling;
pub mod time;
pub mod visibility;
