//! # Constants and type definitions for tdoa-auth
//!
//! This module centralizes the **physical constants**, **conversion factors**, and
//! **type aliases** shared by the authentication pipeline.
//!
//! ## Overview
//!
//! - Propagation speed of the radio signal
//! - WGS84 reference ellipsoid and Earth rotation
//! - Julian date offsets and time conversions
//! - Default thresholds of the two-stage authentication
//!
//! The defaults are only used to seed [`AuthParams`](crate::authentication::AuthParams);
//! the algorithms themselves always read their constants from the parameter value
//! they were built with.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Speed of light in km/s
pub const VLIGHT: f64 = 2.99792458e5;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Conversion offset between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Ratio of the sidereal to the solar day rotation rate
pub const SIDEREAL_RATE: f64 = 1.00273790934;

/// Earth rotation rate in rad/s
pub const EARTH_ROTATION_RATE: f64 = DPI * SIDEREAL_RATE / SECONDS_PER_DAY;

/// Earth equatorial radius in kilometers (WGS84)
pub const EARTH_MAJOR_AXIS: Kilometer = 6_378.137;

/// Inverse flattening of the WGS84 ellipsoid
pub const EARTH_INV_FLATTENING: f64 = 298.257_223_563;

/// Earth polar radius in kilometers (WGS84)
pub const EARTH_MINOR_AXIS: Kilometer = EARTH_MAJOR_AXIS * (1.0 - 1.0 / EARTH_INV_FLATTENING);

/// Gravitational parameter of the Earth in km³/s² (WGS84)
pub const EARTH_MU: f64 = 398_600.4418;

// -------------------------------------------------------------------------------------------------
// Authentication defaults
// -------------------------------------------------------------------------------------------------

/// Minimum number of receivers for a solvable TDOA geometry
pub const MIN_RECEIVERS: usize = 4;

/// Altitude (km) separating the near-ground search band from the orbital band
pub const DEFAULT_HEIGHT_THRESHOLD: Kilometer = 100.0;

/// Relative disparity improvement required to flag a near-ground spoofer
pub const DEFAULT_IMPROVEMENT_MARGIN: f64 = 0.4;

/// Samples along the centroid → transmitter axis of the search grid
pub const DEFAULT_LONG_AXIS_SAMPLES: usize = 20;

/// Samples along each cross axis of the search grid
pub const DEFAULT_CROSS_AXIS_SAMPLES: usize = 3;

/// Half width of the cross section, as a fraction of the grid length
pub const DEFAULT_CROSS_HALF_WIDTH: f64 = 0.05;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Duration in seconds
pub type Second = f64;
/// Modified Julian Date (days)
pub type MJD = f64;
