//! # Time representation
//!
//! Signal arrival epochs are carried as a **two-part Julian date** ([`JulianDate`]):
//! an integral-ish day part and a fractional day part. Keeping the parts separate avoids
//! the cancellation that a single `f64` Julian date (≈ 2.46 × 10⁶) suffers when
//! sub-second offsets between measurements are taken.
//!
//! The module also hosts the Greenwich Mean Sidereal Time used by
//! [`EarthRotationFrame`](crate::ref_system::EarthRotationFrame).

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::constants::{Second, DPI, JDTOMJD, MJD, SECONDS_PER_DAY, SIDEREAL_RATE, T2000};

/// A Julian date split in a day part and a fractional day part (UTC).
///
/// The represented instant is `day + fraction`. Constructors normalize the value so that
/// `fraction` lies in `[0, 1)`; `day` keeps whatever sub-day offset it was given
/// (typically `.5`, as Julian days start at noon).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JulianDate {
    pub day: f64,
    pub fraction: f64,
}

impl JulianDate {
    /// Build a Julian date from its two parts, carrying whole days out of `fraction`.
    pub fn new(day: f64, fraction: f64) -> Self {
        let whole = fraction.floor();
        JulianDate {
            day: day + whole,
            fraction: fraction - whole,
        }
    }

    /// Build a Julian date from a single-part value.
    pub fn from_jd(jd: f64) -> Self {
        let day = jd.floor() + 0.5;
        let day = if day > jd { day - 1.0 } else { day };
        JulianDate::new(day, jd - day)
    }

    /// Convert a `hifitime` epoch (UTC) into a two-part Julian date.
    ///
    /// The split is done on the Modified Julian Date so that the day part lands
    /// on a `.5` Julian day boundary (0h UTC).
    pub fn from_epoch(epoch: &Epoch) -> Self {
        let mjd = epoch.to_mjd_utc_days();
        let whole = mjd.floor();
        JulianDate::new(whole + JDTOMJD, mjd - whole)
    }

    /// Convert back into a `hifitime` epoch (UTC).
    pub fn to_epoch(&self) -> Epoch {
        Epoch::from_mjd_utc(self.mjd())
    }

    /// Single-part Julian date. Loses precision; prefer the two parts for differences.
    pub fn jd(&self) -> f64 {
        self.day + self.fraction
    }

    /// Modified Julian Date, with the large offset removed before adding the fraction.
    pub fn mjd(&self) -> MJD {
        (self.day - JDTOMJD) + self.fraction
    }

    /// Shift the date by a number of seconds.
    pub fn add_seconds(&self, seconds: Second) -> Self {
        JulianDate::new(self.day, self.fraction + seconds / SECONDS_PER_DAY)
    }

    /// Signed number of seconds from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: &JulianDate) -> Second {
        ((self.day - earlier.day) + (self.fraction - earlier.fraction)) * SECONDS_PER_DAY
    }
}

impl From<Epoch> for JulianDate {
    fn from(epoch: Epoch) -> Self {
        JulianDate::from_epoch(&epoch)
    }
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// This function implements the IAU 1982 polynomial formula
/// for the mean sidereal time at 0h UT1, plus the fractional-day
/// correction term due to Earth's rotation rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
///
/// # References
/// * IAU 1982, IERS Conventions 1996/2000.
pub fn gmst(tjm: MJD) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Julian centuries from J2000 to 0h UT1 of the current day
    let itjm = tjm.floor();
    let t = (itjm - T2000) / 36525.0;

    let mut gmst0 = ((C3 * t + C2) * t + C1) * t + C0;
    gmst0 *= DPI / SECONDS_PER_DAY;

    // Rotation accumulated since 0h, at the sidereal rate
    let h = tjm.fract() * DPI;
    let mut gmst = gmst0 + h * SIDEREAL_RATE;

    // Normalize GMST to the [0, 2π) range
    let mut i: i64 = (gmst / DPI).floor() as i64;
    if gmst < 0.0 {
        i -= 1;
    }
    gmst -= i as f64 * DPI;

    gmst
}

/// GMST at a two-part Julian date. UTC is used in place of UT1.
pub fn gmst_at(date: &JulianDate) -> f64 {
    gmst(date.mjd())
}
