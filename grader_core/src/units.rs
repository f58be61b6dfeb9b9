//! # Unit Types
//!
//! Type-safe wrappers for the units the coursework mixes. They are plain f64
//! newtypes that serialize as bare numbers.
//!
//! ## Units in use
//!
//! The design code tables list strengths and moduli in MPa, while students work
//! in kN and cm throughout:
//! - Length: metres (variant data), centimetres (all section geometry)
//! - Stress: MPa (reference tables), kN/cm² (answers and formulas)
//! - Moment: kN·cm
//!
//! 1 kN/cm² = 10 MPa, so every tabulated strength is divided by ten before it
//! is compared against a student answer.
//!
//! ## Example
//!
//! ```rust
//! use grader_core::units::{Centimeters, KnPerCm2, Meters, Mpa};
//!
//! let span: Centimeters = Meters(6.0).into();
//! assert_eq!(span.0, 600.0);
//!
//! let r_b: KnPerCm2 = Mpa(14.5).into();
//! assert!((r_b.0 - 1.45).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

// ============================================================================
// Length Units
// ============================================================================

/// Length in metres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meters(pub f64);

/// Length in centimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Centimeters(pub f64);

impl From<Meters> for Centimeters {
    fn from(m: Meters) -> Self {
        Centimeters(m.0 * 100.0)
    }
}

impl From<Centimeters> for Meters {
    fn from(cm: Centimeters) -> Self {
        Meters(cm.0 / 100.0)
    }
}

// ============================================================================
// Stress Units
// ============================================================================

/// Stress in megapascals (code tables)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mpa(pub f64);

/// Stress in kilonewtons per square centimetre (answers)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnPerCm2(pub f64);

impl From<Mpa> for KnPerCm2 {
    fn from(mpa: Mpa) -> Self {
        KnPerCm2(mpa.0 / 10.0)
    }
}

impl From<KnPerCm2> for Mpa {
    fn from(kn: KnPerCm2) -> Self {
        Mpa(kn.0 * 10.0)
    }
}

// ============================================================================
// Arithmetic Implementations (macro to reduce boilerplate)
// ============================================================================

macro_rules! impl_arithmetic {
    ($type:ty) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $type {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

impl_arithmetic!(Meters);
impl_arithmetic!(Centimeters);
impl_arithmetic!(Mpa);
impl_arithmetic!(KnPerCm2);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_centimeters() {
        let m = Meters(7.2);
        let cm: Centimeters = m.into();
        assert!((cm.0 - 720.0).abs() < 1e-9);
    }

    #[test]
    fn test_mpa_to_kn_per_cm2() {
        let kn: KnPerCm2 = Mpa(350.0).into();
        assert_eq!(kn.0, 35.0);
        let back: Mpa = kn.into();
        assert_eq!(back.0, 350.0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Centimeters(60.0);
        let b = Centimeters(20.0);
        assert_eq!((a + b).0, 80.0);
        assert_eq!((a - b).0, 40.0);
        assert_eq!((a * 2.0).0, 120.0);
        assert_eq!((a / 3.0).0, 20.0);
    }

    #[test]
    fn test_serialization() {
        let s = KnPerCm2(1.45);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "1.45");
        let roundtrip: KnPerCm2 = serde_json::from_str(&json).unwrap();
        assert_eq!(s, roundtrip);
    }
}
