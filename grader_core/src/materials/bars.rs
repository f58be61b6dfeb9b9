//! Bar assortment: cross-section area and linear mass by nominal diameter.

use serde::{Deserialize, Serialize};

/// One nominal bar diameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarDiameter {
    /// Nominal diameter (mm)
    pub diameter_mm: u16,
    /// Cross-section area of one bar (cm²)
    pub cross_section_area: f64,
    /// Mass per metre (kg/m)
    pub linear_mass: f64,
}

impl BarDiameter {
    /// Total area of `count` bars (cm²)
    pub fn area_of(&self, count: u16) -> f64 {
        self.cross_section_area * f64::from(count)
    }

    /// Total mass of `count` bars of the given length in metres (kg)
    pub fn mass_of(&self, count: u16, length_m: f64) -> f64 {
        self.linear_mass * f64::from(count) * length_m
    }
}
