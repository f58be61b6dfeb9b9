//! Reinforcing Steel Classes (SP 63.13330)
//!
//! Design strengths of longitudinal and transverse reinforcement and the code
//! limits on the compressed zone. Strengths are in MPa as tabulated.
//!
//! ## Code limits
//!
//! The limiting relative compressed-zone height is
//!
//! ```text
//! ξ_R = 0.8 / (1 + ε_s,el / ε_b2),   ε_s,el = R_s / E_s,   ε_b2 = 0.0035
//! α_R = ξ_R (1 − ξ_R / 2)
//! ```
//!
//! Tabulated values take precedence; classes without them fall back to the
//! formula.

use serde::{Deserialize, Serialize};

use crate::units::{KnPerCm2, Mpa};

/// Elastic modulus of reinforcing steel (MPa)
pub const STEEL_ELASTIC_MODULUS_MPA: f64 = 200_000.0;

/// Ultimate compressive strain of concrete under short-term load
pub const CONCRETE_ULTIMATE_STRAIN: f64 = 0.0035;

/// Inclusive bar-diameter range a class is rolled in (mm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiameterRange {
    pub min: u16,
    pub max: u16,
}

impl DiameterRange {
    pub fn contains(&self, diameter_mm: u16) -> bool {
        diameter_mm >= self.min && diameter_mm <= self.max
    }
}

/// A reinforcement class record, e.g. `A400`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementGrade {
    /// Class identifier (`A400`)
    pub class_id: String,
    /// Diameters available for this class
    pub diameters_mm: DiameterRange,
    /// Normative (serviceability) strength R_s,ser
    pub r_s_ser: Mpa,
    /// Design tensile strength R_s
    pub r_s: Mpa,
    /// Design compressive strength under long-term load R_sc
    pub r_sc_long: Mpa,
    /// Design compressive strength under short-term load R_sc
    pub r_sc_short: Mpa,
    /// Design strength of transverse reinforcement R_sw (not all classes)
    #[serde(default)]
    pub r_sw: Option<Mpa>,
    /// Tabulated α_R
    #[serde(default)]
    pub alpha_r: Option<f64>,
    /// Tabulated ξ_R
    #[serde(default)]
    pub xi_r: Option<f64>,
}

impl ReinforcementGrade {
    pub fn r_s_ser_kn(&self) -> KnPerCm2 {
        self.r_s_ser.into()
    }

    pub fn r_s_kn(&self) -> KnPerCm2 {
        self.r_s.into()
    }

    pub fn r_sc_long_kn(&self) -> KnPerCm2 {
        self.r_sc_long.into()
    }

    pub fn r_sc_short_kn(&self) -> KnPerCm2 {
        self.r_sc_short.into()
    }

    pub fn r_sw_kn(&self) -> Option<KnPerCm2> {
        self.r_sw.map(Into::into)
    }

    /// ξ_R, tabulated or derived from R_s
    pub fn limiting_relative_height(&self) -> f64 {
        self.xi_r.unwrap_or_else(|| limiting_relative_height(self.r_s))
    }

    /// α_R, tabulated or derived from ξ_R
    pub fn limiting_alpha(&self) -> f64 {
        self.alpha_r
            .unwrap_or_else(|| limiting_alpha(self.limiting_relative_height()))
    }
}

impl std::fmt::Display for ReinforcementGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (R_s = {} MPa)", self.class_id, self.r_s.0)
    }
}

/// ξ_R for a given design tensile strength.
pub fn limiting_relative_height(r_s: Mpa) -> f64 {
    let elastic_strain = r_s.0 / STEEL_ELASTIC_MODULUS_MPA;
    0.8 / (1.0 + elastic_strain / CONCRETE_ULTIMATE_STRAIN)
}

/// α_R for a given ξ_R.
pub fn limiting_alpha(xi_r: f64) -> f64 {
    xi_r * (1.0 - xi_r / 2.0)
}
