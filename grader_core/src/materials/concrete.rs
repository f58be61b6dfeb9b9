//! Concrete Classes (SP 63.13330)
//!
//! Normative and design strengths plus initial elastic modulus for heavy-weight
//! concrete. Values are stored in MPa exactly as tabulated; the `*_kn` accessors
//! return the kN/cm² values students are expected to enter.

use serde::{Deserialize, Serialize};

use crate::units::{KnPerCm2, Mpa};

/// A concrete class record, e.g. `B25`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteGrade {
    /// Class identifier (`B25`)
    pub class_id: String,
    /// Normative compressive strength R_b,n
    pub r_b_n: Mpa,
    /// Normative tensile strength R_bt,n
    pub r_bt_n: Mpa,
    /// Design compressive strength R_b
    pub r_b: Mpa,
    /// Design tensile strength R_bt
    pub r_bt: Mpa,
    /// Initial modulus of elasticity E_b
    pub e_b: Mpa,
}

impl ConcreteGrade {
    pub fn r_b_n_kn(&self) -> KnPerCm2 {
        self.r_b_n.into()
    }

    pub fn r_bt_n_kn(&self) -> KnPerCm2 {
        self.r_bt_n.into()
    }

    pub fn r_b_kn(&self) -> KnPerCm2 {
        self.r_b.into()
    }

    pub fn r_bt_kn(&self) -> KnPerCm2 {
        self.r_bt.into()
    }

    pub fn e_b_kn(&self) -> KnPerCm2 {
        self.e_b.into()
    }

    /// Compressive strength class number, e.g. 25 for `B25`.
    pub fn strength_class(&self) -> Option<u32> {
        self.class_id.get(1..).and_then(|n| n.parse().ok())
    }
}

impl std::fmt::Display for ConcreteGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (R_b = {} MPa)", self.class_id, self.r_b.0)
    }
}
