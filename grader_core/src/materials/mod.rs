//! # Materials Database
//!
//! Read-only reference tables used by every calculation: concrete classes,
//! reinforcement classes and the bar assortment.
//!
//! The builtin tables are embedded TOML (`data/*.toml`), parsed once on first
//! use. Deployments that import their own tables build a [`MaterialTables`]
//! from TOML strings or JSON instead.
//!
//! ## Example
//!
//! ```rust
//! use grader_core::materials::MaterialTables;
//!
//! let tables = MaterialTables::builtin().unwrap();
//! let b25 = tables.concrete_grade("B25").unwrap();
//! assert_eq!(b25.r_b.0, 14.5);
//!
//! // Class ids typed with Cyrillic letters resolve to the same record
//! assert!(tables.concrete_grade("В25").is_ok());
//! assert!(tables.bar_diameter(20).is_ok());
//! ```

pub mod bars;
pub mod concrete;
pub mod reinforcement;

pub use bars::BarDiameter;
pub use concrete::ConcreteGrade;
pub use reinforcement::{DiameterRange, ReinforcementGrade};

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{GradeError, GradeResult};

const CONCRETE_TOML: &str = include_str!("../../data/concrete.toml");
const REINFORCEMENT_TOML: &str = include_str!("../../data/reinforcement.toml");
const BARS_TOML: &str = include_str!("../../data/bars.toml");

static BUILTIN: Lazy<GradeResult<MaterialTables>> =
    Lazy::new(|| MaterialTables::from_toml_strs(CONCRETE_TOML, REINFORCEMENT_TOML, BARS_TOML));

#[derive(Deserialize)]
struct ConcreteFile {
    concrete: Vec<ConcreteGrade>,
}

#[derive(Deserialize)]
struct ReinforcementFile {
    reinforcement: Vec<ReinforcementGrade>,
}

#[derive(Deserialize)]
struct BarsFile {
    bars: Vec<BarDiameter>,
}

/// All material reference tables, keyed by class id / diameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialTables {
    pub concrete: BTreeMap<String, ConcreteGrade>,
    pub reinforcement: BTreeMap<String, ReinforcementGrade>,
    pub bars: BTreeMap<u16, BarDiameter>,
}

impl MaterialTables {
    /// The tables shipped with the crate.
    pub fn builtin() -> GradeResult<&'static MaterialTables> {
        BUILTIN.as_ref().map_err(Clone::clone)
    }

    /// Build tables from the three TOML documents.
    pub fn from_toml_strs(concrete: &str, reinforcement: &str, bars: &str) -> GradeResult<Self> {
        let concrete: ConcreteFile = toml::from_str(concrete).map_err(GradeError::serialization)?;
        let reinforcement: ReinforcementFile =
            toml::from_str(reinforcement).map_err(GradeError::serialization)?;
        let bars: BarsFile = toml::from_str(bars).map_err(GradeError::serialization)?;

        let mut tables = MaterialTables::default();
        for grade in concrete.concrete {
            tables.insert_concrete(grade);
        }
        for grade in reinforcement.reinforcement {
            tables.insert_reinforcement(grade);
        }
        for bar in bars.bars {
            tables.bars.insert(bar.diameter_mm, bar);
        }
        Ok(tables)
    }

    /// Insert or replace a concrete class
    pub fn insert_concrete(&mut self, mut grade: ConcreteGrade) {
        grade.class_id = normalize_class_id(&grade.class_id);
        self.concrete.insert(grade.class_id.clone(), grade);
    }

    /// Insert or replace a reinforcement class
    pub fn insert_reinforcement(&mut self, mut grade: ReinforcementGrade) {
        grade.class_id = normalize_class_id(&grade.class_id);
        self.reinforcement.insert(grade.class_id.clone(), grade);
    }

    pub fn concrete_grade(&self, class_id: &str) -> GradeResult<&ConcreteGrade> {
        let key = normalize_class_id(class_id);
        self.concrete
            .get(&key)
            .ok_or_else(|| GradeError::not_found("concrete class", key))
    }

    pub fn reinforcement_grade(&self, class_id: &str) -> GradeResult<&ReinforcementGrade> {
        let key = normalize_class_id(class_id);
        self.reinforcement
            .get(&key)
            .ok_or_else(|| GradeError::not_found("reinforcement class", key))
    }

    pub fn bar_diameter(&self, diameter_mm: u16) -> GradeResult<&BarDiameter> {
        self.bars
            .get(&diameter_mm)
            .ok_or_else(|| GradeError::not_found("bar diameter", diameter_mm))
    }
}

/// Canonical form of a material class id.
///
/// Variant sheets are typed with Cyrillic `В`/`А` as often as with Latin
/// letters, and with stray spaces.
pub fn normalize_class_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            'В' | 'в' => 'B',
            'А' | 'а' => 'A',
            'С' | 'с' => 'C',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}
