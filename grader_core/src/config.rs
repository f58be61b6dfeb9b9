//! # Grader Configuration
//!
//! Tolerance bands and geometry limits, loaded from TOML. The embedded default
//! (`data/default_config.toml`) is used when no file is supplied, and any file
//! may omit sections or keys: missing values fall back to the defaults.
//!
//! ```rust
//! use grader_core::config::{GraderConfig, ToleranceClass};
//!
//! let config = GraderConfig::from_toml_str("[tolerances]\ncalculated = 0.02\n").unwrap();
//! assert_eq!(config.tolerances.for_class(ToleranceClass::Calculated), 0.02);
//! assert_eq!(config.tolerances.for_class(ToleranceClass::CodeLimit), 0.005);
//! assert_eq!(config.geometry.max_girder_height_cm, 80.0);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{GradeError, GradeResult};

const DEFAULT_CONFIG_TOML: &str = include_str!("../data/default_config.toml");

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    pub tolerances: Tolerances,
    pub geometry: GeometryLimits,
}

impl GraderConfig {
    /// Parse a TOML document. Keys not present keep their default values.
    pub fn from_toml_str(source: &str) -> GradeResult<Self> {
        let config: GraderConfig = toml::from_str(source).map_err(|e| GradeError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> GradeResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| GradeError::file_error("read config", path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// The configuration shipped with the crate.
    pub fn embedded() -> GradeResult<Self> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    fn validate(&self) -> GradeResult<()> {
        for (name, t) in self.tolerances.entries() {
            if !(0.0..1.0).contains(&t) {
                return Err(GradeError::Config {
                    reason: format!("tolerance '{}' must be in [0, 1), got {}", name, t),
                });
            }
        }
        for (name, bounds) in self.geometry.bounds() {
            if bounds.min > bounds.max {
                return Err(GradeError::Config {
                    reason: format!("bounds for '{}' are inverted ({} > {})", name, bounds.min, bounds.max),
                });
            }
        }
        Ok(())
    }
}

/// Categories of numeric fields, each with its own tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToleranceClass {
    /// Tabulated material strengths and moduli
    MaterialStrength,
    /// Code limits alpha_R, xi_R
    CodeLimit,
    /// Lengths inside the section (compressed-zone heights)
    Geometry,
    /// Values the engine computes from the student's upstream answers
    Calculated,
}

/// Relative tolerance per field category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub material_strength: f64,
    pub code_limit: f64,
    pub geometry: f64,
    pub calculated: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            material_strength: 0.001,
            code_limit: 0.005,
            geometry: 0.005,
            calculated: 0.01,
        }
    }
}

impl Tolerances {
    pub fn for_class(&self, class: ToleranceClass) -> f64 {
        match class {
            ToleranceClass::MaterialStrength => self.material_strength,
            ToleranceClass::CodeLimit => self.code_limit,
            ToleranceClass::Geometry => self.geometry,
            ToleranceClass::Calculated => self.calculated,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("material_strength", self.material_strength),
            ("code_limit", self.code_limit),
            ("geometry", self.geometry),
            ("calculated", self.calculated),
        ]
    }
}

/// Inclusive range for a raw dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Bounds { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Geometry rules for the girder cross-section (all in cm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryLimits {
    /// Hard code limit on the overall girder height
    pub max_girder_height_cm: f64,
    /// Subtracted from the bevel width to get the flange console width
    pub console_offset_cm: f64,
    pub wall_height_cm: Bounds,
    pub wall_width_cm: Bounds,
    pub flange_bevel_height_cm: Bounds,
    pub flange_bevel_width_cm: Bounds,
    pub flange_slab_height_cm: Bounds,
    pub flange_full_width_cm: Bounds,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        GeometryLimits {
            max_girder_height_cm: 80.0,
            console_offset_cm: 2.0,
            wall_height_cm: Bounds::new(20.0, 80.0),
            wall_width_cm: Bounds::new(15.0, 60.0),
            flange_bevel_height_cm: Bounds::new(3.0, 30.0),
            flange_bevel_width_cm: Bounds::new(3.0, 40.0),
            flange_slab_height_cm: Bounds::new(3.0, 30.0),
            flange_full_width_cm: Bounds::new(20.0, 400.0),
        }
    }
}

impl GeometryLimits {
    fn bounds(&self) -> [(&'static str, Bounds); 6] {
        [
            ("wall_height_cm", self.wall_height_cm),
            ("wall_width_cm", self.wall_width_cm),
            ("flange_bevel_height_cm", self.flange_bevel_height_cm),
            ("flange_bevel_width_cm", self.flange_bevel_width_cm),
            ("flange_slab_height_cm", self.flange_slab_height_cm),
            ("flange_full_width_cm", self.flange_full_width_cm),
        ]
    }
}
