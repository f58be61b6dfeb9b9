//! Answer records, one shape per kind of stage.
//!
//! The same record types hold both what a student submitted and the program
//! answer the engine computed for comparison. Fields marked *derived* are
//! filled in server-side; whatever the payload carries for them is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calculations::geometry::GirderSection;
use crate::errors::{GradeError, GradeResult};
use crate::materials::{ConcreteGrade, ReinforcementGrade};
use crate::sections::{Section, SectionFaces, Surface};
use crate::stages::StageId;

/// Numeric value written into every field of an incomplete program answer
pub const SENTINEL: f64 = -1.0;

/// Concrete properties for the variant's concrete class (kN/cm²).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcreteAnswer {
    pub concrete_class: Option<String>,
    pub r_b_n: Option<f64>,
    pub r_bt_n: Option<f64>,
    pub r_b: Option<f64>,
    pub r_bt: Option<f64>,
    pub e_b: Option<f64>,
}

impl ConcreteAnswer {
    /// Reference record in the units students answer in
    pub fn from_grade(grade: &ConcreteGrade) -> Self {
        ConcreteAnswer {
            concrete_class: Some(grade.class_id.clone()),
            r_b_n: Some(grade.r_b_n_kn().0),
            r_bt_n: Some(grade.r_bt_n_kn().0),
            r_b: Some(grade.r_b_kn().0),
            r_bt: Some(grade.r_bt_kn().0),
            e_b: Some(grade.e_b_kn().0),
        }
    }
}

/// Reinforcement properties for the variant's steel class (kN/cm²).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementAnswer {
    pub reinforcement_class: Option<String>,
    pub r_s_ser: Option<f64>,
    pub r_s: Option<f64>,
    pub r_sc_long: Option<f64>,
    pub r_sc_short: Option<f64>,
    pub r_sw: Option<f64>,
    pub alpha_r: Option<f64>,
    pub xi_r: Option<f64>,
}

impl ReinforcementAnswer {
    pub fn from_grade(grade: &ReinforcementGrade) -> Self {
        ReinforcementAnswer {
            reinforcement_class: Some(grade.class_id.clone()),
            r_s_ser: Some(grade.r_s_ser_kn().0),
            r_s: Some(grade.r_s_kn().0),
            r_sc_long: Some(grade.r_sc_long_kn().0),
            r_sc_short: Some(grade.r_sc_short_kn().0),
            r_sw: grade.r_sw_kn().map(|v| v.0),
            alpha_r: Some(grade.limiting_alpha()),
            xi_r: Some(grade.limiting_relative_height()),
        }
    }
}

/// Raw girder dimensions (cm) plus the derived section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GirderGeometryAnswer {
    pub wall_height: f64,
    pub wall_width: f64,
    pub flange_bevel_height: f64,
    pub flange_bevel_width: f64,
    /// Slab strip height; taken from the slab data when omitted
    #[serde(default)]
    pub flange_slab_height: Option<f64>,
    pub flange_full_width: f64,
    /// Derived
    #[serde(default)]
    pub derived: Option<GirderSection>,
}

/// Design moments (kN·cm). Support moments are entered as magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentsForcesAnswer {
    pub moment_middle_bot: f64,
    pub moment_left_top: f64,
    pub moment_right_top: f64,
}

impl MomentsForcesAnswer {
    pub fn design_moment(&self, section: Section) -> f64 {
        match section {
            Section::Middle => self.moment_middle_bot,
            Section::Left => self.moment_left_top,
            Section::Right => self.moment_right_top,
        }
    }

    pub fn validate(&self) -> GradeResult<()> {
        for (field, value) in [
            ("moment_middle_bot", self.moment_middle_bot),
            ("moment_left_top", self.moment_left_top),
            ("moment_right_top", self.moment_right_top),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GradeError::invalid_input(
                    field,
                    value.to_string(),
                    "Design moment must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

/// Assumed reinforcement layer used to size the steel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InitialLayer {
    /// Area (cm²)
    pub area: f64,
    /// Distance from the face to the layer centroid (cm)
    pub distance: f64,
    /// Derived: girder height minus distance
    #[serde(default)]
    pub effective_depth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitialReinforcementAnswer {
    pub layers: SectionFaces<InitialLayer>,
}

impl InitialReinforcementAnswer {
    pub fn validate(&self) -> GradeResult<()> {
        for (section, surface, layer) in self.layers.iter() {
            check_layer(section, surface, layer.area, layer.distance)?;
        }
        Ok(())
    }

    /// Fill effective depths from the girder height, or clear them.
    pub fn derive_depths(&mut self, girder_height: Option<f64>) {
        for section in Section::ALL {
            for surface in Surface::ALL {
                let layer = self.layers.get_mut(section, surface);
                layer.effective_depth = girder_height.map(|h| h - layer.distance);
            }
        }
    }
}

/// Placed bars in one face.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacedLayer {
    pub bar_diameter_mm: u16,
    pub bar_count: u16,
    /// Distance from the face to the bar centroid (cm)
    pub distance: f64,
    /// Derived: bar_count × bar area (cm²)
    #[serde(default)]
    pub area: Option<f64>,
    /// Derived: girder height minus distance
    #[serde(default)]
    pub effective_depth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementAnswer {
    pub layers: SectionFaces<PlacedLayer>,
}

impl PlacementAnswer {
    pub fn validate(&self) -> GradeResult<()> {
        for (section, surface, layer) in self.layers.iter() {
            check_layer(section, surface, 0.0, layer.distance)?;
        }
        Ok(())
    }

    pub fn derive_depths(&mut self, girder_height: Option<f64>) {
        for section in Section::ALL {
            for surface in Surface::ALL {
                let layer = self.layers.get_mut(section, surface);
                layer.effective_depth = girder_height.map(|h| h - layer.distance);
            }
        }
    }
}

fn check_layer(section: Section, surface: Surface, area: f64, distance: f64) -> GradeResult<()> {
    if !area.is_finite() || area < 0.0 {
        return Err(GradeError::invalid_input(
            format!("{}_{}_area", section, surface),
            area.to_string(),
            "Reinforcement area must be non-negative",
        ));
    }
    if !distance.is_finite() || distance <= 0.0 {
        return Err(GradeError::invalid_input(
            format!("{}_{}_distance", section, surface),
            distance.to_string(),
            "Centroid distance must be positive",
        ));
    }
    Ok(())
}

/// Required steel at one control section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatedReinforcementAnswer {
    pub alpha_m: Option<f64>,
    /// Supports only
    pub moment_flange_capacity: Option<f64>,
    /// Supports only
    pub is_neutral_axis_in_flange: Option<bool>,
    pub reinforcement_area: Option<f64>,
}

impl CalculatedReinforcementAnswer {
    pub fn sentinel(section: Section) -> Self {
        let support = section.is_support();
        CalculatedReinforcementAnswer {
            alpha_m: Some(SENTINEL),
            moment_flange_capacity: support.then_some(SENTINEL),
            is_neutral_axis_in_flange: None,
            reinforcement_area: Some(SENTINEL),
        }
    }
}

/// Ultimate moment capacity at one section face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BearingCapacityAnswer {
    /// Top face only
    pub ultimate_tensile_force: Option<f64>,
    /// Top face only
    pub ultimate_compressive_force: Option<f64>,
    pub compressed_zone_height_a: Option<f64>,
    pub relative_compressed_zone_height_a: Option<f64>,
    pub bearing_capacity_a: Option<f64>,
    pub compressed_zone_height_b: Option<f64>,
    pub bearing_capacity_b: Option<f64>,
    pub bearing_capacity: Option<f64>,
}

impl BearingCapacityAnswer {
    pub fn sentinel(surface: Surface) -> Self {
        let top = surface == Surface::Top;
        BearingCapacityAnswer {
            ultimate_tensile_force: top.then_some(SENTINEL),
            ultimate_compressive_force: top.then_some(SENTINEL),
            compressed_zone_height_a: Some(SENTINEL),
            relative_compressed_zone_height_a: Some(SENTINEL),
            bearing_capacity_a: Some(SENTINEL),
            compressed_zone_height_b: Some(SENTINEL),
            bearing_capacity_b: Some(SENTINEL),
            bearing_capacity: Some(SENTINEL),
        }
    }
}

/// Any stage's answer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "record")]
pub enum StageAnswer {
    Concrete(ConcreteAnswer),
    Reinforcement(ReinforcementAnswer),
    GirderGeometry(GirderGeometryAnswer),
    MomentsForces(MomentsForcesAnswer),
    InitialReinforcement(InitialReinforcementAnswer),
    ReinforcementArea(CalculatedReinforcementAnswer),
    Placement(PlacementAnswer),
    BearingCapacity(BearingCapacityAnswer),
}

impl StageAnswer {
    /// Parse a submitted JSON payload as the record for `stage`.
    pub fn parse(stage: StageId, payload: Value) -> GradeResult<Self> {
        fn from<T: serde::de::DeserializeOwned>(stage: StageId, payload: Value) -> GradeResult<T> {
            serde_json::from_value(payload)
                .map_err(|e| GradeError::invalid_input("payload", stage.as_str(), e.to_string()))
        }

        Ok(match stage {
            StageId::Concrete => StageAnswer::Concrete(from(stage, payload)?),
            StageId::Reinforcement => StageAnswer::Reinforcement(from(stage, payload)?),
            StageId::GirderGeometry => StageAnswer::GirderGeometry(from(stage, payload)?),
            StageId::MomentsForces => StageAnswer::MomentsForces(from(stage, payload)?),
            StageId::InitialReinforcement => StageAnswer::InitialReinforcement(from(stage, payload)?),
            StageId::CalculatedReinforcementMiddle
            | StageId::CalculatedReinforcementLeft
            | StageId::CalculatedReinforcementRight => StageAnswer::ReinforcementArea(from(stage, payload)?),
            StageId::CalculatedReinforcement => StageAnswer::Placement(from(stage, payload)?),
            _ => StageAnswer::BearingCapacity(from(stage, payload)?),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StageAnswer::Concrete(_) => "Concrete",
            StageAnswer::Reinforcement(_) => "Reinforcement",
            StageAnswer::GirderGeometry(_) => "GirderGeometry",
            StageAnswer::MomentsForces(_) => "MomentsForces",
            StageAnswer::InitialReinforcement(_) => "InitialReinforcement",
            StageAnswer::ReinforcementArea(_) => "ReinforcementArea",
            StageAnswer::Placement(_) => "Placement",
            StageAnswer::BearingCapacity(_) => "BearingCapacity",
        }
    }

    /// Whether this record has the shape `stage` expects
    pub fn fits(&self, stage: StageId) -> bool {
        matches!(
            (self, stage),
            (StageAnswer::Concrete(_), StageId::Concrete)
                | (StageAnswer::Reinforcement(_), StageId::Reinforcement)
                | (StageAnswer::GirderGeometry(_), StageId::GirderGeometry)
                | (StageAnswer::MomentsForces(_), StageId::MomentsForces)
                | (StageAnswer::InitialReinforcement(_), StageId::InitialReinforcement)
                | (StageAnswer::Placement(_), StageId::CalculatedReinforcement)
        ) || match self {
            StageAnswer::ReinforcementArea(_) => StageId::REINFORCEMENT_AREAS.contains(&stage),
            StageAnswer::BearingCapacity(_) => StageId::BEARING_CAPACITIES.contains(&stage),
            _ => false,
        }
    }

    /// Error for a stored or computed record of the wrong shape
    pub fn mismatch(&self, stage: StageId) -> GradeError {
        GradeError::PayloadMismatch {
            expected: stage.as_str().to_string(),
            found: self.kind().to_string(),
        }
    }
}

/// Engine-computed reference record for a graded stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramAnswer {
    pub record: StageAnswer,
    /// False when upstream answers were missing; `record` then holds sentinels
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<StageId>,
    pub computed_at: DateTime<Utc>,
}

impl ProgramAnswer {
    pub fn complete(record: StageAnswer) -> Self {
        ProgramAnswer {
            record,
            complete: true,
            missing: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    /// Sentinel record for a calculated stage whose inputs are missing.
    pub fn incomplete(stage: StageId, missing: Vec<StageId>) -> GradeResult<Self> {
        let record = match (stage.section(), stage.surface()) {
            (Some(_), Some(surface)) => StageAnswer::BearingCapacity(BearingCapacityAnswer::sentinel(surface)),
            (Some(section), None) => StageAnswer::ReinforcementArea(CalculatedReinforcementAnswer::sentinel(section)),
            _ => {
                return Err(GradeError::Internal {
                    message: format!("stage {} has no calculated program answer", stage),
                })
            }
        };
        Ok(ProgramAnswer {
            record,
            complete: false,
            missing,
            computed_at: Utc::now(),
        })
    }
}
