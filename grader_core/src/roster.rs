//! # Roster and Variant Data
//!
//! Groups, students, the per-group variant sheet and the personal-variant
//! tables. Together they decide which girder a student designs: its nominal
//! length, concrete and steel classes, whether it is an edge girder, and which
//! floor slab it carries.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::{GradeError, GradeResult};
use crate::units::{Centimeters, Meters};

/// Substring of a group name that marks a civil-engineering group
pub const CIVIL_GROUP_MARKER: &str = "ПГС";

/// Substring of a girder name that marks an edge girder
pub const EDGE_GIRDER_MARKER: &str = "крайний";

/// Support allowances subtracted from the nominal length (cm)
const EDGE_SUPPORT_ALLOWANCE_CM: f64 = 40.0;
const INNER_SUPPORT_ALLOWANCE_CM: f64 = 20.0;
const FAR_SUPPORT_ALLOWANCE_CM: f64 = 20.0;
const JOINT_GAP_CM: f64 = 4.0;

/// Student identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StudentId {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(StudentId)
            .map_err(|e| GradeError::invalid_input("student_id", s, e.to_string()))
    }
}

/// Which personal-variant table a group works from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Curriculum {
    CivilEngineering,
    Architecture,
}

impl Curriculum {
    pub fn for_group_name(name: &str) -> Self {
        if name.contains(CIVIL_GROUP_MARKER) {
            Curriculum::CivilEngineering
        } else {
            Curriculum::Architecture
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    pub year: u16,
}

impl Group {
    pub fn curriculum(&self) -> Curriculum {
        Curriculum::for_group_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub full_name: String,
    pub group_id: u64,
    /// Row of the group's variant sheet
    pub subgroup_variant: u16,
    /// Row of the personal-variant table
    pub personal_variant: u16,
}

/// Girder placement within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GirderPosition {
    Edge,
    Inner,
}

/// Floor the girder's slab belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorLevel {
    /// "ВЭ"
    TopFloor,
    /// "РЭ"
    RegularFloor,
}

impl FloorLevel {
    /// Marker used in girder and slab names
    pub fn marker(&self) -> &'static str {
        match self {
            FloorLevel::TopFloor => "ВЭ",
            FloorLevel::RegularFloor => "РЭ",
        }
    }
}

/// One row of a personal-variant table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalVariant {
    pub personal_variant: u16,
    /// Slab element name, e.g. "П-1 ВЭ"
    pub slab: String,
    #[serde(default)]
    pub truss: String,
    /// Girder element name, e.g. "Р-2 крайний ВЭ"
    pub girder: String,
}

impl PersonalVariant {
    pub fn girder_position(&self) -> GirderPosition {
        if self.girder.contains(EDGE_GIRDER_MARKER) {
            GirderPosition::Edge
        } else {
            GirderPosition::Inner
        }
    }

    pub fn floor_level(&self) -> FloorLevel {
        if self.girder.contains(FloorLevel::TopFloor.marker()) {
            FloorLevel::TopFloor
        } else {
            FloorLevel::RegularFloor
        }
    }
}

/// One row of a group's variant sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAssignment {
    pub group_id: u64,
    pub variant_number: u16,
    /// Nominal girder length
    pub girder_length_m: Meters,
    pub girder_concrete: String,
    pub girder_reinforcement: String,
}

/// Clear span of the girder between bearing faces.
///
/// ```rust
/// use grader_core::roster::{girder_clear_length, GirderPosition};
/// use grader_core::units::Meters;
///
/// assert_eq!(girder_clear_length(Meters(6.0), GirderPosition::Inner).0, 556.0);
/// assert_eq!(girder_clear_length(Meters(6.0), GirderPosition::Edge).0, 536.0);
/// ```
pub fn girder_clear_length(nominal: Meters, position: GirderPosition) -> Centimeters {
    let nominal: Centimeters = nominal.into();
    let near_support = match position {
        GirderPosition::Edge => EDGE_SUPPORT_ALLOWANCE_CM,
        GirderPosition::Inner => INNER_SUPPORT_ALLOWANCE_CM,
    };
    Centimeters(nominal.0 - near_support - FAR_SUPPORT_ALLOWANCE_CM - JOINT_GAP_CM)
}

/// Groups and students, keyed for lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    pub groups: BTreeMap<u64, Group>,
    pub students: BTreeMap<StudentId, Student>,
}

impl Roster {
    /// Build a roster, rejecting duplicate ids, dangling group references and
    /// two students sharing the same `(group, subgroup, personal)` variant.
    pub fn new(groups: Vec<Group>, students: Vec<Student>) -> GradeResult<Self> {
        let mut roster = Roster::default();
        for group in groups {
            if roster.groups.contains_key(&group.id) {
                return Err(GradeError::invalid_input("group.id", group.id.to_string(), "duplicate group id"));
            }
            roster.groups.insert(group.id, group);
        }
        for student in students {
            if roster.students.contains_key(&student.id) {
                return Err(GradeError::invalid_input(
                    "student.id",
                    student.id.to_string(),
                    "duplicate student id",
                ));
            }
            roster.students.insert(student.id, student);
        }
        roster.validate()?;
        Ok(roster)
    }

    pub fn validate(&self) -> GradeResult<()> {
        let mut seen = HashSet::new();
        for student in self.students.values() {
            if !self.groups.contains_key(&student.group_id) {
                return Err(GradeError::invalid_input(
                    "student.group_id",
                    student.group_id.to_string(),
                    format!("student {} refers to an unknown group", student.id),
                ));
            }
            let key = (student.group_id, student.subgroup_variant, student.personal_variant);
            if !seen.insert(key) {
                return Err(GradeError::invalid_input(
                    "student",
                    student.id.to_string(),
                    format!(
                        "variant ({}, {}, {}) is already assigned to another student",
                        key.0, key.1, key.2
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The student holding the given variant slot, if any.
    pub fn find(&self, group_id: u64, subgroup_variant: u16, personal_variant: u16) -> Option<&Student> {
        self.students.values().find(|s| {
            s.group_id == group_id
                && s.subgroup_variant == subgroup_variant
                && s.personal_variant == personal_variant
        })
    }
}
