//! # Reference Data
//!
//! Read-only ground truth the grader looks up while computing program answers:
//! material tables, the roster, variant sheets, personal-variant tables and
//! recorded slab heights.
//!
//! [`ReferenceStore`] is the lookup seam. Every primitive lookup fails with
//! [`GradeError::NotFound`]; the grader turns that into the hard
//! `ReferenceDataMissing` stop. [`ReferenceData`] is the bundled
//! implementation, loaded from a single JSON document:
//!
//! ```json
//! {
//!   "groups":   [{ "id": 1, "name": "ПГС-21", "year": 2021 }],
//!   "students": [{ "id": 7, "full_name": "...", "group_id": 1,
//!                  "subgroup_variant": 2, "personal_variant": 4 }],
//!   "variants": [{ "group_id": 1, "variant_number": 2, "girder_length_m": 6.0,
//!                  "girder_concrete": "B25", "girder_reinforcement": "A400" }],
//!   "civil_variants": [{ "personal_variant": 4, "slab": "П-1 РЭ", "girder": "Р-1 РЭ" }],
//!   "architecture_variants": [],
//!   "slab_heights": [{ "student_id": 7, "height_cm": 8.0 }]
//! }
//! ```
//!
//! `materials` may be included as well; when omitted the builtin tables are used.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{GradeError, GradeResult};
use crate::materials::{BarDiameter, ConcreteGrade, MaterialTables, ReinforcementGrade};
use crate::roster::{
    girder_clear_length, Curriculum, FloorLevel, Group, PersonalVariant, Roster, Student, StudentId,
    VariantAssignment,
};
use crate::units::Centimeters;

/// Lookup interface for reference data.
pub trait ReferenceStore: Send + Sync {
    fn get_concrete_grade(&self, class_id: &str) -> GradeResult<ConcreteGrade>;

    fn get_reinforcement_grade(&self, class_id: &str) -> GradeResult<ReinforcementGrade>;

    fn get_bar_diameter(&self, diameter_mm: u16) -> GradeResult<BarDiameter>;

    fn get_variant_assignment(&self, group_id: u64, variant_number: u16) -> GradeResult<VariantAssignment>;

    fn get_student(&self, student_id: StudentId) -> GradeResult<Student>;

    fn get_group(&self, group_id: u64) -> GradeResult<Group>;

    fn get_personal_variant(&self, curriculum: Curriculum, number: u16) -> GradeResult<PersonalVariant>;

    /// Slab height recorded for a student (cm)
    fn get_slab_height(&self, student_id: StudentId) -> GradeResult<f64>;

    fn find_student(&self, group_id: u64, subgroup_variant: u16, personal_variant: u16) -> GradeResult<Student>;

    /// First civil-engineering personal variant whose slab is on the given floor
    fn find_slab_variant(&self, floor: FloorLevel) -> GradeResult<PersonalVariant>;

    /// Everything the grader needs to know about whose girder this is.
    fn student_context(&self, student_id: StudentId) -> GradeResult<StudentContext> {
        let student = self.get_student(student_id)?;
        let group = self.get_group(student.group_id)?;
        let assignment = self.get_variant_assignment(group.id, student.subgroup_variant)?;
        let personal = self.get_personal_variant(group.curriculum(), student.personal_variant)?;
        Ok(StudentContext {
            student,
            group,
            assignment,
            personal,
        })
    }

    /// Height of the slab strip resting on the student's girder.
    ///
    /// The slab is taken from the classmate (same group and subgroup) whose
    /// personal variant is the first slab on the girder's floor.
    fn resolve_slab_height(&self, context: &StudentContext) -> GradeResult<f64> {
        let slab_variant = self.find_slab_variant(context.personal.floor_level())?;
        let classmate = self.find_student(
            context.group.id,
            context.student.subgroup_variant,
            slab_variant.personal_variant,
        )?;
        self.get_slab_height(classmate.id)
    }
}

/// A student together with their group, variant row and personal variant.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentContext {
    pub student: Student,
    pub group: Group,
    pub assignment: VariantAssignment,
    pub personal: PersonalVariant,
}

impl StudentContext {
    /// Clear span of the student's girder
    pub fn girder_span(&self) -> Centimeters {
        girder_clear_length(self.assignment.girder_length_m, self.personal.girder_position())
    }
}

/// Recorded slab height of one student.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlabHeight {
    pub student_id: StudentId,
    pub height_cm: f64,
}

/// On-disk shape of [`ReferenceData`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReferenceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    materials: Option<MaterialTables>,
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    students: Vec<Student>,
    #[serde(default)]
    variants: Vec<VariantAssignment>,
    #[serde(default)]
    civil_variants: Vec<PersonalVariant>,
    #[serde(default)]
    architecture_variants: Vec<PersonalVariant>,
    #[serde(default)]
    slab_heights: Vec<SlabHeight>,
}

/// In-memory reference store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ReferenceFile", into = "ReferenceFile")]
pub struct ReferenceData {
    pub materials: MaterialTables,
    pub roster: Roster,
    pub variants: BTreeMap<(u64, u16), VariantAssignment>,
    pub civil_variants: BTreeMap<u16, PersonalVariant>,
    pub architecture_variants: BTreeMap<u16, PersonalVariant>,
    pub slab_heights: BTreeMap<StudentId, f64>,
}

impl TryFrom<ReferenceFile> for ReferenceData {
    type Error = GradeError;

    fn try_from(file: ReferenceFile) -> Result<Self, Self::Error> {
        let materials = match file.materials {
            Some(tables) => tables,
            None => MaterialTables::builtin()?.clone(),
        };
        let mut data = ReferenceData {
            materials,
            roster: Roster::new(file.groups, file.students)?,
            ..Default::default()
        };
        for variant in file.variants {
            data.add_variant(variant);
        }
        for pv in file.civil_variants {
            data.add_personal_variant(Curriculum::CivilEngineering, pv);
        }
        for pv in file.architecture_variants {
            data.add_personal_variant(Curriculum::Architecture, pv);
        }
        for slab in file.slab_heights {
            data.slab_heights.insert(slab.student_id, slab.height_cm);
        }
        Ok(data)
    }
}

impl From<ReferenceData> for ReferenceFile {
    fn from(data: ReferenceData) -> Self {
        ReferenceFile {
            materials: Some(data.materials),
            groups: data.roster.groups.into_values().collect(),
            students: data.roster.students.into_values().collect(),
            variants: data.variants.into_values().collect(),
            civil_variants: data.civil_variants.into_values().collect(),
            architecture_variants: data.architecture_variants.into_values().collect(),
            slab_heights: data
                .slab_heights
                .into_iter()
                .map(|(student_id, height_cm)| SlabHeight { student_id, height_cm })
                .collect(),
        }
    }
}

impl ReferenceData {
    /// Empty roster over the builtin material tables.
    pub fn with_builtin_materials() -> GradeResult<Self> {
        Ok(ReferenceData {
            materials: MaterialTables::builtin()?.clone(),
            ..Default::default()
        })
    }

    pub fn from_json(json: &str) -> GradeResult<Self> {
        serde_json::from_str(json).map_err(GradeError::serialization)
    }

    pub fn load(path: &Path) -> GradeResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| GradeError::file_error("read reference data", path.display().to_string(), e.to_string()))?;
        Self::from_json(&contents)
    }

    /// Replace the roster. Fails if it violates the variant-slot uniqueness rule.
    pub fn set_roster(&mut self, groups: Vec<Group>, students: Vec<Student>) -> GradeResult<()> {
        self.roster = Roster::new(groups, students)?;
        Ok(())
    }

    pub fn add_variant(&mut self, variant: VariantAssignment) {
        self.variants
            .insert((variant.group_id, variant.variant_number), variant);
    }

    pub fn add_personal_variant(&mut self, curriculum: Curriculum, variant: PersonalVariant) {
        let table = match curriculum {
            Curriculum::CivilEngineering => &mut self.civil_variants,
            Curriculum::Architecture => &mut self.architecture_variants,
        };
        table.insert(variant.personal_variant, variant);
    }

    pub fn set_slab_height(&mut self, student_id: StudentId, height_cm: f64) {
        self.slab_heights.insert(student_id, height_cm);
    }
}

impl ReferenceStore for ReferenceData {
    fn get_concrete_grade(&self, class_id: &str) -> GradeResult<ConcreteGrade> {
        self.materials.concrete_grade(class_id).cloned()
    }

    fn get_reinforcement_grade(&self, class_id: &str) -> GradeResult<ReinforcementGrade> {
        self.materials.reinforcement_grade(class_id).cloned()
    }

    fn get_bar_diameter(&self, diameter_mm: u16) -> GradeResult<BarDiameter> {
        self.materials.bar_diameter(diameter_mm).copied()
    }

    fn get_variant_assignment(&self, group_id: u64, variant_number: u16) -> GradeResult<VariantAssignment> {
        self.variants
            .get(&(group_id, variant_number))
            .cloned()
            .ok_or_else(|| GradeError::not_found("variant assignment", format!("group {} variant {}", group_id, variant_number)))
    }

    fn get_student(&self, student_id: StudentId) -> GradeResult<Student> {
        self.roster
            .students
            .get(&student_id)
            .cloned()
            .ok_or_else(|| GradeError::not_found("student", student_id))
    }

    fn get_group(&self, group_id: u64) -> GradeResult<Group> {
        self.roster
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| GradeError::not_found("group", group_id))
    }

    fn get_personal_variant(&self, curriculum: Curriculum, number: u16) -> GradeResult<PersonalVariant> {
        let (table, entity) = match curriculum {
            Curriculum::CivilEngineering => (&self.civil_variants, "civil personal variant"),
            Curriculum::Architecture => (&self.architecture_variants, "architecture personal variant"),
        };
        table
            .get(&number)
            .cloned()
            .ok_or_else(|| GradeError::not_found(entity, number))
    }

    fn get_slab_height(&self, student_id: StudentId) -> GradeResult<f64> {
        self.slab_heights
            .get(&student_id)
            .copied()
            .ok_or_else(|| GradeError::not_found("slab height", student_id))
    }

    fn find_student(&self, group_id: u64, subgroup_variant: u16, personal_variant: u16) -> GradeResult<Student> {
        self.roster
            .find(group_id, subgroup_variant, personal_variant)
            .cloned()
            .ok_or_else(|| {
                GradeError::not_found(
                    "student",
                    format!("group {} subgroup {} personal {}", group_id, subgroup_variant, personal_variant),
                )
            })
    }

    fn find_slab_variant(&self, floor: FloorLevel) -> GradeResult<PersonalVariant> {
        self.civil_variants
            .values()
            .find(|pv| pv.slab.contains(floor.marker()))
            .cloned()
            .ok_or_else(|| GradeError::not_found("slab personal variant", floor.marker()))
    }
}
