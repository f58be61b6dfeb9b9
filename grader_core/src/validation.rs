//! # Answer Validation
//!
//! Field-by-field comparison of a student record against the program answer.
//!
//! | Field kind | Rule |
//! |------------|------|
//! | Category (class id) | exact match after class-id normalization |
//! | Flag | strict equality, only evaluated when the student submitted it |
//! | Number | within `reference·(1 ± t)` for the field's tolerance class; absent fails |
//!
//! A field the program answer does not have (e.g. `r_sw` for a class without
//! a tabulated value) is skipped unless the student entered something, which
//! then fails. An incomplete program answer fails every field.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ToleranceClass, Tolerances};
use crate::errors::{GradeError, GradeResult};
use crate::stages::{
    BearingCapacityAnswer, CalculatedReinforcementAnswer, ConcreteAnswer, ProgramAnswer, ReinforcementAnswer,
    StageAnswer, StageId,
};

/// Whether `student` lies inside the relative band around `reference`.
///
/// The band is `[reference·(1 − t), reference·(1 + t)]`, inclusive, ordered so
/// that negative references work too.
///
/// ```rust
/// use grader_core::validation::within_tolerance;
///
/// assert!(within_tolerance(100.0, 100.0 * 1.01, 0.01));
/// assert!(!within_tolerance(100.0, 101.0001, 0.01));
/// assert!(within_tolerance(-2.0, -2.01, 0.01));
/// ```
pub fn within_tolerance(reference: f64, student: f64, tolerance: f64) -> bool {
    let lo = reference * (1.0 - tolerance);
    let hi = reference * (1.0 + tolerance);
    let (min, max) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    student >= min && student <= max
}

/// Value of one gradable field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(Option<f64>),
    Flag(Option<bool>),
    Category(Option<String>),
}

impl FieldValue {
    fn is_present(&self) -> bool {
        match self {
            FieldValue::Number(v) => v.is_some(),
            FieldValue::Flag(v) => v.is_some(),
            FieldValue::Category(v) => v.is_some(),
        }
    }
}

/// One named field with its tolerance class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: &'static str,
    pub value: FieldValue,
    pub class: ToleranceClass,
}

impl FieldEntry {
    fn number(name: &'static str, value: Option<f64>, class: ToleranceClass) -> Self {
        FieldEntry {
            name,
            value: FieldValue::Number(value),
            class,
        }
    }

    fn flag(name: &'static str, value: Option<bool>) -> Self {
        FieldEntry {
            name,
            value: FieldValue::Flag(value),
            class: ToleranceClass::Calculated,
        }
    }

    fn category(name: &'static str, value: Option<&String>) -> Self {
        FieldEntry {
            name,
            value: FieldValue::Category(value.cloned()),
            class: ToleranceClass::MaterialStrength,
        }
    }
}

/// A record whose fields are graded.
pub trait GradedRecord {
    fn fields(&self) -> Vec<FieldEntry>;
}

impl GradedRecord for ConcreteAnswer {
    fn fields(&self) -> Vec<FieldEntry> {
        use ToleranceClass::MaterialStrength as M;
        vec![
            FieldEntry::category("concrete_class", self.concrete_class.as_ref()),
            FieldEntry::number("r_b_n", self.r_b_n, M),
            FieldEntry::number("r_bt_n", self.r_bt_n, M),
            FieldEntry::number("r_b", self.r_b, M),
            FieldEntry::number("r_bt", self.r_bt, M),
            FieldEntry::number("e_b", self.e_b, M),
        ]
    }
}

impl GradedRecord for ReinforcementAnswer {
    fn fields(&self) -> Vec<FieldEntry> {
        use ToleranceClass::{CodeLimit, MaterialStrength as M};
        vec![
            FieldEntry::category("reinforcement_class", self.reinforcement_class.as_ref()),
            FieldEntry::number("r_s_ser", self.r_s_ser, M),
            FieldEntry::number("r_s", self.r_s, M),
            FieldEntry::number("r_sc_long", self.r_sc_long, M),
            FieldEntry::number("r_sc_short", self.r_sc_short, M),
            FieldEntry::number("r_sw", self.r_sw, M),
            FieldEntry::number("alpha_r", self.alpha_r, CodeLimit),
            FieldEntry::number("xi_r", self.xi_r, CodeLimit),
        ]
    }
}

impl GradedRecord for CalculatedReinforcementAnswer {
    fn fields(&self) -> Vec<FieldEntry> {
        use ToleranceClass::Calculated as C;
        vec![
            FieldEntry::number("moment_flange_capacity", self.moment_flange_capacity, C),
            FieldEntry::flag("is_neutral_axis_in_flange", self.is_neutral_axis_in_flange),
            FieldEntry::number("alpha_m", self.alpha_m, C),
            FieldEntry::number("reinforcement_area", self.reinforcement_area, C),
        ]
    }
}

impl GradedRecord for BearingCapacityAnswer {
    fn fields(&self) -> Vec<FieldEntry> {
        use ToleranceClass::{Calculated as C, Geometry as G};
        vec![
            FieldEntry::number("ultimate_tensile_force", self.ultimate_tensile_force, C),
            FieldEntry::number("ultimate_compressive_force", self.ultimate_compressive_force, C),
            FieldEntry::number("compressed_zone_height_a", self.compressed_zone_height_a, G),
            FieldEntry::number(
                "relative_compressed_zone_height_a",
                self.relative_compressed_zone_height_a,
                C,
            ),
            FieldEntry::number("bearing_capacity_a", self.bearing_capacity_a, C),
            FieldEntry::number("compressed_zone_height_b", self.compressed_zone_height_b, G),
            FieldEntry::number("bearing_capacity_b", self.bearing_capacity_b, C),
            FieldEntry::number("bearing_capacity", self.bearing_capacity, C),
        ]
    }
}

/// Graded fields of a record, or `None` for kinds that are not graded.
pub fn graded_fields(answer: &StageAnswer) -> Option<Vec<FieldEntry>> {
    match answer {
        StageAnswer::Concrete(a) => Some(a.fields()),
        StageAnswer::Reinforcement(a) => Some(a.fields()),
        StageAnswer::ReinforcementArea(a) => Some(a.fields()),
        StageAnswer::BearingCapacity(a) => Some(a.fields()),
        _ => None,
    }
}

/// Pass/fail per field for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageId,
    pub fields: BTreeMap<String, bool>,
    pub validated_at: DateTime<Utc>,
}

impl StageResult {
    /// All compared fields passed
    pub fn passed(&self) -> bool {
        self.fields.values().all(|ok| *ok)
    }
}

/// Compare a single field. `None` means the field is not part of the result.
fn compare_field(program: &FieldValue, student: &FieldValue, class: ToleranceClass, tolerances: &Tolerances) -> Option<bool> {
    match (program, student) {
        (FieldValue::Flag(_), FieldValue::Flag(None)) | (FieldValue::Flag(None), FieldValue::Flag(_)) => None,
        (FieldValue::Flag(p), FieldValue::Flag(s)) => Some(p == s),
        (p, s) if !p.is_present() => s.is_present().then_some(false),
        (FieldValue::Number(Some(p)), FieldValue::Number(s)) => {
            Some(s.is_some_and(|s| within_tolerance(*p, s, tolerances.for_class(class))))
        }
        (FieldValue::Category(Some(p)), FieldValue::Category(s)) => {
            Some(s.as_deref() == Some(p.as_str()))
        }
        _ => Some(false),
    }
}

/// Grade a student record against the program answer.
pub fn validate(
    stage: StageId,
    program: &ProgramAnswer,
    student: &StageAnswer,
    tolerances: &Tolerances,
) -> GradeResult<StageResult> {
    if !program.record.fits(stage) {
        return Err(program.record.mismatch(stage));
    }
    if !student.fits(stage) {
        return Err(student.mismatch(stage));
    }
    let (Some(program_fields), Some(student_fields)) = (graded_fields(&program.record), graded_fields(student))
    else {
        return Err(GradeError::Internal {
            message: format!("stage {} is not graded", stage),
        });
    };

    let mut fields = BTreeMap::new();
    for (p, s) in program_fields.iter().zip(student_fields.iter()) {
        let outcome = compare_field(&p.value, &s.value, p.class, tolerances);
        let outcome = match outcome {
            Some(_) if !program.complete => Some(false),
            None if !program.complete && p.value.is_present() => Some(false),
            other => other,
        };
        if let Some(ok) = outcome {
            fields.insert(p.name.to_string(), ok);
        }
    }
    debug!(%stage, complete = program.complete, passed = fields.values().filter(|v| **v).count(), total = fields.len(), "validated stage");

    Ok(StageResult {
        stage,
        fields,
        validated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialTables;
    use crate::sections::{Section, Surface};

    fn tolerances() -> Tolerances {
        Tolerances::default()
    }

    #[test]
    fn test_tolerance_boundary_exact() {
        for v in [1.45, 30.0, 6.2015, 12345.678] {
            for t in [0.001, 0.005, 0.01] {
                let hi = v * (1.0 + t);
                let lo = v * (1.0 - t);
                assert!(within_tolerance(v, hi, t), "upper bound {} for {}", hi, v);
                assert!(within_tolerance(v, lo, t), "lower bound {} for {}", lo, v);
                assert!(!within_tolerance(v, hi + 1e-9 * v.max(1.0), t));
                assert!(!within_tolerance(v, lo - 1e-9 * v.max(1.0), t));
            }
        }
    }

    #[test]
    fn test_tolerance_negative_reference() {
        assert!(within_tolerance(-1.0, -1.0, 0.01));
        assert!(within_tolerance(-1.0, -0.99, 0.01));
        assert!(!within_tolerance(-1.0, -0.98, 0.01));
    }

    fn concrete_program() -> ProgramAnswer {
        let tables = MaterialTables::builtin().unwrap();
        let grade = tables.concrete_grade("B25").unwrap();
        ProgramAnswer::complete(StageAnswer::Concrete(ConcreteAnswer::from_grade(grade)))
    }

    #[test]
    fn test_categorical_match() {
        let student = StageAnswer::Concrete(ConcreteAnswer {
            concrete_class: Some("B25".to_string()),
            r_b_n: Some(1.85),
            r_bt_n: Some(0.155),
            r_b: Some(1.45),
            r_bt: Some(0.105),
            e_b: Some(3000.0),
        });
        let result = validate(StageId::Concrete, &concrete_program(), &student, &tolerances()).unwrap();
        assert_eq!(result.fields["concrete_class"], true);
        assert!(result.passed(), "{:?}", result.fields);

        let wrong = StageAnswer::Concrete(ConcreteAnswer {
            concrete_class: Some("B30".to_string()),
            ..Default::default()
        });
        let result = validate(StageId::Concrete, &concrete_program(), &wrong, &tolerances()).unwrap();
        assert_eq!(result.fields["concrete_class"], false);
        // Absent numbers fail
        assert_eq!(result.fields["r_b"], false);
        assert_eq!(result.fields.len(), 6);

        // Identifiers compare exactly
        for spelling in ["b25", "В25", "B 25"] {
            let answer = StageAnswer::Concrete(ConcreteAnswer {
                concrete_class: Some(spelling.to_string()),
                ..Default::default()
            });
            let result = validate(StageId::Concrete, &concrete_program(), &answer, &tolerances()).unwrap();
            assert_eq!(result.fields["concrete_class"], false, "{}", spelling);
        }
    }

    #[test]
    fn test_material_in_mpa_fails() {
        let student = StageAnswer::Concrete(ConcreteAnswer {
            r_b: Some(14.5),
            ..Default::default()
        });
        let result = validate(StageId::Concrete, &concrete_program(), &student, &tolerances()).unwrap();
        assert_eq!(result.fields["r_b"], false);
    }

    #[test]
    fn test_untabulated_field_skipped_unless_entered() {
        let tables = MaterialTables::builtin().unwrap();
        let a600 = tables.reinforcement_grade("A600").unwrap();
        let program = ProgramAnswer::complete(StageAnswer::Reinforcement(ReinforcementAnswer::from_grade(a600)));

        let mut answer = ReinforcementAnswer::from_grade(a600);
        let result = validate(
            StageId::Reinforcement,
            &program,
            &StageAnswer::Reinforcement(answer.clone()),
            &tolerances(),
        )
        .unwrap();
        assert!(!result.fields.contains_key("r_sw"));
        assert!(result.passed());

        answer.r_sw = Some(30.0);
        let result = validate(StageId::Reinforcement, &program, &StageAnswer::Reinforcement(answer), &tolerances())
            .unwrap();
        assert_eq!(result.fields["r_sw"], false);
    }

    #[test]
    fn test_flag_only_when_submitted() {
        let program = ProgramAnswer::complete(StageAnswer::ReinforcementArea(CalculatedReinforcementAnswer {
            alpha_m: Some(0.02),
            moment_flange_capacity: Some(164126.6),
            is_neutral_axis_in_flange: Some(true),
            reinforcement_area: Some(7.06),
        }));
        let mut student = CalculatedReinforcementAnswer {
            alpha_m: Some(0.0201),
            moment_flange_capacity: Some(164000.0),
            is_neutral_axis_in_flange: None,
            reinforcement_area: Some(7.1),
        };
        let result = validate(
            StageId::CalculatedReinforcementLeft,
            &program,
            &StageAnswer::ReinforcementArea(student.clone()),
            &tolerances(),
        )
        .unwrap();
        assert!(!result.fields.contains_key("is_neutral_axis_in_flange"));
        assert!(result.passed());

        student.is_neutral_axis_in_flange = Some(false);
        let result = validate(
            StageId::CalculatedReinforcementLeft,
            &program,
            &StageAnswer::ReinforcementArea(student),
            &tolerances(),
        )
        .unwrap();
        assert_eq!(result.fields["is_neutral_axis_in_flange"], false);
    }

    #[test]
    fn test_flag_skipped_when_section_has_none() {
        let program = ProgramAnswer::complete(StageAnswer::ReinforcementArea(CalculatedReinforcementAnswer {
            alpha_m: Some(0.053),
            moment_flange_capacity: None,
            is_neutral_axis_in_flange: None,
            reinforcement_area: Some(6.2),
        }));
        let student = CalculatedReinforcementAnswer {
            alpha_m: Some(0.053),
            moment_flange_capacity: None,
            is_neutral_axis_in_flange: Some(true),
            reinforcement_area: Some(6.2),
        };
        let result = validate(
            StageId::CalculatedReinforcementMiddle,
            &program,
            &StageAnswer::ReinforcementArea(student),
            &tolerances(),
        )
        .unwrap();
        assert!(!result.fields.contains_key("is_neutral_axis_in_flange"));
        assert!(result.passed(), "{:?}", result.fields);
    }

    #[test]
    fn test_incomplete_program_fails_every_field() {
        let program = ProgramAnswer::incomplete(StageId::BearingCapacityLeftTop, vec![StageId::CalculatedReinforcement])
            .unwrap();
        // A student who types the sentinel values still fails
        let student = StageAnswer::BearingCapacity(BearingCapacityAnswer::sentinel(Surface::Top));
        let result = validate(StageId::BearingCapacityLeftTop, &program, &student, &tolerances()).unwrap();
        assert_eq!(result.fields.len(), 8);
        assert!(result.fields.values().all(|ok| !ok));
    }

    #[test]
    fn test_incomplete_midspan_has_no_flange_fields() {
        let program = ProgramAnswer::incomplete(StageId::CalculatedReinforcementMiddle, Vec::new()).unwrap();
        let student = StageAnswer::ReinforcementArea(CalculatedReinforcementAnswer::default());
        let result = validate(StageId::CalculatedReinforcementMiddle, &program, &student, &tolerances()).unwrap();
        let names: Vec<_> = result.fields.keys().cloned().collect();
        assert_eq!(names, vec!["alpha_m".to_string(), "reinforcement_area".to_string()]);
        assert!(CalculatedReinforcementAnswer::sentinel(Section::Middle).moment_flange_capacity.is_none());
    }

    #[test]
    fn test_mismatched_record_rejected() {
        let student = StageAnswer::ReinforcementArea(CalculatedReinforcementAnswer::default());
        let err = validate(StageId::Concrete, &concrete_program(), &student, &tolerances()).unwrap_err();
        assert_eq!(err.error_code(), "PAYLOAD_MISMATCH");
    }
}
