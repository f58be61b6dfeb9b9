//! # Required Longitudinal Reinforcement
//!
//! Sizes the tension steel at the three control sections by the α_m method
//! (SP 63.13330). Mid-span is designed as a rectangle of the wall width; the
//! supports, where the slab is in compression, as a T-section with the
//! effective flange width.
//!
//! ## Rectangular section
//!
//! ```text
//! α_m = (M − R_sc·A_sc·(h₀ − a_sc)) / (R_b·b·h₀²)
//!
//! α_m < 0:  A_s = M / (R_s·(h₀ − a_sc))
//! else:     A_s = R_b·b·h₀·(1 − √(1 − 2α_m)) / R_s + A_sc·R_sc / R_s
//! ```
//!
//! ## T-section (supports)
//!
//! ```text
//! M_f = R_b·b_f·h_f·(h₀ − h_f/2) + R_sc·A_sc·(h₀ − a_sc)
//! ```
//!
//! The neutral axis must lie in the flange (`M_f > M`); the section is then
//! designed as a rectangle of width `b_f` and `α_m` may not exceed `α_R`.
//!
//! Units throughout: kN, cm.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::{CalcOutcome, StudentMaterials, Upstream};
use crate::errors::{GradeError, GradeResult};
use crate::sections::Section;
use crate::stages::{CalculatedReinforcementAnswer, StageId};

/// Inputs of the rectangular design formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangularInput {
    /// Design moment M (kN·cm)
    pub moment: f64,
    pub r_b: f64,
    pub r_s: f64,
    pub r_sc: f64,
    /// Compressed-zone width b (cm)
    pub width: f64,
    /// h₀ (cm)
    pub effective_depth: f64,
    /// A_sc (cm²)
    pub compression_area: f64,
    /// a_sc (cm)
    pub compression_distance: f64,
}

impl RectangularInput {
    pub fn validate(&self) -> GradeResult<()> {
        for (field, value) in [
            ("R_b", self.r_b),
            ("R_s", self.r_s),
            ("width", self.width),
            ("effective_depth", self.effective_depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GradeError::invalid_input(field, value.to_string(), "must be positive"));
            }
        }
        if self.effective_depth <= self.compression_distance {
            return Err(GradeError::invalid_input(
                "effective_depth",
                self.effective_depth.to_string(),
                format!(
                    "must exceed the compression steel distance {}",
                    self.compression_distance
                ),
            ));
        }
        Ok(())
    }

    /// Lever-arm contribution of the compression steel, R_sc·A_sc·(h₀ − a_sc)
    fn compression_steel_moment(&self) -> f64 {
        self.r_sc * self.compression_area * (self.effective_depth - self.compression_distance)
    }

    pub fn alpha_m(&self) -> f64 {
        (self.moment - self.compression_steel_moment())
            / (self.r_b * self.width * self.effective_depth.powi(2))
    }

    /// Required area for a given α_m.
    ///
    /// Callers must ensure `1 − 2α_m ≥ 0` when `α_m ≥ 0`.
    fn area_for(&self, alpha_m: f64) -> f64 {
        if alpha_m < 0.0 {
            self.moment / (self.r_s * (self.effective_depth - self.compression_distance))
        } else {
            self.r_b * self.width * self.effective_depth * (1.0 - (1.0 - 2.0 * alpha_m).sqrt()) / self.r_s
                + self.compression_area * self.r_sc / self.r_s
        }
    }
}

/// Inputs of the T-section check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TSectionInput {
    /// Rectangular inputs with `width` = effective flange width b_f
    pub rect: RectangularInput,
    /// h_f (cm)
    pub flange_height: f64,
    /// α_R of the steel class
    pub alpha_r: f64,
}

impl TSectionInput {
    /// M_f
    pub fn moment_flange_capacity(&self) -> f64 {
        let r = &self.rect;
        r.r_b * r.width * self.flange_height * (r.effective_depth - self.flange_height / 2.0)
            + r.compression_steel_moment()
    }
}

/// Calculated reinforcement at one section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementAreaResult {
    pub alpha_m: f64,
    /// A_s (cm²)
    pub reinforcement_area: f64,
    /// Supports only
    pub moment_flange_capacity: Option<f64>,
    /// Supports only
    pub is_neutral_axis_in_flange: Option<bool>,
}

impl From<ReinforcementAreaResult> for CalculatedReinforcementAnswer {
    fn from(r: ReinforcementAreaResult) -> Self {
        CalculatedReinforcementAnswer {
            alpha_m: Some(r.alpha_m),
            moment_flange_capacity: r.moment_flange_capacity,
            is_neutral_axis_in_flange: r.is_neutral_axis_in_flange,
            reinforcement_area: Some(r.reinforcement_area),
        }
    }
}

/// Mid-span design as a rectangle.
pub fn rectangular(input: &RectangularInput) -> GradeResult<ReinforcementAreaResult> {
    input.validate()?;
    let alpha_m = input.alpha_m();
    if alpha_m >= 0.0 && 1.0 - 2.0 * alpha_m < 0.0 {
        return Err(GradeError::CompressedZoneCapacityExceeded {
            section: Section::Middle.name().to_string(),
            alpha_m,
            alpha_r: 0.5,
        });
    }
    debug!(alpha_m, compression_governed = alpha_m < 0.0, "rectangular section");
    Ok(ReinforcementAreaResult {
        alpha_m,
        reinforcement_area: input.area_for(alpha_m),
        moment_flange_capacity: None,
        is_neutral_axis_in_flange: None,
    })
}

/// Support design as a T-section with the neutral axis in the flange.
pub fn t_section(section: Section, input: &TSectionInput) -> GradeResult<ReinforcementAreaResult> {
    input.rect.validate()?;
    let m_f = input.moment_flange_capacity();
    if m_f <= input.rect.moment {
        return Err(GradeError::unsupported_case(
            format!("reinforcement at {} support", section),
            format!(
                "neutral axis below the flange (M_f = {:.1} <= M = {:.1})",
                m_f, input.rect.moment
            ),
        ));
    }

    let alpha_m = input.rect.alpha_m();
    if alpha_m > input.alpha_r {
        return Err(GradeError::CompressedZoneCapacityExceeded {
            section: section.name().to_string(),
            alpha_m,
            alpha_r: input.alpha_r,
        });
    }
    debug!(%section, m_f, alpha_m, "T-section, neutral axis in flange");
    Ok(ReinforcementAreaResult {
        alpha_m,
        reinforcement_area: input.rect.area_for(alpha_m),
        moment_flange_capacity: Some(m_f),
        is_neutral_axis_in_flange: Some(true),
    })
}

/// Formula inputs for one section, or the stages still missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionDesign {
    Rectangular(RectangularInput),
    TSection(TSectionInput),
}

/// Assemble the inputs for `section` from the student's answers.
pub fn gather_inputs(section: Section, upstream: &Upstream<'_>) -> CalcOutcome<SectionDesign> {
    let mut missing = Vec::new();
    let materials = StudentMaterials::gather(upstream, &mut missing);

    let geometry = upstream.section();
    if geometry.is_none() {
        missing.push(StageId::GirderGeometry);
    }
    let moment = upstream.moments().map(|m| m.design_moment(section));
    if moment.is_none() {
        missing.push(StageId::MomentsForces);
    }
    let tension = section.design_tension_face();
    let layers = upstream.initial_reinforcement().map(|ir| ir.layers.section(section));
    if layers.is_none() {
        missing.push(StageId::InitialReinforcement);
    }
    let effective_depth = layers.and_then(|l| l.get(tension).effective_depth);
    if layers.is_some() && effective_depth.is_none() && !missing.contains(&StageId::GirderGeometry) {
        missing.push(StageId::GirderGeometry);
    }
    let alpha_r = materials.and_then(|m| m.alpha_r);
    if section.is_support() && materials.is_some() && alpha_r.is_none() {
        missing.push(StageId::Reinforcement);
    }

    match (materials, geometry, moment, layers, effective_depth) {
        (Some(m), Some(g), Some(moment), Some(layers), Some(h0)) if missing.is_empty() => {
            let compression = layers.get(tension.opposite());
            let rect = RectangularInput {
                moment,
                r_b: m.r_b,
                r_s: m.r_s,
                r_sc: m.r_sc,
                width: if section.is_support() {
                    g.effective_flange_width
                } else {
                    g.wall_width
                },
                effective_depth: h0,
                compression_area: compression.area,
                compression_distance: compression.distance,
            };
            match (section.is_support(), alpha_r) {
                (true, Some(alpha_r)) => CalcOutcome::Complete(SectionDesign::TSection(TSectionInput {
                    rect,
                    flange_height: g.flange_height,
                    alpha_r,
                })),
                _ => CalcOutcome::Complete(SectionDesign::Rectangular(rect)),
            }
        }
        _ => CalcOutcome::Incomplete { missing },
    }
}

/// Program answer for the reinforcement stage of `section`.
pub fn calculate(section: Section, upstream: &Upstream<'_>) -> GradeResult<CalcOutcome<ReinforcementAreaResult>> {
    Ok(match gather_inputs(section, upstream) {
        CalcOutcome::Complete(SectionDesign::Rectangular(input)) => CalcOutcome::Complete(rectangular(&input)?),
        CalcOutcome::Complete(SectionDesign::TSection(input)) => CalcOutcome::Complete(t_section(section, &input)?),
        CalcOutcome::Incomplete { missing } => {
            debug!(%section, ?missing, "reinforcement inputs incomplete");
            CalcOutcome::Incomplete { missing }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::geometry::GirderSection;
    use crate::calculations::AnswerMap;
    use crate::sections::Surface;
    use crate::stages::{
        ConcreteAnswer, GirderGeometryAnswer, InitialLayer, InitialReinforcementAnswer, MomentsForcesAnswer,
        ReinforcementAnswer, StageAnswer,
    };
    use approx::assert_abs_diff_eq;

    fn midspan_example() -> RectangularInput {
        RectangularInput {
            moment: 12000.0,
            r_b: 1.7,
            r_s: 36.5,
            r_sc: 36.5,
            width: 30.0,
            effective_depth: 55.0,
            compression_area: 2.0,
            compression_distance: 3.0,
        }
    }

    #[test]
    fn test_midspan_regression_example() {
        let input = midspan_example();
        let result = rectangular(&input).unwrap();

        let expected_alpha = (12000.0 - 36.5 * 2.0 * (55.0 - 3.0)) / (1.7 * 30.0 * 55.0_f64.powi(2));
        let expected_area =
            1.7 * 30.0 * 55.0 * (1.0 - (1.0 - 2.0 * expected_alpha).sqrt()) / 36.5 + 2.0 * 36.5 / 36.5;
        assert_abs_diff_eq!(result.alpha_m, expected_alpha, epsilon = 1e-12);
        assert_abs_diff_eq!(result.reinforcement_area, expected_area, epsilon = 1e-12);
        assert_abs_diff_eq!(result.alpha_m, 0.05318, epsilon = 1e-5);
        assert_abs_diff_eq!(result.reinforcement_area, 6.20, epsilon = 0.01);
        assert!(result.moment_flange_capacity.is_none());
    }

    #[test]
    fn test_negative_alpha_uses_lever_arm_formula() {
        let input = RectangularInput {
            moment: 3000.0,
            ..midspan_example()
        };
        let result = rectangular(&input).unwrap();
        assert!(result.alpha_m < 0.0);
        assert_abs_diff_eq!(result.reinforcement_area, 3000.0 / (36.5 * 52.0), epsilon = 1e-12);
    }

    #[test]
    fn test_midspan_root_undefined_is_capacity_error() {
        let input = RectangularInput {
            moment: 100000.0,
            compression_area: 0.0,
            ..midspan_example()
        };
        match rectangular(&input).unwrap_err() {
            GradeError::CompressedZoneCapacityExceeded { alpha_r, .. } => assert_eq!(alpha_r, 0.5),
            other => panic!("unexpected error {:?}", other),
        }
    }

    fn support_example(moment: f64) -> TSectionInput {
        TSectionInput {
            rect: RectangularInput {
                moment,
                r_b: 1.45,
                r_s: 35.0,
                r_sc: 35.0,
                width: 95.0,
                effective_depth: 62.0,
                compression_area: 2.0,
                compression_distance: 3.0,
            },
            flange_height: 23.0,
            alpha_r: 0.39,
        }
    }

    #[test]
    fn test_support_in_flange() {
        let result = t_section(Section::Left, &support_example(15000.0)).unwrap();
        assert_abs_diff_eq!(result.moment_flange_capacity.unwrap(), 164126.625, epsilon = 1e-6);
        assert_eq!(result.is_neutral_axis_in_flange, Some(true));
        assert_abs_diff_eq!(result.alpha_m, 0.020528, epsilon = 1e-6);
        assert_abs_diff_eq!(result.reinforcement_area, 7.0617, epsilon = 1e-4);
    }

    #[test]
    fn test_support_axis_below_flange_unsupported() {
        let err = t_section(Section::Right, &support_example(200000.0)).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CASE");
    }

    #[test]
    fn test_support_alpha_over_limit() {
        let mut input = support_example(160000.0);
        input.flange_height = 40.0;
        input.rect.effective_depth = 50.0;
        input.rect.compression_area = 0.0;
        let err = t_section(Section::Left, &input).unwrap_err();
        assert_eq!(err.error_code(), "COMPRESSED_ZONE_CAPACITY_EXCEEDED");
    }

    #[test]
    fn test_depth_not_beyond_compression_steel() {
        let input = RectangularInput {
            effective_depth: 3.0,
            ..midspan_example()
        };
        assert_eq!(rectangular(&input).unwrap_err().error_code(), "INVALID_INPUT");
    }

    fn answers(with_initial: bool) -> AnswerMap {
        let mut answers = AnswerMap::new();
        answers.insert(
            StageId::Concrete,
            StageAnswer::Concrete(ConcreteAnswer {
                r_b: Some(1.7),
                ..Default::default()
            }),
        );
        answers.insert(
            StageId::Reinforcement,
            StageAnswer::Reinforcement(ReinforcementAnswer {
                r_s: Some(36.5),
                r_sc_short: Some(36.5),
                alpha_r: Some(0.39),
                ..Default::default()
            }),
        );
        answers.insert(
            StageId::GirderGeometry,
            StageAnswer::GirderGeometry(GirderGeometryAnswer {
                wall_height: 35.0,
                wall_width: 30.0,
                flange_bevel_height: 15.0,
                flange_bevel_width: 10.0,
                flange_slab_height: Some(8.0),
                flange_full_width: 160.0,
                derived: Some(GirderSection {
                    girder_height: 58.0,
                    flange_console_width: 8.0,
                    effective_flange_width: 95.0,
                    flange_height: 23.0,
                    wall_width: 30.0,
                    span_length: 556.0,
                }),
            }),
        );
        answers.insert(
            StageId::MomentsForces,
            StageAnswer::MomentsForces(MomentsForcesAnswer {
                moment_middle_bot: 12000.0,
                moment_left_top: 15000.0,
                moment_right_top: 15000.0,
            }),
        );
        if with_initial {
            let mut initial = InitialReinforcementAnswer::default();
            for section in Section::ALL {
                *initial.layers.get_mut(section, Surface::Top) = InitialLayer {
                    area: 2.0,
                    distance: 3.0,
                    effective_depth: None,
                };
                *initial.layers.get_mut(section, Surface::Bot) = InitialLayer {
                    area: 2.0,
                    distance: 3.0,
                    effective_depth: None,
                };
            }
            initial.derive_depths(Some(58.0));
            answers.insert(StageId::InitialReinforcement, StageAnswer::InitialReinforcement(initial));
        }
        answers
    }

    #[test]
    fn test_gather_midspan_from_answers() {
        let answers = answers(true);
        let outcome = calculate(Section::Middle, &Upstream::new(&answers)).unwrap();
        let CalcOutcome::Complete(result) = outcome else {
            panic!("expected complete outcome");
        };
        // h0 = 58 - 3 = 55, same numbers as the regression example
        assert_abs_diff_eq!(result.reinforcement_area, rectangular(&midspan_example()).unwrap().reinforcement_area);
    }

    #[test]
    fn test_gather_support_uses_flange_width() {
        let answers = answers(true);
        match gather_inputs(Section::Left, &Upstream::new(&answers)) {
            CalcOutcome::Complete(SectionDesign::TSection(t)) => {
                assert_eq!(t.rect.width, 95.0);
                assert_eq!(t.rect.effective_depth, 55.0);
                assert_eq!(t.flange_height, 23.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_initial_reinforcement_is_incomplete() {
        let answers = answers(false);
        let outcome = calculate(Section::Right, &Upstream::new(&answers)).unwrap();
        assert_eq!(
            outcome,
            CalcOutcome::Incomplete {
                missing: vec![StageId::InitialReinforcement]
            }
        );
    }
}
