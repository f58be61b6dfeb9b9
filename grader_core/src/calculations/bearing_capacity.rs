//! # Bearing Capacity of Placed Reinforcement
//!
//! Ultimate moment of a section face with the bars actually placed, checked
//! two ways and the smaller kept.
//!
//! ```text
//! (a)  x_a = (R_s·A_t − R_sc·A_c) / (R_b·b),   ξ_a = x_a / h₀
//!      x_a < 1.01·a_c:  M_a = R_s·A_t·(h₀ − a_c)
//!      else:            M_a = R_b·b·x_a·(h₀ − x_a/2) + R_sc·A_c·(h₀ − a_c)
//!
//! (b)  x_b = R_s·A_t / (R_b·b)
//!      x_b < 2·a_c:     M_b = R_s·A_t·(h₀ − x_b/2)
//!      else:            M_b = 0 (not applicable)
//!
//!      M = min(M_a, M_b) if M_b ≠ 0, else M_a
//! ```
//!
//! `A_t` is the steel in the tension face, `A_c`/`a_c` the steel in the
//! opposite face. With the top in tension the slab is in compression, so
//! `b = b_f` and the flange must be able to balance the steel:
//! `R_s·A_t ≤ R_b·b_f·h_f + R_sc·A_c`. With the bottom in tension `b = b_w`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::{CalcOutcome, StudentMaterials, Upstream};
use crate::errors::{GradeError, GradeResult};
use crate::sections::{Section, Surface};
use crate::stages::{BearingCapacityAnswer, StageId};

/// Inputs for one section face (kN, cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingCapacityInput {
    /// Face in tension
    pub surface: Surface,
    pub r_s: f64,
    pub r_sc: f64,
    pub r_b: f64,
    /// b_w
    pub wall_width: f64,
    /// b_f
    pub flange_width: f64,
    /// h_f
    pub flange_height: f64,
    /// A_t
    pub tension_area: f64,
    /// h₀ of the tension face
    pub effective_depth: f64,
    /// A_c
    pub compression_area: f64,
    /// a_c
    pub compression_distance: f64,
}

impl BearingCapacityInput {
    /// Compressed-zone width for the face in tension
    pub fn width(&self) -> f64 {
        match self.surface {
            Surface::Top => self.flange_width,
            Surface::Bot => self.wall_width,
        }
    }

    pub fn validate(&self) -> GradeResult<()> {
        for (field, value) in [
            ("R_b", self.r_b),
            ("R_s", self.r_s),
            ("width", self.width()),
            ("effective_depth", self.effective_depth),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GradeError::invalid_input(field, value.to_string(), "must be positive"));
            }
        }
        Ok(())
    }
}

/// Capacity of one section face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingCapacityResult {
    /// R_s·A_t, top face only
    pub ultimate_tensile_force: Option<f64>,
    /// R_b·b_f·h_f + R_sc·A_c, top face only
    pub ultimate_compressive_force: Option<f64>,
    pub compressed_zone_height_a: f64,
    pub relative_compressed_zone_height_a: f64,
    pub bearing_capacity_a: f64,
    pub compressed_zone_height_b: f64,
    /// Zero when method (b) does not apply
    pub bearing_capacity_b: f64,
    pub bearing_capacity: f64,
}

impl From<BearingCapacityResult> for BearingCapacityAnswer {
    fn from(r: BearingCapacityResult) -> Self {
        BearingCapacityAnswer {
            ultimate_tensile_force: r.ultimate_tensile_force,
            ultimate_compressive_force: r.ultimate_compressive_force,
            compressed_zone_height_a: Some(r.compressed_zone_height_a),
            relative_compressed_zone_height_a: Some(r.relative_compressed_zone_height_a),
            bearing_capacity_a: Some(r.bearing_capacity_a),
            compressed_zone_height_b: Some(r.compressed_zone_height_b),
            bearing_capacity_b: Some(r.bearing_capacity_b),
            bearing_capacity: Some(r.bearing_capacity),
        }
    }
}

/// Bearing capacity of one face.
pub fn calculate_face(section: Section, input: &BearingCapacityInput) -> GradeResult<BearingCapacityResult> {
    input.validate()?;
    let b = input.width();
    let h0 = input.effective_depth;
    let a_c = input.compression_distance;
    let tension_force = input.r_s * input.tension_area;
    let compression_steel_force = input.r_sc * input.compression_area;

    let (ultimate_tensile_force, ultimate_compressive_force) = match input.surface {
        Surface::Top => {
            let compressive = input.r_b * input.flange_width * input.flange_height + compression_steel_force;
            if tension_force > compressive {
                return Err(GradeError::unsupported_case(
                    format!("bearing capacity at {} {}", section, input.surface),
                    format!(
                        "tension steel force {:.1} exceeds flange capacity {:.1}",
                        tension_force, compressive
                    ),
                ));
            }
            (Some(tension_force), Some(compressive))
        }
        Surface::Bot => (None, None),
    };

    let x_a = (tension_force - compression_steel_force) / (input.r_b * b);
    let xi_a = x_a / h0;
    let m_a = if x_a < 1.01 * a_c {
        tension_force * (h0 - a_c)
    } else {
        input.r_b * b * x_a * (h0 - x_a / 2.0) + compression_steel_force * (h0 - a_c)
    };

    let x_b = tension_force / (input.r_b * b);
    let m_b = if x_b < 2.0 * a_c {
        tension_force * (h0 - x_b / 2.0)
    } else {
        0.0
    };

    let m = if m_b != 0.0 { m_a.min(m_b) } else { m_a };
    debug!(%section, surface = %input.surface, x_a, x_b, m_a, m_b, "bearing capacity");

    Ok(BearingCapacityResult {
        ultimate_tensile_force,
        ultimate_compressive_force,
        compressed_zone_height_a: x_a,
        relative_compressed_zone_height_a: xi_a,
        bearing_capacity_a: m_a,
        compressed_zone_height_b: x_b,
        bearing_capacity_b: m_b,
        bearing_capacity: m,
    })
}

/// Assemble inputs for a face from the student's answers.
pub fn gather_inputs(section: Section, surface: Surface, upstream: &Upstream<'_>) -> CalcOutcome<BearingCapacityInput> {
    let mut missing = Vec::new();
    let materials = StudentMaterials::gather(upstream, &mut missing);
    let geometry = upstream.section();
    if geometry.is_none() {
        missing.push(StageId::GirderGeometry);
    }
    let faces = upstream.placement().map(|p| p.layers.section(section));
    if faces.is_none() {
        missing.push(StageId::CalculatedReinforcement);
    }

    let (Some(m), Some(g), Some(faces)) = (materials, geometry, faces) else {
        return CalcOutcome::Incomplete { missing };
    };
    let tension = faces.get(surface);
    let compression = faces.get(surface.opposite());
    match (tension.area, tension.effective_depth, compression.area) {
        (Some(tension_area), Some(effective_depth), Some(compression_area)) => {
            CalcOutcome::Complete(BearingCapacityInput {
                surface,
                r_s: m.r_s,
                r_sc: m.r_sc,
                r_b: m.r_b,
                wall_width: g.wall_width,
                flange_width: g.effective_flange_width,
                flange_height: g.flange_height,
                tension_area,
                effective_depth,
                compression_area,
                compression_distance: compression.distance,
            })
        }
        (_, None, _) => CalcOutcome::Incomplete {
            missing: vec![StageId::GirderGeometry],
        },
        _ => CalcOutcome::Incomplete {
            missing: vec![StageId::CalculatedReinforcement],
        },
    }
}

/// Program answer for the bearing-capacity stage of `(section, surface)`.
pub fn calculate(
    section: Section,
    surface: Surface,
    upstream: &Upstream<'_>,
) -> GradeResult<CalcOutcome<BearingCapacityResult>> {
    Ok(match gather_inputs(section, surface, upstream) {
        CalcOutcome::Complete(input) => CalcOutcome::Complete(calculate_face(section, &input)?),
        CalcOutcome::Incomplete { missing } => {
            debug!(%section, %surface, ?missing, "bearing capacity inputs incomplete");
            CalcOutcome::Incomplete { missing }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bottom(tension_area: f64) -> BearingCapacityInput {
        BearingCapacityInput {
            surface: Surface::Bot,
            r_s: 35.0,
            r_sc: 35.0,
            r_b: 1.45,
            wall_width: 30.0,
            flange_width: 95.0,
            flange_height: 23.0,
            tension_area,
            effective_depth: 55.0,
            compression_area: 2.26,
            compression_distance: 3.0,
        }
    }

    #[test]
    fn test_deep_compressed_zone_uses_full_formula() {
        let r = calculate_face(Section::Middle, &bottom(9.42)).unwrap();
        assert_abs_diff_eq!(r.compressed_zone_height_a, 5.760920, epsilon = 1e-6);
        assert_abs_diff_eq!(r.relative_compressed_zone_height_a, 0.104744, epsilon = 1e-6);
        assert_abs_diff_eq!(r.bearing_capacity_a, 17174.3568, epsilon = 1e-3);
        // x_b = 7.58 >= 2 a_c, method (b) does not apply
        assert_eq!(r.bearing_capacity_b, 0.0);
        assert_eq!(r.bearing_capacity, r.bearing_capacity_a);
        assert!(r.ultimate_tensile_force.is_none());
    }

    #[test]
    fn test_shallow_zone_takes_minimum() {
        let r = calculate_face(Section::Middle, &bottom(3.14)).unwrap();
        assert_abs_diff_eq!(r.bearing_capacity_a, 5714.8, epsilon = 1e-9);
        assert_abs_diff_eq!(r.bearing_capacity_b, 5905.6723, epsilon = 1e-3);
        assert_abs_diff_eq!(r.bearing_capacity, 5714.8, epsilon = 1e-9);
    }

    #[test]
    fn test_top_face_reports_forces() {
        let input = BearingCapacityInput {
            surface: Surface::Top,
            tension_area: 6.28,
            compression_area: 9.42,
            ..bottom(0.0)
        };
        let r = calculate_face(Section::Left, &input).unwrap();
        assert_abs_diff_eq!(r.ultimate_tensile_force.unwrap(), 219.8, epsilon = 1e-9);
        assert_abs_diff_eq!(r.ultimate_compressive_force.unwrap(), 3497.95, epsilon = 1e-9);
        assert!(r.compressed_zone_height_a < 0.0);
        assert_abs_diff_eq!(r.bearing_capacity, 11429.6, epsilon = 1e-9);
    }

    #[test]
    fn test_overreinforced_top_face_unsupported() {
        let input = BearingCapacityInput {
            surface: Surface::Top,
            tension_area: 110.0,
            compression_area: 9.42,
            ..bottom(0.0)
        };
        let err = calculate_face(Section::Right, &input).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CASE");
    }

    #[test]
    fn test_missing_placement_is_incomplete() {
        let answers = crate::calculations::AnswerMap::new();
        let outcome = calculate(Section::Middle, Surface::Bot, &Upstream::new(&answers)).unwrap();
        match outcome {
            CalcOutcome::Incomplete { missing } => {
                assert!(missing.contains(&StageId::CalculatedReinforcement));
                assert!(missing.contains(&StageId::Concrete));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
