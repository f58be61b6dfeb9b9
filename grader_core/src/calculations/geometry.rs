//! # Girder Cross-Section
//!
//! Resolves the T-section the girder works as from the raw dimensions a
//! student enters.
//!
//! ```text
//!   ├──────────── flange_full_width ────────────┤
//!   ┌───────────────────────────────────────────┐ ┬ flange_slab_height
//!   └──────────┐ ╲                     ╱ ┌───────┘ ┼ flange_bevel_height
//!              └──┐                 ┌──┘          ┴
//!                 │                 │             ┬
//!                 │   wall_width    │             │ wall_height
//!                 └─────────────────┘             ┴
//! ```
//!
//! ## Effective flange width
//!
//! `b_f` is the least of
//! - `(flange_full_width + wall_width) / 2`
//! - `span / 3 + wall_width`
//! - by flange thickness `h_f` against girder height `h`:
//!   `wall_width` if `h_f < 0.05 h`, `wall_width + 6 h_f` if
//!   `0.05 h ≤ h_f < 0.1 h`, `wall_width + 12 h_f` otherwise.
//!
//! ## Example
//!
//! ```rust
//! use grader_core::calculations::geometry::{calculate, GeometryInput};
//! use grader_core::config::GeometryLimits;
//!
//! let input = GeometryInput {
//!     wall_height: 44.0,
//!     wall_width: 30.0,
//!     flange_bevel_height: 15.0,
//!     flange_bevel_width: 10.0,
//!     flange_slab_height: 8.0,
//!     flange_full_width: 160.0,
//!     span_length: 556.0,
//! };
//! let section = calculate(&input, &GeometryLimits::default()).unwrap();
//! assert_eq!(section.girder_height, 67.0);
//! assert_eq!(section.flange_console_width, 8.0);
//! assert_eq!(section.effective_flange_width, 95.0);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Bounds, GeometryLimits};
use crate::errors::{GradeError, GradeResult};

/// Raw dimensions (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryInput {
    pub wall_height: f64,
    pub wall_width: f64,
    pub flange_bevel_height: f64,
    pub flange_bevel_width: f64,
    pub flange_slab_height: f64,
    pub flange_full_width: f64,
    /// Clear span of the girder
    pub span_length: f64,
}

impl GeometryInput {
    /// Range-check the raw dimensions.
    pub fn validate(&self, limits: &GeometryLimits) -> GradeResult<()> {
        let checks: [(&str, f64, Bounds); 6] = [
            ("wall_height", self.wall_height, limits.wall_height_cm),
            ("wall_width", self.wall_width, limits.wall_width_cm),
            ("flange_bevel_height", self.flange_bevel_height, limits.flange_bevel_height_cm),
            ("flange_bevel_width", self.flange_bevel_width, limits.flange_bevel_width_cm),
            ("flange_slab_height", self.flange_slab_height, limits.flange_slab_height_cm),
            ("flange_full_width", self.flange_full_width, limits.flange_full_width_cm),
        ];
        for (field, value, bounds) in checks {
            if !value.is_finite() || !bounds.contains(value) {
                return Err(GradeError::invalid_input(
                    field,
                    value.to_string(),
                    format!("must be between {} and {} cm", bounds.min, bounds.max),
                ));
            }
        }
        if !self.span_length.is_finite() || self.span_length <= 0.0 {
            return Err(GradeError::invalid_input(
                "span_length",
                self.span_length.to_string(),
                "Girder span must be positive",
            ));
        }
        Ok(())
    }

    /// Flange thickness h_f: bevel plus slab strip
    pub fn flange_height(&self) -> f64 {
        self.flange_bevel_height + self.flange_slab_height
    }
}

/// Derived section properties (cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GirderSection {
    /// h
    pub girder_height: f64,
    pub flange_console_width: f64,
    /// b_f
    pub effective_flange_width: f64,
    /// h_f
    pub flange_height: f64,
    /// b_w
    pub wall_width: f64,
    pub span_length: f64,
}

/// Which rule governed the effective flange width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlangeWidthRule {
    HalfDistance,
    SpanThird,
    FlangeThickness,
}

/// Effective flange width and the rule that governed it.
pub fn effective_flange_width(
    flange_full_width: f64,
    wall_width: f64,
    span_length: f64,
    flange_height: f64,
    girder_height: f64,
) -> (f64, FlangeWidthRule) {
    let half_distance = (flange_full_width + wall_width) / 2.0;
    let span_third = span_length / 3.0 + wall_width;
    let by_thickness = if flange_height < 0.05 * girder_height {
        wall_width
    } else if flange_height < 0.1 * girder_height {
        wall_width + 6.0 * flange_height
    } else {
        wall_width + 12.0 * flange_height
    };

    [
        (half_distance, FlangeWidthRule::HalfDistance),
        (span_third, FlangeWidthRule::SpanThird),
        (by_thickness, FlangeWidthRule::FlangeThickness),
    ]
    .into_iter()
    .fold((f64::INFINITY, FlangeWidthRule::HalfDistance), |best, candidate| {
        if candidate.0 < best.0 {
            candidate
        } else {
            best
        }
    })
}

/// Resolve the girder section.
pub fn calculate(input: &GeometryInput, limits: &GeometryLimits) -> GradeResult<GirderSection> {
    input.validate(limits)?;

    let flange_height = input.flange_height();
    let girder_height = input.wall_height + flange_height;
    if girder_height > limits.max_girder_height_cm {
        return Err(GradeError::geometry_out_of_bounds(
            "girder_height",
            girder_height,
            limits.max_girder_height_cm,
        ));
    }

    let (b_f, rule) = effective_flange_width(
        input.flange_full_width,
        input.wall_width,
        input.span_length,
        flange_height,
        girder_height,
    );
    debug!(girder_height, effective_flange_width = b_f, ?rule, "resolved girder section");

    Ok(GirderSection {
        girder_height,
        flange_console_width: input.flange_bevel_width - limits.console_offset_cm,
        effective_flange_width: b_f,
        flange_height,
        wall_width: input.wall_width,
        span_length: input.span_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn input(wall_height: f64) -> GeometryInput {
        GeometryInput {
            wall_height,
            wall_width: 30.0,
            flange_bevel_height: 15.0,
            flange_bevel_width: 10.0,
            flange_slab_height: 8.0,
            flange_full_width: 160.0,
            span_length: 556.0,
        }
    }

    #[test]
    fn test_height_within_limit() {
        let section = calculate(&input(44.0), &GeometryLimits::default()).unwrap();
        assert_eq!(section.girder_height, 67.0);
        assert_eq!(section.flange_height, 23.0);
    }

    #[test]
    fn test_height_over_limit() {
        let err = calculate(&input(60.0), &GeometryLimits::default()).unwrap_err();
        match err {
            GradeError::GeometryOutOfBounds { value, limit, .. } => {
                assert_eq!(value, 83.0);
                assert_eq!(limit, 80.0);
            }
            other => panic!("expected GeometryOutOfBounds, got {:?}", other),
        }
    }

    #[test]
    fn test_height_exactly_at_limit_passes() {
        let section = calculate(&input(57.0), &GeometryLimits::default()).unwrap();
        assert_eq!(section.girder_height, 80.0);
    }

    #[test]
    fn test_raw_dimension_out_of_range() {
        let mut bad = input(44.0);
        bad.wall_width = 5.0;
        let err = calculate(&bad, &GeometryLimits::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_flange_width_rules() {
        // Half distance governs
        let (b, rule) = effective_flange_width(160.0, 30.0, 556.0, 23.0, 67.0);
        assert_eq!(rule, FlangeWidthRule::HalfDistance);
        assert_relative_eq!(b, 95.0);

        // Short span: 150/3 + 30 = 80
        let (b, rule) = effective_flange_width(300.0, 30.0, 150.0, 23.0, 67.0);
        assert_eq!(rule, FlangeWidthRule::SpanThird);
        assert_relative_eq!(b, 80.0);

        // Thin flange: 0.05h <= 5 < 0.1h with h = 70 -> 30 + 6*5
        let (b, rule) = effective_flange_width(300.0, 30.0, 900.0, 5.0, 70.0);
        assert_eq!(rule, FlangeWidthRule::FlangeThickness);
        assert_relative_eq!(b, 60.0);

        // Very thin flange: 3 < 0.05*70 -> wall width only
        let (b, _) = effective_flange_width(300.0, 30.0, 900.0, 3.0, 70.0);
        assert_relative_eq!(b, 30.0);
    }

    #[test]
    fn test_console_offset_configurable() {
        let limits = GeometryLimits {
            console_offset_cm: 3.0,
            ..GeometryLimits::default()
        };
        let section = calculate(&input(44.0), &limits).unwrap();
        assert_eq!(section.flange_console_width, 7.0);
    }
}
