//! # Calculations
//!
//! Engineering calculators that produce program answers:
//!
//! - [`geometry`] - girder cross-section from raw dimensions
//! - [`reinforcement`] - required steel at mid-span and supports
//! - [`bearing_capacity`] - ultimate moment per section face
//!
//! Calculators read the student's own upstream answers through [`Upstream`].
//! When something they need has not been answered yet they return
//! [`CalcOutcome::Incomplete`] instead of an error; hard failures (unsupported
//! scenarios, code limits exceeded) are errors and abort the submission.

pub mod bearing_capacity;
pub mod geometry;
pub mod reinforcement;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calculations::geometry::GirderSection;
use crate::stages::{
    ConcreteAnswer, InitialReinforcementAnswer, MomentsForcesAnswer, PlacementAnswer, ReinforcementAnswer,
    StageAnswer, StageId,
};

/// Result of a calculator that may lack upstream data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalcOutcome<T> {
    Complete(T),
    /// Stages whose answers were missing
    Incomplete { missing: Vec<StageId> },
}

impl<T> CalcOutcome<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, CalcOutcome::Complete(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CalcOutcome<U> {
        match self {
            CalcOutcome::Complete(value) => CalcOutcome::Complete(f(value)),
            CalcOutcome::Incomplete { missing } => CalcOutcome::Incomplete { missing },
        }
    }
}

/// A student's stored answers, keyed by stage.
pub type AnswerMap = BTreeMap<StageId, StageAnswer>;

/// Typed read access to the upstream answers a calculator depends on.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    answers: &'a AnswerMap,
}

impl<'a> Upstream<'a> {
    pub fn new(answers: &'a AnswerMap) -> Self {
        Upstream { answers }
    }

    pub fn concrete(&self) -> Option<&'a ConcreteAnswer> {
        match self.answers.get(&StageId::Concrete)? {
            StageAnswer::Concrete(a) => Some(a),
            _ => None,
        }
    }

    pub fn reinforcement(&self) -> Option<&'a ReinforcementAnswer> {
        match self.answers.get(&StageId::Reinforcement)? {
            StageAnswer::Reinforcement(a) => Some(a),
            _ => None,
        }
    }

    /// Derived girder section, present once geometry has been resolved
    pub fn section(&self) -> Option<&'a GirderSection> {
        match self.answers.get(&StageId::GirderGeometry)? {
            StageAnswer::GirderGeometry(a) => a.derived.as_ref(),
            _ => None,
        }
    }

    pub fn moments(&self) -> Option<&'a MomentsForcesAnswer> {
        match self.answers.get(&StageId::MomentsForces)? {
            StageAnswer::MomentsForces(a) => Some(a),
            _ => None,
        }
    }

    pub fn initial_reinforcement(&self) -> Option<&'a InitialReinforcementAnswer> {
        match self.answers.get(&StageId::InitialReinforcement)? {
            StageAnswer::InitialReinforcement(a) => Some(a),
            _ => None,
        }
    }

    pub fn placement(&self) -> Option<&'a PlacementAnswer> {
        match self.answers.get(&StageId::CalculatedReinforcement)? {
            StageAnswer::Placement(a) => Some(a),
            _ => None,
        }
    }
}

/// Design strengths taken from the student's own material answers (kN/cm²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StudentMaterials {
    pub r_b: f64,
    pub r_s: f64,
    /// Short-term compressive strength of the steel
    pub r_sc: f64,
    pub alpha_r: Option<f64>,
}

impl StudentMaterials {
    /// Collect strengths, recording which material stages are lacking.
    pub fn gather(upstream: &Upstream<'_>, missing: &mut Vec<StageId>) -> Option<Self> {
        let r_b = upstream.concrete().and_then(|c| c.r_b);
        if r_b.is_none() {
            missing.push(StageId::Concrete);
        }
        let steel = upstream
            .reinforcement()
            .and_then(|r| Some((r.r_s?, r.r_sc_short?, r.alpha_r)));
        if steel.is_none() {
            missing.push(StageId::Reinforcement);
        }
        let (r_s, r_sc, alpha_r) = steel?;
        Some(StudentMaterials {
            r_b: r_b?,
            r_s,
            r_sc,
            alpha_r,
        })
    }
}
