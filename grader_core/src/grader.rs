//! # Grader
//!
//! Entry point for submissions. One call to [`Grader::submit_stage`]:
//!
//! 1. checks that the stage is unlocked for the student
//! 2. parses the payload and fills in server-derived fields
//! 3. refreshes every dependent stage (derived depths, program answers, and
//!    results for stages the student has already answered)
//! 4. computes the stage's own program answer and result
//! 5. advances the gate and commits everything as one [`WriteBatch`]
//!
//! Any error along the way aborts the submission before anything is written.
//! Student-input and engine-limitation errors come back as a rejected
//! [`StageSubmitResult`]; all other errors are returned as `Err`.
//!
//! Submissions of the same student are serialized by a per-student mutex held
//! from the first read to the commit. The read and the commit themselves run
//! inside one [`AnswerStore::update`] cycle, so graders in other processes
//! sharing a gradebook file cannot interleave with them.
//!
//! ```rust
//! use grader_core::config::GraderConfig;
//! use grader_core::grader::Grader;
//! use grader_core::reference::ReferenceData;
//! use grader_core::roster::StudentId;
//! use grader_core::store::MemoryAnswerStore;
//!
//! let reference = ReferenceData::with_builtin_materials().unwrap();
//! let grader = Grader::new(reference, MemoryAnswerStore::new(), GraderConfig::default());
//! let stages = grader.get_unlocked_stages(StudentId(1)).unwrap();
//! assert_eq!(stages.len(), 5);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::calculations::geometry::{self, GeometryInput};
use crate::calculations::{bearing_capacity, reinforcement, AnswerMap, CalcOutcome, Upstream};
use crate::config::GraderConfig;
use crate::errors::{GradeError, GradeResult, RejectionKind};
use crate::gate::GateState;
use crate::reference::{ReferenceStore, StudentContext};
use crate::roster::StudentId;
use crate::sections::{Section, Surface};
use crate::stages::{ConcreteAnswer, PlacementAnswer, ProgramAnswer, ReinforcementAnswer, StageAnswer, StageId};
use crate::store::{AnswerStore, StudentRecords, WriteBatch};
use crate::validation::{self, StageResult};

/// Why a submission was turned down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    /// Stable error code, e.g. `GEOMETRY_OUT_OF_BOUNDS`
    pub code: String,
    pub message: String,
    /// Full error for callers that want the details
    pub error: GradeError,
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSubmitResult {
    /// The answer was accepted and stored
    pub ok: bool,
    /// Per-field outcome of the submitted stage, for graded stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl StageSubmitResult {
    fn accepted(result: Option<StageResult>) -> Self {
        StageSubmitResult {
            ok: true,
            result,
            rejection: None,
        }
    }

    fn rejected(kind: RejectionKind, error: GradeError) -> Self {
        StageSubmitResult {
            ok: false,
            result: None,
            rejection: Some(Rejection {
                kind,
                code: error.error_code().to_string(),
                message: error.to_string(),
                error,
            }),
        }
    }

    /// Fields of the submitted stage that did not pass
    pub fn failed_fields(&self) -> Vec<&str> {
        self.result
            .iter()
            .flat_map(|r| r.fields.iter())
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Working state of one submission. Nothing here reaches the store until the
/// batch is applied.
struct SubmissionContext {
    student: StudentId,
    /// Gate as it stood before this submission
    gate: GateState,
    answers: AnswerMap,
    batch: WriteBatch,
    /// Loaded on first use
    student_context: Option<StudentContext>,
}

impl SubmissionContext {
    fn new(student: StudentId, records: StudentRecords) -> Self {
        SubmissionContext {
            student,
            gate: records.gate,
            answers: records.answers,
            batch: WriteBatch::default(),
            student_context: None,
        }
    }

    fn girder_height(&self) -> Option<f64> {
        Upstream::new(&self.answers).section().map(|s| s.girder_height)
    }

    fn store_answer(&mut self, stage: StageId, answer: StageAnswer) {
        self.answers.insert(stage, answer.clone());
        self.batch.answers.retain(|(s, _)| *s != stage);
        self.batch.answers.push((stage, answer));
    }

    fn store_program(&mut self, stage: StageId, program: ProgramAnswer) {
        self.batch.program_answers.retain(|(s, _)| *s != stage);
        self.batch.program_answers.push((stage, program));
    }

    fn store_result(&mut self, result: StageResult) {
        self.batch.results.retain(|r| r.stage != result.stage);
        self.batch.results.push(result);
    }
}

/// Grading engine over a reference store and an answer store.
pub struct Grader<R, A> {
    reference: R,
    answers: A,
    config: GraderConfig,
    locks: Mutex<HashMap<StudentId, Arc<Mutex<()>>>>,
}

fn poisoned<T>(_: PoisonError<T>) -> GradeError {
    GradeError::Internal {
        message: "submission lock poisoned".to_string(),
    }
}

impl<R: ReferenceStore, A: AnswerStore> Grader<R, A> {
    pub fn new(reference: R, answers: A, config: GraderConfig) -> Self {
        Grader {
            reference,
            answers,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn answer_store(&self) -> &A {
        &self.answers
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    fn student_lock(&self, student: StudentId) -> GradeResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(poisoned)?;
        Ok(Arc::clone(locks.entry(student).or_default()))
    }

    /// Submit the answer for one stage.
    pub fn submit_stage(&self, student: StudentId, stage_name: &str, payload: Value) -> GradeResult<StageSubmitResult> {
        let stage: StageId = stage_name.parse()?;
        let lock = self.student_lock(student)?;
        let _guard = lock.lock().map_err(poisoned)?;

        let outcome = self.answers.update(student, |records| {
            if !records.gate.is_unlocked(stage) {
                info!(%student, %stage, unlocked = ?records.gate.max_unlocked_block, "submission to locked stage");
                return Err(GradeError::StageLocked {
                    stage: stage.to_string(),
                });
            }

            let mut ctx = SubmissionContext::new(student, records.clone());
            match self.evaluate(&mut ctx, stage, payload) {
                Ok(result) => {
                    let answered: BTreeSet<StageId> = ctx.answers.keys().copied().collect();
                    let gate = ctx.gate.advance(&answered);
                    if gate != ctx.gate {
                        info!(%student, block = ?gate.max_unlocked_block, finished = gate.finished, "gate advanced");
                    }
                    ctx.batch.gate = Some(gate);
                    Ok((ctx.batch, Ok(result)))
                }
                Err(err) => match err.rejection_kind() {
                    Some(kind) => Ok((WriteBatch::default(), Err((kind, err)))),
                    None => {
                        warn!(%student, %stage, code = err.error_code(), "submission failed: {}", err);
                        Err(err)
                    }
                },
            }
        })?;

        match outcome {
            Ok(result) => {
                info!(
                    %student,
                    %stage,
                    passed = ?result.as_ref().map(StageResult::passed),
                    "stage submitted"
                );
                Ok(StageSubmitResult::accepted(result))
            }
            Err((RejectionKind::StudentInput, err)) => {
                info!(%student, %stage, code = err.error_code(), "submission rejected: {}", err);
                Ok(StageSubmitResult::rejected(RejectionKind::StudentInput, err))
            }
            Err((RejectionKind::EngineLimitation, err)) => {
                warn!(%student, %stage, code = err.error_code(), "engine cannot evaluate submission: {}", err);
                Ok(StageSubmitResult::rejected(RejectionKind::EngineLimitation, err))
            }
        }
    }

    /// Stages the student may answer, in sheet order
    pub fn get_unlocked_stages(&self, student: StudentId) -> GradeResult<Vec<StageId>> {
        Ok(self.answers.get_gate_state(student)?.unlocked_stages())
    }

    /// Stored per-field outcomes, keyed by stage
    pub fn get_stage_results(&self, student: StudentId) -> GradeResult<BTreeMap<StageId, BTreeMap<String, bool>>> {
        Ok(self
            .answers
            .get_stage_results(student)?
            .into_iter()
            .map(|(stage, result)| (stage, result.fields))
            .collect())
    }

    fn evaluate(&self, ctx: &mut SubmissionContext, stage: StageId, payload: Value) -> GradeResult<Option<StageResult>> {
        let mut answer = StageAnswer::parse(stage, payload)?;
        self.derive_fields(ctx, stage, &mut answer)?;
        ctx.store_answer(stage, answer);

        for dependent in stage.dependents() {
            self.refresh_dependent(ctx, *dependent)?;
        }

        if !stage.is_graded() {
            return Ok(None);
        }
        let program = self.program_answer(ctx, stage)?;
        let result = self.grade(ctx, stage, &program)?;
        ctx.store_program(stage, program);
        ctx.store_result(result.clone());
        Ok(Some(result))
    }

    fn student_context(&self, ctx: &mut SubmissionContext) -> GradeResult<StudentContext> {
        if let Some(cached) = &ctx.student_context {
            return Ok(cached.clone());
        }
        let context = self
            .reference
            .student_context(ctx.student)
            .map_err(GradeError::into_reference_missing)?;
        ctx.student_context = Some(context.clone());
        Ok(context)
    }

    /// Range checks plus the fields the server fills in.
    fn derive_fields(&self, ctx: &mut SubmissionContext, stage: StageId, answer: &mut StageAnswer) -> GradeResult<()> {
        match answer {
            StageAnswer::GirderGeometry(geo) => {
                let context = self.student_context(ctx)?;
                let slab_height = match geo.flange_slab_height {
                    Some(h) => h,
                    None => self
                        .reference
                        .resolve_slab_height(&context)
                        .map_err(GradeError::into_reference_missing)?,
                };
                let input = GeometryInput {
                    wall_height: geo.wall_height,
                    wall_width: geo.wall_width,
                    flange_bevel_height: geo.flange_bevel_height,
                    flange_bevel_width: geo.flange_bevel_width,
                    flange_slab_height: slab_height,
                    flange_full_width: geo.flange_full_width,
                    span_length: context.girder_span().value(),
                };
                geo.flange_slab_height = Some(slab_height);
                geo.derived = Some(geometry::calculate(&input, &self.config.geometry)?);
            }
            StageAnswer::MomentsForces(moments) => moments.validate()?,
            StageAnswer::InitialReinforcement(initial) => {
                initial.validate()?;
                initial.derive_depths(ctx.girder_height());
            }
            StageAnswer::Placement(placement) => {
                placement.validate()?;
                self.derive_placed_areas(ctx, placement)?;
                placement.derive_depths(ctx.girder_height());
            }
            StageAnswer::Concrete(_)
            | StageAnswer::Reinforcement(_)
            | StageAnswer::ReinforcementArea(_)
            | StageAnswer::BearingCapacity(_) => {}
        }
        debug!(student = %ctx.student, %stage, "derived server-side fields");
        Ok(())
    }

    /// Placed area per face from the bar assortment.
    fn derive_placed_areas(&self, ctx: &mut SubmissionContext, placement: &mut PlacementAnswer) -> GradeResult<()> {
        let context = self.student_context(ctx)?;
        let class_id = &context.assignment.girder_reinforcement;
        let grade = self
            .reference
            .get_reinforcement_grade(class_id)
            .map_err(GradeError::into_reference_missing)?;

        for section in Section::ALL {
            for surface in Surface::ALL {
                let layer = placement.layers.get_mut(section, surface);
                let field = format!("{}_{}_bar_diameter_mm", section, surface);
                if !grade.diameters_mm.contains(layer.bar_diameter_mm) {
                    return Err(GradeError::invalid_input(
                        field,
                        layer.bar_diameter_mm.to_string(),
                        format!(
                            "{} is rolled in diameters {}..={} mm",
                            grade.class_id, grade.diameters_mm.min, grade.diameters_mm.max
                        ),
                    ));
                }
                let bar = self.reference.get_bar_diameter(layer.bar_diameter_mm).map_err(|_| {
                    GradeError::invalid_input(
                        field.clone(),
                        layer.bar_diameter_mm.to_string(),
                        "not in the bar assortment",
                    )
                })?;
                layer.area = Some(bar.area_of(layer.bar_count));
            }
        }
        Ok(())
    }

    fn refresh_dependent(&self, ctx: &mut SubmissionContext, stage: StageId) -> GradeResult<()> {
        match stage {
            StageId::InitialReinforcement | StageId::CalculatedReinforcement => {
                let girder_height = ctx.girder_height();
                let refreshed = match ctx.answers.get(&stage) {
                    Some(StageAnswer::InitialReinforcement(initial)) => {
                        let mut initial = initial.clone();
                        initial.derive_depths(girder_height);
                        StageAnswer::InitialReinforcement(initial)
                    }
                    Some(StageAnswer::Placement(placement)) => {
                        let mut placement = placement.clone();
                        placement.derive_depths(girder_height);
                        StageAnswer::Placement(placement)
                    }
                    Some(other) => return Err(other.mismatch(stage)),
                    None => return Ok(()),
                };
                debug!(student = %ctx.student, %stage, ?girder_height, "re-derived effective depths");
                ctx.store_answer(stage, refreshed);
            }
            _ if stage.is_graded() => {
                if !ctx.gate.is_unlocked(stage) {
                    return Ok(());
                }
                let program = self.program_answer(ctx, stage)?;
                if ctx.answers.contains_key(&stage) {
                    let result = self.grade(ctx, stage, &program)?;
                    debug!(student = %ctx.student, %stage, passed = result.passed(), "re-validated dependent stage");
                    ctx.store_result(result);
                } else {
                    debug!(student = %ctx.student, %stage, "recomputed program answer");
                }
                ctx.store_program(stage, program);
            }
            _ => {}
        }
        Ok(())
    }

    /// Reference record for a graded stage.
    fn program_answer(&self, ctx: &mut SubmissionContext, stage: StageId) -> GradeResult<ProgramAnswer> {
        match stage {
            StageId::Concrete => {
                let context = self.student_context(ctx)?;
                let grade = self
                    .reference
                    .get_concrete_grade(&context.assignment.girder_concrete)
                    .map_err(GradeError::into_reference_missing)?;
                Ok(ProgramAnswer::complete(StageAnswer::Concrete(ConcreteAnswer::from_grade(
                    &grade,
                ))))
            }
            StageId::Reinforcement => {
                let context = self.student_context(ctx)?;
                let grade = self
                    .reference
                    .get_reinforcement_grade(&context.assignment.girder_reinforcement)
                    .map_err(GradeError::into_reference_missing)?;
                Ok(ProgramAnswer::complete(StageAnswer::Reinforcement(
                    ReinforcementAnswer::from_grade(&grade),
                )))
            }
            _ => calculated_program_answer(stage, &ctx.answers),
        }
    }

    fn grade(&self, ctx: &SubmissionContext, stage: StageId, program: &ProgramAnswer) -> GradeResult<StageResult> {
        let student = ctx.answers.get(&stage).ok_or_else(|| GradeError::Internal {
            message: format!("no answer stored for {}", stage),
        })?;
        validation::validate(stage, program, student, &self.config.tolerances)
    }
}

/// Program answer of a per-section stage from the student's own answers.
fn calculated_program_answer(stage: StageId, answers: &AnswerMap) -> GradeResult<ProgramAnswer> {
    let upstream = Upstream::new(answers);
    let outcome = match (stage.section(), stage.surface()) {
        (Some(section), Some(surface)) => bearing_capacity::calculate(section, surface, &upstream)?
            .map(|r| StageAnswer::BearingCapacity(r.into())),
        (Some(section), None) => {
            reinforcement::calculate(section, &upstream)?.map(|r| StageAnswer::ReinforcementArea(r.into()))
        }
        _ => {
            return Err(GradeError::Internal {
                message: format!("stage {} has no calculator", stage),
            })
        }
    };
    match outcome {
        CalcOutcome::Complete(record) => Ok(ProgramAnswer::complete(record)),
        CalcOutcome::Incomplete { missing } => ProgramAnswer::incomplete(stage, missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures;
    use crate::reference::ReferenceData;
    use crate::stages::{Block, CalculatedReinforcementAnswer, InitialReinforcementAnswer};
    use crate::store::MemoryAnswerStore;
    use serde_json::json;

    const STUDENT: StudentId = StudentId(7);

    fn grader() -> Grader<ReferenceData, MemoryAnswerStore> {
        Grader::new(fixtures::reference(), MemoryAnswerStore::new(), GraderConfig::default())
    }

    fn geometry(wall_height: f64) -> Value {
        json!({
            "wall_height": wall_height,
            "wall_width": 30.0,
            "flange_bevel_height": 15.0,
            "flange_bevel_width": 10.0,
            "flange_full_width": 160.0
        })
    }

    fn concrete<A: AnswerStore>(g: &Grader<ReferenceData, A>) -> Value {
        let grade = g.reference().get_concrete_grade("B25").unwrap();
        serde_json::to_value(ConcreteAnswer::from_grade(&grade)).unwrap()
    }

    fn steel<A: AnswerStore>(g: &Grader<ReferenceData, A>) -> Value {
        let grade = g.reference().get_reinforcement_grade("A400").unwrap();
        serde_json::to_value(ReinforcementAnswer::from_grade(&grade)).unwrap()
    }

    fn moments() -> Value {
        json!({ "moment_middle_bot": 12000.0, "moment_left_top": 15000.0, "moment_right_top": 14000.0 })
    }

    fn initial() -> Value {
        let layer = json!({ "area": 2.0, "distance": 5.0 });
        json!({
            "middle": { "top": layer, "bot": layer },
            "left": { "top": layer, "bot": layer },
            "right": { "top": layer, "bot": layer }
        })
    }

    fn placement(diameter: u16) -> Value {
        let layer = json!({ "bar_diameter_mm": diameter, "bar_count": 3, "distance": 5.0 });
        json!({
            "middle": { "top": layer, "bot": layer },
            "left": { "top": layer, "bot": layer },
            "right": { "top": layer, "bot": layer }
        })
    }

    fn submit<A: AnswerStore>(g: &Grader<ReferenceData, A>, stage: StageId, payload: Value) -> StageSubmitResult {
        g.submit_stage(STUDENT, stage.as_str(), payload).unwrap()
    }

    fn complete_initial_data<A: AnswerStore>(g: &Grader<ReferenceData, A>) {
        assert!(submit(g, StageId::GirderGeometry, geometry(44.0)).ok);
        assert!(submit(g, StageId::Concrete, concrete(g)).ok);
        assert!(submit(g, StageId::Reinforcement, steel(g)).ok);
        assert!(submit(g, StageId::MomentsForces, moments()).ok);
        assert!(submit(g, StageId::InitialReinforcement, initial()).ok);
    }

    /// Answer a stage blank, then resubmit the program's own values.
    fn submit_program_values<A: AnswerStore>(g: &Grader<ReferenceData, A>, stage: StageId) -> StageResult {
        assert!(submit(g, stage, json!({})).ok);
        let payload = program_payload(g, stage);
        submit(g, stage, payload).result.unwrap()
    }

    fn program_payload<A: AnswerStore>(g: &Grader<ReferenceData, A>, stage: StageId) -> Value {
        let program = g.answer_store().get_program_answer(STUDENT, stage).unwrap().unwrap();
        assert!(program.complete);
        match program.record {
            StageAnswer::ReinforcementArea(a) => serde_json::to_value(a).unwrap(),
            StageAnswer::BearingCapacity(a) => serde_json::to_value(a).unwrap(),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_geometry_is_derived_server_side() {
        let g = grader();
        let result = submit(&g, StageId::GirderGeometry, geometry(44.0));
        assert!(result.ok);
        assert!(result.result.is_none());

        let stored = g.answer_store().get_stage_answer(STUDENT, StageId::GirderGeometry).unwrap();
        let Some(StageAnswer::GirderGeometry(geo)) = stored else {
            panic!("geometry not stored");
        };
        assert_eq!(geo.flange_slab_height, Some(8.0));
        let section = geo.derived.unwrap();
        assert_eq!(section.girder_height, 67.0);
        assert_eq!(section.span_length, 556.0);
        assert_eq!(section.effective_flange_width, 95.0);
    }

    #[test]
    fn test_geometry_out_of_bounds_is_rejected_without_writes() {
        let g = grader();
        let result = submit(&g, StageId::GirderGeometry, geometry(60.0));
        assert!(!result.ok);
        let rejection = result.rejection.unwrap();
        assert_eq!(rejection.kind, RejectionKind::StudentInput);
        assert_eq!(rejection.code, "GEOMETRY_OUT_OF_BOUNDS");
        assert_eq!(g.answer_store().snapshot(STUDENT).unwrap(), StudentRecords::default());
    }

    #[test]
    fn test_missing_slab_reference_is_a_hard_error() {
        let g = grader();
        let err = g
            .submit_stage(StudentId(10), "GirderGeometry", geometry(44.0))
            .unwrap_err();
        assert_eq!(err.error_code(), "REFERENCE_DATA_MISSING");

        // An explicit slab height needs no lookup
        let mut payload = geometry(44.0);
        payload["flange_slab_height"] = json!(10.0);
        assert!(g.submit_stage(StudentId(10), "GirderGeometry", payload).unwrap().ok);
    }

    #[test]
    fn test_unknown_and_locked_stages() {
        let g = grader();
        let err = g.submit_stage(STUDENT, "Footing", json!({})).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_STAGE");

        let err = g
            .submit_stage(STUDENT, "CalculatedReinforcementMiddle", json!({}))
            .unwrap_err();
        assert_eq!(err.error_code(), "STAGE_LOCKED");
    }

    #[test]
    fn test_categorical_match_is_exact() {
        let g = grader();
        let result = submit(&g, StageId::Concrete, concrete(&g));
        assert!(result.ok);
        assert!(result.result.unwrap().passed());

        for class in ["b25", "В25", "B30"] {
            let mut payload = concrete(&g);
            payload["concrete_class"] = json!(class);
            let result = submit(&g, StageId::Concrete, payload);
            assert!(result.ok);
            assert_eq!(result.failed_fields(), vec!["concrete_class"], "{}", class);
        }
    }

    #[test]
    fn test_resubmission_is_idempotent() {
        let g = grader();
        complete_initial_data(&g);
        let first = g.answer_store().snapshot(STUDENT).unwrap();

        assert!(submit(&g, StageId::MomentsForces, moments()).ok);
        let second = g.answer_store().snapshot(STUDENT).unwrap();

        assert_eq!(first.answers, second.answers);
        assert_eq!(first.gate, second.gate);
        let fields = |r: &StudentRecords| -> Vec<BTreeMap<String, bool>> {
            r.results.values().map(|res| res.fields.clone()).collect()
        };
        assert_eq!(fields(&first), fields(&second));
    }

    #[test]
    fn test_unlocking_is_monotonic() {
        let g = grader();
        assert_eq!(g.get_unlocked_stages(STUDENT).unwrap().len(), 5);
        complete_initial_data(&g);
        assert_eq!(g.get_unlocked_stages(STUDENT).unwrap().len(), 8);

        // A rejected resubmission in the first block keeps the gate open
        assert!(!submit(&g, StageId::GirderGeometry, geometry(60.0)).ok);
        assert_eq!(
            g.answer_store().get_gate_state(STUDENT).unwrap().max_unlocked_block,
            Block::ReinforcementCalculation
        );
    }

    #[test]
    fn test_program_answers_follow_student_inputs() {
        let g = grader();
        complete_initial_data(&g);

        for stage in StageId::REINFORCEMENT_AREAS {
            assert!(submit_program_values(&g, stage).passed(), "{} should pass", stage);
        }

        let middle = g
            .answer_store()
            .get_program_answer(STUDENT, StageId::CalculatedReinforcementMiddle)
            .unwrap()
            .unwrap();
        let StageAnswer::ReinforcementArea(record) = middle.record else {
            panic!("wrong record");
        };
        assert!(record.moment_flange_capacity.is_none());
        assert!(record.alpha_m.unwrap() > 0.0);
    }

    #[test]
    fn test_geometry_change_cascades_to_reinforcement_results() {
        let g = grader();
        complete_initial_data(&g);
        for stage in StageId::REINFORCEMENT_AREAS {
            assert!(submit_program_values(&g, stage).passed());
        }
        let before = g.answer_store().get_stage_results(STUDENT).unwrap();
        assert!(before.values().all(StageResult::passed));

        assert!(submit(&g, StageId::GirderGeometry, geometry(40.0)).ok);

        let stored = g
            .answer_store()
            .get_stage_answer(STUDENT, StageId::InitialReinforcement)
            .unwrap();
        let Some(StageAnswer::InitialReinforcement(InitialReinforcementAnswer { layers })) = stored else {
            panic!("initial reinforcement missing");
        };
        assert_eq!(layers.middle.bot.effective_depth, Some(58.0));

        let after = g.answer_store().get_stage_results(STUDENT).unwrap();
        for stage in StageId::REINFORCEMENT_AREAS {
            assert!(after[&stage].validated_at >= before[&stage].validated_at);
            assert!(!after[&stage].passed(), "{} should be regraded", stage);
        }
    }

    #[test]
    fn test_missing_alpha_r_gives_sentinel_program_answer() {
        let g = grader();
        complete_initial_data(&g);
        let mut payload = steel(&g);
        payload["alpha_r"] = Value::Null;
        assert!(submit(&g, StageId::Reinforcement, payload).ok);

        let result = submit(
            &g,
            StageId::CalculatedReinforcementLeft,
            serde_json::to_value(CalculatedReinforcementAnswer {
                alpha_m: Some(0.02),
                moment_flange_capacity: Some(160000.0),
                is_neutral_axis_in_flange: Some(true),
                reinforcement_area: Some(7.0),
            })
            .unwrap(),
        );
        let fields = result.result.unwrap().fields;
        assert!(!fields.is_empty());
        assert!(fields.values().all(|ok| !*ok));

        let program = g
            .answer_store()
            .get_program_answer(STUDENT, StageId::CalculatedReinforcementLeft)
            .unwrap()
            .unwrap();
        assert!(!program.complete);
        assert_eq!(program.missing, vec![StageId::Reinforcement]);
        assert_eq!(
            program.record,
            StageAnswer::ReinforcementArea(CalculatedReinforcementAnswer::sentinel(Section::Left))
        );
    }

    #[test]
    fn test_placement_areas_and_bearing_capacity() {
        let g = grader();
        complete_initial_data(&g);
        for stage in StageId::REINFORCEMENT_AREAS {
            assert!(submit_program_values(&g, stage).passed());
        }

        let rejected = submit(&g, StageId::CalculatedReinforcement, placement(50));
        assert_eq!(rejected.rejection.unwrap().code, "INVALID_INPUT");

        assert!(submit(&g, StageId::CalculatedReinforcement, placement(16)).ok);
        let stored = g
            .answer_store()
            .get_stage_answer(STUDENT, StageId::CalculatedReinforcement)
            .unwrap();
        let Some(StageAnswer::Placement(placed)) = stored else {
            panic!("placement missing");
        };
        let area = placed.layers.middle.bot.area.unwrap();
        assert!((area - 6.033).abs() < 1e-9);
        assert_eq!(placed.layers.left.top.effective_depth, Some(62.0));
        assert_eq!(g.get_unlocked_stages(STUDENT).unwrap().len(), 15);

        let stage = StageId::BearingCapacityMiddleBot;
        assert!(submit_program_values(&g, stage).passed());
        assert!(g.get_stage_results(STUDENT).unwrap().contains_key(&stage));
    }

    #[test]
    fn test_failing_dependent_aborts_whole_submission() {
        let g = grader();
        complete_initial_data(&g);
        for stage in StageId::REINFORCEMENT_AREAS {
            assert!(submit_program_values(&g, stage).passed());
        }
        let before = g.answer_store().snapshot(STUDENT).unwrap();
        let before_json = serde_json::to_string(&before).unwrap();

        // Support moment far above the flange capacity: neutral axis in the web
        let mut payload = moments();
        payload["moment_left_top"] = json!(500000.0);
        let result = submit(&g, StageId::MomentsForces, payload);
        assert!(!result.ok);
        let rejection = result.rejection.unwrap();
        assert_eq!(rejection.kind, RejectionKind::EngineLimitation);
        assert_eq!(rejection.code, "UNSUPPORTED_CASE");

        let after = g.answer_store().snapshot(STUDENT).unwrap();
        assert_eq!(after, before);
        assert_eq!(serde_json::to_string(&after).unwrap(), before_json);
    }

    fn initial_data_payloads<A: AnswerStore>(g: &Grader<ReferenceData, A>) -> Vec<(StageId, Value)> {
        vec![
            (StageId::GirderGeometry, geometry(44.0)),
            (StageId::Concrete, concrete(g)),
            (StageId::Reinforcement, steel(g)),
            (StageId::MomentsForces, moments()),
            (StageId::InitialReinforcement, initial()),
        ]
    }

    fn result_fields(records: &StudentRecords) -> BTreeMap<StageId, BTreeMap<String, bool>> {
        records
            .results
            .iter()
            .map(|(stage, result)| (*stage, result.fields.clone()))
            .collect()
    }

    #[test]
    fn test_concurrent_submissions_for_one_student() {
        let sequential = grader();
        for (stage, payload) in initial_data_payloads(&sequential) {
            assert!(submit(&sequential, stage, payload).ok);
        }
        let expected = sequential.answer_store().snapshot(STUDENT).unwrap();
        assert_eq!(expected.gate.max_unlocked_block, Block::ReinforcementCalculation);

        let g = grader();
        let payloads = initial_data_payloads(&g);
        std::thread::scope(|scope| {
            for (stage, payload) in payloads {
                let g = &g;
                scope.spawn(move || {
                    assert!(submit(g, stage, payload).ok);
                });
            }
        });

        let records = g.answer_store().snapshot(STUDENT).unwrap();
        assert_eq!(records.gate, expected.gate);
        assert_eq!(records.answers, expected.answers);
        assert_eq!(result_fields(&records), result_fields(&expected));
    }

    #[test]
    fn test_two_graders_sharing_a_gradebook_never_relock() {
        use crate::store::FileAnswerStore;

        let path = std::env::temp_dir().join(format!("girder_grader_test_shared_{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let open = |user: &str| {
            let store = FileAnswerStore::open(&path, user).unwrap();
            Grader::new(fixtures::reference(), store, GraderConfig::default())
        };
        let second = open("b");
        let first = open("a");
        complete_initial_data(&first);
        assert_eq!(
            first.answer_store().get_gate_state(STUDENT).unwrap().max_unlocked_block,
            Block::ReinforcementCalculation
        );

        // Opened before the first grader wrote anything
        assert!(submit(&second, StageId::Concrete, concrete(&second)).ok);

        let reopened = FileAnswerStore::open(&path, "c").unwrap();
        let records = reopened.snapshot(STUDENT).unwrap();
        assert_eq!(records.gate.max_unlocked_block, Block::ReinforcementCalculation);
        assert_eq!(records.answers.len(), 5);
        assert_eq!(second.get_unlocked_stages(STUDENT).unwrap().len(), 8);

        let _ = std::fs::remove_file(&path);
    }
}
