//! # Answer Storage
//!
//! Everything the grader writes about a student lives in one
//! [`StudentRecords`] value: submitted answers, program answers, stage
//! results and the gate state. Stores hand out snapshots and accept a
//! [`WriteBatch`] that is applied as a whole or not at all.
//! [`AnswerStore::update`] runs a read-modify-commit cycle under the store's
//! own lock, which for the file store is the gradebook lock shared with other
//! processes.
//!
//! Two implementations ship with the crate:
//! - [`MemoryAnswerStore`] - process-local, for tests and embedding
//! - [`FileAnswerStore`] - a JSON gradebook file with atomic saves and an
//!   advisory lock (native targets only)

#[cfg(not(target_arch = "wasm32"))]
pub mod file;
pub mod memory;

#[cfg(not(target_arch = "wasm32"))]
pub use file::{FileAnswerStore, FileLock, Gradebook, LockInfo};
pub use memory::MemoryAnswerStore;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calculations::AnswerMap;
use crate::errors::GradeResult;
use crate::gate::GateState;
use crate::roster::StudentId;
use crate::stages::{ProgramAnswer, StageAnswer, StageId};
use crate::validation::StageResult;

/// All stored state for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecords {
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub program_answers: BTreeMap<StageId, ProgramAnswer>,
    #[serde(default)]
    pub results: BTreeMap<StageId, StageResult>,
    #[serde(default)]
    pub gate: GateState,
}

impl StudentRecords {
    /// Apply every write in the batch. Answers and results are upserts; the
    /// gate is merged and never moves backwards.
    pub fn apply(&mut self, batch: WriteBatch) {
        self.answers.extend(batch.answers);
        self.program_answers.extend(batch.program_answers);
        for result in batch.results {
            self.results.insert(result.stage, result);
        }
        if let Some(gate) = batch.gate {
            self.gate = self.gate.merge(gate);
        }
    }
}

/// Writes produced by one submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub answers: Vec<(StageId, StageAnswer)>,
    pub program_answers: Vec<(StageId, ProgramAnswer)>,
    pub results: Vec<StageResult>,
    pub gate: Option<GateState>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.program_answers.is_empty() && self.results.is_empty() && self.gate.is_none()
    }
}

/// Per-student persistence used by the grader.
///
/// Implementations synchronize internally; `apply` must be all-or-none.
pub trait AnswerStore: Send + Sync {
    /// Copy of everything stored for the student (empty when unknown)
    fn snapshot(&self, student: StudentId) -> GradeResult<StudentRecords>;

    /// Commit a batch of writes atomically.
    fn apply(&self, student: StudentId, batch: WriteBatch) -> GradeResult<()>;

    /// Build a batch from the current records and commit it, with no other
    /// writer in between.
    ///
    /// `f` must not call back into the store. An error from `f` aborts the
    /// cycle without writing.
    fn update<T, F>(&self, student: StudentId, f: F) -> GradeResult<T>
    where
        Self: Sized,
        F: FnOnce(&StudentRecords) -> GradeResult<(WriteBatch, T)>,
    {
        let records = self.snapshot(student)?;
        let (batch, out) = f(&records)?;
        self.apply(student, batch)?;
        Ok(out)
    }

    fn get_stage_answer(&self, student: StudentId, stage: StageId) -> GradeResult<Option<StageAnswer>> {
        Ok(self.snapshot(student)?.answers.remove(&stage))
    }

    fn upsert_stage_answer(&self, student: StudentId, stage: StageId, answer: StageAnswer) -> GradeResult<()> {
        self.apply(
            student,
            WriteBatch {
                answers: vec![(stage, answer)],
                ..Default::default()
            },
        )
    }

    fn get_program_answer(&self, student: StudentId, stage: StageId) -> GradeResult<Option<ProgramAnswer>> {
        Ok(self.snapshot(student)?.program_answers.remove(&stage))
    }

    fn get_stage_results(&self, student: StudentId) -> GradeResult<BTreeMap<StageId, StageResult>> {
        Ok(self.snapshot(student)?.results)
    }

    fn upsert_stage_result(&self, student: StudentId, result: StageResult) -> GradeResult<()> {
        self.apply(
            student,
            WriteBatch {
                results: vec![result],
                ..Default::default()
            },
        )
    }

    fn get_gate_state(&self, student: StudentId) -> GradeResult<GateState> {
        Ok(self.snapshot(student)?.gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{Block, MomentsForcesAnswer};

    #[test]
    fn test_batch_apply_upserts() {
        let mut records = StudentRecords::default();
        let moments = |m: f64| {
            StageAnswer::MomentsForces(MomentsForcesAnswer {
                moment_middle_bot: m,
                moment_left_top: m,
                moment_right_top: m,
            })
        };
        records.apply(WriteBatch {
            answers: vec![(StageId::MomentsForces, moments(1.0))],
            ..Default::default()
        });
        records.apply(WriteBatch {
            answers: vec![(StageId::MomentsForces, moments(2.0))],
            gate: Some(GateState {
                max_unlocked_block: Block::ReinforcementCalculation,
                finished: false,
            }),
            ..Default::default()
        });
        assert_eq!(records.answers.len(), 1);
        assert_eq!(records.answers[&StageId::MomentsForces], moments(2.0));
        assert_eq!(records.gate.max_unlocked_block, Block::ReinforcementCalculation);
    }

    #[test]
    fn test_batch_never_moves_gate_backwards() {
        let mut records = StudentRecords::default();
        records.gate = GateState {
            max_unlocked_block: Block::ReinforcementPlacement,
            finished: false,
        };
        records.apply(WriteBatch {
            gate: Some(GateState::default()),
            ..Default::default()
        });
        assert_eq!(records.gate.max_unlocked_block, Block::ReinforcementPlacement);
    }

    #[test]
    fn test_empty_batch() {
        assert!(WriteBatch::default().is_empty());
    }
}
