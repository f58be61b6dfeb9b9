//! In-memory answer store.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{GradeError, GradeResult};
use crate::roster::StudentId;
use crate::store::{AnswerStore, StudentRecords, WriteBatch};

/// Answer store backed by a `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct MemoryAnswerStore {
    records: RwLock<HashMap<StudentId, StudentRecords>>,
}

impl MemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student_count(&self) -> GradeResult<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> GradeError {
    GradeError::Internal {
        message: "answer store lock poisoned".to_string(),
    }
}

impl AnswerStore for MemoryAnswerStore {
    fn snapshot(&self, student: StudentId) -> GradeResult<StudentRecords> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&student).cloned().unwrap_or_default())
    }

    fn apply(&self, student: StudentId, batch: WriteBatch) -> GradeResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut records = self.records.write().map_err(poisoned)?;
        records.entry(student).or_default().apply(batch);
        Ok(())
    }

    fn update<T, F>(&self, student: StudentId, f: F) -> GradeResult<T>
    where
        F: FnOnce(&StudentRecords) -> GradeResult<(WriteBatch, T)>,
    {
        let mut records = self.records.write().map_err(poisoned)?;
        let current = records.get(&student).cloned().unwrap_or_default();
        let (batch, out) = f(&current)?;
        if !batch.is_empty() {
            records.entry(student).or_default().apply(batch);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{ConcreteAnswer, StageAnswer, StageId};

    #[test]
    fn test_upsert_and_get() {
        let store = MemoryAnswerStore::new();
        let student = StudentId(1);
        assert!(store.get_stage_answer(student, StageId::Concrete).unwrap().is_none());

        let answer = StageAnswer::Concrete(ConcreteAnswer {
            r_b: Some(1.45),
            ..Default::default()
        });
        store
            .upsert_stage_answer(student, StageId::Concrete, answer.clone())
            .unwrap();
        assert_eq!(store.get_stage_answer(student, StageId::Concrete).unwrap(), Some(answer));
        assert_eq!(store.student_count().unwrap(), 1);

        // Other students are unaffected
        assert!(store.snapshot(StudentId(2)).unwrap().answers.is_empty());
    }

    #[test]
    fn test_empty_batch_creates_nothing() {
        let store = MemoryAnswerStore::new();
        store.apply(StudentId(5), WriteBatch::default()).unwrap();
        assert_eq!(store.student_count().unwrap(), 0);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let store = MemoryAnswerStore::new();
        let err = store
            .update(StudentId(3), |_| -> GradeResult<(WriteBatch, ())> {
                Err(GradeError::Internal {
                    message: "boom".to_string(),
                })
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(store.student_count().unwrap(), 0);

        let seen = store
            .update(StudentId(3), |records| {
                let batch = WriteBatch {
                    answers: vec![(StageId::Concrete, StageAnswer::Concrete(ConcreteAnswer::default()))],
                    ..Default::default()
                };
                Ok((batch, records.answers.len()))
            })
            .unwrap();
        assert_eq!(seen, 0);
        assert_eq!(store.snapshot(StudentId(3)).unwrap().answers.len(), 1);
    }
}
