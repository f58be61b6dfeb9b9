//! # Stage Gate
//!
//! Blocks open one after another: a stage is accessible once every block
//! before its own has all of its stages answered. The first block is always
//! open.
//!
//! The gate only moves forward. It is re-derived after every accepted
//! submission from the leading run of fully answered blocks and merged with
//! the stored state by taking the maximum.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::stages::{Block, StageId};

/// Per-student gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    /// Last block the student may answer
    pub max_unlocked_block: Block,
    /// Every block has been answered
    #[serde(default)]
    pub finished: bool,
}

impl Default for GateState {
    fn default() -> Self {
        GateState {
            max_unlocked_block: Block::InitialData,
            finished: false,
        }
    }
}

impl GateState {
    /// Gate implied by a set of answered stages, ignoring any prior state.
    pub fn derive(answered: &BTreeSet<StageId>) -> Self {
        let fully_answered = Block::ALL
            .iter()
            .take_while(|block| block.stages().all(|stage| answered.contains(&stage)))
            .count();
        let last = Block::ALL.len() - 1;
        GateState {
            max_unlocked_block: Block::ALL[fully_answered.min(last)],
            finished: fully_answered == Block::ALL.len(),
        }
    }

    /// Merge with a freshly derived state; never moves backwards.
    pub fn advance(self, answered: &BTreeSet<StageId>) -> Self {
        self.merge(GateState::derive(answered))
    }

    /// The further of two states
    pub fn merge(self, other: GateState) -> Self {
        GateState {
            max_unlocked_block: self.max_unlocked_block.max(other.max_unlocked_block),
            finished: self.finished || other.finished,
        }
    }

    pub fn is_unlocked(&self, stage: StageId) -> bool {
        stage.block() <= self.max_unlocked_block
    }

    /// Accessible stages in sheet order
    pub fn unlocked_stages(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|stage| self.is_unlocked(*stage))
            .collect()
    }
}
