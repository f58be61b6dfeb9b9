//! # Stages and Blocks
//!
//! The coursework is answered in fifteen stages grouped into four blocks.
//! Every stage has a stable name used on the wire, a block, a flag saying
//! whether it is graded, and the list of stages whose answers or program
//! answers must be refreshed when it changes.
//!
//! | Block | Stages |
//! |-------|--------|
//! | InitialData | GirderGeometry, Concrete, Reinforcement, MomentsForces, InitialReinforcement |
//! | ReinforcementCalculation | CalculatedReinforcementMiddle, ..Left, ..Right |
//! | ReinforcementPlacement | CalculatedReinforcement |
//! | BearingCapacity | BearingCapacity{Middle,Left,Right}{Bot,Top} |
//!
//! The registry is built once on first use.

pub mod answers;

pub use answers::{
    BearingCapacityAnswer, CalculatedReinforcementAnswer, ConcreteAnswer, GirderGeometryAnswer, InitialLayer,
    InitialReinforcementAnswer, MomentsForcesAnswer, PlacedLayer, PlacementAnswer, ProgramAnswer,
    ReinforcementAnswer, StageAnswer, SENTINEL,
};

use std::collections::HashMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::GradeError;
use crate::sections::{Section, Surface};

/// Identifier of one answer stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageId {
    GirderGeometry,
    Concrete,
    Reinforcement,
    MomentsForces,
    InitialReinforcement,
    CalculatedReinforcementMiddle,
    CalculatedReinforcementLeft,
    CalculatedReinforcementRight,
    /// Final bar placement
    CalculatedReinforcement,
    BearingCapacityMiddleBot,
    BearingCapacityLeftBot,
    BearingCapacityRightBot,
    BearingCapacityMiddleTop,
    BearingCapacityLeftTop,
    BearingCapacityRightTop,
}

impl StageId {
    /// All stages in sheet order.
    pub const ALL: [StageId; 15] = [
        StageId::GirderGeometry,
        StageId::Concrete,
        StageId::Reinforcement,
        StageId::MomentsForces,
        StageId::InitialReinforcement,
        StageId::CalculatedReinforcementMiddle,
        StageId::CalculatedReinforcementLeft,
        StageId::CalculatedReinforcementRight,
        StageId::CalculatedReinforcement,
        StageId::BearingCapacityMiddleBot,
        StageId::BearingCapacityLeftBot,
        StageId::BearingCapacityRightBot,
        StageId::BearingCapacityMiddleTop,
        StageId::BearingCapacityLeftTop,
        StageId::BearingCapacityRightTop,
    ];

    pub const REINFORCEMENT_AREAS: [StageId; 3] = [
        StageId::CalculatedReinforcementMiddle,
        StageId::CalculatedReinforcementLeft,
        StageId::CalculatedReinforcementRight,
    ];

    pub const BEARING_CAPACITIES: [StageId; 6] = [
        StageId::BearingCapacityMiddleBot,
        StageId::BearingCapacityLeftBot,
        StageId::BearingCapacityRightBot,
        StageId::BearingCapacityMiddleTop,
        StageId::BearingCapacityLeftTop,
        StageId::BearingCapacityRightTop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::GirderGeometry => "GirderGeometry",
            StageId::Concrete => "Concrete",
            StageId::Reinforcement => "Reinforcement",
            StageId::MomentsForces => "MomentsForces",
            StageId::InitialReinforcement => "InitialReinforcement",
            StageId::CalculatedReinforcementMiddle => "CalculatedReinforcementMiddle",
            StageId::CalculatedReinforcementLeft => "CalculatedReinforcementLeft",
            StageId::CalculatedReinforcementRight => "CalculatedReinforcementRight",
            StageId::CalculatedReinforcement => "CalculatedReinforcement",
            StageId::BearingCapacityMiddleBot => "BearingCapacityMiddleBot",
            StageId::BearingCapacityLeftBot => "BearingCapacityLeftBot",
            StageId::BearingCapacityRightBot => "BearingCapacityRightBot",
            StageId::BearingCapacityMiddleTop => "BearingCapacityMiddleTop",
            StageId::BearingCapacityLeftTop => "BearingCapacityLeftTop",
            StageId::BearingCapacityRightTop => "BearingCapacityRightTop",
        }
    }

    /// Control section for per-section stages
    pub fn section(&self) -> Option<Section> {
        match self {
            StageId::CalculatedReinforcementMiddle
            | StageId::BearingCapacityMiddleBot
            | StageId::BearingCapacityMiddleTop => Some(Section::Middle),
            StageId::CalculatedReinforcementLeft
            | StageId::BearingCapacityLeftBot
            | StageId::BearingCapacityLeftTop => Some(Section::Left),
            StageId::CalculatedReinforcementRight
            | StageId::BearingCapacityRightBot
            | StageId::BearingCapacityRightTop => Some(Section::Right),
            _ => None,
        }
    }

    /// Face in tension for bearing-capacity stages
    pub fn surface(&self) -> Option<Surface> {
        match self {
            StageId::BearingCapacityMiddleBot | StageId::BearingCapacityLeftBot | StageId::BearingCapacityRightBot => {
                Some(Surface::Bot)
            }
            StageId::BearingCapacityMiddleTop | StageId::BearingCapacityLeftTop | StageId::BearingCapacityRightTop => {
                Some(Surface::Top)
            }
            _ => None,
        }
    }

    pub fn reinforcement_area(section: Section) -> StageId {
        match section {
            Section::Middle => StageId::CalculatedReinforcementMiddle,
            Section::Left => StageId::CalculatedReinforcementLeft,
            Section::Right => StageId::CalculatedReinforcementRight,
        }
    }

    pub fn bearing_capacity(section: Section, surface: Surface) -> StageId {
        match (section, surface) {
            (Section::Middle, Surface::Bot) => StageId::BearingCapacityMiddleBot,
            (Section::Left, Surface::Bot) => StageId::BearingCapacityLeftBot,
            (Section::Right, Surface::Bot) => StageId::BearingCapacityRightBot,
            (Section::Middle, Surface::Top) => StageId::BearingCapacityMiddleTop,
            (Section::Left, Surface::Top) => StageId::BearingCapacityLeftTop,
            (Section::Right, Surface::Top) => StageId::BearingCapacityRightTop,
        }
    }

    fn info(&self) -> &'static StageInfo {
        // Every StageId is inserted when the registry is built.
        &REGISTRY[self]
    }

    pub fn block(&self) -> Block {
        self.info().block
    }

    /// Whether submissions of this stage produce a stage result
    pub fn is_graded(&self) -> bool {
        self.info().graded
    }

    /// Stages to refresh after this one changes, in refresh order
    pub fn dependents(&self) -> &'static [StageId] {
        &self.info().dependents
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| GradeError::UnknownStage { name: s.to_string() })
    }
}

/// Group of stages unlocked together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Block {
    InitialData,
    ReinforcementCalculation,
    ReinforcementPlacement,
    BearingCapacity,
}

impl Block {
    pub const ALL: [Block; 4] = [
        Block::InitialData,
        Block::ReinforcementCalculation,
        Block::ReinforcementPlacement,
        Block::BearingCapacity,
    ];

    pub fn stages(&self) -> impl Iterator<Item = StageId> + '_ {
        StageId::ALL.into_iter().filter(move |s| s.block() == *self)
    }
}

struct StageInfo {
    block: Block,
    graded: bool,
    dependents: Vec<StageId>,
}

static REGISTRY: Lazy<HashMap<StageId, StageInfo>> = Lazy::new(|| {
    let areas = StageId::REINFORCEMENT_AREAS;
    let capacities = StageId::BEARING_CAPACITIES;
    let areas_and_capacities: Vec<StageId> = areas.iter().chain(capacities.iter()).copied().collect();

    StageId::ALL
        .into_iter()
        .map(|stage| {
            let (block, graded, dependents) = match stage {
                StageId::GirderGeometry => {
                    let mut deps = vec![StageId::InitialReinforcement, StageId::CalculatedReinforcement];
                    deps.extend_from_slice(&areas_and_capacities);
                    (Block::InitialData, false, deps)
                }
                StageId::Concrete | StageId::Reinforcement => {
                    (Block::InitialData, true, areas_and_capacities.clone())
                }
                StageId::MomentsForces | StageId::InitialReinforcement => (Block::InitialData, false, areas.to_vec()),
                StageId::CalculatedReinforcementMiddle
                | StageId::CalculatedReinforcementLeft
                | StageId::CalculatedReinforcementRight => (Block::ReinforcementCalculation, true, Vec::new()),
                StageId::CalculatedReinforcement => (Block::ReinforcementPlacement, false, capacities.to_vec()),
                _ => (Block::BearingCapacity, true, Vec::new()),
            };
            (
                stage,
                StageInfo {
                    block,
                    graded,
                    dependents,
                },
            )
        })
        .collect()
});
