//! # grader_core - Reinforced-Concrete Girder Coursework Grader
//!
//! `grader_core` grades a staged reinforced-concrete girder design assignment.
//! Students answer fifteen stages (materials, geometry, forces, reinforcement,
//! bearing capacity); the engine recomputes reference ("program") answers from
//! the student's own upstream answers and compares them field by field within
//! per-category tolerances. Later blocks of stages unlock once earlier blocks
//! are fully answered.
//!
//! ## Design Philosophy
//!
//! - **Pure calculators**: geometry, reinforcement and bearing capacity are plain
//!   functions over typed inputs
//! - **JSON-First**: answers, program answers, results and errors are serde types
//! - **Rich Errors**: one structured error enum that separates student mistakes
//!   from engine limitations and server-side failures
//! - **All-or-none submissions**: every write of a submission is committed as
//!   one batch
//!
//! ## Quick Start
//!
//! ```rust
//! use grader_core::config::GraderConfig;
//! use grader_core::grader::Grader;
//! use grader_core::reference::ReferenceData;
//! use grader_core::roster::StudentId;
//! use grader_core::store::MemoryAnswerStore;
//! use serde_json::json;
//!
//! let reference = ReferenceData::with_builtin_materials().unwrap();
//! let grader = Grader::new(reference, MemoryAnswerStore::new(), GraderConfig::default());
//!
//! let outcome = grader
//!     .submit_stage(
//!         StudentId(1),
//!         "MomentsForces",
//!         json!({ "moment_middle_bot": 12000.0, "moment_left_top": 15000.0, "moment_right_top": 14000.0 }),
//!     )
//!     .unwrap();
//! assert!(outcome.ok);
//! ```
//!
//! ## Modules
//!
//! - [`grader`] - submission pipeline, cascade and per-student locking
//! - [`stages`] - stage ids, blocks, the stage registry and answer records
//! - [`calculations`] - geometry, reinforcement area and bearing capacity
//! - [`validation`] - tolerant field-by-field comparison
//! - [`gate`] - block unlocking
//! - [`reference`] - reference data lookups and the bundled JSON store
//! - [`store`] - answer stores (in-memory, JSON gradebook file)
//! - [`materials`] - concrete, reinforcement and bar tables
//! - [`roster`] - groups, students and variant sheets
//! - [`sections`] - control sections and faces
//! - [`config`] - tolerance bands and geometry limits
//! - [`units`] - type-safe unit wrappers
//! - [`errors`] - structured error types

pub mod calculations;
pub mod config;
pub mod errors;
pub mod gate;
pub mod grader;
pub mod materials;
pub mod reference;
pub mod roster;
pub mod sections;
pub mod stages;
pub mod store;
pub mod units;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use config::GraderConfig;
pub use errors::{GradeError, GradeResult, RejectionKind};
pub use grader::{Grader, StageSubmitResult};
pub use reference::{ReferenceData, ReferenceStore};
pub use roster::StudentId;
pub use stages::{Block, StageId};
pub use store::{AnswerStore, MemoryAnswerStore};
#[cfg(not(target_arch = "wasm32"))]
pub use store::FileAnswerStore;
pub use validation::StageResult;
