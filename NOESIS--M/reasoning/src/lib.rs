#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Graph reasoning runtime: problem decomposition, admissible A* search,
//! annealed generative walks, and the multi-hypothesis reasoning cycle.

/// Flat runtime configuration.
#[path = "../config.rs"]
pub mod config;

/// Problem decomposition into sub-problems and knowledge gaps.
#[path = "../decomposer/main.rs"]
pub mod decomposer;

/// Error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// Prompt tokenization, keywords, and intent heuristics.
#[path = "../lexicon.rs"]
pub mod lexicon;

/// Observe/Orient/Decide/Act/Reflect/Assemble orchestration.
#[path = "../orchestrator/main.rs"]
pub mod orchestrator;

/// Goal-directed best-first search.
#[path = "../pathfinder/main.rs"]
pub mod pathfinder;

/// Telemetry builder/hook for reasoning components.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Stochastic, temperature-annealed traversal.
#[path = "../walker/main.rs"]
pub mod walker;

pub use config::ReasoningConfig;
pub use decomposer::{
    Decomposer, DecomposerConfig, DecompositionPlan, KnowledgeGap, KnownFact, ProblemDecomposer,
    SubProblem,
};
pub use error::ReasoningError;
pub use lexicon::PromptIntent;
pub use orchestrator::{
    Hypothesis, Intention, ReasoningOrchestrator, ReasoningOrchestratorBuilder, ReasoningResult,
    ReasoningTrace,
};
pub use pathfinder::{AStarPathFinder, Path, PathFinder, SearchConfig};
pub use telemetry::{ReasoningTelemetry, ReasoningTelemetryBuilder};
pub use walker::{
    Candidate, GenerativeWalker, Generation, StepOutcome, StepRecord, Termination, WalkParams,
    WalkState, Walker,
};
