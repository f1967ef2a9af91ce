//! Evaluation engine
//!
//! Scores a normalized game timeline against a rubric.
//!
//! # Architecture
//!
//! - [`segment`] - partitions the timeline into one segment per phase
//! - [`predicate`] - the closed predicate registry checked against segments
//! - [`criteria`] - key actions, success criteria and mistakes per phase
//! - [`benchmark`] - milestone detection and pace classification
//! - [`decision`] - trigger detection and response matching
//! - [`report`] - aggregation into an [`EvaluationReport`]
//! - [`evaluator`] - the [`Evaluator`] entry point tying the stages together

pub mod benchmark;
pub mod criteria;
pub mod decision;
pub mod evaluator;
pub mod predicate;
pub mod report;
pub mod segment;

pub use benchmark::{BenchmarkResult, BenchmarkStatus, BenchmarkUnit, PaceThresholds, SamplePoint};
pub use criteria::{ItemResult, ItemStatus, PhaseResult};
pub use decision::{DecisionOutcome, DecisionResult};
pub use evaluator::{EngineConfig, Evaluator, evaluate};
pub use predicate::{PredicateSpec, REGISTRY_VERSION, registry};
pub use report::{EvaluationReport, Finding, ItemCategory, Violation, ViolationKind};
pub use segment::{PhaseSegment, match_phases};
