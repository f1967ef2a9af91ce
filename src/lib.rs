//! `rubricate` - deterministic build-order rubric evaluation
//!
//! Scores a recorded real-time-strategy game against a rubric describing an
//! ideal build order: phase by phase key actions, success criteria and
//! common mistakes, milestone benchmarks, and conditional decision points.
//!
//! ```no_run
//! use std::path::Path;
//! use rubricate::engine::evaluate;
//! use rubricate::rubric::RubricLoader;
//! use rubricate::telemetry::load_timeline;
//!
//! # fn main() -> rubricate::error::Result<()> {
//! let rubric = RubricLoader::with_library("rubric_library").load("fast_castle")?;
//! let timeline = load_timeline(Path::new("game.json"))?;
//! let report = evaluate(&rubric.rubric, &timeline);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod observability;
pub mod rubric;
pub mod telemetry;
