//! Rubric model
//!
//! Loading and validation of build-order rubrics: the structured strategy
//! descriptions games are evaluated against.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{LoadedRubric, RubricLimits, RubricLoader, parse_rubric, read_document};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
