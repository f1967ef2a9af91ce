//! Error types for `rubricate`
//!
//! Fatal errors (`SchemaError`, `IncompleteDataError`, `LoadError`) abort an
//! evaluation before any report is produced. `UnscorablePredicateError` is
//! non-fatal: the engine downgrades the affected item to `unscored`.

use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `rubricate` CLI operations.
///
/// An evaluation that completes exits with `SUCCESS` regardless of score.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Rubric document is malformed or fails validation
    pub const SCHEMA_ERROR: i32 = 2;

    /// I/O error (file not found, rubric not in library)
    pub const IO_ERROR: i32 = 3;

    /// Telemetry lacks the events needed to evaluate
    pub const INCOMPLETE_DATA: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `rubricate` operations.
#[derive(Debug, Error)]
pub enum RubricateError {
    /// Rubric document failed validation
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Telemetry is missing required anchor events
    #[error(transparent)]
    Incomplete(#[from] IncompleteDataError),

    /// Rubric or telemetry file could not be located or read
    #[error(transparent)]
    Load(#[from] LoadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Arguments are individually valid but inconsistent
    #[error("invalid arguments: {0}")]
    Usage(String),
}

impl RubricateError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Schema(_) | Self::Yaml(_) => ExitCode::SCHEMA_ERROR,
            Self::Json(_) => ExitCode::ERROR,
            Self::Incomplete(_) => ExitCode::INCOMPLETE_DATA,
            Self::Load(err) => err.exit_code(),
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
        }
    }
}

// ============================================================================
// Rubric Schema Errors
// ============================================================================

/// A rubric document failed schema or semantic validation.
///
/// Carries every issue found, not just the first one.
#[derive(Debug, Error)]
#[error(
    "rubric '{document}' failed validation with {} issue(s):\n{}",
    .issues.len(),
    render_issues(.issues)
)]
pub struct SchemaError {
    /// Name of the document (file path or `<inline>`)
    pub document: String,
    /// Every error-severity issue found
    pub issues: Vec<ValidationIssue>,
}

impl SchemaError {
    /// Creates a schema error from a list of issues.
    #[must_use]
    pub fn new(document: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self {
            document: document.into(),
            issues,
        }
    }

    /// Returns `true` if any issue points at the given path.
    #[must_use]
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found in a rubric document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON path to the problematic field (e.g., "phases[2].duration_range")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - the rubric cannot be used
    Error,
    /// Warning - suspicious but evaluable
    Warning,
}

// ============================================================================
// Telemetry Errors
// ============================================================================

/// Telemetry cannot be evaluated because required anchor data is missing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IncompleteDataError {
    /// The telemetry contained no records at all
    #[error("telemetry contains no events")]
    NoEvents,

    /// Every record was dropped as malformed or lacking a usable timestamp
    #[error("telemetry has {dropped} record(s) but none is a well-formed event with a usable timestamp")]
    NoTimestampedEvents {
        /// Number of records dropped
        dropped: usize,
    },

    /// No age transition or phase boundary event to anchor phases on
    #[error(
        "telemetry has {event_count} event(s) but no age_up or phase_boundary event to anchor phases"
    )]
    NoAgeTransitions {
        /// Number of usable events in the timeline
        event_count: usize,
    },
}

// ============================================================================
// Predicate Errors
// ============================================================================

/// A criterion or mistake cannot be scored.
///
/// Never fatal: the evaluator records the affected item as `unscored`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnscorablePredicateError {
    /// The item carries no predicate reference (free text only)
    #[error("no predicate attached")]
    NoPredicate,

    /// Identifier is not in the predicate registry
    #[error("unknown predicate '{id}'{}", .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    Unknown {
        /// The identifier as written in the rubric
        id: String,
        /// Closest registry identifier, if any
        suggestion: Option<String>,
    },

    /// A required parameter is absent
    #[error("predicate '{predicate}' requires parameter '{param}'")]
    MissingParam {
        /// Predicate identifier
        predicate: &'static str,
        /// Parameter name
        param: &'static str,
    },

    /// A parameter has the wrong type or an out-of-range value
    #[error("predicate '{predicate}' parameter '{param}': expected {expected}")]
    InvalidParam {
        /// Predicate identifier
        predicate: &'static str,
        /// Parameter name
        param: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Load Errors
// ============================================================================

/// Errors locating or reading input documents.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Rubric reference matched neither a path nor a library entry
    #[error("rubric not found: {reference}{}", .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    RubricNotFound {
        /// The reference as given
        reference: String,
        /// Closest library id, if any
        suggestion: Option<String>,
    },

    /// Referenced file does not exist
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// File exists but could not be read (permissions, invalid UTF-8, ...)
    #[error("cannot read {path}: {source}")]
    Read {
        /// Path to the file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Document exceeds the configured size limit
    #[error("{path} is {size} bytes (limit: {limit})")]
    TooLarge {
        /// Path to the document
        path: PathBuf,
        /// Actual size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// Document is not valid JSON/YAML
    #[error("parse error in {path}: {message}")]
    Parse {
        /// Path to the document
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Telemetry document has a shape the loader does not recognize
    #[error(
        "unrecognized telemetry format in {path}: expected an event array, an object with 'events', or a game summary with 'timings'/'build_order'"
    )]
    UnrecognizedTelemetry {
        /// Path to the document
        path: PathBuf,
    },
}

impl LoadError {
    /// Classifies an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            Self::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::RubricNotFound { .. } | Self::MissingFile { .. } | Self::Read { .. } => {
                ExitCode::IO_ERROR
            }
            Self::TooLarge { .. } | Self::Parse { .. } => ExitCode::SCHEMA_ERROR,
            Self::UnrecognizedTelemetry { .. } => ExitCode::INCOMPLETE_DATA,
        }
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `rubricate` operations.
pub type Result<T> = std::result::Result<T, RubricateError>;

// ============================================================================
// Tests
// ============================================================================
