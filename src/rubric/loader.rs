//! Rubric loading
//!
//! Pipeline:
//! 1. Resolve the reference (file path, library id, or partial library id)
//! 2. Enforce the size limit and strip a UTF-8 BOM
//! 3. Parse JSON or YAML into a document tree
//! 4. Validate the tree, collecting every issue
//! 5. Deserialize into a read-only [`Rubric`]

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{LoadError, RubricateError, SchemaError, Severity, ValidationIssue};
use crate::rubric::schema::{Rubric, RubricDocument};
use crate::rubric::validation::Validator;

/// Extensions recognized as rubric documents, in lookup order.
pub const RUBRIC_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Document name used for rubrics parsed from memory.
const INLINE_DOCUMENT: &str = "<inline>";

// ============================================================================
// Limits
// ============================================================================

/// Limits on rubric documents to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct RubricLimits {
    /// Maximum number of phases.
    pub max_phases: usize,

    /// Maximum rubric file size in bytes.
    pub max_rubric_size: usize,
}

impl Default for RubricLimits {
    fn default() -> Self {
        Self {
            max_phases: env_or("RUBRICATE_MAX_PHASES", 64),
            max_rubric_size: env_or("RUBRICATE_MAX_RUBRIC_SIZE", 1024 * 1024),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

impl Rubric {
    /// Validates a document tree and builds a rubric.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] listing every violated field.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        parse_rubric(value, INLINE_DOCUMENT, &RubricLimits::default()).map(|(rubric, _)| rubric)
    }

    /// Parses and validates a JSON rubric document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the text is not JSON or fails validation.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let value: Value = serde_json::from_str(text).map_err(|e| {
            SchemaError::new(
                INLINE_DOCUMENT,
                vec![error_issue("", &format!("invalid JSON: {e}"))],
            )
        })?;
        Self::from_value(value)
    }
}

/// Validates and deserializes a rubric document tree.
///
/// Returns the rubric together with any validation warnings.
///
/// # Errors
///
/// Returns a [`SchemaError`] naming `document` if validation finds errors.
pub fn parse_rubric(
    value: Value,
    document: &str,
    limits: &RubricLimits,
) -> Result<(Rubric, Vec<ValidationIssue>), SchemaError> {
    let result = Validator::new().validate(&value, limits);
    if result.has_errors() {
        return Err(SchemaError::new(document, result.errors));
    }

    // The validator covers the schema; this only fails on shapes it does not
    // model, such as both `source` and `source_url` being present.
    let fields: RubricDocument = serde_json::from_value(value)
        .map_err(|e| SchemaError::new(document, vec![error_issue("", &e.to_string())]))?;
    let rubric = Rubric::from_document(fields);

    for issue in &result.warnings {
        warn!(document, path = %issue.path, "{}", issue.message);
    }
    Ok((rubric, result.warnings))
}

fn error_issue(path: &str, message: &str) -> ValidationIssue {
    ValidationIssue {
        path: path.to_string(),
        message: message.to_string(),
        severity: Severity::Error,
    }
}

/// Reads a JSON or YAML document from disk, enforcing the size limit.
///
/// YAML is selected by a `.yaml`/`.yml` extension; everything else is
/// parsed as JSON.
///
/// # Errors
///
/// Returns [`LoadError`] if the file is missing, too large, empty, or not
/// parseable.
pub fn read_document(path: &Path, limits: &RubricLimits) -> Result<Value, LoadError> {
    let metadata = std::fs::metadata(path).map_err(|e| LoadError::from_io(path, e))?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > limits.max_rubric_size {
        return Err(LoadError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: limits.max_rubric_size,
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let value: Value = if is_yaml(path) {
        serde_yaml::from_str(raw).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?
    } else {
        serde_json::from_str(raw).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            line: Some(e.line()),
            message: e.to_string(),
        })?
    };

    if value.is_null() {
        return Err(LoadError::Parse {
            path: path.to_path_buf(),
            line: None,
            message: "Rubric file is empty".to_string(),
        });
    }
    Ok(value)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

// ============================================================================
// Loader
// ============================================================================

/// A rubric loaded from disk.
#[derive(Debug)]
pub struct LoadedRubric {
    /// The validated rubric.
    pub rubric: Rubric,

    /// File the rubric was read from.
    pub path: PathBuf,

    /// Validation warnings.
    pub warnings: Vec<ValidationIssue>,
}

/// Resolves rubric references against a library directory and loads them.
#[derive(Debug, Clone)]
pub struct RubricLoader {
    library: PathBuf,
    limits: RubricLimits,
}

impl RubricLoader {
    /// Creates a loader over a library directory.
    #[must_use]
    pub const fn new(library: PathBuf, limits: RubricLimits) -> Self {
        Self { library, limits }
    }

    /// Creates a loader with default limits.
    #[must_use]
    pub fn with_library(library: impl Into<PathBuf>) -> Self {
        Self::new(library.into(), RubricLimits::default())
    }

    /// Returns the library directory.
    #[must_use]
    pub fn library(&self) -> &Path {
        &self.library
    }

    /// Resolves a rubric reference to a file.
    ///
    /// Tried in order: an existing file path, `<library>/<id>.<ext>`, then
    /// the first library file (sorted by name) whose stem contains the
    /// reference case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::RubricNotFound`] with the closest library id as a
    /// suggestion if nothing matches.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, LoadError> {
        let direct = Path::new(reference);
        if direct.is_file() {
            debug!(path = %direct.display(), "rubric reference is a file path");
            return Ok(direct.to_path_buf());
        }

        for ext in RUBRIC_EXTENSIONS {
            let candidate = self.library.join(format!("{reference}.{ext}"));
            if candidate.is_file() {
                debug!(path = %candidate.display(), "rubric found in library");
                return Ok(candidate);
            }
        }

        let needle = reference.to_lowercase();
        let entries = self.library_entries();
        if let Some((_, path)) = entries
            .iter()
            .find(|(stem, _)| stem.to_lowercase().contains(&needle))
        {
            debug!(path = %path.display(), "rubric matched by partial id");
            return Ok(path.clone());
        }

        let suggestion = entries
            .iter()
            .map(|(stem, _)| (stem, strsim::damerau_levenshtein(&needle, &stem.to_lowercase())))
            .filter(|(_, distance)| *distance <= 3)
            .min_by_key(|(_, distance)| *distance)
            .map(|(stem, _)| stem.clone());

        Err(LoadError::RubricNotFound {
            reference: reference.to_string(),
            suggestion,
        })
    }

    /// Resolves and loads a rubric.
    ///
    /// # Errors
    ///
    /// Returns a load error if the reference cannot be resolved or read, or a
    /// [`SchemaError`] if the document is invalid.
    pub fn load(&self, reference: &str) -> Result<LoadedRubric, RubricateError> {
        let path = self.resolve(reference)?;
        self.load_path(&path)
    }

    /// Loads and validates a rubric file.
    ///
    /// # Errors
    ///
    /// Returns a load error if the file cannot be read or parsed, or a
    /// [`SchemaError`] if the document is invalid.
    pub fn load_path(&self, path: &Path) -> Result<LoadedRubric, RubricateError> {
        let value = read_document(path, &self.limits)?;
        let (rubric, warnings) = parse_rubric(value, &path.display().to_string(), &self.limits)?;
        info!(
            rubric = rubric.id(),
            phases = rubric.phases().len(),
            warnings = warnings.len(),
            "loaded rubric"
        );
        Ok(LoadedRubric {
            rubric,
            path: path.to_path_buf(),
            warnings,
        })
    }

    /// Lists library rubric ids (file stems), sorted.
    #[must_use]
    pub fn library_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .library_entries()
            .into_iter()
            .map(|(stem, _)| stem)
            .collect();
        ids.dedup();
        ids
    }

    /// Library documents as `(stem, path)`, sorted by file name.
    fn library_entries(&self) -> Vec<(String, PathBuf)> {
        let base = glob::Pattern::escape(&self.library.to_string_lossy());
        let mut paths: Vec<PathBuf> = RUBRIC_EXTENSIONS
            .iter()
            .filter_map(|ext| glob::glob(&format!("{base}/*.{ext}")).ok())
            .flat_map(|entries| entries.filter_map(Result::ok))
            .filter(|p| p.is_file())
            .collect();
        paths.sort();
        paths
            .into_iter()
            .filter_map(|p| {
                let stem = p.file_stem()?.to_str()?.to_string();
                Some((stem, p))
            })
            .collect()
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "id": "fast_castle",
        "title": "Fast Castle",
        "source": "https://example.com",
        "difficulty": "advanced",
        "archetype": "fast_castle",
        "phases": [{"name": "Dark Age", "duration_range": [0, 330]}]
    }"#;

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("english_fast_castle.json"), MINIMAL).unwrap();
        std::fs::write(
            dir.path().join("scout_rush.yaml"),
            "id: scout_rush\ntitle: Scout Rush\nsource: https://example.com\n\
             difficulty: beginner\narchetype: rush\nphases:\n  - name: Dark Age\n    duration_range: [0, 240]\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_rubric_limits_default() {
        let limits = RubricLimits::default();
        assert_eq!(limits.max_phases, 64);
        assert_eq!(limits.max_rubric_size, 1024 * 1024);
    }

    #[test]
    fn test_from_json_str_valid() {
        let rubric = Rubric::from_json_str(MINIMAL).unwrap();
        assert_eq!(rubric.id(), "fast_castle");
        assert_eq!(rubric.phases().len(), 1);
    }

    #[test]
    fn test_from_json_str_invalid_json() {
        let err = Rubric::from_json_str("{not json").unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.issues[0].message.contains("invalid JSON"));
    }

    #[test]
    fn test_from_json_str_strips_bom() {
        let text = format!("\u{feff}{MINIMAL}");
        assert!(Rubric::from_json_str(&text).is_ok());
    }

    #[test]
    fn test_resolve_exact_id() {
        let dir = library();
        let loader = RubricLoader::with_library(dir.path());
        let path = loader.resolve("scout_rush").unwrap();
        assert!(path.ends_with("scout_rush.yaml"));
    }

    #[test]
    fn test_resolve_partial_id() {
        let dir = library();
        let loader = RubricLoader::with_library(dir.path());
        let path = loader.resolve("Fast_Castle").unwrap();
        assert!(path.ends_with("english_fast_castle.json"));
    }

    #[test]
    fn test_resolve_not_found_suggests() {
        let dir = library();
        let loader = RubricLoader::with_library(dir.path());
        let err = loader.resolve("scout_rsuh").unwrap_err();
        match err {
            LoadError::RubricNotFound { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("scout_rush"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_yaml_rubric() {
        let dir = library();
        let loader = RubricLoader::with_library(dir.path());
        let loaded = loader.load("scout_rush").unwrap();
        assert_eq!(loaded.rubric.title(), "Scout Rush");
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_load_rejects_oversized_file() {
        let dir = library();
        let loader = RubricLoader::new(
            dir.path().to_path_buf(),
            RubricLimits {
                max_phases: 64,
                max_rubric_size: 16,
            },
        );
        let err = loader.load("scout_rush").unwrap_err();
        assert!(matches!(
            err,
            RubricateError::Load(LoadError::TooLarge { limit: 16, .. })
        ));
    }

    #[test]
    fn test_load_reports_schema_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"id": "broken"}"#).unwrap();
        let loader = RubricLoader::with_library(dir.path());
        let err = loader.load_path(&path).unwrap_err();
        match err {
            RubricateError::Schema(schema) => {
                assert!(schema.document.ends_with("broken.json"));
                assert!(schema.mentions("phases"));
                assert!(schema.mentions("title"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "").unwrap();
        let err = read_document(&path, &RubricLimits::default()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_library_ids_sorted() {
        let dir = library();
        let loader = RubricLoader::with_library(dir.path());
        assert_eq!(loader.library_ids(), ["english_fast_castle", "scout_rush"]);
    }
}
