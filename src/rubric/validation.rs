//! Rubric validation
//!
//! Schema and semantic checks run on the raw document before it is
//! deserialized, so that every problem is reported at once instead of only
//! the first one serde would stop at.
//!
//! Errors make the rubric unusable. Warnings (duplicate phase names, `null`
//! benchmarks, unknown predicate identifiers) are reported but evaluation
//! proceeds.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::engine::predicate::{self, Predicate};
use crate::error::{Severity, ValidationIssue};
use crate::rubric::loader::RubricLimits;
use crate::rubric::schema::{Difficulty, Importance, PredicateRef};
use crate::telemetry::pattern::SubjectMatcher;

// ============================================================================
// Public API
// ============================================================================

/// Result of rubric validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Rubric document validator.
///
/// Collects every issue rather than stopping at the first.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a rubric document and returns the result.
    pub fn validate(&mut self, doc: &Value, limits: &RubricLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        if let Some(root) = doc.as_object() {
            self.validate_metadata(root);
            self.validate_phases(root, limits);
            self.validate_benchmarks(root);
            self.validate_decision_points(root);
        } else {
            self.add_error("", "Rubric document must be a JSON object");
        }

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    fn validate_metadata(&mut self, root: &Map<String, Value>) {
        for field in ["id", "title", "archetype"] {
            self.require_string(root, field, field);
        }

        // `source_url` is what the extraction tool writes
        if root.contains_key("source") {
            self.require_string(root, "source", "source");
        } else if root.contains_key("source_url") {
            self.require_string(root, "source_url", "source_url");
        } else {
            self.add_error("source", "Missing required field 'source'");
        }

        if let Some(difficulty) = self.require_string(root, "difficulty", "difficulty") {
            if !Difficulty::NAMES.contains(&difficulty) {
                self.add_error(
                    "difficulty",
                    &format!(
                        "Invalid difficulty '{difficulty}'. Expected one of: {}",
                        Difficulty::NAMES.join(", ")
                    ),
                );
            }
        }

        for field in ["civilizations", "map_types", "key_insights"] {
            self.optional_string_list(root, field, field);
        }
        self.optional_string(root, "overview", "overview");
    }

    // ========================================================================
    // Phases
    // ========================================================================

    fn validate_phases(&mut self, root: &Map<String, Value>, limits: &RubricLimits) {
        let phases = match root.get("phases") {
            None | Some(Value::Null) => {
                self.add_error("phases", "Missing required field 'phases'");
                return;
            }
            Some(Value::Array(phases)) => phases,
            Some(other) => {
                self.add_error(
                    "phases",
                    &format!("Expected an array of phases, found {}", type_name(other)),
                );
                return;
            }
        };

        if phases.is_empty() {
            self.add_error("phases", "Rubric must define at least one phase");
            return;
        }
        if phases.len() > limits.max_phases {
            self.add_error(
                "phases",
                &format!(
                    "Rubric defines {} phases (limit: {})",
                    phases.len(),
                    limits.max_phases
                ),
            );
        }

        let mut names = HashSet::new();
        for (idx, phase) in phases.iter().enumerate() {
            let path = format!("phases[{idx}]");
            let Some(phase) = phase.as_object() else {
                self.add_error(&path, "Phase must be an object");
                continue;
            };

            if let Some(name) = self.require_string(phase, "name", &format!("{path}.name")) {
                if name.trim().is_empty() {
                    self.add_error(&format!("{path}.name"), "Phase name cannot be empty");
                } else if !names.insert(name) {
                    self.add_warning(
                        &format!("{path}.name"),
                        &format!("Duplicate phase name: '{name}'"),
                    );
                }
            }
            self.optional_string(phase, "description", &format!("{path}.description"));

            self.validate_duration_range(
                phase.get("duration_range"),
                &format!("{path}.duration_range"),
            );
            self.validate_key_actions(phase, &path);
            self.validate_criteria(phase, &path);
            self.validate_mistakes(phase, &path);
        }
    }

    fn validate_duration_range(&mut self, range: Option<&Value>, path: &str) {
        let Some(range) = range else {
            self.add_error(path, "Missing required field 'duration_range'");
            return;
        };
        let pair = range
            .as_array()
            .filter(|items| items.len() == 2)
            .and_then(|items| Some((items[0].as_f64()?, items[1].as_f64()?)));
        let Some((min, max)) = pair else {
            self.add_error(
                path,
                &format!(
                    "Expected [min, max] with two numbers of seconds, found {}",
                    compact(range)
                ),
            );
            return;
        };
        if min < 0.0 || max < 0.0 {
            self.add_error(path, &format!("Bounds must be non-negative, found [{min}, {max}]"));
        } else if min > max {
            self.add_error(path, &format!("min {min} exceeds max {max}"));
        }
    }

    fn validate_key_actions(&mut self, phase: &Map<String, Value>, phase_path: &str) {
        let path = format!("{phase_path}.key_actions");
        let Some(actions) = self.optional_array(phase, "key_actions", &path) else {
            return;
        };
        for (idx, action) in actions.iter().enumerate() {
            let path = format!("{path}[{idx}]");
            let Some(action) = action.as_object() else {
                self.add_error(&path, "Key action must be an object with an 'action' field");
                continue;
            };
            self.require_string(action, "action", &format!("{path}.action"));
            self.optional_string(action, "timing", &format!("{path}.timing"));
            self.validate_importance(action, &path);
            self.validate_predicate_ref(action, &path);
        }
    }

    fn validate_criteria(&mut self, phase: &Map<String, Value>, phase_path: &str) {
        let path = format!("{phase_path}.success_criteria");
        let Some(criteria) = self.optional_array(phase, "success_criteria", &path) else {
            return;
        };
        for (idx, criterion) in criteria.iter().enumerate() {
            let path = format!("{path}[{idx}]");
            match criterion {
                Value::String(_) => {}
                Value::Object(criterion) => {
                    self.require_string(criterion, "description", &format!("{path}.description"));
                    self.validate_importance(criterion, &path);
                    self.validate_predicate_ref(criterion, &path);
                }
                other => self.add_error(
                    &path,
                    &format!(
                        "Expected a string or an object with 'description', found {}",
                        type_name(other)
                    ),
                ),
            }
        }
    }

    fn validate_mistakes(&mut self, phase: &Map<String, Value>, phase_path: &str) {
        let path = format!("{phase_path}.common_mistakes");
        let Some(mistakes) = self.optional_array(phase, "common_mistakes", &path) else {
            return;
        };
        for (idx, mistake) in mistakes.iter().enumerate() {
            let path = format!("{path}[{idx}]");
            match mistake {
                Value::String(_) => {}
                Value::Object(mistake) => {
                    self.require_string(mistake, "mistake", &format!("{path}.mistake"));
                    self.optional_string(mistake, "consequence", &format!("{path}.consequence"));
                    self.optional_string(mistake, "fix", &format!("{path}.fix"));
                    self.validate_importance(mistake, &path);
                    self.validate_predicate_ref(mistake, &path);
                }
                other => self.add_error(
                    &path,
                    &format!(
                        "Expected a string or an object with 'mistake', found {}",
                        type_name(other)
                    ),
                ),
            }
        }
    }

    fn validate_importance(&mut self, item: &Map<String, Value>, item_path: &str) {
        let path = format!("{item_path}.importance");
        if let Some(importance) = self.optional_string(item, "importance", &path) {
            if !Importance::NAMES.contains(&importance) {
                self.add_error(
                    &path,
                    &format!(
                        "Invalid importance '{importance}'. Expected one of: {}",
                        Importance::NAMES.join(", ")
                    ),
                );
            }
        }
    }

    /// Checks `predicate`/`params`. Problems that only make the item
    /// unscorable are warnings; structural type errors are errors.
    fn validate_predicate_ref(&mut self, item: &Map<String, Value>, item_path: &str) {
        let predicate_path = format!("{item_path}.predicate");
        let params_path = format!("{item_path}.params");
        let id = self.optional_string(item, "predicate", &predicate_path);

        let params = match item.get("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(other) => {
                self.add_error(
                    &params_path,
                    &format!("Expected an object, found {}", type_name(other)),
                );
                return;
            }
        };

        let Some(id) = id else {
            if !params.is_empty() {
                self.add_warning(&params_path, "Parameters given without a 'predicate'");
            }
            return;
        };

        if predicate::lookup(id).is_none() {
            let message = predicate::suggest(id).map_or_else(
                || format!("Unknown predicate '{id}'; the item will be unscored"),
                |s| format!("Unknown predicate '{id}' (did you mean '{s}'?); the item will be unscored"),
            );
            self.add_warning(&predicate_path, &message);
            return;
        }

        let check = PredicateRef {
            predicate: Some(id.to_string()),
            params: params.into_iter().collect(),
        };
        if let Err(e) = Predicate::bind(&check) {
            self.add_warning(&params_path, &format!("{e}; the item will be unscored"));
        }
    }

    // ========================================================================
    // Benchmarks
    // ========================================================================

    fn validate_benchmarks(&mut self, root: &Map<String, Value>) {
        let benchmarks = match root.get("benchmarks") {
            None | Some(Value::Null) => return,
            Some(Value::Object(map)) => map,
            Some(other) => {
                self.add_error(
                    "benchmarks",
                    &format!("Expected an object of milestone timings, found {}", type_name(other)),
                );
                return;
            }
        };

        for (name, value) in benchmarks {
            let path = format!("benchmarks.{name}");
            match value {
                Value::Null => {
                    self.add_warning(&path, "Benchmark has no value and will be ignored");
                }
                Value::Number(n) => match n.as_f64() {
                    Some(seconds) if seconds >= 0.0 => {}
                    _ => self.add_error(
                        &path,
                        &format!("Benchmark must be a non-negative number of seconds, found {n}"),
                    ),
                },
                other => self.add_error(
                    &path,
                    &format!(
                        "Benchmark must be a non-negative number of seconds, found {}",
                        type_name(other)
                    ),
                ),
            }
        }
    }

    // ========================================================================
    // Decision points
    // ========================================================================

    fn validate_decision_points(&mut self, root: &Map<String, Value>) {
        let Some(points) = self.optional_array(root, "decision_points", "decision_points") else {
            return;
        };
        for (idx, point) in points.iter().enumerate() {
            let path = format!("decision_points[{idx}]");
            let Some(point) = point.as_object() else {
                self.add_error(&path, "Decision point must be an object");
                continue;
            };
            let trigger_path = format!("{path}.trigger");
            if let Some(trigger) = self.require_string(point, "trigger", &trigger_path) {
                if trigger.trim().is_empty() {
                    self.add_error(&trigger_path, "Trigger cannot be empty");
                }
            }
            self.require_string(point, "adaptation", &format!("{path}.adaptation"));
            self.optional_string(point, "alternative", &format!("{path}.alternative"));

            for field in ["adaptation_match", "alternative_match"] {
                if let Some(pattern) = point.get(field).filter(|v| !v.is_null()) {
                    self.validate_response_pattern(pattern, &format!("{path}.{field}"));
                }
            }
        }
    }

    fn validate_response_pattern(&mut self, pattern: &Value, path: &str) {
        let Some(pattern) = pattern.as_object() else {
            self.add_error(path, "Response pattern must be an object with 'actions'");
            return;
        };

        match pattern.get("within_seconds") {
            None | Some(Value::Null) => {}
            Some(window) => match window.as_f64() {
                Some(seconds) if seconds > 0.0 => {}
                _ => self.add_error(
                    &format!("{path}.within_seconds"),
                    &format!("Window must be a positive number of seconds, found {}", compact(window)),
                ),
            },
        }

        let actions_path = format!("{path}.actions");
        let actions = match pattern.get("actions") {
            Some(Value::Array(actions)) => actions,
            None | Some(Value::Null) => {
                self.add_error(&actions_path, "Missing required field 'actions'");
                return;
            }
            Some(other) => {
                self.add_error(
                    &actions_path,
                    &format!("Expected an array of event matchers, found {}", type_name(other)),
                );
                return;
            }
        };
        if actions.is_empty() {
            self.add_error(&actions_path, "Response pattern must list at least one action");
        }
        for (idx, matcher) in actions.iter().enumerate() {
            self.validate_event_matcher(matcher, &format!("{actions_path}[{idx}]"));
        }
    }

    fn validate_event_matcher(&mut self, matcher: &Value, path: &str) {
        let Some(matcher) = matcher.as_object() else {
            self.add_error(path, "Event matcher must be an object with 'type'");
            return;
        };
        let type_path = format!("{path}.type");
        if let Some(kind) = self.require_string(matcher, "type", &type_path) {
            if kind.trim().is_empty() {
                self.add_error(&type_path, "Event type cannot be empty");
            }
        }
        let subject_path = format!("{path}.subject");
        if let Some(subject) = self.optional_string(matcher, "subject", &subject_path) {
            if let Err(e) = SubjectMatcher::parse(subject) {
                self.add_error(&subject_path, &e);
            }
        }
        match matcher.get("count") {
            None | Some(Value::Null) => {}
            Some(count) => {
                let valid = count
                    .as_u64()
                    .is_some_and(|n| n > 0 && u32::try_from(n).is_ok());
                if !valid {
                    self.add_error(
                        &format!("{path}.count"),
                        &format!("Count must be a positive integer, found {}", compact(count)),
                    );
                }
            }
        }
    }

    // ========================================================================
    // Field helpers
    // ========================================================================

    /// Requires a string field, recording an error if missing or mistyped.
    fn require_string<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        field: &str,
        path: &str,
    ) -> Option<&'a str> {
        match obj.get(field) {
            None | Some(Value::Null) => {
                self.add_error(path, &format!("Missing required field '{field}'"));
                None
            }
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                self.add_error(
                    path,
                    &format!("Expected a string, found {}", type_name(other)),
                );
                None
            }
        }
    }

    fn optional_string<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        field: &str,
        path: &str,
    ) -> Option<&'a str> {
        match obj.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                self.add_error(
                    path,
                    &format!("Expected a string, found {}", type_name(other)),
                );
                None
            }
        }
    }

    fn optional_array<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        field: &str,
        path: &str,
    ) -> Option<&'a Vec<Value>> {
        match obj.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items),
            Some(other) => {
                self.add_error(
                    path,
                    &format!("Expected an array, found {}", type_name(other)),
                );
                None
            }
        }
    }

    fn optional_string_list(&mut self, obj: &Map<String, Value>, field: &str, path: &str) {
        let Some(items) = self.optional_array(obj, field, path) else {
            return;
        };
        for (idx, item) in items.iter().enumerate() {
            if !item.is_string() {
                self.add_error(
                    &format!("{path}[{idx}]"),
                    &format!("Expected a string, found {}", type_name(item)),
                );
            }
        }
    }

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Renders a value for an error message, truncated to keep messages short.
fn compact(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 40 {
        let head: String = text.chars().take(37).collect();
        format!("{head}...")
    } else {
        text
    }
}

// ============================================================================
// Tests
// ============================================================================
