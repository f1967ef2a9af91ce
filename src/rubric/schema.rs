//! Rubric document types
//!
//! The in-memory rubric is read-only: fields are private and exposed through
//! accessors. A [`Rubric`] can only be obtained by parsing a document that
//! passes [`Validator`](super::validation::Validator), so every instance
//! upholds the schema invariants (non-empty phases, ordered duration ranges,
//! non-negative benchmarks).

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::telemetry::pattern::EventMatcher;

// ============================================================================
// Enumerations
// ============================================================================

/// Skill level a rubric targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// New players
    Beginner,
    /// Players comfortable with the basics
    Intermediate,
    /// Experienced ladder players
    Advanced,
    /// Top-level play
    Expert,
}

impl Difficulty {
    /// All accepted wire values.
    pub const NAMES: [&'static str; 4] = ["beginner", "intermediate", "advanced", "expert"];
}

/// How much an item matters to the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Deviating breaks the strategy
    Critical,
    /// Expected but recoverable
    Recommended,
    /// Nice to have
    Optional,
}

impl Importance {
    /// All accepted wire values.
    pub const NAMES: [&'static str; 3] = ["critical", "recommended", "optional"];

    const fn recommended() -> Self {
        Self::Recommended
    }

    const fn critical() -> Self {
        Self::Critical
    }

    const fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }
}

// ============================================================================
// Rubric
// ============================================================================

/// A validated build-order rubric.
///
/// Deserializing a `Rubric` runs the full validator, so a rubric nested in
/// another serde type is checked the same way as one built with
/// [`Rubric::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Rubric(RubricDocument);

/// Field layout of a rubric document, deserialized after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RubricDocument {
    id: String,
    title: String,
    #[serde(alias = "source_url")]
    source: String,
    difficulty: Difficulty,
    archetype: String,
    #[serde(default)]
    civilizations: BTreeSet<String>,
    #[serde(default)]
    map_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overview: Option<String>,
    phases: Vec<Phase>,
    #[serde(default)]
    benchmarks: Benchmarks,
    #[serde(default)]
    decision_points: Vec<DecisionPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    key_insights: Vec<String>,
}

impl Rubric {
    pub(crate) const fn from_document(document: RubricDocument) -> Self {
        Self(document)
    }

    /// Rubric identifier (library file stem).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.0.title
    }

    /// Where the rubric was extracted from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.0.source
    }

    /// Target skill level.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.0.difficulty
    }

    /// Strategy archetype (e.g. `fast_castle`).
    #[must_use]
    pub fn archetype(&self) -> &str {
        &self.0.archetype
    }

    /// Civilizations the rubric applies to; empty means any.
    #[must_use]
    pub const fn civilizations(&self) -> &BTreeSet<String> {
        &self.0.civilizations
    }

    /// Map types the rubric applies to; empty means any.
    #[must_use]
    pub const fn map_types(&self) -> &BTreeSet<String> {
        &self.0.map_types
    }

    /// Free-text overview.
    #[must_use]
    pub fn overview(&self) -> Option<&str> {
        self.0.overview.as_deref()
    }

    /// Phases in strategy order; never empty.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.0.phases
    }

    /// Milestone benchmarks.
    #[must_use]
    pub const fn benchmarks(&self) -> &Benchmarks {
        &self.0.benchmarks
    }

    /// Conditional adaptation rules.
    #[must_use]
    pub fn decision_points(&self) -> &[DecisionPoint] {
        &self.0.decision_points
    }

    /// Free-text insights from the tutorial.
    #[must_use]
    pub fn key_insights(&self) -> &[String] {
        &self.0.key_insights
    }
}

impl<'de> Deserialize<'de> for Rubric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Phase
// ============================================================================

/// A named stage of the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    duration_range: DurationRange,
    #[serde(default)]
    key_actions: Vec<KeyAction>,
    #[serde(default)]
    success_criteria: Vec<SuccessCriterion>,
    #[serde(default)]
    common_mistakes: Vec<CommonMistake>,
}

impl Phase {
    /// Phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Expected window for the phase to end in.
    #[must_use]
    pub const fn duration_range(&self) -> DurationRange {
        self.duration_range
    }

    /// Key actions in order.
    #[must_use]
    pub fn key_actions(&self) -> &[KeyAction] {
        &self.key_actions
    }

    /// Success criteria in order.
    #[must_use]
    pub fn success_criteria(&self) -> &[SuccessCriterion] {
        &self.success_criteria
    }

    /// Common mistakes in order.
    #[must_use]
    pub fn common_mistakes(&self) -> &[CommonMistake] {
        &self.common_mistakes
    }

    /// Number of critical key actions; the phase's aggregation weight.
    #[must_use]
    pub fn critical_action_count(&self) -> usize {
        self.key_actions
            .iter()
            .filter(|a| a.importance == Importance::Critical)
            .count()
    }
}

/// Seconds-from-start window `[min, max]`, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct DurationRange {
    min: f64,
    max: f64,
}

impl DurationRange {
    /// Creates a range. Callers must ensure `0 <= min <= max`.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Lower bound in seconds.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound in seconds.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` if `t` lies within the closed range.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        self.min <= t && t <= self.max
    }
}

impl From<[f64; 2]> for DurationRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<DurationRange> for [f64; 2] {
    fn from(range: DurationRange) -> Self {
        [range.min, range.max]
    }
}

// ============================================================================
// Phase items
// ============================================================================

/// Reference into the predicate registry.
///
/// Flattened into key actions, criteria and mistakes as `predicate` and
/// `params`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredicateRef {
    /// Registry identifier; absent for free-text items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,

    /// Predicate parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

/// An action the strategy calls for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAction {
    action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    timing: String,
    #[serde(default = "Importance::recommended")]
    importance: Importance,
    #[serde(flatten)]
    check: PredicateRef,
}

impl KeyAction {
    /// Action text.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Timing tag (e.g. `"0:00-2:30"` or `"before feudal"`).
    #[must_use]
    pub fn timing(&self) -> &str {
        &self.timing
    }

    /// Importance tag.
    #[must_use]
    pub const fn importance(&self) -> Importance {
        self.importance
    }

    /// Predicate used to check the action.
    #[must_use]
    pub const fn check(&self) -> &PredicateRef {
        &self.check
    }
}

/// A condition a well-executed phase satisfies.
///
/// Accepts either a bare string or an object with `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CriterionRepr")]
pub struct SuccessCriterion {
    description: String,
    #[serde(skip_serializing_if = "Importance::is_critical")]
    importance: Importance,
    #[serde(flatten)]
    check: PredicateRef,
}

impl SuccessCriterion {
    /// Criterion text.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Importance tag.
    #[must_use]
    pub const fn importance(&self) -> Importance {
        self.importance
    }

    /// Predicate used to check the criterion.
    #[must_use]
    pub const fn check(&self) -> &PredicateRef {
        &self.check
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CriterionRepr {
    Text(String),
    Full {
        description: String,
        #[serde(default = "Importance::critical")]
        importance: Importance,
        #[serde(flatten)]
        check: PredicateRef,
    },
}

impl From<CriterionRepr> for SuccessCriterion {
    fn from(repr: CriterionRepr) -> Self {
        match repr {
            CriterionRepr::Text(description) => Self {
                description,
                importance: Importance::Critical,
                check: PredicateRef::default(),
            },
            CriterionRepr::Full {
                description,
                importance,
                check,
            } => Self {
                description,
                importance,
                check,
            },
        }
    }
}

/// A frequent error when executing the phase.
///
/// Accepts either a bare string or an object with `mistake`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MistakeRepr")]
pub struct CommonMistake {
    mistake: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    consequence: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    fix: String,
    #[serde(skip_serializing_if = "Importance::is_critical")]
    importance: Importance,
    #[serde(flatten)]
    check: PredicateRef,
}

impl CommonMistake {
    /// Mistake text.
    #[must_use]
    pub fn mistake(&self) -> &str {
        &self.mistake
    }

    /// What the mistake costs.
    #[must_use]
    pub fn consequence(&self) -> &str {
        &self.consequence
    }

    /// How to correct it.
    #[must_use]
    pub fn fix(&self) -> &str {
        &self.fix
    }

    /// Importance tag.
    #[must_use]
    pub const fn importance(&self) -> Importance {
        self.importance
    }

    /// Predicate that detects the mistake.
    #[must_use]
    pub const fn check(&self) -> &PredicateRef {
        &self.check
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MistakeRepr {
    Text(String),
    Full {
        mistake: String,
        #[serde(default)]
        consequence: String,
        #[serde(default)]
        fix: String,
        #[serde(default = "Importance::critical")]
        importance: Importance,
        #[serde(flatten)]
        check: PredicateRef,
    },
}

impl From<MistakeRepr> for CommonMistake {
    fn from(repr: MistakeRepr) -> Self {
        match repr {
            MistakeRepr::Text(mistake) => Self {
                mistake,
                consequence: String::new(),
                fix: String::new(),
                importance: Importance::Critical,
                check: PredicateRef::default(),
            },
            MistakeRepr::Full {
                mistake,
                consequence,
                fix,
                importance,
                check,
            } => Self {
                mistake,
                consequence,
                fix,
                importance,
                check,
            },
        }
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Named milestone to expected second-offset.
///
/// Keeps document order for reporting; equality ignores order. `null`
/// values are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks(
    #[serde(deserialize_with = "deserialize_benchmarks")] IndexMap<String, f64>,
);

impl Benchmarks {
    /// Expected offset for a milestone.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Iterates in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of benchmarks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no benchmarks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn deserialize_benchmarks<'de, D>(deserializer: D) -> Result<IndexMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, Option<f64>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect())
}

// ============================================================================
// Decision points
// ============================================================================

/// A conditional adaptation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    trigger: String,
    adaptation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    alternative: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    adaptation_match: Option<ResponsePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alternative_match: Option<ResponsePattern>,
}

impl DecisionPoint {
    /// Condition identifier matched against `trigger` events.
    #[must_use]
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Recommended response text.
    #[must_use]
    pub fn adaptation(&self) -> &str {
        &self.adaptation
    }

    /// Fallback response text.
    #[must_use]
    pub fn alternative(&self) -> &str {
        &self.alternative
    }

    /// Machine-checkable form of the adaptation.
    #[must_use]
    pub const fn adaptation_match(&self) -> Option<&ResponsePattern> {
        self.adaptation_match.as_ref()
    }

    /// Machine-checkable form of the alternative.
    #[must_use]
    pub const fn alternative_match(&self) -> Option<&ResponsePattern> {
        self.alternative_match.as_ref()
    }
}

/// Actions that must all follow a trigger within a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePattern {
    /// Every matcher must be satisfied (AND)
    pub actions: Vec<EventMatcher>,

    /// Window after the trigger, in seconds
    #[serde(default = "default_response_window")]
    pub within_seconds: f64,
}

/// Default window for decision responses.
pub const DEFAULT_RESPONSE_WINDOW: f64 = 120.0;

const fn default_response_window() -> f64 {
    DEFAULT_RESPONSE_WINDOW
}

// ============================================================================
// Tests
// ============================================================================
