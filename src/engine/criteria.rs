//! Criteria evaluation
//!
//! Checks a phase's key actions, success criteria and common mistakes
//! against its matched segment. Items without a usable predicate are kept in
//! the results as `unscored` with the reason.

use serde::Serialize;
use tracing::debug;

use crate::rubric::schema::{Importance, Phase, PredicateRef};
use crate::telemetry::event::GameEvent;

use super::predicate::{Predicate, SegmentView};
use super::segment::PhaseSegment;

/// Outcome of a single rubric item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Key action or criterion met
    Satisfied,
    /// Key action or criterion not met
    Violated,
    /// Mistake found in the game
    Detected,
    /// Mistake not found
    NotDetected,
    /// No usable predicate
    Unscored,
}

impl ItemStatus {
    /// Whether the item counts as passed; `None` if unscored.
    #[must_use]
    pub const fn passed(self) -> Option<bool> {
        match self {
            Self::Satisfied | Self::NotDetected => Some(true),
            Self::Violated | Self::Detected => Some(false),
            Self::Unscored => None,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Satisfied => "satisfied",
            Self::Violated => "violated",
            Self::Detected => "detected",
            Self::NotDetected => "not_detected",
            Self::Unscored => "unscored",
        }
    }
}

/// Whether a holding predicate is good or bad for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Requirement,
    Mistake,
}

/// Result for one key action, criterion or mistake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResult {
    /// Position within its list in the rubric
    pub index: usize,
    /// Rubric text of the item
    pub text: String,
    /// Importance tag
    pub importance: Importance,
    /// Predicate identifier, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    /// Outcome
    pub status: ItemStatus,
    /// Observed values, or why the item was not scored
    pub explanation: String,
}

/// Evaluation of one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseResult {
    /// Phase name
    pub name: String,
    /// Matched segment
    #[serde(flatten)]
    pub segment: PhaseSegment,
    /// Passed / scored items; `None` if no item could be scored
    pub score: Option<f64>,
    /// Aggregation weight (critical key actions, at least 1)
    pub weight: usize,
    /// Key action results
    pub key_actions: Vec<ItemResult>,
    /// Success criterion results
    pub success_criteria: Vec<ItemResult>,
    /// Common mistake results
    pub common_mistakes: Vec<ItemResult>,
}

impl PhaseResult {
    /// Iterates over every item in the phase.
    pub fn items(&self) -> impl Iterator<Item = &ItemResult> {
        self.key_actions
            .iter()
            .chain(&self.success_criteria)
            .chain(&self.common_mistakes)
    }
}

/// Evaluates one phase against its segment.
#[must_use]
pub fn evaluate_phase(phase: &Phase, segment: &PhaseSegment, timeline: &[GameEvent]) -> PhaseResult {
    let view = SegmentView {
        events: segment.events(timeline),
        timeline,
        start: segment.start,
        end: segment.end,
        window: phase.duration_range(),
    };

    let key_actions = phase
        .key_actions()
        .iter()
        .enumerate()
        .map(|(index, action)| {
            evaluate_item(
                index,
                action.action(),
                action.importance(),
                action.check(),
                Polarity::Requirement,
                &view,
            )
        })
        .collect();

    let success_criteria = phase
        .success_criteria()
        .iter()
        .enumerate()
        .map(|(index, criterion)| {
            evaluate_item(
                index,
                criterion.description(),
                criterion.importance(),
                criterion.check(),
                Polarity::Requirement,
                &view,
            )
        })
        .collect();

    let common_mistakes = phase
        .common_mistakes()
        .iter()
        .enumerate()
        .map(|(index, mistake)| {
            evaluate_item(
                index,
                mistake.mistake(),
                mistake.importance(),
                mistake.check(),
                Polarity::Mistake,
                &view,
            )
        })
        .collect();

    let mut result = PhaseResult {
        name: phase.name().to_string(),
        segment: segment.clone(),
        score: None,
        weight: phase.critical_action_count().max(1),
        key_actions,
        success_criteria,
        common_mistakes,
    };
    result.score = phase_score(&result);

    debug!(
        phase = phase.name(),
        score = ?result.score,
        weight = result.weight,
        "evaluated phase"
    );
    result
}

fn evaluate_item(
    index: usize,
    text: &str,
    importance: Importance,
    check: &PredicateRef,
    polarity: Polarity,
    view: &SegmentView<'_>,
) -> ItemResult {
    let (status, explanation) = match Predicate::bind(check) {
        Ok(predicate) => {
            let outcome = predicate.eval(view);
            let status = match (polarity, outcome.holds) {
                (Polarity::Requirement, true) => ItemStatus::Satisfied,
                (Polarity::Requirement, false) => ItemStatus::Violated,
                (Polarity::Mistake, true) => ItemStatus::Detected,
                (Polarity::Mistake, false) => ItemStatus::NotDetected,
            };
            (status, outcome.explanation)
        }
        Err(e) => (ItemStatus::Unscored, e.to_string()),
    };

    ItemResult {
        index,
        text: text.to_string(),
        importance,
        predicate: check.predicate.clone(),
        status,
        explanation,
    }
}

#[allow(clippy::cast_precision_loss)]
fn phase_score(result: &PhaseResult) -> Option<f64> {
    let (passed, scored) = result
        .items()
        .filter_map(|item| item.status.passed())
        .fold((0_usize, 0_usize), |(passed, scored), ok| {
            (passed + usize::from(ok), scored + 1)
        });
    (scored > 0).then(|| passed as f64 / scored as f64)
}

// ============================================================================
// Tests
// ============================================================================
