//! Decision point evaluation
//!
//! Decision points are game-wide: the whole timeline is scanned for the first
//! `trigger` event naming the condition, and the player's response is read
//! from the events that follow it within the pattern's window.

use serde::Serialize;
use tracing::debug;

use crate::rubric::schema::{DecisionPoint, ResponsePattern};
use crate::telemetry::event::{EventKind, GameEvent, canonical_name, format_clock};

/// How the player handled a decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// The trigger never occurred; excluded from scoring
    NotApplicable,
    /// The recommended response followed the trigger
    FollowedAdaptation,
    /// The fallback response followed the trigger
    FollowedAlternative,
    /// Neither response followed the trigger
    Missed,
    /// Triggered, but the rubric gives no checkable response
    Unscored,
}

impl DecisionOutcome {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotApplicable => "not_applicable",
            Self::FollowedAdaptation => "followed_adaptation",
            Self::FollowedAlternative => "followed_alternative",
            Self::Missed => "missed",
            Self::Unscored => "unscored",
        }
    }

    /// Returns `true` for either followed outcome.
    #[must_use]
    pub const fn is_followed(self) -> bool {
        matches!(self, Self::FollowedAdaptation | Self::FollowedAlternative)
    }
}

/// Result for one decision point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    /// Position in the rubric
    pub index: usize,
    /// Trigger condition identifier
    pub trigger: String,
    /// When the trigger was observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<f64>,
    /// Outcome
    pub outcome: DecisionOutcome,
    /// Human-readable account of what was checked
    pub explanation: String,
}

/// Evaluates one decision point against the full timeline.
#[must_use]
pub fn evaluate_decision(index: usize, point: &DecisionPoint, events: &[GameEvent]) -> DecisionResult {
    let trigger = canonical_name(point.trigger());
    let found = events
        .iter()
        .position(|e| e.is(&EventKind::Trigger, &trigger));

    let Some(position) = found else {
        return DecisionResult {
            index,
            trigger,
            triggered_at: None,
            outcome: DecisionOutcome::NotApplicable,
            explanation: "trigger never observed".to_string(),
        };
    };

    let at = events[position].timestamp;
    let after = &events[position + 1..];

    let adaptation = point
        .adaptation_match()
        .filter(|pattern| followed(pattern, at, after));
    let alternative = point
        .alternative_match()
        .filter(|pattern| followed(pattern, at, after));
    let checkable = point.adaptation_match().is_some() || point.alternative_match().is_some();

    let (outcome, explanation) = match (adaptation, alternative) {
        (Some(pattern), _) => (
            DecisionOutcome::FollowedAdaptation,
            format!("adaptation observed within {}s", pattern.within_seconds),
        ),
        (None, Some(pattern)) => (
            DecisionOutcome::FollowedAlternative,
            format!("alternative observed within {}s", pattern.within_seconds),
        ),
        (None, None) if !checkable => (
            DecisionOutcome::Unscored,
            "no response pattern to check".to_string(),
        ),
        (None, None) => (DecisionOutcome::Missed, missed_explanation(point)),
    };

    debug!(
        trigger = %trigger,
        at = %format_clock(at),
        outcome = outcome.as_str(),
        "evaluated decision point"
    );

    DecisionResult {
        index,
        trigger,
        triggered_at: Some(at),
        outcome,
        explanation,
    }
}

/// Tests a response pattern against the events after a trigger at `at`.
fn followed(pattern: &ResponsePattern, at: f64, after: &[GameEvent]) -> bool {
    let limit = at + pattern.within_seconds;
    let window = &after[..after.partition_point(|e| e.timestamp <= limit)];
    pattern
        .actions
        .iter()
        .all(|matcher| matcher.satisfied_by(window))
}

fn missed_explanation(point: &DecisionPoint) -> String {
    let expected: Vec<String> = point
        .adaptation_match()
        .into_iter()
        .chain(point.alternative_match())
        .map(|pattern| {
            let actions: Vec<String> = pattern.actions.iter().map(|m| m.describe()).collect();
            format!("{} within {}s", actions.join(" + "), pattern.within_seconds)
        })
        .collect();
    format!("expected {}", expected.join(" or "))
}

/// Share of triggered, checkable decision points that were followed.
///
/// `None` when no decision point was both triggered and checkable.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decision_score(results: &[DecisionResult]) -> Option<f64> {
    let followed = results.iter().filter(|r| r.outcome.is_followed()).count();
    let missed = results
        .iter()
        .filter(|r| r.outcome == DecisionOutcome::Missed)
        .count();
    let total = followed + missed;
    (total > 0).then(|| followed as f64 / total as f64)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(ts: f64, kind: EventKind, subject: &str) -> GameEvent {
        GameEvent {
            timestamp: ts,
            kind,
            subject: Some(subject.to_string()),
            value: None,
        }
    }

    fn pressure_point() -> DecisionPoint {
        serde_json::from_value(json!({
            "trigger": "opponent_early_pressure_detected",
            "adaptation": "Wall and add spearmen",
            "alternative": "Tower the gold",
            "adaptation_match": {
                "actions": [
                    {"type": "building_completed", "subject": "palisade*"},
                    {"type": "unit_produced", "subject": "spearman", "count": 2}
                ],
                "within_seconds": 90
            },
            "alternative_match": {
                "actions": [{"type": "building_completed", "subject": "outpost"}]
            }
        }))
        .unwrap()
    }

    #[test]
    fn absent_trigger_is_not_applicable() {
        let events = vec![ev(300.0, EventKind::AgeUp, "feudal_age")];
        let result = evaluate_decision(0, &pressure_point(), &events);
        assert_eq!(result.outcome, DecisionOutcome::NotApplicable);
        assert_eq!(result.triggered_at, None);
    }

    #[test]
    fn adaptation_within_window_is_followed() {
        let events = vec![
            ev(240.0, EventKind::Trigger, "opponent_early_pressure_detected"),
            ev(260.0, EventKind::BuildingCompleted, "palisade_wall"),
            ev(280.0, EventKind::UnitProduced, "spearman"),
            ev(300.0, EventKind::UnitProduced, "spearman"),
        ];
        let result = evaluate_decision(0, &pressure_point(), &events);
        assert_eq!(result.outcome, DecisionOutcome::FollowedAdaptation);
        assert_eq!(result.triggered_at, Some(240.0));
    }

    #[test]
    fn late_adaptation_falls_back_to_alternative() {
        let events = vec![
            ev(240.0, EventKind::Trigger, "opponent_early_pressure_detected"),
            ev(260.0, EventKind::BuildingCompleted, "palisade_wall"),
            ev(280.0, EventKind::UnitProduced, "spearman"),
            ev(290.0, EventKind::BuildingCompleted, "outpost"),
            // Second spearman lands after the 90s window
            ev(400.0, EventKind::UnitProduced, "spearman"),
        ];
        let result = evaluate_decision(0, &pressure_point(), &events);
        assert_eq!(result.outcome, DecisionOutcome::FollowedAlternative);
    }

    #[test]
    fn no_response_is_missed() {
        let events = vec![
            ev(240.0, EventKind::Trigger, "opponent_early_pressure_detected"),
            ev(260.0, EventKind::UnitProduced, "villager"),
        ];
        let result = evaluate_decision(0, &pressure_point(), &events);
        assert_eq!(result.outcome, DecisionOutcome::Missed);
        assert!(result.explanation.contains("1x building_completed palisade*"));
        assert!(result.explanation.contains(" or "));
    }

    #[test]
    fn events_before_trigger_do_not_count() {
        let events = vec![
            ev(100.0, EventKind::BuildingCompleted, "outpost"),
            ev(240.0, EventKind::Trigger, "opponent_early_pressure_detected"),
        ];
        let result = evaluate_decision(0, &pressure_point(), &events);
        assert_eq!(result.outcome, DecisionOutcome::Missed);
    }

    #[test]
    fn trigger_id_is_canonicalized() {
        let point: DecisionPoint = serde_json::from_value(json!({
            "trigger": "Opponent Early Pressure Detected",
            "adaptation": "Wall up"
        }))
        .unwrap();
        let events = vec![ev(240.0, EventKind::Trigger, "opponent_early_pressure_detected")];
        let result = evaluate_decision(0, &point, &events);
        assert_eq!(result.outcome, DecisionOutcome::Unscored);
        assert_eq!(result.trigger, "opponent_early_pressure_detected");
    }

    #[test]
    fn score_ignores_not_applicable_and_unscored() {
        let result = |outcome| DecisionResult {
            index: 0,
            trigger: "t".to_string(),
            triggered_at: None,
            outcome,
            explanation: String::new(),
        };
        let results = [
            result(DecisionOutcome::FollowedAdaptation),
            result(DecisionOutcome::FollowedAlternative),
            result(DecisionOutcome::Missed),
            result(DecisionOutcome::NotApplicable),
            result(DecisionOutcome::Unscored),
        ];
        let score = decision_score(&results).unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(decision_score(&results[3..]), None);
    }
}
