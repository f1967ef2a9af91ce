//! Report aggregation
//!
//! Merges phase, benchmark and decision results into one ordered
//! [`EvaluationReport`]. The report holds no wall-clock data and only ordered
//! collections, so identical inputs serialize to identical JSON.

use serde::Serialize;

use crate::rubric::schema::{Importance, Rubric};
use crate::telemetry::game_summary::GameInfo;
use crate::telemetry::normalizer::{DroppedRecord, Timeline};

use super::benchmark::{BenchmarkResult, BenchmarkStatus, BenchmarkUnit};
use super::criteria::{ItemResult, ItemStatus, PhaseResult};
use super::decision::{DecisionOutcome, DecisionResult, decision_score};
use super::predicate::REGISTRY_VERSION;

// ============================================================================
// Report types
// ============================================================================

/// Complete evaluation of one game against one rubric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Rubric identifier
    pub rubric_id: String,
    /// Rubric title
    pub rubric_title: String,
    /// The evaluated game, when the telemetry identifies it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<GameInfo>,
    /// Predicate registry version the items were checked with
    pub predicate_registry_version: u32,
    /// Weighted mean of scored phase scores; `None` if no phase was scorable
    pub overall_score: Option<f64>,
    /// Share of checkable, triggered decision points that were followed
    pub decision_score: Option<f64>,
    /// Per-phase results in rubric order
    pub phases: Vec<PhaseResult>,
    /// Benchmark results in rubric order
    pub benchmarks: Vec<BenchmarkResult>,
    /// Decision point results in rubric order
    pub decision_points: Vec<DecisionResult>,
    /// Violated critical items by phase, then severity
    pub critical_violations: Vec<Violation>,
    /// Non-fatal observations about the evaluation
    pub findings: Vec<Finding>,
}

/// Severity of a critical violation; declaration order is sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A critical mistake was detected
    DetectedMistake,
    /// A critical success criterion was not met
    ViolatedCriterion,
    /// A critical key action was not performed
    MissedKeyAction,
}

/// A violated critical-importance item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Index of the phase
    pub phase_index: usize,
    /// Phase name
    pub phase: String,
    /// What kind of item was violated
    pub kind: ViolationKind,
    /// Rubric text of the item
    pub text: String,
    /// Observed values
    pub explanation: String,
}

/// Which list a rubric item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// `key_actions`
    KeyAction,
    /// `success_criteria`
    SuccessCriterion,
    /// `common_mistakes`
    CommonMistake,
}

/// A non-fatal observation about the evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// No anchor event fell inside the phase's range
    BoundaryInferred {
        /// Index of the phase
        phase_index: usize,
        /// Phase name
        phase: String,
        /// Where the boundary was placed
        boundary: f64,
    },
    /// A rubric item could not be scored
    UnscoredItem {
        /// Index of the phase
        phase_index: usize,
        /// Which list the item is in
        category: ItemCategory,
        /// Index within that list
        index: usize,
        /// Why it was not scored
        reason: String,
    },
    /// A triggered decision point had no checkable response
    UnscoredDecision {
        /// Index of the decision point
        index: usize,
        /// Trigger identifier
        trigger: String,
    },
    /// Malformed or untimed telemetry records were dropped
    DroppedEvents {
        /// The dropped records
        records: Vec<DroppedRecord>,
    },
    /// Identical duplicate events were collapsed
    CollapsedDuplicates {
        /// How many were removed
        count: usize,
    },
    /// A benchmark milestone was never reached
    BenchmarkNotReached {
        /// Milestone name
        name: String,
        /// What `expected` measures
        unit: BenchmarkUnit,
        /// Expected value
        expected: f64,
    },
}

// ============================================================================
// Aggregation
// ============================================================================

/// Assembles the final report.
#[must_use]
pub fn aggregate(
    rubric: &Rubric,
    timeline: &Timeline,
    phases: Vec<PhaseResult>,
    benchmarks: Vec<BenchmarkResult>,
    decision_points: Vec<DecisionResult>,
) -> EvaluationReport {
    let overall_score = overall_score(&phases);
    let critical_violations = critical_violations(&phases);
    let findings = findings(timeline, &phases, &benchmarks, &decision_points);

    EvaluationReport {
        rubric_id: rubric.id().to_string(),
        rubric_title: rubric.title().to_string(),
        game: timeline.game().cloned(),
        predicate_registry_version: REGISTRY_VERSION,
        overall_score,
        decision_score: decision_score(&decision_points),
        phases,
        benchmarks,
        decision_points,
        critical_violations,
        findings,
    }
}

/// Weighted mean of scored phases, weighted by critical key action count.
#[allow(clippy::cast_precision_loss)]
fn overall_score(phases: &[PhaseResult]) -> Option<f64> {
    let (weighted, total) = phases
        .iter()
        .filter_map(|p| p.score.map(|score| (score, p.weight as f64)))
        .fold((0.0, 0.0), |(weighted, total), (score, weight)| {
            (weighted + score * weight, total + weight)
        });
    (total > 0.0).then(|| weighted / total)
}

fn critical_violations(phases: &[PhaseResult]) -> Vec<Violation> {
    let mut violations: Vec<(usize, ViolationKind, usize, &ItemResult)> = Vec::new();

    for (phase_index, phase) in phases.iter().enumerate() {
        let lists = [
            (&phase.common_mistakes, ItemStatus::Detected, ViolationKind::DetectedMistake),
            (&phase.success_criteria, ItemStatus::Violated, ViolationKind::ViolatedCriterion),
            (&phase.key_actions, ItemStatus::Violated, ViolationKind::MissedKeyAction),
        ];
        for (items, failing, kind) in lists {
            violations.extend(
                items
                    .iter()
                    .filter(|item| item.importance == Importance::Critical && item.status == failing)
                    .map(|item| (phase_index, kind, item.index, item)),
            );
        }
    }

    violations.sort_by_key(|(phase_index, kind, index, _)| (*phase_index, *kind, *index));
    violations
        .into_iter()
        .map(|(phase_index, kind, _, item)| Violation {
            phase_index,
            phase: phases[phase_index].name.clone(),
            kind,
            text: item.text.clone(),
            explanation: item.explanation.clone(),
        })
        .collect()
}

fn findings(
    timeline: &Timeline,
    phases: &[PhaseResult],
    benchmarks: &[BenchmarkResult],
    decisions: &[DecisionResult],
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if !timeline.dropped().is_empty() {
        findings.push(Finding::DroppedEvents {
            records: timeline.dropped().to_vec(),
        });
    }
    if timeline.collapsed() > 0 {
        findings.push(Finding::CollapsedDuplicates {
            count: timeline.collapsed(),
        });
    }

    for (phase_index, phase) in phases.iter().enumerate() {
        if phase.segment.boundary_inferred {
            findings.push(Finding::BoundaryInferred {
                phase_index,
                phase: phase.name.clone(),
                boundary: phase.segment.boundary,
            });
        }
        let lists = [
            (&phase.key_actions, ItemCategory::KeyAction),
            (&phase.success_criteria, ItemCategory::SuccessCriterion),
            (&phase.common_mistakes, ItemCategory::CommonMistake),
        ];
        for (items, category) in lists {
            for item in items.iter().filter(|i| i.status == ItemStatus::Unscored) {
                findings.push(Finding::UnscoredItem {
                    phase_index,
                    category,
                    index: item.index,
                    reason: item.explanation.clone(),
                });
            }
        }
    }

    for result in benchmarks {
        if result.status == BenchmarkStatus::NotReached {
            findings.push(Finding::BenchmarkNotReached {
                name: result.name.clone(),
                unit: result.unit,
                expected: result.expected,
            });
        }
    }

    for result in decisions {
        if result.outcome == DecisionOutcome::Unscored {
            findings.push(Finding::UnscoredDecision {
                index: result.index,
                trigger: result.trigger.clone(),
            });
        }
    }

    findings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::segment::PhaseSegment;

    fn item(index: usize, importance: Importance, status: ItemStatus) -> ItemResult {
        ItemResult {
            index,
            text: format!("item {index}"),
            importance,
            predicate: None,
            status,
            explanation: String::new(),
        }
    }

    fn phase(index: usize, score: Option<f64>, weight: usize) -> PhaseResult {
        PhaseResult {
            name: format!("phase {index}"),
            segment: PhaseSegment {
                phase_index: index,
                start: 0.0,
                end: 0.0,
                boundary: 0.0,
                boundary_inferred: false,
                lo: 0,
                hi: 0,
            },
            score,
            weight,
            key_actions: Vec::new(),
            success_criteria: Vec::new(),
            common_mistakes: Vec::new(),
        }
    }

    #[test]
    fn overall_score_is_weighted_by_critical_actions() {
        let phases = vec![phase(0, Some(1.0), 3), phase(1, Some(0.0), 1)];
        assert_eq!(overall_score(&phases), Some(0.75));
    }

    #[test]
    fn unscored_phases_are_excluded_from_overall() {
        let phases = vec![phase(0, None, 5), phase(1, Some(0.5), 1)];
        assert_eq!(overall_score(&phases), Some(0.5));
        assert_eq!(overall_score(&[phase(0, None, 1)]), None);
    }

    #[test]
    fn violations_sorted_by_phase_then_severity() {
        let mut first = phase(0, Some(0.0), 1);
        first.key_actions = vec![item(0, Importance::Critical, ItemStatus::Violated)];
        first.success_criteria = vec![
            item(0, Importance::Critical, ItemStatus::Violated),
            item(1, Importance::Recommended, ItemStatus::Violated),
        ];
        first.common_mistakes = vec![
            item(0, Importance::Critical, ItemStatus::NotDetected),
            item(1, Importance::Critical, ItemStatus::Detected),
        ];
        let mut second = phase(1, Some(0.0), 1);
        second.common_mistakes = vec![item(0, Importance::Critical, ItemStatus::Detected)];

        let violations = critical_violations(&[first, second]);
        let order: Vec<_> = violations
            .iter()
            .map(|v| (v.phase_index, v.kind, v.text.as_str()))
            .collect();
        assert_eq!(
            order,
            [
                (0, ViolationKind::DetectedMistake, "item 1"),
                (0, ViolationKind::ViolatedCriterion, "item 0"),
                (0, ViolationKind::MissedKeyAction, "item 0"),
                (1, ViolationKind::DetectedMistake, "item 0"),
            ]
        );
    }

    #[test]
    fn finding_serializes_with_kind_tag() {
        let finding = Finding::CollapsedDuplicates { count: 2 };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "collapsed_duplicates", "count": 2}));
    }
}
