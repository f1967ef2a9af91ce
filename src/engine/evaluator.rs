//! Game evaluation entry point.
//!
//! [`Evaluator`] runs the whole pipeline over a validated rubric and a
//! normalized timeline: phase matching, per-phase criteria, benchmarks,
//! decision points, then aggregation. It holds configuration only and never
//! fails; everything that can go wrong is caught while loading the inputs.

use tracing::{debug, info};

use crate::rubric::schema::Rubric;
use crate::telemetry::normalizer::Timeline;

use super::benchmark::{PaceThresholds, score_benchmarks};
use super::criteria::evaluate_phase;
use super::decision::evaluate_decision;
use super::report::{EvaluationReport, aggregate};
use super::segment::match_phases;

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineConfig {
    /// Benchmark pace windows
    pub pace: PaceThresholds,
}

/// Evaluates games against rubrics.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EngineConfig,
}

impl Evaluator {
    /// Creates an evaluator with the given configuration.
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates one game.
    ///
    /// Identical inputs always produce an identical report.
    #[must_use]
    pub fn evaluate(&self, rubric: &Rubric, timeline: &Timeline) -> EvaluationReport {
        let events = timeline.events();

        let segments = match_phases(rubric.phases(), timeline);
        let phases: Vec<_> = rubric
            .phases()
            .iter()
            .zip(&segments)
            .map(|(phase, segment)| evaluate_phase(phase, segment, events))
            .collect();

        let benchmarks = score_benchmarks(rubric.benchmarks(), events, &self.config.pace);
        debug!(count = benchmarks.len(), "scored benchmarks");

        let decisions: Vec<_> = rubric
            .decision_points()
            .iter()
            .enumerate()
            .map(|(index, point)| evaluate_decision(index, point, events))
            .collect();

        let report = aggregate(rubric, timeline, phases, benchmarks, decisions);
        info!(
            rubric = %report.rubric_id,
            overall = ?report.overall_score,
            decisions = ?report.decision_score,
            violations = report.critical_violations.len(),
            findings = report.findings.len(),
            "evaluation complete"
        );
        report
    }
}

/// Evaluates one game with the default configuration.
#[must_use]
pub fn evaluate(rubric: &Rubric, timeline: &Timeline) -> EvaluationReport {
    Evaluator::default().evaluate(rubric, timeline)
}

// ============================================================================
// Tests
// ============================================================================
