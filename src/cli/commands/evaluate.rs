//! `evaluate` command
//!
//! Loads a rubric and a telemetry file, runs the engine, and writes the
//! report as JSON or plain text.

use std::fmt::Write as _;

use tracing::{info, warn};

use crate::cli::args::{EvaluateArgs, OutputFormat};
use crate::engine::{
    BenchmarkUnit, EngineConfig, EvaluationReport, Evaluator, Finding, ItemCategory, ItemResult,
    ItemStatus, PaceThresholds, ViolationKind,
};
use crate::error::RubricateError;
use crate::rubric::RubricLoader;
use crate::telemetry::event::format_clock;
use crate::telemetry::{GameInfo, load_timeline};

/// Runs an evaluation.
///
/// # Errors
///
/// Returns an error if the windows are inconsistent, the rubric or
/// telemetry cannot be loaded, or the report cannot be written.
pub fn run(args: &EvaluateArgs) -> Result<(), RubricateError> {
    if args.slight_window < args.on_pace_window {
        return Err(RubricateError::Usage(format!(
            "--slight-window ({}) must not be smaller than --on-pace-window ({})",
            args.slight_window, args.on_pace_window
        )));
    }

    let loader = RubricLoader::with_library(&args.library);
    let loaded = loader.load(&args.rubric)?;
    for issue in &loaded.warnings {
        warn!(path = %issue.path, "{}", issue.message);
    }

    let timeline = load_timeline(&args.game_data)?;
    info!(
        events = timeline.len(),
        dropped = timeline.dropped().len(),
        collapsed = timeline.collapsed(),
        "normalized telemetry"
    );

    let evaluator = Evaluator::new(EngineConfig {
        pace: PaceThresholds {
            on_pace: args.on_pace_window,
            slight: args.slight_window,
        },
    });
    let report = evaluator.evaluate(&loaded.rubric, &timeline);

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Human => render_human(&report),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

// ============================================================================
// Human rendering
// ============================================================================

/// Renders a report as plain text.
#[must_use]
pub fn render_human(report: &EvaluationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{} ({})", report.rubric_title, report.rubric_id);
    if let Some(game) = &report.game {
        render_game(&mut out, game);
    }
    let _ = writeln!(
        out,
        "Overall score: {}   Decision score: {}",
        percent(report.overall_score),
        percent(report.decision_score)
    );

    out.push_str("\nPhases\n");
    for phase in &report.phases {
        let inferred = if phase.segment.boundary_inferred {
            " (boundary inferred)"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "  {}  {}-{}{}  score {}",
            phase.name,
            format_clock(phase.segment.start),
            format_clock(phase.segment.end),
            inferred,
            percent(phase.score)
        );
        for item in phase.items() {
            render_item(&mut out, item);
        }
    }

    if !report.benchmarks.is_empty() {
        out.push_str("\nBenchmarks\n");
        for result in &report.benchmarks {
            let actual = result
                .actual
                .map_or_else(|| "-".to_string(), |v| measure(result.unit, v));
            let delta = result.delta.map_or_else(String::new, |d| match result.unit {
                BenchmarkUnit::Seconds => format!("  {d:+}s"),
                BenchmarkUnit::Villagers => format!("  {d:+}"),
            });
            let at = result
                .sampled_at
                .map_or_else(String::new, |t| format!(" at {}", format_clock(t)));
            let _ = writeln!(
                out,
                "  {}  expected {}  actual {}{}{}  {}",
                result.name,
                measure(result.unit, result.expected),
                actual,
                at,
                delta,
                result.status
            );
        }
    }

    if !report.decision_points.is_empty() {
        out.push_str("\nDecision points\n");
        for result in &report.decision_points {
            let at = result
                .triggered_at
                .map_or_else(String::new, |t| format!(" at {}", format_clock(t)));
            let _ = writeln!(
                out,
                "  {}{}  {}  {}",
                result.trigger,
                at,
                result.outcome.as_str(),
                result.explanation
            );
        }
    }

    if !report.critical_violations.is_empty() {
        out.push_str("\nCritical violations\n");
        for violation in &report.critical_violations {
            let kind = match violation.kind {
                ViolationKind::DetectedMistake => "mistake",
                ViolationKind::ViolatedCriterion => "criterion",
                ViolationKind::MissedKeyAction => "key action",
            };
            let _ = writeln!(
                out,
                "  {}: {} \"{}\" ({})",
                violation.phase, kind, violation.text, violation.explanation
            );
        }
    }

    if !report.findings.is_empty() {
        out.push_str("\nFindings\n");
        for finding in &report.findings {
            let _ = writeln!(out, "  {}", describe_finding(finding));
        }
    }

    out.trim_end().to_string()
}

fn render_game(out: &mut String, game: &GameInfo) {
    let mut line = String::from("Game");
    if let Some(id) = &game.game_id {
        let _ = write!(line, " {id}");
    }
    if let Some(map) = &game.map {
        let _ = write!(line, " on {map}");
    }
    if let Some(player) = &game.player {
        let _ = write!(line, ": {}", player.label());
        if let Some(opponent) = &game.opponent {
            let _ = write!(line, " vs {}", opponent.label());
        }
        if let Some(result) = &player.result {
            let _ = write!(line, " ({})", result.to_uppercase());
        }
    }
    let _ = writeln!(out, "{line}");
}

fn measure(unit: BenchmarkUnit, value: f64) -> String {
    match unit {
        BenchmarkUnit::Seconds => format_clock(value),
        BenchmarkUnit::Villagers => format!("{value} villagers"),
    }
}

fn render_item(out: &mut String, item: &ItemResult) {
    let mark = match item.status {
        ItemStatus::Satisfied | ItemStatus::NotDetected => "ok  ",
        ItemStatus::Violated | ItemStatus::Detected => "FAIL",
        ItemStatus::Unscored => "--  ",
    };
    let _ = writeln!(
        out,
        "    [{mark}] {}  ({}: {})",
        item.text,
        item.status.as_str(),
        item.explanation
    );
}

fn describe_finding(finding: &Finding) -> String {
    match finding {
        Finding::BoundaryInferred {
            phase, boundary, ..
        } => format!(
            "no anchor event for phase '{phase}'; boundary placed at {}",
            format_clock(*boundary)
        ),
        Finding::UnscoredItem {
            phase_index,
            category,
            index,
            reason,
        } => {
            let list = match category {
                ItemCategory::KeyAction => "key action",
                ItemCategory::SuccessCriterion => "success criterion",
                ItemCategory::CommonMistake => "common mistake",
            };
            format!("phase {phase_index} {list} #{index} not scored: {reason}")
        }
        Finding::UnscoredDecision { index, trigger } => {
            format!("decision point #{index} ({trigger}) triggered but has no response pattern")
        }
        Finding::DroppedEvents { records } => {
            let mut text = format!("{} telemetry record(s) dropped", records.len());
            if let Some(first) = records.first() {
                let _ = write!(text, " (record {}: {})", first.index, first.reason);
            }
            text
        }
        Finding::CollapsedDuplicates { count } => {
            format!("{count} duplicate telemetry record(s) collapsed")
        }
        Finding::BenchmarkNotReached {
            name,
            unit,
            expected,
        } => format!(
            "benchmark '{name}' (expected {}) never reached",
            measure(*unit, *expected)
        ),
    }
}

fn percent(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{:.0}%", s * 100.0))
}
