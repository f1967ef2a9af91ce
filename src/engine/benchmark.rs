//! Benchmark scoring
//!
//! Detects milestone timings in the timeline and compares them with the
//! rubric's benchmarks. Deltas are `actual - expected`.
//!
//! Most benchmarks are timings: a negative delta means the player was ahead
//! of the benchmark, positive means behind. Villager benchmarks
//! (`villagers_at_10min`, `villagers_at_castle`) are population counts, where
//! a positive delta means ahead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rubric::schema::Benchmarks;
use crate::telemetry::event::{Age, EventKind, GameEvent, TOWN_CENTER};

use super::predicate::{DEFAULT_STARTING_VILLAGERS, villagers_at};

/// Milestone names for additional town centers, by completion order.
const EXTRA_TOWN_CENTERS: [&str; 2] = ["second_tc", "third_tc"];

/// Tolerance for villager benchmarks, in villagers.
const VILLAGER_PACE: PaceThresholds = PaceThresholds {
    on_pace: 2.0,
    slight: 5.0,
};

// ============================================================================
// Thresholds
// ============================================================================

/// Tolerance windows for pace classification, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceThresholds {
    /// `|delta|` at or under this is on pace
    pub on_pace: f64,
    /// `|delta|` at or under this (and over `on_pace`) is slightly off
    pub slight: f64,
}

impl Default for PaceThresholds {
    fn default() -> Self {
        Self {
            on_pace: 15.0,
            slight: 60.0,
        }
    }
}

impl PaceThresholds {
    /// Classifies a signed delta.
    #[must_use]
    pub fn classify(&self, delta: f64) -> BenchmarkStatus {
        let magnitude = delta.abs();
        if magnitude <= self.on_pace {
            BenchmarkStatus::OnPace
        } else if magnitude <= self.slight {
            if delta < 0.0 {
                BenchmarkStatus::SlightlyAhead
            } else {
                BenchmarkStatus::SlightlyBehind
            }
        } else if delta < 0.0 {
            BenchmarkStatus::SignificantlyAhead
        } else {
            BenchmarkStatus::SignificantlyBehind
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Pace classification of one benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    /// Within the on-pace window
    OnPace,
    /// Earlier than expected, within the slight window
    SlightlyAhead,
    /// Later than expected, within the slight window
    SlightlyBehind,
    /// Much earlier than expected
    SignificantlyAhead,
    /// Much later than expected
    SignificantlyBehind,
    /// The milestone never happened
    NotReached,
}

impl BenchmarkStatus {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnPace => "on_pace",
            Self::SlightlyAhead => "slightly_ahead",
            Self::SlightlyBehind => "slightly_behind",
            Self::SignificantlyAhead => "significantly_ahead",
            Self::SignificantlyBehind => "significantly_behind",
            Self::NotReached => "not_reached",
        }
    }
}

impl std::fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a benchmark value measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkUnit {
    /// Seconds from game start until the milestone
    Seconds,
    /// Villager population at a point in the game
    Villagers,
}

/// Comparison of one benchmark with the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
    /// Milestone name
    pub name: String,
    /// What `expected` and `actual` measure
    pub unit: BenchmarkUnit,
    /// Expected value
    pub expected: f64,
    /// Observed value, if reached
    pub actual: Option<f64>,
    /// `actual - expected`, if reached
    pub delta: Option<f64>,
    /// Game time a villager count was sampled at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampled_at: Option<f64>,
    /// Pace classification
    pub status: BenchmarkStatus,
}

/// Where a villager benchmark is sampled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplePoint {
    /// A fixed game time in seconds (`villagers_at_10min`)
    At(f64),
    /// The first age-up into an age (`villagers_at_castle`)
    AgeReached(Age),
}

impl SamplePoint {
    /// Recognizes villager benchmark names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix("villagers_at_")?;
        if let Some(minutes) = rest.strip_suffix("min") {
            let minutes: u32 = minutes.trim_end_matches('_').parse().ok()?;
            return Some(Self::At(f64::from(minutes) * 60.0));
        }
        Age::parse(rest).map(Self::AgeReached)
    }

    /// Returns the game time to sample at, if the game got there.
    fn resolve(self, events: &[GameEvent]) -> Option<f64> {
        match self {
            Self::At(at) => {
                let reached = events.last().is_some_and(|e| e.timestamp >= at);
                reached.then_some(at)
            }
            Self::AgeReached(age) => events
                .iter()
                .find(|e| e.age() == Some(age))
                .map(|e| e.timestamp),
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Extracts milestone timings from a timeline.
///
/// - first `age_up` per age (`feudal_age`, `castle_age`, ...)
/// - `second_tc` / `third_tc` from the first and second completed
///   `town_center` (the starting one is never reported)
/// - first `milestone` event per subject
#[must_use]
pub fn detect_milestones(events: &[GameEvent]) -> BTreeMap<String, f64> {
    let mut milestones = BTreeMap::new();
    let mut town_centers = 0_usize;

    for event in events {
        match &event.kind {
            EventKind::AgeUp | EventKind::Milestone => {
                if let Some(subject) = &event.subject {
                    milestones
                        .entry(subject.clone())
                        .or_insert(event.timestamp);
                }
            }
            EventKind::BuildingCompleted
                if event.subject.as_deref() == Some(TOWN_CENTER) =>
            {
                if let Some(name) = EXTRA_TOWN_CENTERS.get(town_centers) {
                    milestones
                        .entry((*name).to_string())
                        .or_insert(event.timestamp);
                }
                town_centers += 1;
            }
            _ => {}
        }
    }

    milestones
}

/// Scores every benchmark, in rubric document order.
#[must_use]
pub fn score_benchmarks(
    benchmarks: &Benchmarks,
    events: &[GameEvent],
    thresholds: &PaceThresholds,
) -> Vec<BenchmarkResult> {
    let milestones = detect_milestones(events);
    benchmarks
        .iter()
        .map(|(name, expected)| match SamplePoint::parse(name) {
            Some(point) => score_villagers(name, expected, point, events),
            None => score_timing(name, expected, milestones.get(name).copied(), thresholds),
        })
        .collect()
}

fn score_timing(
    name: &str,
    expected: f64,
    actual: Option<f64>,
    thresholds: &PaceThresholds,
) -> BenchmarkResult {
    let delta = actual.map(|actual| actual - expected);
    BenchmarkResult {
        name: name.to_string(),
        unit: BenchmarkUnit::Seconds,
        expected,
        actual,
        delta,
        sampled_at: None,
        status: delta.map_or(BenchmarkStatus::NotReached, |d| thresholds.classify(d)),
    }
}

fn score_villagers(
    name: &str,
    expected: f64,
    point: SamplePoint,
    events: &[GameEvent],
) -> BenchmarkResult {
    let sampled_at = point.resolve(events);
    let actual = sampled_at.map(|at| villagers_at(events, at, DEFAULT_STARTING_VILLAGERS));
    let delta = actual.map(|actual| actual - expected);
    BenchmarkResult {
        name: name.to_string(),
        unit: BenchmarkUnit::Villagers,
        expected,
        actual,
        delta,
        sampled_at,
        // More villagers than expected is ahead
        status: delta.map_or(BenchmarkStatus::NotReached, |d| VILLAGER_PACE.classify(-d)),
    }
}

// ============================================================================
// Tests
// ============================================================================
