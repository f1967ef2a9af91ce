//! Predicate registry
//!
//! Rubric items are checked through a closed, versioned set of named
//! predicates. A rubric references one by identifier plus a `params` object;
//! [`Predicate::bind`] resolves and type-checks the reference, and
//! [`Predicate::eval`] runs it over a phase segment.
//!
//! What "holds" means depends on the item: for key actions and success
//! criteria a holding predicate is *satisfied*, for common mistakes it means
//! the mistake was *detected*.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::UnscorablePredicateError;
use crate::rubric::schema::{DurationRange, PredicateRef};
use crate::telemetry::event::{Age, EventKind, GameEvent, VILLAGER, format_clock};
use crate::telemetry::pattern::{EventMatcher, SubjectMatcher};

/// Version of the predicate registry. Bumped whenever an identifier is added
/// or the meaning of an existing one changes.
pub const REGISTRY_VERSION: u32 = 1;

/// Villagers on the map at game start when no population samples exist.
pub const DEFAULT_STARTING_VILLAGERS: u32 = 3;

// ============================================================================
// Registry
// ============================================================================

/// Describes one registry entry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PredicateSpec {
    /// Identifier referenced from rubrics
    pub id: &'static str,
    /// Parameter synopsis
    pub params: &'static str,
    /// What it means for the predicate to hold
    pub holds_when: &'static str,
}

const REGISTRY: &[PredicateSpec] = &[
    PredicateSpec {
        id: "idle_tc_under",
        params: "max_seconds",
        holds_when: "no single idle_tc event in the segment lasts longer than max_seconds",
    },
    PredicateSpec {
        id: "idle_tc_over",
        params: "max_seconds",
        holds_when: "some idle_tc event in the segment lasts longer than max_seconds",
    },
    PredicateSpec {
        id: "idle_tc_total_under",
        params: "max_seconds",
        holds_when: "total idle_tc time in the segment is at most max_seconds",
    },
    PredicateSpec {
        id: "villager_gap_under",
        params: "max_gap_seconds",
        holds_when: "villager production never pauses longer than max_gap_seconds",
    },
    PredicateSpec {
        id: "villager_gap_over",
        params: "max_gap_seconds",
        holds_when: "villager production pauses longer than max_gap_seconds",
    },
    PredicateSpec {
        id: "villagers_at_least",
        params: "count, starting=3",
        holds_when: "the villager count at segment end is at least count",
    },
    PredicateSpec {
        id: "produced_at_least",
        params: "unit, count=1",
        holds_when: "at least count matching units are produced in the segment",
    },
    PredicateSpec {
        id: "built_at_least",
        params: "building, count=1",
        holds_when: "at least count matching buildings complete in the segment",
    },
    PredicateSpec {
        id: "researched",
        params: "technology",
        holds_when: "a matching technology finishes in the segment",
    },
    PredicateSpec {
        id: "aged_up_in_window",
        params: "age, window=[min,max]",
        holds_when: "the game first reaches age inside the window (default: the phase's duration_range)",
    },
    PredicateSpec {
        id: "aged_up_outside_window",
        params: "age, window=[min,max]",
        holds_when: "the game reaches age outside the window, or never reaches it",
    },
    PredicateSpec {
        id: "event_present",
        params: "type, subject?, count=1",
        holds_when: "at least count matching events occur in the segment",
    },
    PredicateSpec {
        id: "event_absent",
        params: "type, subject?",
        holds_when: "no matching event occurs in the segment",
    },
];

/// Returns every registry entry in a stable order.
#[must_use]
pub fn registry() -> &'static [PredicateSpec] {
    REGISTRY
}

/// Looks up a predicate by identifier.
#[must_use]
pub fn lookup(id: &str) -> Option<&'static PredicateSpec> {
    REGISTRY.iter().find(|spec| spec.id == id)
}

/// Suggests the closest registry identifier for a misspelled one.
#[must_use]
pub fn suggest(id: &str) -> Option<&'static str> {
    REGISTRY
        .iter()
        .map(|spec| (spec.id, strsim::damerau_levenshtein(id, spec.id)))
        .filter(|(_, distance)| *distance <= 3)
        .min_by_key(|(_, distance)| *distance)
        .map(|(id, _)| id)
}

// ============================================================================
// Evaluation context
// ============================================================================

/// The slice of the game a predicate is evaluated over.
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a> {
    /// Events inside the phase segment
    pub events: &'a [GameEvent],
    /// The whole timeline, for game-wide facts such as age-up times
    pub timeline: &'a [GameEvent],
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
    /// The phase's expected duration range
    pub window: DurationRange,
}

/// Result of running a predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether the predicate holds
    pub holds: bool,
    /// Human-readable explanation with the observed values
    pub explanation: String,
}

impl Outcome {
    fn new(holds: bool, explanation: impl Into<String>) -> Self {
        Self {
            holds,
            explanation: explanation.into(),
        }
    }
}

// ============================================================================
// Bound predicates
// ============================================================================

/// A registry predicate with its parameters resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `idle_tc_under`
    IdleTcUnder {
        /// Longest acceptable single idle period
        max_seconds: f64,
    },
    /// `idle_tc_over`
    IdleTcOver {
        /// Longest acceptable single idle period
        max_seconds: f64,
    },
    /// `idle_tc_total_under`
    IdleTcTotalUnder {
        /// Acceptable total idle time
        max_seconds: f64,
    },
    /// `villager_gap_under`
    VillagerGapUnder {
        /// Longest acceptable production pause
        max_gap_seconds: f64,
    },
    /// `villager_gap_over`
    VillagerGapOver {
        /// Longest acceptable production pause
        max_gap_seconds: f64,
    },
    /// `villagers_at_least`
    VillagersAtLeast {
        /// Required population
        count: u32,
        /// Villagers at game start
        starting: u32,
    },
    /// `produced_at_least`
    ProducedAtLeast(EventMatcher),
    /// `built_at_least`
    BuiltAtLeast(EventMatcher),
    /// `researched`
    Researched(EventMatcher),
    /// `aged_up_in_window`
    AgedUpInWindow {
        /// Age to reach
        age: Age,
        /// Explicit window; the phase range when absent
        window: Option<DurationRange>,
    },
    /// `aged_up_outside_window`
    AgedUpOutsideWindow {
        /// Age to reach
        age: Age,
        /// Explicit window; the phase range when absent
        window: Option<DurationRange>,
    },
    /// `event_present`
    EventPresent(EventMatcher),
    /// `event_absent`
    EventAbsent(EventMatcher),
}

type Params = BTreeMap<String, Value>;

impl Predicate {
    /// Resolves a rubric predicate reference.
    ///
    /// # Errors
    ///
    /// Returns [`UnscorablePredicateError`] if no predicate is attached, the
    /// identifier is unknown, or a parameter is missing or malformed.
    pub fn bind(check: &PredicateRef) -> Result<Self, UnscorablePredicateError> {
        let Some(id) = check.predicate.as_deref() else {
            return Err(UnscorablePredicateError::NoPredicate);
        };
        let params = &check.params;

        let predicate = match id {
            "idle_tc_under" => Self::IdleTcUnder {
                max_seconds: seconds(params, "idle_tc_under", "max_seconds")?,
            },
            "idle_tc_over" => Self::IdleTcOver {
                max_seconds: seconds(params, "idle_tc_over", "max_seconds")?,
            },
            "idle_tc_total_under" => Self::IdleTcTotalUnder {
                max_seconds: seconds(params, "idle_tc_total_under", "max_seconds")?,
            },
            "villager_gap_under" => Self::VillagerGapUnder {
                max_gap_seconds: seconds(params, "villager_gap_under", "max_gap_seconds")?,
            },
            "villager_gap_over" => Self::VillagerGapOver {
                max_gap_seconds: seconds(params, "villager_gap_over", "max_gap_seconds")?,
            },
            "villagers_at_least" => Self::VillagersAtLeast {
                count: required_count(params, "villagers_at_least", "count")?,
                starting: optional_u32(params, "villagers_at_least", "starting")?
                    .unwrap_or(DEFAULT_STARTING_VILLAGERS),
            },
            "produced_at_least" => Self::ProducedAtLeast(subject_matcher(
                params,
                "produced_at_least",
                "unit",
                EventKind::UnitProduced,
            )?),
            "built_at_least" => Self::BuiltAtLeast(subject_matcher(
                params,
                "built_at_least",
                "building",
                EventKind::BuildingCompleted,
            )?),
            "researched" => Self::Researched(subject_matcher(
                params,
                "researched",
                "technology",
                EventKind::TechResearched,
            )?),
            "aged_up_in_window" => Self::AgedUpInWindow {
                age: age(params, "aged_up_in_window")?,
                window: window(params, "aged_up_in_window")?,
            },
            "aged_up_outside_window" => Self::AgedUpOutsideWindow {
                age: age(params, "aged_up_outside_window")?,
                window: window(params, "aged_up_outside_window")?,
            },
            "event_present" => Self::EventPresent(event_matcher(params, "event_present")?),
            "event_absent" => {
                let mut matcher = event_matcher(params, "event_absent")?;
                matcher.count = 1;
                Self::EventAbsent(matcher)
            }
            other => {
                return Err(UnscorablePredicateError::Unknown {
                    id: other.to_string(),
                    suggestion: suggest(other).map(str::to_string),
                });
            }
        };
        Ok(predicate)
    }

    /// Runs the predicate over a segment.
    #[must_use]
    pub fn eval(&self, view: &SegmentView<'_>) -> Outcome {
        match self {
            Self::IdleTcUnder { max_seconds } => {
                let longest = longest_idle(view.events);
                Outcome::new(
                    longest <= *max_seconds,
                    format!("longest idle TC period {longest}s (limit {max_seconds}s)"),
                )
            }
            Self::IdleTcOver { max_seconds } => {
                let longest = longest_idle(view.events);
                Outcome::new(
                    longest > *max_seconds,
                    format!("longest idle TC period {longest}s (limit {max_seconds}s)"),
                )
            }
            Self::IdleTcTotalUnder { max_seconds } => {
                let total: f64 = idle_periods(view.events).sum();
                Outcome::new(
                    total <= *max_seconds,
                    format!("total idle TC time {total}s (limit {max_seconds}s)"),
                )
            }
            Self::VillagerGapUnder { max_gap_seconds } => {
                let gap = longest_villager_gap(view);
                Outcome::new(
                    gap <= *max_gap_seconds,
                    format!("longest villager production gap {gap}s (limit {max_gap_seconds}s)"),
                )
            }
            Self::VillagerGapOver { max_gap_seconds } => {
                let gap = longest_villager_gap(view);
                Outcome::new(
                    gap > *max_gap_seconds,
                    format!("longest villager production gap {gap}s (limit {max_gap_seconds}s)"),
                )
            }
            Self::VillagersAtLeast { count, starting } => {
                let observed = villagers_at_end(view, *starting);
                Outcome::new(
                    observed >= f64::from(*count),
                    format!(
                        "{observed} villagers at {} (need {count})",
                        format_clock(view.end)
                    ),
                )
            }
            Self::ProducedAtLeast(matcher)
            | Self::BuiltAtLeast(matcher)
            | Self::Researched(matcher)
            | Self::EventPresent(matcher) => {
                let found = matcher.count_in(view.events);
                Outcome::new(
                    found >= matcher.count as usize,
                    format!("found {found} of {}", matcher.describe()),
                )
            }
            Self::EventAbsent(matcher) => {
                let found = matcher.count_in(view.events);
                let first = view.events.iter().find(|e| matcher.matches(e));
                let explanation = first.map_or_else(
                    || format!("no {} events", matcher.kind),
                    |e| format!("found {found}, first at {}", format_clock(e.timestamp)),
                );
                Outcome::new(found == 0, explanation)
            }
            Self::AgedUpInWindow { age, window } => {
                let window = window.unwrap_or(view.window);
                match first_age_up(view.timeline, *age) {
                    Some(t) => Outcome::new(
                        window.contains(t),
                        format!(
                            "reached {} at {} (window {}-{})",
                            age.milestone(),
                            format_clock(t),
                            format_clock(window.min()),
                            format_clock(window.max())
                        ),
                    ),
                    None => Outcome::new(false, format!("never reached {}", age.milestone())),
                }
            }
            Self::AgedUpOutsideWindow { age, window } => {
                let window = window.unwrap_or(view.window);
                match first_age_up(view.timeline, *age) {
                    Some(t) => Outcome::new(
                        !window.contains(t),
                        format!(
                            "reached {} at {} (window {}-{})",
                            age.milestone(),
                            format_clock(t),
                            format_clock(window.min()),
                            format_clock(window.max())
                        ),
                    ),
                    None => Outcome::new(true, format!("never reached {}", age.milestone())),
                }
            }
        }
    }
}

// ============================================================================
// Parameter parsing
// ============================================================================

fn seconds(
    params: &Params,
    predicate: &'static str,
    name: &'static str,
) -> Result<f64, UnscorablePredicateError> {
    let value = params
        .get(name)
        .ok_or(UnscorablePredicateError::MissingParam {
            predicate,
            param: name,
        })?;
    match value.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(invalid(predicate, name, "a non-negative number of seconds")),
    }
}

fn optional_u32(
    params: &Params,
    predicate: &'static str,
    name: &'static str,
) -> Result<Option<u32>, UnscorablePredicateError> {
    params
        .get(name)
        .map(|value| {
            value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid(predicate, name, "a non-negative integer"))
        })
        .transpose()
}

fn required_count(
    params: &Params,
    predicate: &'static str,
    name: &'static str,
) -> Result<u32, UnscorablePredicateError> {
    match optional_u32(params, predicate, name)? {
        Some(0) => Err(invalid(predicate, name, "a positive integer")),
        Some(n) => Ok(n),
        None => Err(UnscorablePredicateError::MissingParam {
            predicate,
            param: name,
        }),
    }
}

fn optional_count(
    params: &Params,
    predicate: &'static str,
) -> Result<u32, UnscorablePredicateError> {
    match optional_u32(params, predicate, "count")? {
        Some(0) => Err(invalid(predicate, "count", "a positive integer")),
        Some(n) => Ok(n),
        None => Ok(1),
    }
}

fn pattern(
    params: &Params,
    predicate: &'static str,
    name: &'static str,
) -> Result<SubjectMatcher, UnscorablePredicateError> {
    let value = params
        .get(name)
        .ok_or(UnscorablePredicateError::MissingParam {
            predicate,
            param: name,
        })?;
    let text = value
        .as_str()
        .ok_or_else(|| invalid(predicate, name, "a subject pattern string"))?;
    SubjectMatcher::parse(text).map_err(|e| invalid(predicate, name, &e))
}

fn subject_matcher(
    params: &Params,
    predicate: &'static str,
    name: &'static str,
    kind: EventKind,
) -> Result<EventMatcher, UnscorablePredicateError> {
    Ok(EventMatcher {
        kind,
        subject: Some(pattern(params, predicate, name)?),
        count: optional_count(params, predicate)?,
    })
}

fn event_matcher(
    params: &Params,
    predicate: &'static str,
) -> Result<EventMatcher, UnscorablePredicateError> {
    let kind = params
        .get("type")
        .ok_or(UnscorablePredicateError::MissingParam {
            predicate,
            param: "type",
        })?
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid(predicate, "type", "an event type string"))?;
    let subject = if params.contains_key("subject") {
        Some(pattern(params, predicate, "subject")?)
    } else {
        None
    };
    Ok(EventMatcher {
        kind: EventKind::from(kind.to_string()),
        subject,
        count: optional_count(params, predicate)?,
    })
}

fn age(params: &Params, predicate: &'static str) -> Result<Age, UnscorablePredicateError> {
    let value = params
        .get("age")
        .ok_or(UnscorablePredicateError::MissingParam {
            predicate,
            param: "age",
        })?;
    let parsed = match value {
        Value::String(s) => Age::parse(s),
        Value::Number(n) => Age::parse(&n.to_string()),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(predicate, "age", "an age name such as 'feudal_age' or 2"))
}

fn window(
    params: &Params,
    predicate: &'static str,
) -> Result<Option<DurationRange>, UnscorablePredicateError> {
    let Some(value) = params.get("window") else {
        return Ok(None);
    };
    let pair = value
        .as_array()
        .filter(|items| items.len() == 2)
        .and_then(|items| Some((items[0].as_f64()?, items[1].as_f64()?)));
    match pair {
        Some((min, max)) if min.is_finite() && max.is_finite() && 0.0 <= min && min <= max => {
            Ok(Some(DurationRange::new(min, max)))
        }
        _ => Err(invalid(predicate, "window", "[min, max] with 0 <= min <= max")),
    }
}

fn invalid(predicate: &'static str, param: &str, expected: &str) -> UnscorablePredicateError {
    UnscorablePredicateError::InvalidParam {
        predicate,
        param: param.to_string(),
        expected: expected.to_string(),
    }
}

// ============================================================================
// Measurements
// ============================================================================

/// Idle durations; an idle event without a value counts as zero seconds.
fn idle_periods(events: &[GameEvent]) -> impl Iterator<Item = f64> + '_ {
    events
        .iter()
        .filter(|e| e.kind == EventKind::IdleTc)
        .map(|e| e.value.unwrap_or(0.0).max(0.0))
}

fn longest_idle(events: &[GameEvent]) -> f64 {
    idle_periods(events).fold(0.0, f64::max)
}

/// Longest pause in villager production, counting from segment start to the
/// first villager and from the last villager to segment end.
fn longest_villager_gap(view: &SegmentView<'_>) -> f64 {
    let mut previous = view.start;
    let mut longest: f64 = 0.0;
    for event in view.events {
        if event.is(&EventKind::UnitProduced, VILLAGER) {
            longest = longest.max(event.timestamp - previous);
            previous = event.timestamp;
        }
    }
    longest.max(view.end - previous)
}

fn villagers_at_end(view: &SegmentView<'_>, starting: u32) -> f64 {
    villagers_at(view.timeline, view.end, starting)
}

/// Villager population at `at`: the last `villager_count` sample up to that
/// point, or the starting villagers plus every villager produced.
#[must_use]
pub fn villagers_at(timeline: &[GameEvent], at: f64, starting: u32) -> f64 {
    let upto = timeline.partition_point(|e| e.timestamp <= at);
    let history = &timeline[..upto];
    history
        .iter()
        .rev()
        .find(|e| e.kind == EventKind::VillagerCount)
        .and_then(|e| e.value)
        .unwrap_or_else(|| {
            let produced = history
                .iter()
                .filter(|e| e.is(&EventKind::UnitProduced, VILLAGER))
                .count();
            #[allow(clippy::cast_precision_loss)]
            let produced = produced as f64;
            f64::from(starting) + produced
        })
}

fn first_age_up(timeline: &[GameEvent], age: Age) -> Option<f64> {
    timeline
        .iter()
        .find(|e| e.kind == EventKind::AgeUp && e.age() == Some(age))
        .map(|e| e.timestamp)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(ts: f64, kind: EventKind, subject: Option<&str>, value: Option<f64>) -> GameEvent {
        GameEvent {
            timestamp: ts,
            kind,
            subject: subject.map(str::to_string),
            value,
        }
    }

    fn villager(ts: f64) -> GameEvent {
        ev(ts, EventKind::UnitProduced, Some("villager"), None)
    }

    fn check(id: &str, params: Value) -> PredicateRef {
        PredicateRef {
            predicate: Some(id.to_string()),
            params: serde_json::from_value(params).unwrap(),
        }
    }

    fn view(events: &[GameEvent], start: f64, end: f64) -> SegmentView<'_> {
        SegmentView {
            events,
            timeline: events,
            start,
            end,
            window: DurationRange::new(240.0, 330.0),
        }
    }

    #[test]
    fn registry_ids_are_unique() {
        let mut ids: Vec<_> = registry().iter().map(|s| s.id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert!(lookup("idle_tc_under").is_some());
        assert!(lookup("idle_tc").is_none());
    }

    #[test]
    fn suggest_finds_close_identifier() {
        assert_eq!(suggest("idle_tc_undr"), Some("idle_tc_under"));
        assert_eq!(suggest("completely_unrelated_name"), None);
    }

    #[test]
    fn bind_reports_missing_predicate() {
        assert_eq!(
            Predicate::bind(&PredicateRef::default()),
            Err(UnscorablePredicateError::NoPredicate)
        );
    }

    #[test]
    fn bind_reports_unknown_predicate_with_suggestion() {
        let err = Predicate::bind(&check("villager_gap_undr", json!({}))).unwrap_err();
        assert_eq!(
            err,
            UnscorablePredicateError::Unknown {
                id: "villager_gap_undr".to_string(),
                suggestion: Some("villager_gap_under".to_string()),
            }
        );
    }

    #[test]
    fn bind_reports_missing_and_invalid_params() {
        assert_eq!(
            Predicate::bind(&check("idle_tc_under", json!({}))),
            Err(UnscorablePredicateError::MissingParam {
                predicate: "idle_tc_under",
                param: "max_seconds",
            })
        );
        assert!(matches!(
            Predicate::bind(&check("idle_tc_under", json!({"max_seconds": "ten"}))),
            Err(UnscorablePredicateError::InvalidParam { .. })
        ));
        assert!(matches!(
            Predicate::bind(&check("produced_at_least", json!({"unit": "villager", "count": 0}))),
            Err(UnscorablePredicateError::InvalidParam { .. })
        ));
        assert!(matches!(
            Predicate::bind(&check("aged_up_in_window", json!({"age": "stone"}))),
            Err(UnscorablePredicateError::InvalidParam { .. })
        ));
    }

    #[test]
    fn idle_tc_under_and_over_are_complementary() {
        let events = vec![
            ev(30.0, EventKind::IdleTc, None, Some(4.0)),
            ev(90.0, EventKind::IdleTc, None, Some(12.0)),
        ];
        let v = view(&events, 0.0, 300.0);
        let under = Predicate::bind(&check("idle_tc_under", json!({"max_seconds": 10}))).unwrap();
        let over = Predicate::bind(&check("idle_tc_over", json!({"max_seconds": 10}))).unwrap();
        let under = under.eval(&v);
        assert!(!under.holds);
        assert!(under.explanation.contains("12s"));
        assert!(over.eval(&v).holds);

        let total =
            Predicate::bind(&check("idle_tc_total_under", json!({"max_seconds": 15}))).unwrap();
        assert!(!total.eval(&v).holds);
    }

    #[test]
    fn villager_gap_counts_segment_edges() {
        let events = vec![villager(25.0), villager(50.0), villager(75.0)];
        let tight =
            Predicate::bind(&check("villager_gap_under", json!({"max_gap_seconds": 30}))).unwrap();
        assert!(tight.eval(&view(&events, 0.0, 100.0)).holds);
        // 75 -> 200 is a 125s pause
        assert!(!tight.eval(&view(&events, 0.0, 200.0)).holds);
        let over =
            Predicate::bind(&check("villager_gap_over", json!({"max_gap_seconds": 30}))).unwrap();
        assert!(over.eval(&view(&events, 0.0, 200.0)).holds);
    }

    #[test]
    fn villagers_at_least_prefers_population_samples() {
        let produced = vec![villager(25.0), villager(50.0)];
        let p = Predicate::bind(&check("villagers_at_least", json!({"count": 5}))).unwrap();
        // 3 starting + 2 produced
        assert!(p.eval(&view(&produced, 0.0, 100.0)).holds);

        let sampled = vec![
            villager(25.0),
            ev(60.0, EventKind::VillagerCount, None, Some(4.0)),
        ];
        assert!(!p.eval(&view(&sampled, 0.0, 100.0)).holds);
    }

    #[test]
    fn produced_at_least_uses_subject_pattern() {
        let events = vec![
            ev(400.0, EventKind::UnitProduced, Some("spearman"), None),
            ev(410.0, EventKind::UnitProduced, Some("spearman"), None),
            ev(420.0, EventKind::UnitProduced, Some("archer"), None),
        ];
        let p = Predicate::bind(&check("produced_at_least", json!({"unit": "spear*", "count": 2})))
            .unwrap();
        let outcome = p.eval(&view(&events, 0.0, 500.0));
        assert!(outcome.holds);
        assert_eq!(outcome.explanation, "found 2 of 2x unit_produced spear*");
    }

    #[test]
    fn built_and_researched_match_their_kinds() {
        let events = vec![
            ev(100.0, EventKind::BuildingCompleted, Some("mill"), None),
            ev(200.0, EventKind::TechResearched, Some("double_bit_axe"), None),
        ];
        let v = view(&events, 0.0, 300.0);
        let built = Predicate::bind(&check("built_at_least", json!({"building": "mill"}))).unwrap();
        assert!(built.eval(&v).holds);
        let tech =
            Predicate::bind(&check("researched", json!({"technology": "Double-Bit Axe"}))).unwrap();
        assert!(tech.eval(&v).holds);
        let wrong = Predicate::bind(&check("researched", json!({"technology": "mill"}))).unwrap();
        assert!(!wrong.eval(&v).holds);
    }

    #[test]
    fn aged_up_window_defaults_to_phase_range() {
        let events = vec![ev(310.0, EventKind::AgeUp, Some("feudal_age"), None)];
        let v = view(&events, 0.0, 330.0);
        let inside =
            Predicate::bind(&check("aged_up_in_window", json!({"age": "feudal"}))).unwrap();
        assert!(inside.eval(&v).holds);

        let explicit = Predicate::bind(&check(
            "aged_up_outside_window",
            json!({"age": 2, "window": [240, 300]}),
        ))
        .unwrap();
        assert!(explicit.eval(&v).holds);

        let castle =
            Predicate::bind(&check("aged_up_outside_window", json!({"age": "castle"}))).unwrap();
        let outcome = castle.eval(&v);
        assert!(outcome.holds);
        assert_eq!(outcome.explanation, "never reached castle_age");
    }

    #[test]
    fn event_absent_reports_first_occurrence() {
        let events = vec![
            ev(100.0, EventKind::Custom("tower_rush".to_string()), None, None),
            ev(130.0, EventKind::Custom("tower_rush".to_string()), None, None),
        ];
        let p = Predicate::bind(&check("event_absent", json!({"type": "tower_rush"}))).unwrap();
        let outcome = p.eval(&view(&events, 0.0, 300.0));
        assert!(!outcome.holds);
        assert_eq!(outcome.explanation, "found 2, first at 1:40");

        let present =
            Predicate::bind(&check("event_present", json!({"type": "tower_rush", "count": 3})))
                .unwrap();
        assert!(!present.eval(&view(&events, 0.0, 300.0)).holds);
    }
}
