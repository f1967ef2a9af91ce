//! Timeline normalization.
//!
//! Converts heterogeneous raw telemetry into a canonical, time-ordered
//! [`Timeline`]:
//! 1. Drop malformed records and records without a finite, non-negative
//!    timestamp (flagged)
//! 2. Canonicalize kinds and subjects
//! 3. Stable sort by timestamp (ties keep insertion order)
//! 4. Collapse identical duplicates
//! 5. Require at least one phase anchor

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::IncompleteDataError;

use super::event::{Age, EventKind, GameEvent, RawEvent, canonical_name};
use super::game_summary::GameInfo;

/// A telemetry record as read from a document.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// A well-formed event
    Event(RawEvent),
    /// A record that could not be read as an event
    Malformed {
        /// The record's type tag, if it had a readable one
        kind: String,
        /// What was wrong with it
        reason: String,
    },
}

impl From<RawEvent> for RawRecord {
    fn from(event: RawEvent) -> Self {
        Self::Event(event)
    }
}

/// A raw record that was dropped during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRecord {
    /// Position of the record in the raw input
    pub index: usize,
    /// The record's type tag as given
    #[serde(rename = "type")]
    pub kind: String,
    /// Why it was dropped
    pub reason: String,
}

/// A canonical, time-ordered event sequence.
///
/// Only constructible through [`normalize`], so every `Timeline` is
/// non-empty and contains at least one anchor event.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    events: Vec<GameEvent>,
    dropped: Vec<DroppedRecord>,
    collapsed: usize,
    game: Option<GameInfo>,
}

impl Timeline {
    /// Returns the ordered events.
    #[must_use]
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Returns the records dropped as malformed or lacking a usable timestamp.
    #[must_use]
    pub fn dropped(&self) -> &[DroppedRecord] {
        &self.dropped
    }

    /// Returns how many duplicate events were collapsed.
    #[must_use]
    pub const fn collapsed(&self) -> usize {
        self.collapsed
    }

    /// Returns the identity of the recorded game, if the document had one.
    #[must_use]
    pub const fn game(&self) -> Option<&GameInfo> {
        self.game.as_ref()
    }

    /// Attaches game identity.
    #[must_use]
    pub fn with_game(mut self, game: Option<GameInfo>) -> Self {
        self.game = game;
        self
    }

    /// Returns the timestamp of the last event.
    #[must_use]
    pub fn final_timestamp(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.timestamp)
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always `false`; a timeline holds at least one event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over phase anchor events.
    pub fn anchors(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter().filter(|e| e.is_anchor())
    }
}

/// Normalizes raw telemetry into a [`Timeline`].
///
/// Deterministic: identical input always yields an identical timeline.
///
/// # Errors
///
/// Returns [`IncompleteDataError`] if the input is empty, if no record has a
/// usable timestamp, or if no `age_up`/`phase_boundary` anchor is present.
pub fn normalize(raw: Vec<RawEvent>) -> Result<Timeline, IncompleteDataError> {
    normalize_records(raw.into_iter().map(RawRecord::from).collect())
}

/// Normalizes document records, flagging malformed ones as dropped.
///
/// # Errors
///
/// Same as [`normalize`]; malformed records count as dropped.
pub fn normalize_records(records: Vec<RawRecord>) -> Result<Timeline, IncompleteDataError> {
    if records.is_empty() {
        return Err(IncompleteDataError::NoEvents);
    }

    let mut dropped = Vec::new();
    let mut events = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let record = match record {
            RawRecord::Event(record) => record,
            RawRecord::Malformed { kind, reason } => {
                warn!(index, %kind, %reason, "dropping malformed telemetry record");
                dropped.push(DroppedRecord {
                    index,
                    kind,
                    reason,
                });
                continue;
            }
        };
        match record.timestamp {
            Some(ts) if ts.is_finite() && ts >= 0.0 => {
                events.push(canonicalize(ts, record));
            }
            other => {
                let reason = match other {
                    None => "missing timestamp".to_string(),
                    Some(ts) => format!("unusable timestamp {ts}"),
                };
                warn!(index, kind = %record.kind, %reason, "dropping telemetry record");
                dropped.push(DroppedRecord {
                    index,
                    kind: record.kind,
                    reason,
                });
            }
        }
    }

    if events.is_empty() {
        return Err(IncompleteDataError::NoTimestampedEvents {
            dropped: dropped.len(),
        });
    }

    // `sort_by` is stable: equal timestamps keep insertion order
    events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let before = events.len();
    let events = collapse_duplicates(events);
    let collapsed = before - events.len();
    if collapsed > 0 {
        debug!(collapsed, "collapsed duplicate telemetry events");
    }

    let timeline = Timeline {
        events,
        dropped,
        collapsed,
        game: None,
    };

    if timeline.anchors().next().is_none() {
        return Err(IncompleteDataError::NoAgeTransitions {
            event_count: timeline.len(),
        });
    }

    debug!(
        events = timeline.len(),
        dropped = timeline.dropped.len(),
        final_timestamp = timeline.final_timestamp(),
        "telemetry normalized"
    );
    Ok(timeline)
}

fn canonicalize(timestamp: f64, record: RawEvent) -> GameEvent {
    let kind = EventKind::from(record.kind);
    let subject = record.subject.map(|s| {
        if kind == EventKind::AgeUp {
            Age::parse(&s).map_or_else(|| canonical_name(&s), |age| age.milestone().to_string())
        } else {
            canonical_name(&s)
        }
    });
    // Age-ups reported only by ordinal value ("value": 2)
    let subject = match (&kind, subject, record.value) {
        (EventKind::AgeUp, None, Some(v)) => {
            Age::parse(&format!("{v}")).map(|age| age.milestone().to_string())
        }
        (_, subject, _) => subject,
    };
    GameEvent {
        timestamp,
        kind,
        subject,
        value: record.value,
    }
}

/// Removes events identical to an earlier event with the same timestamp.
///
/// Input must be sorted by timestamp; duplicates can only share a timestamp.
fn collapse_duplicates(events: Vec<GameEvent>) -> Vec<GameEvent> {
    let mut out: Vec<GameEvent> = Vec::with_capacity(events.len());
    let mut group_start = 0;
    for event in events {
        if out
            .last()
            .is_some_and(|last| last.timestamp.total_cmp(&event.timestamp).is_ne())
        {
            group_start = out.len();
        }
        if !out[group_start..].contains(&event) {
            out.push(event);
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn age_up(ts: f64, age: &str) -> RawEvent {
        RawEvent::new(ts, "age_up").with_subject(age)
    }

    #[test]
    fn empty_input_is_incomplete() {
        assert_eq!(normalize(vec![]), Err(IncompleteDataError::NoEvents));
    }

    #[test]
    fn missing_anchor_is_incomplete() {
        let raw = vec![
            RawEvent::new(10.0, "unit_produced").with_subject("villager"),
            RawEvent::new(30.0, "idle_tc").with_value(4.0),
        ];
        assert_eq!(
            normalize(raw),
            Err(IncompleteDataError::NoAgeTransitions { event_count: 2 })
        );
    }

    #[test]
    fn all_untimed_is_incomplete() {
        let raw = vec![RawEvent {
            timestamp: None,
            kind: "age_up".to_string(),
            subject: None,
            value: None,
        }];
        assert_eq!(
            normalize(raw),
            Err(IncompleteDataError::NoTimestampedEvents { dropped: 1 })
        );
    }

    #[test]
    fn malformed_records_are_flagged_in_place() {
        let records = vec![
            RawRecord::from(age_up(300.0, "feudal")),
            RawRecord::Malformed {
                kind: "unit_produced".to_string(),
                reason: "field 'timestamp': expected a number, found string \"95\"".to_string(),
            },
            RawRecord::from(RawEvent::new(120.0, "building_completed").with_subject("mill")),
        ];
        let timeline = normalize_records(records).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.dropped().len(), 1);
        assert_eq!(timeline.dropped()[0].index, 1);
        assert!(timeline.dropped()[0].reason.contains("timestamp"));
    }

    #[test]
    fn only_malformed_records_is_incomplete() {
        let records = vec![RawRecord::Malformed {
            kind: "unknown".to_string(),
            reason: "expected an event object, found number 3".to_string(),
        }];
        assert_eq!(
            normalize_records(records),
            Err(IncompleteDataError::NoTimestampedEvents { dropped: 1 })
        );
    }

    #[test]
    fn sorts_stably_by_timestamp() {
        let raw = vec![
            RawEvent::new(50.0, "unit_produced").with_subject("scout"),
            age_up(40.0, "feudal"),
            RawEvent::new(50.0, "unit_produced").with_subject("villager"),
            RawEvent::new(5.0, "unit_produced").with_subject("villager"),
        ];
        let timeline = normalize(raw).unwrap();
        let subjects: Vec<_> = timeline
            .events()
            .iter()
            .map(|e| e.subject.clone().unwrap())
            .collect();
        assert_eq!(subjects, ["villager", "feudal_age", "scout", "villager"]);
    }

    #[test]
    fn drops_and_flags_untimed_records() {
        let raw = vec![
            age_up(300.0, "feudal"),
            RawEvent {
                timestamp: None,
                kind: "unit_produced".to_string(),
                subject: Some("villager".to_string()),
                value: None,
            },
            RawEvent::new(f64::NAN, "idle_tc"),
            RawEvent::new(-1.0, "idle_tc"),
        ];
        let timeline = normalize(raw).unwrap();
        assert_eq!(timeline.len(), 1);
        let dropped: Vec<_> = timeline.dropped().iter().map(|d| d.index).collect();
        assert_eq!(dropped, [1, 2, 3]);
        assert_eq!(timeline.dropped()[0].reason, "missing timestamp");
    }

    #[test]
    fn collapses_identical_duplicates_only() {
        let raw = vec![
            age_up(300.0, "feudal"),
            RawEvent::new(300.0, "milestone").with_subject("scout_out"),
            age_up(300.0, "Feudal Age"),
            RawEvent::new(301.0, "age_up").with_subject("feudal"),
        ];
        let timeline = normalize(raw).unwrap();
        assert_eq!(timeline.collapsed(), 1);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.events()[2].timestamp, 301.0);
    }

    #[test]
    fn canonicalizes_age_subjects() {
        let raw = vec![
            age_up(300.0, "2"),
            RawEvent::new(700.0, "age_up").with_value(3.0),
            age_up(1500.0, "ImperialAge"),
        ];
        let timeline = normalize(raw).unwrap();
        assert_eq!(timeline.events()[0].subject.as_deref(), Some("feudal_age"));
        assert_eq!(timeline.events()[0].age(), Some(Age::Feudal));
        assert_eq!(timeline.events()[1].subject.as_deref(), Some("castle_age"));
        assert_eq!(timeline.events()[2].subject.as_deref(), Some("imperial_age"));
    }

    #[test]
    fn phase_boundary_counts_as_anchor() {
        let raw = vec![RawEvent::new(200.0, "phase_boundary")];
        let timeline = normalize(raw).unwrap();
        assert_eq!(timeline.anchors().count(), 1);
        assert!((timeline.final_timestamp() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn normalization_is_deterministic() {
        let raw = vec![
            RawEvent::new(20.0, "unit_produced").with_subject("Villager"),
            age_up(300.0, "feudal"),
            RawEvent::new(20.0, "unit_produced").with_subject("villager"),
        ];
        assert_eq!(normalize(raw.clone()), normalize(raw));
    }
}
