//! Phase matching
//!
//! Partitions a timeline into one contiguous segment per rubric phase.
//! Phases are matched in rubric order. A segment starts where the previous
//! one ended (the first at 0) and ends at the first anchor event, among the
//! events not yet assigned, whose timestamp lies inside the phase's
//! `duration_range`. Without such an anchor the boundary is inferred at
//! `duration_range.max`.
//!
//! The last segment always extends to the final timestamp, so the segments
//! are gapless, never overlap, and every event belongs to exactly one of
//! them.

use serde::Serialize;
use tracing::debug;

use crate::rubric::schema::Phase;
use crate::telemetry::event::GameEvent;
use crate::telemetry::normalizer::Timeline;

/// The part of the timeline assigned to one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSegment {
    /// Index of the phase in the rubric
    pub phase_index: usize,
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
    /// Where the phase boundary was placed; equals `end` except for a last
    /// phase stretched to the final timestamp
    pub boundary: f64,
    /// `true` if no anchor event fell inside the phase's range
    pub boundary_inferred: bool,
    /// First event index (inclusive)
    #[serde(skip)]
    pub lo: usize,
    /// Last event index (exclusive)
    #[serde(skip)]
    pub hi: usize,
}

impl PhaseSegment {
    /// Returns the segment's events.
    #[must_use]
    pub fn events<'a>(&self, timeline: &'a [GameEvent]) -> &'a [GameEvent] {
        &timeline[self.lo..self.hi]
    }

    /// Returns the number of events in the segment.
    #[must_use]
    pub const fn event_count(&self) -> usize {
        self.hi - self.lo
    }
}

/// Matches rubric phases against a timeline.
///
/// Returns one segment per phase, in phase order. An empty phase list yields
/// no segments.
#[must_use]
pub fn match_phases(phases: &[Phase], timeline: &Timeline) -> Vec<PhaseSegment> {
    let events = timeline.events();
    let final_timestamp = timeline.final_timestamp();
    let mut segments = Vec::with_capacity(phases.len());

    let mut start = 0.0_f64;
    let mut lo = 0_usize;

    for (phase_index, phase) in phases.iter().enumerate() {
        let range = phase.duration_range();
        let remaining = &events[lo..];

        let anchor = remaining
            .iter()
            .position(|e| e.is_anchor() && range.contains(e.timestamp));

        let (boundary, mut hi, boundary_inferred) = match anchor {
            Some(offset) => (remaining[offset].timestamp, lo + offset + 1, false),
            None => {
                let boundary = range.max().max(start);
                let count = remaining.partition_point(|e| e.timestamp <= boundary);
                (boundary, lo + count, true)
            }
        };

        let mut end = boundary;
        if phase_index + 1 == phases.len() {
            end = end.max(final_timestamp);
            hi = events.len();
        }

        debug!(
            phase = phase.name(),
            start,
            end,
            events = hi - lo,
            boundary_inferred,
            "matched phase segment"
        );

        segments.push(PhaseSegment {
            phase_index,
            start,
            end,
            boundary,
            boundary_inferred,
            lo,
            hi,
        });

        start = end;
        lo = hi;
    }

    segments
}

// ============================================================================
// Tests
// ============================================================================
