//! Canonical game event vocabulary.
//!
//! Raw telemetry records ([`RawEvent`]) carry a free-form `type` string and
//! an optional timestamp. The normalizer turns them into [`GameEvent`]s with
//! a typed [`EventKind`], a validated timestamp and a canonical subject.

use serde::{Deserialize, Serialize};

/// Unit subject used for villager production.
pub const VILLAGER: &str = "villager";

/// Building subject used for town centers.
pub const TOWN_CENTER: &str = "town_center";

// ============================================================================
// Event kinds
// ============================================================================

/// Type tag of a game event.
///
/// Unknown type strings are preserved as [`EventKind::Custom`] so that
/// rubrics can still match on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Age transition; subject is the age reached (`feudal_age`, ...)
    AgeUp,
    /// Explicit phase boundary emitted by the capture tool
    PhaseBoundary,
    /// A unit finished training; subject is the unit
    UnitProduced,
    /// A building finished construction; subject is the building
    BuildingCompleted,
    /// A technology finished researching; subject is the technology
    TechResearched,
    /// A town center sat idle; value is the idle duration in seconds
    IdleTc,
    /// Villager population sample; value is the count
    VillagerCount,
    /// Named milestone reached; subject is the milestone name
    Milestone,
    /// Detected game condition; subject is the condition identifier
    Trigger,
    /// Any other type string
    Custom(String),
}

impl EventKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AgeUp => "age_up",
            Self::PhaseBoundary => "phase_boundary",
            Self::UnitProduced => "unit_produced",
            Self::BuildingCompleted => "building_completed",
            Self::TechResearched => "tech_researched",
            Self::IdleTc => "idle_tc",
            Self::VillagerCount => "villager_count",
            Self::Milestone => "milestone",
            Self::Trigger => "trigger",
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` if events of this kind can end a phase segment.
    #[must_use]
    pub const fn is_anchor(&self) -> bool {
        matches!(self, Self::AgeUp | Self::PhaseBoundary)
    }

    /// Returns `true` for kinds outside the built-in vocabulary.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match canonical_name(&value).as_str() {
            "age_up" | "age_transition" => Self::AgeUp,
            "phase_boundary" => Self::PhaseBoundary,
            "unit_produced" => Self::UnitProduced,
            "building_completed" => Self::BuildingCompleted,
            "tech_researched" => Self::TechResearched,
            "idle_tc" => Self::IdleTc,
            "villager_count" => Self::VillagerCount,
            "milestone" => Self::Milestone,
            "trigger" => Self::Trigger,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ages
// ============================================================================

/// The four ages of a standard game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Age {
    /// Age I
    Dark,
    /// Age II
    Feudal,
    /// Age III
    Castle,
    /// Age IV
    Imperial,
}

impl Age {
    /// Returns the canonical milestone name (`feudal_age`, ...).
    #[must_use]
    pub const fn milestone(self) -> &'static str {
        match self {
            Self::Dark => "dark_age",
            Self::Feudal => "feudal_age",
            Self::Castle => "castle_age",
            Self::Imperial => "imperial_age",
        }
    }

    /// Parses an age from a name, milestone or ordinal (`"feudal"`,
    /// `"feudal_age"`, `"2"`, `"II"`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let name = canonical_name(value);
        let name = name.strip_suffix("_age").unwrap_or(&name);
        match name {
            "dark" | "1" | "i" => Some(Self::Dark),
            "feudal" | "2" | "ii" => Some(Self::Feudal),
            "castle" | "3" | "iii" => Some(Self::Castle),
            "imperial" | "4" | "iv" => Some(Self::Imperial),
            _ => None,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A telemetry record as handed over by the capture layer.
///
/// Only `timestamp` and `type` are interpreted structurally; everything else
/// is optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Seconds from game start; records without one are dropped
    #[serde(default, alias = "time", alias = "t")]
    pub timestamp: Option<f64>,

    /// Type tag (see [`EventKind`])
    #[serde(rename = "type")]
    pub kind: String,

    /// Unit, building, technology, age or condition the event is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Numeric payload (idle seconds, villager count, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl RawEvent {
    /// Creates a raw event with a timestamp and type.
    #[must_use]
    pub fn new(timestamp: f64, kind: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp),
            kind: kind.into(),
            subject: None,
            value: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the numeric value.
    #[must_use]
    pub const fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// A normalized, timestamped game event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEvent {
    /// Seconds from game start (finite, non-negative)
    pub timestamp: f64,

    /// Type tag
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Canonical subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Numeric payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl GameEvent {
    /// Returns `true` if this event is of `kind` with the given subject.
    #[must_use]
    pub fn is(&self, kind: &EventKind, subject: &str) -> bool {
        &self.kind == kind && self.subject.as_deref() == Some(subject)
    }

    /// Returns the age reached, for `age_up` events.
    #[must_use]
    pub fn age(&self) -> Option<Age> {
        if self.kind != EventKind::AgeUp {
            return None;
        }
        self.subject.as_deref().and_then(Age::parse)
    }

    /// Returns `true` if this event can end a phase segment.
    #[must_use]
    pub const fn is_anchor(&self) -> bool {
        self.kind.is_anchor()
    }
}

/// Lowercases and snake-cases an identifier (`"Town Center"` and
/// `"TownCenter"` both become `"town_center"`).
///
/// A word break is any run of non-alphanumerics or a lowercase letter
/// followed by an uppercase one, so acronyms such as `TC` stay whole.
#[must_use]
pub fn canonical_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut pending_sep = false;
    let mut prev_lower = false;
    for c in value.trim().chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower {
                pending_sep = true;
            }
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            prev_lower = c.is_lowercase();
            out.extend(c.to_lowercase());
        } else {
            pending_sep = true;
            prev_lower = false;
        }
    }
    out
}

/// Formats seconds as `M:SS`.
#[must_use]
pub fn format_clock(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_parse_from_wire_names() {
        assert_eq!(EventKind::from("age_up".to_string()), EventKind::AgeUp);
        assert_eq!(EventKind::from("Idle TC".to_string()), EventKind::IdleTc);
        assert_eq!(
            EventKind::from("unit-produced".to_string()),
            EventKind::UnitProduced
        );
    }

    #[test]
    fn unknown_kinds_are_preserved() {
        let kind = EventKind::from("Sacred Site Captured".to_string());
        assert_eq!(kind, EventKind::Custom("sacred_site_captured".to_string()));
        assert_eq!(kind.as_str(), "sacred_site_captured");
        assert!(kind.is_custom());
    }

    #[test]
    fn kind_serializes_as_string() {
        let json = serde_json::to_string(&EventKind::BuildingCompleted).unwrap();
        assert_eq!(json, "\"building_completed\"");
    }

    #[test]
    fn only_age_up_and_boundary_are_anchors() {
        assert!(EventKind::AgeUp.is_anchor());
        assert!(EventKind::PhaseBoundary.is_anchor());
        assert!(!EventKind::Milestone.is_anchor());
        assert!(!EventKind::Trigger.is_anchor());
    }

    #[test]
    fn age_parses_names_and_ordinals() {
        assert_eq!(Age::parse("feudal"), Some(Age::Feudal));
        assert_eq!(Age::parse("Castle Age"), Some(Age::Castle));
        assert_eq!(Age::parse("4"), Some(Age::Imperial));
        assert_eq!(Age::parse("II"), Some(Age::Feudal));
        assert_eq!(Age::parse("stone"), None);
    }

    #[test]
    fn canonical_name_collapses_separators() {
        assert_eq!(canonical_name("  Town   Center "), "town_center");
        assert_eq!(canonical_name("opponent-early-pressure"), "opponent_early_pressure");
        assert_eq!(canonical_name("already_snake"), "already_snake");
    }

    #[test]
    fn canonical_name_splits_camel_case() {
        assert_eq!(canonical_name("FeudalAge"), "feudal_age");
        assert_eq!(canonical_name("townCenter"), "town_center");
        assert_eq!(canonical_name("idleTC"), "idle_tc");
        assert_eq!(canonical_name("Idle TC"), "idle_tc");
        assert_eq!(Age::parse("CastleAge"), Some(Age::Castle));
    }

    #[test]
    fn raw_event_accepts_time_alias() {
        let raw: RawEvent = serde_json::from_str(r#"{"time": 12.5, "type": "idle_tc"}"#).unwrap();
        assert_eq!(raw.timestamp, Some(12.5));
        assert_eq!(raw.kind, "idle_tc");
    }

    #[test]
    fn format_clock_pads_seconds() {
        assert_eq!(format_clock(305.0), "5:05");
        assert_eq!(format_clock(59.6), "1:00");
        assert_eq!(format_clock(-3.0), "0:00");
    }
}
