//! Game summary exports.
//!
//! Converts a per-game summary (age-up timings plus a build order with
//! completion timestamps, the shape exported by public match-history
//! services) into raw telemetry events, and reads the game's identity
//! (`game`, `player`, `opponent`) so reports can be traced back to it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::{EventKind, RawEvent};

// ============================================================================
// Game identity
// ============================================================================

/// Identity of the recorded game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameInfo {
    /// Match identifier from the export (`game.game_id`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    /// Map name (`game.map`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    /// The evaluated player
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerInfo>,
    /// Their opponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent: Option<PlayerInfo>,
}

/// One side of the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    /// Player name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Civilization played
    #[serde(skip_serializing_if = "Option::is_none")]
    pub civilization: Option<String>,
    /// `win` / `loss` as exported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl GameInfo {
    /// Reads game identity from a document's top-level fields.
    ///
    /// Lenient: fields of unexpected types are ignored, and `player` may be
    /// a bare name. Returns `None` if nothing identifying is present.
    #[must_use]
    pub fn from_document(document: &Map<String, Value>) -> Option<Self> {
        let game = document.get("game");
        let info = Self {
            game_id: game.and_then(|g| g.get("game_id")).and_then(scalar),
            map: game.and_then(|g| g.get("map")).and_then(scalar),
            player: document.get("player").and_then(PlayerInfo::from_value),
            opponent: document.get("opponent").and_then(PlayerInfo::from_value),
        };
        (info != Self::default()).then_some(info)
    }
}

impl PlayerInfo {
    fn from_value(value: &Value) -> Option<Self> {
        let info = match value {
            Value::String(name) => Self {
                name: Some(name.clone()),
                ..Self::default()
            },
            Value::Object(fields) => Self {
                name: fields.get("name").and_then(scalar),
                civilization: fields.get("civilization").and_then(scalar),
                result: fields.get("result").and_then(scalar),
            },
            _ => return None,
        };
        (info != Self::default()).then_some(info)
    }

    /// Formats as `name (civilization)`.
    #[must_use]
    pub fn label(&self) -> String {
        let name = self.name.as_deref().unwrap_or("unknown");
        match &self.civilization {
            Some(civ) => format!("{name} ({civ})"),
            None => name.to_string(),
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ============================================================================
// Summary export
// ============================================================================

/// Summary of one player's game.
///
/// Identity fields are read separately with [`GameInfo::from_document`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameSummary {
    /// Age-up timings keyed by milestone (`feudal_age`, `castle_age`, ...)
    #[serde(default)]
    pub timings: BTreeMap<String, Timing>,

    /// Build order items with completion timestamps
    #[serde(default)]
    pub build_order: Vec<BuildOrderItem>,
}

/// A single timing entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timing {
    /// Seconds from game start, absent if never reached
    #[serde(default)]
    pub seconds: Option<f64>,
}

/// A build order entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildOrderItem {
    /// Item identifier
    #[serde(default)]
    pub id: Option<Value>,

    /// Icon path; its last segment names the item
    #[serde(default)]
    pub icon: Option<String>,

    /// Item category (`Unit`, `Building`, `Technology`, `Upgrade`, `Age`, ...)
    #[serde(rename = "type")]
    pub item_type: String,

    /// Completion timestamps
    #[serde(default)]
    pub finished: Vec<Option<f64>>,

    /// Construction timestamps (buildings)
    #[serde(default)]
    pub constructed: Vec<Option<f64>>,
}

impl BuildOrderItem {
    /// Returns the item's name: icon basename if present, else its id.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.icon
            .as_deref()
            .and_then(|icon| icon.rsplit('/').next())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.id.as_ref().and_then(scalar))
    }

    fn event_kind(&self) -> EventKind {
        match self.item_type.to_ascii_lowercase().as_str() {
            "unit" => EventKind::UnitProduced,
            "building" => EventKind::BuildingCompleted,
            "technology" | "upgrade" => EventKind::TechResearched,
            other => EventKind::Custom(format!("build_order_{other}")),
        }
    }

    fn timestamps(&self) -> &[Option<f64>] {
        if self.event_kind() == EventKind::BuildingCompleted && !self.constructed.is_empty() {
            &self.constructed
        } else {
            &self.finished
        }
    }
}

impl GameSummary {
    /// Returns `true` if the JSON object looks like a game summary.
    #[must_use]
    pub fn detect(value: &Value) -> bool {
        value.get("timings").is_some() || value.get("build_order").is_some()
    }

    /// Flattens the summary into raw events.
    ///
    /// Null timestamps are kept as untimed records so the normalizer can
    /// flag them.
    #[must_use]
    pub fn into_raw_events(self) -> Vec<RawEvent> {
        let mut raw = Vec::new();

        for (milestone, timing) in &self.timings {
            raw.push(RawEvent {
                timestamp: timing.seconds,
                kind: EventKind::AgeUp.as_str().to_string(),
                subject: Some(milestone.clone()),
                value: None,
            });
        }

        for item in &self.build_order {
            let kind = item.event_kind();
            // Age entries duplicate `timings`
            if kind == EventKind::Custom("build_order_age".to_string()) {
                continue;
            }
            let subject = item.name();
            for ts in item.timestamps() {
                raw.push(RawEvent {
                    timestamp: *ts,
                    kind: kind.as_str().to_string(),
                    subject: subject.clone(),
                    value: None,
                });
            }
        }

        raw
    }
}

// ============================================================================
// Tests
// ============================================================================
