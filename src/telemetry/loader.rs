//! Telemetry document loading.
//!
//! Accepts three shapes:
//! - a JSON array of raw events
//! - an object with an `events` array
//! - a game summary export (see [`GameSummary`])
//!
//! Records are read one at a time: a malformed record is kept as
//! [`RawRecord::Malformed`] and flagged by the normalizer instead of failing
//! the whole file.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{LoadError, RubricateError};

use super::event::RawEvent;
use super::game_summary::{GameInfo, GameSummary};
use super::normalizer::{RawRecord, Timeline, normalize_records};

/// Type tag recorded for malformed records without a readable `type`.
const UNKNOWN_KIND: &str = "unknown";

/// Fields read as numbers, including the timestamp aliases.
const NUMERIC_FIELDS: [&str; 4] = ["timestamp", "time", "t", "value"];

/// A parsed telemetry document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryDocument {
    /// Records in document order
    pub records: Vec<RawRecord>,
    /// Identity of the recorded game, when the document carries one
    pub game: Option<GameInfo>,
}

impl TelemetryDocument {
    /// Returns the well-formed events.
    pub fn events(&self) -> impl Iterator<Item = &RawEvent> {
        self.records.iter().filter_map(|record| match record {
            RawRecord::Event(event) => Some(event),
            RawRecord::Malformed { .. } => None,
        })
    }
}

/// Reads a telemetry file.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file is missing or unreadable, is not
/// valid JSON, or has an unrecognized shape.
pub fn read_document(path: &Path) -> Result<TelemetryDocument, RubricateError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::from_io(path, e))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let value: Value = serde_json::from_str(content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        line: Some(e.line()),
        message: e.to_string(),
    })?;

    Ok(document_from_value(value, path)?)
}

/// Interprets a parsed telemetry document read from `path`.
///
/// # Errors
///
/// Returns [`LoadError::UnrecognizedTelemetry`] for unknown shapes and
/// [`LoadError::Parse`] for a game summary with ill-typed fields.
pub fn document_from_value(value: Value, path: &Path) -> Result<TelemetryDocument, LoadError> {
    let unrecognized = || LoadError::UnrecognizedTelemetry {
        path: path.to_path_buf(),
    };

    match value {
        Value::Array(items) => {
            debug!("telemetry is a raw event array");
            Ok(TelemetryDocument {
                records: read_records(items),
                game: None,
            })
        }
        Value::Object(mut map) => match map.remove("events") {
            Some(Value::Array(items)) => {
                debug!("telemetry is an event envelope");
                Ok(TelemetryDocument {
                    records: read_records(items),
                    game: GameInfo::from_document(&map),
                })
            }
            Some(_) => Err(unrecognized()),
            None => read_summary(map, path).unwrap_or_else(|| Err(unrecognized())),
        },
        _ => Err(unrecognized()),
    }
}

fn read_summary(
    map: Map<String, Value>,
    path: &Path,
) -> Option<Result<TelemetryDocument, LoadError>> {
    let game = GameInfo::from_document(&map);
    let value = Value::Object(map);
    if !GameSummary::detect(&value) {
        return None;
    }
    debug!("telemetry is a game summary export");
    let result = serde_json::from_value::<GameSummary>(value)
        .map(|summary| TelemetryDocument {
            records: summary
                .into_raw_events()
                .into_iter()
                .map(RawRecord::from)
                .collect(),
            game,
        })
        .map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            line: None,
            message: format!("invalid game summary: {e}"),
        });
    Some(result)
}

fn read_records(items: Vec<Value>) -> Vec<RawRecord> {
    items.into_iter().map(read_record).collect()
}

fn read_record(item: Value) -> RawRecord {
    let kind = item
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_KIND)
        .to_string();
    match RawEvent::deserialize(&item) {
        Ok(event) => RawRecord::Event(event),
        Err(e) => RawRecord::Malformed {
            reason: describe_malformed(&item, &e),
            kind,
        },
    }
}

/// Names the offending field with the expected and actual types.
fn describe_malformed(item: &Value, error: &serde_json::Error) -> String {
    let Value::Object(fields) = item else {
        return format!("expected an event object, found {}", describe_value(item));
    };
    for name in NUMERIC_FIELDS {
        match fields.get(name) {
            Some(Value::Number(_) | Value::Null) | None => {}
            Some(other) => {
                return format!(
                    "field '{name}': expected a number, found {}",
                    describe_value(other)
                );
            }
        }
    }
    match fields.get("type") {
        None => return "missing field 'type'".to_string(),
        Some(Value::String(_)) => {}
        Some(other) => {
            return format!("field 'type': expected a string, found {}", describe_value(other));
        }
    }
    match fields.get("subject") {
        Some(Value::String(_) | Value::Null) | None => error.to_string(),
        Some(other) => format!(
            "field 'subject': expected a string, found {}",
            describe_value(other)
        ),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// Reads and normalizes a telemetry file.
///
/// # Errors
///
/// Returns a load error for unreadable files or an
/// [`IncompleteDataError`](crate::error::IncompleteDataError) if the
/// telemetry cannot anchor phases.
pub fn load_timeline(path: &Path) -> Result<Timeline, RubricateError> {
    let document = read_document(path)?;
    info!(
        file = %path.display(),
        records = document.records.len(),
        "loaded telemetry"
    );
    let timeline = normalize_records(document.records)?;
    Ok(timeline.with_game(document.game))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<TelemetryDocument, LoadError> {
        document_from_value(value, Path::new("game.json"))
    }

    fn reasons(document: &TelemetryDocument) -> Vec<&str> {
        document
            .records
            .iter()
            .filter_map(|record| match record {
                RawRecord::Malformed { reason, .. } => Some(reason.as_str()),
                RawRecord::Event(_) => None,
            })
            .collect()
    }

    #[test]
    fn accepts_event_array() {
        let document = parse(json!([
            {"timestamp": 300, "type": "age_up", "subject": "feudal"}
        ]))
        .unwrap();
        assert_eq!(document.events().count(), 1);
        assert_eq!(document.game, None);
    }

    #[test]
    fn accepts_event_envelope() {
        let document = parse(json!({
            "player": "someone",
            "events": [{"timestamp": 1, "type": "idle_tc", "value": 3}]
        }))
        .unwrap();
        assert_eq!(document.events().next().unwrap().value, Some(3.0));
        let player = document.game.unwrap().player.unwrap();
        assert_eq!(player.name.as_deref(), Some("someone"));
    }

    #[test]
    fn accepts_game_summary() {
        let document = parse(json!({
            "game": {"game_id": 42, "map": "Arabia"},
            "timings": {"feudal_age": {"seconds": 300}}
        }))
        .unwrap();
        let first = document.events().next().unwrap();
        assert_eq!(first.kind, "age_up");
        assert_eq!(document.game.unwrap().game_id.as_deref(), Some("42"));
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(
            parse(json!({"players": []})),
            Err(LoadError::UnrecognizedTelemetry { .. })
        ));
        assert!(matches!(
            parse(json!("events")),
            Err(LoadError::UnrecognizedTelemetry { .. })
        ));
        assert!(matches!(
            parse(json!({"events": 3})),
            Err(LoadError::UnrecognizedTelemetry { .. })
        ));
    }

    #[test]
    fn ill_typed_summary_is_a_parse_error() {
        let err = parse(json!({"timings": {"feudal_age": {"seconds": "soon"}}})).unwrap_err();
        match err {
            LoadError::Parse { message, .. } => assert!(message.contains("game summary"), "{message}"),
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn bad_record_among_good_ones_is_kept_as_malformed() {
        let document = parse(json!([
            {"timestamp": 300, "type": "age_up", "subject": "feudal"},
            {"timestamp": "95", "type": "unit_produced", "subject": "villager"},
            {"timestamp": 120, "subject": "mill"},
            {"timestamp": 150, "type": "building_completed", "subject": "house"}
        ]))
        .unwrap();

        assert_eq!(document.records.len(), 4);
        assert_eq!(document.events().count(), 2);
        assert_eq!(
            reasons(&document),
            [
                "field 'timestamp': expected a number, found string \"95\"",
                "missing field 'type'",
            ]
        );
        assert!(matches!(
            &document.records[1],
            RawRecord::Malformed { kind, .. } if kind == "unit_produced"
        ));
        assert!(matches!(
            &document.records[2],
            RawRecord::Malformed { kind, .. } if kind == UNKNOWN_KIND
        ));
    }

    #[test]
    fn non_object_records_are_malformed() {
        let document = parse(json!([3, {"timestamp": 1, "type": "age_up", "subject": {"age": 2}}])).unwrap();
        assert_eq!(
            reasons(&document),
            [
                "expected an event object, found number 3",
                "field 'subject': expected a string, found an object",
            ]
        );
    }

    #[test]
    fn load_timeline_flags_malformed_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(
            &path,
            r#"[{"timestamp": 300, "type": "age_up", "subject": "feudal"},
                {"timestamp": "95", "type": "unit_produced"},
                {"timestamp": 120, "type": "building_completed", "subject": "mill"}]"#,
        )
        .unwrap();
        let timeline = load_timeline(&path).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.dropped().len(), 1);
        assert_eq!(timeline.dropped()[0].index, 1);
        assert!(timeline.dropped()[0].reason.contains("'timestamp'"));
    }

    #[test]
    fn load_timeline_reports_incomplete_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(&path, r#"[{"timestamp": 10, "type": "unit_produced"}]"#).unwrap();
        let err = load_timeline(&path).unwrap_err();
        assert!(matches!(err, RubricateError::Incomplete(_)));
    }

    #[test]
    fn load_timeline_reports_missing_file() {
        let err = load_timeline(Path::new("/nonexistent/rubricate/game.json")).unwrap_err();
        assert!(matches!(
            err,
            RubricateError::Load(LoadError::MissingFile { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.json");
        std::fs::write(&path, [0xff, 0xfe, b'[', b' ', b']']).unwrap();
        let err = load_timeline(&path).unwrap_err();
        assert!(matches!(err, RubricateError::Load(LoadError::Read { .. })), "{err}");
        assert_eq!(err.exit_code(), crate::error::ExitCode::IO_ERROR);
    }
}
