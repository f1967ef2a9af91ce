//! Game telemetry
//!
//! Event vocabulary, telemetry document loading, and normalization into a
//! canonical time-ordered [`Timeline`].
//!
//! # Architecture
//!
//! - [`event`] - [`RawEvent`], [`GameEvent`], [`EventKind`] and ages
//! - [`pattern`] - glob/regex subject matching over events
//! - [`game_summary`] - adapter for per-game summary exports and game identity
//! - [`normalizer`] - sorting, dropping, de-duplication, anchor check
//! - [`loader`] - reads telemetry files of any supported shape

pub mod event;
pub mod game_summary;
pub mod loader;
pub mod normalizer;
pub mod pattern;

pub use event::{Age, EventKind, GameEvent, RawEvent};
pub use game_summary::{GameInfo, PlayerInfo};
pub use loader::{TelemetryDocument, load_timeline, read_document};
pub use normalizer::{DroppedRecord, RawRecord, Timeline, normalize, normalize_records};
pub use pattern::{EventMatcher, SubjectMatcher};
