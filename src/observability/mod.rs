//! Observability
//!
//! Logging setup for the `rubricate` binary. Library code only emits
//! `tracing` events; installing a subscriber is left to the caller.

pub mod logging;

pub use logging::{LogFormat, init_logging};
