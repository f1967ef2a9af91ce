//! `predicates` command
//!
//! Prints the predicate registry that rubric items can reference.

use crate::cli::args::{OutputFormat, PredicatesArgs};
use crate::engine::predicate::{REGISTRY_VERSION, registry};
use crate::error::RubricateError;

/// Prints every registered predicate.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(args: &PredicatesArgs) -> Result<(), RubricateError> {
    match args.format {
        OutputFormat::Human => {
            println!("predicate registry v{REGISTRY_VERSION}");
            let width = registry().iter().map(|p| p.id.len()).max().unwrap_or(0);
            for spec in registry() {
                println!("  {:width$}  ({})  {}", spec.id, spec.params, spec.holds_when);
            }
        }
        OutputFormat::Json => {
            let doc = serde_json::json!({
                "version": REGISTRY_VERSION,
                "predicates": registry(),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }
    Ok(())
}
