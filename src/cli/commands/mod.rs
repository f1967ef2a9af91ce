//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod evaluate;
pub mod predicates;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::RubricateError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub fn dispatch(cli: Cli) -> Result<(), RubricateError> {
    match cli.command {
        Commands::Evaluate(args) => evaluate::run(&args),
        Commands::Validate(args) => validate::run(&args),
        Commands::Predicates(args) => predicates::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
