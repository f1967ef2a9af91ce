//! `validate` command
//!
//! Checks rubric documents against the schema without evaluating a game.

use std::path::PathBuf;

use serde_json::json;
use tracing::info;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::error::{RubricateError, SchemaError};
use crate::rubric::{RubricLimits, RubricLoader};

/// Validates every file, stopping at the first invalid one.
///
/// # Errors
///
/// Returns the first load or schema error. With `--strict`, warnings are
/// reported as a [`SchemaError`].
pub fn run(args: &ValidateArgs) -> Result<(), RubricateError> {
    let loader = RubricLoader::new(PathBuf::new(), RubricLimits::default());
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        info!(file = %path.display(), "validating rubric");
        let loaded = loader.load_path(path)?;

        if args.strict && !loaded.warnings.is_empty() {
            return Err(SchemaError::new(path.display().to_string(), loaded.warnings).into());
        }

        match args.format {
            OutputFormat::Human => {
                println!(
                    "ok: {} ({}, {} phase(s), {} warning(s))",
                    path.display(),
                    loaded.rubric.id(),
                    loaded.rubric.phases().len(),
                    loaded.warnings.len()
                );
                for issue in &loaded.warnings {
                    println!("  {issue}");
                }
            }
            OutputFormat::Json => reports.push(json!({
                "file": path.display().to_string(),
                "id": loaded.rubric.id(),
                "valid": true,
                "warnings": loaded
                    .warnings
                    .iter()
                    .map(|w| json!({"path": w.path, "message": w.message}))
                    .collect::<Vec<_>>(),
            })),
        }
    }

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}
