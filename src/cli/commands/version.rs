//! Version information display
//!
//! Prints the package version and predicate registry version.

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::engine::predicate::REGISTRY_VERSION;

/// Print version information.
pub fn run(args: &VersionArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version} (predicate registry v{REGISTRY_VERSION})");
        }
        OutputFormat::Json => {
            println!(
                r#"{{"name":"{name}","version":"{version}","predicate_registry":{REGISTRY_VERSION}}}"#
            );
        }
    }
}
