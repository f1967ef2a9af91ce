//! CLI argument definitions
//!
//! All Clap derive structs for `rubricate` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Scores recorded RTS games against build-order rubrics.
#[derive(Parser, Debug)]
#[command(name = "rubricate", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "RUBRICATE_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "RUBRICATE_LOG_FORMAT"
    )]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a recorded game against a rubric.
    Evaluate(EvaluateArgs),

    /// Validate rubric documents without evaluating anything.
    Validate(ValidateArgs),

    /// List the predicates rubric items can reference.
    Predicates(PredicatesArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Evaluate Command
// ============================================================================

/// Arguments for `evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Rubric file path, library id, or partial library id.
    #[arg(short, long)]
    pub rubric: String,

    /// Telemetry file (event list or game summary export).
    #[arg(short, long)]
    pub game_data: PathBuf,

    /// Path to the rubric library directory.
    #[arg(long, default_value = "./rubric_library", env = "RUBRICATE_LIBRARY")]
    pub library: PathBuf,

    /// Report format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Benchmark deltas within this many seconds are on pace.
    #[arg(
        long,
        default_value_t = 15.0,
        value_parser = non_negative_seconds,
        env = "RUBRICATE_ON_PACE_WINDOW"
    )]
    pub on_pace_window: f64,

    /// Benchmark deltas within this many seconds are only slightly off.
    #[arg(
        long,
        default_value_t = 60.0,
        value_parser = non_negative_seconds,
        env = "RUBRICATE_SLIGHT_WINDOW"
    )]
    pub slight_window: f64,
}

// ============================================================================
// Validate / Predicates
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rubric files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `predicates`.
#[derive(Args, Debug)]
pub struct PredicatesArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

fn non_negative_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(format!("'{value}' must be a finite, non-negative number of seconds"))
    }
}

// ============================================================================
// Tests
// ============================================================================
