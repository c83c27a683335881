//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Translation unit dependency tracker
#[derive(Parser, Debug)]
#[command(name = "tu-tracker")]
#[command(about = "Tracks which C/C++ translation units need reanalysis after a change")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================
// Main Commands Enum
// ============================================

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze every file of the project and report its state
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),

    /// Print the files one translation unit depends on
    #[command(visible_alias = "d")]
    Deps(DepsArgs),

    /// Print the translation units a set of changed files invalidates
    Affected(AffectedArgs),
}

impl Commands {
    pub fn project(&self) -> &Path {
        match self {
            Self::Analyze(args) => &args.project.project,
            Self::Deps(args) => &args.project.project,
            Self::Affected(args) => &args.project.project,
        }
    }
}

// ============================================
// Command Arguments
// ============================================

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project file listing configurations and files
    #[arg(
        short,
        long,
        env = "TU_TRACKER_PROJECT",
        default_value = "tu-tracker.toml"
    )]
    pub project: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DepsArgs {
    /// Main file of the translation unit
    pub file: PathBuf,

    /// Only report the unit compiled with this configuration
    #[arg(short, long)]
    pub configuration: Option<String>,

    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AffectedArgs {
    /// Files that changed
    #[arg(required = true)]
    pub changed: Vec<PathBuf>,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON for machine parsing
    Json,
}
