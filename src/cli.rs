use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::loader::ProjectType;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "srcremap")]
#[command(
    about = "Applies CSV name mappings and documentation to an obfuscated source tree"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl Cli {
    pub fn context(&self) -> AppContext {
        AppContext {
            quiet: self.quiet,
            no_color: self.no_color,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rewrite a source tree using the CSV mapping files
    Apply(ApplyArgs),

    /// Initialize a srcremap.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Directory containing fields.csv, methods.csv and params.csv
    #[arg(long, value_name = "DIR")]
    pub csv_dir: Option<PathBuf>,

    /// Root of the obfuscated source tree
    #[arg(long, value_name = "DIR")]
    pub src_dir: Option<PathBuf>,

    /// Output directory for the rewritten tree; cleared and recreated on every run
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Which mapping rows apply, matched against the numeric side column
    #[arg(long, value_enum)]
    pub project_type: Option<ProjectType>,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,

    /// Output directory; if omitted and --stdout not set, prints to stdout
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
