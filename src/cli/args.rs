//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate and validate code maps for Python sources
#[derive(Parser, Debug)]
#[command(name = "codemap")]
#[command(about = "Generate and validate code maps for Python sources")]
#[command(version)]
pub struct Args {
    /// Verbose output (debug logging, progress bar)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file path (default: ./codemap.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate or update map documents from source
    Generate {
        /// Root of the Python sources
        src_dir: PathBuf,

        /// Root of the map to write
        map_dir: PathBuf,

        /// Compute changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Project name (default: title-cased source folder name)
        #[arg(long)]
        project_name: Option<String>,

        /// Project description for the index
        #[arg(long)]
        project_description: Option<String>,

        /// Source glob, relative to the source root
        #[arg(long)]
        glob: Option<String>,

        /// Glob patterns to exclude (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,

        /// Directory of template overrides
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Print the change report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an existing map
    Validate {
        /// Root of the map to check
        map_dir: PathBuf,

        /// Allowed drift in lines between a code link and its symbol
        #[arg(long)]
        tolerance: Option<usize>,

        /// Print the findings as JSON
        #[arg(long)]
        json: bool,
    },
}
