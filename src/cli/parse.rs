//! CLI parse: clap types for shortgen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// shortgen - tree-shaped AI generation pipelines for short vertical videos
#[derive(Parser)]
#[command(name = "shortgen")]
#[command(about = "Turn source text into a short vertical video through a tree of AI generation stages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ and relative output paths resolve here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a pipeline template to completion
    Run {
        /// Template file (JSON, or TOML by extension)
        #[arg(long)]
        template: PathBuf,
        /// Read the initial input from a file
        #[arg(long, conflicts_with = "text", required_unless_present = "text")]
        input: Option<PathBuf>,
        /// Initial input text
        #[arg(long)]
        text: Option<String>,
        /// Assemble the scenes into a video once the run settles
        #[arg(long)]
        compose: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Validate a pipeline template without running it
    Validate {
        /// Template file (JSON, or TOML by extension)
        #[arg(long)]
        template: PathBuf,
    },
    /// Print a reference template
    Example {
        /// Print the dynamic shorts template instead of the static one
        #[arg(long)]
        dynamic: bool,
    },
    /// Compose a video from an explicit scene list
    Compose {
        /// Execution id used to name the output
        #[arg(long)]
        execution_id: String,
        /// JSON file: [{"imagePath", "audioPath", "subtitle", "duration"}]
        #[arg(long)]
        scenes: PathBuf,
    },
}
