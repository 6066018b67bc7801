use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fastmux")]
#[command(author, version, about = "Batch-remux video files into fast-start MP4")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a set of video files into MP4 containers
    Convert {
        /// Input video files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory the outputs are written into
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Suffix appended to each output base name
        #[arg(short, long)]
        suffix: Option<String>,

        /// Maximum number of conversions running at once
        #[arg(short, long)]
        parallel: Option<usize>,

        /// Stream events as JSON lines instead of human-readable output
        #[arg(long)]
        json: bool,
    },

    /// Check that the required external tools are available
    CheckTools,

    /// Validate a configuration file
    Validate {
        /// Config file to validate (uses default locations if not specified)
        config: Option<PathBuf>,
    },
}
