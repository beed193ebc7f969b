//! CLI commands and argument parsing

use crate::resources::ResourceKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dashboard data feed CLI
#[derive(Parser, Debug)]
#[command(name = "dashfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overrides the configuration file
    #[arg(long, global = true, env = "DASHFEED_BASE_URL")]
    pub base_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Page through a resource list
    List {
        /// Resource to list
        resource: ResourceKind,

        /// Page size
        #[arg(short, long)]
        limit: Option<u32>,

        /// Pages to fetch
        #[arg(short, long, default_value = "1")]
        pages: usize,

        /// Filter as key=value (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Acknowledge an alert
    AckAlert {
        /// Alert id
        id: String,
    },

    /// Show the effective configuration
    Config,
}
