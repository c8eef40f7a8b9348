use clap::{Parser, Subcommand, ValueEnum};
use purgekit_engine::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "purgekit",
    about = "Purgekit - inspect and purge the edge, object and CDN caches in front of a site",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// CDN account email (overrides the configuration file)
    #[arg(long, global = true, env = "PURGEKIT_CDN_EMAIL")]
    pub cdn_email: Option<String>,

    /// CDN API key (overrides the configuration file)
    #[arg(long, global = true, env = "PURGEKIT_CDN_API_KEY", hide_env_values = true)]
    pub cdn_api_key: Option<String>,

    /// CDN zone id (overrides the configuration file)
    #[arg(long, global = true, env = "PURGEKIT_CDN_ZONE_ID")]
    pub cdn_zone_id: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the state of every cache backend and the last purge
    Status {
        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Purge caches
    Purge {
        /// Backend to purge; repeat for several. Defaults to all backends
        #[arg(short, long = "backend", value_enum)]
        backends: Vec<BackendKind>,

        /// Run the purge in the background and acknowledge immediately
        #[arg(short, long)]
        detach: bool,

        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Show the last recorded purge report
    Last {
        /// Output format
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,

        /// Print the configuration file location
        #[arg(long)]
        path: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Table format
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}
