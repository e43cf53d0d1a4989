//! Clap derive structures for the `eufylink` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// eufylink -- mirror and poke a eufy-security event server
#[derive(Debug, Parser)]
#[command(
    name = "eufylink",
    version,
    about = "Mirror eufy-security station and device state from the command line",
    long_about = "Connects to a eufy-security-ws event server, keeps a local copy of\n\
        its stations and devices, and prints the merged state.\n\n\
        Live properties come from the server's snapshot and property-changed\n\
        events; transient ones (motion, rings, RTSP URLs) are cached per device.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to use instead of the platform default
    #[arg(long, env = "EUFYLINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Event server host (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Event server port (overrides config)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Seconds between poll refreshes while watching (0 disables)
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Output format (defaults to the config file's choice, then table)
    #[arg(long, short = 'o', env = "EUFYLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, refresh once and print the merged state
    #[command(alias = "snap")]
    Snapshot,

    /// Keep the mirror running and print every published state
    Watch(WatchArgs),

    /// Ask the server for a station's or device's properties
    #[command(alias = "props")]
    Properties(PropertiesArgs),

    /// Turn a device's RTSP stream on or off
    Rtsp(RtspArgs),

    /// Manage CLI configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after printing this many states
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Give up after this many consecutive failed reconnects
    #[arg(long)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Args)]
pub struct PropertiesArgs {
    /// Station or device serial number
    pub serial: String,

    /// Treat the serial as a station even if the snapshot doesn't list it
    #[arg(long)]
    pub station: bool,

    /// Request property metadata instead of values
    #[arg(long)]
    pub metadata: bool,
}

#[derive(Debug, Args)]
pub struct RtspArgs {
    /// Device serial number
    pub serial: String,

    /// Disable the stream instead of enabling it
    #[arg(long)]
    pub off: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display the resolved configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
