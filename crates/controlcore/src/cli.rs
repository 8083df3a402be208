//! Clap derive structures for the `controlcore` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// controlcore -- watch sensor telemetry and send commands over MQTT
#[derive(Debug, Parser)]
#[command(
    name = "controlcore",
    version,
    about = "Watch ControlCore sensor telemetry and send control commands",
    long_about = "Connects to the ControlCore MQTT bus, collects the latest telemetry\n\
        reading per sensor, groups them by station/controller or by sensor type, and\n\
        publishes manual-override commands back to field controllers.",
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
    /// Broker profile to use
    #[arg(long, short = 'p', env = "CONTROLCORE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Broker URL, e.g. mqtt://host:1883 or ws://host:9001 (overrides profile)
    #[arg(long, short = 'b', env = "CONTROLCORE_BROKER", global = true)]
    pub broker: Option<String>,

    /// Topic root (overrides profile)
    #[arg(long, env = "CONTROLCORE_ROOT", global = true)]
    pub root: Option<String>,

    /// Config file (default: platform config dir)
    #[arg(long, env = "CONTROLCORE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CONTROLCORE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GroupBy {
    /// Station, then controller
    Physical,
    /// Sensor type
    Logical,
    /// Flat list, newest first
    None,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream readings as they arrive (Ctrl-C to stop)
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Collect readings for a while, then print them grouped
    #[command(alias = "snap", alias = "s")]
    Snapshot(SnapshotArgs),

    /// Send a control command to a sensor or actuator
    Send(SendArgs),

    /// Publish a raw payload to any topic
    Publish(PublishArgs),

    /// Decompose a sensor id into its parts (offline)
    Parse(ParseArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Freshness threshold in minutes (default: config value)
    #[arg(long)]
    pub stale_after: Option<f64>,

    /// Only show readings of this sensor type
    #[arg(long, short = 't')]
    pub sensor_type: Option<String>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// How long to listen before printing (e.g. 10s, 1m)
    #[arg(long, short = 'l', default_value = "10s", value_parser = humantime::parse_duration)]
    pub listen: Duration,

    /// How to group the readings
    #[arg(long, short = 'g', default_value = "physical")]
    pub group: GroupBy,

    /// Freshness threshold in minutes (default: config value)
    #[arg(long)]
    pub stale_after: Option<f64>,

    /// Leave out stale readings
    #[arg(long)]
    pub fresh_only: bool,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Target sensor id
    pub sensor_id: String,

    /// Action: open, close or set-value
    pub action: String,

    /// Seconds to stay open (open)
    #[arg(long, short = 'd')]
    pub duration: Option<u32>,

    /// Setpoint (set_value)
    #[arg(long, allow_negative_numbers = true)]
    pub value: Option<f64>,

    /// Unit for the setpoint (set_value; default: the sensor's unit)
    #[arg(long)]
    pub unit: Option<String>,

    /// How long to wait for the broker and the sensor's first reading
    #[arg(long, short = 'w', default_value = "10s", value_parser = humantime::parse_duration)]
    pub wait: Duration,
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Destination topic
    pub topic: String,

    /// Payload (sent as-is)
    pub payload: String,

    /// How long to wait for the broker
    #[arg(long, short = 'w', default_value = "10s", value_parser = humantime::parse_duration)]
    pub wait: Duration,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Sensor id, e.g. north_pad7_ctrl3_flow_tank1
    pub sensor_id: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with one profile
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
