//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "mbot-console", about = "Live telemetry console for MBot robots")]
pub struct Cli {
    /// TOML settings file
    #[arg(long, short = 'c', env = "MBOT_CONSOLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bridge address (host:port), overrides the config file
    #[arg(long, short = 'a')]
    pub address: Option<String>,

    /// Heartbeat period in milliseconds
    #[arg(long)]
    pub heartbeat_ms: Option<u64>,

    /// Map polling period in milliseconds (mapping mode)
    #[arg(long)]
    pub map_poll_ms: Option<u64>,

    /// How destructive SLAM actions are confirmed
    #[arg(long, value_enum, default_value_t = ConfirmMode::Prompt)]
    pub confirm: ConfirmMode,

    /// Directory that `save-map` writes into
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfirmMode {
    /// Ask on the terminal
    Prompt,
    /// Always proceed
    Accept,
    /// Always refuse
    Decline,
}
