//! CLI argument definitions.

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Controller Bridge - map gamepad buttons to app-aware keystrokes, scripts and scrolling.
///
/// Runs until Ctrl-C, or until a --replay source is exhausted.
#[derive(Parser, Debug)]
#[command(name = "controller-bridge", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Path to the mappings config JSON
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH, env = "CONTROLLER_BRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Force dry-run mode (log actions, never execute them)
    #[arg(long, overrides_with = "no_dry_run")]
    pub dry_run: bool,

    /// Force live mode, overriding safety.dryRun
    #[arg(long, overrides_with = "dry_run")]
    pub no_dry_run: bool,

    /// Open the macOS Accessibility settings pane before starting
    #[arg(long)]
    pub prompt_accessibility: bool,

    /// Treat this application identifier as frontmost instead of polling
    #[arg(long, value_name = "BUNDLE_ID")]
    pub app: Option<String>,

    /// Read input ticks from a JSON-lines file ("-" for stdin) instead of a controller
    #[arg(long, value_name = "PATH")]
    pub replay: Option<PathBuf>,

    /// Where actions run: inline on the input loop, or one worker per controller
    #[arg(long, value_enum, default_value_t = DispatchMode::PerDevice)]
    pub dispatch: DispatchMode,

    /// Input sampling period in milliseconds
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub tick_ms: u64,

    /// Config change polling period in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(50..))]
    pub reload_ms: u64,

    /// Emit JSON log lines
    #[arg(long, env = "CONTROLLER_BRIDGE_JSON_LOGS")]
    pub json_logs: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,
}

/// How dispatched actions are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DispatchMode {
    /// Run each action on the input loop, blocking it until the action finishes
    Inline,
    /// One FIFO worker thread per controller
    #[default]
    PerDevice,
}

impl Cli {
    /// `Some(true)` for --dry-run, `Some(false)` for --no-dry-run, `None` to follow the config.
    ///
    /// The two flags override each other, so the last one given wins.
    pub const fn dry_run_override(&self) -> Option<bool> {
        match (self.dry_run, self.no_dry_run) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}
