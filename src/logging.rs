//! Structured logging initialization for the controller bridge.
//!
//! Supports both human-friendly and machine-readable (JSON) output formats,
//! with proper TTY detection and verbosity control.

use std::io::{self, IsTerminal};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Values for the `category` field carried by every engine log line.
pub mod category {
    /// Controller connect/disconnect.
    pub const CONNECTION: &str = "connection";
    /// A press resolved (or failed to resolve) to a mapping.
    pub const MAPPING: &str = "mapping";
    /// An event that was deliberately not dispatched.
    pub const SUPPRESSED: &str = "suppressed";
    /// An action handed to the dispatcher.
    pub const DISPATCH: &str = "dispatch";
    /// An action simulated in dry-run mode.
    pub const DRY_RUN: &str = "dry_run";
    /// Config reload outcome.
    pub const RELOAD: &str = "reload";
    /// Emergency toggle flips and dry-run mode switches.
    pub const SAFETY: &str = "safety";
    /// Recovered runtime failures.
    pub const ERROR: &str = "error";
}

/// Initialize the tracing subscriber based on CLI flags and environment.
///
/// # Arguments
///
/// * `json` - If true, output structured JSON logs for machine consumption
/// * `verbose` - Verbosity level: 0 = info, 1 = debug, 2+ = trace
/// * `quiet` - If true, suppress non-essential output (only errors)
///
/// # Environment Variables
///
/// * `RUST_LOG` - Override default filter (e.g., "bridge=debug")
///
/// # Output Behavior
///
/// | Mode | TTY | Output |
/// |------|-----|--------|
/// | JSON | any | JSON lines to stderr |
/// | Human | yes | Pretty colored output to stderr |
/// | Human | no | Compact plain output to stderr |
pub fn init_logging(json: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else if io::stderr().is_terminal() {
        let fmt_layer = fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    } else {
        // Compact output for non-TTY (piped, redirected)
        let fmt_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .with_writer(io::stderr);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Filter directive used when `RUST_LOG` is not set.
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "bridge=error,controller_bridge=error";
    }
    match verbose {
        0 => "bridge=info,controller_bridge=info",
        1 => "bridge=debug,controller_bridge=debug",
        _ => "bridge=trace,controller_bridge=trace",
    }
}
