//! Controller Bridge - map gamepad input to app-aware keystrokes, scripts and scrolling.
#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;
use console::style;
use tracing::{info, warn};

use bridge::cli::Cli;
use bridge::config::{self, ConfigModel};
use bridge::dispatch::{SharedDispatcher, SystemDispatcher, default_injector};
use bridge::error::{BridgeError, Result};
use bridge::input::BoxedSampler;
use bridge::input::replay::ReplaySampler;
use bridge::logging::{category, init_logging};
use bridge::permissions;
use bridge::profile::frontmost_provider;
use bridge::runtime::{self, RuntimeOptions};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    init_logging(cli.json_logs, cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.prompt_accessibility {
        if let Err(e) = permissions::prompt_accessibility() {
            warn!(category = category::SAFETY, error = %e, "Could not open Accessibility settings");
        }
    }

    let config_path = config::resolve_config_path(&cli.config)?;
    let config = Arc::new(config::load_config(&config_path)?);
    let dry_run = cli.dry_run_override().unwrap_or(config.safety.dry_run);
    log_startup(&config, &config_path, dry_run, cli);

    let mut sampler = open_sampler(cli)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("bridge-bg")
        .enable_all()
        .build()
        .map_err(BridgeError::Io)?;
    let _guard = rt.enter();

    let dispatcher: SharedDispatcher = Arc::new(SystemDispatcher::new(dry_run, default_injector()));
    permissions::warn_if_untrusted(dry_run);
    let apps = frontmost_provider(cli.app.clone());

    let options = RuntimeOptions {
        tick: Duration::from_millis(cli.tick_ms),
        reload_interval: Some(Duration::from_millis(cli.reload_ms)),
        dispatch: cli.dispatch,
        dry_run_override: cli.dry_run_override(),
        config_path,
        handle_signals: true,
    };
    runtime::run(&options, config, sampler.as_mut(), apps.as_ref(), dispatcher, rt.handle())?;
    Ok(())
}

fn log_startup(config: &ConfigModel, path: &Path, dry_run: bool, cli: &Cli) {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %path.display(),
        profiles = config.profiles.len(),
        app_profiles = config.app_profiles.len(),
        "Controller bridge starting"
    );
    info!(
        category = category::SAFETY,
        mode = if dry_run { "dry-run" } else { "live" },
        forced = cli.dry_run_override().is_some(),
        emergency_toggle = config
            .safety
            .emergency_toggle_button
            .map_or("none", |button| button.name()),
        "Safety settings"
    );
}

fn open_sampler(cli: &Cli) -> Result<BoxedSampler> {
    if let Some(path) = &cli.replay {
        return Ok(Box::new(ReplaySampler::open(path)?));
    }
    open_gamepad()
}

#[cfg(feature = "gamepad")]
fn open_gamepad() -> Result<BoxedSampler> {
    Ok(Box::new(bridge::input::gamepad::GamepadSampler::new()?))
}

#[cfg(not(feature = "gamepad"))]
fn open_gamepad() -> Result<BoxedSampler> {
    Err(BridgeError::NoInputBackend)
}

fn output_error(error: &BridgeError) {
    eprintln!("{}: {}", style("Error").red().bold().for_stderr(), error);
    if let Some(suggestion) = error.suggestion() {
        eprintln!("{}: {}", style("Hint").yellow().for_stderr(), suggestion);
    }
}
