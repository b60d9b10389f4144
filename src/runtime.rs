//! The input loop.
//!
//! A single sequencer on the calling thread samples input at a fixed period,
//! reads the frontmost app, and feeds each batch through [`engine::tick`].
//! Config reloads and Ctrl-C handling run as tokio tasks and only talk to the
//! sequencer through `watch` channels, so a new config is observed at a tick
//! boundary and never in the middle of one.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cli::DispatchMode;
use crate::config::{ConfigModel, ConfigReloadCoordinator, ReloadOutcome};
use crate::dispatch::{DispatchSink, DispatchWorkers, InlineSink, SharedDispatcher};
use crate::engine::{self, EngineState, TickContext, TickReport};
use crate::error::Result;
use crate::input::{InputEvent, InputSampler};
use crate::logging::category;
use crate::profile::FrontmostAppProvider;

/// Knobs for [`run`].
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Sampling period.
    pub tick: Duration,
    /// Config polling period; `None` disables hot reload.
    pub reload_interval: Option<Duration>,
    pub dispatch: DispatchMode,
    /// Dry-run forced from the command line. Reloads never change it.
    pub dry_run_override: Option<bool>,
    pub config_path: PathBuf,
    /// Stop on Ctrl-C.
    pub handle_signals: bool,
}

impl RuntimeOptions {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            tick: Duration::from_millis(16),
            reload_interval: Some(Duration::from_secs(1)),
            dispatch: DispatchMode::default(),
            dry_run_override: None,
            config_path,
            handle_signals: true,
        }
    }
}

/// Totals reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub dispatched: u64,
    pub suppressed: u64,
    /// Config models applied after startup.
    pub reloads: u64,
    /// Holds ended by the shutdown sweep.
    pub released_at_shutdown: usize,
}

/// Build the sink for `mode`.
pub fn make_sink(mode: DispatchMode, dispatcher: &SharedDispatcher) -> Box<dyn DispatchSink> {
    match mode {
        DispatchMode::Inline => Box::new(InlineSink::new(SharedDispatcher::clone(dispatcher))),
        DispatchMode::PerDevice => Box::new(DispatchWorkers::new(
            SharedDispatcher::clone(dispatcher),
            DispatchWorkers::DEFAULT_CAPACITY,
        )),
    }
}

/// Owns the engine state and everything it dispatches into.
pub struct Sequencer {
    state: EngineState,
    sink: Box<dyn DispatchSink>,
    dispatcher: SharedDispatcher,
    config_rx: watch::Receiver<Arc<ConfigModel>>,
    config: Arc<ConfigModel>,
    dry_run_override: Option<bool>,
    summary: RunSummary,
}

impl Sequencer {
    pub fn new(
        config_rx: watch::Receiver<Arc<ConfigModel>>,
        sink: Box<dyn DispatchSink>,
        dispatcher: SharedDispatcher,
        dry_run_override: Option<bool>,
    ) -> Self {
        let config = Arc::clone(&config_rx.borrow());
        Self {
            state: EngineState::new(),
            sink,
            dispatcher,
            config_rx,
            config,
            dry_run_override,
            summary: RunSummary::default(),
        }
    }

    pub const fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &ConfigModel {
        &self.config
    }

    /// Swap in a newly published config, if any.
    fn observe_config(&mut self) {
        if !self.config_rx.has_changed().unwrap_or(false) {
            return;
        }
        let next = Arc::clone(&self.config_rx.borrow_and_update());
        if Arc::ptr_eq(&next, &self.config) {
            return;
        }
        if self.dry_run_override.is_none() && next.safety.dry_run != self.config.safety.dry_run {
            self.dispatcher.set_dry_run(next.safety.dry_run);
        }
        self.summary.reloads += 1;
        info!(
            category = category::RELOAD,
            profiles = next.profiles.len(),
            app_profiles = next.app_profiles.len(),
            "Config applied"
        );
        self.config = next;
    }

    /// Run one tick: apply any pending reload, then process `events`.
    pub fn step(&mut self, events: Vec<InputEvent>, app_id: Option<&str>, now: Instant) -> TickReport {
        self.observe_config();
        let ctx = TickContext {
            now,
            config: &self.config,
            app_id,
        };
        let report = engine::tick(&mut self.state, &ctx, events, self.sink.as_mut());
        self.summary.ticks += 1;
        self.summary.dispatched += report.dispatched as u64;
        self.summary.suppressed += report.suppressed.len() as u64;
        report
    }

    /// Release every open hold and drain the sink.
    pub fn finish(mut self) -> RunSummary {
        self.summary.released_at_shutdown = engine::shutdown(&mut self.state, self.sink.as_mut());
        self.sink.shutdown();
        self.summary
    }
}

/// Run until Ctrl-C or until the sampler is exhausted.
///
/// Open holds are always released before returning, including when the
/// sampler fails.
pub fn run(
    options: &RuntimeOptions,
    config: Arc<ConfigModel>,
    sampler: &mut dyn InputSampler,
    apps: &dyn FrontmostAppProvider,
    dispatcher: SharedDispatcher,
    handle: &Handle,
) -> Result<RunSummary> {
    let (config_tx, config_rx) = watch::channel(Arc::clone(&config));
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    if let Some(interval) = options.reload_interval {
        let coordinator = ConfigReloadCoordinator::new(options.config_path.clone(), config);
        tasks.push(handle.spawn(reload_task(coordinator, interval, config_tx, stop_rx.clone())));
    }
    if options.handle_signals {
        let stop_tx = Arc::clone(&stop_tx);
        tasks.push(handle.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, shutting down");
                let _ = stop_tx.send(true);
            }
        }));
    }

    let sink = make_sink(options.dispatch, &dispatcher);
    let mut sequencer = Sequencer::new(config_rx, sink, dispatcher, options.dry_run_override);

    info!(
        source = %sampler.describe(),
        tick_ms = options.tick.as_millis(),
        dispatch = ?options.dispatch,
        "Bridge running"
    );

    let outcome = drive(&mut sequencer, sampler, apps, options.tick, &stop_rx);

    for task in tasks {
        task.abort();
    }
    let summary = sequencer.finish();
    info!(
        ticks = summary.ticks,
        dispatched = summary.dispatched,
        suppressed = summary.suppressed,
        reloads = summary.reloads,
        released = summary.released_at_shutdown,
        "Bridge stopped"
    );
    outcome.map(|()| summary)
}

fn drive(
    sequencer: &mut Sequencer,
    sampler: &mut dyn InputSampler,
    apps: &dyn FrontmostAppProvider,
    period: Duration,
    stop_rx: &watch::Receiver<bool>,
) -> Result<()> {
    let mut deadline = Instant::now();
    loop {
        if *stop_rx.borrow() {
            return Ok(());
        }
        let events = match sampler.poll() {
            Ok(Some(events)) => events,
            Ok(None) => {
                info!("Input source exhausted");
                return Ok(());
            }
            Err(e) => {
                error!(category = category::ERROR, error = %e, "Input source failed");
                return Err(e);
            }
        };

        let app = apps.current_app_identifier();
        sequencer.step(events, app.as_deref(), Instant::now());

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            deadline = now;
        }
    }
}

async fn reload_task<W>(
    mut coordinator: ConfigReloadCoordinator<W>,
    period: Duration,
    config_tx: watch::Sender<Arc<ConfigModel>>,
    mut stop_rx: watch::Receiver<bool>,
) where
    W: crate::config::ConfigWatcher + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await;
    debug!(path = %coordinator.path().display(), "Watching config");
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop_rx.changed() => return,
        }
        // Failures are logged by the coordinator.
        if let ReloadOutcome::Reloaded(model) = coordinator.poll() {
            if config_tx.send(model).is_err() {
                return;
            }
        }
    }
}
