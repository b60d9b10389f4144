//! One bounded FIFO worker thread per device.
//!
//! Commands for a device run strictly in submission order, so a hold's end
//! can never overtake its begin. Different devices dispatch concurrently.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, trace};

use super::{DispatchCommand, DispatchSink, SharedDispatcher, run_command};
use crate::input::DeviceId;
use crate::logging::category;

struct Worker {
    tx: SyncSender<DispatchCommand>,
    handle: JoinHandle<()>,
}

/// Sink that queues each device's commands on its own thread.
///
/// A full queue blocks the submitter rather than dropping work.
pub struct DispatchWorkers {
    dispatcher: SharedDispatcher,
    capacity: usize,
    workers: BTreeMap<DeviceId, Worker>,
    retired: Vec<(DeviceId, JoinHandle<()>)>,
}

impl DispatchWorkers {
    /// Queue depth used by the binary.
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(dispatcher: SharedDispatcher, capacity: usize) -> Self {
        Self {
            dispatcher,
            capacity: capacity.max(1),
            workers: BTreeMap::new(),
            retired: Vec::new(),
        }
    }

    /// Devices with a live worker.
    pub fn active_devices(&self) -> Vec<DeviceId> {
        self.workers.keys().copied().collect()
    }

    fn spawn(&self, device: DeviceId) -> std::io::Result<Worker> {
        let (tx, rx) = mpsc::sync_channel::<DispatchCommand>(self.capacity);
        let dispatcher = SharedDispatcher::clone(&self.dispatcher);
        let handle = thread::Builder::new()
            .name(format!("dispatch-{device}"))
            .spawn(move || {
                for command in rx {
                    run_command(dispatcher.as_ref(), &command);
                }
                trace!(device = %device, "Dispatch worker drained");
            })?;
        debug!(device = %device, capacity = self.capacity, "Started dispatch worker");
        Ok(Worker { tx, handle })
    }

    fn reap_finished(&mut self) {
        let (done, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.retired).into_iter().partition(|(_, handle)| handle.is_finished());
        self.retired = pending;
        for (device, handle) in done {
            join(device, handle);
        }
    }
}

fn join(device: DeviceId, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!(category = category::ERROR, device = %device, "Dispatch worker panicked");
    }
}

impl DispatchSink for DispatchWorkers {
    fn submit(&mut self, command: DispatchCommand) {
        let device = command.device();
        if !self.workers.contains_key(&device) {
            match self.spawn(device) {
                Ok(worker) => {
                    self.workers.insert(device, worker);
                }
                Err(e) => {
                    error!(
                        category = category::ERROR,
                        device = %device,
                        error = %e,
                        "Could not start dispatch worker, running inline"
                    );
                    run_command(self.dispatcher.as_ref(), &command);
                    return;
                }
            }
        }

        let Some(worker) = self.workers.get(&device) else {
            return;
        };
        if let Err(mpsc::SendError(command)) = worker.tx.send(command) {
            error!(
                category = category::ERROR,
                device = %device,
                "Dispatch worker gone, running inline"
            );
            if let Some(dead) = self.workers.remove(&device) {
                drop(dead.tx);
                join(device, dead.handle);
            }
            run_command(self.dispatcher.as_ref(), &command);
        }
    }

    fn device_disconnected(&mut self, device: DeviceId) {
        self.reap_finished();
        if let Some(worker) = self.workers.remove(&device) {
            // Closing the channel lets the worker drain what is queued and exit.
            drop(worker.tx);
            self.retired.push((device, worker.handle));
            debug!(device = %device, "Retiring dispatch worker");
        }
    }

    fn shutdown(&mut self) {
        let workers = std::mem::take(&mut self.workers);
        for (device, worker) in workers {
            drop(worker.tx);
            self.retired.push((device, worker.handle));
        }
        let count = self.retired.len();
        for (device, handle) in self.retired.drain(..) {
            join(device, handle);
        }
        if count > 0 {
            debug!(workers = count, "Dispatch workers joined");
        }
    }
}

impl Drop for DispatchWorkers {
    fn drop(&mut self) {
        self.shutdown();
    }
}
