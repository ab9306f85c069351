//! Manager - owner of the polling worker and consumer side of the mailbox
//!
//! The worker runs on a dedicated OS thread; the consumer calls
//! [`Manager::update`] on its own schedule, which hands the latest record of
//! every remote to the registered callback on the consumer's thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use super::events::ControllerEvents;
use super::mailbox::EventMailbox;
use super::worker::{self, LifecycleState, WorkerLifecycle, WorkerSettings};
use crate::hardware::BackendFactory;

/// Consumer callback, invoked once per drained record
pub type EventCallback = Box<dyn FnMut(&ControllerEvents) + Send>;

const WORKER_THREAD_NAME: &str = "wiimo-poll";

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Failed to spawn polling worker thread: {0}")]
    SpawnError(#[from] std::io::Error),
}

pub struct Manager {
    settings: WorkerSettings,
    factory: BackendFactory,
    mailbox: Arc<EventMailbox>,
    lifecycle: Arc<WorkerLifecycle>,
    callback: Option<EventCallback>,
    worker: Option<JoinHandle<()>>,
}

impl Manager {
    pub fn new(settings: WorkerSettings, factory: BackendFactory) -> Self {
        Self {
            settings,
            factory,
            mailbox: Arc::new(EventMailbox::new()),
            lifecycle: Arc::new(WorkerLifecycle::new()),
            callback: None,
            worker: None,
        }
    }

    /// Registers the consumer callback, replacing any previous one.
    pub fn on_controller_events<F>(&mut self, callback: F)
    where
        F: FnMut(&ControllerEvents) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Starts the polling worker unless one is already running.
    ///
    /// Returns `Ok(true)` if a new worker thread was started. A worker that
    /// finished earlier (no remotes, all disconnected) is joined and replaced.
    pub fn init(&mut self) -> Result<bool, ManagerError> {
        match self.lifecycle.get() {
            LifecycleState::Running | LifecycleState::Stopping => {
                debug!("Polling worker already active, init ignored");
                return Ok(false);
            }
            LifecycleState::NotStarted | LifecycleState::Stopped => {}
        }

        self.join_worker();
        if !self.lifecycle.try_start() {
            return Ok(false);
        }

        let factory = self.factory.clone();
        let mailbox = self.mailbox.clone();
        let lifecycle = self.lifecycle.clone();
        let settings = self.settings.clone();

        let spawned = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker::run(factory, mailbox, lifecycle, settings));

        match spawned {
            Ok(handle) => {
                info!("Polling worker started");
                self.worker = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.lifecycle.mark_stopped();
                Err(e.into())
            }
        }
    }

    /// Drains pending records into the callback; returns how many were
    /// delivered. Without a callback the records stay where they are.
    pub fn update(&mut self) -> usize {
        let Some(callback) = self.callback.as_mut() else {
            return 0;
        };
        self.mailbox.drain(|events| callback(events))
    }

    /// Stops the worker and waits for its thread to end.
    pub fn shutdown(&mut self) {
        if self.lifecycle.request_stop() {
            info!("Stopping polling worker");
        }
        self.join_worker();
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.get()
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("Polling worker thread panicked");
                self.lifecycle.mark_stopped();
            }
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
