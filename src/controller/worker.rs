//! Polling worker
//!
//! Runs on its own OS thread and owns the hardware for its whole life:
//!
//! ```text
//! Starting ──initialize()──► Connected ──greet()──► Polling ──run_poll_loop()──► (Stopped)
//!  (init, discover, connect)   (LEDs, rumble)        (poll, decode, publish)
//! ```
//!
//! Startup failures end the run; the shared [`WorkerLifecycle`] is set to
//! `Stopped` on every exit path so the manager can start a new run.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use statum::{machine, state};
use tracing::{debug, error, info, trace, warn};

use super::decoder::decode;
use super::mailbox::EventMailbox;
use super::registry::DeviceRegistry;
use crate::hardware::{
    BackendFactory, ExpansionKind, HardwareError, MoteBackend, SlotEvent, MAX_DEVICES,
};

// Worker settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSettings {
    // How long discovery waits for remotes
    pub discovery_timeout: Duration,

    // Upper bound for one backend poll; also the stop-request latency
    pub poll_timeout: Duration,

    // Length of the startup rumble
    pub greeting_rumble: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(5),
            poll_timeout: Duration::from_millis(100),
            greeting_rumble: Duration::from_millis(200),
        }
    }
}

// Worker errors
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("No remotes found within {0:?}")]
    NoDevicesFound(Duration),

    #[error("Found {0} remotes but none could be connected")]
    NoDevicesConnected(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    NotStarted = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl From<u8> for LifecycleState {
    fn from(value: u8) -> Self {
        match value {
            0 => LifecycleState::NotStarted,
            1 => LifecycleState::Running,
            2 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Lifecycle shared between the manager and its worker thread
#[derive(Debug)]
pub struct WorkerLifecycle {
    state: AtomicU8,
}

impl Default for WorkerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerLifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::NotStarted as u8),
        }
    }

    pub fn get(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    /// Claims a new run. Fails while a run is active or still stopping.
    pub fn try_start(&self) -> bool {
        [LifecycleState::NotStarted, LifecycleState::Stopped]
            .into_iter()
            .any(|from| {
                self.state
                    .compare_exchange(
                        from as u8,
                        LifecycleState::Running as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
            })
    }

    /// Running → Stopping. Returns false if the worker was not running.
    pub fn request_stop(&self) -> bool {
        self.state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::Stopping as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.get() == LifecycleState::Stopping
    }

    pub fn mark_stopped(&self) {
        self.state
            .store(LifecycleState::Stopped as u8, Ordering::Release);
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum WorkerPhase {
    Starting,
    Connected,
    Polling,
}

#[machine]
pub struct PollingWorker<S: WorkerPhase> {
    registry: DeviceRegistry,
    mailbox: Arc<EventMailbox>,
    lifecycle: Arc<WorkerLifecycle>,
    settings: WorkerSettings,
}

impl<S: WorkerPhase> PollingWorker<S> {
    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }
}

impl PollingWorker<Starting> {
    pub fn create(
        backend: Box<dyn MoteBackend>,
        mailbox: Arc<EventMailbox>,
        lifecycle: Arc<WorkerLifecycle>,
        settings: WorkerSettings,
    ) -> Self {
        debug!(
            "Creating polling worker on {} backend with settings: {:?}",
            backend.name(),
            settings
        );
        Self::new(DeviceRegistry::new(backend), mailbox, lifecycle, settings)
    }

    // Bring up the backend and connect every remote it can find
    pub fn initialize(mut self) -> Result<PollingWorker<Connected>, WorkerError> {
        if let Err(e) = self.registry.init() {
            error!("Failed to initialize {} backend: {}", self.registry.backend_name(), e);
            return Err(e.into());
        }

        let found = self.registry.discover(self.settings.discovery_timeout)?;
        if found == 0 {
            warn!("No remotes found");
            return Err(WorkerError::NoDevicesFound(self.settings.discovery_timeout));
        }
        info!("Found {} remotes", found);

        let connected = self.registry.connect()?;
        if connected == 0 {
            warn!("Failed to connect to any of the {} remotes found", found);
            return Err(WorkerError::NoDevicesConnected(found));
        }
        info!("Connected to {} of {} remotes", connected, found);

        Ok(self.transition())
    }
}

impl PollingWorker<Connected> {
    pub fn greet(mut self) -> PollingWorker<Polling> {
        debug!("Greeting connected remotes");
        self.registry.greet(self.settings.greeting_rumble);
        self.transition()
    }
}

impl PollingWorker<Polling> {
    /// Polls until every remote is gone or a stop is requested. Returns the
    /// number of records published.
    pub fn run_poll_loop(&mut self) -> Result<u64, WorkerError> {
        info!("Starting poll loop");

        let mut published_total = 0u64;
        let mut published = 0u64;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        loop {
            if self.lifecycle.is_stop_requested() {
                info!("Stop requested, leaving poll loop");
                break;
            }
            if !self.registry.any_connected() {
                info!("No remotes connected anymore, leaving poll loop");
                break;
            }

            match self.registry.poll(self.settings.poll_timeout) {
                Ok(true) => {
                    let count = self.dispatch();
                    published += count;
                    published_total += count;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Polling remotes failed: {}", e);
                    return Err(e.into());
                }
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Polling worker stats: published {} records in last {} seconds (avg {:.2}/sec)",
                    published,
                    log_interval.num_seconds(),
                    published as f64 / log_interval.num_seconds() as f64
                );
                published = 0;
                last_log_time = now;
            }
        }

        Ok(published_total)
    }

    // Handle whatever each slot reported in the last poll, in slot order
    fn dispatch(&mut self) -> u64 {
        let mut published = 0;

        for slot in 0..MAX_DEVICES {
            match self.registry.take_event(slot) {
                SlotEvent::None => {}
                SlotEvent::Event => {
                    let Some(state) = self.registry.state(slot) else {
                        warn!("Slot {} reported an event without state", slot);
                        continue;
                    };
                    let decoded = decode(state);

                    for command in decoded.commands {
                        debug!("Slot {} applying {:?}", slot, command);
                        if let Err(e) = self.registry.apply(slot, command) {
                            warn!("Slot {} rejected {:?}: {}", slot, command, e);
                        }
                    }

                    self.mailbox.publish(decoded.events);
                    published += 1;
                }
                SlotEvent::Status => self.log_status(slot),
                SlotEvent::Disconnect => {
                    info!("Remote {} disconnected", slot + 1);
                    self.registry.mark_disconnected(slot);
                }
                SlotEvent::UnexpectedDisconnect => {
                    warn!("Remote {} disconnected unexpectedly", slot + 1);
                    self.registry.mark_disconnected(slot);
                }
                SlotEvent::ExpansionInserted(kind) => {
                    info!("Remote {}: {:?} inserted", slot + 1, kind);
                    if kind == ExpansionKind::Guitar {
                        self.log_status(slot);
                    }
                }
                SlotEvent::ExpansionRemoved(kind) => {
                    info!("Remote {}: {:?} removed", slot + 1, kind);
                    self.log_status(slot);
                }
                SlotEvent::MotionPlusActivated => info!("Remote {}: Motion+ activated", slot + 1),
                SlotEvent::MotionPlusRemoved => {
                    info!("Remote {}: Motion+ removed", slot + 1);
                    self.log_status(slot);
                }
                SlotEvent::ReadData => trace!("Remote {}: memory read finished", slot + 1),
            }
        }

        published
    }

    fn log_status(&self, slot: usize) {
        let Some(state) = self.registry.state(slot) else {
            return;
        };
        info!(
            "Remote {} status: attachment={} speaker={} ir={} leds=0x{:02x} battery={:.0}%",
            state.id,
            state.expansion.kind().map_or("none".to_string(), |k| format!("{:?}", k)),
            state.capabilities.speaker,
            state.capabilities.ir,
            state.leds,
            state.battery_level * 100.0
        );
    }
}

fn start(
    factory: &BackendFactory,
    mailbox: Arc<EventMailbox>,
    lifecycle: Arc<WorkerLifecycle>,
    settings: WorkerSettings,
) -> Result<u64, WorkerError> {
    let backend = factory()?;
    let mut worker = PollingWorker::create(backend, mailbox, lifecycle, settings)
        .initialize()?
        .greet();
    worker.run_poll_loop()
}

// Marks the run stopped when dropped, including while unwinding from a panic
struct StopOnDrop<'a>(&'a WorkerLifecycle);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Polling worker panicked");
        }
        self.0.mark_stopped();
    }
}

/// Worker thread entry point
pub fn run(
    factory: BackendFactory,
    mailbox: Arc<EventMailbox>,
    lifecycle: Arc<WorkerLifecycle>,
    settings: WorkerSettings,
) {
    let _stopped = StopOnDrop(&lifecycle);
    match start(&factory, mailbox, lifecycle.clone(), settings) {
        Ok(published) => info!("Polling worker finished after {} records", published),
        Err(e) => error!("Polling worker terminated: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::events::{MoteButton, Transition};
    use crate::hardware::simulated::{SimStep, SimulatedBackend};
    use crate::hardware::{mote_buttons, DeviceCommand, Expansion, MoteState};
    use std::collections::VecDeque;

    // One remote in slot 0 reporting a fixed sequence of events, one per poll
    struct EventBackend {
        events: VecDeque<SlotEvent>,
        pending: SlotEvent,
        connected: bool,
        state: MoteState,
    }

    impl EventBackend {
        fn new(events: impl IntoIterator<Item = SlotEvent>) -> Self {
            Self {
                events: events.into_iter().collect(),
                pending: SlotEvent::None,
                connected: false,
                state: MoteState::new(1),
            }
        }
    }

    impl MoteBackend for EventBackend {
        fn name(&self) -> &str {
            "events"
        }

        fn init(&mut self, _slots: usize) -> Result<(), HardwareError> {
            Ok(())
        }

        fn find(&mut self, _timeout: Duration) -> Result<usize, HardwareError> {
            Ok(1)
        }

        fn connect(&mut self) -> Result<usize, HardwareError> {
            self.connected = true;
            Ok(1)
        }

        fn is_connected(&self, slot: usize) -> bool {
            slot == 0 && self.connected
        }

        fn poll(&mut self, _timeout: Duration) -> Result<bool, HardwareError> {
            self.pending = self.events.pop_front().unwrap_or(SlotEvent::Disconnect);
            if matches!(
                self.pending,
                SlotEvent::Disconnect | SlotEvent::UnexpectedDisconnect
            ) {
                self.connected = false;
            }
            Ok(true)
        }

        fn take_event(&mut self, slot: usize) -> SlotEvent {
            if slot == 0 {
                std::mem::take(&mut self.pending)
            } else {
                SlotEvent::None
            }
        }

        fn state(&self, slot: usize) -> Option<&MoteState> {
            (slot == 0).then_some(&self.state)
        }

        fn apply(&mut self, _slot: usize, _command: DeviceCommand) -> Result<(), HardwareError> {
            Ok(())
        }
    }

    fn run_events(events: Vec<SlotEvent>) -> (Arc<EventMailbox>, Arc<WorkerLifecycle>) {
        let mailbox = Arc::new(EventMailbox::new());
        let lifecycle = Arc::new(WorkerLifecycle::new());
        assert!(lifecycle.try_start());
        let factory: BackendFactory = Arc::new(move || -> Result<Box<dyn MoteBackend>, HardwareError> {
            Ok(Box::new(EventBackend::new(events.clone())))
        });
        run(factory, mailbox.clone(), lifecycle.clone(), fast());
        (mailbox, lifecycle)
    }

    fn factory(backend: SimulatedBackend) -> BackendFactory {
        Arc::new(move || -> Result<Box<dyn MoteBackend>, HardwareError> {
            Ok(Box::new(backend.clone()))
        })
    }

    fn fast() -> WorkerSettings {
        WorkerSettings {
            discovery_timeout: Duration::ZERO,
            poll_timeout: Duration::from_millis(5),
            greeting_rumble: Duration::ZERO,
        }
    }

    fn run_to_end(backend: SimulatedBackend) -> (Arc<EventMailbox>, Arc<WorkerLifecycle>) {
        let mailbox = Arc::new(EventMailbox::new());
        let lifecycle = Arc::new(WorkerLifecycle::new());
        assert!(lifecycle.try_start());
        run(factory(backend), mailbox.clone(), lifecycle.clone(), fast());
        (mailbox, lifecycle)
    }

    #[test]
    fn lifecycle_transitions() {
        let lifecycle = WorkerLifecycle::new();
        assert_eq!(lifecycle.get(), LifecycleState::NotStarted);
        assert!(!lifecycle.request_stop());

        assert!(lifecycle.try_start());
        assert!(!lifecycle.try_start());
        assert!(lifecycle.request_stop());
        assert!(lifecycle.is_stop_requested());
        assert!(!lifecycle.try_start());

        lifecycle.mark_stopped();
        assert!(lifecycle.try_start());
        assert_eq!(lifecycle.get(), LifecycleState::Running);
    }

    #[test]
    fn events_are_decoded_and_published() {
        let backend = SimulatedBackend::new(1)
            .with_motion_sensing(true)
            .with_script([SimStep::motion(0, mote_buttons::A, 1.0, 2.0, 3.0)]);
        let (mailbox, lifecycle) = run_to_end(backend);

        let mut records = Vec::new();
        mailbox.drain(|e| records.push(e.clone()));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].transition(MoteButton::A), Transition::Pressed);
        let rpy = records[0].mote_orientation.unwrap();
        assert_eq!((rpy.roll, rpy.pitch, rpy.yaw), (1.0, 2.0, 3.0));
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn non_data_events_publish_nothing() {
        let backend = SimulatedBackend::new(2).with_script([
            SimStep::Status { slot: 0 },
            SimStep::Idle,
            SimStep::Disconnect { slot: 1 },
        ]);
        let (mailbox, lifecycle) = run_to_end(backend);
        assert_eq!(mailbox.pending(), 0);
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn button_commands_reach_the_remote() {
        let backend = SimulatedBackend::new(1).with_script([SimStep::buttons(
            0,
            mote_buttons::MINUS | mote_buttons::UP,
        )]);
        let log = backend.command_log();
        run_to_end(backend);

        let commands = log.lock().clone();
        assert!(commands.contains(&(0, DeviceCommand::MotionSensing(false))));
        assert!(commands.contains(&(0, DeviceCommand::IrTracking(true))));
    }

    #[test]
    fn startup_failures_stop_the_worker() {
        for backend in [
            SimulatedBackend::new(1).failing_init(),
            SimulatedBackend::new(0),
            SimulatedBackend::new(2).refusing_connections(),
        ] {
            let (mailbox, lifecycle) = run_to_end(backend);
            assert_eq!(mailbox.pending(), 0);
            assert_eq!(lifecycle.get(), LifecycleState::Stopped);
        }
    }

    #[test]
    fn factory_errors_stop_the_worker() {
        let mailbox = Arc::new(EventMailbox::new());
        let lifecycle = Arc::new(WorkerLifecycle::new());
        lifecycle.try_start();
        let failing: BackendFactory = Arc::new(|| -> Result<Box<dyn MoteBackend>, HardwareError> {
            Err(HardwareError::InitializationError("no adapter".into()))
        });
        run(failing, mailbox, lifecycle.clone(), fast());
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn only_data_events_are_published() {
        let (mailbox, lifecycle) = run_events(vec![
            SlotEvent::None,
            SlotEvent::Status,
            SlotEvent::ReadData,
            SlotEvent::Event,
            SlotEvent::ExpansionInserted(ExpansionKind::Nunchuk),
            SlotEvent::ExpansionInserted(ExpansionKind::Guitar),
            SlotEvent::ExpansionRemoved(ExpansionKind::Classic),
            SlotEvent::MotionPlusActivated,
            SlotEvent::MotionPlusRemoved,
            SlotEvent::UnexpectedDisconnect,
        ]);

        let mut ids = Vec::new();
        mailbox.drain(|e| ids.push(e.id));
        assert_eq!(ids, vec![1]);
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn plain_disconnect_ends_the_run() {
        let (mailbox, lifecycle) = run_events(vec![SlotEvent::Disconnect]);
        assert_eq!(mailbox.pending(), 0);
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn expansion_changes_publish_nothing() {
        let backend = SimulatedBackend::new(1).with_script([
            SimStep::ExpansionInserted {
                slot: 0,
                expansion: Expansion::Nunchuk(Default::default()),
            },
            SimStep::ExpansionRemoved { slot: 0 },
            SimStep::ExpansionInserted {
                slot: 0,
                expansion: Expansion::Guitar(Default::default()),
            },
            SimStep::ExpansionRemoved { slot: 0 },
        ]);
        let (mailbox, lifecycle) = run_to_end(backend);
        assert_eq!(mailbox.pending(), 0);
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }

    #[test]
    fn panicking_factory_still_stops_the_worker() {
        let mailbox = Arc::new(EventMailbox::new());
        let lifecycle = Arc::new(WorkerLifecycle::new());
        assert!(lifecycle.try_start());
        let factory: BackendFactory = Arc::new(|| -> Result<Box<dyn MoteBackend>, HardwareError> {
            panic!("backend construction failed")
        });

        let handle = {
            let lifecycle = lifecycle.clone();
            std::thread::spawn(move || run(factory, mailbox, lifecycle, fast()))
        };
        assert!(handle.join().is_err());
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
        assert!(lifecycle.try_start());
    }

    #[test]
    fn stop_request_ends_an_idle_loop() {
        let mailbox = Arc::new(EventMailbox::new());
        let lifecycle = Arc::new(WorkerLifecycle::new());
        lifecycle.try_start();

        let handle = {
            let lifecycle = lifecycle.clone();
            let factory = factory(SimulatedBackend::new(1).keep_alive());
            std::thread::spawn(move || run(factory, mailbox, lifecycle, fast()))
        };

        std::thread::sleep(Duration::from_millis(30));
        assert!(lifecycle.request_stop());
        handle.join().unwrap();
        assert_eq!(lifecycle.get(), LifecycleState::Stopped);
    }
}
