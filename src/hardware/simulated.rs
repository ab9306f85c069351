//! Scripted backend
//!
//! Plays back a list of [`SimStep`]s, one per poll, against up to four virtual
//! remotes. Used by the tests and by the `--simulate` demo mode.

use super::{
    AngularRate, BoardState, DeviceCommand, Expansion, HardwareError, MoteBackend, MoteState,
    MotionPlusMode, RawOrientation, SlotEvent, MAX_DEVICES,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// One readiness cycle of the simulation
#[derive(Debug, Clone, PartialEq)]
pub enum SimStep {
    /// A generic input report
    Report {
        slot: usize,
        buttons: u16,
        orientation: Option<RawOrientation>,
        expansion: Option<Expansion>,
        motion_plus: Option<AngularRate>,
    },
    Status { slot: usize },
    Disconnect { slot: usize },
    ExpansionInserted { slot: usize, expansion: Expansion },
    ExpansionRemoved { slot: usize },
    /// Nothing happens; the poll times out
    Idle,
}

impl SimStep {
    /// Report carrying only buttons
    pub fn buttons(slot: usize, buttons: u16) -> Self {
        SimStep::Report {
            slot,
            buttons,
            orientation: None,
            expansion: None,
            motion_plus: None,
        }
    }

    /// Report carrying buttons and an orientation
    pub fn motion(slot: usize, buttons: u16, roll: f32, pitch: f32, yaw: f32) -> Self {
        SimStep::Report {
            slot,
            buttons,
            orientation: Some(RawOrientation {
                roll,
                pitch,
                yaw,
                a_roll: roll,
                a_pitch: pitch,
            }),
            expansion: None,
            motion_plus: None,
        }
    }

    /// Report from a remote with a balance board plugged in
    pub fn board(slot: usize, tl: f32, tr: f32, bl: f32, br: f32) -> Self {
        SimStep::Report {
            slot,
            buttons: 0,
            orientation: None,
            expansion: Some(Expansion::BalanceBoard(BoardState {
                tl,
                tr,
                bl,
                br,
                ..Default::default()
            })),
            motion_plus: None,
        }
    }
}

/// Commands received by the simulated devices, in order
pub type CommandLog = Arc<Mutex<Vec<(usize, DeviceCommand)>>>;

#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    devices: usize,
    fail_init: bool,
    refuse_connections: bool,
    motion_sensing: bool,
    disconnect_when_exhausted: bool,
    report_interval: Duration,
    script: VecDeque<SimStep>,
    slots: Vec<Option<MoteState>>,
    connected: [bool; MAX_DEVICES],
    found: usize,
    pending: [SlotEvent; MAX_DEVICES],
    commands: CommandLog,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SimulatedBackend {
    /// Backend with `devices` remotes waiting to be discovered.
    pub fn new(devices: usize) -> Self {
        Self {
            devices: devices.min(MAX_DEVICES),
            fail_init: false,
            refuse_connections: false,
            motion_sensing: false,
            disconnect_when_exhausted: true,
            report_interval: Duration::ZERO,
            script: VecDeque::new(),
            slots: Vec::new(),
            connected: [false; MAX_DEVICES],
            found: 0,
            pending: [SlotEvent::None; MAX_DEVICES],
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_script(mut self, steps: impl IntoIterator<Item = SimStep>) -> Self {
        self.script.extend(steps);
        self
    }

    /// Starts every remote with the accelerometer enabled.
    pub fn with_motion_sensing(mut self, enabled: bool) -> Self {
        self.motion_sensing = enabled;
        self
    }

    /// Keeps the remotes connected after the script ran out instead of
    /// disconnecting them all.
    pub fn keep_alive(mut self) -> Self {
        self.disconnect_when_exhausted = false;
        self
    }

    /// Time each scripted step takes to arrive.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Devices are found but none accepts a connection.
    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connections = true;
        self
    }

    /// Shared handle on the commands the devices received.
    pub fn command_log(&self) -> CommandLog {
        self.commands.clone()
    }

    /// Demo script for the `--simulate` mode: a slowly rotating remote on
    /// slot 0 pressing A about every 400 ms. After twelve seconds the remote
    /// disconnects.
    pub fn demo() -> Self {
        let mut steps = Vec::new();
        for tick in 0..600u32 {
            let t = tick as f32 * 0.05;
            let buttons = if tick % 20 < 3 { super::mote_buttons::A } else { 0 };
            steps.push(SimStep::motion(
                0,
                buttons,
                (t.sin() * 90.0).round(),
                (t.cos() * 45.0).round(),
                0.0,
            ));
        }
        Self::new(1)
            .with_motion_sensing(true)
            .with_report_interval(Duration::from_millis(20))
            .with_script(steps)
    }

    fn slot_mut(&mut self, slot: usize) -> Option<&mut MoteState> {
        if !self.connected.get(slot).copied().unwrap_or(false) {
            return None;
        }
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn play(&mut self, step: SimStep) -> bool {
        trace!("Simulated step: {:?}", step);
        match step {
            SimStep::Report {
                slot,
                buttons,
                orientation,
                expansion,
                motion_plus,
            } => {
                let Some(state) = self.slot_mut(slot) else {
                    return false;
                };
                state.push_buttons(buttons);
                if let Some(orientation) = orientation {
                    state.orientation = orientation;
                }
                if let Some(expansion) = expansion {
                    state.expansion = expansion;
                    state.capabilities.expansion = expansion.is_attached();
                }
                if motion_plus.is_some() {
                    state.motion_plus = motion_plus;
                }
                self.pending[slot] = SlotEvent::Event;
                true
            }
            SimStep::Status { slot } => {
                if self.slot_mut(slot).is_none() {
                    return false;
                }
                self.pending[slot] = SlotEvent::Status;
                true
            }
            SimStep::Disconnect { slot } => {
                if self.slot_mut(slot).is_none() {
                    return false;
                }
                self.connected[slot] = false;
                self.pending[slot] = SlotEvent::Disconnect;
                true
            }
            SimStep::ExpansionInserted { slot, expansion } => {
                let Some(state) = self.slot_mut(slot) else {
                    return false;
                };
                state.expansion = expansion;
                state.capabilities.expansion = expansion.is_attached();
                match expansion.kind() {
                    Some(kind) => {
                        self.pending[slot] = SlotEvent::ExpansionInserted(kind);
                        true
                    }
                    None => false,
                }
            }
            SimStep::ExpansionRemoved { slot } => {
                let Some(state) = self.slot_mut(slot) else {
                    return false;
                };
                let removed = state.expansion.kind();
                state.expansion = Expansion::None;
                state.capabilities.expansion = false;
                match removed {
                    Some(kind) => {
                        self.pending[slot] = SlotEvent::ExpansionRemoved(kind);
                        true
                    }
                    None => false,
                }
            }
            SimStep::Idle => false,
        }
    }
}

impl MoteBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn init(&mut self, slots: usize) -> Result<(), HardwareError> {
        if self.fail_init {
            return Err(HardwareError::InitializationError(
                "simulated initialization failure".to_string(),
            ));
        }
        self.slots = vec![None; slots.min(MAX_DEVICES)];
        debug!("Simulated backend initialized with {} slots", self.slots.len());
        Ok(())
    }

    fn find(&mut self, _timeout: Duration) -> Result<usize, HardwareError> {
        if self.slots.is_empty() {
            return Err(HardwareError::NotInitialized);
        }
        self.found = self.devices.min(self.slots.len());
        for (slot, entry) in self.slots.iter_mut().enumerate().take(self.found) {
            let mut state = MoteState::new(slot + 1);
            state.capabilities.accelerometer = self.motion_sensing;
            state.battery_level = 1.0;
            *entry = Some(state);
        }
        info!("Simulated backend found {} remotes", self.found);
        Ok(self.found)
    }

    fn connect(&mut self) -> Result<usize, HardwareError> {
        if self.refuse_connections {
            return Ok(0);
        }
        for slot in 0..self.found {
            self.connected[slot] = true;
        }
        Ok(self.found)
    }

    fn is_connected(&self, slot: usize) -> bool {
        self.connected.get(slot).copied().unwrap_or(false)
    }

    fn poll(&mut self, timeout: Duration) -> Result<bool, HardwareError> {
        match self.script.pop_front() {
            Some(step) => {
                if !self.report_interval.is_zero() {
                    std::thread::sleep(self.report_interval.min(timeout));
                }
                Ok(self.play(step))
            }
            None => {
                if !self.disconnect_when_exhausted {
                    std::thread::sleep(timeout);
                    return Ok(false);
                }
                let mut any = false;
                for slot in 0..MAX_DEVICES {
                    if self.connected[slot] {
                        self.connected[slot] = false;
                        self.pending[slot] = SlotEvent::Disconnect;
                        any = true;
                    }
                }
                Ok(any)
            }
        }
    }

    fn take_event(&mut self, slot: usize) -> SlotEvent {
        self.pending
            .get_mut(slot)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    fn state(&self, slot: usize) -> Option<&MoteState> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn apply(&mut self, slot: usize, command: DeviceCommand) -> Result<(), HardwareError> {
        self.commands.lock().push((slot, command));
        let Some(state) = self.slot_mut(slot) else {
            return Err(HardwareError::InvalidSlot(slot));
        };
        match command {
            DeviceCommand::MotionSensing(enabled) => state.capabilities.accelerometer = enabled,
            DeviceCommand::IrTracking(enabled) => state.capabilities.ir = enabled,
            DeviceCommand::MotionPlus(MotionPlusMode::Off) => state.motion_plus = None,
            DeviceCommand::MotionPlus(_) => {
                state.motion_plus.get_or_insert_with(AngularRate::default);
            }
            DeviceCommand::Leds(mask) => state.leds = mask,
            DeviceCommand::Rumble(_) => {}
        }
        Ok(())
    }
}
