use std::time::Duration;

use tracing::{debug, info, warn};

use crate::hardware::{
    leds, DeviceCommand, HardwareError, MoteBackend, MoteState, SlotEvent, MAX_DEVICES,
};

// Liveness of a single slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Connected,
    Disconnected,
}

/// Fixed set of device slots over a hardware backend
///
/// Slot `n` always shows LED `n + 1`, so a remote keeps its player number for
/// as long as it stays connected.
pub struct DeviceRegistry {
    backend: Box<dyn MoteBackend>,
    slots: [SlotState; MAX_DEVICES],
}

impl DeviceRegistry {
    pub fn new(backend: Box<dyn MoteBackend>) -> Self {
        Self {
            backend,
            slots: [SlotState::Empty; MAX_DEVICES],
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn init(&mut self) -> Result<(), HardwareError> {
        self.slots = [SlotState::Empty; MAX_DEVICES];
        self.backend.init(MAX_DEVICES)
    }

    pub fn discover(&mut self, timeout: Duration) -> Result<usize, HardwareError> {
        info!(
            "Searching for remotes on {} backend ({}s window)",
            self.backend.name(),
            timeout.as_secs_f32()
        );
        self.backend.find(timeout)
    }

    pub fn connect(&mut self) -> Result<usize, HardwareError> {
        let connected = self.backend.connect()?;
        for slot in 0..MAX_DEVICES {
            if self.backend.is_connected(slot) {
                self.slots[slot] = SlotState::Connected;
                debug!("Slot {} connected", slot);
            }
        }
        Ok(connected)
    }

    pub fn led_pattern(slot: usize) -> u8 {
        match slot {
            0 => leds::LED_1,
            1 => leds::LED_2,
            2 => leds::LED_3,
            _ => leds::LED_4,
        }
    }

    /// One-time startup feedback: player LEDs on every connected remote and a
    /// short rumble on the first two. Blocks for `rumble`.
    pub fn greet(&mut self, rumble: Duration) {
        let connected = self.connected_slots();

        for &slot in &connected {
            if let Err(e) = self
                .backend
                .apply(slot, DeviceCommand::Leds(Self::led_pattern(slot)))
            {
                warn!("Could not set LEDs on slot {}: {}", slot, e);
            }
        }

        let rumbling: Vec<usize> = connected.into_iter().take(2).collect();
        for &slot in &rumbling {
            if let Err(e) = self.backend.apply(slot, DeviceCommand::Rumble(true)) {
                warn!("Could not start rumble on slot {}: {}", slot, e);
            }
        }
        std::thread::sleep(rumble);
        for &slot in &rumbling {
            if let Err(e) = self.backend.apply(slot, DeviceCommand::Rumble(false)) {
                warn!("Could not stop rumble on slot {}: {}", slot, e);
            }
        }
    }

    pub fn connected_slots(&self) -> Vec<usize> {
        (0..MAX_DEVICES)
            .filter(|slot| self.is_connected(*slot))
            .collect()
    }

    pub fn is_connected(&self, slot: usize) -> bool {
        self.slots.get(slot) == Some(&SlotState::Connected) && self.backend.is_connected(slot)
    }

    pub fn any_connected(&self) -> bool {
        (0..MAX_DEVICES).any(|slot| self.is_connected(slot))
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        self.slots.get(slot).copied().unwrap_or_default()
    }

    pub fn mark_disconnected(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = SlotState::Disconnected;
        }
    }

    pub fn poll(&mut self, timeout: Duration) -> Result<bool, HardwareError> {
        self.backend.poll(timeout)
    }

    pub fn take_event(&mut self, slot: usize) -> SlotEvent {
        self.backend.take_event(slot)
    }

    pub fn state(&self, slot: usize) -> Option<&MoteState> {
        self.backend.state(slot)
    }

    pub fn apply(&mut self, slot: usize, command: DeviceCommand) -> Result<(), HardwareError> {
        self.backend.apply(slot, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::simulated::{SimStep, SimulatedBackend};

    fn registry(backend: SimulatedBackend) -> DeviceRegistry {
        let mut registry = DeviceRegistry::new(Box::new(backend));
        registry.init().unwrap();
        registry.discover(Duration::ZERO).unwrap();
        registry.connect().unwrap();
        registry
    }

    #[test]
    fn leds_follow_slot_index() {
        assert_eq!(DeviceRegistry::led_pattern(0), leds::LED_1);
        assert_eq!(DeviceRegistry::led_pattern(1), leds::LED_2);
        assert_eq!(DeviceRegistry::led_pattern(2), leds::LED_3);
        assert_eq!(DeviceRegistry::led_pattern(3), leds::LED_4);
    }

    #[test]
    fn greeting_rumbles_only_first_two() {
        let backend = SimulatedBackend::new(3);
        let log = backend.command_log();
        let mut registry = registry(backend);

        registry.greet(Duration::ZERO);

        let commands = log.lock().clone();
        assert_eq!(
            commands,
            vec![
                (0, DeviceCommand::Leds(leds::LED_1)),
                (1, DeviceCommand::Leds(leds::LED_2)),
                (2, DeviceCommand::Leds(leds::LED_3)),
                (0, DeviceCommand::Rumble(true)),
                (1, DeviceCommand::Rumble(true)),
                (0, DeviceCommand::Rumble(false)),
                (1, DeviceCommand::Rumble(false)),
            ]
        );
        assert_eq!(registry.state(2).unwrap().leds, leds::LED_3);
    }

    #[test]
    fn liveness_tracks_disconnects() {
        let mut registry =
            registry(SimulatedBackend::new(2).with_script([SimStep::Disconnect { slot: 0 }]));
        assert_eq!(registry.connected_slots(), vec![0, 1]);

        assert!(registry.poll(Duration::ZERO).unwrap());
        assert_eq!(registry.take_event(0), SlotEvent::Disconnect);
        registry.mark_disconnected(0);

        assert_eq!(registry.slot_state(0), SlotState::Disconnected);
        assert_eq!(registry.connected_slots(), vec![1]);
        assert!(registry.any_connected());
        assert_eq!(registry.slot_state(3), SlotState::Empty);
    }
}
