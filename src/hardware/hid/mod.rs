//! Wii Remotes over HID
//!
//! Remotes have to be paired with the host's Bluetooth stack first; they then
//! show up as HID devices with Nintendo's vendor id. Each open remote is driven
//! by a small state machine (`remote::Remote`) that tracks the reporting mode,
//! outstanding memory reads and the attached extension. Polls serve the
//! remotes round-robin.

mod remote;
pub mod report;

use std::ffi::CString;
use std::time::{Duration, Instant};

use hidapi::{HidApi, HidDevice};
use tracing::{debug, warn};

use self::remote::Remote;
use super::{DeviceCommand, HardwareError, MoteBackend, MoteState, SlotEvent, MAX_DEVICES};

const NINTENDO_VENDOR_ID: u16 = 0x057E;
const WIIMOTE_PRODUCT_IDS: [u16; 2] = [0x0306, 0x0330];

/// Pause between two device enumerations during discovery.
const DISCOVERY_RETRY: Duration = Duration::from_millis(250);

fn is_wiimote(vendor_id: u16, product_id: u16) -> bool {
    vendor_id == NINTENDO_VENDOR_ID && WIIMOTE_PRODUCT_IDS.contains(&product_id)
}

/// [`MoteBackend`] for real remotes through `hidapi`
pub struct HidBackend {
    api: Option<HidApi>,
    found: Vec<CString>,
    remotes: Vec<Option<Remote<HidDevice>>>,
    // first slot served by the next poll
    next_start: usize,
}

impl HidBackend {
    pub fn new() -> Self {
        Self {
            api: None,
            found: Vec::new(),
            remotes: Vec::new(),
            next_start: 0,
        }
    }

    fn remote_mut(&mut self, slot: usize) -> Option<&mut Remote<HidDevice>> {
        self.remotes.get_mut(slot).and_then(Option::as_mut)
    }
}

impl Default for HidBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MoteBackend for HidBackend {
    fn name(&self) -> &str {
        "hid"
    }

    fn init(&mut self, slots: usize) -> Result<(), HardwareError> {
        let api = HidApi::new().map_err(|e| HardwareError::InitializationError(e.to_string()))?;
        self.api = Some(api);
        self.found.clear();
        self.remotes = (0..slots.min(MAX_DEVICES)).map(|_| None).collect();
        Ok(())
    }

    fn find(&mut self, timeout: Duration) -> Result<usize, HardwareError> {
        let slots = self.remotes.len();
        let api = self.api.as_mut().ok_or(HardwareError::NotInitialized)?;
        let deadline = Instant::now() + timeout;

        loop {
            api.refresh_devices()
                .map_err(|e| HardwareError::DiscoveryError(e.to_string()))?;

            for info in api.device_list() {
                if self.found.len() >= slots {
                    break;
                }
                if !is_wiimote(info.vendor_id(), info.product_id()) {
                    continue;
                }
                let path = info.path().to_owned();
                if !self.found.contains(&path) {
                    debug!("Found remote at {}", path.to_string_lossy());
                    self.found.push(path);
                }
            }

            if self.found.len() >= slots || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(DISCOVERY_RETRY.min(deadline.saturating_duration_since(Instant::now())));
        }

        Ok(self.found.len())
    }

    fn connect(&mut self) -> Result<usize, HardwareError> {
        let api = self.api.as_ref().ok_or(HardwareError::NotInitialized)?;
        let mut connected = 0;

        for (slot, path) in self.found.iter().enumerate().take(self.remotes.len()) {
            let device = match api.open_path(path) {
                Ok(device) => device,
                Err(e) => {
                    warn!("Could not open remote {}: {}", path.to_string_lossy(), e);
                    continue;
                }
            };

            let mut remote = Remote::new(slot, device);
            if let Err(e) = remote.setup() {
                warn!("Remote in slot {} did not accept setup: {}", slot, e);
                continue;
            }
            self.remotes[slot] = Some(remote);
            connected += 1;
        }

        Ok(connected)
    }

    fn is_connected(&self, slot: usize) -> bool {
        self.remotes
            .get(slot)
            .and_then(Option::as_ref)
            .is_some_and(|remote| remote.connected)
    }

    fn poll(&mut self, timeout: Duration) -> Result<bool, HardwareError> {
        let connected: Vec<usize> = (0..self.remotes.len())
            .filter(|slot| self.is_connected(*slot))
            .collect();
        if connected.is_empty() {
            return Ok(false);
        }

        let order = poll_order(&connected, self.next_start);
        self.next_start = self.next_start.wrapping_add(1);

        // Reports already queued on any remote are served before anyone waits.
        let mut ready = false;
        for &slot in &order {
            if let Some(remote) = self.remote_mut(slot) {
                ready |= remote.drain(0);
            }
        }
        if ready {
            return Ok(true);
        }

        let slice = (timeout / order.len() as u32).max(Duration::from_millis(1));
        let wait_ms = i32::try_from(slice.as_millis()).unwrap_or(i32::MAX);
        for &slot in &order {
            if let Some(remote) = self.remote_mut(slot) {
                ready |= remote.drain(if ready { 0 } else { wait_ms });
            }
        }
        Ok(ready)
    }

    fn take_event(&mut self, slot: usize) -> SlotEvent {
        self.remote_mut(slot)
            .map(|remote| std::mem::take(&mut remote.event))
            .unwrap_or_default()
    }

    fn state(&self, slot: usize) -> Option<&MoteState> {
        self.remotes
            .get(slot)
            .and_then(Option::as_ref)
            .map(|remote| &remote.state)
    }

    fn apply(&mut self, slot: usize, command: DeviceCommand) -> Result<(), HardwareError> {
        match self.remote_mut(slot) {
            Some(remote) if remote.connected => remote.apply(command),
            _ => Err(HardwareError::InvalidSlot(slot)),
        }
    }
}

/// `connected` rotated so that a different remote goes first on each poll.
fn poll_order(connected: &[usize], round: usize) -> Vec<usize> {
    let mut order = connected.to_vec();
    if !order.is_empty() {
        let start = round % order.len();
        order.rotate_left(start);
    }
    order
}
