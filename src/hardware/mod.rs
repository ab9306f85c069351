//! Hardware layer for Wii Remotes
//!
//! Everything below the polling worker lives here: the raw per-device state the
//! hardware exposes after each poll, the kinds of events a slot can report, the
//! device-configuration commands the decoder may request, and the
//! [`MoteBackend`] trait that ties them together.
//!
//! ```text
//! MoteBackend ──poll──► SlotEvent + MoteState ──► decoder ──► ControllerEvents
//!      ▲                                              │
//!      └──────────────── DeviceCommand ◄──────────────┘
//! ```
//!
//! Two backends are provided:
//!
//! - [`simulated::SimulatedBackend`] - scripted devices for tests and the demo mode
//! - [`hid::HidBackend`] - real remotes over HID (feature `hid`)

#[cfg(feature = "hid")]
pub mod hid;
pub mod simulated;

use std::sync::Arc;
use std::time::Duration;

/// Number of device slots tracked by the registry.
pub const MAX_DEVICES: usize = 4;

/// Core button bits as reported by the remote.
pub mod mote_buttons {
    pub const TWO: u16 = 0x0001;
    pub const ONE: u16 = 0x0002;
    pub const B: u16 = 0x0004;
    pub const A: u16 = 0x0008;
    pub const MINUS: u16 = 0x0010;
    pub const HOME: u16 = 0x0080;
    pub const LEFT: u16 = 0x0100;
    pub const RIGHT: u16 = 0x0200;
    pub const DOWN: u16 = 0x0400;
    pub const UP: u16 = 0x0800;
    pub const PLUS: u16 = 0x1000;

    pub const ALL: u16 = 0x1F9F;
}

/// Nunchuk button bits.
pub mod nunchuk_buttons {
    pub const Z: u8 = 0x01;
    pub const C: u8 = 0x02;

    pub const ALL: u8 = 0x03;
}

/// Classic controller button bits.
pub mod classic_buttons {
    pub const UP: u16 = 0x0001;
    pub const LEFT: u16 = 0x0002;
    pub const ZR: u16 = 0x0004;
    pub const X: u16 = 0x0008;
    pub const A: u16 = 0x0010;
    pub const Y: u16 = 0x0020;
    pub const B: u16 = 0x0040;
    pub const ZL: u16 = 0x0080;
    pub const FULL_R: u16 = 0x0200;
    pub const PLUS: u16 = 0x0400;
    pub const HOME: u16 = 0x0800;
    pub const MINUS: u16 = 0x1000;
    pub const FULL_L: u16 = 0x2000;
    pub const DOWN: u16 = 0x4000;
    pub const RIGHT: u16 = 0x8000;

    pub const ALL: u16 = 0xFEFF;
}

/// Guitar controller button bits.
pub mod guitar_buttons {
    pub const STRUM_UP: u16 = 0x0001;
    pub const YELLOW: u16 = 0x0008;
    pub const GREEN: u16 = 0x0010;
    pub const BLUE: u16 = 0x0020;
    pub const RED: u16 = 0x0040;
    pub const ORANGE: u16 = 0x0080;
    pub const PLUS: u16 = 0x0400;
    pub const MINUS: u16 = 0x1000;
    pub const STRUM_DOWN: u16 = 0x4000;

    pub const ALL: u16 = 0x54F9;
}

/// Player indicator LEDs.
pub mod leds {
    pub const LED_1: u8 = 0x10;
    pub const LED_2: u8 = 0x20;
    pub const LED_3: u8 = 0x40;
    pub const LED_4: u8 = 0x80;
}

/// Errors raised by a hardware backend
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Failed to initialize hardware backend: {0}")]
    InitializationError(String),

    #[error("Device discovery failed: {0}")]
    DiscoveryError(String),

    #[error("I/O error on slot {slot}: {message}")]
    IoError { slot: usize, message: String },

    #[error("Slot {0} is not available")]
    InvalidSlot(usize),

    #[error("Backend not initialized")]
    NotInitialized,
}

/// Orientation as computed by the hardware layer, in degrees.
///
/// `a_roll` and `a_pitch` are the unsmoothed angles taken straight from the
/// accelerometer; `roll` and `pitch` are what consumers should use.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawOrientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub a_roll: f32,
    pub a_pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickCalibration {
    pub min: [u8; 2],
    pub center: [u8; 2],
    pub max: [u8; 2],
}

impl Default for JoystickCalibration {
    fn default() -> Self {
        Self {
            min: [32, 32],
            center: [128, 128],
            max: [224, 224],
        }
    }
}

/// Analog stick with angle and magnitude already derived from x/y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JoystickState {
    pub calibration: JoystickCalibration,
    pub angle: f32,
    pub magnitude: f32,
    pub x: f32,
    pub y: f32,
}

impl JoystickState {
    /// Normalizes a raw stick reading against its calibration.
    ///
    /// `x`/`y` end up in [-1, 1] with 0 at the calibrated center. `angle` is in
    /// degrees, 0 pointing up and growing clockwise.
    pub fn from_raw(raw_x: u8, raw_y: u8, calibration: JoystickCalibration) -> Self {
        let x = normalize_axis(raw_x, calibration.min[0], calibration.center[0], calibration.max[0]);
        let y = normalize_axis(raw_y, calibration.min[1], calibration.center[1], calibration.max[1]);

        let magnitude = (x * x + y * y).sqrt();
        let mut angle = x.atan2(y).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }

        Self {
            calibration,
            angle,
            magnitude,
            x,
            y,
        }
    }
}

fn normalize_axis(raw: u8, min: u8, center: u8, max: u8) -> f32 {
    let value = if raw == center {
        0.0
    } else if raw > center {
        if max <= center {
            return 0.0;
        }
        (raw - center) as f32 / (max - center) as f32
    } else {
        if center <= min {
            return 0.0;
        }
        -((center - raw) as f32 / (center - min) as f32)
    };
    value.clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NunchukState {
    pub buttons: u8,
    pub orientation: RawOrientation,
    pub joystick: JoystickState,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassicState {
    pub buttons: u16,
    pub l_shoulder: f32,
    pub r_shoulder: f32,
    pub left_stick: JoystickState,
    pub right_stick: JoystickState,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GuitarState {
    pub buttons: u16,
    pub whammy_bar: f32,
    pub joystick: JoystickState,
}

/// Balance board corners: interpolated weights in kg plus the raw sensor values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoardState {
    pub tl: f32,
    pub tr: f32,
    pub bl: f32,
    pub br: f32,
    pub raw_tl: u16,
    pub raw_tr: u16,
    pub raw_bl: u16,
    pub raw_br: u16,
}

/// Currently attached expansion. Exactly one kind can be plugged in at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Expansion {
    #[default]
    None,
    Nunchuk(NunchukState),
    Classic(ClassicState),
    Guitar(GuitarState),
    BalanceBoard(BoardState),
}

impl Expansion {
    pub fn kind(&self) -> Option<ExpansionKind> {
        match self {
            Expansion::None => None,
            Expansion::Nunchuk(_) => Some(ExpansionKind::Nunchuk),
            Expansion::Classic(_) => Some(ExpansionKind::Classic),
            Expansion::Guitar(_) => Some(ExpansionKind::Guitar),
            Expansion::BalanceBoard(_) => Some(ExpansionKind::BalanceBoard),
        }
    }

    pub fn is_attached(&self) -> bool {
        !matches!(self, Expansion::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpansionKind {
    Nunchuk,
    Classic,
    Guitar,
    BalanceBoard,
}

/// Motion+ gyro rates in degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngularRate {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrDot {
    pub visible: bool,
    pub x: u16,
    pub y: u16,
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IrState {
    pub dots: [IrDot; 4],
    /// Pointer position on the virtual screen
    pub x: u32,
    pub y: u32,
    /// Estimated distance from the sensor bar
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub accelerometer: bool,
    pub ir: bool,
    pub speaker: bool,
    pub expansion: bool,
}

/// Snapshot of one remote after a poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoteState {
    /// 1-based device id, equal to slot index + 1
    pub id: usize,
    pub buttons: u16,
    pub buttons_prev: u16,
    pub capabilities: Capabilities,
    pub leds: u8,
    pub battery_level: f32,
    pub orientation: RawOrientation,
    pub ir: IrState,
    pub expansion: Expansion,
    /// Present while Motion+ is active; orthogonal to `expansion`
    pub motion_plus: Option<AngularRate>,
}

impl MoteState {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn is_pressed(&self, button: u16) -> bool {
        self.buttons & button == button
    }

    pub fn is_just_pressed(&self, button: u16) -> bool {
        self.is_pressed(button) && self.buttons_prev & button != button
    }

    pub fn is_released(&self, button: u16) -> bool {
        !self.is_pressed(button) && self.buttons_prev & button == button
    }

    /// Moves the current button mask into the previous one and stores `buttons`.
    pub fn push_buttons(&mut self, buttons: u16) {
        self.buttons_prev = self.buttons;
        self.buttons = buttons & mote_buttons::ALL;
    }
}

/// What happened on a slot during the last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotEvent {
    #[default]
    None,
    Event,
    Status,
    Disconnect,
    UnexpectedDisconnect,
    ReadData,
    ExpansionInserted(ExpansionKind),
    ExpansionRemoved(ExpansionKind),
    MotionPlusActivated,
    MotionPlusRemoved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPlusMode {
    #[default]
    Off,
    Standalone,
    PassThrough,
}

/// Device-configuration command sent back to a remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    MotionSensing(bool),
    IrTracking(bool),
    MotionPlus(MotionPlusMode),
    Leds(u8),
    Rumble(bool),
}

/// Device I/O primitives the polling worker is built on
///
/// A backend owns up to [`MAX_DEVICES`] device handles addressed by slot index.
/// It is created and used on the worker thread only.
pub trait MoteBackend {
    fn name(&self) -> &str;

    /// Prepares `slots` empty slots.
    fn init(&mut self, slots: usize) -> Result<(), HardwareError>;

    /// Scans for devices for at most `timeout`; returns how many were found.
    fn find(&mut self, timeout: Duration) -> Result<usize, HardwareError>;

    /// Connects to every found device; returns how many connected.
    fn connect(&mut self) -> Result<usize, HardwareError>;

    fn is_connected(&self, slot: usize) -> bool;

    /// Waits up to `timeout` for any device to report something.
    ///
    /// Returns `true` if at least one slot has an event pending.
    fn poll(&mut self, timeout: Duration) -> Result<bool, HardwareError>;

    /// Takes the event reported by `slot` in the last poll.
    fn take_event(&mut self, slot: usize) -> SlotEvent;

    fn state(&self, slot: usize) -> Option<&MoteState>;

    fn apply(&mut self, slot: usize, command: DeviceCommand) -> Result<(), HardwareError>;
}

/// Builds a backend on the worker thread.
pub type BackendFactory =
    Arc<dyn Fn() -> Result<Box<dyn MoteBackend>, HardwareError> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joystick_at_center_is_zero() {
        let js = JoystickState::from_raw(128, 128, JoystickCalibration::default());
        assert_eq!(js.x, 0.0);
        assert_eq!(js.y, 0.0);
        assert_eq!(js.magnitude, 0.0);
    }

    #[test]
    fn joystick_full_right_points_east() {
        let js = JoystickState::from_raw(224, 128, JoystickCalibration::default());
        assert!((js.x - 1.0).abs() < f32::EPSILON);
        assert!((js.magnitude - 1.0).abs() < f32::EPSILON);
        assert!((js.angle - 90.0).abs() < 0.001);
    }

    #[test]
    fn joystick_beyond_calibration_is_clamped() {
        let js = JoystickState::from_raw(0, 255, JoystickCalibration::default());
        assert_eq!(js.x, -1.0);
        assert_eq!(js.y, 1.0);
    }

    #[test]
    fn joystick_with_degenerate_calibration_reads_zero() {
        let calibration = JoystickCalibration {
            min: [128, 128],
            center: [128, 128],
            max: [128, 128],
        };
        let js = JoystickState::from_raw(200, 10, calibration);
        assert_eq!(js.x, 0.0);
        assert_eq!(js.y, 0.0);
    }

    #[test]
    fn edge_helpers_follow_previous_mask() {
        let mut state = MoteState::new(1);
        state.push_buttons(mote_buttons::A);
        assert!(state.is_just_pressed(mote_buttons::A));

        state.push_buttons(mote_buttons::A);
        assert!(state.is_pressed(mote_buttons::A));
        assert!(!state.is_just_pressed(mote_buttons::A));

        state.push_buttons(0);
        assert!(state.is_released(mote_buttons::A));
    }

    #[test]
    fn push_buttons_strips_accelerometer_bits() {
        let mut state = MoteState::new(1);
        state.push_buttons(0x0060 | mote_buttons::B);
        assert_eq!(state.buttons, mote_buttons::B);
    }

    #[test]
    fn expansion_kind_matches_variant() {
        assert_eq!(Expansion::None.kind(), None);
        assert!(!Expansion::None.is_attached());
        let board = Expansion::BalanceBoard(BoardState::default());
        assert_eq!(board.kind(), Some(ExpansionKind::BalanceBoard));
        assert!(board.is_attached());
    }
}
