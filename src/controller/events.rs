use std::fmt;

use crate::hardware::{mote_buttons, JoystickState, RawOrientation};

/// Number of logical buttons on the remote
pub const BUTTON_COUNT: usize = 11;

// Logical buttons, in the order their transitions are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoteButton {
    One,
    Two,
    B,
    A,
    Up,
    Down,
    Left,
    Right,
    Minus,
    Plus,
    Home,
}

impl MoteButton {
    pub const ALL: [MoteButton; BUTTON_COUNT] = [
        MoteButton::One,
        MoteButton::Two,
        MoteButton::B,
        MoteButton::A,
        MoteButton::Up,
        MoteButton::Down,
        MoteButton::Left,
        MoteButton::Right,
        MoteButton::Minus,
        MoteButton::Plus,
        MoteButton::Home,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    // Hardware bit for this button
    pub fn wiimote_code(self) -> u16 {
        match self {
            MoteButton::One => mote_buttons::ONE,
            MoteButton::Two => mote_buttons::TWO,
            MoteButton::B => mote_buttons::B,
            MoteButton::A => mote_buttons::A,
            MoteButton::Up => mote_buttons::UP,
            MoteButton::Down => mote_buttons::DOWN,
            MoteButton::Left => mote_buttons::LEFT,
            MoteButton::Right => mote_buttons::RIGHT,
            MoteButton::Minus => mote_buttons::MINUS,
            MoteButton::Plus => mote_buttons::PLUS,
            MoteButton::Home => mote_buttons::HOME,
        }
    }
}

impl fmt::Display for MoteButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// Edge of a single button between two polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    #[default]
    None,
    Pressed,
    Released,
}

impl Transition {
    /// Compares `bit` in the previous and current button masks.
    pub fn between(previous: u16, current: u16, bit: u16) -> Self {
        let was = previous & bit == bit;
        let is = current & bit == bit;
        match (was, is) {
            (false, true) => Transition::Pressed,
            (true, false) => Transition::Released,
            _ => Transition::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl From<&RawOrientation> for Orientation {
    fn from(raw: &RawOrientation) -> Self {
        Self {
            pitch: raw.pitch,
            roll: raw.roll,
            yaw: raw.yaw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Joystick {
    pub angle: f32,
    pub magnitude: f32,
    pub x: f32,
    pub y: f32,
}

impl From<&JoystickState> for Joystick {
    fn from(raw: &JoystickState) -> Self {
        Self {
            angle: raw.angle,
            magnitude: raw.magnitude,
            x: raw.x,
            y: raw.y,
        }
    }
}

/// Balance board reading with the derived center of pressure.
///
/// `x` grows towards the right edge and `y` towards the top edge; both are
/// in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceBoard {
    pub tl: f32,
    pub tr: f32,
    pub bl: f32,
    pub br: f32,
    pub total: f32,
    pub x: f32,
    pub y: f32,
}

impl BalanceBoard {
    /// Returns `None` when nothing stands on the board, since the center of
    /// pressure is undefined then.
    pub fn from_corners(tl: f32, tr: f32, bl: f32, br: f32) -> Option<Self> {
        let total = tl + tr + bl + br;
        if !total.is_finite() || total <= 0.0 {
            return None;
        }

        let x = (((tr + br) / total) * 2.0 - 1.0).clamp(-1.0, 1.0);
        let y = (((tl + tr) / total) * 2.0 - 1.0).clamp(-1.0, 1.0);

        Some(Self {
            tl,
            tr,
            bl,
            br,
            total,
            x,
            y,
        })
    }
}

/// Normalized snapshot of one remote, produced once per poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerEvents {
    // 1-based device id
    pub id: usize,

    pub buttons: [Transition; BUTTON_COUNT],

    pub mote_orientation: Option<Orientation>,
    pub chuck_orientation: Option<Orientation>,
    pub chuck_joystick: Option<Joystick>,
    pub balance_board: Option<BalanceBoard>,
}

impl ControllerEvents {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            buttons: [Transition::None; BUTTON_COUNT],
            mote_orientation: None,
            chuck_orientation: None,
            chuck_joystick: None,
            balance_board: None,
        }
    }

    pub fn transition(&self, button: MoteButton) -> Transition {
        self.buttons[button.index()]
    }

    /// Buttons with an edge this cycle, in ordinal order.
    pub fn changed_buttons(&self) -> impl Iterator<Item = (MoteButton, Transition)> + '_ {
        MoteButton::ALL
            .iter()
            .map(|button| (*button, self.buttons[button.index()]))
            .filter(|(_, transition)| *transition != Transition::None)
    }
}
