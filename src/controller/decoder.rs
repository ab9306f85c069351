//! Turns one remote's raw state into a [`ControllerEvents`] record
//!
//! Decoding has no side effects on the device. Button edges that should
//! reconfigure the remote (motion sensing, IR camera, Motion+) come back as
//! [`DeviceCommand`]s for the worker to apply.

use tracing::{debug, trace};

use super::events::{BalanceBoard, ControllerEvents, Joystick, MoteButton, Orientation, Transition};
use crate::hardware::{
    classic_buttons, guitar_buttons, nunchuk_buttons, DeviceCommand, Expansion, MoteState,
    MotionPlusMode,
};

/// Result of decoding one poll cycle of one remote
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub events: ControllerEvents,
    pub commands: Vec<DeviceCommand>,
}

pub fn decode(state: &MoteState) -> Decoded {
    let mut events = ControllerEvents::new(state.id);

    for button in MoteButton::ALL {
        events.buttons[button.index()] =
            Transition::between(state.buttons_prev, state.buttons, button.wiimote_code());
    }
    trace_pressed(state);

    let commands = button_commands(state);

    if state.capabilities.accelerometer {
        let o = &state.orientation;
        debug!(
            "Mote {} roll={:.2} pitch={:.2} yaw={:.2} (accel roll={:.2} pitch={:.2})",
            state.id, o.roll, o.pitch, o.yaw, o.a_roll, o.a_pitch
        );
        events.mote_orientation = Some(Orientation::from(o));
    }

    if state.capabilities.ir {
        for (i, dot) in state.ir.dots.iter().enumerate().filter(|(_, d)| d.visible) {
            debug!("Mote {} IR dot {}: ({}, {}) size {}", state.id, i, dot.x, dot.y, dot.size);
        }
        debug!(
            "Mote {} IR cursor ({}, {}) z={:.2}",
            state.id, state.ir.x, state.ir.y, state.ir.z
        );
    }

    match &state.expansion {
        Expansion::None => {}
        Expansion::Nunchuk(nunchuk) => {
            if nunchuk.buttons & nunchuk_buttons::C != 0 {
                debug!("Mote {} nunchuk C pressed", state.id);
            }
            if nunchuk.buttons & nunchuk_buttons::Z != 0 {
                debug!("Mote {} nunchuk Z pressed", state.id);
            }
            let cal = &nunchuk.joystick.calibration;
            trace!(
                "Mote {} nunchuk joystick calibration min={:?} center={:?} max={:?}",
                state.id, cal.min, cal.center, cal.max
            );

            let orientation = Orientation::from(&nunchuk.orientation);
            let joystick = Joystick::from(&nunchuk.joystick);
            debug!(
                "Mote {} nunchuk roll={:.2} pitch={:.2} joystick angle={:.2} magnitude={:.2}",
                state.id, orientation.roll, orientation.pitch, joystick.angle, joystick.magnitude
            );
            events.chuck_orientation = Some(orientation);
            events.chuck_joystick = Some(joystick);
        }
        Expansion::Classic(classic) => {
            debug!(
                "Mote {} classic buttons=0x{:04x} (A={} B={} X={} Y={} home={}) L={:.2} R={:.2} \
                 left stick angle={:.2} mag={:.2}, right stick angle={:.2} mag={:.2}",
                state.id,
                classic.buttons,
                classic.buttons & classic_buttons::A != 0,
                classic.buttons & classic_buttons::B != 0,
                classic.buttons & classic_buttons::X != 0,
                classic.buttons & classic_buttons::Y != 0,
                classic.buttons & classic_buttons::HOME != 0,
                classic.l_shoulder,
                classic.r_shoulder,
                classic.left_stick.angle,
                classic.left_stick.magnitude,
                classic.right_stick.angle,
                classic.right_stick.magnitude
            );
        }
        Expansion::Guitar(guitar) => {
            debug!(
                "Mote {} guitar buttons=0x{:04x} (green={} red={} yellow={} blue={} orange={} \
                 strum up={} down={}) whammy={:.2} stick angle={:.2} mag={:.2}",
                state.id,
                guitar.buttons,
                guitar.buttons & guitar_buttons::GREEN != 0,
                guitar.buttons & guitar_buttons::RED != 0,
                guitar.buttons & guitar_buttons::YELLOW != 0,
                guitar.buttons & guitar_buttons::BLUE != 0,
                guitar.buttons & guitar_buttons::ORANGE != 0,
                guitar.buttons & guitar_buttons::STRUM_UP != 0,
                guitar.buttons & guitar_buttons::STRUM_DOWN != 0,
                guitar.whammy_bar,
                guitar.joystick.angle,
                guitar.joystick.magnitude
            );
        }
        Expansion::BalanceBoard(board) => {
            trace!(
                "Mote {} board raw tl={} tr={} bl={} br={}",
                state.id, board.raw_tl, board.raw_tr, board.raw_bl, board.raw_br
            );
            match BalanceBoard::from_corners(board.tl, board.tr, board.bl, board.br) {
                Some(reading) => {
                    debug!(
                        "Mote {} board total={:.2}kg center=({:.2}, {:.2})",
                        state.id, reading.total, reading.x, reading.y
                    );
                    events.balance_board = Some(reading);
                }
                None => debug!("Mote {} board carries no weight, skipped", state.id),
            }
        }
    }

    if let Some(rate) = &state.motion_plus {
        debug!(
            "Mote {} Motion+ rates pitch={:.2} roll={:.2} yaw={:.2}",
            state.id, rate.pitch, rate.roll, rate.yaw
        );
    }

    Decoded { events, commands }
}

fn button_commands(state: &MoteState) -> Vec<DeviceCommand> {
    let mut commands = Vec::new();
    let just = |button: MoteButton| state.is_just_pressed(button.wiimote_code());

    if just(MoteButton::Minus) {
        commands.push(DeviceCommand::MotionSensing(false));
    }
    if just(MoteButton::Plus) {
        commands.push(DeviceCommand::MotionSensing(true));
    }
    if just(MoteButton::Up) {
        commands.push(DeviceCommand::IrTracking(true));
    }
    if just(MoteButton::Down) {
        commands.push(DeviceCommand::IrTracking(false));
    }
    if just(MoteButton::One) {
        let mode = if state.expansion.is_attached() {
            MotionPlusMode::PassThrough
        } else {
            MotionPlusMode::Standalone
        };
        commands.push(DeviceCommand::MotionPlus(mode));
    }
    if just(MoteButton::Two) {
        commands.push(DeviceCommand::MotionPlus(MotionPlusMode::Off));
    }
    commands
}

fn trace_pressed(state: &MoteState) {
    let pressed: Vec<MoteButton> = MoteButton::ALL
        .into_iter()
        .filter(|b| state.is_pressed(b.wiimote_code()))
        .collect();
    if !pressed.is_empty() {
        trace!("Mote {} pressed: {:?}", state.id, pressed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{
        mote_buttons, BoardState, ClassicState, GuitarState, JoystickCalibration, JoystickState,
        NunchukState, RawOrientation,
    };

    fn mote(prev: u16, cur: u16) -> MoteState {
        let mut state = MoteState::new(2);
        state.push_buttons(prev);
        state.push_buttons(cur);
        state
    }

    #[test]
    fn transitions_follow_masks() {
        let decoded = decode(&mote(mote_buttons::B, mote_buttons::A));
        assert_eq!(decoded.events.id, 2);
        assert_eq!(decoded.events.transition(MoteButton::A), Transition::Pressed);
        assert_eq!(decoded.events.transition(MoteButton::B), Transition::Released);
        assert_eq!(decoded.events.transition(MoteButton::Home), Transition::None);
    }

    #[test]
    fn orientation_requires_accelerometer() {
        let mut state = mote(0, 0);
        state.orientation = RawOrientation {
            roll: 10.0,
            pitch: 20.0,
            yaw: 30.0,
            ..Default::default()
        };
        assert!(decode(&state).events.mote_orientation.is_none());

        state.capabilities.accelerometer = true;
        let orientation = decode(&state).events.mote_orientation.unwrap();
        assert_eq!(orientation.roll, 10.0);
        assert_eq!(orientation.pitch, 20.0);
        assert_eq!(orientation.yaw, 30.0);
    }

    #[test]
    fn nunchuk_is_published() {
        let mut state = mote(0, 0);
        state.expansion = Expansion::Nunchuk(NunchukState {
            buttons: nunchuk_buttons::C,
            orientation: RawOrientation {
                roll: 5.0,
                pitch: -5.0,
                ..Default::default()
            },
            joystick: JoystickState::from_raw(224, 128, JoystickCalibration::default()),
        });

        let events = decode(&state).events;
        assert_eq!(events.chuck_orientation.unwrap().roll, 5.0);
        let joystick = events.chuck_joystick.unwrap();
        assert!((joystick.x - 1.0).abs() < f32::EPSILON);
        assert!((joystick.angle - 90.0).abs() < 0.001);
        assert!(events.balance_board.is_none());
    }

    #[test]
    fn classic_and_guitar_are_diagnostic_only() {
        let mut state = mote(0, 0);
        state.expansion = Expansion::Classic(ClassicState {
            buttons: classic_buttons::A,
            ..Default::default()
        });
        let events = decode(&state).events;
        assert!(events.chuck_joystick.is_none());
        assert!(events.chuck_orientation.is_none());

        state.expansion = Expansion::Guitar(GuitarState {
            buttons: guitar_buttons::GREEN,
            ..Default::default()
        });
        let events = decode(&state).events;
        assert_eq!(events, ControllerEvents::new(2));
    }

    #[test]
    fn board_group_is_complete_or_absent() {
        let mut state = mote(0, 0);
        state.expansion = Expansion::BalanceBoard(BoardState {
            tl: 10.0,
            tr: 10.0,
            bl: 10.0,
            br: 10.0,
            ..Default::default()
        });
        let board = decode(&state).events.balance_board.unwrap();
        assert_eq!(board.total, 40.0);
        assert_eq!((board.x, board.y), (0.0, 0.0));

        state.expansion = Expansion::BalanceBoard(BoardState::default());
        assert!(decode(&state).events.balance_board.is_none());
    }

    #[test]
    fn sensor_buttons_produce_commands() {
        let decoded = decode(&mote(0, mote_buttons::MINUS | mote_buttons::UP));
        assert_eq!(
            decoded.commands,
            vec![
                DeviceCommand::MotionSensing(false),
                DeviceCommand::IrTracking(true)
            ]
        );

        let decoded = decode(&mote(0, mote_buttons::PLUS | mote_buttons::DOWN));
        assert_eq!(
            decoded.commands,
            vec![
                DeviceCommand::MotionSensing(true),
                DeviceCommand::IrTracking(false)
            ]
        );
    }

    #[test]
    fn held_buttons_do_not_repeat_commands() {
        let decoded = decode(&mote(mote_buttons::PLUS, mote_buttons::PLUS));
        assert!(decoded.commands.is_empty());
    }

    #[test]
    fn motion_plus_mode_depends_on_expansion() {
        let decoded = decode(&mote(0, mote_buttons::ONE));
        assert_eq!(
            decoded.commands,
            vec![DeviceCommand::MotionPlus(MotionPlusMode::Standalone)]
        );

        let mut state = mote(0, mote_buttons::ONE);
        state.expansion = Expansion::Nunchuk(NunchukState::default());
        assert_eq!(
            decode(&state).commands,
            vec![DeviceCommand::MotionPlus(MotionPlusMode::PassThrough)]
        );

        let decoded = decode(&mote(0, mote_buttons::TWO));
        assert_eq!(
            decoded.commands,
            vec![DeviceCommand::MotionPlus(MotionPlusMode::Off)]
        );
    }

    #[test]
    fn commands_are_not_part_of_the_record() {
        let decoded = decode(&mote(0, mote_buttons::MINUS));
        assert_eq!(decoded.events.transition(MoteButton::Minus), Transition::Pressed);
        assert!(decoded.events.mote_orientation.is_none());
    }
}
