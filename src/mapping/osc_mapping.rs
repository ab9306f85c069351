//! Translation of [`ControllerEvents`] into OSC messages
//!
//! Every address is prefixed with `/wiimo/<id>`:
//!
//! | address            | arguments                       |
//! |--------------------|---------------------------------|
//! | `mote/button/<i>`  | bool, true = pressed            |
//! | `mote/rpy`         | roll, pitch, yaw                |
//! | `chuck/joy`        | angle, magnitude, x, y          |
//! | `board/xy`         | x, y                            |
//! | `board/raw`        | tr, tl, br, bl                  |
//! | `board/total`      | total weight                    |
//!
//! Only button edges are sent; a held button produces nothing.

use rosc::OscType;
use tracing::trace;

use super::sink::MessageSink;
use crate::controller::{ControllerEvents, Transition};

pub const DEFAULT_PREFIX: &str = "/wiimo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OscMapping {
    prefix: String,
}

impl Default for OscMapping {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl OscMapping {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn address(&self, id: usize, path: &str) -> String {
        format!("{}/{}/{}", self.prefix, id, path)
    }

    /// Messages for one record, in a fixed order: buttons by ordinal, then
    /// mote, nunchuk and board groups.
    pub fn map(&self, events: &ControllerEvents) -> Vec<(String, Vec<OscType>)> {
        let mut messages = Vec::new();
        let id = events.id;

        for (button, transition) in events.changed_buttons() {
            messages.push((
                self.address(id, &format!("mote/button/{}", button.index())),
                vec![OscType::Bool(transition == Transition::Pressed)],
            ));
        }

        if let Some(rpy) = &events.mote_orientation {
            messages.push((
                self.address(id, "mote/rpy"),
                floats(&[rpy.roll, rpy.pitch, rpy.yaw]),
            ));
        }

        if let Some(joy) = &events.chuck_joystick {
            messages.push((
                self.address(id, "chuck/joy"),
                floats(&[joy.angle, joy.magnitude, joy.x, joy.y]),
            ));
        }

        if let Some(board) = &events.balance_board {
            messages.push((self.address(id, "board/xy"), floats(&[board.x, board.y])));
            messages.push((
                self.address(id, "board/raw"),
                floats(&[board.tr, board.tl, board.br, board.bl]),
            ));
            messages.push((self.address(id, "board/total"), floats(&[board.total])));
        }

        messages
    }

    /// Sends the messages for `events` to `sink`. Returns false without
    /// sending anything if the sink is not ready.
    pub fn translate<S>(&self, events: &ControllerEvents, sink: &mut S) -> bool
    where
        S: MessageSink + ?Sized,
    {
        if !sink.is_ready() {
            trace!("Sink not ready, dropping record for device {}", events.id);
            return false;
        }

        for (address, args) in self.map(events) {
            if !sink.send(&address, args) {
                trace!("Message to {} was not sent", address);
            }
        }
        true
    }
}

fn floats(values: &[f32]) -> Vec<OscType> {
    values.iter().map(|v| OscType::Float(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{BalanceBoard, Joystick, MoteButton, Orientation};
    use crate::mapping::sink::RecordingSink;

    #[test]
    fn button_and_orientation() {
        let mut events = ControllerEvents::new(1);
        events.buttons[MoteButton::A.index()] = Transition::Pressed;
        events.mote_orientation = Some(Orientation {
            roll: 1.0,
            pitch: 2.0,
            yaw: 3.0,
        });

        let mut sink = RecordingSink::new();
        assert!(OscMapping::default().translate(&events, &mut sink));

        assert_eq!(
            sink.find("/wiimo/1/mote/button/3"),
            Some(&[OscType::Bool(true)][..])
        );
        assert_eq!(
            sink.find("/wiimo/1/mote/rpy"),
            Some(&[OscType::Float(1.0), OscType::Float(2.0), OscType::Float(3.0)][..])
        );
        assert_eq!(sink.messages.len(), 2);
    }

    #[test]
    fn balanced_board() {
        let mut events = ControllerEvents::new(2);
        events.balance_board = BalanceBoard::from_corners(10.0, 10.0, 10.0, 10.0);

        let mut sink = RecordingSink::new();
        OscMapping::default().translate(&events, &mut sink);

        assert_eq!(
            sink.addresses(),
            vec!["/wiimo/2/board/xy", "/wiimo/2/board/raw", "/wiimo/2/board/total"]
        );
        assert_eq!(
            sink.find("/wiimo/2/board/xy"),
            Some(&[OscType::Float(0.0), OscType::Float(0.0)][..])
        );
        assert_eq!(sink.find("/wiimo/2/board/raw").map(<[OscType]>::len), Some(4));
        assert_eq!(
            sink.find("/wiimo/2/board/total"),
            Some(&[OscType::Float(40.0)][..])
        );
    }

    #[test]
    fn raw_board_order_is_tr_tl_br_bl() {
        let mut events = ControllerEvents::new(1);
        events.balance_board = BalanceBoard::from_corners(1.0, 2.0, 3.0, 4.0);
        let messages = OscMapping::default().map(&events);
        let (_, raw) = &messages[1];
        assert_eq!(
            raw,
            &vec![
                OscType::Float(2.0),
                OscType::Float(1.0),
                OscType::Float(4.0),
                OscType::Float(3.0)
            ]
        );
    }

    #[test]
    fn release_sends_false_and_idle_buttons_nothing() {
        let mut events = ControllerEvents::new(4);
        events.buttons[MoteButton::Home.index()] = Transition::Released;
        let messages = OscMapping::default().map(&events);
        assert_eq!(
            messages,
            vec![(
                "/wiimo/4/mote/button/10".to_string(),
                vec![OscType::Bool(false)]
            )]
        );
    }

    #[test]
    fn nunchuk_joystick() {
        let mut events = ControllerEvents::new(1);
        events.chuck_joystick = Some(Joystick {
            angle: 90.0,
            magnitude: 1.0,
            x: 1.0,
            y: 0.0,
        });
        let mut sink = RecordingSink::new();
        OscMapping::default().translate(&events, &mut sink);
        assert_eq!(
            sink.find("/wiimo/1/chuck/joy"),
            Some(
                &[
                    OscType::Float(90.0),
                    OscType::Float(1.0),
                    OscType::Float(1.0),
                    OscType::Float(0.0)
                ][..]
            )
        );
    }

    #[test]
    fn nothing_is_sent_when_sink_is_not_ready() {
        let mut events = ControllerEvents::new(1);
        events.buttons[MoteButton::A.index()] = Transition::Pressed;
        let mut sink = RecordingSink {
            ready: false,
            ..Default::default()
        };
        assert!(!OscMapping::default().translate(&events, &mut sink));
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn custom_prefix_drops_trailing_slash() {
        let mapping = OscMapping::new("/stage/");
        assert_eq!(mapping.address(3, "mote/rpy"), "/stage/3/mote/rpy");
    }
}
