//! Per-remote report handling
//!
//! A [`Remote`] consumes at most one event-carrying report per poll. Button
//! edges are computed between consecutive data reports, so every report that
//! changes the mask has to be decoded before the next one is read; whatever
//! is still queued is picked up by the following poll.

use std::collections::VecDeque;
use std::fmt::Display;

use hidapi::HidDevice;
use tracing::{debug, info, warn};

use super::report::{
    self, AccelCalibration, BoardCalibration, ExtensionId, InputReport, NunchukCalibration,
    ReadReply, StatusReport,
};
use crate::hardware::{
    DeviceCommand, Expansion, ExpansionKind, HardwareError, IrState, MoteState, MotionPlusMode,
    SlotEvent,
};

/// Upper bound on reports read from one remote per poll.
const MAX_REPORTS_PER_POLL: usize = 32;

/// Raw report I/O of one remote
pub trait ReportLink {
    type Error: Display;

    fn write_report(&self, report: &[u8]) -> Result<(), Self::Error>;

    /// Reads one input report into `buf`; `Ok(0)` if none arrived in time.
    fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, Self::Error>;
}

impl ReportLink for HidDevice {
    type Error = hidapi::HidError;

    fn write_report(&self, report: &[u8]) -> Result<(), Self::Error> {
        self.write(report).map(|_| ())
    }

    fn read_report(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, Self::Error> {
        self.read_timeout(buf, timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadTarget {
    AccelCalibration,
    ExtensionId,
    NunchukCalibration,
    BoardCalibration,
}

#[derive(Debug)]
struct PendingRead {
    target: ReadTarget,
    address: u32,
    size: u16,
    sent: bool,
    data: Vec<u8>,
}

pub struct Remote<L: ReportLink> {
    slot: usize,
    link: L,
    pub(super) state: MoteState,
    pub(super) connected: bool,
    pub(super) event: SlotEvent,

    rumble: bool,
    motion_sensing: bool,
    ir: bool,
    motion_plus: MotionPlusMode,
    report_mode: u8,

    /// Extension plugged in according to the last status report
    extension_present: bool,
    extension: ExtensionId,

    accel_calibration: AccelCalibration,
    nunchuk_calibration: NunchukCalibration,
    board_calibration: Option<BoardCalibration>,
    reads: VecDeque<PendingRead>,
}

impl<L: ReportLink> Remote<L> {
    pub fn new(slot: usize, link: L) -> Self {
        Self {
            slot,
            link,
            state: MoteState::new(slot + 1),
            connected: true,
            event: SlotEvent::None,
            rumble: false,
            motion_sensing: false,
            ir: false,
            motion_plus: MotionPlusMode::Off,
            report_mode: report::MODE_BUTTONS,
            extension_present: false,
            extension: ExtensionId::None,
            accel_calibration: AccelCalibration::default(),
            nunchuk_calibration: NunchukCalibration::default(),
            board_calibration: None,
            reads: VecDeque::new(),
        }
    }

    fn io_error(&self, message: impl ToString) -> HardwareError {
        HardwareError::IoError {
            slot: self.slot,
            message: message.to_string(),
        }
    }

    fn send(&self, report: &[u8]) -> Result<(), HardwareError> {
        self.link
            .write_report(report)
            .map_err(|e| self.io_error(e))
    }

    fn write_register(&self, address: u32, data: &[u8]) -> Result<(), HardwareError> {
        let report = report::write_memory(address, data, self.rumble).map_err(|e| self.io_error(e))?;
        self.send(&report)
    }

    /// Asks for status, calibration and a buttons-only report stream.
    pub fn setup(&mut self) -> Result<(), HardwareError> {
        self.send(&report::request_status(self.rumble))?;
        self.queue_read(ReadTarget::AccelCalibration, report::ADDR_ACCEL_CALIBRATION, 10)?;
        self.update_report_mode()
    }

    /// Extension events raised while handling a status report win over the
    /// plain status event raised after them.
    fn raise(&mut self, event: SlotEvent) {
        if matches!(self.event, SlotEvent::None | SlotEvent::ReadData) {
            self.event = event;
        }
    }

    fn update_report_mode(&mut self) -> Result<(), HardwareError> {
        let mode = report::choose_report_mode(self.motion_sensing, self.ir, self.extension_present);
        let continuous = self.motion_sensing || self.ir || self.extension_present;

        if self.ir && report::ir_mode_for(mode) != report::ir_mode_for(self.report_mode) {
            self.write_register(report::ADDR_IR_MODE, &[report::ir_mode_for(mode)])?;
        }
        self.send(&report::set_report_mode(mode, continuous, self.rumble))?;
        self.report_mode = mode;
        Ok(())
    }

    fn queue_read(&mut self, target: ReadTarget, address: u32, size: u16) -> Result<(), HardwareError> {
        self.reads.push_back(PendingRead {
            target,
            address,
            size,
            sent: false,
            data: Vec::with_capacity(size as usize),
        });
        self.send_next_read()
    }

    fn send_next_read(&mut self) -> Result<(), HardwareError> {
        let rumble = self.rumble;
        let Some(next) = self.reads.front_mut() else {
            return Ok(());
        };
        if next.sent {
            return Ok(());
        }
        next.sent = true;
        let request = report::read_memory(next.address, next.size, rumble);
        self.send(&request)
    }

    pub fn apply(&mut self, command: DeviceCommand) -> Result<(), HardwareError> {
        match command {
            DeviceCommand::MotionSensing(on) => {
                self.motion_sensing = on;
                self.state.capabilities.accelerometer = on;
                self.update_report_mode()
            }
            DeviceCommand::IrTracking(on) => self.set_ir(on),
            DeviceCommand::MotionPlus(mode) => self.set_motion_plus(mode),
            DeviceCommand::Leds(mask) => {
                self.state.leds = mask;
                self.send(&report::set_leds(mask, self.rumble))
            }
            DeviceCommand::Rumble(on) => {
                self.rumble = on;
                self.send(&report::rumble(on))
            }
        }
    }

    fn set_ir(&mut self, on: bool) -> Result<(), HardwareError> {
        if on == self.ir {
            return Ok(());
        }
        if on {
            let mode = report::choose_report_mode(self.motion_sensing, true, self.extension_present);
            self.send(&report::ir_enable(report::OUT_IR_ENABLE, true, self.rumble))?;
            self.send(&report::ir_enable(report::OUT_IR_ENABLE_2, true, self.rumble))?;
            self.write_register(report::ADDR_IR_CONTROL, &[0x08])?;
            self.write_register(report::ADDR_IR_SENSITIVITY_1, &report::IR_SENSITIVITY_1)?;
            self.write_register(report::ADDR_IR_SENSITIVITY_2, &report::IR_SENSITIVITY_2)?;
            self.write_register(report::ADDR_IR_MODE, &[report::ir_mode_for(mode)])?;
            self.write_register(report::ADDR_IR_CONTROL, &[0x08])?;
        } else {
            self.send(&report::ir_enable(report::OUT_IR_ENABLE, false, self.rumble))?;
            self.send(&report::ir_enable(report::OUT_IR_ENABLE_2, false, self.rumble))?;
            self.state.ir = IrState::default();
        }
        self.ir = on;
        self.state.capabilities.ir = on;
        // Force the IR format to be rewritten on the next mode change.
        self.report_mode = report::choose_report_mode(self.motion_sensing, on, self.extension_present);
        self.update_report_mode()
    }

    /// Activation makes the remote report the current extension as unplugged
    /// and then the Motion+ as plugged in; the status handler takes it from there.
    fn set_motion_plus(&mut self, mode: MotionPlusMode) -> Result<(), HardwareError> {
        if mode == self.motion_plus {
            return Ok(());
        }
        match mode {
            MotionPlusMode::Off => {
                self.write_register(report::ADDR_EXT_INIT_1, &[0x55])?;
            }
            MotionPlusMode::Standalone => {
                self.write_register(report::ADDR_MOTION_PLUS_INIT, &[0x55])?;
                self.write_register(report::ADDR_MOTION_PLUS_MODE, &[0x04])?;
            }
            MotionPlusMode::PassThrough => {
                self.write_register(report::ADDR_MOTION_PLUS_INIT, &[0x55])?;
                self.write_register(report::ADDR_MOTION_PLUS_MODE, &[0x05])?;
            }
        }
        debug!("Slot {} Motion+ mode set to {:?}", self.slot, mode);
        self.motion_plus = mode;
        Ok(())
    }

    /// Reads reports until one of them raises an event, waiting at most
    /// `wait_ms` for the first. Acknowledgements and partial memory reads
    /// are consumed on the way. Returns whether an event is pending.
    pub fn drain(&mut self, wait_ms: i32) -> bool {
        let mut buf = [0u8; report::MAX_REPORT_LEN];
        for i in 0..MAX_REPORTS_PER_POLL {
            if self.event != SlotEvent::None {
                break;
            }
            let timeout = if i == 0 { wait_ms } else { 0 };
            match self.link.read_report(&mut buf, timeout) {
                Ok(0) => break,
                Ok(len) => match report::parse_input(&buf[..len]) {
                    Ok(input) => {
                        if let Err(e) = self.handle(input) {
                            warn!("Slot {} failed to handle report: {}", self.slot, e);
                        }
                    }
                    Err(e) => debug!("Slot {} ignoring report: {}", self.slot, e),
                },
                Err(e) => {
                    warn!("Slot {} read failed, remote lost: {}", self.slot, e);
                    self.connected = false;
                    self.event = SlotEvent::UnexpectedDisconnect;
                    break;
                }
            }
        }
        self.event != SlotEvent::None
    }

    fn handle(&mut self, input: InputReport) -> Result<(), HardwareError> {
        match input {
            InputReport::Data(data) => {
                self.state.push_buttons(data.buttons);
                if let (Some(accel), true) = (data.accel, self.motion_sensing) {
                    self.state.orientation = self.accel_calibration.orientation(accel);
                }
                if let Some(dots) = data.ir {
                    let (x, y, z) = report::ir_cursor(&dots);
                    self.state.ir = IrState { dots, x, y, z };
                }
                if !data.extension.is_empty() {
                    self.decode_extension(&data.extension);
                }
                self.raise(SlotEvent::Event);
                Ok(())
            }
            InputReport::Status(status) => self.handle_status(status),
            InputReport::ReadData(reply) => self.handle_read(reply),
            InputReport::Acknowledge { report, error, .. } => {
                if error != 0 {
                    warn!(
                        "Slot {} rejected output report 0x{:02x} (error {})",
                        self.slot, report, error
                    );
                }
                Ok(())
            }
        }
    }

    fn decode_extension(&mut self, bytes: &[u8]) {
        match self.extension {
            ExtensionId::Nunchuk => {
                if let Some(nunchuk) = report::parse_nunchuk(bytes, &self.nunchuk_calibration) {
                    self.state.expansion = Expansion::Nunchuk(nunchuk);
                }
            }
            ExtensionId::Classic => {
                if let Some(classic) = report::parse_classic(bytes) {
                    self.state.expansion = Expansion::Classic(classic);
                }
            }
            ExtensionId::Guitar => {
                if let Some(guitar) = report::parse_guitar(bytes) {
                    self.state.expansion = Expansion::Guitar(guitar);
                }
            }
            ExtensionId::BalanceBoard => {
                if let Some(board) = report::parse_board(bytes, self.board_calibration.as_ref()) {
                    self.state.expansion = Expansion::BalanceBoard(board);
                }
            }
            ExtensionId::MotionPlus | ExtensionId::MotionPlusNunchuk | ExtensionId::MotionPlusClassic => {
                if report::is_motion_plus_frame(bytes) {
                    self.state.motion_plus = report::parse_motion_plus(bytes);
                } else if self.extension == ExtensionId::MotionPlusNunchuk {
                    if let Some(nunchuk) =
                        report::parse_nunchuk_passthrough(bytes, &self.nunchuk_calibration)
                    {
                        self.state.expansion = Expansion::Nunchuk(nunchuk);
                    }
                }
            }
            ExtensionId::None | ExtensionId::Unknown(_) => {}
        }
    }

    // Buttons in a status report are left alone: only data reports move the
    // edge baseline, otherwise a press first seen here would never be decoded.
    fn handle_status(&mut self, status: StatusReport) -> Result<(), HardwareError> {
        self.state.leds = status.leds;
        self.state.battery_level = status.battery_level();
        self.state.capabilities.speaker = status.speaker;
        self.state.capabilities.ir = status.ir;
        if status.battery_low {
            debug!("Slot {} battery low", self.slot);
        }

        if status.extension && !self.extension_present {
            self.extension_present = true;
            self.init_extension()?;
        } else if !status.extension && self.extension_present {
            self.extension_present = false;
            self.remove_extension();
        }

        self.raise(SlotEvent::Status);
        // The remote stops streaming after a status report until the mode is set again.
        self.update_report_mode()
    }

    fn init_extension(&mut self) -> Result<(), HardwareError> {
        // Writing 0x55 here would switch an active Motion+ off again.
        if self.motion_plus == MotionPlusMode::Off {
            self.write_register(report::ADDR_EXT_INIT_1, &[0x55])?;
            self.write_register(report::ADDR_EXT_INIT_2, &[0x00])?;
        }
        self.queue_read(ReadTarget::ExtensionId, report::ADDR_EXT_ID, 6)
    }

    fn remove_extension(&mut self) {
        let event = if self.extension.has_motion_plus() {
            self.state.motion_plus = None;
            SlotEvent::MotionPlusRemoved
        } else if let Some(kind) = self.state.expansion.kind() {
            SlotEvent::ExpansionRemoved(kind)
        } else {
            SlotEvent::Status
        };
        info!("Slot {} extension {:?} removed", self.slot, self.extension);

        self.extension = ExtensionId::None;
        self.state.expansion = Expansion::None;
        self.state.capabilities.expansion = false;
        self.reads.retain(|read| {
            !matches!(
                read.target,
                ReadTarget::NunchukCalibration | ReadTarget::BoardCalibration
            ) || read.sent
        });
        self.raise(event);
    }

    fn handle_read(&mut self, reply: ReadReply) -> Result<(), HardwareError> {
        let Some(read) = self.reads.front_mut() else {
            self.raise(SlotEvent::ReadData);
            return Ok(());
        };

        if reply.error != 0 {
            let target = read.target;
            self.reads.pop_front();
            warn!(
                "Slot {} memory read for {:?} failed (error {})",
                self.slot, target, reply.error
            );
            return self.send_next_read();
        }

        read.data.extend_from_slice(reply.payload());
        if read.data.len() < read.size as usize {
            return Ok(());
        }

        if let Some(read) = self.reads.pop_front() {
            self.finish_read(read)?;
        }
        self.send_next_read()
    }

    fn finish_read(&mut self, read: PendingRead) -> Result<(), HardwareError> {
        match read.target {
            ReadTarget::AccelCalibration => match AccelCalibration::parse(&read.data) {
                Some(calibration) => self.accel_calibration = calibration,
                None => debug!("Slot {} has no usable accelerometer calibration", self.slot),
            },
            ReadTarget::ExtensionId => self.identify_extension(ExtensionId::identify(&read.data))?,
            ReadTarget::NunchukCalibration => {
                self.nunchuk_calibration =
                    NunchukCalibration::parse(&read.data).unwrap_or_default();
                self.raise(SlotEvent::ExpansionInserted(ExpansionKind::Nunchuk));
            }
            ReadTarget::BoardCalibration => {
                self.board_calibration = BoardCalibration::parse(&read.data);
                if self.board_calibration.is_none() {
                    warn!("Slot {} balance board calibration unreadable", self.slot);
                }
                self.raise(SlotEvent::ExpansionInserted(ExpansionKind::BalanceBoard));
            }
        }
        Ok(())
    }

    fn identify_extension(&mut self, id: ExtensionId) -> Result<(), HardwareError> {
        info!("Slot {} extension identified as {:?}", self.slot, id);
        self.extension = id;
        self.state.capabilities.expansion = !matches!(id, ExtensionId::None);

        match id {
            ExtensionId::Nunchuk => {
                self.state.expansion = Expansion::Nunchuk(Default::default());
                self.queue_read(ReadTarget::NunchukCalibration, report::ADDR_EXT_CALIBRATION, 16)?;
            }
            ExtensionId::Classic => {
                self.state.expansion = Expansion::Classic(Default::default());
                self.raise(SlotEvent::ExpansionInserted(ExpansionKind::Classic));
            }
            ExtensionId::Guitar => {
                self.state.expansion = Expansion::Guitar(Default::default());
                self.raise(SlotEvent::ExpansionInserted(ExpansionKind::Guitar));
            }
            ExtensionId::BalanceBoard => {
                self.state.expansion = Expansion::BalanceBoard(Default::default());
                self.queue_read(ReadTarget::BoardCalibration, report::ADDR_BOARD_CALIBRATION, 24)?;
            }
            ExtensionId::MotionPlus | ExtensionId::MotionPlusClassic => {
                self.state.motion_plus = Some(Default::default());
                self.raise(SlotEvent::MotionPlusActivated);
            }
            ExtensionId::MotionPlusNunchuk => {
                self.state.motion_plus = Some(Default::default());
                self.state.expansion = Expansion::Nunchuk(Default::default());
                self.raise(SlotEvent::MotionPlusActivated);
            }
            ExtensionId::Unknown(raw) => {
                warn!("Slot {} unsupported extension {:02x?}", self.slot, raw);
            }
            ExtensionId::None => {}
        }
        self.update_report_mode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mote_buttons;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct ScriptedLink {
        incoming: RefCell<VecDeque<Vec<u8>>>,
        written: RefCell<Vec<Vec<u8>>>,
        broken: Cell<bool>,
    }

    impl ReportLink for ScriptedLink {
        type Error = String;

        fn write_report(&self, report: &[u8]) -> Result<(), String> {
            self.written.borrow_mut().push(report.to_vec());
            Ok(())
        }

        fn read_report(&self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize, String> {
            if self.broken.get() {
                return Err("device unplugged".to_string());
            }
            match self.incoming.borrow_mut().pop_front() {
                Some(report) => {
                    buf[..report.len()].copy_from_slice(&report);
                    Ok(report.len())
                }
                None => Ok(0),
            }
        }
    }

    fn remote(reports: impl IntoIterator<Item = Vec<u8>>) -> Remote<ScriptedLink> {
        let remote = Remote::new(0, ScriptedLink::default());
        remote.link.incoming.borrow_mut().extend(reports);
        remote
    }

    fn feed(remote: &Remote<ScriptedLink>, report: Vec<u8>) {
        remote.link.incoming.borrow_mut().push_back(report);
    }

    fn buttons(mask: u16) -> Vec<u8> {
        let [hi, lo] = mask.to_be_bytes();
        vec![report::MODE_BUTTONS, hi, lo]
    }

    fn status(flags: u8) -> Vec<u8> {
        vec![report::IN_STATUS, 0, 0, flags, 0, 0, 0xC0]
    }

    fn ack() -> Vec<u8> {
        vec![report::IN_ACKNOWLEDGE, 0, 0, report::OUT_REPORT_MODE, 0]
    }

    fn read_reply(data: &[u8]) -> Vec<u8> {
        let mut reply = vec![report::IN_READ_DATA, 0, 0, ((data.len() - 1) as u8) << 4, 0, 0];
        let mut payload = [0u8; 16];
        payload[..data.len()].copy_from_slice(data);
        reply.extend_from_slice(&payload);
        reply
    }

    // One poll's worth: drain, then hand the event to the caller.
    fn poll(remote: &mut Remote<ScriptedLink>) -> SlotEvent {
        remote.drain(0);
        std::mem::take(&mut remote.event)
    }

    fn plug_in(remote: &mut Remote<ScriptedLink>, id: [u8; 6]) {
        feed(remote, status(0x02));
        assert_eq!(poll(remote), SlotEvent::Status);
        feed(remote, read_reply(&id));
    }

    #[test]
    fn press_then_hold_keeps_the_press_edge() {
        let mut remote = remote([buttons(mote_buttons::A), buttons(mote_buttons::A)]);

        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert!(remote.state.is_just_pressed(mote_buttons::A));

        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert!(remote.state.is_pressed(mote_buttons::A));
        assert!(!remote.state.is_just_pressed(mote_buttons::A));
    }

    #[test]
    fn quick_tap_yields_press_and_release() {
        let mut remote = remote([buttons(mote_buttons::PLUS), buttons(0)]);

        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert!(remote.state.is_just_pressed(mote_buttons::PLUS));
        assert_eq!(remote.link.incoming.borrow().len(), 1);

        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert!(remote.state.is_released(mote_buttons::PLUS));
    }

    #[test]
    fn status_does_not_replace_a_data_record() {
        let mut remote = remote([buttons(mote_buttons::B), status(0x00)]);

        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert_eq!(poll(&mut remote), SlotEvent::Status);
        assert_eq!(poll(&mut remote), SlotEvent::None);
    }

    #[test]
    fn status_buttons_do_not_move_the_edge_baseline() {
        let mut remote = remote([
            vec![report::IN_STATUS, 0x00, 0x08, 0x00, 0, 0, 0xC0],
            buttons(mote_buttons::A),
        ]);

        assert_eq!(poll(&mut remote), SlotEvent::Status);
        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert!(remote.state.is_just_pressed(mote_buttons::A));
    }

    #[test]
    fn acknowledgements_are_consumed_in_passing() {
        let mut remote = remote([ack(), ack(), buttons(mote_buttons::HOME)]);
        assert_eq!(poll(&mut remote), SlotEvent::Event);
        assert!(remote.link.incoming.borrow().is_empty());
    }

    #[test]
    fn read_error_is_an_unexpected_disconnect() {
        let mut remote = remote([]);
        remote.link.broken.set(true);

        assert!(remote.drain(5));
        assert_eq!(remote.event, SlotEvent::UnexpectedDisconnect);
        assert!(!remote.connected);
    }

    #[test]
    fn nunchuk_is_announced_after_its_calibration() {
        let mut remote = remote([]);
        plug_in(&mut remote, [0x00, 0x00, 0xA4, 0x20, 0x00, 0x00]);
        assert!(remote
            .link
            .written
            .borrow()
            .contains(&report::read_memory(report::ADDR_EXT_ID, 6, false).to_vec()));

        // identification alone raises nothing, the calibration read follows
        assert_eq!(poll(&mut remote), SlotEvent::None);
        assert!(remote
            .link
            .written
            .borrow()
            .contains(&report::read_memory(report::ADDR_EXT_CALIBRATION, 16, false).to_vec()));

        feed(&remote, read_reply(&[0u8; 16]));
        assert_eq!(
            poll(&mut remote),
            SlotEvent::ExpansionInserted(ExpansionKind::Nunchuk)
        );
        assert_eq!(remote.state.expansion.kind(), Some(ExpansionKind::Nunchuk));
        assert!(remote.state.capabilities.expansion);
    }

    #[test]
    fn classic_is_announced_on_identification() {
        let mut remote = remote([]);
        plug_in(&mut remote, [0x00, 0x00, 0xA4, 0x20, 0x01, 0x01]);
        assert_eq!(
            poll(&mut remote),
            SlotEvent::ExpansionInserted(ExpansionKind::Classic)
        );

        feed(&remote, status(0x00));
        assert_eq!(
            poll(&mut remote),
            SlotEvent::ExpansionRemoved(ExpansionKind::Classic)
        );
        assert_eq!(remote.state.expansion.kind(), None);
        assert!(!remote.state.capabilities.expansion);
    }

    #[test]
    fn motion_plus_activation_and_removal() {
        let mut remote = remote([]);
        plug_in(&mut remote, [0x00, 0x00, 0xA4, 0x20, 0x04, 0x05]);
        assert_eq!(poll(&mut remote), SlotEvent::MotionPlusActivated);
        assert!(remote.state.motion_plus.is_some());

        feed(&remote, status(0x00));
        assert_eq!(poll(&mut remote), SlotEvent::MotionPlusRemoved);
        assert!(remote.state.motion_plus.is_none());
    }

    #[test]
    fn unsolicited_read_reply_is_reported() {
        let mut remote = remote([read_reply(&[1, 2, 3])]);
        assert_eq!(poll(&mut remote), SlotEvent::ReadData);
    }

    #[test]
    fn status_re_arms_the_report_mode() {
        let mut remote = remote([status(0x00)]);
        remote.apply(DeviceCommand::MotionSensing(true)).unwrap();
        remote.link.written.borrow_mut().clear();

        poll(&mut remote);
        assert_eq!(
            remote.link.written.borrow().last(),
            Some(&report::set_report_mode(report::MODE_BUTTONS_ACCEL, true, false).to_vec())
        );
    }
}
