//! Wii Remote HID report codec
//!
//! Pure encoding of output reports (host → remote) and decoding of input
//! reports (remote → host), including the extension payload formats. No I/O
//! happens here; [`super::HidBackend`] does the reading and writing.
//!
//! Every buffer starts with the report id byte.

use crate::hardware::{
    classic_buttons, guitar_buttons, mote_buttons, AngularRate, BoardState, ClassicState,
    GuitarState, IrDot, JoystickCalibration, JoystickState, NunchukState, RawOrientation,
};

pub const OUT_RUMBLE: u8 = 0x10;
pub const OUT_LEDS: u8 = 0x11;
pub const OUT_REPORT_MODE: u8 = 0x12;
pub const OUT_IR_ENABLE: u8 = 0x13;
pub const OUT_STATUS_REQUEST: u8 = 0x15;
pub const OUT_WRITE_MEMORY: u8 = 0x16;
pub const OUT_READ_MEMORY: u8 = 0x17;
pub const OUT_IR_ENABLE_2: u8 = 0x1A;

pub const IN_STATUS: u8 = 0x20;
pub const IN_READ_DATA: u8 = 0x21;
pub const IN_ACKNOWLEDGE: u8 = 0x22;

pub const MODE_BUTTONS: u8 = 0x30;
pub const MODE_BUTTONS_ACCEL: u8 = 0x31;
pub const MODE_BUTTONS_EXT8: u8 = 0x32;
pub const MODE_BUTTONS_ACCEL_IR12: u8 = 0x33;
pub const MODE_BUTTONS_EXT19: u8 = 0x34;
pub const MODE_BUTTONS_ACCEL_EXT16: u8 = 0x35;
pub const MODE_BUTTONS_IR10_EXT9: u8 = 0x36;
pub const MODE_BUTTONS_ACCEL_IR10_EXT6: u8 = 0x37;

/// Largest report the remote sends, report id included.
pub const MAX_REPORT_LEN: usize = 22;

pub const ADDR_ACCEL_CALIBRATION: u32 = 0x0000_0016;
pub const ADDR_EXT_INIT_1: u32 = 0x04A4_00F0;
pub const ADDR_EXT_INIT_2: u32 = 0x04A4_00FB;
pub const ADDR_EXT_ID: u32 = 0x04A4_00FA;
pub const ADDR_EXT_CALIBRATION: u32 = 0x04A4_0020;
pub const ADDR_BOARD_CALIBRATION: u32 = 0x04A4_0024;
pub const ADDR_MOTION_PLUS_INIT: u32 = 0x04A6_00F0;
pub const ADDR_MOTION_PLUS_MODE: u32 = 0x04A6_00FE;
pub const ADDR_IR_CONTROL: u32 = 0x04B0_0030;
pub const ADDR_IR_SENSITIVITY_1: u32 = 0x04B0_0000;
pub const ADDR_IR_SENSITIVITY_2: u32 = 0x04B0_001A;
pub const ADDR_IR_MODE: u32 = 0x04B0_0033;

/// Sensitivity blocks for the IR camera ("level 3").
pub const IR_SENSITIVITY_1: [u8; 9] = [0x02, 0x00, 0x00, 0x71, 0x01, 0x00, 0xAA, 0x00, 0x64];
pub const IR_SENSITIVITY_2: [u8; 2] = [0x63, 0x03];

pub const IR_MODE_BASIC: u8 = 0x01;
pub const IR_MODE_EXTENDED: u8 = 0x03;

/// Full-scale battery reading.
const BATTERY_MAX: f32 = 200.0;

/// Motion+ gyro units per degree per second.
const GYRO_SLOW_SCALE: f32 = 8192.0 / 595.0;
const GYRO_FAST_SCALE: f32 = 8192.0 / 2700.0;
const GYRO_ZERO: f32 = 8192.0;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report 0x{report:02x} too short: {len} bytes")]
    TooShort { report: u8, len: usize },

    #[error("Unknown report id 0x{0:02x}")]
    Unknown(u8),

    #[error("Empty report")]
    Empty,

    #[error("Write payload of {0} bytes exceeds 16")]
    PayloadTooLarge(usize),
}

fn rumble_bit(rumble: bool) -> u8 {
    u8::from(rumble)
}

pub fn rumble(on: bool) -> [u8; 2] {
    [OUT_RUMBLE, rumble_bit(on)]
}

pub fn set_leds(leds: u8, rumble: bool) -> [u8; 2] {
    [OUT_LEDS, (leds & 0xF0) | rumble_bit(rumble)]
}

pub fn set_report_mode(mode: u8, continuous: bool, rumble: bool) -> [u8; 3] {
    let flags = if continuous { 0x04 } else { 0x00 };
    [OUT_REPORT_MODE, flags | rumble_bit(rumble), mode]
}

pub fn request_status(rumble: bool) -> [u8; 2] {
    [OUT_STATUS_REQUEST, rumble_bit(rumble)]
}

/// One of the two IR camera enable reports (`OUT_IR_ENABLE` or `OUT_IR_ENABLE_2`).
pub fn ir_enable(report: u8, on: bool, rumble: bool) -> [u8; 2] {
    let flag = if on { 0x04 } else { 0x00 };
    [report, flag | rumble_bit(rumble)]
}

/// Writes up to 16 bytes at `address`. Bit 26 of the address selects the
/// register space, otherwise EEPROM is addressed.
pub fn write_memory(address: u32, data: &[u8], rumble: bool) -> Result<[u8; 22], ReportError> {
    if data.len() > 16 {
        return Err(ReportError::PayloadTooLarge(data.len()));
    }
    let mut report = [0u8; 22];
    report[0] = OUT_WRITE_MEMORY;
    report[1] = ((address >> 24) as u8 & 0x04) | rumble_bit(rumble);
    report[2] = (address >> 16) as u8;
    report[3] = (address >> 8) as u8;
    report[4] = address as u8;
    report[5] = data.len() as u8;
    report[6..6 + data.len()].copy_from_slice(data);
    Ok(report)
}

pub fn read_memory(address: u32, size: u16, rumble: bool) -> [u8; 7] {
    let [size_hi, size_lo] = size.to_be_bytes();
    [
        OUT_READ_MEMORY,
        ((address >> 24) as u8 & 0x04) | rumble_bit(rumble),
        (address >> 16) as u8,
        (address >> 8) as u8,
        address as u8,
        size_hi,
        size_lo,
    ]
}

/// Picks the smallest data reporting mode carrying everything enabled.
pub fn choose_report_mode(accelerometer: bool, ir: bool, extension: bool) -> u8 {
    match (accelerometer, ir, extension) {
        (_, true, true) => MODE_BUTTONS_ACCEL_IR10_EXT6,
        (_, true, false) => MODE_BUTTONS_ACCEL_IR12,
        (true, false, true) => MODE_BUTTONS_ACCEL_EXT16,
        (false, false, true) => MODE_BUTTONS_EXT8,
        (true, false, false) => MODE_BUTTONS_ACCEL,
        (false, false, false) => MODE_BUTTONS,
    }
}

/// IR camera format expected for a reporting mode.
pub fn ir_mode_for(report_mode: u8) -> u8 {
    if report_mode == MODE_BUTTONS_ACCEL_IR12 {
        IR_MODE_EXTENDED
    } else {
        IR_MODE_BASIC
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub buttons: u16,
    pub battery_low: bool,
    pub extension: bool,
    pub speaker: bool,
    pub ir: bool,
    pub leds: u8,
    pub battery: u8,
}

impl StatusReport {
    pub fn battery_level(&self) -> f32 {
        (self.battery as f32 / BATTERY_MAX).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReply {
    pub buttons: u16,
    pub size: usize,
    pub error: u8,
    /// Low 16 bits of the address the data was read from
    pub offset: u16,
    pub data: [u8; 16],
}

impl ReadReply {
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.size.min(16)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReport {
    pub mode: u8,
    pub buttons: u16,
    pub accel: Option<[u16; 3]>,
    pub ir: Option<[IrDot; 4]>,
    pub extension: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputReport {
    Status(StatusReport),
    ReadData(ReadReply),
    Acknowledge { buttons: u16, report: u8, error: u8 },
    Data(DataReport),
}

fn require(buf: &[u8], len: usize) -> Result<(), ReportError> {
    if buf.len() < len {
        Err(ReportError::TooShort {
            report: buf[0],
            len: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn parse_buttons(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]]) & mote_buttons::ALL
}

/// Accelerometer values with the two low bits hidden in the button bytes.
fn parse_accel(buttons: &[u8], accel: &[u8]) -> [u16; 3] {
    let x = ((accel[0] as u16) << 2) | ((buttons[0] as u16 >> 5) & 0x03);
    let y = ((accel[1] as u16) << 2) | ((buttons[1] as u16 >> 4) & 0x02);
    let z = ((accel[2] as u16) << 2) | ((buttons[1] as u16 >> 5) & 0x02);
    [x, y, z]
}

pub fn parse_ir_extended(bytes: &[u8]) -> [IrDot; 4] {
    let mut dots = [IrDot::default(); 4];
    for (i, dot) in dots.iter_mut().enumerate() {
        let p = &bytes[i * 3..i * 3 + 3];
        let x = p[0] as u16 | (((p[2] as u16 >> 4) & 0x03) << 8);
        let y = p[1] as u16 | (((p[2] as u16 >> 6) & 0x03) << 8);
        *dot = IrDot {
            visible: y != 0x3FF,
            x,
            y,
            size: p[2] & 0x0F,
        };
    }
    dots
}

pub fn parse_ir_basic(bytes: &[u8]) -> [IrDot; 4] {
    let mut dots = [IrDot::default(); 4];
    for pair in 0..2 {
        let p = &bytes[pair * 5..pair * 5 + 5];
        let first_x = p[0] as u16 | (((p[2] as u16 >> 4) & 0x03) << 8);
        let first_y = p[1] as u16 | (((p[2] as u16 >> 6) & 0x03) << 8);
        let second_x = p[3] as u16 | ((p[2] as u16 & 0x03) << 8);
        let second_y = p[4] as u16 | (((p[2] as u16 >> 2) & 0x03) << 8);
        dots[pair * 2] = IrDot {
            visible: first_y != 0x3FF,
            x: first_x,
            y: first_y,
            size: 0,
        };
        dots[pair * 2 + 1] = IrDot {
            visible: second_y != 0x3FF,
            x: second_x,
            y: second_y,
            size: 0,
        };
    }
    dots
}

pub fn parse_input(buf: &[u8]) -> Result<InputReport, ReportError> {
    let Some(&id) = buf.first() else {
        return Err(ReportError::Empty);
    };
    let body = &buf[1..];

    match id {
        IN_STATUS => {
            require(buf, 7)?;
            let flags = body[2];
            Ok(InputReport::Status(StatusReport {
                buttons: parse_buttons(body),
                battery_low: flags & 0x01 != 0,
                extension: flags & 0x02 != 0,
                speaker: flags & 0x04 != 0,
                ir: flags & 0x08 != 0,
                leds: flags & 0xF0,
                battery: body[5],
            }))
        }
        IN_READ_DATA => {
            require(buf, 22)?;
            let mut data = [0u8; 16];
            data.copy_from_slice(&body[5..21]);
            Ok(InputReport::ReadData(ReadReply {
                buttons: parse_buttons(body),
                size: ((body[2] >> 4) as usize) + 1,
                error: body[2] & 0x0F,
                offset: u16::from_be_bytes([body[3], body[4]]),
                data,
            }))
        }
        IN_ACKNOWLEDGE => {
            require(buf, 5)?;
            Ok(InputReport::Acknowledge {
                buttons: parse_buttons(body),
                report: body[2],
                error: body[3],
            })
        }
        MODE_BUTTONS..=MODE_BUTTONS_ACCEL_IR10_EXT6 => {
            let (accel_len, ir_len, ext_len) = match id {
                MODE_BUTTONS => (0, 0, 0),
                MODE_BUTTONS_ACCEL => (3, 0, 0),
                MODE_BUTTONS_EXT8 => (0, 0, 8),
                MODE_BUTTONS_ACCEL_IR12 => (3, 12, 0),
                MODE_BUTTONS_EXT19 => (0, 0, 19),
                MODE_BUTTONS_ACCEL_EXT16 => (3, 0, 16),
                MODE_BUTTONS_IR10_EXT9 => (0, 10, 9),
                _ => (3, 10, 6),
            };
            require(buf, 3 + accel_len + ir_len + ext_len)?;

            let buttons = &body[0..2];
            let mut at = 2;
            let accel = (accel_len > 0).then(|| parse_accel(buttons, &body[at..at + 3]));
            at += accel_len;
            let ir = match ir_len {
                12 => Some(parse_ir_extended(&body[at..at + 12])),
                10 => Some(parse_ir_basic(&body[at..at + 10])),
                _ => None,
            };
            at += ir_len;
            let extension = body[at..at + ext_len].to_vec();

            Ok(InputReport::Data(DataReport {
                mode: id,
                buttons: parse_buttons(buttons),
                accel,
                ir,
                extension,
            }))
        }
        other => Err(ReportError::Unknown(other)),
    }
}

/// Extension identifier read from `ADDR_EXT_ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionId {
    None,
    Nunchuk,
    Classic,
    Guitar,
    BalanceBoard,
    MotionPlus,
    MotionPlusNunchuk,
    MotionPlusClassic,
    Unknown([u8; 6]),
}

impl ExtensionId {
    pub fn identify(id: &[u8]) -> Self {
        let Ok(id) = <[u8; 6]>::try_from(id) else {
            return ExtensionId::None;
        };
        match id {
            [_, _, 0xA4, 0x20, 0x00, 0x00] => ExtensionId::Nunchuk,
            [_, _, 0xA4, 0x20, 0x01, 0x01] => ExtensionId::Classic,
            [_, _, 0xA4, 0x20, 0x01, 0x03] => ExtensionId::Guitar,
            [_, _, 0xA4, 0x20, 0x04, 0x02] => ExtensionId::BalanceBoard,
            [_, _, 0xA4, 0x20, 0x04, 0x05] => ExtensionId::MotionPlus,
            [_, _, 0xA4, 0x20, 0x05, 0x05] => ExtensionId::MotionPlusNunchuk,
            [_, _, 0xA4, 0x20, 0x07, 0x05] => ExtensionId::MotionPlusClassic,
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF] | [0, 0, 0, 0, 0, 0] => ExtensionId::None,
            other => ExtensionId::Unknown(other),
        }
    }

    pub fn has_motion_plus(&self) -> bool {
        matches!(
            self,
            ExtensionId::MotionPlus | ExtensionId::MotionPlusNunchuk | ExtensionId::MotionPlusClassic
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelCalibration {
    pub zero: [u16; 3],
    pub one_g: [u16; 3],
}

impl Default for AccelCalibration {
    fn default() -> Self {
        Self {
            zero: [512, 512, 512],
            one_g: [616, 616, 616],
        }
    }
}

impl AccelCalibration {
    /// Parses the remote's calibration block; the first three bytes are the
    /// zero point, bytes 4..7 the 1g point.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 7 {
            return None;
        }
        let zero = [
            (data[0] as u16) << 2,
            (data[1] as u16) << 2,
            (data[2] as u16) << 2,
        ];
        let one_g = [
            (data[4] as u16) << 2,
            (data[5] as u16) << 2,
            (data[6] as u16) << 2,
        ];
        if (0..3).any(|i| one_g[i] <= zero[i]) {
            return None;
        }
        Some(Self { zero, one_g })
    }

    /// Roll and pitch from gravity. Yaw cannot be derived from the
    /// accelerometer and stays at 0.
    pub fn orientation(&self, accel: [u16; 3]) -> RawOrientation {
        let axis = |i: usize| {
            let span = (self.one_g[i] as f32 - self.zero[i] as f32).max(1.0);
            ((accel[i] as f32 - self.zero[i] as f32) / span).clamp(-1.0, 1.0)
        };
        let (x, y, z) = (axis(0), axis(1), axis(2));
        let roll = x.atan2(z).to_degrees();
        let pitch = y.atan2(z).to_degrees();
        RawOrientation {
            roll,
            pitch,
            yaw: 0.0,
            a_roll: roll,
            a_pitch: pitch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NunchukCalibration {
    pub accel: AccelCalibration,
    pub joystick: JoystickCalibration,
}

impl NunchukCalibration {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 14 {
            return None;
        }
        let accel = AccelCalibration::parse(&data[0..8])?;
        let joystick = JoystickCalibration {
            max: [data[8], data[11]],
            min: [data[9], data[12]],
            center: [data[10], data[13]],
        };
        if joystick.min[0] >= joystick.max[0] || joystick.min[1] >= joystick.max[1] {
            return None;
        }
        Some(Self { accel, joystick })
    }
}

/// Balance board sensor values at 0 kg, 17 kg and 34 kg, per corner
/// in report order (TR, BR, TL, BL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardCalibration {
    pub points: [[u16; 3]; 4],
}

impl BoardCalibration {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 24 {
            return None;
        }
        let mut points = [[0u16; 3]; 4];
        for (level, block) in data[..24].chunks_exact(8).enumerate() {
            for corner in 0..4 {
                points[corner][level] =
                    u16::from_be_bytes([block[corner * 2], block[corner * 2 + 1]]);
            }
        }
        Some(Self { points })
    }

    fn interpolate(raw: u16, [zero, mid, full]: [u16; 3]) -> f32 {
        let raw = raw as f32;
        let (zero, mid, full) = (zero as f32, mid as f32, full as f32);
        if raw < mid {
            if mid <= zero {
                return 0.0;
            }
            17.0 * (raw - zero) / (mid - zero)
        } else {
            if full <= mid {
                return 17.0;
            }
            17.0 + 17.0 * (raw - mid) / (full - mid)
        }
    }
}

pub fn parse_board(data: &[u8], calibration: Option<&BoardCalibration>) -> Option<BoardState> {
    if data.len() < 8 {
        return None;
    }
    let raw = |i: usize| u16::from_be_bytes([data[i * 2], data[i * 2 + 1]]);
    let (raw_tr, raw_br, raw_tl, raw_bl) = (raw(0), raw(1), raw(2), raw(3));

    let weight = |corner: usize, value: u16| match calibration {
        Some(cal) => BoardCalibration::interpolate(value, cal.points[corner]),
        None => value as f32,
    };

    Some(BoardState {
        tr: weight(0, raw_tr),
        br: weight(1, raw_br),
        tl: weight(2, raw_tl),
        bl: weight(3, raw_bl),
        raw_tl,
        raw_tr,
        raw_bl,
        raw_br,
    })
}

pub fn parse_nunchuk(data: &[u8], calibration: &NunchukCalibration) -> Option<NunchukState> {
    if data.len() < 6 {
        return None;
    }
    let accel = [
        ((data[2] as u16) << 2) | ((data[5] as u16 >> 2) & 0x03),
        ((data[3] as u16) << 2) | ((data[5] as u16 >> 4) & 0x03),
        ((data[4] as u16) << 2) | ((data[5] as u16 >> 6) & 0x03),
    ];
    Some(NunchukState {
        buttons: !data[5] & 0x03,
        orientation: calibration.accel.orientation(accel),
        joystick: JoystickState::from_raw(data[0], data[1], calibration.joystick),
    })
}

/// Nunchuk frame interleaved with Motion+ data in pass-through mode.
pub fn parse_nunchuk_passthrough(
    data: &[u8],
    calibration: &NunchukCalibration,
) -> Option<NunchukState> {
    if data.len() < 6 {
        return None;
    }
    let accel = [
        ((data[2] as u16) << 2) | ((data[5] as u16 >> 3) & 0x02),
        ((data[3] as u16) << 2) | ((data[5] as u16 >> 4) & 0x02),
        (((data[4] & 0xFE) as u16) << 2) | ((data[5] as u16 >> 5) & 0x06),
    ];
    let mut buttons = 0;
    if data[5] & 0x04 == 0 {
        buttons |= crate::hardware::nunchuk_buttons::Z;
    }
    if data[5] & 0x08 == 0 {
        buttons |= crate::hardware::nunchuk_buttons::C;
    }
    Some(NunchukState {
        buttons,
        orientation: calibration.accel.orientation(accel),
        joystick: JoystickState::from_raw(data[0], data[1], calibration.joystick),
    })
}

/// Motion+ frames carry bit 1 of the last byte set; nunchuk frames in
/// pass-through mode have it cleared.
pub fn is_motion_plus_frame(data: &[u8]) -> bool {
    data.len() >= 6 && data[5] & 0x02 != 0
}

pub fn parse_motion_plus(data: &[u8]) -> Option<AngularRate> {
    if data.len() < 6 {
        return None;
    }
    let yaw = data[0] as u16 | (((data[3] & 0xFC) as u16) << 6);
    let roll = data[1] as u16 | (((data[4] & 0xFC) as u16) << 6);
    let pitch = data[2] as u16 | (((data[5] & 0xFC) as u16) << 6);

    let scale = |raw: u16, slow: bool| {
        let units = if slow { GYRO_SLOW_SCALE } else { GYRO_FAST_SCALE };
        (raw as f32 - GYRO_ZERO) / units
    };

    Some(AngularRate {
        yaw: scale(yaw, data[3] & 0x02 != 0),
        pitch: scale(pitch, data[3] & 0x01 != 0),
        roll: scale(roll, data[4] & 0x02 != 0),
    })
}

pub fn parse_classic(data: &[u8]) -> Option<ClassicState> {
    if data.len() < 6 {
        return None;
    }
    let left_x = data[0] & 0x3F;
    let left_y = data[1] & 0x3F;
    let right_x = ((data[0] & 0xC0) >> 3) | ((data[1] & 0xC0) >> 5) | ((data[2] & 0x80) >> 7);
    let right_y = data[2] & 0x1F;
    let left_trigger = ((data[2] & 0x60) >> 2) | ((data[3] & 0xE0) >> 5);
    let right_trigger = data[3] & 0x1F;

    let calibration = JoystickCalibration::default();
    Some(ClassicState {
        buttons: !u16::from_be_bytes([data[4], data[5]]) & classic_buttons::ALL,
        l_shoulder: left_trigger as f32 / 31.0,
        r_shoulder: right_trigger as f32 / 31.0,
        left_stick: JoystickState::from_raw(left_x << 2, left_y << 2, calibration),
        right_stick: JoystickState::from_raw(right_x << 3, right_y << 3, calibration),
    })
}

pub fn parse_guitar(data: &[u8]) -> Option<GuitarState> {
    if data.len() < 6 {
        return None;
    }
    let whammy = data[3] & 0x1F;
    Some(GuitarState {
        buttons: !u16::from_be_bytes([data[4], data[5]]) & guitar_buttons::ALL,
        whammy_bar: (whammy.saturating_sub(16) as f32 / 15.0).clamp(0.0, 1.0),
        joystick: JoystickState::from_raw(
            (data[0] & 0x3F) << 2,
            (data[1] & 0x3F) << 2,
            JoystickCalibration::default(),
        ),
    })
}

/// Pointer position and distance estimate from the visible dots.
pub fn ir_cursor(dots: &[IrDot; 4]) -> (u32, u32, f32) {
    let visible: Vec<&IrDot> = dots.iter().filter(|d| d.visible).collect();
    if visible.is_empty() {
        return (0, 0, 0.0);
    }
    let count = visible.len() as u32;
    let x = visible.iter().map(|d| d.x as u32).sum::<u32>() / count;
    let y = visible.iter().map(|d| d.y as u32).sum::<u32>() / count;

    let z = if visible.len() >= 2 {
        let dx = visible[0].x as f32 - visible[1].x as f32;
        let dy = visible[0].y as f32 - visible[1].y as f32;
        let separation = (dx * dx + dy * dy).sqrt();
        if separation > 0.0 {
            1023.0 / separation
        } else {
            0.0
        }
    } else {
        0.0
    };
    (x, y, z)
}
