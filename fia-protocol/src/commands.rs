//! Command codes and typed commands for the control channel
//!
//! All multi-byte parameters are big-endian. Scroll buffer updates use
//! sentinel values to mean "leave unchanged": `0xFF` for the side byte,
//! `0xFFFF` for unsigned 16-bit fields and `0x7FFF` for signed steps.

use crate::frame::{Frame, FrameError, MAX_PARAMS_SIZE};
use heapless::Vec;

pub const CMD_NULL: u8 = 0x00;
pub const CMD_MCU_RESET: u8 = 0x01;

pub const CMD_SET_BACKLIGHT_STATE: u8 = 0x10;
pub const CMD_GET_BACKLIGHT_STATE: u8 = 0x11;
pub const CMD_SET_BACKLIGHT_BASE_BRIGHTNESS: u8 = 0x12;
pub const CMD_GET_BACKLIGHT_BASE_BRIGHTNESS: u8 = 0x13;
pub const CMD_GET_BACKLIGHT_BRIGHTNESS: u8 = 0x14;

pub const CMD_SET_HEATERS_STATE: u8 = 0x20;
pub const CMD_GET_HEATERS_STATE: u8 = 0x21;
pub const CMD_SET_CIRCULATION_FANS_STATE: u8 = 0x22;
pub const CMD_GET_CIRCULATION_FANS_STATE: u8 = 0x23;
pub const CMD_SET_HEAT_EXCHANGER_FAN_STATE: u8 = 0x24;
pub const CMD_GET_HEAT_EXCHANGER_FAN_STATE: u8 = 0x25;
pub const CMD_SET_BACKLIGHT_BALLAST_FANS_STATE: u8 = 0x26;
pub const CMD_GET_BACKLIGHT_BALLAST_FANS_STATE: u8 = 0x27;

pub const CMD_GET_DOOR_STATES: u8 = 0x30;

pub const CMD_GET_TEMPERATURES: u8 = 0x40;
pub const CMD_GET_HUMIDITY: u8 = 0x41;
pub const CMD_GET_ENV_BRIGHTNESS: u8 = 0x42;

pub const CMD_SET_LCD_CONTRAST: u8 = 0x50;
pub const CMD_GET_LCD_CONTRAST: u8 = 0x51;

pub const CMD_CREATE_SCROLL_BUFFER: u8 = 0x60;
pub const CMD_DELETE_SCROLL_BUFFER: u8 = 0x61;
pub const CMD_UPDATE_SCROLL_BUFFER: u8 = 0x62;
pub const CMD_SET_DESTINATION_BUFFER: u8 = 0x63;
pub const CMD_GET_DESTINATION_BUFFER: u8 = 0x64;
pub const CMD_SET_MASK_ENABLED: u8 = 0x65;
pub const CMD_GET_MASK_ENABLED: u8 = 0x66;

/// "Leave unchanged" marker for the side byte of an update
pub const SIDE_UNCHANGED: u8 = 0xFF;
/// "Leave unchanged" marker for unsigned 16-bit update fields
pub const U16_UNCHANGED: u16 = 0xFFFF;
/// "Leave unchanged" marker for signed 16-bit update fields
pub const I16_UNCHANGED: i16 = 0x7FFF;

/// Errors raised while decoding a command from a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Unknown command code
    UnknownCommand(u8),
    /// Fewer parameter bytes than the command requires
    MissingParams,
    /// A parameter byte is outside its allowed set
    InvalidParam,
}

/// Display side selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    #[default]
    None,
    A,
    B,
    Both,
}

impl Side {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Side::None),
            0x01 => Some(Side::A),
            0x02 => Some(Side::B),
            0x03 => Some(Side::Both),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Side::None => 0x00,
            Side::A => 0x01,
            Side::B => 0x02,
            Side::Both => 0x03,
        }
    }

    /// Build a side from per-side flags
    pub fn from_flags(a: bool, b: bool) -> Self {
        match (a, b) {
            (false, false) => Side::None,
            (true, false) => Side::A,
            (false, true) => Side::B,
            (true, true) => Side::Both,
        }
    }

    pub fn includes_a(self) -> bool {
        matches!(self, Side::A | Side::Both)
    }

    pub fn includes_b(self) -> bool {
        matches!(self, Side::B | Side::Both)
    }
}

/// Switchable climate actuators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Actuator {
    Heaters,
    CirculationFans,
    HeatExchangerFan,
    BacklightBallastFans,
}

/// Full parameter set for creating a scroll buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScrollBufferSpec {
    pub side: Side,
    pub disp_x: u16,
    pub disp_y: u16,
    pub disp_w: u16,
    pub disp_h: u16,
    pub int_w: u16,
    pub int_h: u16,
    pub offset_x: u16,
    pub offset_y: u16,
    pub speed_x: u16,
    pub speed_y: u16,
    pub step_x: i16,
    pub step_y: i16,
}

/// Partial scroll buffer update; `None` leaves the field unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScrollBufferUpdate {
    pub side: Option<Side>,
    pub disp_x: Option<u16>,
    pub disp_y: Option<u16>,
    pub disp_w: Option<u16>,
    pub disp_h: Option<u16>,
    pub offset_x: Option<u16>,
    pub offset_y: Option<u16>,
    pub speed_x: Option<u16>,
    pub speed_y: Option<u16>,
    pub step_x: Option<i16>,
    pub step_y: Option<i16>,
}

impl ScrollBufferUpdate {
    /// True if the update moves, resizes or re-sides the display window
    pub fn changes_geometry(&self) -> bool {
        self.side.is_some()
            || self.disp_x.is_some()
            || self.disp_y.is_some()
            || self.disp_w.is_some()
            || self.disp_h.is_some()
    }
}

/// Commands received from the host controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Null,
    McuReset,
    SetBacklightState(bool),
    GetBacklightState,
    SetBacklightBaseBrightness { side_a: i16, side_b: i16 },
    GetBacklightBaseBrightness,
    GetBacklightBrightness,
    SetActuator(Actuator, u8),
    GetActuator(Actuator),
    GetDoorStates,
    GetTemperatures,
    GetHumidity,
    GetEnvBrightness,
    SetLcdContrast { side_a: u16, side_b: u16 },
    GetLcdContrast,
    CreateScrollBuffer(ScrollBufferSpec),
    DeleteScrollBuffer { id: u8 },
    UpdateScrollBuffer { id: u8, update: ScrollBufferUpdate },
    /// Raw destination selector byte; validated by the receiver
    SetDestinationBuffer { selector: u8 },
    GetDestinationBuffer,
    SetMaskEnabled(bool),
    GetMaskEnabled,
}

/// Sequential big-endian reader over command parameters
struct ParamReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ParamReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn u8(&mut self) -> Result<u8, CommandError> {
        let byte = *self.data.get(self.pos).ok_or(CommandError::MissingParams)?;
        self.pos += 1;
        Ok(byte)
    }

    fn u16(&mut self) -> Result<u16, CommandError> {
        let hi = self.u8()?;
        let lo = self.u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn i16(&mut self) -> Result<i16, CommandError> {
        Ok(self.u16()? as i16)
    }

    fn side(&mut self) -> Result<Side, CommandError> {
        Side::from_byte(self.u8()?).ok_or(CommandError::InvalidParam)
    }

    fn opt_side(&mut self) -> Result<Option<Side>, CommandError> {
        match self.u8()? {
            SIDE_UNCHANGED => Ok(None),
            byte => Side::from_byte(byte)
                .map(Some)
                .ok_or(CommandError::InvalidParam),
        }
    }

    fn opt_u16(&mut self) -> Result<Option<u16>, CommandError> {
        let value = self.u16()?;
        Ok((value != U16_UNCHANGED).then_some(value))
    }

    fn opt_i16(&mut self) -> Result<Option<i16>, CommandError> {
        let value = self.i16()?;
        Ok((value != I16_UNCHANGED).then_some(value))
    }
}

impl Command {
    /// Parse a command from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, CommandError> {
        let mut p = ParamReader::new(&frame.params);

        let cmd = match frame.command {
            CMD_NULL => Command::Null,
            CMD_MCU_RESET => Command::McuReset,
            CMD_SET_BACKLIGHT_STATE => Command::SetBacklightState(p.u8()? != 0),
            CMD_GET_BACKLIGHT_STATE => Command::GetBacklightState,
            CMD_SET_BACKLIGHT_BASE_BRIGHTNESS => Command::SetBacklightBaseBrightness {
                side_a: p.i16()?,
                side_b: p.i16()?,
            },
            CMD_GET_BACKLIGHT_BASE_BRIGHTNESS => Command::GetBacklightBaseBrightness,
            CMD_GET_BACKLIGHT_BRIGHTNESS => Command::GetBacklightBrightness,
            CMD_SET_HEATERS_STATE => Command::SetActuator(Actuator::Heaters, p.u8()?),
            CMD_GET_HEATERS_STATE => Command::GetActuator(Actuator::Heaters),
            CMD_SET_CIRCULATION_FANS_STATE => {
                Command::SetActuator(Actuator::CirculationFans, p.u8()?)
            }
            CMD_GET_CIRCULATION_FANS_STATE => Command::GetActuator(Actuator::CirculationFans),
            CMD_SET_HEAT_EXCHANGER_FAN_STATE => {
                Command::SetActuator(Actuator::HeatExchangerFan, p.u8()?)
            }
            CMD_GET_HEAT_EXCHANGER_FAN_STATE => Command::GetActuator(Actuator::HeatExchangerFan),
            CMD_SET_BACKLIGHT_BALLAST_FANS_STATE => {
                Command::SetActuator(Actuator::BacklightBallastFans, p.u8()?)
            }
            CMD_GET_BACKLIGHT_BALLAST_FANS_STATE => {
                Command::GetActuator(Actuator::BacklightBallastFans)
            }
            CMD_GET_DOOR_STATES => Command::GetDoorStates,
            CMD_GET_TEMPERATURES => Command::GetTemperatures,
            CMD_GET_HUMIDITY => Command::GetHumidity,
            CMD_GET_ENV_BRIGHTNESS => Command::GetEnvBrightness,
            CMD_SET_LCD_CONTRAST => Command::SetLcdContrast {
                side_a: p.u16()?,
                side_b: p.u16()?,
            },
            CMD_GET_LCD_CONTRAST => Command::GetLcdContrast,
            CMD_CREATE_SCROLL_BUFFER => Command::CreateScrollBuffer(ScrollBufferSpec {
                side: p.side()?,
                disp_x: p.u16()?,
                disp_y: p.u16()?,
                disp_w: p.u16()?,
                disp_h: p.u16()?,
                int_w: p.u16()?,
                int_h: p.u16()?,
                offset_x: p.u16()?,
                offset_y: p.u16()?,
                speed_x: p.u16()?,
                speed_y: p.u16()?,
                step_x: p.i16()?,
                step_y: p.i16()?,
            }),
            CMD_DELETE_SCROLL_BUFFER => Command::DeleteScrollBuffer { id: p.u8()? },
            CMD_UPDATE_SCROLL_BUFFER => Command::UpdateScrollBuffer {
                id: p.u8()?,
                update: ScrollBufferUpdate {
                    side: p.opt_side()?,
                    disp_x: p.opt_u16()?,
                    disp_y: p.opt_u16()?,
                    disp_w: p.opt_u16()?,
                    disp_h: p.opt_u16()?,
                    offset_x: p.opt_u16()?,
                    offset_y: p.opt_u16()?,
                    speed_x: p.opt_u16()?,
                    speed_y: p.opt_u16()?,
                    step_x: p.opt_i16()?,
                    step_y: p.opt_i16()?,
                },
            },
            CMD_SET_DESTINATION_BUFFER => Command::SetDestinationBuffer { selector: p.u8()? },
            CMD_GET_DESTINATION_BUFFER => Command::GetDestinationBuffer,
            CMD_SET_MASK_ENABLED => Command::SetMaskEnabled(p.u8()? != 0),
            CMD_GET_MASK_ENABLED => Command::GetMaskEnabled,
            other => return Err(CommandError::UnknownCommand(other)),
        };

        Ok(cmd)
    }

    /// Encode this command into a frame (for host tools and tests)
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let mut params = Vec::<u8, MAX_PARAMS_SIZE>::new();
        let code = self.encode_params(&mut params)?;
        Frame::new(code, &params)
    }

    fn encode_params(&self, out: &mut Vec<u8, MAX_PARAMS_SIZE>) -> Result<u8, FrameError> {
        fn put(out: &mut Vec<u8, MAX_PARAMS_SIZE>, bytes: &[u8]) -> Result<(), FrameError> {
            out.extend_from_slice(bytes)
                .map_err(|_| FrameError::PayloadTooLarge)
        }
        fn opt16(v: Option<u16>) -> [u8; 2] {
            v.unwrap_or(U16_UNCHANGED).to_be_bytes()
        }
        fn opt_i16(v: Option<i16>) -> [u8; 2] {
            v.unwrap_or(I16_UNCHANGED).to_be_bytes()
        }

        let code = match *self {
            Command::Null => CMD_NULL,
            Command::McuReset => CMD_MCU_RESET,
            Command::SetBacklightState(on) => {
                put(out, &[on as u8])?;
                CMD_SET_BACKLIGHT_STATE
            }
            Command::GetBacklightState => CMD_GET_BACKLIGHT_STATE,
            Command::SetBacklightBaseBrightness { side_a, side_b } => {
                put(out, &side_a.to_be_bytes())?;
                put(out, &side_b.to_be_bytes())?;
                CMD_SET_BACKLIGHT_BASE_BRIGHTNESS
            }
            Command::GetBacklightBaseBrightness => CMD_GET_BACKLIGHT_BASE_BRIGHTNESS,
            Command::GetBacklightBrightness => CMD_GET_BACKLIGHT_BRIGHTNESS,
            Command::SetActuator(actuator, state) => {
                put(out, &[state])?;
                match actuator {
                    Actuator::Heaters => CMD_SET_HEATERS_STATE,
                    Actuator::CirculationFans => CMD_SET_CIRCULATION_FANS_STATE,
                    Actuator::HeatExchangerFan => CMD_SET_HEAT_EXCHANGER_FAN_STATE,
                    Actuator::BacklightBallastFans => CMD_SET_BACKLIGHT_BALLAST_FANS_STATE,
                }
            }
            Command::GetActuator(actuator) => match actuator {
                Actuator::Heaters => CMD_GET_HEATERS_STATE,
                Actuator::CirculationFans => CMD_GET_CIRCULATION_FANS_STATE,
                Actuator::HeatExchangerFan => CMD_GET_HEAT_EXCHANGER_FAN_STATE,
                Actuator::BacklightBallastFans => CMD_GET_BACKLIGHT_BALLAST_FANS_STATE,
            },
            Command::GetDoorStates => CMD_GET_DOOR_STATES,
            Command::GetTemperatures => CMD_GET_TEMPERATURES,
            Command::GetHumidity => CMD_GET_HUMIDITY,
            Command::GetEnvBrightness => CMD_GET_ENV_BRIGHTNESS,
            Command::SetLcdContrast { side_a, side_b } => {
                put(out, &side_a.to_be_bytes())?;
                put(out, &side_b.to_be_bytes())?;
                CMD_SET_LCD_CONTRAST
            }
            Command::GetLcdContrast => CMD_GET_LCD_CONTRAST,
            Command::CreateScrollBuffer(spec) => {
                put(out, &[spec.side.to_byte()])?;
                for field in [
                    spec.disp_x,
                    spec.disp_y,
                    spec.disp_w,
                    spec.disp_h,
                    spec.int_w,
                    spec.int_h,
                    spec.offset_x,
                    spec.offset_y,
                    spec.speed_x,
                    spec.speed_y,
                ] {
                    put(out, &field.to_be_bytes())?;
                }
                put(out, &spec.step_x.to_be_bytes())?;
                put(out, &spec.step_y.to_be_bytes())?;
                CMD_CREATE_SCROLL_BUFFER
            }
            Command::DeleteScrollBuffer { id } => {
                put(out, &[id])?;
                CMD_DELETE_SCROLL_BUFFER
            }
            Command::UpdateScrollBuffer { id, update } => {
                let side = update.side.map(Side::to_byte).unwrap_or(SIDE_UNCHANGED);
                put(out, &[id, side])?;
                for field in [
                    update.disp_x,
                    update.disp_y,
                    update.disp_w,
                    update.disp_h,
                    update.offset_x,
                    update.offset_y,
                    update.speed_x,
                    update.speed_y,
                ] {
                    put(out, &opt16(field))?;
                }
                put(out, &opt_i16(update.step_x))?;
                put(out, &opt_i16(update.step_y))?;
                CMD_UPDATE_SCROLL_BUFFER
            }
            Command::SetDestinationBuffer { selector } => {
                put(out, &[selector])?;
                CMD_SET_DESTINATION_BUFFER
            }
            Command::GetDestinationBuffer => CMD_GET_DESTINATION_BUFFER,
            Command::SetMaskEnabled(on) => {
                put(out, &[on as u8])?;
                CMD_SET_MASK_ENABLED
            }
            Command::GetMaskEnabled => CMD_GET_MASK_ENABLED,
        };

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contrast_big_endian() {
        let frame = Frame::new(CMD_SET_LCD_CONTRAST, &[0x08, 0x00, 0x01, 0x02]).unwrap();
        assert_eq!(
            Command::from_frame(&frame),
            Ok(Command::SetLcdContrast {
                side_a: 0x0800,
                side_b: 0x0102
            })
        );
    }

    #[test]
    fn test_parse_create_scroll_buffer() {
        let params = [
            0x03, // both sides
            0x00, 10, 0x00, 3, 0x00, 50, 0x00, 10, // window
            0x00, 200, 0x00, 64, // internal size
            0x00, 0, 0x00, 5, // offsets
            0x00, 2, 0x00, 0, // speeds
            0xFF, 0xFF, 0x00, 0x00, // steps (-1, 0)
        ];
        let frame = Frame::new(CMD_CREATE_SCROLL_BUFFER, &params).unwrap();
        let Command::CreateScrollBuffer(spec) = Command::from_frame(&frame).unwrap() else {
            panic!("wrong command");
        };

        assert_eq!(spec.side, Side::Both);
        assert_eq!((spec.disp_x, spec.disp_y, spec.disp_w, spec.disp_h), (10, 3, 50, 10));
        assert_eq!((spec.int_w, spec.int_h), (200, 64));
        assert_eq!(spec.offset_y, 5);
        assert_eq!(spec.speed_x, 2);
        assert_eq!(spec.step_x, -1);
    }

    #[test]
    fn test_update_sentinels_decode_to_none() {
        let mut params = [0xFFu8; 22];
        params[0] = 0x80;
        // step_x = 0x7FFF sentinel, step_y = -3
        params[18] = 0x7F;
        params[19] = 0xFF;
        params[20] = 0xFF;
        params[21] = 0xFD;
        let frame = Frame::new(CMD_UPDATE_SCROLL_BUFFER, &params).unwrap();

        let Command::UpdateScrollBuffer { id, update } = Command::from_frame(&frame).unwrap()
        else {
            panic!("wrong command");
        };
        assert_eq!(id, 0x80);
        assert_eq!(update.side, None);
        assert_eq!(update.disp_x, None);
        assert_eq!(update.speed_y, None);
        assert_eq!(update.step_x, None);
        assert_eq!(update.step_y, Some(-3));
        assert!(!update.changes_geometry());
    }

    #[test]
    fn test_missing_params() {
        let frame = Frame::new(CMD_SET_LCD_CONTRAST, &[0x08, 0x00]).unwrap();
        assert_eq!(Command::from_frame(&frame), Err(CommandError::MissingParams));
    }

    #[test]
    fn test_unknown_command() {
        let frame = Frame::empty(0x7E);
        assert_eq!(
            Command::from_frame(&frame),
            Err(CommandError::UnknownCommand(0x7E))
        );
    }

    #[test]
    fn test_invalid_side() {
        let mut params = [0u8; 25];
        params[0] = 0x07;
        let frame = Frame::new(CMD_CREATE_SCROLL_BUFFER, &params).unwrap();
        assert_eq!(Command::from_frame(&frame), Err(CommandError::InvalidParam));
    }

    #[test]
    fn test_command_frame_roundtrip() {
        let commands = [
            Command::Null,
            Command::SetBacklightBaseBrightness {
                side_a: -100,
                side_b: 300,
            },
            Command::SetActuator(Actuator::HeatExchangerFan, 2),
            Command::GetActuator(Actuator::BacklightBallastFans),
            Command::UpdateScrollBuffer {
                id: 0x81,
                update: ScrollBufferUpdate {
                    disp_w: Some(40),
                    step_y: Some(-2),
                    ..Default::default()
                },
            },
            Command::SetDestinationBuffer { selector: 0x41 },
            Command::SetMaskEnabled(true),
        ];

        for cmd in commands {
            let frame = cmd.to_frame().unwrap();
            assert_eq!(Command::from_frame(&frame), Ok(cmd));
        }
    }
}
