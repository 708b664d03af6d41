//! Board peripherals around the panels
//!
//! Door switches, climate actuators, contrast and backlight DACs, ambient
//! light sensors and the board's temperature/humidity sensor, wired the
//! way the FIA controller board routes them.

use defmt::*;
use embassy_stm32::adc::{Adc, AnyAdcChannel, Temperature};
use embassy_stm32::dac::{DacCh1, DacCh2, Value};
use embassy_stm32::gpio::Output;
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::{ADC1, DAC1};

use fia_core::config::SideId;
use fia_core::panel::{ambient_from_adc, PanelIo};
use fia_hal::gpio::ActiveLevel;
use fia_hal_stm32::SwitchInput;
use fia_protocol::{Actuator, Side};

use crate::channels::RESET_REQUEST;

/// Backlight DAC (MCP4725) addresses, side A then side B
const BACKLIGHT_DAC_ADDR: [u8; 2] = [0x60, 0x61];

/// SHT21 humidity and temperature sensor
const SHT21_ADDR: u8 = 0x40;
const SHT21_MEASURE_TEMP_HOLD: u8 = 0xE3;
const SHT21_MEASURE_HUMIDITY_HOLD: u8 = 0xE5;

/// ADC reference in millivolts
const VREF_MV: i32 = 3300;

/// Internal sensor output at 25 °C, millivolts
const MCU_TEMP_V25_MV: i32 = 760;

/// Temperature slot order in the GetTemperatures reply
const TEMP_BOARD: usize = 2;
const TEMP_MCU: usize = 3;

/// Output pins switched by the climate actuators
pub struct ActuatorPins {
    pub heaters: [Output<'static>; 2],
    pub circulation_fans: [Output<'static>; 2],
    pub heat_exchanger_fan: Output<'static>,
    pub ballast_fan: Output<'static>,
}

/// Everything [`PanelIo`] needs on the FIA controller board
pub struct BoardIo {
    doors: [ActiveLevel<SwitchInput>; 2],
    actuators: ActuatorPins,
    backlight: Output<'static>,
    contrast: (DacCh1<'static, DAC1, Blocking>, DacCh2<'static, DAC1, Blocking>),
    i2c: I2c<'static, Blocking>,
    adc: Adc<'static, ADC1>,
    env: [AnyAdcChannel<ADC1>; 2],
    mcu_temp: Temperature,
}

impl BoardIo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        doors: [ActiveLevel<SwitchInput>; 2],
        actuators: ActuatorPins,
        backlight: Output<'static>,
        contrast: (DacCh1<'static, DAC1, Blocking>, DacCh2<'static, DAC1, Blocking>),
        i2c: I2c<'static, Blocking>,
        mut adc: Adc<'static, ADC1>,
        env: [AnyAdcChannel<ADC1>; 2],
    ) -> Self {
        let mcu_temp = adc.enable_temperature();
        Self {
            doors,
            actuators,
            backlight,
            contrast,
            i2c,
            adc,
            env,
            mcu_temp,
        }
    }

    /// Raw SHT21 measurement with the status bits cleared
    fn read_sht21(&mut self, command: u8) -> Option<u16> {
        let mut buf = [0u8; 3];
        match self.i2c.blocking_write_read(SHT21_ADDR, &[command], &mut buf) {
            Ok(()) => Some(u16::from_be_bytes([buf[0], buf[1]]) & !0x0003),
            Err(e) => {
                warn!("SHT21 read failed: {:?}", e);
                None
            }
        }
    }

    fn mcu_temperature(&mut self) -> i16 {
        let raw = i32::from(self.adc.blocking_read(&mut self.mcu_temp));
        let mv = raw * VREF_MV / 4095;
        // 2.5 mV/°C
        ((mv - MCU_TEMP_V25_MV) * 40 + 2500) as i16
    }
}

/// Switch `pins` so that `level` of them are on
fn set_level(pins: &mut [Output<'static>], level: u8) {
    for (i, pin) in pins.iter_mut().enumerate() {
        if i < usize::from(level) {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }
}

fn level(pins: &[Output<'static>]) -> u8 {
    pins.iter().filter(|p| p.is_set_high()).count() as u8
}

impl PanelIo for BoardIo {
    fn doors_open(&mut self) -> Side {
        Side::from_flags(self.doors[0].is_active(), self.doors[1].is_active())
    }

    fn env_brightness(&mut self, side: SideId) -> u16 {
        let raw = self.adc.blocking_read(&mut self.env[side.index()]);
        ambient_from_adc(raw)
    }

    fn set_contrast(&mut self, side: SideId, value: u16) {
        match side {
            SideId::A => self.contrast.0.set(Value::Bit12Right(value)),
            SideId::B => self.contrast.1.set(Value::Bit12Right(value)),
        }
    }

    fn set_backlight_brightness(&mut self, side: SideId, value: u16) {
        let bytes = [((value >> 8) & 0x0F) as u8, (value & 0xFF) as u8];
        if let Err(e) = self.i2c.blocking_write(BACKLIGHT_DAC_ADDR[side.index()], &bytes) {
            warn!("Backlight DAC {:?} write failed: {:?}", side, e);
        }
    }

    fn set_backlight_enabled(&mut self, enabled: bool) {
        if enabled {
            self.backlight.set_high();
        } else {
            self.backlight.set_low();
        }
    }

    fn backlight_enabled(&self) -> bool {
        self.backlight.is_set_high()
    }

    fn set_actuator(&mut self, actuator: Actuator, level: u8) {
        let a = &mut self.actuators;
        match actuator {
            Actuator::Heaters => set_level(&mut a.heaters, level),
            Actuator::CirculationFans => set_level(&mut a.circulation_fans, level),
            Actuator::HeatExchangerFan => {
                set_level(core::slice::from_mut(&mut a.heat_exchanger_fan), level)
            }
            Actuator::BacklightBallastFans => {
                set_level(core::slice::from_mut(&mut a.ballast_fan), level)
            }
        }
    }

    fn actuator(&self, actuator: Actuator) -> u8 {
        let a = &self.actuators;
        match actuator {
            Actuator::Heaters => level(&a.heaters),
            Actuator::CirculationFans => level(&a.circulation_fans),
            Actuator::HeatExchangerFan => level(core::slice::from_ref(&a.heat_exchanger_fan)),
            Actuator::BacklightBallastFans => level(core::slice::from_ref(&a.ballast_fan)),
        }
    }

    fn temperatures(&mut self) -> [i16; 4] {
        // Ballast and airflow one-wire probes are not fitted
        let mut temps = [0i16; 4];
        if let Some(raw) = self.read_sht21(SHT21_MEASURE_TEMP_HOLD) {
            temps[TEMP_BOARD] = (-4685 + ((17572 * i32::from(raw)) >> 16)) as i16;
        }
        temps[TEMP_MCU] = self.mcu_temperature();
        temps
    }

    fn humidity(&mut self) -> i16 {
        self.read_sht21(SHT21_MEASURE_HUMIDITY_HOLD)
            .map(|raw| (-600 + ((12500 * i32::from(raw)) >> 16)) as i16)
            .unwrap_or(0)
    }

    fn request_reset(&mut self) {
        RESET_REQUEST.signal(());
    }
}
