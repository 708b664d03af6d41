//! Panel I/O state: contrast, backlight brightness, doors and climate
//!
//! The controller owns the values the host has set; the board applies
//! them through [`PanelIo`]. Backlight brightness follows the ambient
//! light sensor of each side, shifted by a host-set base value, and drops
//! to zero while that side's service door is open.

use crate::config::{DisplayConfig, SideId};
use fia_protocol::{Actuator, Side};

/// Midpoint of the 12-bit brightness range; a base brightness of this
/// value leaves the ambient reading unchanged
pub const BRIGHTNESS_NEUTRAL: i32 = 2048;

/// Largest 12-bit DAC value
pub const DAC_MAX: u16 = 4095;

/// Raw ambient sensor reading mapped to 0
pub const ENV_ADC_DARK: u16 = 370;

/// Raw ambient sensor reading mapped to full scale
pub const ENV_ADC_BRIGHT: u16 = 800;

/// Board peripherals around the panels
pub trait PanelIo {
    /// Sides whose service door is open
    fn doors_open(&mut self) -> Side;

    /// Ambient light reading of a side, 0..=4095
    fn env_brightness(&mut self, side: SideId) -> u16;

    fn set_contrast(&mut self, side: SideId, value: u16);

    fn set_backlight_brightness(&mut self, side: SideId, value: u16);

    fn set_backlight_enabled(&mut self, enabled: bool);

    fn backlight_enabled(&self) -> bool;

    /// Switch an actuator; levels above what it supports saturate
    fn set_actuator(&mut self, actuator: Actuator, level: u8);

    fn actuator(&self, actuator: Actuator) -> u8;

    /// Ballast, airflow, board and MCU temperatures in °C × 100
    fn temperatures(&mut self) -> [i16; 4];

    /// Relative humidity in % × 100
    fn humidity(&mut self) -> i16;

    /// Restart the controller
    fn request_reset(&mut self);
}

/// Backlight level for an ambient reading and base brightness
pub fn backlight_brightness(env: u16, base: i16) -> u16 {
    (i32::from(env) + i32::from(base) - BRIGHTNESS_NEUTRAL).clamp(0, i32::from(DAC_MAX)) as u16
}

/// Scale a raw 12-bit ambient light sensor reading to 0..=4095
pub fn ambient_from_adc(raw: u16) -> u16 {
    let raw = raw.clamp(ENV_ADC_DARK, ENV_ADC_BRIGHT);
    let span = u32::from(ENV_ADC_BRIGHT - ENV_ADC_DARK);
    (u32::from(raw - ENV_ADC_DARK) * u32::from(DAC_MAX) / span) as u16
}

/// Host-set panel values and what was last applied
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelState {
    contrast: [u16; 2],
    contrast_pending: bool,
    base_brightness: [i16; 2],
    brightness: [u16; 2],
    env: [u16; 2],
    doors: Side,
    brightness_pending: bool,
}

impl PanelState {
    /// Start-up values; both contrast and brightness get applied on the first tick
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            contrast: config.contrast,
            contrast_pending: true,
            base_brightness: config.base_brightness,
            brightness: [0; 2],
            env: [0; 2],
            doors: Side::None,
            brightness_pending: true,
        }
    }

    pub fn contrast(&self, side: SideId) -> u16 {
        self.contrast[side.index()]
    }

    /// Store new contrast values, written to the DAC on the next apply
    pub fn set_contrast(&mut self, side_a: u16, side_b: u16) {
        self.contrast = [side_a.min(DAC_MAX), side_b.min(DAC_MAX)];
        self.contrast_pending = true;
    }

    pub fn base_brightness(&self, side: SideId) -> i16 {
        self.base_brightness[side.index()]
    }

    pub fn set_base_brightness(&mut self, side_a: i16, side_b: i16) {
        self.base_brightness = [side_a, side_b];
        self.brightness_pending = true;
    }

    /// Backlight level last written
    pub fn brightness(&self, side: SideId) -> u16 {
        self.brightness[side.index()]
    }

    /// Door state seen at the last brightness update
    pub fn doors(&self) -> Side {
        self.doors
    }

    /// Write contrast if it changed
    pub fn apply_contrast<P: PanelIo>(&mut self, io: &mut P) {
        if !self.contrast_pending {
            return;
        }
        for side in SideId::ALL {
            io.set_contrast(side, self.contrast[side.index()]);
        }
        self.contrast_pending = false;
    }

    /// Recompute backlight levels when the ambient light, the base values
    /// or the doors changed
    pub fn update_brightness<P: PanelIo>(&mut self, io: &mut P) {
        for side in SideId::ALL {
            let env = io.env_brightness(side);
            if env != self.env[side.index()] {
                self.env[side.index()] = env;
                self.brightness_pending = true;
            }
        }

        let doors = io.doors_open();
        if !self.brightness_pending && doors == self.doors {
            return;
        }
        if doors != self.doors {
            #[cfg(feature = "defmt")]
            defmt::info!("doors open: {}", doors);
        }

        for side in SideId::ALL {
            let open = match side {
                SideId::A => doors.includes_a(),
                SideId::B => doors.includes_b(),
            };
            let i = side.index();
            let level = if open {
                0
            } else {
                backlight_brightness(self.env[i], self.base_brightness[i])
            };
            self.brightness[i] = level;
            io.set_backlight_brightness(side, level);
        }
        self.doors = doors;
        self.brightness_pending = false;
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Recording stand-in for the board peripherals
    #[derive(Debug, Default)]
    pub struct MockPanel {
        pub doors: Side,
        pub env: [u16; 2],
        pub contrast: [Option<u16>; 2],
        pub brightness: [Option<u16>; 2],
        pub brightness_writes: usize,
        pub backlight: bool,
        pub actuators: [u8; 4],
        pub resets: usize,
    }

    fn actuator_index(actuator: Actuator) -> usize {
        match actuator {
            Actuator::Heaters => 0,
            Actuator::CirculationFans => 1,
            Actuator::HeatExchangerFan => 2,
            Actuator::BacklightBallastFans => 3,
        }
    }

    impl PanelIo for MockPanel {
        fn doors_open(&mut self) -> Side {
            self.doors
        }

        fn env_brightness(&mut self, side: SideId) -> u16 {
            self.env[side.index()]
        }

        fn set_contrast(&mut self, side: SideId, value: u16) {
            self.contrast[side.index()] = Some(value);
        }

        fn set_backlight_brightness(&mut self, side: SideId, value: u16) {
            self.brightness[side.index()] = Some(value);
            self.brightness_writes += 1;
        }

        fn set_backlight_enabled(&mut self, enabled: bool) {
            self.backlight = enabled;
        }

        fn backlight_enabled(&self) -> bool {
            self.backlight
        }

        fn set_actuator(&mut self, actuator: Actuator, level: u8) {
            self.actuators[actuator_index(actuator)] = level.min(2);
        }

        fn actuator(&self, actuator: Actuator) -> u8 {
            self.actuators[actuator_index(actuator)]
        }

        fn temperatures(&mut self) -> [i16; 4] {
            [2150, 2375, 3000, -512]
        }

        fn humidity(&mut self) -> i16 {
            4550
        }

        fn request_reset(&mut self) {
            self.resets += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockPanel;
    use super::*;

    #[test]
    fn test_brightness_formula() {
        assert_eq!(backlight_brightness(1000, 2048), 1000);
        assert_eq!(backlight_brightness(1000, 2148), 1100);
        assert_eq!(backlight_brightness(100, 0), 0);
        assert_eq!(backlight_brightness(4000, 4000), 4095);
        assert_eq!(backlight_brightness(0, i16::MIN), 0);
    }

    #[test]
    fn test_ambient_scaling() {
        assert_eq!(ambient_from_adc(0), 0);
        assert_eq!(ambient_from_adc(ENV_ADC_DARK), 0);
        assert_eq!(ambient_from_adc(585), 2047);
        assert_eq!(ambient_from_adc(ENV_ADC_BRIGHT), 4095);
        assert_eq!(ambient_from_adc(4095), 4095);
    }

    #[test]
    fn test_contrast_applied_once() {
        let mut state = PanelState::new(&DisplayConfig::default());
        let mut io = MockPanel::default();

        state.apply_contrast(&mut io);
        assert_eq!(io.contrast, [Some(2048), Some(2048)]);

        io.contrast = [None, None];
        state.apply_contrast(&mut io);
        assert_eq!(io.contrast, [None, None]);

        state.set_contrast(100, 5000);
        state.apply_contrast(&mut io);
        assert_eq!(io.contrast, [Some(100), Some(4095)]);
        assert_eq!(state.contrast(SideId::B), 4095);
    }

    #[test]
    fn test_brightness_follows_env_and_base() {
        let mut state = PanelState::new(&DisplayConfig::default());
        let mut io = MockPanel {
            env: [1200, 3000],
            ..Default::default()
        };

        state.update_brightness(&mut io);
        assert_eq!(io.brightness, [Some(1200), Some(3000)]);

        // Nothing changed: no DAC traffic
        let writes = io.brightness_writes;
        state.update_brightness(&mut io);
        assert_eq!(io.brightness_writes, writes);

        state.set_base_brightness(1048, 2048);
        state.update_brightness(&mut io);
        assert_eq!(state.brightness(SideId::A), 200);
        assert_eq!(state.brightness(SideId::B), 3000);

        io.env[1] = 3500;
        state.update_brightness(&mut io);
        assert_eq!(state.brightness(SideId::B), 3500);
    }

    #[test]
    fn test_open_door_blanks_its_side() {
        let mut state = PanelState::new(&DisplayConfig::default());
        let mut io = MockPanel {
            env: [2000, 2000],
            ..Default::default()
        };
        state.update_brightness(&mut io);

        io.doors = Side::B;
        state.update_brightness(&mut io);
        assert_eq!(io.brightness, [Some(2000), Some(0)]);
        assert_eq!(state.doors(), Side::B);

        io.doors = Side::None;
        state.update_brightness(&mut io);
        assert_eq!(io.brightness, [Some(2000), Some(2000)]);
    }
}
