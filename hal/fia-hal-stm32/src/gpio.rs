//! GPIO adapters

use embassy_stm32::gpio::{Input, Output};
use fia_hal::{InputPin, OutputPin};

/// Push-pull output driving an LCD latch line
pub struct LatchPin {
    pin: Output<'static>,
}

impl LatchPin {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl OutputPin for LatchPin {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}

/// Switch input, e.g. a housing door contact
pub struct SwitchInput {
    pin: Input<'static>,
}

impl SwitchInput {
    pub fn new(pin: Input<'static>) -> Self {
        Self { pin }
    }
}

impl InputPin for SwitchInput {
    fn is_high(&self) -> bool {
        self.pin.is_high()
    }
}
