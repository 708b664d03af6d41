//! Busy-wait delay on the embassy time driver

use embassy_time::Delay;
use embedded_hal::delay::DelayNs;

/// Short blocking delay for latch strobes
pub struct EmbassyDelay {
    delay: Delay,
}

impl EmbassyDelay {
    pub fn new() -> Self {
        Self { delay: Delay }
    }
}

impl Default for EmbassyDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl fia_hal::DelayUs for EmbassyDelay {
    fn delay_us(&mut self, us: u32) {
        DelayNs::delay_us(&mut self.delay, us);
    }
}
