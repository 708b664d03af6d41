//! Busy-wait delays

/// Microsecond delay
///
/// Used for pulses too short to yield to the executor, such as the LCD
/// latch strobe.
pub trait DelayUs {
    fn delay_us(&mut self, us: u32);
}
