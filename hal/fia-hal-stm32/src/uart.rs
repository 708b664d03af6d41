//! Control and bitmap channel UART settings

use embassy_stm32::usart;

/// Bitmap channel rate; exact from the 16 MHz APB2 clock at 16x oversampling
pub const BULK_BAUDRATE: u32 = 1_000_000;

/// UART configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    pub baudrate: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        // Host side talks 8N1 at 115200
        Self { baudrate: 115_200 }
    }
}

impl UartConfig {
    /// Settings for the bulk bitmap channel
    pub const fn bulk() -> Self {
        Self {
            baudrate: BULK_BAUDRATE,
        }
    }

    /// Driver configuration for this baud rate, 8N1
    pub fn to_embassy(&self) -> usart::Config {
        let mut config = usart::Config::default();
        config.baudrate = self.baudrate;
        config
    }
}
