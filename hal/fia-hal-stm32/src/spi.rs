//! Blocking SPI master for the LCD data buses

use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{self, BitOrder, Spi};
use embassy_stm32::time::Hertz;
use fia_hal::spi::{Phase, Polarity, SpiConfig};

/// Error from SPI transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiBusError {
    /// Mode fault, another master drove NSS
    ModeFault,
    /// Receive overrun
    Overrun,
    /// Anything else the peripheral reported
    Other,
}

impl From<spi::Error> for SpiBusError {
    fn from(e: spi::Error) -> Self {
        match e {
            spi::Error::ModeFault => SpiBusError::ModeFault,
            spi::Error::Overrun => SpiBusError::Overrun,
            _ => SpiBusError::Other,
        }
    }
}

/// Translate a bus configuration to the embassy driver's
pub fn embassy_config(config: &SpiConfig) -> spi::Config {
    let (polarity, phase) = config.mode.into();

    let mut out = spi::Config::default();
    out.frequency = Hertz(config.frequency);
    out.mode = spi::Mode {
        polarity: match polarity {
            Polarity::IdleLow => spi::Polarity::IdleLow,
            Polarity::IdleHigh => spi::Polarity::IdleHigh,
        },
        phase: match phase {
            Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
            Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
        },
    };
    out.bit_order = if config.lsb_first {
        BitOrder::LsbFirst
    } else {
        BitOrder::MsbFirst
    };
    out
}

/// Transmit-only blocking SPI bus
pub struct BlockingSpi {
    spi: Spi<'static, Blocking>,
}

impl BlockingSpi {
    pub fn new(spi: Spi<'static, Blocking>) -> Self {
        Self { spi }
    }
}

impl fia_hal::SpiBus for BlockingSpi {
    type Error = SpiBusError;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.spi.blocking_write(data)?;
        Ok(())
    }
}
