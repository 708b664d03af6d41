//! STM32F4 adapters for the FIA HAL traits
//!
//! The display controller board uses an STM32F413. This crate wraps the
//! embassy-stm32 drivers the firmware needs so that `fia-core` can drive
//! them through the `fia-hal` traits:
//!
//! - [`BlockingSpi`] - LCD data buses (`SpiBus`)
//! - [`LatchPin`] - LCD latch strobes (`OutputPin`)
//! - [`SwitchInput`] - door switches (`InputPin`)
//! - [`EmbassyDelay`] - latch pulse timing (`DelayUs`)
//! - [`UartConfig`] - control and bitmap channel settings
//!
//! # Features
//!
//! - `stm32f413vg`, `stm32f413zh` - chip variant
//! - `defmt` - debug formatting support

#![no_std]
#![deny(unsafe_code)]

pub mod delay;
pub mod gpio;
pub mod spi;
pub mod uart;

pub use delay::EmbassyDelay;
pub use gpio::{LatchPin, SwitchInput};
pub use spi::{BlockingSpi, SpiBusError};
pub use uart::UartConfig;
