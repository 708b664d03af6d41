//! FIA Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the panel controller core is
//! written against. Chip-specific crates implement them so the conversion,
//! transmission and compositing logic can be tested on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  fia-core / fia-firmware                │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  fia-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ fia-hal-stm32 │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O (latch lines, door sensors)
//! - [`spi::SpiBus`] - Transmit-only SPI towards the LCD half-panel chains
//! - [`delay::DelayUs`] - Short busy waits for the latch pulse

#![no_std]
#![deny(unsafe_code)]

pub mod delay;
pub mod gpio;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use delay::DelayUs;
pub use gpio::{InputPin, OutputPin};
pub use spi::SpiBus;
