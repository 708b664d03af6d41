//! Board-agnostic core of the FIA display controller
//!
//! This crate contains everything between the host's bitmaps and the
//! bytes clocked into the Aditech LCD panels that does not depend on a
//! specific microcontroller:
//!
//! - Panel geometry and configuration
//! - Bitmap to LCD wire format conversion
//! - Per-bus transmit state machine with RAM double buffering
//! - Layer compositing and scroll buffer rendering
//! - Bitmap ingestion into the selected destination buffer
//! - Contrast, backlight and door handling
//! - Control command execution
//! - The cooperative frame scheduler tying it all together

#![no_std]
#![deny(unsafe_code)]

pub mod compositor;
pub mod config;
pub mod control;
pub mod lcd;
pub mod panel;
pub mod receive;
pub mod scheduler;

pub use fia_protocol::Side;
