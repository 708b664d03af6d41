//! FIA control channel protocol
//!
//! This crate defines the UART protocol between the host controller (a
//! single-board computer rendering departure boards) and the display
//! controller that drives the LCD panels.
//!
//! # Protocol Overview
//!
//! Requests use a simple binary frame:
//! ```text
//! ┌───────┬────────┬─────────┬─────────────┬──────────┐
//! │ START │ LENGTH │ COMMAND │ PARAMS      │ CHECKSUM │
//! │ 0xFF  │ 1B     │ 1B      │ 0–253B      │ 1B       │
//! └───────┴────────┴─────────┴─────────────┴──────────┘
//! ```
//!
//! LENGTH counts every byte after itself. The checksum is `0x7F` XORed with
//! the command and all parameter bytes. Frames with a bad checksum are
//! dropped; every accepted frame is answered with a response frame.

#![no_std]
#![deny(unsafe_code)]

pub mod commands;
pub mod frame;
pub mod response;

pub use commands::{
    Actuator, Command, CommandError, ScrollBufferSpec, ScrollBufferUpdate, Side,
};
pub use frame::{checksum, Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE};
pub use response::Response;
