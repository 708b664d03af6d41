//! Configuration types
//!
//! Panel geometry constants, the validated layout and the start-up
//! configuration read from the firmware's embedded `display.toml`.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
