//! Minimal TOML reader for the display configuration
//!
//! Handles only the subset used by `display.toml`:
//! - `[section]` headers
//! - `key = value` pairs with string, integer and boolean values
//! - comments (`# ...`), including trailing comments
//!
//! Unknown sections and keys are rejected so typos surface at start-up
//! instead of silently falling back to defaults.

use super::types::{ConfigError, DisplayConfig, PanelLayout, Topology};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Key not valid in the current section
    UnknownKey,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Layout values rejected by [`PanelLayout::new`]
    Layout(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(err: ConfigError) -> Self {
        ParseError::Layout(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Layout,
    Panel,
    Scroll,
}

/// Parse a display configuration, starting from [`DisplayConfig::default`]
pub fn parse_config(input: &str) -> Result<DisplayConfig, ParseError> {
    let mut config = DisplayConfig::default();
    let mut section = Section::Root;

    // Layout fields are validated together once the whole file is read
    let mut panels_per_row = config.layout.panels_per_row() as u8;
    let mut panel_rows = config.layout.panel_rows() as u8;
    let mut topology = config.layout.topology();

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidValue)?;
        match (section, key) {
            (Section::Layout, "panels_per_row") => panels_per_row = parse_int(value)?,
            (Section::Layout, "panel_rows") => panel_rows = parse_int(value)?,
            (Section::Layout, "topology") => topology = parse_topology(value)?,
            (Section::Panel, "contrast_a") => config.contrast[0] = parse_int(value)?,
            (Section::Panel, "contrast_b") => config.contrast[1] = parse_int(value)?,
            (Section::Panel, "base_brightness_a") => {
                config.base_brightness[0] = parse_int(value)?
            }
            (Section::Panel, "base_brightness_b") => {
                config.base_brightness[1] = parse_int(value)?
            }
            (Section::Scroll, "mask_enabled") => config.mask_enabled = parse_bool(value)?,
            (Section::Scroll, "tick_ms") => {
                config.tick_ms = parse_int(value)?;
                if config.tick_ms == 0 {
                    return Err(ParseError::InvalidValue);
                }
            }
            _ => return Err(ParseError::UnknownKey),
        }
    }

    config.layout = PanelLayout::new(panels_per_row, panel_rows, topology)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "layout" => Ok(Section::Layout),
        "panel" => Ok(Section::Panel),
        "scroll" => Ok(Section::Scroll),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_topology(value: &str) -> Result<Topology, ParseError> {
    match parse_string(value) {
        "u_loop" => Ok(Topology::ULoop),
        "linear" => Ok(Topology::Linear),
        _ => Err(ParseError::InvalidValue),
    }
}
