//! Build script for fia-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates display.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate display.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=display.toml");

    let config_path = Path::new("display.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: display.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds display.toml as its start-up configuration. ║\n\
            ║  Please create one in the fia-firmware directory.                ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read display.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in display.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_layout(&config, &mut errors);
    validate_panel(&config, &mut errors);
    validate_scroll(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in display.toml                    ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=display.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const SECTIONS: [(&str, &[&str]); 3] = [
    ("layout", &["panels_per_row", "panel_rows", "topology"]),
    (
        "panel",
        &["contrast_a", "contrast_b", "base_brightness_a", "base_brightness_b"],
    ),
    ("scroll", &["mask_enabled", "tick_ms"]),
];

/// Only known sections and keys; the firmware's parser rejects anything else
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(root) = config.as_table() else {
        return;
    };

    for (name, value) in root {
        let Some((_, keys)) = SECTIONS.iter().find(|(section, _)| section == name) else {
            errors.push(format!("unknown section [{}]", name));
            continue;
        };
        let Some(table) = value.as_table() else {
            errors.push(format!("[{}] must be a table", name));
            continue;
        };
        for key in table.keys() {
            if !keys.contains(&key.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", name, key));
            }
        }
    }
}

fn integer(config: &toml::Value, section: &str, key: &str) -> Option<Result<i64, String>> {
    let value = config.get(section)?.get(key)?;
    Some(
        value
            .as_integer()
            .ok_or_else(|| format!("[{}] {} must be an integer", section, key)),
    )
}

fn check_range(
    config: &toml::Value,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) {
    match integer(config, section, key) {
        Some(Ok(v)) if v < min || v > max => {
            errors.push(format!("[{}] {} must be {}-{}", section, key, min, max));
        }
        Some(Err(e)) => errors.push(e),
        _ => {}
    }
}

fn validate_layout(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "layout", "panels_per_row", 1, 5, errors);
    check_range(config, "layout", "panel_rows", 1, 2, errors);

    if let Some(topology) = config.get("layout").and_then(|l| l.get("topology")) {
        match topology.as_str() {
            Some("u_loop") | Some("linear") => {}
            _ => errors.push("[layout] topology must be 'u_loop' or 'linear'".to_string()),
        }
    }
}

fn validate_panel(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "panel", "contrast_a", 0, 4095, errors);
    check_range(config, "panel", "contrast_b", 0, 4095, errors);
    check_range(config, "panel", "base_brightness_a", -32768, 32767, errors);
    check_range(config, "panel", "base_brightness_b", -32768, 32767, errors);
}

fn validate_scroll(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "scroll", "tick_ms", 1, 1000, errors);

    if let Some(mask) = config.get("scroll").and_then(|s| s.get("mask_enabled")) {
        if !mask.is_bool() {
            errors.push("[scroll] mask_enabled must be true or false".to_string());
        }
    }
}
