//! TOML board file parsing
//!
//! Every section and field is optional; anything left out keeps the
//! CTS-SAT-1 default. Numbers may be written as integers or as strings in
//! decimal or `0x` hex.
//!
//! ```toml
//! [geometry]
//! chip_count = 2
//! blocks_per_chip = "0x400"
//!
//! [timeouts]
//! erase_ms = 5000
//!
//! [expected_id]
//! manufacturer = "0x2C"
//! device = "0x14"
//!
//! [[select]]
//! port = "E"
//! pin = 7
//! kind = "Flash"
//! ```

use std::fs;
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use super::{ConfigError, FlashConfig};
use crate::bus::{ChipSelect, DeviceKind, Port, SelectLine};

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBoardFile {
    geometry: Option<TomlGeometry>,
    timeouts: Option<TomlTimeouts>,
    expected_id: Option<TomlExpectedId>,
    select: Option<Vec<TomlSelect>>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGeometry {
    page_size: Option<Number>,
    pages_per_block: Option<Number>,
    blocks_per_chip: Option<Number>,
    chip_count: Option<Number>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTimeouts {
    latch_ms: Option<Number>,
    program_ms: Option<Number>,
    page_read_ms: Option<Number>,
    erase_ms: Option<Number>,
    spi_ms: Option<Number>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlExpectedId {
    manufacturer: Option<Number>,
    device: Option<Number>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSelect {
    port: Port,
    pin: Number,
    kind: DeviceKind,
}

/// An integer, or a string holding a decimal or `0x` hex integer
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u32),
    Str(String),
}

impl Number {
    fn get(&self) -> Result<u32, ConfigError> {
        match self {
            Number::Int(n) => Ok(*n),
            Number::Str(s) => parse_number(s).ok_or(ConfigError::ParseError),
        }
    }

    fn get_u8(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.get()?).map_err(|_| ConfigError::ParseError)
    }
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn apply(slot: &mut u32, value: &Option<Number>) -> Result<(), ConfigError> {
    if let Some(n) = value {
        *slot = n.get()?;
    }
    Ok(())
}

/// Load a board configuration from a TOML file
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<FlashConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::IoError)?;
    from_toml_str(&content)
}

/// Parse a board configuration from TOML text and validate it
pub fn from_toml_str(content: &str) -> Result<FlashConfig, ConfigError> {
    let file: TomlBoardFile = toml::from_str(content).map_err(|e| {
        log::debug!("board file: {}", e);
        ConfigError::ParseError
    })?;

    let mut config = FlashConfig::cts1();

    if let Some(g) = &file.geometry {
        apply(&mut config.geometry.page_size, &g.page_size)?;
        apply(&mut config.geometry.pages_per_block, &g.pages_per_block)?;
        apply(&mut config.geometry.blocks_per_chip, &g.blocks_per_chip)?;
        if let Some(n) = &g.chip_count {
            config.geometry.chip_count = n.get_u8()?;
        }
    }

    if let Some(t) = &file.timeouts {
        apply(&mut config.timeouts.latch_ms, &t.latch_ms)?;
        apply(&mut config.timeouts.program_ms, &t.program_ms)?;
        apply(&mut config.timeouts.page_read_ms, &t.page_read_ms)?;
        apply(&mut config.timeouts.erase_ms, &t.erase_ms)?;
        apply(&mut config.timeouts.spi_ms, &t.spi_ms)?;
    }

    if let Some(id) = &file.expected_id {
        if let Some(n) = &id.manufacturer {
            config.expected_id.manufacturer = n.get_u8()?;
        }
        if let Some(n) = &id.device {
            config.expected_id.device = n.get_u8()?;
        }
    }

    if let Some(lines) = &file.select {
        config.select_lines.clear();
        for entry in lines {
            let select = ChipSelect {
                line: SelectLine::new(entry.port, entry.pin.get_u8()?),
                kind: entry.kind,
            };
            config
                .select_lines
                .push(select)
                .map_err(|_| ConfigError::TooManyLines)?;
        }
    }

    config.validate()?;
    Ok(config)
}
