//! Board configuration
//!
//! Everything that differs between boards lives here as data: chip
//! geometry, operation timeout budgets, the expected read-ID bytes and the
//! chip-select pin table.

#[cfg(feature = "std")]
mod toml;

#[cfg(feature = "std")]
pub use self::toml::{from_toml_file, from_toml_str};

use core::fmt;

use crate::bus::{ChipSelect, DeviceKind, Port, SelectLine};
use crate::geometry::Geometry;

/// Most select lines a board can describe
pub const MAX_CHIPS: usize = 16;

/// Largest page size the driver handles (sizes stack buffers)
pub const MAX_PAGE_SIZE: usize = 2048;

/// Per-operation time budgets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default))]
pub struct Timeouts {
    /// Write-enable latch set/clear, reset
    pub latch_ms: u32,
    /// Page program
    pub program_ms: u32,
    /// Array to cache transfer before a read
    pub page_read_ms: u32,
    /// Block erase
    pub erase_ms: u32,
    /// Single SPI transmit or receive call
    pub spi_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            latch_ms: 10,
            program_ms: 10,
            page_read_ms: 10,
            erase_ms: 4096,
            spi_ms: 25,
        }
    }
}

/// Manufacturer and device bytes returned by READ ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpectedId {
    /// Manufacturer byte
    pub manufacturer: u8,
    /// Device byte
    pub device: u8,
}

impl ExpectedId {
    /// Micron MT29F1G01
    pub const MT29F1G01: Self = Self {
        manufacturer: 0x2C,
        device: 0x14,
    };

    /// True if the two ID bytes match
    pub fn matches(&self, id: [u8; 2]) -> bool {
        id == [self.manufacturer, self.device]
    }
}

/// Reasons a board configuration is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A geometry field is zero or the page is larger than [`MAX_PAGE_SIZE`]
    InvalidGeometry,
    /// Chip capacity does not fit the 32-bit offset or 24-bit row address
    ChipTooLarge,
    /// Fewer flash select lines than `chip_count`, or a FRAM line in the
    /// flash range
    FlashLinesMissing,
    /// More than [`MAX_CHIPS`] select lines
    TooManyLines,
    /// A select line appears twice
    DuplicateLine,
    /// A pin number above 15
    InvalidPin,
    /// Could not read the configuration file
    IoError,
    /// Could not parse the configuration file
    ParseError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry => write!(f, "invalid geometry"),
            Self::ChipTooLarge => write!(f, "chip capacity exceeds the addressable range"),
            Self::FlashLinesMissing => {
                write!(f, "chip_count exceeds the number of leading flash select lines")
            }
            Self::TooManyLines => write!(f, "more than {} select lines", MAX_CHIPS),
            Self::DuplicateLine => write!(f, "select line listed twice"),
            Self::InvalidPin => write!(f, "pin number out of range"),
            Self::IoError => write!(f, "could not read configuration file"),
            Self::ParseError => write!(f, "could not parse configuration file"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Complete description of one memory board
///
/// Chip indices `0..geometry.chip_count` are the flash bank and must be the
/// first entries of `select_lines`; any further entries (FRAM) are
/// selectable but not part of the block array.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashConfig {
    /// Chip and bank shape
    pub geometry: Geometry,
    /// Operation budgets
    pub timeouts: Timeouts,
    /// Expected READ ID answer
    pub expected_id: ExpectedId,
    /// Select line per chip index
    pub select_lines: heapless::Vec<ChipSelect, MAX_CHIPS>,
}

const fn flash(port: Port, pin: u8) -> ChipSelect {
    ChipSelect {
        line: SelectLine::new(port, pin),
        kind: DeviceKind::Flash,
    }
}

const fn fram(port: Port, pin: u8) -> ChipSelect {
    ChipSelect {
        line: SelectLine::new(port, pin),
        kind: DeviceKind::Fram,
    }
}

/// CTS-SAT-1 memory board pin map
pub const CTS1_SELECT_LINES: [ChipSelect; 6] = [
    flash(Port::E, 7),
    flash(Port::G, 1),
    flash(Port::G, 0),
    flash(Port::F, 15),
    fram(Port::E, 9),
    fram(Port::E, 8),
];

impl FlashConfig {
    /// CTS-SAT-1 flight board: four MT29F1G01 plus two FRAM select lines
    pub fn cts1() -> Self {
        let mut select_lines = heapless::Vec::new();
        for entry in CTS1_SELECT_LINES {
            // MAX_CHIPS > 6
            let _ = select_lines.push(entry);
        }
        Self {
            geometry: Geometry {
                chip_count: 4,
                ..Geometry::MT29F1G01
            },
            timeouts: Timeouts::default(),
            expected_id: ExpectedId::MT29F1G01,
            select_lines,
        }
    }

    /// Indices of the flash chips
    pub fn flash_chips(&self) -> core::ops::Range<u8> {
        0..self.geometry.chip_count
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if g.page_size == 0
            || g.pages_per_block == 0
            || g.blocks_per_chip == 0
            || g.chip_count == 0
            || g.page_size as usize > MAX_PAGE_SIZE
        {
            return Err(ConfigError::InvalidGeometry);
        }

        let pages = (g.pages_per_block as u64) * (g.blocks_per_chip as u64);
        let bytes = pages * g.page_size as u64;
        if pages > 0x00FF_FFFF || bytes > u32::MAX as u64 {
            return Err(ConfigError::ChipTooLarge);
        }

        let flash_lines = self
            .select_lines
            .iter()
            .take_while(|e| e.kind == DeviceKind::Flash)
            .count();
        if (g.chip_count as usize) > flash_lines {
            return Err(ConfigError::FlashLinesMissing);
        }

        for (i, entry) in self.select_lines.iter().enumerate() {
            if entry.line.pin > 15 {
                return Err(ConfigError::InvalidPin);
            }
            if self.select_lines[i + 1..]
                .iter()
                .any(|other| other.line == entry.line)
            {
                return Err(ConfigError::DuplicateLine);
            }
        }
        Ok(())
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self::cts1()
    }
}
