//! Chip-select routing
//!
//! Maps a chip index to the GPIO line that selects it. The table is data,
//! so adding a chip to the board is a configuration change.

use super::traits::SelectLines;
use crate::error::{Error, Result};

/// GPIO port letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Port {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

/// One GPIO line: port and pin number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectLine {
    /// GPIO port
    pub port: Port,
    /// Pin number within the port (0..=15)
    pub pin: u8,
}

impl SelectLine {
    /// Shorthand constructor
    pub const fn new(port: Port, pin: u8) -> Self {
        Self { port, pin }
    }
}

/// What sits behind a select line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// SPI NAND flash, part of the block array
    Flash,
    /// FRAM, selectable but not part of the block array
    Fram,
}

/// Chip-select table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ChipSelect {
    /// The active-low select line
    pub line: SelectLine,
    /// Device type on that line
    pub kind: DeviceKind,
}

/// Electrical level of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    /// Low (select lines are active low)
    Low,
    /// High (inactive)
    High,
}

/// Drives the select lines from a chip-index table
///
/// Every [`select`](Self::select) first releases all lines, so no two chips
/// are ever selected together.
#[derive(Debug, Clone, Copy)]
pub struct ChipSelectRouter<'t> {
    table: &'t [ChipSelect],
}

impl<'t> ChipSelectRouter<'t> {
    /// Create a router over a chip-select table; index in the table is the
    /// chip index
    pub const fn new(table: &'t [ChipSelect]) -> Self {
        Self { table }
    }

    /// Number of selectable chips
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if the table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Table entry for a chip
    pub fn entry(&self, chip: u8) -> Option<&ChipSelect> {
        self.table.get(chip as usize)
    }

    /// Release every line, then assert the line for `chip`
    ///
    /// An out-of-range index touches no line and returns
    /// [`Error::ArgumentOutOfRange`].
    pub fn select<L: SelectLines + ?Sized>(&self, lines: &mut L, chip: u8) -> Result<()> {
        let entry = self.entry(chip).ok_or(Error::ArgumentOutOfRange)?;
        self.deselect_all(lines);
        lines.write_line(entry.line, PinLevel::Low);
        Ok(())
    }

    /// Drive every line inactive
    pub fn deselect_all<L: SelectLines + ?Sized>(&self, lines: &mut L) {
        for entry in self.table {
            lines.write_line(entry.line, PinLevel::High);
        }
    }
}
