//! Flash array geometry and logical block translation
//!
//! The filesystem sees one flat run of blocks. Chips are filled in index
//! order, so block `n` lives on chip `n / blocks_per_chip`; the first block
//! of every chip belongs to that chip (inclusive-low boundary).

use crate::error::{Error, Result};

/// Shape of one chip and of the chip bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    /// Bytes per page (smallest program and read unit)
    pub page_size: u32,
    /// Pages per erase block
    pub pages_per_block: u32,
    /// Erase blocks per chip
    pub blocks_per_chip: u32,
    /// Number of flash chips in the bank
    pub chip_count: u8,
}

/// A (chip, byte offset) pair inside the bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalAddress {
    /// Chip index
    pub chip: u8,
    /// Byte offset within the chip
    pub offset: u32,
}

/// NAND row/column split of a chip byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAddress {
    /// Page number within the chip
    pub row: u32,
    /// Byte within the page
    pub column: u32,
}

impl Geometry {
    /// One Micron MT29F1G01 (1 Gbit SPI NAND)
    pub const MT29F1G01: Self = Self {
        page_size: 2048,
        pages_per_block: 64,
        blocks_per_chip: 1024,
        chip_count: 1,
    };

    /// Erase block size in bytes
    pub const fn block_size(&self) -> u32 {
        self.page_size * self.pages_per_block
    }

    /// Capacity of one chip in bytes
    pub const fn chip_size(&self) -> u32 {
        self.block_size() * self.blocks_per_chip
    }

    /// Blocks across every chip
    pub const fn total_blocks(&self) -> u32 {
        self.blocks_per_chip * self.chip_count as u32
    }

    /// Translate a logical block plus intra-block offset to a chip address
    pub fn locate(&self, block: u32, offset: u32) -> Result<PhysicalAddress> {
        if block >= self.total_blocks() || offset >= self.block_size() {
            return Err(Error::ArgumentOutOfRange);
        }
        let chip = block / self.blocks_per_chip;
        let local = block % self.blocks_per_chip;
        Ok(PhysicalAddress {
            chip: chip as u8,
            offset: local * self.block_size() + offset,
        })
    }

    /// Check a chip index against the bank size
    pub fn check_chip(&self, chip: u8) -> Result<()> {
        if chip < self.chip_count {
            Ok(())
        } else {
            Err(Error::ArgumentOutOfRange)
        }
    }

    /// Check that `len` bytes at `offset` stay inside one page
    pub fn check_in_page(&self, offset: u32, len: usize) -> Result<()> {
        if offset >= self.chip_size() {
            return Err(Error::ArgumentOutOfRange);
        }
        let column = offset % self.page_size;
        if column as usize + len > self.page_size as usize {
            return Err(Error::ArgumentOutOfRange);
        }
        Ok(())
    }

    /// Row and column for a chip byte offset
    pub const fn page_address(&self, offset: u32) -> PageAddress {
        PageAddress {
            row: offset / self.page_size,
            column: offset % self.page_size,
        }
    }

    /// Split `len` bytes starting at chip offset `offset` on page boundaries
    pub fn page_chunks(&self, offset: u32, len: usize) -> PageChunks {
        PageChunks {
            page_size: self.page_size,
            offset,
            start: 0,
            remaining: len,
        }
    }
}

/// One page-bounded piece of a larger transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk {
    /// Chip byte offset of this piece
    pub offset: u32,
    /// Index of the first byte in the caller's buffer
    pub start: usize,
    /// Length of the piece
    pub len: usize,
}

impl PageChunk {
    /// Range of the caller's buffer covered by this piece
    pub fn range(&self) -> core::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Iterator returned by [`Geometry::page_chunks`]
#[derive(Debug, Clone)]
pub struct PageChunks {
    page_size: u32,
    offset: u32,
    start: usize,
    remaining: usize,
}

impl Iterator for PageChunks {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        if self.remaining == 0 {
            return None;
        }
        let room = (self.page_size - self.offset % self.page_size) as usize;
        let len = room.min(self.remaining);
        let chunk = PageChunk {
            offset: self.offset,
            start: self.start,
            len,
        };
        self.offset = self.offset.wrapping_add(len as u32);
        self.start += len;
        self.remaining -= len;
        Some(chunk)
    }
}
