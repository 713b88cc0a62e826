//! LittleFS block device contract
//!
//! LittleFS calls four functions and only checks whether the returned
//! integer is zero. [`LfsBlockDevice`] provides them on top of any
//! [`BlockDevice`], returning 0 on success and [`Error::code`] otherwise so
//! logs and telemetry can still tell failures apart.

use crate::error::{Error, Result};
use crate::flash::BlockDevice;
use crate::geometry::Geometry;

/// Lookahead buffer size handed to LittleFS
pub const LOOKAHEAD_SIZE: u32 = 16;

/// Erase cycles before LittleFS moves metadata
pub const BLOCK_CYCLES: i32 = 100;

/// The geometry half of an `lfs_config`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct LfsGeometry {
    /// Minimum read size
    pub read_size: u32,
    /// Minimum program size
    pub prog_size: u32,
    /// Erase block size
    pub block_size: u32,
    /// Blocks across every chip
    pub block_count: u32,
    /// Per-file and metadata cache size
    pub cache_size: u32,
    /// Lookahead buffer size
    pub lookahead_size: u32,
    /// Wear-leveling cycle count
    pub block_cycles: i32,
}

impl LfsGeometry {
    /// Derive LittleFS parameters from the flash bank shape
    pub const fn from_geometry(g: &Geometry) -> Self {
        Self {
            read_size: g.page_size,
            prog_size: g.page_size,
            block_size: g.block_size(),
            block_count: g.total_blocks(),
            cache_size: g.page_size,
            lookahead_size: LOOKAHEAD_SIZE,
            block_cycles: BLOCK_CYCLES,
        }
    }
}

/// Collapse a result into the integer LittleFS expects
pub fn status_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code() as i32,
    }
}

/// Integer-status adapter for LittleFS
pub struct LfsBlockDevice<D> {
    device: D,
}

impl<D: BlockDevice> LfsBlockDevice<D> {
    /// Wrap a block device
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Parameters for the filesystem configuration
    pub fn geometry(&self) -> LfsGeometry {
        let page = self.device.page_size();
        LfsGeometry {
            read_size: page,
            prog_size: page,
            block_size: self.device.block_size(),
            block_count: self.device.block_count(),
            cache_size: page,
            lookahead_size: LOOKAHEAD_SIZE,
            block_cycles: BLOCK_CYCLES,
        }
    }

    /// Borrow the wrapped device
    pub fn inner(&self) -> &D {
        &self.device
    }

    /// Mutably borrow the wrapped device
    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Unwrap
    pub fn into_inner(self) -> D {
        self.device
    }

    /// `lfs_config.read`
    pub fn read(&mut self, block: u32, off: u32, buf: &mut [u8]) -> i32 {
        let result = self.device.read(block, off, buf);
        Self::report("read", block, off, result)
    }

    /// `lfs_config.prog`
    pub fn prog(&mut self, block: u32, off: u32, buf: &[u8]) -> i32 {
        let result = self.device.program(block, off, buf);
        Self::report("prog", block, off, result)
    }

    /// `lfs_config.erase`
    pub fn erase(&mut self, block: u32) -> i32 {
        let result = self.device.erase(block);
        Self::report("erase", block, 0, result)
    }

    /// `lfs_config.sync`
    pub fn sync(&mut self) -> i32 {
        status_code(self.device.sync())
    }

    fn report(op: &str, block: u32, off: u32, result: Result<()>) -> i32 {
        if let Err(e) = result {
            log::warn!("lfs {} block {} off {}: {} (code {})", op, block, off, e, e.code());
        }
        status_code(result)
    }
}

impl<D: BlockDevice> BlockDevice for LfsBlockDevice<D> {
    fn page_size(&self) -> u32 {
        self.device.page_size()
    }

    fn block_size(&self) -> u32 {
        self.device.block_size()
    }

    fn block_count(&self) -> u32 {
        self.device.block_count()
    }

    fn read(&mut self, block: u32, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.device.read(block, offset, buf)
    }

    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<()> {
        self.device.program(block, offset, data)
    }

    fn erase(&mut self, block: u32) -> Result<()> {
        self.device.erase(block)
    }

    fn sync(&mut self) -> Result<()> {
        self.device.sync()
    }
}

/// Decode a status returned by the adapter
pub fn from_status_code(status: i32) -> Result<()> {
    if status == 0 {
        return Ok(());
    }
    let code = u8::try_from(status).map_err(|_| Error::Unknown)?;
    Err(Error::from_code(code).unwrap_or(Error::Unknown))
}
