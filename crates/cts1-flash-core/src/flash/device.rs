//! Block device trait

use crate::error::Result;

/// Read, program, erase and sync on fixed-size erase blocks
///
/// Offsets are relative to the start of `block`, and an access may not run
/// past the end of the block. Programming only clears bits: the block must
/// have been erased first, and nothing here erases implicitly.
///
/// # Example
///
/// ```ignore
/// use cts1_flash_core::flash::BlockDevice;
///
/// fn superblock<D: BlockDevice>(dev: &mut D) -> cts1_flash_core::Result<[u8; 8]> {
///     let mut magic = [0u8; 8];
///     dev.read(0, 8, &mut magic)?;
///     Ok(magic)
/// }
/// ```
pub trait BlockDevice {
    /// Smallest read and program unit in bytes
    fn page_size(&self) -> u32;

    /// Erase block size in bytes
    fn block_size(&self) -> u32;

    /// Number of blocks
    fn block_count(&self) -> u32;

    /// Read `buf.len()` bytes
    ///
    /// # Errors
    /// * `ArgumentOutOfRange` - block or range outside the device
    /// * transport errors, `DeviceBusyTimeout`
    fn read(&mut self, block: u32, offset: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data`
    ///
    /// # Errors
    /// * `ArgumentOutOfRange` - block or range outside the device
    /// * `WriteEnableFailed`, `DeviceReportedProgramError`,
    ///   `DeviceBusyTimeout`, transport errors
    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<()>;

    /// Erase one block
    fn erase(&mut self, block: u32) -> Result<()>;

    /// Flush pending writes. Nothing is cached below this trait, so the
    /// default does nothing.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    /// Check if an access fits inside one block of this device
    fn is_valid_range(&self, block: u32, offset: u32, len: usize) -> bool {
        let end = offset as u64 + len as u64;
        block < self.block_count() && end <= self.block_size() as u64
    }
}
