//! Multi-chip flash array

use super::BlockDevice;
use crate::bus::{FlashBus, FlashHal};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, PhysicalAddress};
use crate::protocol;

/// All flash chips of a board as one block device
///
/// Block `n` is on chip `n / blocks_per_chip`. Accesses are split on page
/// boundaries and issued one page at a time.
pub struct FlashArray<H> {
    bus: FlashBus<H>,
}

impl<H: FlashHal> FlashArray<H> {
    /// Wrap a bus handle
    pub fn new(bus: FlashBus<H>) -> Self {
        Self { bus }
    }

    /// Bank geometry
    pub fn geometry(&self) -> Geometry {
        self.bus.config().geometry
    }

    /// Borrow the bus handle
    pub fn bus(&self) -> &FlashBus<H> {
        &self.bus
    }

    /// Mutably borrow the bus handle (diagnostics, telecommands)
    pub fn bus_mut(&mut self) -> &mut FlashBus<H> {
        &mut self.bus
    }

    /// Give the bus handle back
    pub fn into_inner(self) -> FlashBus<H> {
        self.bus
    }

    /// Reset and unlock every flash chip, stopping at the first failure
    pub fn init(&mut self) -> Result<()> {
        for chip in self.bus.config().flash_chips() {
            protocol::init(&mut self.bus, chip)?;
        }
        Ok(())
    }

    /// Chip address of a block-relative access, range checked
    pub fn locate(&self, block: u32, offset: u32, len: usize) -> Result<PhysicalAddress> {
        if !self.is_valid_range(block, offset, len) {
            return Err(Error::ArgumentOutOfRange);
        }
        self.geometry().locate(block, offset)
    }
}

impl<H: FlashHal> BlockDevice for FlashArray<H> {
    fn page_size(&self) -> u32 {
        self.geometry().page_size
    }

    fn block_size(&self) -> u32 {
        self.geometry().block_size()
    }

    fn block_count(&self) -> u32 {
        self.geometry().total_blocks()
    }

    fn read(&mut self, block: u32, offset: u32, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let at = self.locate(block, offset, buf.len())?;
        for chunk in self.geometry().page_chunks(at.offset, buf.len()) {
            protocol::read_page(&mut self.bus, at.chip, chunk.offset, &mut buf[chunk.range()])?;
        }
        Ok(())
    }

    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let at = self.locate(block, offset, data.len())?;
        for chunk in self.geometry().page_chunks(at.offset, data.len()) {
            protocol::program_page(&mut self.bus, at.chip, chunk.offset, &data[chunk.range()])?;
        }
        Ok(())
    }

    fn erase(&mut self, block: u32) -> Result<()> {
        let at = self.locate(block, 0, 0)?;
        log::debug!("erase block {} (chip {} @ 0x{:08X})", block, at.chip, at.offset);
        protocol::erase_block(&mut self.bus, at.chip, at.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{two_chip_config, ScriptedHal};

    fn array() -> FlashArray<ScriptedHal> {
        FlashArray::new(FlashBus::new(ScriptedHal::new(), two_chip_config()))
    }

    #[test]
    fn test_geometry_spans_chips() {
        let array = array();
        assert_eq!(array.block_count(), 2000);
        assert_eq!(array.block_size(), 128 * 1024);
    }

    #[test]
    fn test_out_of_range_touches_nothing() {
        let mut array = array();
        let mut buf = [0u8; 4];
        assert_eq!(array.read(2000, 0, &mut buf), Err(Error::ArgumentOutOfRange));
        assert_eq!(
            array.program(0, 128 * 1024 - 2, &buf),
            Err(Error::ArgumentOutOfRange)
        );
        assert_eq!(array.erase(2000), Err(Error::ArgumentOutOfRange));
        assert!(array.bus().hal().events.is_empty());
    }

    #[test]
    fn test_read_split_per_page_on_right_chip() {
        let mut array = array();
        let mut buf = [0u8; 2048];
        array.read(1000, 2040, &mut buf).unwrap();

        let hal = array.bus().hal();
        assert_eq!(hal.opcodes(), std::vec![0x13, 0x0F, 0x03, 0x13, 0x0F, 0x03]);
        assert!(hal.transactions().iter().all(|(chip, _)| *chip == 1));
    }

    #[test]
    fn test_sync_is_noop() {
        let mut array = array();
        assert_eq!(array.sync(), Ok(()));
        assert!(array.bus().hal().events.is_empty());
    }
}
