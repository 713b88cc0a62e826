//! HAL trait definitions
//!
//! These are the only points where the driver meets hardware. A board
//! support crate implements all three on one type (or on a struct bundling
//! the peripheral handles) and the blanket [`FlashHal`] impl does the rest.

use super::select::{PinLevel, SelectLine};

/// Failure reported by the SPI peripheral for a single transfer call
///
/// Mirrors the status a vendor HAL returns; the transport maps it into the
/// crate [`Error`](crate::Error) together with the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiFault {
    /// Peripheral reported an error
    Error,
    /// Peripheral was busy with another transfer
    Busy,
    /// Transfer did not finish within the timeout passed in
    Timeout,
}

/// Blocking SPI master
///
/// Chip select is not handled here; see [`SelectLines`].
pub trait SpiMaster {
    /// Clock `data` out, discarding whatever comes back
    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> Result<(), SpiFault>;

    /// Clock `buf.len()` bytes in
    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), SpiFault>;
}

/// GPIO access to the chip-select lines
///
/// Line writes cannot fail observably, so there is no error path.
pub trait SelectLines {
    /// Drive one select line to `level`
    fn write_line(&mut self, line: SelectLine, level: PinLevel);
}

/// Free-running millisecond tick (wraps at `u32::MAX`)
pub trait Clock {
    /// Current tick in milliseconds
    fn now_ms(&mut self) -> u32;
}

/// Everything the driver needs from the board
pub trait FlashHal: SpiMaster + SelectLines + Clock {}

impl<T: SpiMaster + SelectLines + Clock + ?Sized> FlashHal for T {}

impl<T: SpiMaster + ?Sized> SpiMaster for &mut T {
    fn transmit(&mut self, data: &[u8], timeout_ms: u32) -> Result<(), SpiFault> {
        (**self).transmit(data, timeout_ms)
    }

    fn receive(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), SpiFault> {
        (**self).receive(buf, timeout_ms)
    }
}

impl<T: SelectLines + ?Sized> SelectLines for &mut T {
    fn write_line(&mut self, line: SelectLine, level: PinLevel) {
        (**self).write_line(line, level)
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now_ms(&mut self) -> u32 {
        (**self).now_ms()
    }
}
