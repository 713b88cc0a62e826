//! Board access: HAL traits, chip-select routing and the SPI transport
//!
//! The driver never touches a global peripheral. Everything it needs from
//! the board (SPI peripheral, select lines, millisecond tick) is reached
//! through one [`FlashHal`] value owned by a [`FlashBus`] handle, which every
//! higher layer takes explicitly. Tests substitute the emulator from
//! `cts1-flash-dummy`.

mod select;
mod traits;
mod transport;

pub use select::{ChipSelect, ChipSelectRouter, DeviceKind, PinLevel, Port, SelectLine};
pub use traits::*;
pub use transport::FlashBus;
