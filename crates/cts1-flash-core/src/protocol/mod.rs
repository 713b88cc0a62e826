//! Protocol implementations
//!
//! Command sequences for the SPI NAND parts on the memory board. Every
//! function takes the [`FlashBus`](crate::bus::FlashBus) handle and a chip
//! index explicitly.

mod nand;

pub use nand::*;
