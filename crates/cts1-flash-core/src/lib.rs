//! cts1-flash-core - Driver stack for the CTS-SAT-1 memory board
//!
//! This crate drives a bank of SPI NAND flash chips that share one SPI bus
//! and presents them to a filesystem as a single flat array of blocks. It is
//! `no_std` and allocation free so the same code runs on the flight computer
//! and on the host against the `cts1-flash-dummy` emulator.
//!
//! Layers, leaves first:
//!
//! - [`bus`] - chip-select router and the SPI transport (one bracketed
//!   transaction per call)
//! - [`status`] - status register polling state machine
//! - [`protocol`] - NAND command sequences (erase, program, read, ID, reset)
//! - [`geometry`] - logical block to (chip, offset) translation
//! - [`flash`] - the block device over all chips
//! - [`lfs`] - integer-status contract for LittleFS
//! - [`diag`] and [`tcmd`] - commissioning benchmark, reachability scan and
//!   telecommand handlers
//!
//! # Features
//!
//! - `std` - `std::error::Error` for [`Error`] and serde support for the
//!   configuration types
//!
//! # Example
//!
//! ```ignore
//! use cts1_flash_core::{bus::FlashBus, config::FlashConfig, flash::{BlockDevice, FlashArray}};
//!
//! fn format_first_block<H: cts1_flash_core::bus::FlashHal>(hal: H) -> cts1_flash_core::Result<()> {
//!     let mut array = FlashArray::new(FlashBus::new(hal, FlashConfig::cts1()));
//!     array.erase(0)?;
//!     array.program(0, 0, b"superblock")
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod bus;
pub mod config;
pub mod diag;
pub mod error;
pub mod flash;
pub mod geometry;
pub mod lfs;
pub mod protocol;
pub mod spi;
pub mod status;
pub mod tcmd;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod testing;
