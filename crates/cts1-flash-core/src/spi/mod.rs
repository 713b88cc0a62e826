//! SPI types and command structures
//!
//! This module provides the SPI NAND opcode table, address encoding and the
//! fixed command catalog used to frame every transaction.

mod address;
mod command;
pub mod opcodes;

pub use address::AddressWidth;
pub use command::{CommandFrame, FlashCommand, Payload, MAX_HEADER_LEN};
pub use opcodes::*;
