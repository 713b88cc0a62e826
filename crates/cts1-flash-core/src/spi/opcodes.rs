//! SPI NAND opcodes
//!
//! Opcodes and feature register addresses for the Micron MT29F1G01 family
//! fitted to the memory board.

// ============================================================================
// Array access
// ============================================================================

/// Page Read - transfer one page from the array into the cache register
pub const PAGE_READ: u8 = 0x13;
/// Read From Cache - clock data out of the cache register
pub const READ_FROM_CACHE: u8 = 0x03;

// ============================================================================
// Program
// ============================================================================

/// Program Load - load data into the cache register (resets unloaded bytes)
pub const PROGRAM_LOAD: u8 = 0x02;
/// Program Execute - commit the cache register to an array page
pub const PROGRAM_EXECUTE: u8 = 0x10;

// ============================================================================
// Erase
// ============================================================================

/// Block Erase (64 pages)
pub const BLOCK_ERASE: u8 = 0xD8;

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before program execute and block erase
pub const WRITE_ENABLE: u8 = 0x06;
/// Write Disable - clears WEL
pub const WRITE_DISABLE: u8 = 0x04;

// ============================================================================
// Feature registers
// ============================================================================

/// Get Features (one address byte selects the register)
pub const GET_FEATURES: u8 = 0x0F;
/// Set Features (one address byte selects the register)
pub const SET_FEATURES: u8 = 0x1F;

/// Block lock register
pub const FEAT_BLOCK_LOCK: u8 = 0xA0;
/// Configuration register
pub const FEAT_CONFIG: u8 = 0xB0;
/// Status register
pub const FEAT_STATUS: u8 = 0xC0;
/// Die select register
pub const FEAT_DIE_SELECT: u8 = 0xD0;

/// Block lock bits BP0..BP2; all set locks the whole array
pub const BLOCK_LOCK_ALL: u8 = 0x38;

// ============================================================================
// Identification and reset
// ============================================================================

/// Read ID (one dummy byte, then manufacturer and device ID)
pub const READ_ID: u8 = 0x9F;
/// Reset
pub const RESET: u8 = 0xFF;
