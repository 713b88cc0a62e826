//! SPI command catalog and frame builder

use super::{opcodes, AddressWidth};

/// Longest header any catalog command produces: opcode, four address bytes
/// and one dummy byte
pub const MAX_HEADER_LEN: usize = 6;

/// Direction of the data phase that follows the command header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Header only
    None,
    /// Host sends data after the header
    Send,
    /// Host receives data after the header
    Receive,
}

/// One entry of the fixed command catalog
///
/// Commands are compile-time constants; a transaction is framed from one of
/// them with [`FlashCommand::frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlashCommand {
    /// Human readable name, used in logs
    pub name: &'static str,
    /// The opcode byte
    pub opcode: u8,
    /// Address width
    pub address_width: AddressWidth,
    /// Dummy bytes clocked after the address
    pub dummy_bytes: u8,
    /// Data phase direction
    pub payload: Payload,
}

impl FlashCommand {
    /// Page Read into cache (row address)
    pub const PAGE_READ: Self = Self::new(
        "PAGE READ",
        opcodes::PAGE_READ,
        AddressWidth::ThreeByte,
        0,
        Payload::None,
    );
    /// Read From Cache (column address, one dummy byte)
    pub const READ_FROM_CACHE: Self = Self::new(
        "READ FROM CACHE",
        opcodes::READ_FROM_CACHE,
        AddressWidth::TwoByte,
        1,
        Payload::Receive,
    );
    /// Program Load (column address, data follows)
    pub const PROGRAM_LOAD: Self = Self::new(
        "PROGRAM LOAD",
        opcodes::PROGRAM_LOAD,
        AddressWidth::TwoByte,
        0,
        Payload::Send,
    );
    /// Program Execute (row address)
    pub const PROGRAM_EXECUTE: Self = Self::new(
        "PROGRAM EXECUTE",
        opcodes::PROGRAM_EXECUTE,
        AddressWidth::ThreeByte,
        0,
        Payload::None,
    );
    /// Block Erase (row address of any page in the block)
    pub const BLOCK_ERASE: Self = Self::new(
        "BLOCK ERASE",
        opcodes::BLOCK_ERASE,
        AddressWidth::ThreeByte,
        0,
        Payload::None,
    );
    /// Write Enable
    pub const WRITE_ENABLE: Self = Self::new(
        "WRITE ENABLE",
        opcodes::WRITE_ENABLE,
        AddressWidth::None,
        0,
        Payload::None,
    );
    /// Write Disable
    pub const WRITE_DISABLE: Self = Self::new(
        "WRITE DISABLE",
        opcodes::WRITE_DISABLE,
        AddressWidth::None,
        0,
        Payload::None,
    );
    /// Get Features (feature register address)
    pub const GET_FEATURES: Self = Self::new(
        "GET FEATURES",
        opcodes::GET_FEATURES,
        AddressWidth::OneByte,
        0,
        Payload::Receive,
    );
    /// Set Features (feature register address, value follows)
    pub const SET_FEATURES: Self = Self::new(
        "SET FEATURES",
        opcodes::SET_FEATURES,
        AddressWidth::OneByte,
        0,
        Payload::Send,
    );
    /// Read ID
    pub const READ_ID: Self = Self::new(
        "READ ID",
        opcodes::READ_ID,
        AddressWidth::None,
        1,
        Payload::Receive,
    );
    /// Reset
    pub const RESET: Self = Self::new(
        "RESET",
        opcodes::RESET,
        AddressWidth::None,
        0,
        Payload::None,
    );

    /// The complete catalog
    pub const CATALOG: [FlashCommand; 11] = [
        Self::PAGE_READ,
        Self::READ_FROM_CACHE,
        Self::PROGRAM_LOAD,
        Self::PROGRAM_EXECUTE,
        Self::BLOCK_ERASE,
        Self::WRITE_ENABLE,
        Self::WRITE_DISABLE,
        Self::GET_FEATURES,
        Self::SET_FEATURES,
        Self::READ_ID,
        Self::RESET,
    ];

    const fn new(
        name: &'static str,
        opcode: u8,
        address_width: AddressWidth,
        dummy_bytes: u8,
        payload: Payload,
    ) -> Self {
        Self {
            name,
            opcode,
            address_width,
            dummy_bytes,
            payload,
        }
    }

    /// Look up a catalog entry by opcode
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::CATALOG.iter().copied().find(|c| c.opcode == opcode)
    }

    /// Header length in bytes (opcode, address, dummy)
    pub const fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + self.dummy_bytes as usize
    }

    /// Build the header for this command. `address` is ignored by commands
    /// without an address phase and truncated to the address width otherwise.
    pub fn frame(&self, address: u32) -> CommandFrame {
        let mut bytes = [0u8; MAX_HEADER_LEN];
        bytes[0] = self.opcode;
        let width = self.address_width.bytes() as usize;
        self.address_width.encode(address, &mut bytes[1..1 + width]);
        // dummy bytes are already zero
        let len = core::cmp::min(self.header_len(), MAX_HEADER_LEN);
        CommandFrame { bytes, len }
    }
}

/// Encoded command header, ready to hand to the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; MAX_HEADER_LEN],
    len: usize,
}

impl CommandFrame {
    /// The header bytes to transmit
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_opcodes_unique() {
        for (i, a) in FlashCommand::CATALOG.iter().enumerate() {
            for b in &FlashCommand::CATALOG[i + 1..] {
                assert_ne!(a.opcode, b.opcode, "{} and {}", a.name, b.name);
            }
            assert!(a.header_len() <= MAX_HEADER_LEN);
        }
    }

    #[test]
    fn test_frames() {
        let f = FlashCommand::PAGE_READ.frame(0x00_0140);
        assert_eq!(f.as_bytes(), &[0x13, 0x00, 0x01, 0x40]);

        let f = FlashCommand::READ_FROM_CACHE.frame(0x0123);
        assert_eq!(f.as_bytes(), &[0x03, 0x01, 0x23, 0x00]);

        let f = FlashCommand::GET_FEATURES.frame(opcodes::FEAT_STATUS as u32);
        assert_eq!(f.as_bytes(), &[0x0F, 0xC0]);

        let f = FlashCommand::WRITE_ENABLE.frame(0xDEAD_BEEF);
        assert_eq!(f.as_bytes(), &[0x06]);

        let f = FlashCommand::READ_ID.frame(0);
        assert_eq!(f.as_bytes(), &[0x9F, 0x00]);
    }

    #[test]
    fn test_from_opcode() {
        assert_eq!(
            FlashCommand::from_opcode(0xD8),
            Some(FlashCommand::BLOCK_ERASE)
        );
        assert_eq!(FlashCommand::from_opcode(0x5A), None);
    }
}
