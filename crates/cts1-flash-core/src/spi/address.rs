//! Address width types

/// Number of address bytes that follow an opcode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 1-byte address (feature register)
    OneByte,
    /// 2-byte address (column within a page)
    TwoByte,
    /// 3-byte address (row, i.e. page number)
    ThreeByte,
    /// 4-byte address
    FourByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::OneByte => 1,
            Self::TwoByte => 2,
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Largest address that fits in this width
    pub const fn max_address(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::OneByte => 0xFF,
            Self::TwoByte => 0xFFFF,
            Self::ThreeByte => 0x00FF_FFFF,
            Self::FourByte => u32::MAX,
        }
    }

    /// Encode an address MSB first into `buf`, which must hold at least
    /// `self.bytes()` bytes
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        let n = self.bytes() as usize;
        for (i, byte) in buf.iter_mut().take(n).enumerate() {
            *byte = (address >> (8 * (n - 1 - i))) as u8;
        }
    }
}
