//! Error types for cts1-flash-core
//!
//! One flat, `Copy` error type is shared by every layer of the stack. Each
//! variant carries a stable positive code: the LittleFS contract and the
//! telecommand replies report these codes, and 0 always means success.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    // Transport errors
    /// SPI transmit did not complete
    TransportTransmitFailed,
    /// SPI receive did not complete
    TransportReceiveFailed,
    /// The SPI peripheral reported a timeout
    TransportTimeout,

    // Device errors
    /// Status register never reported completion within the budget
    DeviceBusyTimeout,
    /// Device set its erase-fail status bit
    DeviceReportedEraseError,
    /// Device set its program-fail status bit
    DeviceReportedProgramError,
    /// Write-enable latch could not be set before an erase or program
    WriteEnableFailed,
    /// Device answered read-ID with an unexpected identifier
    UnreachableOrWrongId,

    // Caller errors
    /// Chip index, address or length outside the permitted range
    ArgumentOutOfRange,

    /// Internal logic error. Only reachable through a bug in this crate.
    Unknown,
}

impl Error {
    /// Every variant, in code order
    pub const ALL: [Error; 10] = [
        Error::TransportTransmitFailed,
        Error::TransportReceiveFailed,
        Error::TransportTimeout,
        Error::DeviceBusyTimeout,
        Error::DeviceReportedEraseError,
        Error::DeviceReportedProgramError,
        Error::WriteEnableFailed,
        Error::UnreachableOrWrongId,
        Error::ArgumentOutOfRange,
        Error::Unknown,
    ];

    /// Numeric code reported to the filesystem and telecommand layers
    pub const fn code(self) -> u8 {
        match self {
            Self::TransportTransmitFailed => 1,
            Self::TransportReceiveFailed => 2,
            Self::TransportTimeout => 3,
            Self::DeviceBusyTimeout => 4,
            Self::DeviceReportedEraseError => 5,
            Self::DeviceReportedProgramError => 6,
            Self::WriteEnableFailed => 7,
            Self::UnreachableOrWrongId => 8,
            Self::ArgumentOutOfRange => 9,
            Self::Unknown => 10,
        }
    }

    /// Look up the error for a numeric code. Returns `None` for 0 and for
    /// codes this version does not define.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// True for failures of the SPI link itself
    pub const fn is_transport(self) -> bool {
        matches!(
            self,
            Self::TransportTransmitFailed | Self::TransportReceiveFailed | Self::TransportTimeout
        )
    }

    /// True for failures reported (or implied) by the flash device
    pub const fn is_device(self) -> bool {
        matches!(
            self,
            Self::DeviceBusyTimeout
                | Self::DeviceReportedEraseError
                | Self::DeviceReportedProgramError
                | Self::WriteEnableFailed
                | Self::UnreachableOrWrongId
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportTransmitFailed => write!(f, "SPI transmit failed"),
            Self::TransportReceiveFailed => write!(f, "SPI receive failed"),
            Self::TransportTimeout => write!(f, "SPI transfer timed out"),
            Self::DeviceBusyTimeout => write!(f, "device stayed busy past its timeout"),
            Self::DeviceReportedEraseError => write!(f, "device reported an erase failure"),
            Self::DeviceReportedProgramError => write!(f, "device reported a program failure"),
            Self::WriteEnableFailed => write!(f, "write enable latch could not be set"),
            Self::UnreachableOrWrongId => write!(f, "device unreachable or wrong ID"),
            Self::ArgumentOutOfRange => write!(f, "argument out of range"),
            Self::Unknown => write!(f, "unknown internal error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
