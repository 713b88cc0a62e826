//! Status register polling
//!
//! Completion of every latch change, erase, program and page load is
//! detected by re-reading the status feature register until the operation
//! finishes, the device reports a failure, or the time budget runs out.
//!
//! The decision for one iteration is the pure function [`next_state`]; the
//! loop in [`wait_for`] only performs I/O and logs when the state changes.

use bitflags::bitflags;

use crate::bus::{FlashBus, FlashHal};
use crate::error::{Error, Result};
use crate::spi::{opcodes, FlashCommand};

bitflags! {
    /// Status feature register (0xC0)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Operation in progress
        const OIP    = 1 << 0;
        /// Write enable latch
        const WEL    = 1 << 1;
        /// Last erase failed
        const E_FAIL = 1 << 2;
        /// Last program failed
        const P_FAIL = 1 << 3;
    }
}

/// What a poll loop is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    /// WEL set after WRITE ENABLE
    LatchSet,
    /// WEL cleared after WRITE DISABLE
    LatchCleared,
    /// OIP cleared after BLOCK ERASE, watching E_FAIL
    EraseDone,
    /// OIP cleared after PROGRAM EXECUTE, watching P_FAIL
    ProgramDone,
    /// OIP cleared (page read, reset)
    Ready,
}

impl PollTarget {
    /// Error bit relevant to this operation
    pub const fn error_bits(self) -> StatusRegister {
        match self {
            Self::EraseDone => StatusRegister::E_FAIL,
            Self::ProgramDone => StatusRegister::P_FAIL,
            _ => StatusRegister::empty(),
        }
    }

    /// True once `status` shows the operation finished
    pub fn is_complete(self, status: StatusRegister) -> bool {
        match self {
            Self::LatchSet => status.contains(StatusRegister::WEL),
            Self::LatchCleared => !status.contains(StatusRegister::WEL),
            Self::EraseDone | Self::ProgramDone | Self::Ready => {
                !status.contains(StatusRegister::OIP)
            }
        }
    }

    fn device_error(self) -> Error {
        match self {
            Self::EraseDone => Error::DeviceReportedEraseError,
            Self::ProgramDone => Error::DeviceReportedProgramError,
            // no error bits are watched for the others
            _ => Error::Unknown,
        }
    }
}

/// Where a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    /// The device set an error bit
    Device,
    /// Reading the status register failed
    Transport(Error),
}

/// Poll loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Keep reading
    Polling,
    /// Finished; the final status snapshot
    Success(StatusRegister),
    /// Finished with a failure
    Error(ErrorSource),
    /// Budget exhausted while still incomplete
    Timeout,
}

impl PollState {
    /// True for every state except [`PollState::Polling`]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling)
    }

    /// Map a terminal state into the crate error taxonomy
    pub fn into_result(self, target: PollTarget) -> Result<StatusRegister> {
        match self {
            Self::Success(status) => Ok(status),
            Self::Error(ErrorSource::Transport(e)) => Err(e),
            Self::Error(ErrorSource::Device) => Err(target.device_error()),
            Self::Timeout => Err(Error::DeviceBusyTimeout),
            Self::Polling => Err(Error::Unknown),
        }
    }
}

/// Decide the state after one status read
///
/// `elapsed_ms` is the time since polling began, measured after the read.
/// A result at exactly the budget is still accepted; only a strictly larger
/// elapsed time is a timeout.
pub fn next_state(
    target: PollTarget,
    read: Result<StatusRegister>,
    elapsed_ms: u32,
    budget_ms: u32,
) -> PollState {
    let status = match read {
        Ok(status) => status,
        Err(e) => return PollState::Error(ErrorSource::Transport(e)),
    };
    if status.intersects(target.error_bits()) {
        PollState::Error(ErrorSource::Device)
    } else if target.is_complete(status) {
        PollState::Success(status)
    } else if elapsed_ms > budget_ms {
        PollState::Timeout
    } else {
        PollState::Polling
    }
}

/// Read the status register once
pub fn read_status<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<StatusRegister> {
    let frame = FlashCommand::GET_FEATURES.frame(opcodes::FEAT_STATUS as u32);
    let mut buf = [0u8; 1];
    bus.send_and_receive(frame.as_bytes(), &mut buf, chip)?;
    Ok(StatusRegister::from_bits_retain(buf[0]))
}

/// Busy-poll the status register of `chip` until `target` is reached
///
/// Never yields; the caller is blocked for up to `budget_ms` plus one
/// status read.
pub fn wait_for<H: FlashHal>(
    bus: &mut FlashBus<H>,
    chip: u8,
    target: PollTarget,
    budget_ms: u32,
) -> Result<StatusRegister> {
    let start = bus.now_ms();
    log::trace!("chip {}: polling for {:?} ({} ms)", chip, target, budget_ms);

    loop {
        let read = read_status(bus, chip);
        let elapsed = bus.now_ms().wrapping_sub(start);
        let state = next_state(target, read, elapsed, budget_ms);
        if !state.is_terminal() {
            continue;
        }

        match state {
            PollState::Success(status) => {
                log::trace!("chip {}: {:?} after {} ms ({:?})", chip, target, elapsed, status)
            }
            PollState::Error(ErrorSource::Device) => {
                log::warn!("chip {}: device reported failure waiting for {:?}", chip, target)
            }
            PollState::Error(ErrorSource::Transport(e)) => {
                log::warn!("chip {}: status read failed: {}", chip, e)
            }
            PollState::Timeout => log::warn!(
                "chip {}: {:?} not reached within {} ms",
                chip,
                target,
                budget_ms
            ),
            PollState::Polling => {}
        }
        return state.into_result(target);
    }
}
