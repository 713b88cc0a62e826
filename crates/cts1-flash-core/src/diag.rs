//! Commissioning diagnostics
//!
//! An erase, program, read and verify round trip on one page with timing,
//! and a READ ID sweep over every flash chip.

use core::fmt::Write;

use crate::bus::{FlashBus, FlashHal};
use crate::config::{MAX_CHIPS, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::protocol;

/// Capacity of [`BenchReport::text`]
pub const REPORT_LEN: usize = 256;

/// Benchmark pattern byte for index `i`
///
/// Never a run of 0x00 or 0xFF, so stuck bits in either direction show up.
pub const fn pattern_byte(i: usize) -> u8 {
    ((i + 42) % 256) as u8
}

/// How far a benchmark got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BenchKind {
    /// Every stage passed
    Pass = 0,
    /// Erase failed
    EraseFailed = 1,
    /// Program failed
    ProgramFailed = 2,
    /// Read failed
    ReadFailed = 3,
    /// Read-back differs from what was written
    VerifyMismatch = 4,
    /// Arguments rejected before any flash access
    Rejected = 5,
}

impl BenchKind {
    /// Status code reported to the ground
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl core::fmt::Display for BenchKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            BenchKind::Pass => "pass",
            BenchKind::EraseFailed => "erase failed",
            BenchKind::ProgramFailed => "program failed",
            BenchKind::ReadFailed => "read failed",
            BenchKind::VerifyMismatch => "verify mismatch",
            BenchKind::Rejected => "arguments rejected",
        };
        f.write_str(text)
    }
}

/// First differing byte of a verify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Index into the tested range
    pub index: usize,
    /// Byte written
    pub expected: u8,
    /// Byte read back
    pub actual: u8,
}

/// Outcome of [`benchmark_erase_program_read`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchReport {
    /// Stage outcome
    pub kind: BenchKind,
    /// Driver error behind a failed stage
    pub error: Option<Error>,
    /// Set for [`BenchKind::VerifyMismatch`]
    pub mismatch: Option<Mismatch>,
    /// Erase duration
    pub erase_ms: u32,
    /// Program duration
    pub program_ms: u32,
    /// Read duration
    pub read_ms: u32,
    /// Human readable summary
    pub text: heapless::String<REPORT_LEN>,
}

impl BenchReport {
    fn new() -> Self {
        Self {
            kind: BenchKind::Pass,
            error: None,
            mismatch: None,
            erase_ms: 0,
            program_ms: 0,
            read_ms: 0,
            text: heapless::String::new(),
        }
    }

    fn fail(mut self, kind: BenchKind, chip: u8, address: u32, error: Error) -> Self {
        self.kind = kind;
        self.error = Some(error);
        let _ = write!(
            self.text,
            "chip {} @ 0x{:08X}: {} (error {}: {})",
            chip,
            address,
            kind,
            error.code(),
            error
        );
        self
    }

    /// True if every stage passed
    pub fn passed(&self) -> bool {
        self.kind == BenchKind::Pass
    }
}

fn timed<H: FlashHal, T>(
    bus: &mut FlashBus<H>,
    f: impl FnOnce(&mut FlashBus<H>) -> Result<T>,
) -> (Result<T>, u32) {
    let start = bus.now_ms();
    let result = f(bus);
    let elapsed = bus.now_ms().wrapping_sub(start);
    (result, elapsed)
}

/// Erase the block at `address`, program `len` pattern bytes, read them
/// back and compare
///
/// `len` must fit in the page containing `address`; anything larger is
/// rejected with [`BenchKind::Rejected`] before the bus is touched. The
/// whole block containing `address` is erased.
pub fn benchmark_erase_program_read<H: FlashHal>(
    bus: &mut FlashBus<H>,
    chip: u8,
    address: u32,
    len: usize,
) -> BenchReport {
    let mut report = BenchReport::new();
    let geometry = bus.config().geometry;

    if let Err(e) = geometry.check_chip(chip) {
        let _ = write!(
            report.text,
            "chip {} is not a flash chip (0..{}); ",
            chip,
            geometry.chip_count
        );
        return report.fail(BenchKind::Rejected, chip, address, e);
    }
    if len == 0 || len > MAX_PAGE_SIZE || geometry.check_in_page(address, len).is_err() {
        let _ = write!(
            report.text,
            "length {} at 0x{:08X} does not fit one {}-byte page; ",
            len,
            address,
            geometry.page_size
        );
        return report.fail(BenchKind::Rejected, chip, address, Error::ArgumentOutOfRange);
    }

    let mut pattern = [0u8; MAX_PAGE_SIZE];
    for (i, b) in pattern[..len].iter_mut().enumerate() {
        *b = pattern_byte(i);
    }
    let pattern = &pattern[..len];

    let (result, ms) = timed(bus, |bus| protocol::erase_block(bus, chip, address));
    report.erase_ms = ms;
    if let Err(e) = result {
        return report.fail(BenchKind::EraseFailed, chip, address, e);
    }

    let (result, ms) = timed(bus, |bus| protocol::program_page(bus, chip, address, pattern));
    report.program_ms = ms;
    if let Err(e) = result {
        return report.fail(BenchKind::ProgramFailed, chip, address, e);
    }

    let mut readback = [0u8; MAX_PAGE_SIZE];
    let readback = &mut readback[..len];
    let (result, ms) = timed(bus, |bus| protocol::read_page(bus, chip, address, readback));
    report.read_ms = ms;
    if let Err(e) = result {
        return report.fail(BenchKind::ReadFailed, chip, address, e);
    }

    let _ = write!(
        report.text,
        "erase {} ms, program {} ms, read {} ms: ",
        report.erase_ms,
        report.program_ms,
        report.read_ms
    );

    let first_bad = pattern
        .iter()
        .zip(readback.iter())
        .position(|(w, r)| w != r);
    match first_bad {
        None => {
            let _ = write!(report.text, "PASS ({} bytes)", len);
        }
        Some(index) => {
            let mismatch = Mismatch {
                index,
                expected: pattern[index],
                actual: readback[index],
            };
            let _ = write!(
                report.text,
                "verify FAILED at byte {}: wrote 0x{:02X}, read 0x{:02X}",
                index,
                mismatch.expected,
                mismatch.actual
            );
            report.kind = BenchKind::VerifyMismatch;
            report.mismatch = Some(mismatch);
        }
    }
    log::debug!("benchmark chip {} @ 0x{:08X}: {}", chip, address, report.text);
    report
}

/// Result of probing one chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipProbe {
    /// Chip index
    pub chip: u8,
    /// `Ok` if the expected ID came back
    pub result: Result<()>,
}

/// Outcome of [`scan_reachability`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// One entry per flash chip, in index order
    pub probes: heapless::Vec<ChipProbe, MAX_CHIPS>,
}

impl ScanReport {
    /// Chips that answered with the expected ID
    pub fn reachable(&self) -> usize {
        self.probes.iter().filter(|p| p.result.is_ok()).count()
    }

    /// True if every chip answered
    pub fn all_reachable(&self) -> bool {
        self.reachable() == self.probes.len()
    }
}

/// READ ID every flash chip
pub fn scan_reachability<H: FlashHal>(bus: &mut FlashBus<H>) -> ScanReport {
    let mut probes = heapless::Vec::new();
    for chip in bus.config().flash_chips() {
        let result = protocol::is_reachable(bus, chip);
        // flash_chips() is bounded by the select table
        let _ = probes.push(ChipProbe { chip, result });
    }
    let report = ScanReport { probes };
    log::debug!(
        "reachability: {}/{} chips",
        report.reachable(),
        report.probes.len()
    );
    report
}
