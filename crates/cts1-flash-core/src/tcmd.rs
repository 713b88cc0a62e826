//! Telecommand handlers
//!
//! Ground-facing wrappers around the driver. Each handler validates its
//! arguments against the board configuration, runs one operation, writes a
//! text response into any [`core::fmt::Write`] sink and returns a status
//! byte: 0 on success, otherwise the [`Error::code`] of the failure. The
//! benchmark handler returns its [`BenchKind`] code instead.
//!
//! [`dispatch`] parses the uplink form `CTS1+flash_erase(0,0x20000)!`;
//! the `CTS1+` prefix and the `!` terminator are optional. Numbers are
//! decimal or `0x` hex.

use core::fmt::{self, Write};

use crate::bus::{FlashBus, FlashHal};
use crate::config::MAX_PAGE_SIZE;
use crate::diag::{self, BenchKind};
use crate::error::Error;
use crate::protocol;

/// Hex dump bytes per line
pub const HEX_DUMP_WIDTH: usize = 16;

/// Name and argument synopsis of every telecommand [`dispatch`] knows
pub const COMMANDS: [(&str, &str); 10] = [
    ("flash_erase", "chip, address"),
    ("flash_read_hex", "chip, address, length"),
    ("flash_write_hex", "chip, address, hex bytes"),
    ("flash_benchmark", "chip, address, length"),
    ("flash_each_is_reachable", ""),
    ("flash_read_id", "chip"),
    ("flash_read_status", "chip"),
    ("flash_reset", "chip"),
    ("flash_write_enable", "chip"),
    ("flash_activate_each_cs", ""),
];

/// Why a telecommand did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    ChipOutOfRange { chip: u32, count: u8 },
    AddressOutOfRange { address: u32, limit: u32 },
    LengthOutOfRange { len: usize, max: usize },
    ArgCount { expected: usize, got: usize },
    BadNumber,
    BadHex,
    Driver { error: Error, chip: u8, address: u32 },
}

impl Failure {
    fn error(&self) -> Error {
        match self {
            Self::Driver { error, .. } => *error,
            _ => Error::ArgumentOutOfRange,
        }
    }

    fn at(chip: u8, address: u32) -> impl FnOnce(Error) -> Self {
        move |error| Self::Driver {
            error,
            chip,
            address,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.error();
        write!(f, "ERROR {}: {}", e.code(), e)?;
        match self {
            Self::ChipOutOfRange { chip, count } => {
                write!(f, " (chip {} not in 0..{})", chip, count)
            }
            Self::AddressOutOfRange { address, limit } => {
                write!(f, " (address 0x{:08X} not below 0x{:08X})", address, limit)
            }
            Self::LengthOutOfRange { len, max } => {
                write!(f, " (length {} not in 1..={})", len, max)
            }
            Self::ArgCount { expected, got } => {
                write!(f, " (expected {} arguments, got {})", expected, got)
            }
            Self::BadNumber => write!(f, " (arguments must be decimal or 0x hex)"),
            Self::BadHex => write!(f, " (data must be pairs of hex digits)"),
            Self::Driver { chip, address, .. } => {
                write!(f, " (chip {}, address 0x{:08X})", chip, address)
            }
        }
    }
}

type Outcome = core::result::Result<(), Failure>;

fn finish<W: Write + ?Sized>(out: &mut W, outcome: Outcome) -> u8 {
    match outcome {
        Ok(()) => 0,
        Err(failure) => {
            let _ = writeln!(out, "{}", failure);
            failure.error().code()
        }
    }
}

fn check_chip<H: FlashHal>(bus: &FlashBus<H>, chip: u8) -> Outcome {
    let count = bus.config().geometry.chip_count;
    if chip < count {
        Ok(())
    } else {
        Err(Failure::ChipOutOfRange {
            chip: chip as u32,
            count,
        })
    }
}

fn check_address<H: FlashHal>(bus: &FlashBus<H>, address: u32) -> Outcome {
    let limit = bus.config().geometry.chip_size();
    if address < limit {
        Ok(())
    } else {
        Err(Failure::AddressOutOfRange { address, limit })
    }
}

/// Length must be non-zero, stay inside the page that holds `address` and
/// fit the [`MAX_PAGE_SIZE`] staging buffer
fn check_length<H: FlashHal>(bus: &FlashBus<H>, address: u32, len: usize) -> Outcome {
    let page = bus.config().geometry.page_size;
    let max = ((page - address % page) as usize).min(MAX_PAGE_SIZE);
    if len == 0 || len > max {
        Err(Failure::LengthOutOfRange { len, max })
    } else {
        Ok(())
    }
}

/// Erase the block containing `address`
pub fn flash_erase<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    address: u32,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        check_address(bus, address)?;
        protocol::erase_block(bus, chip, address).map_err(Failure::at(chip, address))?;
        let block_size = bus.config().geometry.block_size();
        let _ = writeln!(
            out,
            "erased chip {} block {} (0x{:08X})",
            chip,
            address / block_size,
            address - address % block_size
        );
        Ok(())
    })();
    finish(out, outcome)
}

/// Read `len` bytes and print them as a hex dump
pub fn flash_read_hex<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    address: u32,
    len: usize,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        check_address(bus, address)?;
        check_length(bus, address, len)?;
        let mut buf = [0u8; MAX_PAGE_SIZE];
        let buf = &mut buf[..len];
        protocol::read_page(bus, chip, address, buf).map_err(Failure::at(chip, address))?;
        for (i, line) in buf.chunks(HEX_DUMP_WIDTH).enumerate() {
            let _ = write!(out, "0x{:08X}:", address as usize + i * HEX_DUMP_WIDTH);
            for b in line {
                let _ = write!(out, " {:02X}", b);
            }
            let _ = writeln!(out);
        }
        Ok(())
    })();
    finish(out, outcome)
}

/// Parse hex digit pairs, ignoring whitespace
fn parse_hex_bytes(text: &str, buf: &mut [u8]) -> core::result::Result<usize, Failure> {
    let cap = buf.len();
    let mut count = 0usize;
    let mut high: Option<u8> = None;
    for c in text.chars().filter(|c| !c.is_ascii_whitespace()) {
        let nibble = c.to_digit(16).ok_or(Failure::BadHex)? as u8;
        match high.take() {
            None => high = Some(nibble),
            Some(h) => {
                let slot = buf.get_mut(count).ok_or(Failure::LengthOutOfRange {
                    len: count + 1,
                    max: cap,
                })?;
                *slot = (h << 4) | nibble;
                count += 1;
            }
        }
    }
    if high.is_some() {
        return Err(Failure::BadHex);
    }
    Ok(count)
}

/// Program bytes given as hex text
///
/// The target must already be erased.
pub fn flash_write_hex<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    address: u32,
    hex: &str,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        check_address(bus, address)?;
        let mut buf = [0u8; MAX_PAGE_SIZE];
        let len = parse_hex_bytes(hex, &mut buf)?;
        check_length(bus, address, len)?;
        protocol::program_page(bus, chip, address, &buf[..len])
            .map_err(Failure::at(chip, address))?;
        let _ = writeln!(
            out,
            "wrote {} bytes to chip {} at 0x{:08X}",
            len, chip, address
        );
        Ok(())
    })();
    finish(out, outcome)
}

/// Erase, program, read and verify one page with timing
///
/// Returns the [`BenchKind`] code.
pub fn flash_benchmark<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    address: u32,
    len: usize,
    out: &mut W,
) -> u8 {
    let report = diag::benchmark_erase_program_read(bus, chip, address, len);
    let _ = writeln!(out, "{}", report.text);
    if report.kind != BenchKind::Pass {
        let _ = writeln!(out, "benchmark status {}", report.kind.code());
    }
    report.kind.code()
}

/// Probe every flash chip with READ ID
///
/// Returns 0 only if every chip answered with the expected ID.
pub fn flash_each_is_reachable<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    out: &mut W,
) -> u8 {
    let report = diag::scan_reachability(bus);
    let mut status = 0;
    for probe in &report.probes {
        match probe.result {
            Ok(()) => {
                let _ = writeln!(out, "chip {}: OK", probe.chip);
            }
            Err(e) => {
                let _ = writeln!(out, "chip {}: ERROR {}: {}", probe.chip, e.code(), e);
                if status == 0 {
                    status = e.code();
                }
            }
        }
    }
    let _ = writeln!(
        out,
        "{}/{} chips reachable",
        report.reachable(),
        report.probes.len()
    );
    status
}

/// Print the raw READ ID bytes
pub fn flash_read_id<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        let id = protocol::read_id(bus, chip).map_err(Failure::at(chip, 0))?;
        let _ = writeln!(out, "chip {}: ID {:02X} {:02X}", chip, id[0], id[1]);
        Ok(())
    })();
    finish(out, outcome)
}

/// Print the status feature register
pub fn flash_read_status<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        let status = protocol::read_status(bus, chip).map_err(Failure::at(chip, 0))?;
        let _ = writeln!(out, "chip {}: status 0x{:02X} {:?}", chip, status.bits(), status);
        Ok(())
    })();
    finish(out, outcome)
}

/// Reset a chip and clear its block locks
pub fn flash_reset<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        protocol::init(bus, chip).map_err(Failure::at(chip, 0))?;
        let _ = writeln!(out, "chip {}: reset and unlocked", chip);
        Ok(())
    })();
    finish(out, outcome)
}

/// Set the write-enable latch and confirm it
pub fn flash_write_enable<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    chip: u8,
    out: &mut W,
) -> u8 {
    let outcome = (|| -> Outcome {
        check_chip(bus, chip)?;
        protocol::write_enable(bus, chip).map_err(Failure::at(chip, 0))?;
        let _ = writeln!(out, "chip {}: write enable latch set", chip);
        Ok(())
    })();
    finish(out, outcome)
}

/// Assert and release every select line in turn, flash and FRAM alike
pub fn flash_activate_each_cs<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    out: &mut W,
) -> u8 {
    let count = bus.config().select_lines.len();
    for index in 0..count {
        let chip = index as u8;
        let entry = bus.config().select_lines[index];
        if let Err(e) = bus.pulse_select(chip) {
            return finish(out, Err(Failure::at(chip, 0)(e)));
        }
        let _ = writeln!(
            out,
            "cs {}: {:?} P{:?}{}",
            chip, entry.kind, entry.line.port, entry.line.pin
        );
    }
    0
}

fn parse_number(text: &str) -> core::result::Result<u32, Failure> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| Failure::BadNumber)
}

fn numbers<const N: usize>(args: &str) -> core::result::Result<[u32; N], Failure> {
    let mut values = [0u32; N];
    let args = args.trim();
    let got = if args.is_empty() {
        0
    } else {
        args.split(',').count()
    };
    if got != N {
        return Err(Failure::ArgCount { expected: N, got });
    }
    if N > 0 {
        for (slot, text) in values.iter_mut().zip(args.split(',')) {
            *slot = parse_number(text)?;
        }
    }
    Ok(values)
}

fn chip_arg(value: u32, count: u8) -> core::result::Result<u8, Failure> {
    u8::try_from(value).map_err(|_| Failure::ChipOutOfRange { chip: value, count })
}

/// Split `name(args)` with the optional `CTS1+` prefix and `!` suffix
fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let line = line.strip_prefix("CTS1+").unwrap_or(line);
    let line = line.strip_suffix('!').unwrap_or(line).trim_end();
    match line.find('(') {
        Some(open) => {
            let args = line[open + 1..].strip_suffix(')')?;
            Some((line[..open].trim(), args))
        }
        None => Some((line, "")),
    }
}

/// Parse one telecommand line and run it
///
/// Returns `None` if the line does not name a known telecommand; otherwise
/// the handler's status byte. Argument errors are reported like any other
/// failure.
pub fn dispatch<H: FlashHal, W: Write + ?Sized>(
    bus: &mut FlashBus<H>,
    line: &str,
    out: &mut W,
) -> Option<u8> {
    let (name, args) = split_command(line)?;
    if !COMMANDS.iter().any(|(n, _)| *n == name) {
        return None;
    }
    log::debug!("telecommand {}({})", name, args);
    let count = bus.config().geometry.chip_count;

    let status = match name {
        "flash_write_hex" => {
            let mut parts = args.splitn(3, ',');
            let head = (parts.next(), parts.next(), parts.next());
            let parsed = match head {
                (Some(c), Some(a), Some(hex)) => parse_number(c)
                    .and_then(|c| chip_arg(c, count))
                    .and_then(|c| parse_number(a).map(|a| (c, a, hex))),
                _ => Err(Failure::ArgCount {
                    expected: 3,
                    got: args.split(',').filter(|s| !s.trim().is_empty()).count(),
                }),
            };
            match parsed {
                Ok((chip, address, hex)) => flash_write_hex(bus, chip, address, hex, out),
                Err(f) => finish(out, Err(f)),
            }
        }
        "flash_erase" => match numbers::<2>(args) {
            Ok([c, a]) => match chip_arg(c, count) {
                Ok(chip) => flash_erase(bus, chip, a, out),
                Err(f) => finish(out, Err(f)),
            },
            Err(f) => finish(out, Err(f)),
        },
        "flash_read_hex" | "flash_benchmark" => match numbers::<3>(args) {
            Ok([c, a, len]) => match chip_arg(c, count) {
                Ok(chip) if name == "flash_read_hex" => {
                    flash_read_hex(bus, chip, a, len as usize, out)
                }
                Ok(chip) => flash_benchmark(bus, chip, a, len as usize, out),
                Err(f) => finish(out, Err(f)),
            },
            Err(f) => finish(out, Err(f)),
        },
        "flash_each_is_reachable" | "flash_activate_each_cs" => match numbers::<0>(args) {
            Ok(_) if name == "flash_each_is_reachable" => flash_each_is_reachable(bus, out),
            Ok(_) => flash_activate_each_cs(bus, out),
            Err(f) => finish(out, Err(f)),
        },
        _ => match numbers::<1>(args).and_then(|[c]| chip_arg(c, count)) {
            Ok(chip) => match name {
                "flash_read_id" => flash_read_id(bus, chip, out),
                "flash_read_status" => flash_read_status(bus, chip, out),
                "flash_reset" => flash_reset(bus, chip, out),
                _ => flash_write_enable(bus, chip, out),
            },
            Err(f) => finish(out, Err(f)),
        },
    };
    Some(status)
}
