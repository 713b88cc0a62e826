//! CLI command implementations
//!
//! The single-page commands are thin wrappers over the telecommand
//! handlers in `cts1_flash_core::tcmd`, so the console prints exactly what
//! the ground station would receive. `dump` and `info` work on the block
//! device view of the whole bank.

pub mod dump;
pub mod info;
pub mod script;

use cts1_flash_core::bus::{FlashBus, FlashHal};
use cts1_flash_core::tcmd;

use crate::cli::Target;
use crate::error::{chip_index, CliError, Result};

/// Print a handler's response and turn its status into a result
fn report(command: &'static str, status: u8, out: &str) -> Result<()> {
    print!("{}", out);
    if status == 0 {
        Ok(())
    } else {
        Err(CliError::Telecommand { command, status })
    }
}

pub fn erase<H: FlashHal>(bus: &mut FlashBus<H>, target: Target) -> Result<()> {
    let chip = chip_index(target.chip)?;
    let mut out = String::new();
    let status = tcmd::flash_erase(bus, chip, target.address, &mut out);
    report("flash_erase", status, &out)
}

pub fn read_hex<H: FlashHal>(bus: &mut FlashBus<H>, target: Target, length: u32) -> Result<()> {
    let chip = chip_index(target.chip)?;
    let mut out = String::new();
    let status = tcmd::flash_read_hex(bus, chip, target.address, length as usize, &mut out);
    report("flash_read_hex", status, &out)
}

pub fn write_hex<H: FlashHal>(bus: &mut FlashBus<H>, target: Target, data: &str) -> Result<()> {
    let chip = chip_index(target.chip)?;
    let mut out = String::new();
    let status = tcmd::flash_write_hex(bus, chip, target.address, data, &mut out);
    report("flash_write_hex", status, &out)
}

pub fn benchmark<H: FlashHal>(bus: &mut FlashBus<H>, target: Target, length: u32) -> Result<()> {
    let chip = chip_index(target.chip)?;
    let mut out = String::new();
    let status = tcmd::flash_benchmark(bus, chip, target.address, length as usize, &mut out);
    report("flash_benchmark", status, &out)
}

pub fn scan<H: FlashHal>(bus: &mut FlashBus<H>) -> Result<()> {
    let mut out = String::new();
    let status = tcmd::flash_each_is_reachable(bus, &mut out);
    report("flash_each_is_reachable", status, &out)
}

pub fn reset<H: FlashHal>(bus: &mut FlashBus<H>, chip: u32) -> Result<()> {
    let chip = chip_index(chip)?;
    let mut out = String::new();
    let status = tcmd::flash_reset(bus, chip, &mut out);
    report("flash_reset", status, &out)
}

pub fn status<H: FlashHal>(bus: &mut FlashBus<H>, chip: u32) -> Result<()> {
    let chip = chip_index(chip)?;
    let mut out = String::new();
    let status = tcmd::flash_read_status(bus, chip, &mut out);
    report("flash_read_status", status, &out)
}
