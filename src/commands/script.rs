//! Script command implementation
//!
//! One telecommand per line in the uplink form, e.g.
//! `CTS1+flash_write_hex(0,0x100,cafe)!`. Blank lines and lines starting
//! with `#` are skipped. Every line runs against the same board, so an
//! erase on one line is visible to a read on the next.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use cts1_flash_core::bus::{FlashBus, FlashHal};
use cts1_flash_core::tcmd;

use crate::error::{CliError, Result};

/// Run a script file, or stdin when `path` is `-`
pub fn run_script<H: FlashHal>(bus: &mut FlashBus<H>, path: &Path) -> Result<()> {
    let io_err = |source: std::io::Error| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader: Box<dyn Read> = if path.as_os_str() == "-" {
        Box::new(std::io::stdin())
    } else {
        Box::new(std::fs::File::open(path).map_err(io_err)?)
    };
    let name = path.display().to_string();

    let mut total = 0usize;
    let mut failed = 0usize;
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(io_err)?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        println!("> {}", text);
        let mut out = String::new();
        let status = tcmd::dispatch(bus, text, &mut out).ok_or_else(|| CliError::UnknownCommand {
            path: name.clone(),
            line: index + 1,
            text: text.to_string(),
        })?;
        print!("{}", out);
        total += 1;
        if status != 0 {
            log::warn!("line {}: status {}", index + 1, status);
            failed += 1;
        }
    }

    println!("{} telecommands, {} failed", total, failed);
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::ScriptFailed { failed, total })
    }
}

/// Commands a script may use, for the help text
pub fn print_commands() {
    println!("Telecommands:");
    for (name, args) in tcmd::COMMANDS {
        println!("  {}({})", name, args);
    }
}
