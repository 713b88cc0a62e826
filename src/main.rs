//! cts1-flash - commissioning console for the CTS-SAT-1 flash bank
//!
//! Drives the SPI NAND driver stack from the command line. Every command
//! runs against the `cts1-flash-dummy` board emulator, configured from the
//! flight board table or a TOML board file, and prints what the matching
//! telecommand would send to the ground.
//!
//! # Architecture
//!
//! - `cts1_flash_core::bus` routes chip selects and brackets SPI transfers
//! - `cts1_flash_core::protocol` runs the per-chip NAND command flows
//! - `cts1_flash_core::flash` joins the chips into one block device
//! - `cts1_flash_core::tcmd` parses and answers telecommands
//!
//! The console only wires those together; it holds no flash logic itself.

mod cli;
mod commands;
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use cts1_flash_core::bus::FlashBus;
use cts1_flash_core::config::{self, FlashConfig};
use cts1_flash_core::flash::FlashArray;
use cts1_flash_dummy::{DummyConfig, DummyNand};
use error::CliError;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let board = match load_board(cli.config.as_deref()) {
        Ok(board) => board,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Commands::Info = cli.command {
        commands::info::print_info(&board);
        return Ok(());
    }

    let nand = DummyNand::new(&board, DummyConfig::default());
    let mut bus = FlashBus::new(nand, board);
    log::debug!(
        "emulated board: {} flash chips, {} select lines",
        bus.config().geometry.chip_count,
        bus.config().select_lines.len()
    );

    let result = match cli.command {
        Commands::Erase { target } => commands::erase(&mut bus, target),
        Commands::ReadHex { target, length } => commands::read_hex(&mut bus, target, length),
        Commands::WriteHex { target, data } => commands::write_hex(&mut bus, target, &data),
        Commands::Benchmark { target, length } => commands::benchmark(&mut bus, target, length),
        Commands::Scan => commands::scan(&mut bus),
        Commands::Reset { chip } => commands::reset(&mut bus, chip),
        Commands::Status { chip } => commands::status(&mut bus, chip),
        Commands::Dump {
            output,
            start,
            count,
        } => {
            let mut array = FlashArray::new(bus);
            array
                .init()
                .map_err(|source| CliError::Flash { block: start, source })
                .and_then(|()| commands::dump::run_dump(&mut array, start, count, &output))
        }
        Commands::Script { file } => commands::script::run_script(&mut bus, &file),
        Commands::Info => Ok(()),
    };

    if let Err(CliError::UnknownCommand { .. }) = &result {
        commands::script::print_commands();
    }
    result.map_err(Into::into)
}

/// Load the board file, or fall back to the flight board
fn load_board(path: Option<&Path>) -> Result<FlashConfig, CliError> {
    match path {
        Some(path) => {
            let board = config::from_toml_file(path).map_err(|source| CliError::Config {
                path: path.to_path_buf(),
                source,
            })?;
            log::info!("Loaded board file {:?}", path);
            Ok(board)
        }
        None => Ok(FlashConfig::cts1()),
    }
}
