//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "cts1-flash")]
#[command(author, version, about = "CTS-SAT-1 SPI NAND flash console", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Board file (TOML format); defaults to the CTS-SAT-1 flight board
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Chip and address shared by the single-page commands
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct Target {
    /// Flash chip index
    #[arg(value_parser = parse_hex_u32)]
    pub chip: u32,

    /// Byte address within the chip (hex, e.g., 0x20000)
    #[arg(value_parser = parse_hex_u32)]
    pub address: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Erase the block containing an address
    Erase {
        #[command(flatten)]
        target: Target,
    },

    /// Read bytes from one page and print a hex dump
    ReadHex {
        #[command(flatten)]
        target: Target,

        /// Number of bytes to read (at most one page)
        #[arg(value_parser = parse_hex_u32)]
        length: u32,
    },

    /// Program hex bytes into an erased page
    WriteHex {
        #[command(flatten)]
        target: Target,

        /// Data as hex digit pairs, e.g. "deadbeef"
        data: String,
    },

    /// Erase, program, read back and verify one page with timing
    Benchmark {
        #[command(flatten)]
        target: Target,

        /// Number of bytes to program (at most one page)
        #[arg(value_parser = parse_hex_u32, default_value = "2048")]
        length: u32,
    },

    /// Check that every flash chip answers with the expected ID
    Scan,

    /// Reset a chip and clear its block locks
    Reset {
        /// Flash chip index
        #[arg(value_parser = parse_hex_u32)]
        chip: u32,
    },

    /// Show the status register of a chip
    Status {
        /// Flash chip index
        #[arg(value_parser = parse_hex_u32)]
        chip: u32,
    },

    /// Show board geometry and filesystem parameters
    Info,

    /// Read logical blocks through the block device into a file
    Dump {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// First logical block
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of blocks to read
        #[arg(long, value_parser = parse_hex_u32, default_value = "1")]
        count: u32,
    },

    /// Run telecommands, one per line, against a single board
    Script {
        /// Script file, or "-" for stdin
        file: PathBuf,
    },
}
