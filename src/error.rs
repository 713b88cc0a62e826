//! Console error types

use std::path::PathBuf;

use cts1_flash_core::config::ConfigError;
use thiserror::Error;

/// Errors raised by the console itself rather than by the flash stack
#[derive(Debug, Error)]
pub enum CliError {
    /// Board file could not be loaded
    #[error("Failed to load board file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Chip index does not fit the telecommand argument
    #[error("Chip index {0} is out of range")]
    ChipIndex(u32),

    /// A telecommand finished with a non-zero status
    #[error("{command} failed with status {status}")]
    Telecommand { command: &'static str, status: u8 },

    /// A script line named no known telecommand
    #[error("{path}:{line}: unknown telecommand `{text}`")]
    UnknownCommand {
        path: String,
        line: usize,
        text: String,
    },

    /// Script lines that failed
    #[error("{failed} of {total} telecommands failed")]
    ScriptFailed { failed: usize, total: usize },

    /// Block device error while dumping
    #[error("Block {block}: {source}")]
    Flash {
        block: u32,
        #[source]
        source: cts1_flash_core::Error,
    },

    /// File I/O failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for console commands
pub type Result<T> = std::result::Result<T, CliError>;

/// Narrow a CLI chip argument to a select-line index
pub fn chip_index(chip: u32) -> Result<u8> {
    u8::try_from(chip).map_err(|_| CliError::ChipIndex(chip))
}
