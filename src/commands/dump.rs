//! Dump command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use cts1_flash_core::flash::BlockDevice;
use cts1_flash_core::Error;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{CliError, Result};

/// Read `count` logical blocks starting at `start` and write them to `output`
pub fn run_dump<D: BlockDevice>(
    device: &mut D,
    start: u32,
    count: u32,
    output: &Path,
) -> Result<()> {
    let block_size = device.block_size();
    let end = start.checked_add(count).unwrap_or(u32::MAX);
    if count == 0 || end > device.block_count() {
        return Err(CliError::Flash {
            block: end.saturating_sub(1),
            source: Error::ArgumentOutOfRange,
        });
    }

    let io_err = |source: std::io::Error| CliError::Io {
        path: output.to_path_buf(),
        source,
    };
    let mut file = File::create(output).map_err(io_err)?;

    let total = count as u64 * block_size as u64;
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut buf = vec![0u8; block_size as usize];
    for block in start..end {
        device
            .read(block, 0, &mut buf)
            .map_err(|source| CliError::Flash { block, source })?;
        file.write_all(&buf).map_err(io_err)?;
        pb.inc(block_size as u64);
    }

    pb.finish_with_message("Dump complete");
    println!("Wrote {} bytes to {:?}", total, output);
    Ok(())
}
