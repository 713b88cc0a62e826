//! Info command implementation

use cts1_flash_core::config::FlashConfig;
use cts1_flash_core::lfs::LfsGeometry;

fn size_str(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Print the board shape and the LittleFS parameters derived from it
pub fn print_info(config: &FlashConfig) {
    let g = &config.geometry;
    let t = &config.timeouts;

    println!("Flash Bank Information");
    println!("======================");
    println!();
    println!(
        "Expected ID:     {:02X} {:02X}",
        config.expected_id.manufacturer, config.expected_id.device
    );
    println!("Flash chips:     {}", g.chip_count);
    println!("Page size:       {} bytes", g.page_size);
    println!(
        "Block size:      {} ({} pages)",
        size_str(g.block_size() as u64),
        g.pages_per_block
    );
    println!(
        "Chip size:       {} ({} blocks)",
        size_str(g.chip_size() as u64),
        g.blocks_per_chip
    );
    println!(
        "Bank size:       {} ({} blocks)",
        size_str(g.chip_size() as u64 * g.chip_count as u64),
        g.total_blocks()
    );

    println!();
    println!("Select lines:");
    for (index, entry) in config.select_lines.iter().enumerate() {
        println!(
            "  {:2}  P{:?}{:<3} {:?}",
            index, entry.line.port, entry.line.pin, entry.kind
        );
    }

    println!();
    println!("Timeouts:");
    println!("  write latch     {} ms", t.latch_ms);
    println!("  page program    {} ms", t.program_ms);
    println!("  page read       {} ms", t.page_read_ms);
    println!("  block erase     {} ms", t.erase_ms);
    println!("  SPI call        {} ms", t.spi_ms);

    let lfs = LfsGeometry::from_geometry(g);
    println!();
    println!("LittleFS:");
    println!("  read_size       {}", lfs.read_size);
    println!("  prog_size       {}", lfs.prog_size);
    println!("  block_size      {}", lfs.block_size);
    println!("  block_count     {}", lfs.block_count);
    println!("  cache_size      {}", lfs.cache_size);
    println!("  lookahead_size  {}", lfs.lookahead_size);
    println!("  block_cycles    {}", lfs.block_cycles);
}
