//! Telecommands end to end on the emulated board

mod common;

use common::cts1_bus;
use cts1_flash_core::diag::BenchKind;
use cts1_flash_core::{tcmd, Error};

#[test]
fn erase_write_read_round_trip() {
    let mut bus = cts1_bus();
    let mut out = String::new();

    assert_eq!(tcmd::dispatch(&mut bus, "CTS1+flash_erase(3,0x20000)!", &mut out), Some(0));
    assert!(out.contains("erased chip 3 block 1"), "{}", out);
    assert!(bus.hal().is_block_erased(3, 1));

    out.clear();
    assert_eq!(
        tcmd::dispatch(&mut bus, "flash_write_hex(3, 0x20010, de ad be ef 01)", &mut out),
        Some(0)
    );
    assert!(out.contains("wrote 5 bytes"), "{}", out);

    out.clear();
    assert_eq!(
        tcmd::dispatch(&mut bus, "flash_read_hex(3,0x20010,5)", &mut out),
        Some(0)
    );
    assert_eq!(out.trim_end(), "0x00020010: DE AD BE EF 01");
}

#[test]
fn write_hex_rejects_page_crossing() {
    let mut bus = cts1_bus();
    let mut out = String::new();
    // two bytes starting on the last byte of page 0
    let status = tcmd::dispatch(&mut bus, "flash_write_hex(0,2047,aabb)", &mut out);
    assert_eq!(status, Some(Error::ArgumentOutOfRange.code()));
    assert_eq!(bus.hal().program_count(0), 0);
}

#[test]
fn each_is_reachable_reports_missing_chip() {
    let mut bus = cts1_bus();
    bus.hal_mut().set_present(2, false);
    let mut out = String::new();

    let status = tcmd::dispatch(&mut bus, "flash_each_is_reachable()", &mut out);
    assert_eq!(status, Some(Error::UnreachableOrWrongId.code()));
    assert!(out.contains("chip 0: OK"));
    assert!(out.contains("chip 2: ERROR 8"), "{}", out);
    assert!(out.contains("3/4 chips reachable"), "{}", out);
    assert!(bus.hal().all_released());
}

#[test]
fn benchmark_passes_on_healthy_chip() {
    let mut bus = cts1_bus();
    let mut out = String::new();
    let status = tcmd::dispatch(&mut bus, "flash_benchmark(1, 0x40000, 2048)", &mut out);
    assert_eq!(status, Some(BenchKind::Pass.code()));
    assert!(out.contains("PASS (2048 bytes)"), "{}", out);
    assert_eq!(bus.hal().erase_count(1), 1);
}

#[test]
fn benchmark_rejects_oversize_length() {
    let mut bus = cts1_bus();
    let mut out = String::new();
    let status = tcmd::dispatch(&mut bus, "flash_benchmark(0,0,4096)", &mut out);
    assert_eq!(status, Some(BenchKind::Rejected.code()));
    assert!(bus.hal().cs_events().is_empty());
}

#[test]
fn benchmark_reports_program_stage() {
    let mut bus = cts1_bus();
    bus.hal_mut().faults_mut().program_fail = true;
    let mut out = String::new();
    let status = tcmd::dispatch(&mut bus, "flash_benchmark(0,0,256)", &mut out);
    assert_eq!(status, Some(BenchKind::ProgramFailed.code()));
    assert_eq!(status, Some(2));
}

#[test]
fn reset_unlocks_and_status_reads_back() {
    let mut bus = cts1_bus();
    let mut out = String::new();
    assert_eq!(tcmd::dispatch(&mut bus, "flash_reset(0)", &mut out), Some(0));
    assert_eq!(bus.hal().block_lock(0), Some(0));

    out.clear();
    assert_eq!(tcmd::dispatch(&mut bus, "flash_write_enable(0)", &mut out), Some(0));
    out.clear();
    assert_eq!(tcmd::dispatch(&mut bus, "flash_read_status(0)", &mut out), Some(0));
    assert!(out.contains("status 0x02"), "{}", out);

    out.clear();
    assert_eq!(tcmd::dispatch(&mut bus, "flash_read_id(0)", &mut out), Some(0));
    assert!(out.contains("ID 2C 14"), "{}", out);
}
