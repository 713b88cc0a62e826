//! Fault injection: timeouts, error classification and recovery

mod common;

use common::{cts1_bus, pattern};
use cts1_flash_core::bus::{FlashBus, SpiFault};
use cts1_flash_core::status::StatusRegister;
use cts1_flash_core::{protocol, Error};
use cts1_flash_dummy::DummyNand;

/// Allowed overrun past a budget: the final status read plus clock reads
const SLACK_MS: u32 = 5;

fn elapsed<T>(bus: &mut FlashBus<DummyNand>, f: impl FnOnce(&mut FlashBus<DummyNand>) -> T) -> (T, u32) {
    let start = bus.hal().now();
    let result = f(bus);
    (result, bus.hal().now().wrapping_sub(start))
}

#[test]
fn stuck_busy_times_out_within_budget() {
    let mut bus = cts1_bus();
    let t = bus.config().timeouts;
    // OIP and WEL stuck on: the latch phase passes, completion never comes
    bus.hal_mut().faults_mut().stuck_status = Some(0x03);

    let (result, ms) = elapsed(&mut bus, |bus| protocol::erase_block(bus, 0, 0));
    assert_eq!(result, Err(Error::DeviceBusyTimeout));
    assert!(ms > t.erase_ms && ms <= t.erase_ms + t.latch_ms + SLACK_MS, "erase took {} ms", ms);

    let (result, ms) = elapsed(&mut bus, |bus| protocol::program_page(bus, 0, 0, &[0u8; 16]));
    assert_eq!(result, Err(Error::DeviceBusyTimeout));
    assert!(ms > t.program_ms && ms <= t.program_ms + t.latch_ms + SLACK_MS, "program took {} ms", ms);

    let (result, ms) = elapsed(&mut bus, |bus| protocol::write_disable(bus, 0));
    assert_eq!(result, Err(Error::DeviceBusyTimeout));
    assert!(ms > t.latch_ms && ms <= t.latch_ms + SLACK_MS, "write disable took {} ms", ms);
}

#[test]
fn stuck_latch_times_out_within_budget() {
    let mut bus = cts1_bus();
    let t = bus.config().timeouts;
    // busy with WEL never set
    bus.hal_mut().faults_mut().stuck_status = Some(0x01);

    let (result, ms) = elapsed(&mut bus, |bus| protocol::write_enable(bus, 1));
    assert_eq!(result, Err(Error::DeviceBusyTimeout));
    assert!(ms > t.latch_ms && ms <= t.latch_ms + SLACK_MS, "write enable took {} ms", ms);

    let (result, ms) = elapsed(&mut bus, |bus| protocol::erase_block(bus, 1, 0));
    assert_eq!(result, Err(Error::WriteEnableFailed));
    assert!(ms <= t.latch_ms + SLACK_MS);

    let (result, _) = elapsed(&mut bus, |bus| protocol::program_page(bus, 1, 0, &[0xA5]));
    assert_eq!(result, Err(Error::WriteEnableFailed));
}

#[test]
fn receive_only_fault_is_distinguishable() {
    let mut bus = cts1_bus();
    bus.hal_mut().faults_mut().receive = Some(SpiFault::Error);

    let mut buf = [0u8; 32];
    let read = protocol::read_page(&mut bus, 0, 0, &mut buf);
    let program = protocol::program_page(&mut bus, 0, 0, &buf);
    let erase = protocol::erase_block(&mut bus, 0, 0);
    let probe = protocol::is_reachable(&mut bus, 0);

    assert_eq!(read, Err(Error::TransportReceiveFailed));
    assert_eq!(probe, Err(Error::TransportReceiveFailed));
    assert_eq!(program, Err(Error::WriteEnableFailed));
    assert_eq!(erase, Err(Error::WriteEnableFailed));
    assert_ne!(read.unwrap_err().code(), program.unwrap_err().code());

    bus.hal_mut().faults_mut().receive = None;
    bus.hal_mut().faults_mut().transmit = Some(SpiFault::Error);
    let read_tx = protocol::read_page(&mut bus, 0, 0, &mut buf);
    assert_eq!(read_tx, Err(Error::TransportTransmitFailed));
    assert_ne!(read_tx, read);
    assert!(bus.hal().all_released());
}

#[test]
fn peripheral_timeout_is_transport_timeout() {
    let mut bus = cts1_bus();
    bus.hal_mut().faults_mut().transmit = Some(SpiFault::Timeout);
    let mut buf = [0u8; 4];
    assert_eq!(
        protocol::read_page(&mut bus, 0, 0, &mut buf),
        Err(Error::TransportTimeout)
    );
    assert_eq!(protocol::read_id(&mut bus, 0), Err(Error::TransportTimeout));
}

#[test]
fn device_errors_clear_the_latch() {
    let mut bus = cts1_bus();
    bus.hal_mut().faults_mut().erase_fail = true;
    assert_eq!(
        protocol::erase_block(&mut bus, 2, 0),
        Err(Error::DeviceReportedEraseError)
    );
    let status = bus.hal().status(2).unwrap();
    assert!(status.contains(StatusRegister::E_FAIL));
    assert!(!status.contains(StatusRegister::WEL));

    bus.hal_mut().faults_mut().erase_fail = false;
    bus.hal_mut().faults_mut().program_fail = true;
    assert_eq!(
        protocol::program_page(&mut bus, 2, 0, &pattern(16)),
        Err(Error::DeviceReportedProgramError)
    );
    assert!(!bus.hal().status(2).unwrap().contains(StatusRegister::WEL));

    // the driver does not retry; a clean erase recovers the block
    bus.hal_mut().faults_mut().program_fail = false;
    assert_eq!(protocol::erase_block(&mut bus, 2, 0), Ok(()));
    assert_eq!(protocol::program_page(&mut bus, 2, 0, &pattern(16)), Ok(()));
}

#[test]
fn unreachable_and_wrong_id() {
    let mut bus = cts1_bus();
    bus.hal_mut().set_present(1, false);
    bus.hal_mut().set_chip_id(2, [0xEF, 0x40]);

    assert_eq!(protocol::is_reachable(&mut bus, 0), Ok(()));
    assert_eq!(protocol::is_reachable(&mut bus, 1), Err(Error::UnreachableOrWrongId));
    assert_eq!(protocol::is_reachable(&mut bus, 2), Err(Error::UnreachableOrWrongId));
    // absent chip: MISO floats high, so every status bit reads set
    assert_eq!(
        protocol::erase_block(&mut bus, 1, 0),
        Err(Error::DeviceReportedEraseError)
    );
    let mut buf = [0u8; 1];
    assert_eq!(
        protocol::read_page(&mut bus, 1, 0, &mut buf),
        Err(Error::DeviceBusyTimeout)
    );
}

#[test]
fn unknown_is_never_returned() {
    type Setup = fn(&mut DummyNand);
    let setups: [Setup; 12] = [
        |_| {},
        |n| n.faults_mut().transmit = Some(SpiFault::Error),
        |n| n.faults_mut().transmit = Some(SpiFault::Busy),
        |n| n.faults_mut().transmit = Some(SpiFault::Timeout),
        |n| n.faults_mut().receive = Some(SpiFault::Error),
        |n| n.faults_mut().receive = Some(SpiFault::Busy),
        |n| n.faults_mut().receive = Some(SpiFault::Timeout),
        |n| n.faults_mut().stuck_status = Some(0x01),
        |n| n.faults_mut().stuck_status = Some(0x03),
        |n| n.faults_mut().stuck_status = Some(0x0E),
        |n| {
            n.faults_mut().erase_fail = true;
            n.faults_mut().program_fail = true;
        },
        |n| n.set_present(0, false),
    ];

    for (i, setup) in setups.iter().enumerate() {
        let mut bus = cts1_bus();
        setup(bus.hal_mut());
        let mut buf = [0u8; 8];
        let results = [
            protocol::write_enable(&mut bus, 0),
            protocol::write_disable(&mut bus, 0),
            protocol::erase_block(&mut bus, 0, 0),
            protocol::program_page(&mut bus, 0, 0, &[0x5A; 8]),
            protocol::read_page(&mut bus, 0, 0, &mut buf),
            protocol::is_reachable(&mut bus, 0),
            protocol::reset(&mut bus, 0),
            protocol::init(&mut bus, 0),
            protocol::erase_block(&mut bus, 9, 0),
        ];
        for (j, result) in results.iter().enumerate() {
            assert_ne!(*result, Err(Error::Unknown), "setup {} operation {}", i, j);
        }
        assert!(bus.hal().all_released(), "setup {}", i);
    }
}
