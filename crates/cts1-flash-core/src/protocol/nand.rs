//! SPI NAND command sequences
//!
//! Each function runs one complete device operation on one chip: the
//! commands in order, the status polling between them and the mapping of
//! the outcome into [`Error`]. Nothing here retries. After any failure the
//! content of the target page or block is undefined and the caller must
//! erase it again before reuse.

use crate::bus::{FlashBus, FlashHal};
use crate::error::{Error, Result};
use crate::spi::{opcodes, FlashCommand};
use crate::status::{self, PollTarget, StatusRegister};

/// Read the manufacturer and device bytes
pub fn read_id<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<[u8; 2]> {
    let frame = FlashCommand::READ_ID.frame(0);
    let mut id = [0u8; 2];
    bus.send_and_receive(frame.as_bytes(), &mut id, chip)?;
    Ok(id)
}

/// Read the status feature register once
pub fn read_status<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<StatusRegister> {
    status::read_status(bus, chip)
}

/// Read a feature register
pub fn get_feature<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8, register: u8) -> Result<u8> {
    let frame = FlashCommand::GET_FEATURES.frame(register as u32);
    let mut buf = [0u8; 1];
    bus.send_and_receive(frame.as_bytes(), &mut buf, chip)?;
    Ok(buf[0])
}

/// Write a feature register
pub fn set_feature<H: FlashHal>(
    bus: &mut FlashBus<H>,
    chip: u8,
    register: u8,
    value: u8,
) -> Result<()> {
    let frame = FlashCommand::SET_FEATURES.frame(register as u32);
    bus.send_with_payload(frame.as_bytes(), &[value], chip)
}

/// Send WRITE ENABLE and wait for WEL to set
pub fn write_enable<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<()> {
    bus.send(FlashCommand::WRITE_ENABLE.frame(0).as_bytes(), chip)?;
    let budget = bus.config().timeouts.latch_ms;
    status::wait_for(bus, chip, PollTarget::LatchSet, budget).map(|_| ())
}

/// Send WRITE DISABLE and wait for WEL to clear
pub fn write_disable<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<()> {
    bus.send(FlashCommand::WRITE_DISABLE.frame(0).as_bytes(), chip)?;
    let budget = bus.config().timeouts.latch_ms;
    status::wait_for(bus, chip, PollTarget::LatchCleared, budget).map(|_| ())
}

/// Send RESET and wait for the device to become ready
pub fn reset<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<()> {
    bus.send(FlashCommand::RESET.frame(0).as_bytes(), chip)?;
    let budget = bus.config().timeouts.latch_ms;
    status::wait_for(bus, chip, PollTarget::Ready, budget).map(|_| ())
}

/// Bring a chip to a known state: reset, then clear every block lock bit
///
/// A lock register that still reads non-zero afterwards is logged but not
/// treated as an error; the first program or erase will then fail with a
/// device-reported error.
pub fn init<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<()> {
    bus.config().geometry.check_chip(chip)?;
    reset(bus, chip)?;
    set_feature(bus, chip, opcodes::FEAT_BLOCK_LOCK, 0x00)?;
    let lock = get_feature(bus, chip, opcodes::FEAT_BLOCK_LOCK)?;
    if lock & opcodes::BLOCK_LOCK_ALL != 0 {
        log::warn!("chip {}: block lock still 0x{:02X} after unlock", chip, lock);
    } else {
        log::debug!("chip {}: initialised", chip);
    }
    Ok(())
}

/// Erase the block containing chip byte offset `offset`
pub fn erase_block<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8, offset: u32) -> Result<()> {
    let geometry = bus.config().geometry;
    geometry.check_chip(chip)?;
    if offset >= geometry.chip_size() {
        return Err(Error::ArgumentOutOfRange);
    }
    let row = geometry.page_address(offset).row;

    arm_for_write(bus, chip)?;
    bus.send(FlashCommand::BLOCK_ERASE.frame(row).as_bytes(), chip)?;
    let budget = bus.config().timeouts.erase_ms;
    let result = status::wait_for(bus, chip, PollTarget::EraseDone, budget).map(|_| ());
    disarm_after_failure(bus, chip, result)
}

/// Program `data` into the page containing chip byte offset `offset`
///
/// `data` must not run past the end of that page. The target must have
/// been erased; programming only clears bits.
pub fn program_page<H: FlashHal>(
    bus: &mut FlashBus<H>,
    chip: u8,
    offset: u32,
    data: &[u8],
) -> Result<()> {
    let geometry = bus.config().geometry;
    geometry.check_chip(chip)?;
    geometry.check_in_page(offset, data.len())?;
    if data.is_empty() {
        return Ok(());
    }
    let page = geometry.page_address(offset);

    arm_for_write(bus, chip)?;
    bus.send_with_payload(
        FlashCommand::PROGRAM_LOAD.frame(page.column).as_bytes(),
        data,
        chip,
    )?;
    bus.send(FlashCommand::PROGRAM_EXECUTE.frame(page.row).as_bytes(), chip)?;
    let budget = bus.config().timeouts.program_ms;
    let result = status::wait_for(bus, chip, PollTarget::ProgramDone, budget).map(|_| ());
    disarm_after_failure(bus, chip, result)
}

/// Read `buf.len()` bytes from the page containing chip byte offset `offset`
pub fn read_page<H: FlashHal>(
    bus: &mut FlashBus<H>,
    chip: u8,
    offset: u32,
    buf: &mut [u8],
) -> Result<()> {
    let geometry = bus.config().geometry;
    geometry.check_chip(chip)?;
    geometry.check_in_page(offset, buf.len())?;
    if buf.is_empty() {
        return Ok(());
    }
    let page = geometry.page_address(offset);

    bus.send(FlashCommand::PAGE_READ.frame(page.row).as_bytes(), chip)?;
    let budget = bus.config().timeouts.page_read_ms;
    status::wait_for(bus, chip, PollTarget::Ready, budget)?;
    bus.send_and_receive(
        FlashCommand::READ_FROM_CACHE.frame(page.column).as_bytes(),
        buf,
        chip,
    )
}

/// Check that a flash chip answers READ ID with the expected bytes
///
/// Transport failures are returned as themselves; a readable but wrong ID
/// is [`Error::UnreachableOrWrongId`].
pub fn is_reachable<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<()> {
    bus.config().geometry.check_chip(chip)?;
    let id = read_id(bus, chip)?;
    let expected = bus.config().expected_id;
    if expected.matches(id) {
        Ok(())
    } else {
        log::debug!(
            "chip {}: ID {:02X} {:02X}, expected {:02X} {:02X}",
            chip,
            id[0],
            id[1],
            expected.manufacturer,
            expected.device
        );
        Err(Error::UnreachableOrWrongId)
    }
}

fn arm_for_write<H: FlashHal>(bus: &mut FlashBus<H>, chip: u8) -> Result<()> {
    write_enable(bus, chip).map_err(|e| {
        log::warn!("chip {}: write enable failed: {}", chip, e);
        Error::WriteEnableFailed
    })
}

/// Clear WEL after the device rejected an erase or program
///
/// Skipped on timeouts and transport failures: a busy or unreachable device
/// would not accept it anyway.
fn disarm_after_failure<H: FlashHal>(
    bus: &mut FlashBus<H>,
    chip: u8,
    result: Result<()>,
) -> Result<()> {
    if let Err(
        original @ (Error::DeviceReportedEraseError | Error::DeviceReportedProgramError),
    ) = result
    {
        if let Err(e) = write_disable(bus, chip) {
            log::warn!("chip {}: write disable after {} failed: {}", chip, original, e);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SpiFault;
    use crate::testing::{two_chip_config, Event, ScriptedHal};
    use std::vec;

    fn bus(hal: ScriptedHal) -> FlashBus<ScriptedHal> {
        FlashBus::new(hal, two_chip_config())
    }

    #[test]
    fn test_read_id() {
        let mut hal = ScriptedHal::new();
        hal.queue_rx(&[0x2C, 0x14]);
        let mut bus = bus(hal);
        assert_eq!(read_id(&mut bus, 1), Ok([0x2C, 0x14]));
        assert_eq!(
            bus.hal().transactions(),
            vec![(1, vec![Event::Tx(vec![0x9F, 0x00]), Event::Rx(2)])]
        );
    }

    #[test]
    fn test_is_reachable_distinguishes_wrong_id() {
        let mut hal = ScriptedHal::new();
        hal.queue_rx(&[0xEF, 0x40]);
        let mut bus = bus(hal);
        assert_eq!(is_reachable(&mut bus, 0), Err(Error::UnreachableOrWrongId));

        bus.hal_mut().rx_fault = Some(SpiFault::Error);
        assert_eq!(is_reachable(&mut bus, 0), Err(Error::TransportReceiveFailed));

        // the FRAM line is not a flash chip
        assert_eq!(is_reachable(&mut bus, 2), Err(Error::ArgumentOutOfRange));
    }

    #[test]
    fn test_erase_sequence() {
        let mut hal = ScriptedHal::new();
        // WEL set, then OIP clear
        hal.queue_rx(&[0x02, 0x00]);
        let mut bus = bus(hal);
        let offset = 3 * 128 * 1024;
        assert_eq!(erase_block(&mut bus, 0, offset), Ok(()));

        let tx = bus.hal().transactions();
        let frames: std::vec::Vec<_> = tx.iter().map(|(_, ev)| ev[0].clone()).collect();
        assert_eq!(
            frames,
            vec![
                Event::Tx(vec![0x06]),
                Event::Tx(vec![0x0F, 0xC0]),
                Event::Tx(vec![0xD8, 0x00, 0x00, 0xC0]),
                Event::Tx(vec![0x0F, 0xC0]),
            ]
        );
    }

    #[test]
    fn test_erase_reports_device_error_and_disarms() {
        let mut hal = ScriptedHal::new();
        // WEL set, E_FAIL, then WEL clear for the disable
        hal.queue_rx(&[0x02, 0x06, 0x00]);
        let mut bus = bus(hal);
        assert_eq!(
            erase_block(&mut bus, 0, 0),
            Err(Error::DeviceReportedEraseError)
        );
        assert_eq!(bus.hal().opcodes(), vec![0x06, 0x0F, 0xD8, 0x0F, 0x04, 0x0F]);
    }

    #[test]
    fn test_stuck_latch_is_write_enable_failure() {
        let mut hal = ScriptedHal::new();
        hal.rx_default = 0x01;
        let mut bus = bus(hal);
        assert_eq!(erase_block(&mut bus, 0, 0), Err(Error::WriteEnableFailed));
        // no erase was issued
        assert!(!bus.hal().opcodes().contains(&0xD8));

        bus.hal_mut().now = 0;
        assert_eq!(write_enable(&mut bus, 0), Err(Error::DeviceBusyTimeout));
    }

    #[test]
    fn test_program_sequence() {
        let mut hal = ScriptedHal::new();
        hal.queue_rx(&[0x02, 0x00]);
        let mut bus = bus(hal);
        let offset = 2048 * 5 + 16;
        assert_eq!(program_page(&mut bus, 1, offset, &[0xAA, 0x55]), Ok(()));

        let tx = bus.hal().transactions();
        assert_eq!(tx.len(), 5);
        assert_eq!(
            tx[2],
            (
                1,
                vec![
                    Event::Tx(vec![0x02, 0x00, 0x10]),
                    Event::Tx(vec![0xAA, 0x55])
                ]
            )
        );
        assert_eq!(tx[3], (1, vec![Event::Tx(vec![0x10, 0x00, 0x00, 0x05])]));
    }

    #[test]
    fn test_program_rejects_page_overrun() {
        let mut bus = bus(ScriptedHal::new());
        let data = [0u8; 16];
        assert_eq!(
            program_page(&mut bus, 0, 2040, &data),
            Err(Error::ArgumentOutOfRange)
        );
        assert!(bus.hal().events.is_empty());
    }

    #[test]
    fn test_read_sequence() {
        let mut hal = ScriptedHal::new();
        hal.queue_rx(&[0x01, 0x00, 0xDE, 0xAD]);
        let mut bus = bus(hal);
        let mut buf = [0u8; 2];
        assert_eq!(read_page(&mut bus, 0, 2048 + 4, &mut buf), Ok(()));
        assert_eq!(buf, [0xDE, 0xAD]);
        assert_eq!(bus.hal().opcodes(), vec![0x13, 0x0F, 0x0F, 0x03]);
        let last = bus.hal().transactions().pop().unwrap();
        assert_eq!(last.1[0], Event::Tx(vec![0x03, 0x00, 0x04, 0x00]));
    }

    #[test]
    fn test_receive_fault_is_distinct_per_operation() {
        let mut hal = ScriptedHal::new();
        hal.rx_fault = Some(SpiFault::Error);
        let mut bus = bus(hal);
        let mut buf = [0u8; 4];
        assert_eq!(
            read_page(&mut bus, 0, 0, &mut buf),
            Err(Error::TransportReceiveFailed)
        );
        assert_eq!(
            program_page(&mut bus, 0, 0, &buf),
            Err(Error::WriteEnableFailed)
        );

        bus.hal_mut().rx_fault = None;
        bus.hal_mut().tx_fault = Some(SpiFault::Error);
        assert_eq!(
            read_page(&mut bus, 0, 0, &mut buf),
            Err(Error::TransportTransmitFailed)
        );
    }

    #[test]
    fn test_init_unlocks() {
        let mut hal = ScriptedHal::new();
        // reset ready, lock readback
        hal.queue_rx(&[0x00, 0x00]);
        let mut bus = bus(hal);
        assert_eq!(init(&mut bus, 1), Ok(()));
        let tx = bus.hal().transactions();
        assert_eq!(
            tx[2].1,
            vec![Event::Tx(vec![0x1F, 0xA0]), Event::Tx(vec![0x00])]
        );
        assert_eq!(tx[3].1[0], Event::Tx(vec![0x0F, 0xA0]));
    }
}
