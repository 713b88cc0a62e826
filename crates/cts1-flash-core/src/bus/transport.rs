//! SPI transport
//!
//! Frames one command (and optional data phase) into exactly one
//! chip-select bracketed transaction. The select line is released on every
//! exit path, including failures.

use super::select::ChipSelectRouter;
use super::traits::{FlashHal, SpiFault};
use crate::config::FlashConfig;
use crate::error::{Error, Result};

/// Handle that owns the board HAL and the board configuration
///
/// This is the context object every driver function takes. Only one
/// transaction can be in flight because each transport call needs
/// `&mut self` for its whole duration.
pub struct FlashBus<H> {
    hal: H,
    config: FlashConfig,
}

fn transmit_error(fault: SpiFault) -> Error {
    match fault {
        SpiFault::Timeout => Error::TransportTimeout,
        SpiFault::Error | SpiFault::Busy => Error::TransportTransmitFailed,
    }
}

fn receive_error(fault: SpiFault) -> Error {
    match fault {
        SpiFault::Timeout => Error::TransportTimeout,
        SpiFault::Error | SpiFault::Busy => Error::TransportReceiveFailed,
    }
}

impl<H: FlashHal> FlashBus<H> {
    /// Wrap a HAL and board configuration
    pub fn new(hal: H, config: FlashConfig) -> Self {
        Self { hal, config }
    }

    /// Board configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Borrow the HAL
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Mutably borrow the HAL
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Give the HAL back
    pub fn into_inner(self) -> H {
        self.hal
    }

    /// Current millisecond tick
    pub fn now_ms(&mut self) -> u32 {
        self.hal.now_ms()
    }

    /// Router over this board's chip-select table
    pub fn router(&self) -> ChipSelectRouter<'_> {
        ChipSelectRouter::new(&self.config.select_lines)
    }

    /// Transmit a command with no data phase
    pub fn send(&mut self, cmd: &[u8], chip: u8) -> Result<()> {
        self.transaction(chip, |hal, timeout_ms| {
            hal.transmit(cmd, timeout_ms).map_err(transmit_error)
        })
    }

    /// Transmit a command followed by a data phase under one select
    ///
    /// Not atomic on the wire: if the payload stage fails the command bytes
    /// have already been clocked out, and the caller must treat the target
    /// region as undefined.
    pub fn send_with_payload(&mut self, cmd: &[u8], payload: &[u8], chip: u8) -> Result<()> {
        self.transaction(chip, |hal, timeout_ms| {
            hal.transmit(cmd, timeout_ms).map_err(transmit_error)?;
            if !payload.is_empty() {
                hal.transmit(payload, timeout_ms).map_err(transmit_error)?;
            }
            Ok(())
        })
    }

    /// Transmit a command, then receive `response.len()` bytes under the
    /// same select
    ///
    /// [`Error::TransportTransmitFailed`] means the device probably never
    /// saw the command; [`Error::TransportReceiveFailed`] means it did.
    pub fn send_and_receive(&mut self, cmd: &[u8], response: &mut [u8], chip: u8) -> Result<()> {
        self.transaction(chip, |hal, timeout_ms| {
            hal.transmit(cmd, timeout_ms).map_err(transmit_error)?;
            if !response.is_empty() {
                hal.receive(response, timeout_ms).map_err(receive_error)?;
            }
            Ok(())
        })
    }

    /// Assert and release one select line with no traffic
    ///
    /// Used by the commissioning sweep that checks each line on a scope.
    pub fn pulse_select(&mut self, chip: u8) -> Result<()> {
        self.transaction(chip, |_, _| Ok(()))
    }

    fn transaction<T>(
        &mut self,
        chip: u8,
        f: impl FnOnce(&mut H, u32) -> Result<T>,
    ) -> Result<T> {
        let router = ChipSelectRouter::new(&self.config.select_lines);
        router.select(&mut self.hal, chip)?;
        let result = f(&mut self.hal, self.config.timeouts.spi_ms);
        router.deselect_all(&mut self.hal);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, ScriptedHal};

    fn bus() -> FlashBus<ScriptedHal> {
        FlashBus::new(ScriptedHal::new(), crate::testing::two_chip_config())
    }

    #[test]
    fn test_send_brackets_transaction() {
        let mut bus = bus();
        bus.send(&[0x06], 1).unwrap();
        let hal = bus.into_inner();
        assert_eq!(
            hal.transactions(),
            std::vec![(1u8, std::vec![Event::Tx(std::vec![0x06])])]
        );
        assert!(hal.all_released());
    }

    #[test]
    fn test_send_with_payload_two_stages() {
        let mut bus = bus();
        bus.send_with_payload(&[0x02, 0x00, 0x10], &[1, 2, 3], 0)
            .unwrap();
        let hal = bus.into_inner();
        let tx = hal.transactions();
        assert_eq!(tx.len(), 1);
        assert_eq!(
            tx[0].1,
            std::vec![
                Event::Tx(std::vec![0x02, 0x00, 0x10]),
                Event::Tx(std::vec![1, 2, 3])
            ]
        );
    }

    #[test]
    fn test_transmit_failure_releases_select() {
        let mut bus = bus();
        bus.hal_mut().tx_fault = Some(SpiFault::Error);
        assert_eq!(bus.send(&[0x06], 0), Err(Error::TransportTransmitFailed));
        assert!(bus.hal().all_released());
    }

    #[test]
    fn test_payload_stage_failure_after_command_went_out() {
        let mut bus = bus();
        bus.hal_mut().tx_fail_at = Some((1, SpiFault::Busy));
        assert_eq!(
            bus.send_with_payload(&[0x02, 0x00, 0x10], &[1, 2, 3], 1),
            Err(Error::TransportTransmitFailed)
        );
        let hal = bus.into_inner();
        assert!(hal.all_released());
        // the command stage was clocked out before the payload failed
        assert_eq!(
            hal.transactions(),
            std::vec![(1u8, std::vec![Event::Tx(std::vec![0x02, 0x00, 0x10])])]
        );
    }

    #[test]
    fn test_payload_stage_timeout() {
        let mut bus = bus();
        bus.hal_mut().tx_fail_at = Some((1, SpiFault::Timeout));
        assert_eq!(
            bus.send_with_payload(&[0x1F, 0xA0], &[0x00], 0),
            Err(Error::TransportTimeout)
        );
        assert!(bus.hal().all_released());
    }

    #[test]
    fn test_receive_failure_is_distinct() {
        let mut bus = bus();
        bus.hal_mut().rx_fault = Some(SpiFault::Error);
        let mut buf = [0u8; 2];
        assert_eq!(
            bus.send_and_receive(&[0x9F, 0x00], &mut buf, 0),
            Err(Error::TransportReceiveFailed)
        );
        // transmit-only traffic is unaffected
        assert_eq!(bus.send(&[0x06], 0), Ok(()));
        assert!(bus.hal().all_released());
    }

    #[test]
    fn test_peripheral_timeout_maps_to_transport_timeout() {
        let mut bus = bus();
        bus.hal_mut().rx_fault = Some(SpiFault::Timeout);
        let mut buf = [0u8; 1];
        assert_eq!(
            bus.send_and_receive(&[0x0F, 0xC0], &mut buf, 0),
            Err(Error::TransportTimeout)
        );
    }

    #[test]
    fn test_bad_chip_index_no_traffic() {
        let mut bus = bus();
        assert_eq!(bus.send(&[0x06], 7), Err(Error::ArgumentOutOfRange));
        assert!(bus.hal().events.is_empty());
    }
}
