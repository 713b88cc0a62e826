//! Scripted HAL double for unit tests inside this crate

use std::collections::VecDeque;
use std::vec::Vec;

use crate::bus::{
    ChipSelect, Clock, DeviceKind, PinLevel, Port, SelectLine, SelectLines, SpiFault, SpiMaster,
};
use crate::config::{FlashConfig, Timeouts};
use crate::geometry::Geometry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Select(SelectLine),
    Release(SelectLine),
    Tx(Vec<u8>),
    Rx(usize),
}

/// Records every line write and transfer; answers receives from a queue
pub(crate) struct ScriptedHal {
    pub events: Vec<Event>,
    pub low: Vec<SelectLine>,
    pub rx_queue: VecDeque<u8>,
    pub rx_default: u8,
    pub tx_fault: Option<SpiFault>,
    /// Fail only the transmit with this index (0 = first), counted from
    /// construction
    pub tx_fail_at: Option<(usize, SpiFault)>,
    pub tx_count: usize,
    pub rx_fault: Option<SpiFault>,
    pub now: u32,
    pub tick: u32,
}

impl ScriptedHal {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            low: Vec::new(),
            rx_queue: VecDeque::new(),
            rx_default: 0x00,
            tx_fault: None,
            tx_fail_at: None,
            tx_count: 0,
            rx_fault: None,
            now: 0,
            tick: 1,
        }
    }

    pub fn queue_rx(&mut self, bytes: &[u8]) {
        self.rx_queue.extend(bytes.iter().copied());
    }

    pub fn all_released(&self) -> bool {
        self.low.is_empty()
    }

    /// Transfers grouped by transaction, keyed by chip index
    pub fn transactions(&self) -> Vec<(u8, Vec<Event>)> {
        let lines = two_chip_lines();
        let mut out = Vec::new();
        let mut current: Option<(u8, Vec<Event>)> = None;
        for event in &self.events {
            match event {
                Event::Select(line) => {
                    let chip = lines.iter().position(|l| l.line == *line).unwrap_or(0xFF);
                    current = Some((chip as u8, Vec::new()));
                }
                Event::Release(_) => {
                    if let Some(t) = current.take() {
                        out.push(t);
                    }
                }
                other => {
                    if let Some((_, ev)) = current.as_mut() {
                        ev.push(other.clone());
                    }
                }
            }
        }
        out
    }

    /// Opcodes of every transaction, in order
    pub fn opcodes(&self) -> Vec<u8> {
        self.transactions()
            .iter()
            .filter_map(|(_, ev)| match ev.first() {
                Some(Event::Tx(bytes)) => bytes.first().copied(),
                _ => None,
            })
            .collect()
    }
}

impl SpiMaster for ScriptedHal {
    fn transmit(&mut self, data: &[u8], _timeout_ms: u32) -> Result<(), SpiFault> {
        let index = self.tx_count;
        self.tx_count += 1;
        if let Some(fault) = self.tx_fault {
            return Err(fault);
        }
        if let Some((at, fault)) = self.tx_fail_at {
            if at == index {
                return Err(fault);
            }
        }
        self.events.push(Event::Tx(data.to_vec()));
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<(), SpiFault> {
        if let Some(fault) = self.rx_fault {
            return Err(fault);
        }
        for b in buf.iter_mut() {
            *b = self.rx_queue.pop_front().unwrap_or(self.rx_default);
        }
        self.events.push(Event::Rx(buf.len()));
        Ok(())
    }
}

impl SelectLines for ScriptedHal {
    fn write_line(&mut self, line: SelectLine, level: PinLevel) {
        match level {
            PinLevel::Low => {
                if !self.low.contains(&line) {
                    self.low.push(line);
                    self.events.push(Event::Select(line));
                }
            }
            PinLevel::High => {
                if let Some(pos) = self.low.iter().position(|l| *l == line) {
                    self.low.remove(pos);
                    self.events.push(Event::Release(line));
                }
            }
        }
    }
}

impl Clock for ScriptedHal {
    fn now_ms(&mut self) -> u32 {
        let t = self.now;
        self.now = self.now.wrapping_add(self.tick);
        t
    }
}

pub(crate) fn two_chip_lines() -> [ChipSelect; 3] {
    [
        ChipSelect {
            line: SelectLine::new(Port::E, 7),
            kind: DeviceKind::Flash,
        },
        ChipSelect {
            line: SelectLine::new(Port::G, 1),
            kind: DeviceKind::Flash,
        },
        ChipSelect {
            line: SelectLine::new(Port::E, 9),
            kind: DeviceKind::Fram,
        },
    ]
}

/// Two flash chips of 1000 blocks plus one FRAM line
pub(crate) fn two_chip_config() -> FlashConfig {
    let mut config = FlashConfig::cts1();
    config.geometry = Geometry {
        chip_count: 2,
        blocks_per_chip: 1000,
        ..Geometry::MT29F1G01
    };
    config.timeouts = Timeouts::default();
    config.select_lines.clear();
    for entry in two_chip_lines() {
        let _ = config.select_lines.push(entry);
    }
    config
}
