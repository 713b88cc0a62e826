//! cts1-flash-dummy - In-memory SPI NAND emulator for testing
//!
//! This crate provides [`DummyNand`], a whole memory board in memory: one
//! emulated MT29F1G01 behind every flash select line, inert FRAM lines, a
//! simulated millisecond clock and a log of every select line change. It
//! implements the HAL traits of `cts1-flash-core`, so the real driver runs
//! against it unchanged.
//!
//! Commands are decoded from the bytes clocked out while a chip is selected
//! and take effect when the select line is released, as on the real part.
//! Receives are answered from the command bytes sent so far in the same
//! transaction.

#![no_std]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use cts1_flash_core::bus::{
    Clock, DeviceKind, PinLevel, SelectLine, SelectLines, SpiFault, SpiMaster,
};
use cts1_flash_core::config::FlashConfig;
use cts1_flash_core::geometry::Geometry;
use cts1_flash_core::spi::opcodes;
use cts1_flash_core::status::StatusRegister;

/// Emulated device behaviour
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Bytes returned by READ ID
    pub id: [u8; 2],
    /// Time a block erase keeps OIP set
    pub erase_time_ms: u32,
    /// Time a program execute keeps OIP set
    pub program_time_ms: u32,
    /// Time a page read keeps OIP set
    pub page_read_time_ms: u32,
    /// Time a reset keeps OIP set
    pub reset_time_ms: u32,
    /// Clock advance per [`Clock::now_ms`] call
    pub tick_ms: u32,
    /// Power up with every block locked, as real parts do
    pub locked_at_power_on: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            id: [0x2C, 0x14], // Micron MT29F1G01
            erase_time_ms: 3,
            program_time_ms: 1,
            page_read_time_ms: 0,
            reset_time_ms: 1,
            tick_ms: 1,
            locked_at_power_on: false,
        }
    }
}

/// Injected failures
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    /// Every transmit call fails with this fault
    pub transmit: Option<SpiFault>,
    /// Every receive call fails with this fault
    pub receive: Option<SpiFault>,
    /// Status reads always return this byte
    pub stuck_status: Option<u8>,
    /// Block erases set E_FAIL
    pub erase_fail: bool,
    /// Program executes set P_FAIL
    pub program_fail: bool,
}

/// A select line change seen by the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsEvent {
    /// Line for this table index driven low
    Assert(u8),
    /// Line for this table index driven high
    Release(u8),
}

/// One emulated SPI NAND die
#[derive(Debug, Clone)]
struct NandChip {
    present: bool,
    id: [u8; 2],
    pages: BTreeMap<u32, Vec<u8>>,
    cache: Vec<u8>,
    wel: bool,
    e_fail: bool,
    p_fail: bool,
    busy_until: u32,
    block_lock: u8,
    config_reg: u8,
    erases: u32,
    programs: u32,
}

impl NandChip {
    fn new(page_size: usize, config: &DummyConfig) -> Self {
        Self {
            present: true,
            id: config.id,
            pages: BTreeMap::new(),
            cache: vec![0xFF; page_size],
            wel: false,
            e_fail: false,
            p_fail: false,
            busy_until: 0,
            block_lock: if config.locked_at_power_on {
                opcodes::BLOCK_LOCK_ALL
            } else {
                0
            },
            config_reg: 0,
            erases: 0,
            programs: 0,
        }
    }

    fn busy(&self, now: u32) -> bool {
        (self.busy_until.wrapping_sub(now) as i32) > 0
    }

    fn status(&self, now: u32) -> StatusRegister {
        let mut status = StatusRegister::empty();
        status.set(StatusRegister::OIP, self.busy(now));
        status.set(StatusRegister::WEL, self.wel);
        status.set(StatusRegister::E_FAIL, self.e_fail);
        status.set(StatusRegister::P_FAIL, self.p_fail);
        status
    }

    fn locked(&self) -> bool {
        self.block_lock & opcodes::BLOCK_LOCK_ALL != 0
    }
}

fn be(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Emulated memory board
pub struct DummyNand {
    geometry: Geometry,
    config: DummyConfig,
    lines: Vec<(SelectLine, DeviceKind)>,
    low: Vec<bool>,
    chips: Vec<NandChip>,
    selected: Option<usize>,
    frame: Vec<u8>,
    events: Vec<CsEvent>,
    overlaps: u32,
    now: u32,
    faults: FaultPlan,
}

impl DummyNand {
    /// Emulate the board described by `board`
    pub fn new(board: &FlashConfig, config: DummyConfig) -> Self {
        let page_size = board.geometry.page_size as usize;
        let lines: Vec<_> = board
            .select_lines
            .iter()
            .map(|e| (e.line, e.kind))
            .collect();
        let chips = lines
            .iter()
            .map(|_| NandChip::new(page_size, &config))
            .collect();
        Self {
            geometry: board.geometry,
            low: vec![false; lines.len()],
            lines,
            chips,
            config,
            selected: None,
            frame: Vec::new(),
            events: Vec::new(),
            overlaps: 0,
            now: 0,
            faults: FaultPlan::default(),
        }
    }

    /// The CTS-SAT-1 board with default device behaviour
    pub fn new_default() -> Self {
        Self::new(&FlashConfig::cts1(), DummyConfig::default())
    }

    /// Fault injection plan
    pub fn faults_mut(&mut self) -> &mut FaultPlan {
        &mut self.faults
    }

    /// Emulated device behaviour
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Take a chip off the bus: it ignores commands and MISO reads 0xFF
    pub fn set_present(&mut self, chip: u8, present: bool) {
        if let Some(c) = self.chips.get_mut(chip as usize) {
            c.present = present;
        }
    }

    /// Change the READ ID answer of one chip
    pub fn set_chip_id(&mut self, chip: u8, id: [u8; 2]) {
        if let Some(c) = self.chips.get_mut(chip as usize) {
            c.id = id;
        }
    }

    /// Every select line change so far
    pub fn cs_events(&self) -> &[CsEvent] {
        &self.events
    }

    /// Forget the recorded select line changes
    pub fn clear_cs_events(&mut self) {
        self.events.clear();
    }

    /// Times a line was asserted while another was still low
    pub fn overlap_violations(&self) -> u32 {
        self.overlaps
    }

    /// True when no select line is low
    pub fn all_released(&self) -> bool {
        self.low.iter().all(|l| !l)
    }

    /// Current simulated time
    pub fn now(&self) -> u32 {
        self.now
    }

    /// Move the simulated clock forward
    pub fn advance(&mut self, ms: u32) {
        self.now = self.now.wrapping_add(ms);
    }

    /// Status register as the chip would report it now
    pub fn status(&self, chip: u8) -> Option<StatusRegister> {
        self.chips.get(chip as usize).map(|c| c.status(self.now))
    }

    /// Block lock register of a chip
    pub fn block_lock(&self, chip: u8) -> Option<u8> {
        self.chips.get(chip as usize).map(|c| c.block_lock)
    }

    /// Completed block erases on a chip
    pub fn erase_count(&self, chip: u8) -> u32 {
        self.chips.get(chip as usize).map_or(0, |c| c.erases)
    }

    /// Completed program executes on a chip
    pub fn program_count(&self, chip: u8) -> u32 {
        self.chips.get(chip as usize).map_or(0, |c| c.programs)
    }

    /// Array contents, bypassing the SPI protocol
    pub fn peek(&self, chip: u8, offset: u32, buf: &mut [u8]) {
        let page_size = self.geometry.page_size;
        let Some(c) = self.chips.get(chip as usize) else {
            buf.fill(0xFF);
            return;
        };
        for (i, b) in buf.iter_mut().enumerate() {
            let at = offset as usize + i;
            let row = (at / page_size as usize) as u32;
            let column = at % page_size as usize;
            *b = c.pages.get(&row).map_or(0xFF, |p| p[column]);
        }
    }

    /// True if every page of a block is erased
    pub fn is_block_erased(&self, chip: u8, block: u32) -> bool {
        let ppb = self.geometry.pages_per_block;
        let rows = block * ppb..(block + 1) * ppb;
        self.chips
            .get(chip as usize)
            .is_some_and(|c| c.pages.range(rows).next().is_none())
    }

    fn line_index(&self, line: SelectLine) -> Option<usize> {
        self.lines.iter().position(|(l, _)| *l == line)
    }

    fn is_flash(&self, index: usize) -> bool {
        matches!(self.lines.get(index), Some((_, DeviceKind::Flash)))
    }

    fn rows_per_chip(&self) -> u32 {
        self.geometry.pages_per_block * self.geometry.blocks_per_chip
    }

    /// Bytes MISO carries for the current transaction
    fn respond(&self, buf: &mut [u8]) {
        buf.fill(0xFF);
        let Some(index) = self.selected else { return };
        if !self.is_flash(index) {
            buf.fill(0x00);
            return;
        }
        let chip = &self.chips[index];
        if !chip.present {
            return;
        }
        let frame = &self.frame;
        match frame.first().copied() {
            Some(opcodes::READ_ID) => {
                for (b, id) in buf.iter_mut().zip(chip.id) {
                    *b = id;
                }
            }
            Some(opcodes::GET_FEATURES) if frame.len() >= 2 => {
                let value = match frame[1] {
                    opcodes::FEAT_STATUS => self
                        .faults
                        .stuck_status
                        .unwrap_or_else(|| chip.status(self.now).bits()),
                    opcodes::FEAT_BLOCK_LOCK => chip.block_lock,
                    opcodes::FEAT_CONFIG => chip.config_reg,
                    _ => 0x00,
                };
                buf.fill(value);
            }
            Some(opcodes::READ_FROM_CACHE) if frame.len() >= 4 => {
                let column = be(&frame[1..3]) as usize;
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = chip.cache.get(column + i).copied().unwrap_or(0xFF);
                }
            }
            _ => {}
        }
    }

    /// Apply the command held in `frame` to chip `index`
    fn commit(&mut self, index: usize) {
        let frame = core::mem::take(&mut self.frame);
        if !self.is_flash(index) || frame.is_empty() {
            return;
        }
        let now = self.now;
        let rows = self.rows_per_chip();
        let ppb = self.geometry.pages_per_block;
        let page_size = self.geometry.page_size as usize;
        let config = self.config.clone();
        let faults = self.faults.clone();
        let chip = &mut self.chips[index];
        if !chip.present {
            return;
        }

        let opcode = frame[0];
        if chip.busy(now) && opcode != opcodes::GET_FEATURES && opcode != opcodes::RESET {
            log::debug!("dummy chip {}: 0x{:02X} ignored while busy", index, opcode);
            return;
        }

        match opcode {
            opcodes::WRITE_ENABLE => chip.wel = true,
            opcodes::WRITE_DISABLE => chip.wel = false,
            opcodes::RESET => {
                chip.wel = false;
                chip.busy_until = now.wrapping_add(config.reset_time_ms);
            }
            opcodes::SET_FEATURES if frame.len() >= 3 => match frame[1] {
                opcodes::FEAT_BLOCK_LOCK => chip.block_lock = frame[2],
                opcodes::FEAT_CONFIG => chip.config_reg = frame[2],
                _ => {}
            },
            opcodes::PAGE_READ if frame.len() >= 4 => {
                let row = be(&frame[1..4]);
                if row < rows {
                    match chip.pages.get(&row) {
                        Some(page) => chip.cache.copy_from_slice(page),
                        None => chip.cache.fill(0xFF),
                    }
                    chip.busy_until = now.wrapping_add(config.page_read_time_ms);
                }
            }
            opcodes::PROGRAM_LOAD if frame.len() >= 3 => {
                let column = be(&frame[1..3]) as usize;
                chip.cache.fill(0xFF);
                for (i, b) in frame[3..].iter().enumerate() {
                    if let Some(slot) = chip.cache.get_mut(column + i) {
                        *slot = *b;
                    }
                }
            }
            opcodes::PROGRAM_EXECUTE if frame.len() >= 4 => {
                let row = be(&frame[1..4]);
                if !chip.wel || row >= rows {
                    return;
                }
                chip.wel = false;
                chip.busy_until = now.wrapping_add(config.program_time_ms);
                if faults.program_fail || chip.locked() {
                    chip.p_fail = true;
                    return;
                }
                chip.p_fail = false;
                let page = chip.pages.entry(row).or_insert_with(|| vec![0xFF; page_size]);
                // programming only clears bits
                for (cell, b) in page.iter_mut().zip(chip.cache.iter()) {
                    *cell &= *b;
                }
                chip.programs += 1;
            }
            opcodes::BLOCK_ERASE if frame.len() >= 4 => {
                let row = be(&frame[1..4]);
                if !chip.wel || row >= rows {
                    return;
                }
                chip.wel = false;
                chip.busy_until = now.wrapping_add(config.erase_time_ms);
                if faults.erase_fail || chip.locked() {
                    chip.e_fail = true;
                    return;
                }
                chip.e_fail = false;
                let first = row - row % ppb;
                let erased: Vec<u32> = chip.pages.range(first..first + ppb).map(|(r, _)| *r).collect();
                for r in erased {
                    chip.pages.remove(&r);
                }
                chip.erases += 1;
            }
            _ => {}
        }
        log::trace!("dummy chip {}: 0x{:02X} committed", index, opcode);
    }
}

impl SpiMaster for DummyNand {
    fn transmit(&mut self, data: &[u8], _timeout_ms: u32) -> Result<(), SpiFault> {
        if let Some(fault) = self.faults.transmit {
            return Err(fault);
        }
        if self.selected.is_some() {
            self.frame.extend_from_slice(data);
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<(), SpiFault> {
        if let Some(fault) = self.faults.receive {
            return Err(fault);
        }
        self.respond(buf);
        Ok(())
    }
}

impl SelectLines for DummyNand {
    fn write_line(&mut self, line: SelectLine, level: PinLevel) {
        let Some(index) = self.line_index(line) else {
            log::warn!("dummy: write to unknown select line {:?}", line);
            return;
        };
        match level {
            PinLevel::Low => {
                if self.low[index] {
                    return;
                }
                if self.low.iter().any(|l| *l) {
                    self.overlaps += 1;
                }
                self.low[index] = true;
                self.selected = Some(index);
                self.frame.clear();
                self.events.push(CsEvent::Assert(index as u8));
            }
            PinLevel::High => {
                if !self.low[index] {
                    return;
                }
                self.low[index] = false;
                self.events.push(CsEvent::Release(index as u8));
                if self.selected == Some(index) {
                    self.selected = None;
                    self.commit(index);
                }
            }
        }
    }
}

impl Clock for DummyNand {
    fn now_ms(&mut self) -> u32 {
        let now = self.now;
        self.now = self.now.wrapping_add(self.config.tick_ms);
        now
    }
}
