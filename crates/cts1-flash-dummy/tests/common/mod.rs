#![allow(dead_code)]

use cts1_flash_core::bus::{ChipSelect, DeviceKind, FlashBus, Port, SelectLine};
use cts1_flash_core::config::FlashConfig;
use cts1_flash_core::flash::FlashArray;
use cts1_flash_dummy::{DummyConfig, DummyNand};

/// Route driver logs to the test harness; `RUST_LOG=debug` to see them
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Flight board on the emulator
pub fn cts1_bus() -> FlashBus<DummyNand> {
    init_logging();
    let config = FlashConfig::cts1();
    FlashBus::new(DummyNand::new(&config, DummyConfig::default()), config)
}

/// Two chips of 1000 blocks, plus one FRAM line
pub fn two_chip_config() -> FlashConfig {
    let mut config = FlashConfig::cts1();
    config.geometry.chip_count = 2;
    config.geometry.blocks_per_chip = 1000;
    config.select_lines.clear();
    for (port, pin, kind) in [
        (Port::E, 7, DeviceKind::Flash),
        (Port::G, 1, DeviceKind::Flash),
        (Port::E, 9, DeviceKind::Fram),
    ] {
        config
            .select_lines
            .push(ChipSelect {
                line: SelectLine::new(port, pin),
                kind,
            })
            .unwrap();
    }
    config.validate().unwrap();
    config
}

pub fn two_chip_array() -> FlashArray<DummyNand> {
    init_logging();
    let config = two_chip_config();
    FlashArray::new(FlashBus::new(
        DummyNand::new(&config, DummyConfig::default()),
        config,
    ))
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i + 42) % 256) as u8).collect()
}
