// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use thumbsim_core::bus::SystemBus;
use thumbsim_core::memory::Region;
use thumbsim_core::peripherals::{GpioBank, PortId};
use thumbsim_core::{Bus, DebugControl, Machine, SimulationConfig, StopReason};

const PORTS: [(PortId, u32); 7] = [
    (PortId::A, 0x4001_0800),
    (PortId::B, 0x4001_0C00),
    (PortId::C, 0x4001_1000),
    (PortId::D, 0x4001_1400),
    (PortId::E, 0x4001_1800),
    (PortId::F, 0x4001_1C00),
    (PortId::G, 0x4001_2000),
];

#[test]
fn test_address_map_is_bit_exact() {
    assert_eq!(Region::of(0x0800_0000), Region::Flash);
    assert_eq!(Region::of(0x0800_FFFF), Region::Flash);
    assert_eq!(Region::of(0x0801_0000), Region::Unmapped);
    assert_eq!(Region::of(0x2000_0000), Region::Sram);
    assert_eq!(Region::of(0x2000_4FFF), Region::Sram);
    assert_eq!(Region::of(0x2000_5000), Region::Unmapped);
    assert_eq!(Region::of(0x4000_0000), Region::Peripheral);

    let bank = GpioBank::new();
    for (i, (id, base)) in PORTS.iter().enumerate() {
        assert_eq!(id.base_address(), *base);
        assert_eq!(bank.base_addresses()[i], *base);
        assert!(bank.contains(*base));
        assert!(bank.contains(*base + 0x3FF));
    }
    assert!(!bank.contains(0x4001_07FF));
    assert!(!bank.contains(0x4001_2400));
}

#[test]
fn test_gpio_register_offsets_on_every_port() {
    let mut bus = SystemBus::new().unwrap();
    for (n, (id, base)) in PORTS.iter().enumerate() {
        let tag = 0x100 * (n as u32 + 1);
        bus.write_u32(base + 0x00, tag | 0x1);
        bus.write_u32(base + 0x04, tag | 0x2);
        bus.write_u32(base + 0x0C, tag | 0x3);
        bus.write_u32(base + 0x18, tag | 0x4);

        let port = bus.gpio.port(*id);
        assert_eq!(port.crl, tag | 0x1);
        assert_eq!(port.crh, tag | 0x2);
        assert_eq!(port.odr, tag | 0x3);
        assert_eq!(port.lckr, tag | 0x4);
        assert_eq!(bus.read_u32(base + 0x10), tag | 0x3);
        assert_eq!(bus.read_u32(base + 0x14), tag | 0x3);
    }
}

#[test]
fn test_bsrr_from_firmware_view() {
    let mut bus = SystemBus::new().unwrap();
    let gpioc = PortId::C.base_address();

    bus.write_u32(gpioc + 0x0C, 0x0000_00F0);
    // Reset pins 4 and 5, set pins 5 and 0: pin 5 is in both halves
    bus.write_u32(gpioc + 0x10, 0x0000_0030 | (0x0000_0021 << 16));
    assert_eq!(bus.read_u32(gpioc + 0x0C), 0x0000_00E1);

    bus.write_u32(gpioc + 0x14, 0x0000_00C0);
    assert_eq!(bus.read_u32(gpioc + 0x0C), 0x0000_0021);
}

#[test]
fn test_invalid_gpio_write_leaves_neighbours_untouched() {
    let mut bus = SystemBus::new().unwrap();
    bus.write_u32(0x4001_2000 + 0x0C, 0x1234);
    bus.gpio.write_register(0x4001_2400 + 0x0C, 0xFFFF);
    bus.gpio.write_register(0xDEAD_BEEF, 0xFFFF);
    assert_eq!(bus.gpio.read_register(0x4001_2400 + 0x0C), 0xFFFF_FFFF);
    assert_eq!(bus.gpio.read_register(0x4001_2000 + 0x0C), 0x1234);
}

#[test]
fn test_harness_flow() -> anyhow::Result<()> {
    let mut machine = Machine::new(SimulationConfig::default())?;
    machine.reset();
    machine.load_program(&[0x2005, 0x2103, 0x1842, 0xE7FE])?;

    assert_eq!(machine.run(None), StopReason::MaxStepsReached);
    assert_eq!(machine.read_core_reg(0), 5);
    assert_eq!(machine.read_core_reg(1), 3);
    assert_eq!(machine.read_core_reg(2), 8);
    assert_eq!(machine.get_pc(), 0x0800_0006);
    Ok(())
}

