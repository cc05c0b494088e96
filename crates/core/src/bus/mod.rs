// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::memory::{LinearMemory, Region, FLASH_BASE, FLASH_SIZE, SRAM_BASE, SRAM_SIZE};
use crate::peripherals::gpio::GpioBank;
use crate::{Bus, SimResult, SimulationError};

/// Byte read back from any address with no byte-level backing store.
pub const OPEN_BUS_BYTE: u8 = 0xFF;

/// Unified memory bus: code memory, working memory and the GPIO bank.
#[derive(Debug)]
pub struct SystemBus {
    pub flash: LinearMemory,
    pub ram: LinearMemory,
    pub gpio: GpioBank,
}

impl SystemBus {
    /// Allocates both zero-filled backing stores. If the RAM allocation
    /// fails, the flash buffer is dropped before the error is returned.
    pub fn new() -> SimResult<Self> {
        let flash = LinearMemory::try_new("flash", FLASH_SIZE, FLASH_BASE)?;
        let ram = LinearMemory::try_new("sram", SRAM_SIZE, SRAM_BASE)?;
        tracing::debug!(
            "Bus initialized: flash={}KB @ {:#010x}, sram={}KB @ {:#010x}",
            FLASH_SIZE / 1024,
            FLASH_BASE,
            SRAM_SIZE / 1024,
            SRAM_BASE
        );
        Ok(Self {
            flash,
            ram,
            gpio: GpioBank::new(),
        })
    }

    /// Setup-time programming path into code memory. Runtime writes through
    /// [`Bus::write_u8`] never reach flash.
    pub fn program(&mut self, addr: u32, bytes: &[u8]) -> SimResult<()> {
        if self.flash.load(addr, bytes) {
            return Ok(());
        }
        let capacity = match addr.checked_sub(self.flash.base_addr) {
            Some(offset) => self.flash.size().saturating_sub(offset as usize),
            None => 0,
        };
        Err(SimulationError::ProgramTooLarge {
            addr,
            len: bytes.len(),
            capacity,
        })
    }
}

impl Bus for SystemBus {
    fn read_u8(&self, addr: u32) -> u8 {
        if let Some(val) = self.flash.read_u8(addr) {
            return val;
        }
        if let Some(val) = self.ram.read_u8(addr) {
            return val;
        }
        OPEN_BUS_BYTE
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        if self.ram.write_u8(addr, value) {
            return;
        }
        if self.flash.contains(addr) {
            tracing::trace!("Write to code memory at {:#010x} ignored", addr);
        }
    }

    fn read_u32(&self, addr: u32) -> u32 {
        if Region::of(addr) == Region::Peripheral {
            if self.gpio.contains(addr) {
                return self.gpio.read_register(addr);
            }
            // Peripherals other than GPIO are not modelled
            return 0;
        }
        u32::from_le_bytes([
            self.read_u8(addr),
            self.read_u8(addr.wrapping_add(1)),
            self.read_u8(addr.wrapping_add(2)),
            self.read_u8(addr.wrapping_add(3)),
        ])
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        if Region::of(addr) == Region::Peripheral {
            self.gpio.write_register(addr, value);
            return;
        }
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.write_u8(addr.wrapping_add(i as u32), byte);
        }
    }
}
