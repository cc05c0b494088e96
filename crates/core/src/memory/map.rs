// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Fixed Cortex-M3 address map.

/// Code memory (flash).
pub const FLASH_BASE: u32 = 0x0800_0000;
pub const FLASH_SIZE: usize = 64 * 1024;

/// Working memory (SRAM).
pub const SRAM_BASE: u32 = 0x2000_0000;
pub const SRAM_SIZE: usize = 20 * 1024;

/// Peripheral dispatch region (0x4000_0000..0x6000_0000 on Cortex-M).
pub const PERIPH_BASE: u32 = 0x4000_0000;
pub const PERIPH_SIZE: u32 = 0x2000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Flash,
    Sram,
    Peripheral,
    Unmapped,
}

impl Region {
    /// Classifies `addr` into one of the disjoint regions of the map.
    pub fn of(addr: u32) -> Self {
        if in_range(addr, FLASH_BASE, FLASH_SIZE as u32) {
            Region::Flash
        } else if in_range(addr, SRAM_BASE, SRAM_SIZE as u32) {
            Region::Sram
        } else if in_range(addr, PERIPH_BASE, PERIPH_SIZE) {
            Region::Peripheral
        } else {
            Region::Unmapped
        }
    }
}

#[inline]
pub(crate) fn in_range(addr: u32, base: u32, size: u32) -> bool {
    addr >= base && addr - base < size
}

/// True while `addr` lies inside code memory.
#[inline]
pub fn in_flash(addr: u32) -> bool {
    in_range(addr, FLASH_BASE, FLASH_SIZE as u32)
}
