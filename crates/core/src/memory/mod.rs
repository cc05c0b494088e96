// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod map;

pub use map::{
    in_flash, Region, FLASH_BASE, FLASH_SIZE, PERIPH_BASE, PERIPH_SIZE, SRAM_BASE, SRAM_SIZE,
};

use crate::{SimResult, SimulationError};

/// A simple flat memory storage
#[derive(Debug)]
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u32,
}

impl LinearMemory {
    /// Allocates a zero-filled backing buffer. Allocation failure is reported
    /// instead of aborting the process.
    pub fn try_new(region: &'static str, size: usize, base_addr: u32) -> SimResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| SimulationError::Allocation { region, size })?;
        data.resize(size, 0);
        Ok(Self { data, base_addr })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn offset_of(&self, addr: u32) -> Option<usize> {
        let offset = addr.checked_sub(self.base_addr)? as usize;
        (offset < self.data.len()).then_some(offset)
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.offset_of(addr).is_some()
    }

    pub fn read_u8(&self, addr: u32) -> Option<u8> {
        self.offset_of(addr).map(|offset| self.data[offset])
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> bool {
        match self.offset_of(addr) {
            Some(offset) => {
                self.data[offset] = value;
                true
            }
            None => false,
        }
    }

    /// Copies `bytes` verbatim starting at `addr`. Nothing is written unless
    /// the whole slice fits.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) -> bool {
        let Some(offset) = self.offset_of(addr) else {
            return false;
        };
        let Some(end) = offset.checked_add(bytes.len()) else {
            return false;
        };
        if end > self.data.len() {
            return false;
        }
        self.data[offset..end].copy_from_slice(bytes);
        true
    }
}
