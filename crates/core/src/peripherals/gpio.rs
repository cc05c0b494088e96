// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const GPIO_NUM_PORTS: usize = 7;
/// Width of each port's register window.
pub const GPIO_PORT_SIZE: u32 = 0x400;

pub const GPIOA_BASE: u32 = 0x4001_0800;
pub const GPIOB_BASE: u32 = 0x4001_0C00;
pub const GPIOC_BASE: u32 = 0x4001_1000;
pub const GPIOD_BASE: u32 = 0x4001_1400;
pub const GPIOE_BASE: u32 = 0x4001_1800;
pub const GPIOF_BASE: u32 = 0x4001_1C00;
pub const GPIOG_BASE: u32 = 0x4001_2000;

const PORT_BASES: [u32; GPIO_NUM_PORTS] = [
    GPIOA_BASE, GPIOB_BASE, GPIOC_BASE, GPIOD_BASE, GPIOE_BASE, GPIOF_BASE, GPIOG_BASE,
];

pub const GPIO_CRL_OFFSET: u32 = 0x00;
pub const GPIO_CRH_OFFSET: u32 = 0x04;
pub const GPIO_IDR_OFFSET: u32 = 0x08;
pub const GPIO_ODR_OFFSET: u32 = 0x0C;
pub const GPIO_BSRR_OFFSET: u32 = 0x10;
pub const GPIO_BRR_OFFSET: u32 = 0x14;
pub const GPIO_LCKR_OFFSET: u32 = 0x18;

/// Value returned for reads that hit no port or no register.
pub const GPIO_READ_SENTINEL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortId {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl PortId {
    pub const ALL: [PortId; GPIO_NUM_PORTS] = [
        PortId::A,
        PortId::B,
        PortId::C,
        PortId::D,
        PortId::E,
        PortId::F,
        PortId::G,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn base_address(self) -> u32 {
        PORT_BASES[self.index()]
    }

    pub fn name(self) -> &'static str {
        match self {
            PortId::A => "gpioa",
            PortId::B => "gpiob",
            PortId::C => "gpioc",
            PortId::D => "gpiod",
            PortId::E => "gpioe",
            PortId::F => "gpiof",
            PortId::G => "gpiog",
        }
    }
}

impl FromStr for PortId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let v = value.trim().to_ascii_lowercase();
        let letter = v
            .strip_prefix("gpio")
            .or_else(|| v.strip_prefix("port"))
            .unwrap_or(&v);
        match letter {
            "a" => Ok(PortId::A),
            "b" => Ok(PortId::B),
            "c" => Ok(PortId::C),
            "d" => Ok(PortId::D),
            "e" => Ok(PortId::E),
            "f" => Ok(PortId::F),
            "g" => Ok(PortId::G),
            _ => Err(format!(
                "unknown GPIO port '{}'; expected one of a..g (or gpioa..gpiog)",
                value
            )),
        }
    }
}

/// Register set of one STM32F1-style GPIO port.
///
/// BSRR and BRR are write-only in practice and keep no state of their own:
/// reads of either return the current ODR.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GpioPort {
    pub crl: u32,  // 0x00: configuration register low
    pub crh: u32,  // 0x04: configuration register high
    pub idr: u32,  // 0x08: input data register
    pub odr: u32,  // 0x0C: output data register
    pub lckr: u32, // 0x18: configuration lock register
}

impl GpioPort {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_reg(&self, offset: u32) -> u32 {
        match offset {
            GPIO_CRL_OFFSET => self.crl,
            GPIO_CRH_OFFSET => self.crh,
            GPIO_IDR_OFFSET => self.idr,
            GPIO_ODR_OFFSET | GPIO_BSRR_OFFSET | GPIO_BRR_OFFSET => self.odr,
            GPIO_LCKR_OFFSET => self.lckr,
            _ => GPIO_READ_SENTINEL,
        }
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        match offset {
            GPIO_CRL_OFFSET => self.crl = value,
            GPIO_CRH_OFFSET => self.crh = value,
            GPIO_ODR_OFFSET => self.odr = value,
            GPIO_BSRR_OFFSET => {
                // Reset phase (low half) runs before set phase (high half),
                // so a pin named in both ends up set.
                let reset = value & 0xFFFF;
                let set = value >> 16;
                self.odr &= !reset;
                self.odr |= set;
            }
            GPIO_BRR_OFFSET => self.odr &= !value,
            GPIO_LCKR_OFFSET => self.lckr = value,
            // IDR is driven from outside the core
            _ => {}
        }
    }
}

/// The seven GPIO ports A..G at their fixed STM32F1 addresses.
#[derive(Debug, Clone, Serialize)]
pub struct GpioBank {
    ports: [GpioPort; GPIO_NUM_PORTS],
    #[serde(skip)]
    bases: [u32; GPIO_NUM_PORTS],
}

impl Default for GpioBank {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBank {
    pub fn new() -> Self {
        Self {
            ports: Default::default(),
            bases: PORT_BASES,
        }
    }

    /// Zeroes every port register. Base addresses are untouched.
    pub fn reset(&mut self) {
        for port in &mut self.ports {
            *port = GpioPort::default();
        }
    }

    pub fn base_addresses(&self) -> &[u32; GPIO_NUM_PORTS] {
        &self.bases
    }

    /// Resolves `addr` to (port index, byte offset); the first window that
    /// contains it wins.
    fn locate(&self, addr: u32) -> Option<(usize, u32)> {
        self.bases
            .iter()
            .position(|&base| addr >= base && addr - base < GPIO_PORT_SIZE)
            .map(|idx| (idx, addr - self.bases[idx]))
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.locate(addr).is_some()
    }

    pub fn read_register(&self, addr: u32) -> u32 {
        match self.locate(addr) {
            Some((idx, offset)) => self.ports[idx].read_reg(offset),
            None => {
                tracing::trace!("GPIO read from unmapped address {:#010x}", addr);
                GPIO_READ_SENTINEL
            }
        }
    }

    pub fn write_register(&mut self, addr: u32, value: u32) {
        match self.locate(addr) {
            Some((idx, offset)) => self.ports[idx].write_reg(offset, value),
            None => tracing::trace!("GPIO write to unmapped address {:#010x} ignored", addr),
        }
    }

    pub fn port(&self, id: PortId) -> &GpioPort {
        &self.ports[id.index()]
    }

    pub fn ports(&self) -> impl Iterator<Item = (PortId, &GpioPort)> {
        PortId::ALL.into_iter().zip(self.ports.iter())
    }

    /// Drives the input pins of a port, as an external circuit would.
    pub fn drive_input(&mut self, id: PortId, value: u32) {
        self.ports[id.index()].idr = value;
    }
}
