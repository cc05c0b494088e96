// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::cpu::RegisterFile;
use crate::peripherals::gpio::GpioPort;
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time view of the machine for reporting and verification.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub cpu: RegisterFile,
    /// Keyed by port name ("gpioa".."gpiog").
    pub gpio: BTreeMap<String, GpioPort>,
    pub total_steps: u64,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
