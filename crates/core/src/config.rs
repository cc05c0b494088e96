// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STEPS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Step quota for a single `run` call. Guards against runaway loops; it is
    /// not a hardware limit.
    pub max_steps: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}
