// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod cortex_m;
pub mod registers;

pub use cortex_m::{CortexM3, StepOutcome, HALT_PC};
pub use registers::{parse_register_name, register_names, RegisterFile};
