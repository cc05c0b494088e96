// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod thumb;

pub use thumb::decode_thumb_16;
pub use thumb::{AddSubOp, Instruction};
