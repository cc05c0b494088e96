// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::cpu::registers::RegisterFile;
use crate::decoder::thumb::{decode_thumb_16, AddSubOp, Instruction};
use crate::Bus;

/// PC value parked after an undefined instruction. It lies outside code
/// memory, so the run loop stops on its next bounds check.
pub const HALT_PC: u32 = 0xFFFF_FFFF;

/// Result of a single fetch-decode-execute transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Retired { pc: u32, instruction: Instruction },
    Undefined { pc: u32, opcode: u16 },
}

#[derive(Debug, Default, Clone)]
pub struct CortexM3 {
    pub regs: RegisterFile,
}

impl CortexM3 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.regs.reset();
    }

    pub fn get_pc(&self) -> u32 {
        self.regs.pc()
    }

    pub fn set_pc(&mut self, val: u32) {
        self.regs.set_pc(val);
    }

    /// Fetches the halfword at PC, advances PC by 2, then decodes and
    /// executes it.
    pub fn step<B: Bus + ?Sized>(&mut self, bus: &B) -> StepOutcome {
        let pc = self.regs.pc();
        let opcode = bus.read_u16(pc);
        self.regs.set_pc(pc.wrapping_add(2));

        let instruction = decode_thumb_16(opcode);
        tracing::debug!("{:#010x}: {:04x}  {}", pc, opcode, instruction);

        match instruction {
            Instruction::MovImm { rd, imm } => {
                self.regs.write(rd, imm as u32);
            }
            Instruction::AddSubReg { op, rd, rn, rm } => {
                let op1 = self.regs.read(rn);
                let op2 = self.regs.read(rm);
                match op {
                    AddSubOp::Add => self.regs.write(rd, op1.wrapping_add(op2)),
                    AddSubOp::Sub => self.regs.write(rd, op1.wrapping_sub(op2)),
                    AddSubOp::Unsupported(sub) => {
                        tracing::warn!(
                            "Unsupported add/sub variant {:#04b} ({:#06x}) at {:#010x}, skipped",
                            sub,
                            opcode,
                            pc
                        );
                    }
                }
            }
            Instruction::Branch { offset } => {
                // Reads of PC see the instruction address + 4
                let target = pc.wrapping_add(4).wrapping_add(offset as u32);
                self.regs.set_pc(target & !1);
            }
            Instruction::Unknown(opcode) => {
                tracing::warn!("Undefined instruction {:#06x} at {:#010x}", opcode, pc);
                self.regs.set_pc(HALT_PC);
                return StepOutcome::Undefined { pc, opcode };
            }
        }

        StepOutcome::Retired { pc, instruction }
    }
}
