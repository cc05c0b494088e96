// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::fmt;

/// Sub-opcode (bits 10:9) of the 0b00011 add/subtract group.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AddSubOp {
    Add,
    Sub,
    /// Immediate forms (0b10, 0b11), which are not executed.
    Unsupported(u8),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Instruction {
    MovImm {
        rd: u8,
        imm: u8,
    }, // MOVS Rd, #imm8
    AddSubReg {
        op: AddSubOp,
        rd: u8,
        rn: u8,
        rm: u8,
    }, // ADDS/SUBS Rd, Rn, Rm
    Branch {
        offset: i32,
    }, // B <label>, offset in bytes
    Unknown(u16),
}

#[inline]
fn bits(value: u16, lo: u32, hi: u32) -> u16 {
    (value >> lo) & ((1 << (hi - lo + 1)) - 1)
}

/// Sign-extends the low `width` bits of `value` to 32 bits.
#[inline]
pub fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

/// Decodes one 16-bit Thumb instruction word. Total: every input yields a variant.
pub fn decode_thumb_16(opcode: u16) -> Instruction {
    match bits(opcode, 11, 15) {
        // MOV immediate (T1): 0010 0ddd iiii iiii
        0b00100 => Instruction::MovImm {
            rd: bits(opcode, 8, 10) as u8,
            imm: bits(opcode, 0, 7) as u8,
        },
        // Add/Sub (register/imm3) (T1): 0001 1oom mmnn nddd
        0b00011 => {
            let op = match bits(opcode, 9, 10) {
                0b00 => AddSubOp::Add,
                0b01 => AddSubOp::Sub,
                other => AddSubOp::Unsupported(other as u8),
            };
            Instruction::AddSubReg {
                op,
                rm: bits(opcode, 6, 8) as u8,
                rn: bits(opcode, 3, 5) as u8,
                rd: bits(opcode, 0, 2) as u8,
            }
        }
        // Unconditional branch (T2): 1110 0iii iiii iiii
        0b11100 => Instruction::Branch {
            offset: sign_extend(bits(opcode, 0, 10) as u32, 11) << 1,
        },
        _ => Instruction::Unknown(opcode),
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::MovImm { rd, imm } => write!(f, "movs r{}, #{:#04x}", rd, imm),
            Instruction::AddSubReg { op, rd, rn, rm } => match op {
                AddSubOp::Add => write!(f, "adds r{}, r{}, r{}", rd, rn, rm),
                AddSubOp::Sub => write!(f, "subs r{}, r{}, r{}", rd, rn, rm),
                AddSubOp::Unsupported(sub) => write!(f, "<add/sub variant {:#04b}>", sub),
            },
            Instruction::Branch { offset } => write!(f, "b .{:+}", offset + 4),
            Instruction::Unknown(opcode) => write!(f, "<unknown {:#06x}>", opcode),
        }
    }
}
