// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;

pub const SP: u8 = 13;
pub const LR: u8 = 14;
pub const PC: u8 = 15;

pub const XPSR: u8 = 16;
pub const MSP: u8 = 17;
pub const PSP: u8 = 18;
pub const PRIMASK: u8 = 19;
pub const BASEPRI: u8 = 20;
pub const FAULTMASK: u8 = 21;
pub const CONTROL: u8 = 22;

const REGISTER_NAMES: [&str; 23] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr",
    "pc", "xpsr", "msp", "psp", "primask", "basepri", "faultmask", "control",
];

/// Architectural register state of the core.
///
/// `r[13]` is the active stack pointer and `r[15]` the program counter. All
/// arithmetic on these values wraps.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterFile {
    pub r: [u32; 16],
    pub xpsr: u32,
    pub primask: u32,
    pub faultmask: u32,
    pub basepri: u32,
    pub control: u32,
    pub msp: u32,
    pub psp: u32,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn pc(&self) -> u32 {
        self.r[PC as usize]
    }

    #[inline]
    pub fn set_pc(&mut self, val: u32) {
        self.r[PC as usize] = val;
    }

    pub fn sp(&self) -> u32 {
        self.r[SP as usize]
    }

    /// Reads a register by debug id. Unknown ids read as zero.
    pub fn read(&self, id: u8) -> u32 {
        match id {
            0..=15 => self.r[id as usize],
            XPSR => self.xpsr,
            MSP => self.msp,
            PSP => self.psp,
            PRIMASK => self.primask,
            BASEPRI => self.basepri,
            FAULTMASK => self.faultmask,
            CONTROL => self.control,
            _ => 0,
        }
    }

    /// Writes a register by debug id. Unknown ids are ignored.
    pub fn write(&mut self, id: u8, val: u32) {
        match id {
            0..=15 => self.r[id as usize] = val,
            XPSR => self.xpsr = val,
            MSP => self.msp = val,
            PSP => self.psp = val,
            PRIMASK => self.primask = val,
            BASEPRI => self.basepri = val,
            FAULTMASK => self.faultmask = val,
            CONTROL => self.control = val,
            _ => {}
        }
    }
}

pub fn register_names() -> Vec<String> {
    REGISTER_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Resolves a register name (`r0`..`r15`, `sp`, `lr`, `pc`, special
/// registers) to its debug id.
pub fn parse_register_name(name: &str) -> Option<u8> {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "r13" => return Some(SP),
        "r14" => return Some(LR),
        "r15" => return Some(PC),
        _ => {}
    }
    REGISTER_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|idx| idx as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_everything() {
        let mut regs = RegisterFile::new();
        for id in 0..=CONTROL {
            regs.write(id, 0xA5A5_0000 | id as u32);
        }
        regs.reset();

        for i in 0..16 {
            assert_eq!(regs.r[i], 0, "r{} not cleared", i);
        }
        assert_eq!(regs.xpsr, 0);
        assert_eq!(regs.primask, 0);
        assert_eq!(regs.faultmask, 0);
        assert_eq!(regs.basepri, 0);
        assert_eq!(regs.control, 0);
        assert_eq!(regs.msp, 0);
        assert_eq!(regs.psp, 0);
        assert_eq!(regs, RegisterFile::default());
    }

    #[test]
    fn test_register_id_access() {
        let mut regs = RegisterFile::new();
        regs.write(PC, 0x0800_0000);
        regs.write(SP, 0x2000_5000);
        regs.write(CONTROL, 2);
        assert_eq!(regs.pc(), 0x0800_0000);
        assert_eq!(regs.sp(), 0x2000_5000);
        assert_eq!(regs.read(CONTROL), 2);

        regs.write(99, 7);
        assert_eq!(regs.read(99), 0);
    }

    #[test]
    fn test_parse_register_name() {
        assert_eq!(parse_register_name("R0"), Some(0));
        assert_eq!(parse_register_name("r12"), Some(12));
        assert_eq!(parse_register_name("sp"), Some(SP));
        assert_eq!(parse_register_name("r13"), Some(SP));
        assert_eq!(parse_register_name("PC"), Some(PC));
        assert_eq!(parse_register_name("r15"), Some(PC));
        assert_eq!(parse_register_name("basepri"), Some(BASEPRI));
        assert_eq!(parse_register_name("r16"), None);
        assert_eq!(register_names().len(), CONTROL as usize + 1);
    }
}
