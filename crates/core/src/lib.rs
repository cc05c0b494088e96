// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod config;
pub mod cpu;
pub mod decoder;
pub mod memory;
pub mod peripherals;
pub mod snapshot;

use std::collections::HashSet;

pub use config::SimulationConfig;
pub use cpu::{CortexM3, StepOutcome};

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Failed to allocate {size} bytes for {region}")]
    Allocation { region: &'static str, size: usize },
    #[error("Program of {len} bytes at {addr:#x} does not fit code memory ({capacity} bytes available)")]
    ProgramTooLarge {
        addr: u32,
        len: usize,
        capacity: usize,
    },
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait representing the system bus.
///
/// Accesses never fault: unmapped reads return sentinel values and unmapped
/// writes are dropped.
pub trait Bus {
    fn read_u8(&self, addr: u32) -> u8;
    fn write_u8(&mut self, addr: u32, value: u8);

    fn read_u16(&self, addr: u32) -> u16 {
        let b0 = self.read_u8(addr) as u16;
        let b1 = self.read_u8(addr.wrapping_add(1)) as u16;
        // Little Endian
        b0 | (b1 << 8)
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let b0 = self.read_u8(addr) as u32;
        let b1 = self.read_u8(addr.wrapping_add(1)) as u32;
        let b2 = self.read_u8(addr.wrapping_add(2)) as u32;
        let b3 = self.read_u8(addr.wrapping_add(3)) as u32;
        b0 | (b1 << 8) | (b2 << 16) | (b3 << 24)
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        self.write_u8(addr, (value & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(1), ((value >> 8) & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(2), ((value >> 16) & 0xFF) as u8);
        self.write_u8(addr.wrapping_add(3), ((value >> 24) & 0xFF) as u8);
    }
}

/// Why a `run` (or single step) returned control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Breakpoint(u32),
    StepDone,
    MaxStepsReached,
    PcOutOfBounds { pc: u32 },
    UndefinedInstruction { pc: u32, opcode: u16 },
}

/// Trait for controlling the machine in debug mode
pub trait DebugControl {
    fn add_breakpoint(&mut self, addr: u32);
    fn remove_breakpoint(&mut self, addr: u32);
    fn clear_breakpoints(&mut self);

    /// Run until the PC leaves code memory, an undefined instruction, a
    /// breakpoint or the step quota (`None` uses the configured quota).
    fn run(&mut self, max_steps: Option<u32>) -> StopReason;

    /// Step a single instruction
    fn step_single(&mut self) -> StopReason;

    fn read_core_reg(&self, id: u8) -> u32;
    fn write_core_reg(&mut self, id: u8, val: u32);

    fn read_memory(&self, addr: u32, len: usize) -> Vec<u8>;
    fn write_memory(&mut self, addr: u32, data: &[u8]);

    fn get_pc(&self) -> u32;
    fn set_pc(&mut self, addr: u32);
    fn get_register_names(&self) -> Vec<String>;
    fn reset(&mut self);
}

/// A complete simulator instance: the core, its bus and run-loop settings.
#[derive(Debug)]
pub struct Machine {
    pub cpu: CortexM3,
    pub bus: bus::SystemBus,
    pub config: SimulationConfig,

    // Debug state
    pub breakpoints: HashSet<u32>,
    pub total_steps: u64,
}

impl Machine {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        Ok(Self {
            cpu: CortexM3::new(),
            bus: bus::SystemBus::new()?,
            config,
            breakpoints: HashSet::new(),
            total_steps: 0,
        })
    }

    /// Programs little-endian halfwords at the start of code memory and
    /// points the PC at them.
    pub fn load_program(&mut self, program: &[u16]) -> SimResult<()> {
        let bytes: Vec<u8> = program.iter().flat_map(|h| h.to_le_bytes()).collect();
        self.bus.program(memory::FLASH_BASE, &bytes)?;
        self.cpu.set_pc(memory::FLASH_BASE);
        tracing::info!(
            "Loaded {} halfwords at {:#010x}",
            program.len(),
            memory::FLASH_BASE
        );
        Ok(())
    }

    pub fn step(&mut self) -> StepOutcome {
        self.total_steps += 1;
        self.cpu.step(&self.bus)
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        snapshot::MachineSnapshot {
            cpu: self.cpu.regs.clone(),
            gpio: self
                .bus
                .gpio
                .ports()
                .map(|(id, port)| (id.name().to_string(), port.clone()))
                .collect(),
            total_steps: self.total_steps,
        }
    }
}

impl DebugControl for Machine {
    fn add_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr & !1);
    }

    fn remove_breakpoint(&mut self, addr: u32) {
        self.breakpoints.remove(&(addr & !1));
    }

    fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    fn run(&mut self, max_steps: Option<u32>) -> StopReason {
        // Quota is per call, never carried over between runs
        let quota = max_steps.unwrap_or(self.config.max_steps);
        let mut steps: u32 = 0;
        tracing::info!(
            "Run started at {:#010x} (quota {} steps)",
            self.cpu.get_pc(),
            quota
        );

        let reason = loop {
            let pc = self.cpu.get_pc();
            if !memory::in_flash(pc) {
                break StopReason::PcOutOfBounds { pc };
            }
            if self.breakpoints.contains(&(pc & !1)) {
                break StopReason::Breakpoint(pc);
            }
            if steps >= quota {
                break StopReason::MaxStepsReached;
            }

            let outcome = self.step();
            steps += 1;
            if let StepOutcome::Undefined { pc, opcode } = outcome {
                break StopReason::UndefinedInstruction { pc, opcode };
            }
        };

        tracing::info!("Run stopped after {} steps: {:?}", steps, reason);
        reason
    }

    fn step_single(&mut self) -> StopReason {
        match self.step() {
            StepOutcome::Retired { .. } => StopReason::StepDone,
            StepOutcome::Undefined { pc, opcode } => {
                StopReason::UndefinedInstruction { pc, opcode }
            }
        }
    }

    fn read_core_reg(&self, id: u8) -> u32 {
        self.cpu.regs.read(id)
    }

    fn write_core_reg(&mut self, id: u8, val: u32) {
        self.cpu.regs.write(id, val);
    }

    fn read_memory(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.bus.read_u8(addr.wrapping_add(i as u32)))
            .collect()
    }

    fn write_memory(&mut self, addr: u32, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.bus.write_u8(addr.wrapping_add(i as u32), *byte);
        }
    }

    fn get_pc(&self) -> u32 {
        self.cpu.get_pc()
    }

    fn set_pc(&mut self, addr: u32) {
        self.cpu.set_pc(addr);
    }

    fn get_register_names(&self) -> Vec<String> {
        cpu::register_names()
    }

    /// Zeroes the register file and GPIO bank and points the PC at the
    /// start of code memory. Memory contents are kept.
    fn reset(&mut self) {
        self.cpu.reset();
        self.bus.gpio.reset();
        self.cpu.set_pc(memory::FLASH_BASE);
    }
}
