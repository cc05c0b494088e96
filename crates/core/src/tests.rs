// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod integration_tests {
    use crate::cpu::registers::{PC, SP, XPSR};
    use crate::cpu::HALT_PC;
    use crate::decoder::{self, AddSubOp, Instruction};
    use crate::memory::{FLASH_BASE, FLASH_SIZE, SRAM_BASE};
    use crate::peripherals::gpio::{
        PortId, GPIOA_BASE, GPIOB_BASE, GPIO_BSRR_OFFSET, GPIO_CRH_OFFSET, GPIO_ODR_OFFSET,
    };
    use crate::{Bus, DebugControl, Machine, SimulationConfig, StepOutcome, StopReason};

    /// MOVS R0,#5 ; MOVS R1,#3 ; ADDS R2,R0,R1 ; B .
    const DEMO_PROGRAM: [u16; 4] = [0x2005, 0x2103, 0x1842, 0xE7FE];

    fn create_machine() -> Machine {
        Machine::new(SimulationConfig::default()).unwrap()
    }

    fn machine_with(program: &[u16]) -> Machine {
        let mut machine = create_machine();
        machine.load_program(program).unwrap();
        machine
    }

    #[test]
    fn test_fresh_machine_state() {
        let machine = create_machine();
        for id in 0..=crate::cpu::registers::CONTROL {
            assert_eq!(machine.read_core_reg(id), 0);
        }
        assert_eq!(machine.total_steps, 0);
        assert_eq!(machine.config.max_steps, 20);
        assert!(machine.breakpoints.is_empty());
    }

    #[test]
    fn test_decoder_mov() {
        // 0x202A => MOV R0, #42
        let instr = decoder::decode_thumb_16(0x202A);
        assert_eq!(instr, Instruction::MovImm { rd: 0, imm: 42 });
    }

    #[test]
    fn test_load_program_sets_pc_and_bytes() {
        let machine = machine_with(&DEMO_PROGRAM);
        assert_eq!(machine.get_pc(), FLASH_BASE);
        assert_eq!(
            machine.read_memory(FLASH_BASE, 8),
            vec![0x05, 0x20, 0x03, 0x21, 0x42, 0x18, 0xFE, 0xE7]
        );
    }

    #[test]
    fn test_load_program_too_large() {
        let mut machine = create_machine();
        let program = vec![0u16; FLASH_SIZE / 2 + 1];
        assert!(matches!(
            machine.load_program(&program),
            Err(crate::SimulationError::ProgramTooLarge { .. })
        ));
        assert_eq!(machine.get_pc(), 0);
    }

    #[test]
    fn test_step_mov_imm() {
        let mut machine = machine_with(&[0x2005]);
        let outcome = machine.step();
        assert_eq!(
            outcome,
            StepOutcome::Retired {
                pc: FLASH_BASE,
                instruction: Instruction::MovImm { rd: 0, imm: 5 }
            }
        );
        assert_eq!(machine.read_core_reg(0), 5);
        for id in 1..15 {
            assert_eq!(machine.read_core_reg(id), 0);
        }
        assert_eq!(machine.get_pc(), FLASH_BASE + 2);
        assert_eq!(machine.total_steps, 1);
    }

    #[test]
    fn test_step_add() {
        let mut machine = machine_with(&[0x1842]);
        machine.write_core_reg(0, 5);
        machine.write_core_reg(1, 3);
        machine.step();
        assert_eq!(machine.read_core_reg(2), 8);
    }

    #[test]
    fn test_step_0x1882_uses_r2_as_rm() {
        let mut machine = machine_with(&[0x1882]);
        machine.write_core_reg(0, 5);
        machine.write_core_reg(1, 3);
        machine.write_core_reg(2, 10);
        assert_eq!(
            machine.step(),
            StepOutcome::Retired {
                pc: FLASH_BASE,
                instruction: Instruction::AddSubReg {
                    op: AddSubOp::Add,
                    rd: 2,
                    rn: 0,
                    rm: 2
                }
            }
        );
        assert_eq!(machine.read_core_reg(2), 15);
    }

    #[test]
    fn test_branch_self_loop_at_0x08000006() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        machine.set_pc(FLASH_BASE + 6);
        machine.step();
        assert_eq!(machine.get_pc(), 0x0800_0006);
    }

    #[test]
    fn test_demo_program_runs_to_quota() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        let reason = machine.run(None);

        assert_eq!(reason, StopReason::MaxStepsReached);
        assert_eq!(machine.read_core_reg(0), 0x5);
        assert_eq!(machine.read_core_reg(1), 0x3);
        assert_eq!(machine.read_core_reg(2), 0x8);
        assert_eq!(machine.get_pc(), 0x0800_0006);
        assert_eq!(machine.total_steps, 20);
    }

    #[test]
    fn test_distilled_program_encoding() {
        // The same program with 0x1882 adds R2 to itself instead of R1
        let mut machine = machine_with(&[0x2005, 0x2103, 0x1882, 0xE7FE]);
        let reason = machine.run(None);

        assert_eq!(reason, StopReason::MaxStepsReached);
        assert_eq!(machine.read_core_reg(0), 0x5);
        assert_eq!(machine.read_core_reg(1), 0x3);
        assert_eq!(machine.read_core_reg(2), 0x5);
        assert_eq!(machine.get_pc(), 0x0800_0006);
    }

    #[test]
    fn test_quota_resets_between_runs() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        assert_eq!(machine.run(Some(3)), StopReason::MaxStepsReached);
        assert_eq!(machine.get_pc(), FLASH_BASE + 6);
        assert_eq!(machine.run(Some(3)), StopReason::MaxStepsReached);
        assert_eq!(machine.run(None), StopReason::MaxStepsReached);
        assert_eq!(machine.total_steps, 26);

        // A fresh machine does not see any earlier counts
        let mut fresh = machine_with(&DEMO_PROGRAM);
        assert_eq!(fresh.run(None), StopReason::MaxStepsReached);
        assert_eq!(fresh.total_steps, 20);
    }

    #[test]
    fn test_zero_quota_executes_nothing() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        assert_eq!(machine.run(Some(0)), StopReason::MaxStepsReached);
        assert_eq!(machine.get_pc(), FLASH_BASE);
        assert_eq!(machine.total_steps, 0);
    }

    #[test]
    fn test_configured_quota() {
        let mut machine = Machine::new(SimulationConfig { max_steps: 2 }).unwrap();
        machine.load_program(&DEMO_PROGRAM).unwrap();
        assert_eq!(machine.run(None), StopReason::MaxStepsReached);
        assert_eq!(machine.read_core_reg(1), 3);
        assert_eq!(machine.read_core_reg(2), 0);
    }

    #[test]
    fn test_undefined_instruction_halts_run() {
        // MOVS R0,#1 ; NOP (not modelled) ; MOVS R1,#1
        let mut machine = machine_with(&[0x2001, 0xBF00, 0x2101]);
        let reason = machine.run(None);

        assert_eq!(
            reason,
            StopReason::UndefinedInstruction {
                pc: FLASH_BASE + 2,
                opcode: 0xBF00
            }
        );
        assert_eq!(machine.get_pc(), HALT_PC);
        assert_eq!(machine.read_core_reg(0), 1);
        assert_eq!(machine.read_core_reg(1), 0);
        assert_eq!(machine.total_steps, 2);

        // The parked PC is outside code memory
        assert_eq!(
            machine.run(None),
            StopReason::PcOutOfBounds { pc: HALT_PC }
        );
        assert_eq!(machine.total_steps, 2);
    }

    #[test]
    fn test_run_off_end_of_flash() {
        // B +0 at the last halfword of code memory lands past its end
        let mut machine = create_machine();
        let last = FLASH_BASE + FLASH_SIZE as u32 - 2;
        machine.bus.program(last, &0xE000u16.to_le_bytes()).unwrap();
        machine.set_pc(last);

        assert_eq!(
            machine.run(None),
            StopReason::PcOutOfBounds {
                pc: FLASH_BASE + FLASH_SIZE as u32 + 2
            }
        );
        assert_eq!(machine.total_steps, 1);
    }

    #[test]
    fn test_run_with_pc_outside_flash_does_nothing() {
        let mut machine = create_machine();
        assert_eq!(machine.run(None), StopReason::PcOutOfBounds { pc: 0 });
        assert_eq!(machine.total_steps, 0);
    }

    #[test]
    fn test_zeroed_flash_is_undefined() {
        // 0x0000 (LSLS R0,R0,#0) is not in the modelled subset
        let mut machine = create_machine();
        machine.set_pc(FLASH_BASE);
        assert_eq!(
            machine.run(None),
            StopReason::UndefinedInstruction {
                pc: FLASH_BASE,
                opcode: 0x0000
            }
        );
    }

    #[test]
    fn test_breakpoints() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        machine.add_breakpoint(FLASH_BASE + 4);
        assert_eq!(machine.run(None), StopReason::Breakpoint(FLASH_BASE + 4));
        assert_eq!(machine.read_core_reg(1), 3);
        assert_eq!(machine.read_core_reg(2), 0);

        // Sitting on a breakpoint: step past it, then run again
        assert_eq!(machine.step_single(), StopReason::StepDone);
        assert_eq!(machine.read_core_reg(2), 8);

        machine.add_breakpoint(FLASH_BASE + 7); // odd (Thumb) address
        assert_eq!(machine.run(None), StopReason::Breakpoint(FLASH_BASE + 6));

        machine.remove_breakpoint(FLASH_BASE + 6);
        assert_eq!(machine.run(Some(5)), StopReason::MaxStepsReached);

        machine.add_breakpoint(FLASH_BASE);
        machine.clear_breakpoints();
        assert!(machine.breakpoints.is_empty());
    }

    #[test]
    fn test_step_single_reports_undefined() {
        let mut machine = machine_with(&[0x4770]);
        assert_eq!(
            machine.step_single(),
            StopReason::UndefinedInstruction {
                pc: FLASH_BASE,
                opcode: 0x4770
            }
        );
    }

    #[test]
    fn test_execute_from_ram() {
        let mut machine = create_machine();
        // MOVS R3, #0x2A written through the runtime path
        machine.write_memory(SRAM_BASE, &[0x2A, 0x23]);
        machine.set_pc(SRAM_BASE);
        machine.step();
        assert_eq!(machine.read_core_reg(3), 0x2A);
        assert_eq!(machine.get_pc(), SRAM_BASE + 2);
    }

    #[test]
    fn test_write_memory_cannot_patch_flash() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        machine.write_memory(FLASH_BASE, &[0xFF, 0xFF]);
        assert_eq!(machine.read_memory(FLASH_BASE, 2), vec![0x05, 0x20]);
    }

    #[test]
    fn test_reset() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        machine.run(None);
        machine.write_core_reg(SP, 0x2000_5000);
        machine.write_core_reg(XPSR, 0x0100_0000);
        machine
            .bus
            .write_u32(GPIOB_BASE + GPIO_CRH_OFFSET, 0x4444_4444);

        machine.reset();
        for id in 0..PC {
            assert_eq!(machine.read_core_reg(id), 0);
        }
        assert_eq!(machine.read_core_reg(XPSR), 0);
        assert_eq!(machine.get_pc(), FLASH_BASE);
        assert_eq!(machine.bus.read_u32(GPIOB_BASE + GPIO_CRH_OFFSET), 0);
        // Program survives a reset
        assert_eq!(machine.run(None), StopReason::MaxStepsReached);
        assert_eq!(machine.read_core_reg(2), 8);
    }

    #[test]
    fn test_gpio_through_machine_bus() {
        let mut machine = create_machine();
        machine
            .bus
            .write_u32(GPIOA_BASE + GPIO_BSRR_OFFSET, 0x0000_000C | (0x0000_0005 << 16));
        assert_eq!(machine.bus.read_u32(GPIOA_BASE + GPIO_ODR_OFFSET), 5);

        // Byte-level access does not reach peripherals
        assert_eq!(machine.read_memory(GPIOA_BASE + GPIO_ODR_OFFSET, 1), vec![0xFF]);

        machine.bus.gpio.drive_input(PortId::B, 0x0003);
        let snap = machine.snapshot();
        assert_eq!(snap.gpio["gpioa"].odr, 5);
        assert_eq!(snap.gpio["gpiob"].idr, 3);
        assert_eq!(snap.gpio.len(), 7);
    }

    #[test]
    fn test_snapshot_json() {
        let mut machine = machine_with(&DEMO_PROGRAM);
        machine.run(None);
        let snap = machine.snapshot();
        assert_eq!(snap.cpu.r[2], 8);
        assert_eq!(snap.total_steps, 20);

        let json: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
        assert_eq!(json["cpu"]["r"][0], 5);
        assert_eq!(json["cpu"]["r"][15], 0x0800_0006);
        assert_eq!(json["gpio"]["gpiog"]["odr"], 0);
    }

    #[test]
    fn test_stop_reason_serialization() {
        let v = serde_json::to_value(StopReason::MaxStepsReached).unwrap();
        assert_eq!(v, "max_steps_reached");
        let v = serde_json::to_value(StopReason::UndefinedInstruction {
            pc: 0x0800_0002,
            opcode: 0xBF00,
        })
        .unwrap();
        assert_eq!(v["undefined_instruction"]["opcode"], 0xBF00);
    }

    #[test]
    fn test_register_names() {
        let machine = create_machine();
        let names = machine.get_register_names();
        assert_eq!(names[0], "r0");
        assert_eq!(names[PC as usize], "pc");
        assert_eq!(names[XPSR as usize], "xpsr");
    }
}
