// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

use thumbsim_config::{load_test_script, StopReason, TestAssertion, TestLimits};
use thumbsim_core::config::DEFAULT_MAX_STEPS;
use thumbsim_core::cpu::parse_register_name;
use thumbsim_core::peripherals::PortId;
use thumbsim_core::snapshot::MachineSnapshot;
use thumbsim_core::{Bus, DebugControl, Machine, SimulationConfig};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

/// MOVS R0, #5 ; MOVS R1, #3 ; ADDS R2, R0, R1 ; B .
const DEMO_PROGRAM: [u16; 4] = [0x2005, 0x2103, 0x1842, 0xE7FE];

/// Registers printed after an interactive run (r0..pc, xpsr).
const REPORTED_REGISTERS: usize = 17;

fn parse_u32_addr(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex address '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid address '{}': {}", s, e))
    }
}

fn parse_halfword(s: &str) -> Result<u16, String> {
    let value = parse_u32_addr(s)?;
    u16::try_from(value).map_err(|_| format!("Halfword '{}' does not fit in 16 bits", s.trim()))
}

/// Comma separated list of pre-encoded Thumb halfwords.
#[derive(Debug, Clone)]
struct Program(Vec<u16>);

fn parse_program(s: &str) -> Result<Program, String> {
    let halfwords = s
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse_halfword)
        .collect::<Result<Vec<_>, _>>()?;
    if halfwords.is_empty() {
        return Err("Program must contain at least one halfword".to_string());
    }
    Ok(Program(halfwords))
}

/// Value driven onto a port's input-data register before the run.
#[derive(Debug, Clone, Copy)]
struct GpioDrive {
    port: PortId,
    value: u32,
}

fn parse_gpio_drive(s: &str) -> Result<GpioDrive, String> {
    let (port, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid GPIO input '{}': expected PORT=VALUE", s))?;
    Ok(GpioDrive {
        port: PortId::from_str(port)?,
        value: parse_u32_addr(value)?,
    })
}

#[derive(Parser, Debug)]
#[command(author, version, about = "ThumbSim Cortex-M3 Emulator", long_about = None)]
struct Cli {
    /// Enable instruction-level execution tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the built-in MOVS/MOVS/ADDS/B demo program.
    Demo(DemoArgs),

    /// Run an arbitrary list of pre-encoded Thumb halfwords.
    Run(RunArgs),

    /// Deterministic, CI-friendly runner mode driven by a test script (YAML).
    Test(TestArgs),
}

#[derive(Args, Debug)]
struct RunOptions {
    /// Step quota for the run (default: 20)
    #[arg(long)]
    max_steps: Option<u32>,

    /// Breakpoint PC address (repeatable). Stops before the instruction executes.
    #[arg(long, value_parser = parse_u32_addr)]
    breakpoint: Vec<u32>,

    /// Drive a GPIO input-data register before the run, e.g. `a=0x1` (repeatable)
    #[arg(long, value_parser = parse_gpio_drive)]
    gpio: Vec<GpioDrive>,

    /// Print the final machine state as JSON instead of a register dump
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct DemoArgs {
    #[command(flatten)]
    options: RunOptions,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Halfwords to load at the start of code memory, e.g. `0x2005,0x2103,0xE7FE`
    #[arg(short, long, value_parser = parse_program)]
    program: Program,

    #[command(flatten)]
    options: RunOptions,
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the test script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Override max steps (takes precedence over script)
    #[arg(long)]
    max_steps: Option<u32>,

    /// Breakpoint PC address (repeatable), added to those in the script.
    #[arg(long, value_parser = parse_u32_addr)]
    breakpoint: Vec<u32>,

    /// Directory to write test artifacts (result.json)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    stop_reason: StopReason,
    stop_reason_details: thumbsim_core::StopReason,
    program_sha256: String,
    snapshot: MachineSnapshot,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    steps_executed: u64,
    stop_reason: StopReason,
    stop_reason_details: StopReasonDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    limits: Option<TestLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    assertions: Vec<AssertionResult>,
    program_sha256: String,
    script: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<MachineSnapshot>,
}

#[derive(Debug, Serialize, Clone)]
struct StopReasonDetails {
    triggered_stop_condition: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pc: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    opcode: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triggered_limit: Option<NamedU32>,
}

#[derive(Debug, Serialize, Clone)]
struct NamedU32 {
    name: String,
    value: u32,
}

#[derive(Debug, Serialize, Clone)]
struct AssertionResult {
    assertion: TestAssertion,
    passed: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays machine readable
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Demo(args) => run_interactive(&DEMO_PROGRAM, &args.options),
        Commands::Run(args) => run_interactive(&args.program.0, &args.options),
        Commands::Test(args) => run_test(args),
    }
}

fn program_hash(program: &[u16]) -> String {
    let mut hasher = Sha256::new();
    for halfword in program {
        hasher.update(halfword.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn build_machine(
    program: &[u16],
    max_steps: u32,
    breakpoints: &[u32],
    gpio: &[GpioDrive],
) -> anyhow::Result<Machine> {
    let mut machine = Machine::new(SimulationConfig { max_steps })?;
    machine.load_program(program)?;
    for addr in breakpoints {
        machine.add_breakpoint(*addr);
    }
    for drive in gpio {
        info!("Driving {} IDR = {:#06x}", drive.port.name(), drive.value);
        machine.bus.gpio.drive_input(drive.port, drive.value);
    }
    Ok(machine)
}

fn classify_stop(reason: &thumbsim_core::StopReason) -> StopReason {
    use thumbsim_core::StopReason as Core;
    match reason {
        // `run` never yields StepDone; a single step is a quota of one
        Core::MaxStepsReached | Core::StepDone => StopReason::MaxSteps,
        Core::PcOutOfBounds { .. } => StopReason::PcOutOfBounds,
        Core::UndefinedInstruction { .. } => StopReason::UndefinedInstruction,
        Core::Breakpoint(_) => StopReason::Breakpoint,
    }
}

fn build_stop_reason_details(
    reason: &thumbsim_core::StopReason,
    max_steps: u32,
) -> StopReasonDetails {
    use thumbsim_core::StopReason as Core;
    let (pc, opcode, triggered_limit) = match *reason {
        Core::MaxStepsReached | Core::StepDone => (
            None,
            None,
            Some(NamedU32 {
                name: "max_steps".to_string(),
                value: max_steps,
            }),
        ),
        Core::PcOutOfBounds { pc } | Core::Breakpoint(pc) => (Some(pc), None, None),
        Core::UndefinedInstruction { pc, opcode } => (Some(pc), Some(opcode), None),
    };
    StopReasonDetails {
        triggered_stop_condition: classify_stop(reason),
        pc,
        opcode,
        triggered_limit,
    }
}

fn run_interactive(program: &[u16], options: &RunOptions) -> ExitCode {
    info!("Starting ThumbSim");

    let max_steps = options.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
    let mut machine = match build_machine(program, max_steps, &options.breakpoint, &options.gpio)
    {
        Ok(machine) => machine,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let reason = machine.run(None);

    if options.json {
        let report = RunReport {
            stop_reason: classify_stop(&reason),
            stop_reason_details: reason,
            program_sha256: program_hash(program),
            snapshot: machine.snapshot(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize run report: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    } else {
        println!("Stop reason: {:?}", reason);
        println!("Steps executed: {}", machine.total_steps);
        for (id, name) in machine
            .get_register_names()
            .iter()
            .enumerate()
            .take(REPORTED_REGISTERS)
        {
            println!("{:>5} = {:#010x}", name, machine.read_core_reg(id as u8));
        }
    }

    ExitCode::from(EXIT_PASS)
}

/// Turns script-level names into machine inputs; any failure is a config error.
fn resolve_gpio_inputs(inputs: &[thumbsim_config::GpioInput]) -> anyhow::Result<Vec<GpioDrive>> {
    inputs
        .iter()
        .map(|input| {
            let port = PortId::from_str(&input.port).map_err(anyhow::Error::msg)?;
            Ok(GpioDrive {
                port,
                value: input.value,
            })
        })
        .collect()
}

fn check_register_names(assertions: &[TestAssertion]) -> anyhow::Result<()> {
    for assertion in assertions {
        if let TestAssertion::RegisterValue(a) = assertion {
            if parse_register_name(&a.register_value.register).is_none() {
                anyhow::bail!(
                    "Unknown register '{}' in register_value assertion",
                    a.register_value.register
                );
            }
        }
    }
    Ok(())
}

fn evaluate_assertion(
    assertion: &TestAssertion,
    machine: &Machine,
    stop_reason: StopReason,
) -> bool {
    match assertion {
        TestAssertion::ExpectedStopReason(a) => a.expected_stop_reason == stop_reason,
        TestAssertion::RegisterValue(a) => {
            let mask = a.register_value.mask.unwrap_or(u32::MAX);
            match parse_register_name(&a.register_value.register) {
                Some(id) => {
                    machine.read_core_reg(id) & mask == a.register_value.expected_value & mask
                }
                None => false,
            }
        }
        TestAssertion::MemoryValue(a) => {
            let mask = a.memory_value.mask.unwrap_or(u32::MAX);
            machine.bus.read_u32(a.memory_value.address) & mask
                == a.memory_value.expected_value & mask
        }
    }
}

fn run_test(args: TestArgs) -> ExitCode {
    let script = match load_test_script(&args.script) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, None, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let limits = TestLimits {
        max_steps: args.max_steps.unwrap_or(script.limits.max_steps),
    };
    if limits.max_steps == 0 {
        let msg = "Limit 'max_steps' must be greater than zero".to_string();
        error!("{}", msg);
        write_config_error_outputs(&args, Some(&limits), msg);
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let breakpoints: Vec<u32> = script
        .inputs
        .breakpoints
        .iter()
        .chain(args.breakpoint.iter())
        .copied()
        .collect();

    let setup = resolve_gpio_inputs(&script.inputs.gpio_inputs).and_then(|gpio| {
        check_register_names(&script.assertions)?;
        build_machine(&script.inputs.program, limits.max_steps, &breakpoints, &gpio)
    });
    let mut machine = match setup {
        Ok(machine) => machine,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(&args, Some(&limits), msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let reason = machine.run(None);
    let stop_reason = classify_stop(&reason);
    info!("Simulation stopped: {:?}", reason);

    let mut assertion_results = Vec::new();
    let mut all_passed = true;
    let mut expected_stop_reason_matched = false;

    for assertion in &script.assertions {
        let passed = evaluate_assertion(assertion, &machine, stop_reason);

        if matches!(assertion, TestAssertion::ExpectedStopReason(_)) && passed {
            expected_stop_reason_matched = true;
        }

        if !passed {
            all_passed = false;
            error!("Assertion failed: {:?}", assertion);
        }

        assertion_results.push(AssertionResult {
            assertion: assertion.clone(),
            passed,
        });
    }

    // Faulting stops only count as success when the script expects them
    let sim_error_happened = matches!(
        stop_reason,
        StopReason::UndefinedInstruction | StopReason::PcOutOfBounds
    );

    let (status, code) = if !all_passed {
        ("fail", EXIT_ASSERT_FAIL)
    } else if sim_error_happened && !expected_stop_reason_matched {
        ("error", EXIT_RUNTIME_ERROR)
    } else {
        ("pass", EXIT_PASS)
    };

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        steps_executed: machine.total_steps,
        stop_reason,
        stop_reason_details: build_stop_reason_details(&reason, limits.max_steps),
        limits: Some(limits),
        message: None,
        assertions: assertion_results,
        program_sha256: program_hash(&script.inputs.program),
        script: args.script.clone(),
        snapshot: Some(machine.snapshot()),
    };
    write_result(args.output_dir.as_deref(), &result);

    ExitCode::from(code)
}

fn write_config_error_outputs(args: &TestArgs, limits: Option<&TestLimits>, message: String) {
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "error".to_string(),
        steps_executed: 0,
        stop_reason: StopReason::ConfigError,
        stop_reason_details: StopReasonDetails {
            triggered_stop_condition: StopReason::ConfigError,
            pc: None,
            opcode: None,
            triggered_limit: None,
        },
        limits: limits.cloned(),
        message: Some(message),
        assertions: Vec::new(),
        program_sha256: String::new(),
        script: args.script.clone(),
        snapshot: None,
    };
    write_result(args.output_dir.as_deref(), &result);
}

fn write_result(output_dir: Option<&Path>, result: &TestResult) {
    let Some(output_dir) = output_dir else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }

    let result_path = output_dir.join("result.json");
    match std::fs::File::create(&result_path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, result) {
                error!("Failed to write result.json: {}", e);
            }
        }
        Err(e) => error!("Failed to create result.json: {}", e),
    }
}
