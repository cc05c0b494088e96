// ThumbSim - Cortex-M3 Thumb Core Emulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

/// Halfwords that fit the 64 KiB code memory.
pub const MAX_PROGRAM_HALFWORDS: usize = 32 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GpioInput {
    /// Port name, "a".."g" or "gpioa".."gpiog".
    pub port: String,
    pub value: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestInputs {
    /// Pre-encoded Thumb halfwords, loaded at the start of code memory.
    pub program: Vec<u16>,
    #[serde(default)]
    pub gpio_inputs: Vec<GpioInput>,
    #[serde(default)]
    pub breakpoints: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestLimits {
    pub max_steps: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Runner failed before simulation started (e.g. script parse/validation error).
    ConfigError,
    MaxSteps,
    PcOutOfBounds,
    UndefinedInstruction,
    Breakpoint,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegisterValueDetails {
    pub register: String,
    pub expected_value: u32,
    #[serde(default)]
    pub mask: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegisterValueAssertion {
    pub register_value: RegisterValueDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MemoryValueDetails {
    pub address: u32,
    pub expected_value: u32,
    #[serde(default)]
    pub mask: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MemoryValueAssertion {
    pub memory_value: MemoryValueDetails,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum TestAssertion {
    ExpectedStopReason(StopReasonAssertion),
    RegisterValue(RegisterValueAssertion),
    MemoryValue(MemoryValueAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestScript {
    pub schema_version: String,
    pub inputs: TestInputs,
    pub limits: TestLimits,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

impl TestScript {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(contents).context("Failed to parse Test Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.inputs.program.is_empty() {
            anyhow::bail!("Input 'program' must contain at least one halfword");
        }

        if self.inputs.program.len() > MAX_PROGRAM_HALFWORDS {
            anyhow::bail!(
                "Input 'program' has {} halfwords; code memory holds at most {}",
                self.inputs.program.len(),
                MAX_PROGRAM_HALFWORDS
            );
        }

        if self.limits.max_steps == 0 {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }

        for input in &self.inputs.gpio_inputs {
            if input.port.trim().is_empty() {
                anyhow::bail!("GPIO input 'port' cannot be empty");
            }
        }

        for assertion in &self.assertions {
            if let TestAssertion::RegisterValue(a) = assertion {
                if a.register_value.register.trim().is_empty() {
                    anyhow::bail!("Assertion 'register_value.register' cannot be empty");
                }
            }
        }

        Ok(())
    }
}

/// Load a CI test script from YAML.
pub fn load_test_script<P: AsRef<Path>>(path: P) -> Result<TestScript> {
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read test script at {:?}", path.as_ref()))?;
    let script = TestScript::from_yaml(&contents)?;
    tracing::debug!(
        "Loaded test script {:?}: {} halfwords, {} assertions",
        path.as_ref(),
        script.inputs.program.len(),
        script.assertions.len()
    );
    Ok(script)
}
