// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CPU configuration
//!
//! Settings are read in priority order:
//! 1. Environment variables (`R4300_ENGINE`, `R4300_BYTE_ORDER`,
//!    `R4300_ENTRY_POINT`, `R4300_TRACE`)
//! 2. A TOML file given with `--config`
//! 3. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! engine = "recompiler"
//! byte_order = "big"
//! mode64 = true
//! entry_point = 0x80000400
//! hot_registers = 24
//! invalidate_on_write = true
//! ```

use crate::core::error::{EmulatorError, Result};
use crate::core::memory::ByteOrder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which execution engine drives the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// One instruction per step through the dispatch table
    Interpreter,
    /// Compiled basic blocks with interpreter fallback
    #[default]
    Recompiler,
}

impl FromStr for EngineKind {
    type Err = EmulatorError;

    /// Accepts the engine names plus the usual on/off spellings, where
    /// "off" selects the interpreter
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interpreter" | "interp" | "0" | "off" | "false" | "no" => Ok(Self::Interpreter),
            "recompiler" | "dynarec" | "jit" | "1" | "on" | "true" | "yes" => Ok(Self::Recompiler),
            other => Err(EmulatorError::Config(format!("unknown engine '{}'", other))),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interpreter => "interpreter",
            Self::Recompiler => "recompiler",
        })
    }
}

/// Parse a byte order name (`big`, `swapped16`/`v64`, `little`/`n64`)
pub fn parse_byte_order(s: &str) -> Result<ByteOrder> {
    ByteOrder::parse(s).ok_or_else(|| EmulatorError::Config(format!("unknown byte order '{}'", s.trim())))
}

/// Parse an address, hexadecimal with a `0x` prefix or decimal
pub fn parse_address(s: &str) -> Result<u64> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| EmulatorError::Config(format!("bad address '{}': {}", s, e)))
}

/// Sign-extend an address given as a 32-bit value
///
/// `0x80000400` names the same KSEG0 location as `0xFFFFFFFF80000400`;
/// wider values are returned unchanged.
pub fn canonical_address(address: u64) -> u64 {
    if address <= u32::MAX as u64 {
        address as u32 as i32 as i64 as u64
    } else {
        address
    }
}

/// Addresses in TOML: integers, or hex strings for values above `i64::MAX`
mod address {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }

    fn resolve<E: serde::de::Error>(raw: Raw) -> Result<u64, E> {
        match raw {
            Raw::Int(value) => Ok(value),
            Raw::Text(text) => super::parse_address(&text).map_err(E::custom),
        }
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:X}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        resolve(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::Raw;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(address) => super::serialize(address, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
            Option::<Raw>::deserialize(deserializer)?
                .map(super::resolve)
                .transpose()
        }
    }
}

/// Engine and CPU settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub engine: EngineKind,
    /// Byte order of instruction and data images
    pub byte_order: ByteOrder,
    /// Start in 64-bit operating mode
    pub mode64: bool,
    /// Address where execution starts after reset
    #[serde(with = "address")]
    pub reset_vector: u64,
    /// Program entry point; boot mode lasts until PC first reaches it
    #[serde(with = "address::option")]
    pub entry_point: Option<u64>,
    /// Maximum instructions per basic block
    pub max_block_instructions: usize,
    /// Maximum registers held in block locals
    pub hot_registers: usize,
    /// Invalidate compiled blocks overwritten by stores
    pub invalidate_on_write: bool,
    /// Maximum blocks run inside one exception handler
    pub exception_budget: u64,
    pub trace_path: Option<PathBuf>,
    pub trace_limit: Option<u64>,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            byte_order: ByteOrder::Big,
            mode64: true,
            reset_vector: 0xFFFF_FFFF_BFC0_0000,
            entry_point: None,
            max_block_instructions: 256,
            hot_registers: 24,
            invalidate_on_write: true,
            exception_budget: 1_000_000,
            trace_path: None,
            trace_limit: None,
        }
    }
}

impl CpuConfig {
    /// Load settings from a TOML file
    ///
    /// Missing keys take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)
            .map_err(|e| EmulatorError::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EmulatorError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EmulatorError::Config(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("R4300_ENGINE") {
            match value.parse() {
                Ok(engine) => {
                    log::info!("Using R4300_ENGINE from environment: {}", engine);
                    self.engine = engine;
                }
                Err(e) => log::warn!("Ignoring R4300_ENGINE: {}", e),
            }
        }
        if let Some(value) = lookup("R4300_BYTE_ORDER") {
            self.byte_order = parse_byte_order(&value)?;
        }
        if let Some(value) = lookup("R4300_ENTRY_POINT") {
            self.entry_point = Some(parse_address(&value)?);
        }
        if let Some(value) = lookup("R4300_TRACE") {
            if !value.trim().is_empty() {
                self.trace_path = Some(PathBuf::from(value.trim()));
            }
        }
        Ok(())
    }

    /// Reject settings no engine can run with
    pub fn validate(&self) -> Result<()> {
        if self.hot_registers > 32 {
            return Err(EmulatorError::Config(format!(
                "hot_registers must be at most 32, got {}",
                self.hot_registers
            )));
        }
        if self.exception_budget == 0 {
            return Err(EmulatorError::Config(
                "exception_budget must be non-zero".to_string(),
            ));
        }
        if self.max_block_instructions < 2 {
            return Err(EmulatorError::Config(format!(
                "max_block_instructions must be at least 2, got {}",
                self.max_block_instructions
            )));
        }
        Ok(())
    }
}
