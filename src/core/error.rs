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

/// Emulator error types
///
/// Architectural exceptions (overflow, traps, address errors, ...) are not
/// represented here: they are CPU state transitions handled through COP0.
/// Everything in this enum is a host-level failure that stops execution.
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator
#[derive(Error, Debug)]
pub enum EmulatorError {
    /// Execution reached a word that does not decode to a known opcode,
    /// or an address outside the mapped instruction stream.
    #[error("Invalid instruction 0x{word:08X} at 0x{address:016X}")]
    InvalidInstruction { address: u64, word: u32 },

    /// The opcode is catalogued but no execution handler exists for it.
    #[error("Unsupported opcode '{name}' at 0x{address:016X}")]
    UnsupportedOpcode { address: u64, name: &'static str },

    /// A compiled block could not run one of its instructions.
    #[error("Compiled block 0x{block:016X} failed at instruction 0x{address:016X}\n{log}")]
    CompiledBlock {
        block: u64,
        address: u64,
        log: String,
    },

    #[error("Compiled block already cached at 0x{address:016X}")]
    DuplicateBlock { address: u64 },

    /// The memory collaborator could not resolve an access.
    #[error("Invalid memory access: {size}-byte access at 0x{address:016X}")]
    MemoryAccess { address: u64, size: usize },

    #[error("Exception handler at 0x{vector:016X} did not return within the execution budget")]
    ExceptionBudget { vector: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmulatorError {
    /// Attach block context to an error raised while a compiled block ran.
    ///
    /// Errors that already carry block context are returned unchanged.
    pub fn in_block(self, block: u64, address: u64, compile_log: &str) -> Self {
        match self {
            err @ EmulatorError::CompiledBlock { .. } => err,
            other => EmulatorError::CompiledBlock {
                block,
                address,
                log: format!("{}\n{}", other, compile_log),
            },
        }
    }
}
