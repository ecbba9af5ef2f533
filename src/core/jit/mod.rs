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

//! Block recompilation
//!
//! The recompiler turns basic blocks into closure lists that run the same
//! semantics as the interpreter with hot registers kept in locals. Anything
//! it does not translate goes back to the interpreter one instruction at a
//! time through the fallback bridge.
//!
//! [`Engine`] selects between plain interpretation and the recompiler at
//! runtime; both implement [`ExecutionEngine`].

pub mod block;
pub mod bridge;
pub mod cache;
pub mod compiler;
pub mod regmap;

#[cfg(test)]
mod tests;

pub use block::{BlockBuilder, RuntimeBasicBlock};
pub use bridge::{RecompilerEngine, RecompilerStats};
pub use cache::BlockCache;
pub use compiler::{BlockExit, CompiledBlock, Recompiler};
pub use regmap::RegisterMap;

use crate::core::config::{CpuConfig, EngineKind};
use crate::core::cpu::{Interpreter, StepEvent};
use crate::core::error::Result;
use crate::core::memory::DataMemory;

/// Execution engine abstraction
pub trait ExecutionEngine {
    /// Execute one unit of work.
    /// Interpreter: one instruction. Recompiler: one compiled block.
    fn step(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<StepEvent>;

    /// Invalidate any compiled code covering `[start, start + len)`.
    fn invalidate_range(&mut self, start: u64, len: u64);

    fn name(&self) -> &'static str;
}

/// Plain interpretation, one instruction per step
#[derive(Debug, Default)]
pub struct InterpreterEngine;

impl ExecutionEngine for InterpreterEngine {
    fn step(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<StepEvent> {
        cpu.step(mem)
    }

    fn invalidate_range(&mut self, _start: u64, _len: u64) {}

    fn name(&self) -> &'static str {
        "interpreter"
    }
}

impl ExecutionEngine for RecompilerEngine {
    fn step(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<StepEvent> {
        RecompilerEngine::step(self, cpu, mem)
    }

    fn invalidate_range(&mut self, start: u64, len: u64) {
        RecompilerEngine::invalidate_range(self, start, len);
    }

    fn name(&self) -> &'static str {
        "recompiler"
    }
}

/// Runtime-selected execution engine
pub enum Engine {
    Interpreter(InterpreterEngine),
    Recompiler(Box<RecompilerEngine>),
}

impl Engine {
    pub fn interpreter() -> Self {
        Self::Interpreter(InterpreterEngine)
    }

    pub fn recompiler(config: &CpuConfig) -> Self {
        Self::Recompiler(Box::new(RecompilerEngine::new(config)))
    }

    /// Build the engine named by `config.engine`
    pub fn from_config(config: &CpuConfig) -> Self {
        match config.engine {
            EngineKind::Interpreter => Self::interpreter(),
            EngineKind::Recompiler => Self::recompiler(config),
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Interpreter(_) => EngineKind::Interpreter,
            Self::Recompiler(_) => EngineKind::Recompiler,
        }
    }

    /// Drop all compiled code (no-op for the interpreter)
    pub fn clear_caches(&mut self) {
        if let Self::Recompiler(engine) = self {
            engine.clear_caches();
        }
    }

    /// One-line counter summary for run logs
    pub fn stats_line(&self) -> Option<String> {
        match self {
            Self::Interpreter(_) => None,
            Self::Recompiler(engine) => Some(engine.stats_line()),
        }
    }

    pub fn as_recompiler(&self) -> Option<&RecompilerEngine> {
        match self {
            Self::Recompiler(engine) => Some(engine),
            Self::Interpreter(_) => None,
        }
    }
}

impl ExecutionEngine for Engine {
    fn step(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<StepEvent> {
        match self {
            Self::Interpreter(engine) => engine.step(cpu, mem),
            Self::Recompiler(engine) => RecompilerEngine::step(engine, cpu, mem),
        }
    }

    fn invalidate_range(&mut self, start: u64, len: u64) {
        match self {
            Self::Interpreter(engine) => engine.invalidate_range(start, len),
            Self::Recompiler(engine) => RecompilerEngine::invalidate_range(engine, start, len),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Interpreter(engine) => engine.name(),
            Self::Recompiler(engine) => ExecutionEngine::name(engine.as_ref()),
        }
    }
}
