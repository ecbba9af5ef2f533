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

//! System integration module
//!
//! [`System`] owns the CPU, the data memory adapter and the execution
//! engine, and runs the top-level step loop.

use super::config::{canonical_address, CpuConfig};
use super::cpu::{BreakEvent, CpuTracer, Decoder, Interpreter, StepEvent};
use super::error::Result;
use super::jit::{Engine, ExecutionEngine};
use super::memory::{DataMemory, FlatMemory, MemoryBus};
use super::snapshot::Snapshot;
use std::path::Path;
use std::time::Instant;

/// Why [`System::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    StepLimit,
    Breakpoint(BreakEvent),
}

/// Outcome of a [`System::run`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: u64,
    /// Instructions retired during the run
    pub instructions: u64,
    pub stop: StopReason,
}

/// CPU, memory and engine
///
/// # Example
/// ```
/// use r4300::core::config::CpuConfig;
/// use r4300::core::system::System;
///
/// let mut system = System::new(CpuConfig::default(), 0x10000).unwrap();
/// system.load_words(0x8000_0000, &[0x2402_0005, 0x1000_FFFF, 0]).unwrap(); // addiu v0, zero, 5; b .; nop
/// system.set_pc(0x8000_0000);
/// system.run(4).unwrap();
/// assert_eq!(system.cpu().state.gpr64(2), 5);
/// ```
pub struct System {
    cpu: Interpreter,
    memory: DataMemory,
    engine: Engine,
    config: CpuConfig,
    /// Per-step trace file (optional)
    tracer: Option<CpuTracer>,
    steps: u64,
}

impl System {
    /// Create a system over flat memory of `memory_size` bytes
    ///
    /// # Errors
    ///
    /// `Config` if the configuration does not validate
    pub fn new(config: CpuConfig, memory_size: usize) -> Result<Self> {
        Self::with_bus(config, Box::new(FlatMemory::new(memory_size)))
    }

    /// Create a system over a caller-supplied memory collaborator
    pub fn with_bus(config: CpuConfig, bus: Box<dyn MemoryBus>) -> Result<Self> {
        config.validate()?;

        let mut cpu = Interpreter::new(Decoder::new(config.byte_order), config.mode64);
        if let Some(entry) = config.entry_point {
            cpu.set_program_entry_point(canonical_address(entry));
        }
        cpu.reset(canonical_address(config.reset_vector));

        let memory = DataMemory::new(bus, config.byte_order);
        let engine = Engine::from_config(&config);

        let tracer = match &config.trace_path {
            Some(path) => {
                let mut tracer = CpuTracer::new(path)?;
                tracer.set_limit(config.trace_limit);
                log::info!("CPU tracing enabled: {}", path.display());
                Some(tracer)
            }
            None => None,
        };

        log::info!(
            "System ready: engine={}, byte_order={:?}, mode64={}",
            engine.name(),
            config.byte_order,
            config.mode64
        );

        Ok(Self {
            cpu,
            memory,
            engine,
            config,
            tracer,
            steps: 0,
        })
    }

    /// Copy an image file into memory at `address`
    ///
    /// The bytes are stored as they are in the file; the configured byte
    /// order decides how they are read back.
    ///
    /// # Returns
    ///
    /// Number of bytes loaded
    pub fn load_image(&mut self, path: impl AsRef<Path>, address: u64) -> Result<usize> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        self.memory.bus_mut().write(address, &bytes)?;
        self.engine.clear_caches();
        log::info!(
            "Loaded {} bytes from {} at 0x{:016X}",
            bytes.len(),
            path.display(),
            address
        );
        Ok(bytes.len())
    }

    /// Store instruction words at `address` in the configured byte order
    pub fn load_words(&mut self, address: u64, words: &[u32]) -> Result<()> {
        let order = self.memory.byte_order();
        for (i, word) in words.iter().enumerate() {
            let at = address.wrapping_add(i as u64 * 4);
            order.write_bytes(self.memory.bus_mut(), at, &word.to_be_bytes())?;
        }
        self.engine.clear_caches();
        Ok(())
    }

    /// Reset the CPU to the configured reset vector
    pub fn reset(&mut self) {
        if let Some(entry) = self.config.entry_point {
            self.cpu.set_program_entry_point(canonical_address(entry));
        }
        self.cpu.reset(canonical_address(self.config.reset_vector));
        self.engine.clear_caches();
        self.steps = 0;
    }

    /// Move PC, sign-extending a 32-bit address
    pub fn set_pc(&mut self, pc: u64) {
        self.cpu.set_pc(canonical_address(pc));
    }

    pub fn pc(&self) -> u64 {
        self.cpu.pc()
    }

    /// Execute one engine step
    ///
    /// One instruction for the interpreter, one block for the recompiler.
    /// A fatal error is logged with a full register dump before it is
    /// returned.
    pub fn step(&mut self) -> Result<StepEvent> {
        self.trace();

        match self.engine.step(&mut self.cpu, &mut self.memory) {
            Ok(event) => {
                self.steps += 1;
                Ok(event)
            }
            Err(e) => {
                log::error!("Fatal error at PC=0x{:016X}: {}", self.cpu.pc(), e);
                log::error!("{}", self.fatal_dump());
                if let Some(tracer) = self.tracer.as_mut() {
                    let _ = tracer.flush();
                }
                Err(e)
            }
        }
    }

    fn trace(&mut self) {
        let Some(tracer) = self.tracer.as_mut() else {
            return;
        };
        if !tracer.is_enabled() {
            return;
        }
        let mut decoded = self.cpu.decoder().decode(&mut self.memory, self.cpu.pc());
        decoded.delay_slot = self.cpu.in_delay_slot();
        if let Err(e) = tracer.trace(&self.cpu, &decoded) {
            log::warn!("Failed to write trace: {}", e);
        }
    }

    /// Step until `max_steps` steps have run or a breakpoint halts
    pub fn run(&mut self, max_steps: u64) -> Result<RunSummary> {
        let start = Instant::now();
        let first = self.cpu.instructions();
        let mut summary = RunSummary {
            steps: 0,
            instructions: 0,
            stop: StopReason::StepLimit,
        };

        while summary.steps < max_steps {
            let event = self.step()?;
            summary.steps += 1;
            if let StepEvent::Breakpoint(hit) = event {
                log::info!("Breakpoint at 0x{:016X}: {:?}", self.cpu.pc(), hit);
                summary.stop = StopReason::Breakpoint(hit);
                break;
            }
        }

        summary.instructions = self.cpu.instructions() - first;
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.flush()?;
        }

        let elapsed = start.elapsed().as_secs_f64();
        log::info!(
            "Ran {} steps ({} instructions) in {:.3}s, PC=0x{:016X}",
            summary.steps,
            summary.instructions,
            elapsed,
            self.cpu.pc()
        );
        if let Some(stats) = self.engine.stats_line() {
            log::info!("{}", stats);
        }
        Ok(summary)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.cpu, self.engine.name())
    }

    pub fn restore(&mut self, snapshot: &Snapshot) {
        snapshot.restore(&mut self.cpu);
    }

    /// Register dump for fatal errors
    pub fn fatal_dump(&self) -> String {
        format!(
            "engine: {}  steps: {}  instructions: {}\n{}",
            self.engine.name(),
            self.steps,
            self.cpu.instructions(),
            self.cpu.dump_registers()
        )
    }

    pub fn cpu(&self) -> &Interpreter {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Interpreter {
        &mut self.cpu
    }

    pub fn memory(&self) -> &DataMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut DataMemory {
        &mut self.memory
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}
