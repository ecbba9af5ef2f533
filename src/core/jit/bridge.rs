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

//! Fallback bridge and exception delivery for compiled code
//!
//! [`RecompilerEngine`] is the block-at-a-time execution loop. It owns two
//! block caches: the mainline cache and a separate cache for exception
//! handler code. When a block raises an exception, [`RecompilerEngine::exception_begin`]
//! switches to the handler cache and runs until ERET, then
//! [`RecompilerEngine::exception_end`] swaps the mainline cache back.

use super::block::{BlockBuilder, RuntimeBasicBlock};
use super::cache::BlockCache;
use super::compiler::{BlockExit, CompiledBlock, Recompiler};
use crate::core::config::CpuConfig;
use crate::core::cpu::{DecodedInstruction, FallbackOutcome, Interpreter, StepEvent};
use crate::core::error::{EmulatorError, Result};
use crate::core::memory::DataMemory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Run one already-decoded instruction through the interpreter
pub(crate) fn fallback_step(
    cpu: &mut Interpreter,
    mem: &mut DataMemory,
    decoded: &DecodedInstruction,
) -> Result<FallbackOutcome> {
    log::trace!(
        "Fallback 0x{:016X}: {}",
        decoded.address,
        decoded.name()
    );
    cpu.fallback(decoded, mem)
}

/// Execution counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecompilerStats {
    pub blocks_compiled: u64,
    pub blocks_executed: u64,
    /// Instructions run inside compiled blocks
    pub block_instructions: u64,
    /// Instructions run by single-stepping the interpreter
    pub interpreter_steps: u64,
    pub exceptions: u64,
    pub invalidated_blocks: u64,
    pub cache_flushes: u64,
}

/// Block-at-a-time engine built on the recompiler
pub struct RecompilerEngine {
    builder: BlockBuilder,
    recompiler: Recompiler,
    main: BlockCache,
    interrupt: BlockCache,
    /// Running exception handler code (interrupt cache active)
    in_exception: bool,
    exception_budget: u64,
    invalidate_on_write: bool,
    stats: RecompilerStats,
}

impl RecompilerEngine {
    pub fn new(config: &CpuConfig) -> Self {
        Self {
            builder: BlockBuilder::new(config.max_block_instructions),
            recompiler: Recompiler::new(config.mode64, config.hot_registers),
            main: BlockCache::new("main"),
            interrupt: BlockCache::new("interrupt"),
            in_exception: false,
            exception_budget: config.exception_budget,
            invalidate_on_write: config.invalidate_on_write,
            stats: RecompilerStats::default(),
        }
    }

    /// Route every instruction through the interpreter bridge
    ///
    /// Blocks are still built, cached and run, which isolates the block
    /// machinery from the native translations.
    pub fn with_fallback_only(mut self) -> Self {
        self.recompiler = self.recompiler.fallback_only();
        self
    }

    pub fn stats(&self) -> RecompilerStats {
        self.stats
    }

    pub fn stats_line(&self) -> String {
        let s = &self.stats;
        format!(
            "blocks compiled={} executed={} block_insns={} interp_steps={} exceptions={} invalidated={} flushes={}",
            s.blocks_compiled,
            s.blocks_executed,
            s.block_instructions,
            s.interpreter_steps,
            s.exceptions,
            s.invalidated_blocks,
            s.cache_flushes
        )
    }

    pub fn main_cache(&self) -> &BlockCache {
        &self.main
    }

    pub fn interrupt_cache(&self) -> &BlockCache {
        &self.interrupt
    }

    pub fn in_exception(&self) -> bool {
        self.in_exception
    }

    fn active(&self) -> &BlockCache {
        if self.in_exception {
            &self.interrupt
        } else {
            &self.main
        }
    }

    fn active_mut(&mut self) -> &mut BlockCache {
        if self.in_exception {
            &mut self.interrupt
        } else {
            &mut self.main
        }
    }

    /// Compiled code assumes one operating mode; drop it when the mode changes
    fn sync_mode(&mut self, cpu: &Interpreter) {
        if self.recompiler.mode64() != cpu.mode64() {
            log::debug!("Operating mode changed, dropping compiled blocks");
            self.recompiler.set_mode64(cpu.mode64());
            self.clear_caches();
        }
    }

    /// Whether the next instruction has to go through the interpreter
    ///
    /// A delay slot or nullified slot left over from a block that ended on
    /// its branch is single-stepped, as is everything under a debugger.
    fn needs_interpreter(cpu: &Interpreter) -> bool {
        cpu.in_delay_slot() || cpu.pending_nullify() || cpu.has_debugger()
    }

    /// Run one compiled block (or one interpreter step)
    ///
    /// An exception raised by the block is delivered right away: the
    /// handler runs to its ERET before this returns.
    pub fn step(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<StepEvent> {
        self.sync_mode(cpu);
        if self.invalidate_on_write && !mem.is_tracking_writes() {
            mem.track_writes(true);
        }

        let event = if Self::needs_interpreter(cpu) {
            self.stats.interpreter_steps += 1;
            let event = cpu.step(mem)?;
            self.write_barrier(mem);
            let raised = matches!(event, StepEvent::Executed | StepEvent::Interrupt)
                && cpu.was_redirected()
                && !cpu.was_eret();
            if raised && !cpu.has_debugger() && !self.in_exception {
                self.exception_begin(cpu, mem)?;
            }
            event
        } else {
            cpu.check_entry_point();
            let exit = self.run_block(cpu, mem)?;
            if exit.redirected && !exit.eret && !self.in_exception {
                self.exception_begin(cpu, mem)?;
            }
            if exit.interrupted {
                StepEvent::Interrupt
            } else {
                StepEvent::Executed
            }
        };

        if cpu.take_entry_point_hit() {
            self.clear_caches();
        }
        Ok(event)
    }

    /// Look up or compile the block at PC, run it and apply its exit
    fn run_block(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<BlockExit> {
        let pc = cpu.pc();
        let cached = self.active().get(pc);
        let block = match cached {
            Some(block) => block,
            None => self.compile_at(cpu, mem, pc)?,
        };

        self.stats.blocks_executed += 1;
        let exit = block.execute(cpu, mem)?;
        self.stats.block_instructions += exit.executed as u64;

        if !exit.redirected {
            cpu.resume_at(exit.next_pc, exit.pending, exit.nullify);
        }
        self.write_barrier(mem);
        Ok(exit)
    }

    fn compile_at(
        &mut self,
        cpu: &Interpreter,
        mem: &mut DataMemory,
        pc: u64,
    ) -> Result<Arc<CompiledBlock>> {
        // Blocks never run across the entry point while booting
        let stop_at = if cpu.in_boot_mode() {
            cpu.entry_point()
        } else {
            None
        };
        let block = self.builder.build(cpu.decoder(), mem, pc, stop_at);
        let compiled = self.recompiler.compile(&block)?;
        self.stats.blocks_compiled += 1;
        self.active_mut().insert(compiled)
    }

    /// Drop compiled code the last instructions wrote over
    fn write_barrier(&mut self, mem: &mut DataMemory) {
        if !mem.has_dirty() {
            return;
        }
        for (address, size) in mem.drain_dirty() {
            self.invalidate_range(address, size as u64);
        }
    }

    /// Run instruction `offset` of `block` through the interpreter
    ///
    /// The interpreter gets the already-decoded instruction with PC set to
    /// its address. The branch decision it makes is handed back instead of
    /// being applied.
    ///
    /// # Errors
    ///
    /// `CompiledBlock` if `offset` is outside the block, otherwise whatever
    /// the interpreter reports for the instruction
    pub fn fallback(
        cpu: &mut Interpreter,
        mem: &mut DataMemory,
        block: &RuntimeBasicBlock,
        offset: usize,
    ) -> Result<FallbackOutcome> {
        let Some(decoded) = block.instructions.get(offset) else {
            return Err(EmulatorError::CompiledBlock {
                block: block.start,
                address: block.start.wrapping_add(offset as u64 * 4),
                log: format!("instruction {} is outside a {}-instruction block", offset, block.len()),
            });
        };
        fallback_step(cpu, mem, decoded)
    }

    /// Deliver an exception raised by compiled code
    ///
    /// PC already holds the exception vector. Handler code is built into
    /// the interrupt cache and run until ERET, then [`Self::exception_end`]
    /// restores the mainline cache.
    ///
    /// # Errors
    ///
    /// `ExceptionBudget` if the handler does not reach ERET within the
    /// configured number of blocks, or any error raised by handler code
    pub fn exception_begin(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<()> {
        let vector = cpu.pc();
        self.in_exception = true;
        self.stats.exceptions += 1;
        log::debug!(
            "Exception begin: vector=0x{:016X} cause=0x{:08X} EPC=0x{:016X}",
            vector,
            cpu.cop0.cause(),
            cpu.cop0.epc()
        );

        let result = self.run_handler(cpu, mem, vector);
        self.exception_end(cpu);
        result
    }

    fn run_handler(&mut self, cpu: &mut Interpreter, mem: &mut DataMemory, vector: u64) -> Result<()> {
        for _ in 0..self.exception_budget {
            if Self::needs_interpreter(cpu) {
                self.stats.interpreter_steps += 1;
                let event = cpu.step(mem)?;
                self.write_barrier(mem);
                if event == StepEvent::Executed && cpu.was_eret() {
                    return Ok(());
                }
            } else {
                cpu.check_entry_point();
                if self.run_block(cpu, mem)?.eret {
                    return Ok(());
                }
            }
        }
        Err(EmulatorError::ExceptionBudget { vector })
    }

    /// Leave exception delivery
    ///
    /// Restores the mainline cache and clears Status.EXL and Status.ERL.
    /// Both are cleared even when the handler's ERET only dropped ERL.
    pub fn exception_end(&mut self, cpu: &mut Interpreter) {
        self.in_exception = false;
        cpu.cop0.clear_exception_level();
        log::debug!("Exception end: resuming at 0x{:016X}", cpu.pc());
    }

    /// Drop compiled blocks overlapping `[start, start + len)` in both caches
    pub fn invalidate_range(&mut self, start: u64, len: u64) {
        let removed = self.main.invalidate_range(start, len) + self.interrupt.invalidate_range(start, len);
        self.stats.invalidated_blocks += removed as u64;
    }

    /// Drop every compiled block
    pub fn clear_caches(&mut self) {
        self.main.clear();
        self.interrupt.clear();
        self.stats.cache_flushes += 1;
    }
}
