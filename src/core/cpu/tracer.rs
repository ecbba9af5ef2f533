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

//! CPU execution tracer for debugging
//!
//! Logs one line per executed instruction to a file for analysis and
//! debugging.

use super::decode::DecodedInstruction;
use super::disassembler::{Disassembler, SymbolTable};
use super::Interpreter;
use crate::core::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CPU execution tracer
///
/// Each line in the trace file shows:
/// - Instruction address
/// - Raw instruction encoding
/// - Disassembled instruction
/// - Values of a few selected registers
///
/// Tracing stops by itself once `limit` lines have been written.
///
/// # Example
/// ```no_run
/// use r4300::core::cpu::CpuTracer;
///
/// let mut tracer = CpuTracer::new("trace.log").unwrap();
/// tracer.set_limit(Some(10_000));
/// ```
pub struct CpuTracer {
    /// Enable/disable tracing
    enabled: bool,
    /// Output file handle
    output: BufWriter<File>,
    /// Registers shown on every line
    registers: Vec<usize>,
    limit: Option<u64>,
    written: u64,
    symbols: Option<SymbolTable>,
}

impl CpuTracer {
    /// Create a new CPU tracer
    ///
    /// Opens a file for writing trace output. If the file exists, it will be overwritten.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the output trace file
    ///
    /// # Returns
    ///
    /// - `Ok(CpuTracer)` if the file was opened successfully
    /// - `Err(EmulatorError)` if file creation fails
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let output = BufWriter::new(File::create(path)?);
        Ok(Self {
            enabled: true,
            output,
            registers: vec![2, 4, 5, 31],
            limit: None,
            written: 0,
            symbols: None,
        })
    }

    /// Enable or disable tracing
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check if tracing is enabled (and the limit not yet reached)
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.limit.is_none_or(|limit| self.written < limit)
    }

    /// Stop after `limit` lines
    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit;
    }

    /// Select the registers shown on every line (up to 8)
    pub fn set_registers(&mut self, registers: &[usize]) {
        self.registers = registers.iter().copied().filter(|&r| r < 32).take(8).collect();
    }

    pub fn set_symbols(&mut self, symbols: SymbolTable) {
        self.symbols = Some(symbols);
    }

    /// Lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Trace one instruction about to execute
    ///
    /// If tracing is disabled, this function returns immediately.
    ///
    /// # Arguments
    ///
    /// * `cpu` - Interpreter whose registers are shown
    /// * `decoded` - The instruction being executed
    pub fn trace(&mut self, cpu: &Interpreter, decoded: &DecodedInstruction) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let disasm = Disassembler::disassemble_with(decoded, self.symbols.as_ref());
        log::trace!("0x{:016X}: {}", decoded.address, disasm);

        write!(
            self.output,
            "PC=0x{:016X} [0x{:08X}] {:40} |",
            decoded.address,
            decoded.inst.word(),
            disasm
        )?;

        for &reg in &self.registers {
            write!(self.output, " r{}={:016X}", reg, cpu.state.gpr64(reg))?;
        }

        writeln!(self.output)?;
        self.written += 1;

        if self.limit == Some(self.written) {
            log::info!("Trace limit of {} instructions reached", self.written);
            self.output.flush()?;
        }
        Ok(())
    }

    /// Flush the output buffer
    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()?;
        Ok(())
    }
}
