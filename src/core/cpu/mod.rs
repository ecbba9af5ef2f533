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

use crate::core::error::{EmulatorError, Result};
use crate::core::memory::DataMemory;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// VR4300 interpreter
///
/// # Architecture
/// - Architecture: MIPS III (64-bit), with a 32-bit operating mode
/// - Registers: 32 general-purpose 64-bit registers, HI/LO, 32 FPRs
/// - Exactly one delay slot after every branch and jump; "likely"
///   branches nullify the slot when not taken
///
/// One [`Interpreter::step`] decodes the instruction at PC, dispatches it
/// through the id-indexed handler table and then resolves any branch that
/// was latched by the previous instruction.
///
/// # Example
/// ```
/// use r4300::core::cpu::Interpreter;
/// use r4300::core::cpu::decode::Decoder;
///
/// let mut cpu = Interpreter::new(Decoder::default(), true);
/// cpu.reset(0xFFFF_FFFF_BFC0_0000);
/// assert_eq!(cpu.state.gpr64(0), 0); // r0 is always 0
/// ```
pub struct Interpreter {
    /// Architectural register file
    pub state: ExecutionState,

    /// Coprocessor 0 (System Control Unit)
    pub cop0: Cop0,

    /// Address of the next instruction to execute
    pc: u64,

    decoder: Decoder,

    /// Handler table indexed by opcode id
    dispatch: &'static [Option<Handler>],

    /// Branch latched by the previous instruction, resolved after the
    /// instruction currently executing (its delay slot)
    delay: Option<PendingBranch>,

    /// Branch requested by the instruction currently executing
    branch: Option<PendingBranch>,

    /// Skip the next instruction (likely branch not taken)
    nullify_next: bool,

    /// Address and delay-slot flag of the executing instruction
    current: u64,
    current_delay: bool,

    /// The executing instruction set PC itself (exception or ERET)
    redirected: bool,
    /// The executing instruction was ERET
    eret: bool,

    /// Program entry point and boot-phase flag
    entry_point: Option<u64>,
    boot_mode: bool,
    entry_point_hit: bool,

    debugger: Option<Debugger>,

    /// Host-side interrupt request, polled before each instruction
    interrupt_request: Arc<AtomicBool>,

    /// Instructions retired
    instructions: u64,

    /// Most recently executed instruction (for diagnostics)
    last_instruction: Option<DecodedInstruction>,
}

/// Instruction handler signature used by the dispatch table
pub type Handler = fn(&mut Interpreter, &DecodedInstruction, &mut DataMemory) -> Result<()>;

/// A branch decision waiting for its delay slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingBranch {
    pub target: u64,
    pub taken: bool,
}

/// What one step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// An instruction executed (possibly raising an exception)
    Executed,
    /// The instruction was a nullified delay slot
    Nullified,
    /// An interrupt was taken instead of executing
    Interrupt,
    /// A breakpoint halted execution
    Breakpoint(BreakEvent),
}

/// Result of running one instruction on behalf of a compiled block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackOutcome {
    /// Branch requested by the instruction
    pub branch: Option<PendingBranch>,
    /// The instruction nullifies its delay slot
    pub nullify_next: bool,
    /// PC was redirected (exception or ERET)
    pub redirected: bool,
    /// The instruction was ERET
    pub eret: bool,
}

pub(crate) mod alu;
pub mod cop0;
mod debug;
pub mod decode;
mod disassembler;
mod instructions;
pub mod opcode;
pub mod state;
#[cfg(test)]
pub(crate) mod tests;
mod tracer;

// Re-exports
pub use cop0::{Cop0, ExceptionCause, Status};
pub use debug::{BreakEvent, Debugger};
pub use decode::{BinaryInstruction, DecodedInstruction, Decoder};
pub use disassembler::{Disassembler, SymbolTable};
pub use opcode::{Op, Opcode};
pub use state::ExecutionState;
pub use tracer::CpuTracer;

pub(crate) use instructions::{read_aligned, write_aligned, Access};

impl Interpreter {
    /// Create a new interpreter with reset state
    ///
    /// # Arguments
    ///
    /// * `decoder` - Decoder carrying the fetch byte-order policy
    /// * `mode64` - Run in 64-bit operating mode
    pub fn new(decoder: Decoder, mode64: bool) -> Self {
        Self {
            state: ExecutionState::new(mode64),
            cop0: Cop0::new(),
            pc: 0,
            decoder,
            dispatch: instructions::dispatch_table(),
            delay: None,
            branch: None,
            nullify_next: false,
            current: 0,
            current_delay: false,
            redirected: false,
            eret: false,
            entry_point: None,
            boot_mode: false,
            entry_point_hit: false,
            debugger: None,
            interrupt_request: Arc::new(AtomicBool::new(false)),
            instructions: 0,
            last_instruction: None,
        }
    }

    /// Reset registers and start executing at `pc`
    pub fn reset(&mut self, pc: u64) {
        self.state.reset();
        self.cop0.reset();
        self.pc = self.normalize(pc);
        self.delay = None;
        self.branch = None;
        self.nullify_next = false;
        self.redirected = false;
        self.eret = false;
        self.boot_mode = self.entry_point.is_some();
        self.entry_point_hit = false;
        self.instructions = 0;
        self.last_instruction = None;
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// Move PC, dropping any pending branch
    pub fn set_pc(&mut self, pc: u64) {
        self.pc = self.normalize(pc);
        self.delay = None;
        self.branch = None;
        self.nullify_next = false;
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn mode64(&self) -> bool {
        self.state.mode64()
    }

    /// Truncate an address to 32 bits outside 64-bit mode
    #[inline(always)]
    pub fn normalize(&self, address: u64) -> u64 {
        if self.state.mode64() {
            address
        } else {
            address & 0xFFFF_FFFF
        }
    }

    /// Register value as seen by comparisons
    ///
    /// In 32-bit mode only the low word is significant and is treated as
    /// sign-extended.
    #[inline(always)]
    pub fn operand(&self, index: usize) -> u64 {
        if self.state.mode64() {
            self.state.gpr64(index)
        } else {
            state::sign_extend32(self.state.gpr32(index))
        }
    }

    /// Store a full-width logical result
    #[inline(always)]
    pub(crate) fn set_result(&mut self, index: usize, value: u64) {
        if self.state.mode64() {
            self.state.set_gpr64(index, value);
        } else {
            self.state.set_gpr32(index, value as u32);
        }
    }

    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Whether the next instruction executes in a branch delay slot
    pub fn in_delay_slot(&self) -> bool {
        self.delay.is_some()
    }

    pub fn last_instruction(&self) -> Option<&DecodedInstruction> {
        self.last_instruction.as_ref()
    }

    /// Configure the program entry point and enter boot mode
    pub fn set_program_entry_point(&mut self, address: u64) {
        self.entry_point = Some(self.normalize(address));
        self.boot_mode = true;
        self.entry_point_hit = false;
    }

    pub fn in_boot_mode(&self) -> bool {
        self.boot_mode
    }

    pub fn entry_point(&self) -> Option<u64> {
        self.entry_point
    }

    /// Leave boot mode if PC has reached the entry point
    ///
    /// # Returns
    /// true exactly once, on the step where the entry point is first reached
    pub fn check_entry_point(&mut self) -> bool {
        if !self.boot_mode || Some(self.pc) != self.entry_point {
            return false;
        }
        self.boot_mode = false;
        self.entry_point_hit = true;
        log::info!("Program entry point reached at 0x{:016X}", self.pc);
        true
    }

    /// Consume the entry-point-hit signal
    pub fn take_entry_point_hit(&mut self) -> bool {
        std::mem::take(&mut self.entry_point_hit)
    }

    pub fn attach_debugger(&mut self, debugger: Debugger) {
        self.debugger = Some(debugger);
    }

    pub fn detach_debugger(&mut self) -> Option<Debugger> {
        self.debugger.take()
    }

    pub fn debugger_mut(&mut self) -> Option<&mut Debugger> {
        self.debugger.as_mut()
    }

    pub fn has_debugger(&self) -> bool {
        self.debugger.is_some()
    }

    /// Flag another thread can set to request an external interrupt
    pub fn interrupt_request(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt_request)
    }

    /// Latch host requests and report whether an interrupt should be taken
    ///
    /// Interrupts are held off while a nullified delay slot is pending so
    /// that EPC never points at an instruction that must not run.
    pub fn poll_interrupts(&mut self) -> bool {
        if self.interrupt_request.swap(false, Ordering::AcqRel) {
            self.cop0.set_interrupt_line(0, true);
        }
        !self.nullify_next && self.cop0.interrupt_pending()
    }

    /// Deliver an interrupt before the instruction at PC
    pub fn take_interrupt(&mut self) {
        self.take_interrupt_at(self.pc, self.delay.is_some());
    }

    /// Deliver an interrupt before the instruction at `address`
    pub(crate) fn take_interrupt_at(&mut self, address: u64, delay_slot: bool) {
        self.current = address;
        self.current_delay = delay_slot;
        self.eret = false;
        self.raise(ExceptionCause::Interrupt);
        self.delay = None;
        self.branch = None;
    }

    /// Continue at `pc` after a compiled block
    ///
    /// `delay` is a branch whose delay slot has not run yet and `nullify`
    /// skips the instruction at `pc`; both only occur when a block ends
    /// right after a branch.
    pub(crate) fn resume_at(&mut self, pc: u64, delay: Option<PendingBranch>, nullify: bool) {
        self.pc = self.normalize(pc);
        self.delay = delay;
        self.branch = None;
        self.nullify_next = nullify;
    }

    /// Branch whose delay slot is the next instruction
    pub(crate) fn pending_branch(&self) -> Option<PendingBranch> {
        self.delay
    }

    /// Whether the next instruction will be skipped (untaken likely branch)
    pub fn pending_nullify(&self) -> bool {
        self.nullify_next
    }

    /// Execute one instruction
    ///
    /// # Returns
    ///
    /// What happened, or a fatal error for an invalid or unsupported
    /// instruction
    pub fn step(&mut self, mem: &mut DataMemory) -> Result<StepEvent> {
        if self.poll_interrupts() {
            self.take_interrupt();
            return Ok(StepEvent::Interrupt);
        }

        self.check_entry_point();

        if let Some(debugger) = self.debugger.as_mut() {
            if let Some(event) = debugger.check_address(self.pc) {
                return Ok(StepEvent::Breakpoint(event));
            }
        }

        let mut decoded = self.decoder.decode(mem, self.pc);
        decoded.delay_slot = self.delay.is_some();

        let before = match &self.debugger {
            Some(debugger) if debugger.watches_registers() => Some(*self.state.gprs()),
            _ => None,
        };

        let event = self.step_decoded(&decoded, mem)?;

        if let Some(debugger) = &self.debugger {
            if let Some(before) = before {
                if let Some(hit) = debugger.check_registers(&before, self.state.gprs()) {
                    return Ok(StepEvent::Breakpoint(hit));
                }
            }
            if event == StepEvent::Executed && decoded.is_branch() && !self.redirected {
                let taken = self.delay.map(|b| b.taken).unwrap_or(false);
                if let Some(hit) = debugger.check_branch(decoded.address, taken) {
                    return Ok(StepEvent::Breakpoint(hit));
                }
            }
        }

        Ok(event)
    }

    /// Execute an already-decoded instruction at PC and advance
    pub(crate) fn step_decoded(
        &mut self,
        decoded: &DecodedInstruction,
        mem: &mut DataMemory,
    ) -> Result<StepEvent> {
        if self.nullify_next {
            self.nullify_next = false;
            self.pc = self.normalize(decoded.next_address());
            return Ok(StepEvent::Nullified);
        }

        if decoded.invalid {
            return Err(EmulatorError::InvalidInstruction {
                address: decoded.address,
                word: decoded.inst.word(),
            });
        }

        self.begin(decoded);
        self.execute(decoded, mem)?;

        if self.redirected {
            self.delay = None;
            self.branch = None;
            return Ok(StepEvent::Executed);
        }

        let next = match self.delay.take() {
            Some(branch) if branch.taken => branch.target,
            _ => decoded.next_address(),
        };
        self.pc = self.normalize(next);
        self.delay = self.branch.take();
        Ok(StepEvent::Executed)
    }

    /// Run one instruction for a compiled block
    ///
    /// The instruction arrives already decoded. Branch decisions are handed
    /// back instead of being applied, since the block owns its delay slot.
    pub fn fallback(
        &mut self,
        decoded: &DecodedInstruction,
        mem: &mut DataMemory,
    ) -> Result<FallbackOutcome> {
        if decoded.invalid {
            return Err(EmulatorError::InvalidInstruction {
                address: decoded.address,
                word: decoded.inst.word(),
            });
        }

        self.pc = decoded.address;
        self.delay = None;
        self.nullify_next = false;

        self.begin(decoded);
        self.execute(decoded, mem)?;

        let outcome = FallbackOutcome {
            branch: self.branch.take(),
            nullify_next: std::mem::take(&mut self.nullify_next),
            redirected: self.redirected,
            eret: self.eret,
        };
        if !self.redirected {
            self.pc = self.normalize(decoded.next_address());
        }
        Ok(outcome)
    }

    /// Per-instruction bookkeeping shared by both execution paths
    fn begin(&mut self, decoded: &DecodedInstruction) {
        self.current = decoded.address;
        self.current_delay = decoded.delay_slot;
        self.redirected = false;
        self.eret = false;
        self.branch = None;
        self.retire();
        self.last_instruction = Some(*decoded);
    }

    /// Account for one executed instruction
    #[inline(always)]
    pub(crate) fn retire(&mut self) {
        self.cop0.tick();
        self.instructions += 1;
    }

    /// Record the instruction a compiled block is about to run
    #[inline(always)]
    pub(crate) fn set_current(&mut self, decoded: &DecodedInstruction) {
        self.current = decoded.address;
        self.current_delay = decoded.delay_slot;
        self.redirected = false;
    }

    pub(crate) fn was_redirected(&self) -> bool {
        self.redirected
    }

    /// The last executed instruction was ERET
    pub(crate) fn was_eret(&self) -> bool {
        self.eret
    }

    /// Request a branch from the executing instruction
    #[inline(always)]
    pub(crate) fn request_branch(&mut self, target: u64, taken: bool) {
        self.branch = Some(PendingBranch {
            target: self.normalize(target),
            taken,
        });
    }

    pub(crate) fn request_nullify(&mut self) {
        self.nullify_next = true;
    }

    /// Raise an architectural exception for the executing instruction
    pub fn raise(&mut self, cause: ExceptionCause) {
        self.raise_coprocessor(cause, 0);
    }

    /// Raise an exception that names a coprocessor (Cause.CE)
    pub fn raise_coprocessor(&mut self, cause: ExceptionCause, coprocessor: u32) {
        let vector =
            self.cop0
                .enter_exception(cause, self.current, self.current_delay, coprocessor);

        log::debug!(
            "EXCEPTION: cause={:?}, EPC=0x{:016X}, handler=0x{:016X}, in_delay={}",
            cause,
            self.cop0.epc(),
            vector,
            self.current_delay
        );

        self.pc = self.normalize(vector);
        self.redirected = true;
        self.nullify_next = false;
    }

    /// Address error: latch BadVAddr, then raise AdEL/AdES
    pub(crate) fn address_error(&mut self, address: u64, store: bool) {
        self.cop0.set_bad_vaddr(address);
        self.raise(if store {
            ExceptionCause::AddressErrorStore
        } else {
            ExceptionCause::AddressErrorLoad
        });
    }

    /// ERET: return to EPC/ErrorEPC and drop the load-linked reservation
    pub(crate) fn exception_return(&mut self) {
        let target = self.cop0.exception_return();
        self.state.ll_bit = false;
        self.pc = self.normalize(target);
        self.redirected = true;
        self.eret = true;
    }

    /// Render the register file for a fatal-error dump
    pub fn dump_registers(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "CPU Registers:");
        let _ = writeln!(out, "PC: 0x{:016X}  delay slot: {}", self.pc, self.in_delay_slot());
        let _ = writeln!(
            out,
            "HI: 0x{:016X}  LO: 0x{:016X}",
            self.state.hi(),
            self.state.lo()
        );

        // General-purpose registers in rows of 4
        for i in 0..32 {
            if i % 4 == 0 && i > 0 {
                let _ = writeln!(out);
            }
            let _ = write!(out, "r{:2}: 0x{:016X}  ", i, self.state.gpr64(i));
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "COP0 Registers:");
        let _ = writeln!(out, "SR:       0x{:08X}", self.cop0.status().bits());
        let _ = writeln!(out, "CAUSE:    0x{:08X}", self.cop0.cause());
        let _ = writeln!(out, "EPC:      0x{:016X}", self.cop0.epc());
        let _ = writeln!(out, "BADVADDR: 0x{:016X}", self.cop0.read(Cop0::BAD_VADDR));
        let _ = writeln!(out, "COUNT:    0x{:08X}", self.cop0.read(Cop0::COUNT));
        let _ = write!(out, "FCR31:    0x{:08X}", self.state.fcr31.0);

        if let Some(last) = &self.last_instruction {
            let _ = write!(
                out,
                "\nLast: 0x{:016X}  {}",
                last.address,
                Disassembler::disassemble(last)
            );
        }
        out
    }
}
