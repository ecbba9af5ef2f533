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

//! Closure-tree block recompiler
//!
//! Each instruction of a [`RuntimeBasicBlock`] becomes one boxed closure
//! with its operands, register slots and constant targets resolved at
//! compile time. Running a block is a walk over that closure list with the
//! hot registers held in a local array.
//!
//! Instructions without a native translation (COP0/COP1, FPU, traps,
//! SYSCALL/BREAK, ERET, TLB, LL/SC and the unaligned accesses) compile to a
//! call into the interpreter through the fallback bridge. Locals are
//! flushed before that call and reloaded after it.
//!
//! Value semantics come from [`alu`], which the interpreter handlers use
//! as well.

use super::block::RuntimeBasicBlock;
use super::bridge;
use super::cache;
use super::regmap::{RegisterMap, Slot, MAX_LOCALS};
use crate::core::cpu::alu;
use crate::core::cpu::opcode::{ArithmeticOp, ExecutionFlags, Op, OperandType};
use crate::core::cpu::state::merge_result;
use crate::core::cpu::{
    read_aligned, write_aligned, Access, DecodedInstruction, Disassembler, ExceptionCause,
    Interpreter, PendingBranch,
};
use crate::core::error::{EmulatorError, Result};
use crate::core::memory::DataMemory;
use std::fmt::Write as _;

/// One compiled instruction body
pub type OpFn = Box<dyn Fn(&mut BlockContext<'_>) -> Result<()> + Send + Sync>;

/// Execution context of a running block
pub struct BlockContext<'a> {
    pub(crate) cpu: &'a mut Interpreter,
    pub(crate) mem: &'a mut DataMemory,
    locals: [u64; MAX_LOCALS],
    hot: &'a [usize],
    mode64: bool,
    /// Branch requested by the instruction that just ran
    requested: Option<PendingBranch>,
    /// Skip the next instruction (untaken likely branch)
    nullify: bool,
    eret: bool,
}

impl<'a> BlockContext<'a> {
    fn enter(cpu: &'a mut Interpreter, mem: &'a mut DataMemory, hot: &'a [usize]) -> Self {
        let mut locals = [0u64; MAX_LOCALS];
        for (local, &reg) in hot.iter().enumerate() {
            locals[local] = cpu.state.gpr64(reg);
        }
        let mode64 = cpu.mode64();
        Self {
            cpu,
            mem,
            locals,
            hot,
            mode64,
            requested: None,
            nullify: false,
            eret: false,
        }
    }

    /// Write every local back to the state file
    fn flush(&mut self) {
        for (local, &reg) in self.hot.iter().enumerate() {
            self.cpu.state.set_gpr64(reg, self.locals[local]);
        }
    }

    /// Refresh every local from the state file
    fn reload(&mut self) {
        for (local, &reg) in self.hot.iter().enumerate() {
            self.locals[local] = self.cpu.state.gpr64(reg);
        }
    }

    /// Raw 64-bit register contents
    #[inline(always)]
    fn read(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Zero => 0,
            Slot::Local(i) => self.locals[i],
            Slot::State(r) => self.cpu.state.gpr64(r),
        }
    }

    /// Register as an operand (sign-extended low word in 32-bit mode)
    #[inline(always)]
    fn operand(&self, slot: Slot) -> u64 {
        let value = self.read(slot);
        if self.mode64 {
            value
        } else {
            value as u32 as i32 as i64 as u64
        }
    }

    #[inline(always)]
    fn value(&self, source: Source) -> u64 {
        match source {
            Source::Reg(slot) => self.operand(slot),
            Source::Imm(value) => value,
        }
    }

    /// Store a result with the same width rules as the state file
    #[inline(always)]
    fn write(&mut self, slot: Slot, value: u64, wide: bool) {
        match slot {
            Slot::Zero => {}
            Slot::Local(i) => {
                self.locals[i] = merge_result(self.mode64, self.locals[i], value, wide);
            }
            Slot::State(r) => self.cpu.state.write_result(r, value, wide),
        }
    }

    #[inline(always)]
    fn address(&self, base: Slot, inst: crate::core::cpu::BinaryInstruction) -> u64 {
        alu::effective_address(self.operand(base), inst, self.mode64)
    }

    fn branch(&mut self, target: u64, taken: bool, likely: bool) {
        if taken || !likely {
            let target = if self.mode64 {
                target
            } else {
                target & 0xFFFF_FFFF
            };
            self.requested = Some(PendingBranch { target, taken });
        } else {
            self.nullify = true;
        }
    }

    /// Run one instruction through the interpreter
    fn call_interpreter(&mut self, decoded: &DecodedInstruction) -> Result<()> {
        self.flush();
        let outcome = bridge::fallback_step(self.cpu, self.mem, decoded);
        self.reload();
        let outcome = outcome?;

        self.requested = outcome.branch;
        self.nullify |= outcome.nullify_next;
        self.eret = outcome.eret;
        Ok(())
    }
}

/// Second operand of an ALU instruction
#[derive(Debug, Clone, Copy)]
enum Source {
    Reg(Slot),
    Imm(u64),
}

/// One instruction of a compiled block
pub struct CompiledOp {
    pub decoded: DecodedInstruction,
    /// Translated to a native closure (otherwise an interpreter call)
    pub native: bool,
    /// May write data memory (native stores and every interpreter call)
    pub writes: bool,
    run: OpFn,
}

/// How a block run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExit {
    /// Where execution continues
    pub next_pc: u64,
    /// Branch whose delay slot lies outside the block
    pub pending: Option<PendingBranch>,
    /// The instruction at `next_pc` is a nullified delay slot
    pub nullify: bool,
    /// An exception, interrupt or ERET set PC
    pub redirected: bool,
    pub eret: bool,
    /// An interrupt was taken before an instruction
    pub interrupted: bool,
    /// Instructions run, nullified ones excluded
    pub executed: usize,
}

impl BlockExit {
    fn redirected(pc: u64, executed: usize, eret: bool, interrupted: bool) -> Self {
        Self {
            next_pc: pc,
            pending: None,
            nullify: false,
            redirected: true,
            eret,
            interrupted,
            executed,
        }
    }
}

/// A block ready to run
pub struct CompiledBlock {
    pub address: u64,
    /// Instruction count
    pub size: usize,
    /// Target of an unconditional jump closing the block
    pub jump: Option<u64>,
    pub compile_log: String,
    block: RuntimeBasicBlock,
    registers: RegisterMap,
    ops: Vec<CompiledOp>,
}

impl std::fmt::Debug for CompiledBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledBlock")
            .field("address", &format_args!("0x{:016X}", self.address))
            .field("size", &self.size)
            .field("jump", &self.jump)
            .field("hot", &self.registers.hot())
            .finish()
    }
}

impl CompiledBlock {
    /// The basic block this was compiled from
    pub fn source(&self) -> &RuntimeBasicBlock {
        &self.block
    }

    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    pub fn ops(&self) -> &[CompiledOp] {
        &self.ops
    }

    /// Address just past the last instruction
    pub fn end(&self) -> u64 {
        self.block.end()
    }

    pub fn native_count(&self) -> usize {
        self.ops.iter().filter(|op| op.native).count()
    }

    pub fn fallback_count(&self) -> usize {
        self.size - self.native_count()
    }

    /// Whether a pending write range covers any instruction of this block
    fn overwritten(&self, mem: &DataMemory) -> bool {
        let len = self.size as u64 * 4;
        mem.dirty_ranges()
            .iter()
            .any(|&(start, size)| cache::overlaps(start, size as u64, self.address, len))
    }

    /// Run the block once
    ///
    /// An interrupt is checked before every instruction. The delay slot of
    /// the closing branch runs inside the block; the branch decision is
    /// applied afterwards and reported through [`BlockExit::next_pc`].
    /// A write over the block's own instructions ends the run right after
    /// the instruction that made it.
    ///
    /// # Errors
    ///
    /// Any host error raised by an instruction, wrapped with the block
    /// address, the instruction address and the compile log
    pub fn execute(&self, cpu: &mut Interpreter, mem: &mut DataMemory) -> Result<BlockExit> {
        let mut ctx = BlockContext::enter(cpu, mem, self.registers.hot());
        let mut delay: Option<PendingBranch> = None;
        let mut executed = 0;

        for op in &self.ops {
            let decoded = &op.decoded;
            if std::mem::take(&mut ctx.nullify) {
                continue;
            }

            if ctx.cpu.poll_interrupts() {
                ctx.flush();
                ctx.cpu
                    .take_interrupt_at(decoded.address, decoded.delay_slot);
                return Ok(BlockExit::redirected(ctx.cpu.pc(), executed, false, true));
            }

            if op.native {
                ctx.cpu.set_current(decoded);
                ctx.cpu.retire();
            }
            if let Err(err) = (op.run)(&mut ctx) {
                ctx.flush();
                return Err(err.in_block(self.address, decoded.address, &self.compile_log));
            }
            executed += 1;

            if ctx.cpu.was_redirected() {
                ctx.flush();
                let eret = ctx.eret;
                return Ok(BlockExit::redirected(ctx.cpu.pc(), executed, eret, false));
            }

            let requested = ctx.requested.take();
            if let Some(branch) = delay.take() {
                // This was the delay slot
                let next_pc = if branch.taken {
                    branch.target
                } else {
                    decoded.next_address()
                };
                ctx.flush();
                return Ok(BlockExit {
                    next_pc,
                    pending: requested,
                    nullify: ctx.nullify,
                    redirected: false,
                    eret: false,
                    interrupted: false,
                    executed,
                });
            }
            if op.writes && self.overwritten(ctx.mem) {
                // The rest of the block is stale; the next step recompiles it
                ctx.flush();
                log::debug!(
                    "Block 0x{:016X} wrote over itself at 0x{:016X}",
                    self.address,
                    decoded.address
                );
                return Ok(BlockExit {
                    next_pc: decoded.next_address(),
                    pending: requested,
                    nullify: ctx.nullify,
                    redirected: false,
                    eret: false,
                    interrupted: false,
                    executed,
                });
            }
            delay = requested;
        }

        ctx.flush();
        let next_pc = self
            .ops
            .last()
            .map_or(self.address, |op| op.decoded.next_address());
        Ok(BlockExit {
            next_pc,
            pending: delay,
            nullify: ctx.nullify,
            redirected: false,
            eret: false,
            interrupted: false,
            executed,
        })
    }
}

/// Target of the unconditional jump at the end of a block, if known
fn unconditional_target(decoded: &DecodedInstruction) -> Option<u64> {
    let opcode = decoded.opcode;
    let inst = decoded.inst;
    match opcode.operands {
        OperandType::Jump => alu::static_target(decoded),
        OperandType::Branch if opcode.arith == ArithmeticOp::Equal && inst.rs() == inst.rt() => {
            alu::static_target(decoded)
        }
        _ => None,
    }
}

/// Block compiler
#[derive(Debug, Clone, Copy)]
pub struct Recompiler {
    mode64: bool,
    hot_registers: usize,
    native: bool,
}

impl Recompiler {
    /// # Arguments
    ///
    /// * `mode64` - Operating mode the compiled code assumes
    /// * `hot_registers` - Maximum registers kept in locals per block
    pub fn new(mode64: bool, hot_registers: usize) -> Self {
        Self {
            mode64,
            hot_registers: hot_registers.min(MAX_LOCALS),
            native: true,
        }
    }

    /// Compile every instruction as an interpreter call
    pub fn fallback_only(mut self) -> Self {
        self.native = false;
        self
    }

    pub fn mode64(&self) -> bool {
        self.mode64
    }

    pub fn set_mode64(&mut self, mode64: bool) {
        self.mode64 = mode64;
    }

    /// Whether an instruction gets a native translation
    pub fn translates(&self, decoded: &DecodedInstruction) -> bool {
        use Op::*;

        if !self.native || decoded.invalid {
            return false;
        }
        if !self.mode64 && decoded.opcode.has(ExecutionFlags::RESERVED32) {
            return false;
        }
        matches!(
            decoded.op(),
            Addi | Addiu | Daddi | Daddiu | Add | Addu | Sub | Subu | Dadd | Daddu | Dsub | Dsubu
                | Andi | Ori | Xori | And | Or | Xor | Nor
                | Slti | Sltiu | Slt | Sltu
                | Lui
                | Sll | Srl | Sra | Sllv | Srlv | Srav | Dsllv | Dsrlv | Dsrav
                | Dsll | Dsrl | Dsra | Dsll32 | Dsrl32 | Dsra32
                | Mult | Multu | Div | Divu | Dmult | Dmultu | Ddiv | Ddivu
                | Mfhi | Mthi | Mflo | Mtlo
                | Beq | Bne | Blez | Bgtz | Beql | Bnel | Blezl | Bgtzl
                | Bltz | Bgez | Bltzl | Bgezl | Bltzal | Bgezal | Bltzall | Bgezall
                | J | Jal | Jr | Jalr
                | Lb | Lh | Lw | Lbu | Lhu | Lwu | Ld
                | Sb | Sh | Sw | Sd
                | Cache | Sync
        )
    }

    /// Compile a basic block
    ///
    /// # Errors
    ///
    /// `CompiledBlock` for an empty block, which has no routine to run
    pub fn compile(&self, block: &RuntimeBasicBlock) -> Result<CompiledBlock> {
        if block.is_empty() {
            return Err(EmulatorError::CompiledBlock {
                block: block.start,
                address: block.start,
                log: "empty block".to_string(),
            });
        }

        let registers = RegisterMap::allocate(block, self.hot_registers, |d| self.translates(d));
        let jump = block.branch_index().and_then(|i| unconditional_target(&block.instructions[i]));

        let mut compile_log = String::new();
        let _ = writeln!(
            compile_log,
            "block 0x{:016X}: {} instructions, locals [{}]",
            block.start,
            block.len(),
            registers.describe()
        );

        let mut ops = Vec::with_capacity(block.len());
        for decoded in &block.instructions {
            let native = if self.translates(decoded) {
                self.compile_native(decoded, &registers)
            } else {
                None
            };

            let _ = writeln!(
                compile_log,
                "  0x{:08X}  {:<40} {}{}",
                decoded.address as u32,
                Disassembler::disassemble(decoded),
                if native.is_some() { "native" } else { "interpreter" },
                if decoded.delay_slot { " (delay slot)" } else { "" }
            );

            ops.push(match native {
                Some(run) => CompiledOp {
                    decoded: *decoded,
                    native: true,
                    writes: matches!(decoded.op(), Op::Sb | Op::Sh | Op::Sw | Op::Sd),
                    run,
                },
                None => {
                    let call = *decoded;
                    CompiledOp {
                        decoded: *decoded,
                        native: false,
                        writes: true,
                        run: Box::new(move |ctx| ctx.call_interpreter(&call)),
                    }
                }
            });
        }
        if let Some(target) = jump {
            let _ = writeln!(compile_log, "  jump -> 0x{:016X}", target);
        }

        let compiled = CompiledBlock {
            address: block.start,
            size: block.len(),
            jump,
            compile_log,
            block: block.clone(),
            registers,
            ops,
        };
        log::debug!(
            "Compiled block 0x{:016X}: {} instructions ({} native, {} via interpreter)",
            compiled.address,
            compiled.size,
            compiled.native_count(),
            compiled.fallback_count()
        );
        Ok(compiled)
    }

    /// Native closure for one instruction
    fn compile_native(&self, decoded: &DecodedInstruction, map: &RegisterMap) -> Option<OpFn> {
        use Op::*;

        let inst = decoded.inst;
        let opcode = decoded.opcode;
        let flags = opcode.flags;
        let arith = opcode.arith;
        let wide = flags.is_64bit();
        let immediate = opcode.has(ExecutionFlags::IMMEDIATE);
        let address = decoded.address;

        let rs = map.slot(inst.rs());
        let rt = map.slot(inst.rt());
        let rd = map.slot(inst.rd());

        let run: OpFn = match decoded.op() {
            // === Arithmetic ===
            Addi | Addiu | Daddi | Daddiu | Add | Addu | Sub | Subu | Dadd | Daddu | Dsub | Dsubu => {
                let (b, dest) = if immediate {
                    (Source::Imm(inst.simm()), rt)
                } else {
                    (Source::Reg(rt), rd)
                };
                Box::new(move |ctx| {
                    match alu::add_sub(arith, flags, ctx.operand(rs), ctx.value(b)) {
                        Some(result) => ctx.write(dest, result, wide),
                        None => ctx.cpu.raise(ExceptionCause::Overflow),
                    }
                    Ok(())
                })
            }

            // === Logic and comparison ===
            Andi | Ori | Xori | And | Or | Xor | Nor => {
                let (b, dest) = if immediate {
                    (Source::Imm(inst.zimm()), rt)
                } else {
                    (Source::Reg(rt), rd)
                };
                Box::new(move |ctx| {
                    let result = alu::logic(arith, ctx.operand(rs), ctx.value(b));
                    ctx.write(dest, result, true);
                    Ok(())
                })
            }
            Slti | Sltiu | Slt | Sltu => {
                let (b, dest) = if immediate {
                    (Source::Imm(inst.simm()), rt)
                } else {
                    (Source::Reg(rt), rd)
                };
                let unsigned = opcode.has(ExecutionFlags::UNSIGNED);
                Box::new(move |ctx| {
                    let result = alu::set_less(ctx.operand(rs), ctx.value(b), unsigned);
                    ctx.write(dest, result, true);
                    Ok(())
                })
            }
            Lui => {
                let value = ((inst.imm() as u32) << 16) as u64;
                Box::new(move |ctx| {
                    ctx.write(rt, value, false);
                    Ok(())
                })
            }

            // === Shifts ===
            Sll | Srl | Sra | Sllv | Srlv | Srav | Dsllv | Dsrlv | Dsrav | Dsll | Dsrl | Dsra
            | Dsll32 | Dsrl32 | Dsra32 => {
                let sa = inst.sa();
                Box::new(move |ctx| {
                    let result = alu::shift(arith, flags, sa, ctx.operand(rt), ctx.operand(rs));
                    ctx.write(rd, result, wide);
                    Ok(())
                })
            }

            // === Multiply / divide ===
            Mult | Multu | Div | Divu | Dmult | Dmultu | Ddiv | Ddivu => Box::new(move |ctx| {
                let (hi, lo) = alu::mul_div(arith, flags, ctx.operand(rs), ctx.operand(rt));
                ctx.cpu.state.write_hilo(hi, lo, wide);
                Ok(())
            }),
            Mfhi => Box::new(move |ctx| {
                let value = ctx.cpu.state.hi();
                ctx.write(rd, value, wide);
                Ok(())
            }),
            Mflo => Box::new(move |ctx| {
                let value = ctx.cpu.state.lo();
                ctx.write(rd, value, wide);
                Ok(())
            }),
            Mthi => Box::new(move |ctx| {
                let value = ctx.read(rs);
                ctx.cpu.state.set_hi(value);
                Ok(())
            }),
            Mtlo => Box::new(move |ctx| {
                let value = ctx.read(rs);
                ctx.cpu.state.set_lo(value);
                Ok(())
            }),

            // === Branches and jumps ===
            Beq | Bne | Blez | Bgtz | Beql | Bnel | Blezl | Bgtzl | Bltz | Bgez | Bltzl | Bgezl
            | Bltzal | Bgezal | Bltzall | Bgezall => {
                let target = alu::branch_target(address, inst);
                let b = (opcode.operands == OperandType::Branch).then_some(rt);
                let link = opcode
                    .has(ExecutionFlags::LINK)
                    .then(|| (map.slot(31), address.wrapping_add(8)));
                let likely = opcode.has(ExecutionFlags::LIKELY);
                Box::new(move |ctx| {
                    let other = b.map_or(0, |slot| ctx.operand(slot));
                    let taken = alu::condition(arith, ctx.operand(rs), other, false);
                    if let Some((slot, ret)) = link {
                        ctx.write(slot, ret, true);
                    }
                    ctx.branch(target, taken, likely);
                    Ok(())
                })
            }
            J | Jal => {
                let target = alu::jump_target(address, inst);
                let link = opcode
                    .has(ExecutionFlags::LINK)
                    .then(|| (map.slot(31), address.wrapping_add(8)));
                Box::new(move |ctx| {
                    if let Some((slot, ret)) = link {
                        ctx.write(slot, ret, true);
                    }
                    ctx.branch(target, true, false);
                    Ok(())
                })
            }
            Jr | Jalr => {
                let link = opcode.has(ExecutionFlags::LINK);
                let ret = address.wrapping_add(8);
                Box::new(move |ctx| {
                    let target = ctx.operand(rs);
                    if link {
                        ctx.write(rd, ret, true);
                    }
                    ctx.branch(target, true, false);
                    Ok(())
                })
            }

            // === Loads and stores ===
            Lb | Lh | Lw | Lbu | Lhu | Lwu | Ld => Box::new(move |ctx| {
                let address = ctx.address(rs, inst);
                match read_aligned(flags, ctx.mem, address) {
                    Access::Done(value) => ctx.write(rt, value, true),
                    Access::Misaligned => ctx.cpu.address_error(address, false),
                    Access::BusError => ctx.cpu.raise(ExceptionCause::BusErrorData),
                }
                Ok(())
            }),
            Sb | Sh | Sw | Sd => Box::new(move |ctx| {
                let address = ctx.address(rs, inst);
                let value = ctx.read(rt);
                match write_aligned(flags, ctx.mem, address, value) {
                    Access::Done(()) => {}
                    Access::Misaligned => ctx.cpu.address_error(address, true),
                    Access::BusError => ctx.cpu.raise(ExceptionCause::BusErrorData),
                }
                Ok(())
            }),

            Cache | Sync => Box::new(|_| Ok(())),

            _ => return None,
        };
        Some(run)
    }
}
