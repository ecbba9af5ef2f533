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

//! CPU instruction implementations
//!
//! Handlers are organized by instruction type. A handler serves every
//! opcode of one shape and reads the differences (operand width, trap on
//! overflow, comparison kind) from the catalog entry, so ADD, ADDU, DADD and
//! ADDI all share one body.

use super::cop0::ExceptionCause;
use super::decode::DecodedInstruction;
use super::opcode::{Encoding, ExecutionFlags, Family, Op, Opcode, OPCODES};
use super::{Handler, Interpreter};
use crate::core::error::{EmulatorError, Result};
use crate::core::memory::DataMemory;
use std::sync::OnceLock;

// Instruction modules organized by type
mod arithmetic;
mod branch;
mod cop0;
mod exception;
mod fpu;
mod jump;
mod load;
mod logical;
mod multiply;
mod shift;
mod store;
mod transfer;

pub(crate) use load::{read_aligned, Access};
pub(crate) use store::write_aligned;

/// Dispatch table indexed by opcode id, built once
pub(super) fn dispatch_table() -> &'static [Option<Handler>] {
    static TABLE: OnceLock<Vec<Option<Handler>>> = OnceLock::new();
    TABLE.get_or_init(|| OPCODES.iter().map(|opcode| handler_for(opcode.op)).collect())
}

/// Handler for one opcode, or `None` when it cannot execute
fn handler_for(op: Op) -> Option<Handler> {
    use Op::*;

    let handler: Handler = match op {
        Null => return None,

        J | Jal => Interpreter::op_jump,
        Jr | Jalr => Interpreter::op_jump_register,
        Beq | Bne | Blez | Bgtz | Beql | Bnel | Blezl | Bgtzl | Bltz | Bgez | Bltzl | Bgezl
        | Bltzal | Bgezal | Bltzall | Bgezall => Interpreter::op_branch,
        Bc1f | Bc1t | Bc1fl | Bc1tl => Interpreter::op_branch_fpu,

        Addi | Addiu | Daddi | Daddiu | Add | Addu | Sub | Subu | Dadd | Daddu | Dsub | Dsubu => {
            Interpreter::op_add_sub
        }
        Slti | Sltiu | Slt | Sltu => Interpreter::op_set_less,
        Andi | Ori | Xori | And | Or | Xor | Nor => Interpreter::op_logic,
        Lui => Interpreter::op_lui,

        Sll | Srl | Sra | Sllv | Srlv | Srav | Dsllv | Dsrlv | Dsrav | Dsll | Dsrl | Dsra
        | Dsll32 | Dsrl32 | Dsra32 => Interpreter::op_shift,

        Mult | Multu | Dmult | Dmultu => Interpreter::op_multiply,
        Div | Divu | Ddiv | Ddivu => Interpreter::op_divide,

        Mfhi | Mthi | Mflo | Mtlo | Mfc0 | Dmfc0 | Mtc0 | Dmtc0 | Mfc1 | Dmfc1 | Cfc1 | Mtc1
        | Dmtc1 | Ctc1 => Interpreter::op_transfer,

        Lb | Lh | Lw | Lbu | Lhu | Lwu | Ld | Ll | Lld => Interpreter::op_load,
        Lwl | Lwr | Ldl | Ldr => Interpreter::op_load_unaligned,
        Lwc1 | Ldc1 => Interpreter::op_load_fpu,
        Sb | Sh | Sw | Sd | Sc | Scd => Interpreter::op_store,
        Swl | Swr | Sdl | Sdr => Interpreter::op_store_unaligned,
        Swc1 | Sdc1 => Interpreter::op_store_fpu,

        Cache | Sync => Interpreter::op_nop,
        Syscall => Interpreter::op_syscall,
        Break => Interpreter::op_break,
        Tge | Tgeu | Tlt | Tltu | Teq | Tne | Tgei | Tgeiu | Tlti | Tltiu | Teqi | Tnei => {
            Interpreter::op_trap
        }

        Tlbr | Tlbwi | Tlbwr | Tlbp => Interpreter::op_tlb,
        Eret => Interpreter::op_eret,

        FAdd | FSub | FMul | FDiv => Interpreter::op_fpu_binary,
        FSqrt | FAbs | FMov | FNeg => Interpreter::op_fpu_unary,
        RoundL | TruncL | CeilL | FloorL | RoundW | TruncW | CeilW | FloorW => {
            Interpreter::op_fpu_round
        }
        CvtS | CvtD | CvtW | CvtL => Interpreter::op_fpu_convert,
        CF | CUn | CEq | CUeq | COlt | CUlt | COle | CUle | CSf | CNgle | CSeq | CNgl | CLt
        | CNge | CLe | CNgt => Interpreter::op_fpu_compare,
    };
    Some(handler)
}

/// Whether an opcode needs COP1 to be enabled
fn uses_cop1(opcode: &Opcode) -> bool {
    matches!(
        opcode.encoding,
        Encoding::Cop1(_) | Encoding::Bc1(_) | Encoding::Fpu(_)
    ) || matches!(opcode.family, Family::LoadFpu | Family::StoreFpu)
}

impl Interpreter {
    /// Execute a decoded instruction through the dispatch table
    ///
    /// Architectural faults (overflow, reserved instruction, coprocessor
    /// unusable...) are raised as exceptions and return `Ok`. Only an opcode
    /// without a handler is an error.
    ///
    /// # Arguments
    ///
    /// * `decoded` - Instruction to execute
    /// * `mem` - Data memory for loads and stores
    pub fn execute(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let opcode = decoded.opcode;
        self.set_current(decoded);

        if opcode.has(ExecutionFlags::RESERVED32) && !self.mode64() {
            self.raise(ExceptionCause::ReservedInstruction);
            return Ok(());
        }

        if uses_cop1(opcode) && !self.cop0.cop1_usable() {
            self.raise_coprocessor(ExceptionCause::CoprocessorUnusable, 1);
            return Ok(());
        }

        match self.dispatch.get(opcode.id()).copied().flatten() {
            Some(handler) => handler(self, decoded, mem),
            None => Err(EmulatorError::UnsupportedOpcode {
                address: decoded.address,
                name: opcode.name,
            }),
        }
    }

    /// CACHE / SYNC: no architectural effect here
    pub(crate) fn op_nop(&mut self, _decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        Ok(())
    }
}
