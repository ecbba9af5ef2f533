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

//! Exception-triggering instructions

use super::super::alu;
use super::super::decode::DecodedInstruction;
use super::super::opcode::ExecutionFlags;
use super::super::{ExceptionCause, Interpreter};
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    /// SYSCALL: System Call
    ///
    /// Triggers a system call exception, transferring control to the
    /// exception handler.
    ///
    /// # Exception
    ///
    /// Always triggers ExceptionCause::Syscall
    ///
    /// # Example
    ///
    /// ```text
    /// SYSCALL  # Trigger system call exception
    /// ```
    pub(crate) fn op_syscall(&mut self, _decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        self.raise(ExceptionCause::Syscall);
        Ok(())
    }

    /// BREAK: Breakpoint
    ///
    /// # Exception
    ///
    /// Always triggers ExceptionCause::Breakpoint
    pub(crate) fn op_break(&mut self, _decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        self.raise(ExceptionCause::Breakpoint);
        Ok(())
    }

    /// TGE / TGEU / TLT / TLTU / TEQ / TNE and the immediate forms
    ///
    /// The immediate is always sign-extended, even for the unsigned
    /// comparisons.
    ///
    /// # Example
    ///
    /// ```text
    /// TEQ $a0, $zero  # Trap if $a0 == 0
    /// ```
    pub(crate) fn op_trap(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let b = if opcode.has(ExecutionFlags::IMMEDIATE) {
            inst.simm()
        } else {
            self.operand(inst.rt())
        };
        let hit = alu::condition(
            opcode.arith,
            self.operand(inst.rs()),
            b,
            opcode.has(ExecutionFlags::UNSIGNED),
        );

        if hit {
            self.raise(ExceptionCause::Trap);
        }
        Ok(())
    }
}
