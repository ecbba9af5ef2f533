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

use super::super::alu;
use super::super::decode::DecodedInstruction;
use super::super::opcode::{ArithmeticOp, ExecutionFlags, Opcode, OperandType};
use super::super::Interpreter;
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    // === Branch Instructions ===

    /// BEQ / BNE / BLEZ / BGTZ / BLTZ / BGEZ, their likely forms and the
    /// linking REGIMM forms
    ///
    /// The branch target is PC + 4 + (offset << 2). The condition is read
    /// before the link register is written, so `bltzal $ra, ...` tests the
    /// old value.
    ///
    /// Format: beq rs, rt, offset / bltz rs, offset
    /// Operation: if (cond) PC = PC + 4 + (sign_extend(offset) << 2)
    ///
    /// # Arguments
    ///
    /// * `decoded` - The decoded instruction
    ///
    /// # Returns
    ///
    /// Ok(()) on success
    pub(crate) fn op_branch(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let target = alu::branch_target(decoded.address, inst);
        let b = if opcode.operands == OperandType::Branch {
            self.operand(inst.rt())
        } else {
            0
        };
        let taken = alu::condition(opcode.arith, self.operand(inst.rs()), b, false);

        if opcode.has(ExecutionFlags::LINK) {
            self.set_result(31, decoded.address.wrapping_add(8));
        }

        self.resolve_branch(opcode, target, taken);
        Ok(())
    }

    /// BC1F / BC1T / BC1FL / BC1TL: branch on the FPU condition bit
    ///
    /// Format: bc1t offset
    /// Operation: if (FCR31.C) PC = PC + 4 + (sign_extend(offset) << 2)
    pub(crate) fn op_branch_fpu(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let opcode = decoded.opcode;
        let target = alu::branch_target(decoded.address, decoded.inst);
        let taken = self.state.fcr31.condition() == (opcode.arith == ArithmeticOp::True);
        self.resolve_branch(opcode, target, taken);
        Ok(())
    }

    /// Latch the branch decision, or nullify the delay slot of an untaken
    /// likely branch
    fn resolve_branch(&mut self, opcode: &Opcode, target: u64, taken: bool) {
        if taken || !opcode.has(ExecutionFlags::LIKELY) {
            self.request_branch(target, taken);
        } else {
            self.request_nullify();
        }
    }
}
