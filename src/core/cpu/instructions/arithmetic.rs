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
use super::super::opcode::ExecutionFlags;
use super::super::{ExceptionCause, Interpreter};
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    // === Arithmetic Instructions ===

    /// ADD / ADDU / SUB / SUBU / DADD / DADDU / DSUB / DSUBU and the
    /// immediate forms ADDI / ADDIU / DADDI / DADDIU
    ///
    /// The trapping forms raise Overflow on signed overflow and leave the
    /// destination unchanged; the U forms wrap.
    ///
    /// Format: add rd, rs, rt / addi rt, rs, imm
    /// Operation: rd = rs + rt (32-bit forms sign-extend the result)
    ///
    /// # Arguments
    ///
    /// * `decoded` - The decoded instruction
    ///
    /// # Returns
    ///
    /// Ok(()) on success (exception is triggered internally on overflow)
    pub(crate) fn op_add_sub(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let (b, dest) = if opcode.has(ExecutionFlags::IMMEDIATE) {
            (inst.simm(), inst.rt())
        } else {
            (self.operand(inst.rt()), inst.rd())
        };
        let a = self.operand(inst.rs());

        match alu::add_sub(opcode.arith, opcode.flags, a, b) {
            Some(result) => {
                self.state
                    .write_result(dest, result, opcode.flags.is_64bit());
            }
            None => self.raise(ExceptionCause::Overflow),
        }
        Ok(())
    }

    /// LUI: Load Upper Immediate
    ///
    /// Format: lui rt, imm
    /// Operation: rt = sign_extend(imm << 16)
    pub(crate) fn op_lui(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        self.state.writeback32(inst.rt(), (inst.imm() as u32) << 16);
        Ok(())
    }
}
