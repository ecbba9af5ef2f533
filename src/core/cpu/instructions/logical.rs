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
use super::super::Interpreter;
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    // === Logical Instructions ===

    /// AND / OR / XOR / NOR and ANDI / ORI / XORI
    ///
    /// The immediate forms zero-extend their 16-bit operand.
    ///
    /// Format: and rd, rs, rt / andi rt, rs, imm
    /// Operation: rd = rs & rt
    pub(crate) fn op_logic(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let (b, dest) = if opcode.has(ExecutionFlags::IMMEDIATE) {
            (inst.zimm(), inst.rt())
        } else {
            (self.operand(inst.rt()), inst.rd())
        };
        let result = alu::logic(opcode.arith, self.operand(inst.rs()), b);
        self.set_result(dest, result);
        Ok(())
    }

    /// SLT / SLTU / SLTI / SLTIU: Set on Less Than
    ///
    /// SLTIU sign-extends its immediate and then compares unsigned.
    ///
    /// Format: slt rd, rs, rt
    /// Operation: rd = (rs < rt) ? 1 : 0
    pub(crate) fn op_set_less(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let (b, dest) = if opcode.has(ExecutionFlags::IMMEDIATE) {
            (inst.simm(), inst.rt())
        } else {
            (self.operand(inst.rt()), inst.rd())
        };
        let result = alu::set_less(
            self.operand(inst.rs()),
            b,
            opcode.has(ExecutionFlags::UNSIGNED),
        );
        self.set_result(dest, result);
        Ok(())
    }
}
