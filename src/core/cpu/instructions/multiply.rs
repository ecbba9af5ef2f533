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
use super::super::Interpreter;
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    // === Multiply/Divide Instructions ===

    /// MULT / MULTU / DMULT / DMULTU
    ///
    /// The doubleword forms produce a full 128-bit product split across
    /// HI (upper) and LO (lower).
    ///
    /// Format: mult rs, rt
    /// Operation: (HI, LO) = rs * rt
    ///
    /// # Arguments
    ///
    /// * `decoded` - The decoded instruction
    ///
    /// # Returns
    ///
    /// Ok(()) on success
    pub(crate) fn op_multiply(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        self.mul_div(decoded);
        Ok(())
    }

    /// DIV / DIVU / DDIV / DDIVU
    ///
    /// Never traps. Division by zero leaves HI = dividend and LO = -1
    /// (LO = 1 for a negative signed dividend); the most negative value
    /// divided by -1 gives LO = dividend, HI = 0.
    ///
    /// Format: div rs, rt
    /// Operation: LO = rs / rt, HI = rs % rt
    pub(crate) fn op_divide(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        self.mul_div(decoded);
        Ok(())
    }

    fn mul_div(&mut self, decoded: &DecodedInstruction) {
        let inst = decoded.inst;
        let opcode = decoded.opcode;
        let (hi, lo) = alu::mul_div(
            opcode.arith,
            opcode.flags,
            self.operand(inst.rs()),
            self.operand(inst.rt()),
        );
        self.state.write_hilo(hi, lo, opcode.flags.is_64bit());
    }
}
