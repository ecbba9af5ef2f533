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
    // === Shift Instructions ===

    /// SLL / SRL / SRA, the variable forms and the doubleword forms
    ///
    /// Variable 32-bit shifts use the low 5 bits of rs, 64-bit shifts the
    /// low 6. DSLL32/DSRL32/DSRA32 add 32 to the encoded amount.
    ///
    /// Format: sll rd, rt, sa / sllv rd, rt, rs
    /// Operation: rd = rt << sa
    pub(crate) fn op_shift(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let result = alu::shift(
            opcode.arith,
            opcode.flags,
            inst.sa(),
            self.operand(inst.rt()),
            self.operand(inst.rs()),
        );
        self.state
            .write_result(inst.rd(), result, opcode.flags.is_64bit());
        Ok(())
    }
}
