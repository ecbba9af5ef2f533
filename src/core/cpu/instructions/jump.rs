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
    // === Jump Instructions ===

    /// J / JAL: Jump (and Link)
    ///
    /// The target stays within the current 256MB region.
    ///
    /// Format: jal target
    /// Operation: r31 = PC + 8; PC = (PC & 0xF0000000) | (target << 2)
    pub(crate) fn op_jump(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let target = alu::jump_target(decoded.address, decoded.inst);

        if decoded.opcode.has(ExecutionFlags::LINK) {
            self.set_result(31, decoded.address.wrapping_add(8));
        }

        self.request_branch(target, true);
        Ok(())
    }

    /// JR / JALR: Jump Register (and Link)
    ///
    /// JALR writes the return address to rd. The target is read first so
    /// `jalr $t0, $t0` jumps to the old value.
    ///
    /// Format: jalr rd, rs
    /// Operation: rd = PC + 8; PC = rs
    pub(crate) fn op_jump_register(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let target = self.operand(inst.rs());

        if decoded.opcode.has(ExecutionFlags::LINK) {
            self.set_result(inst.rd(), decoded.address.wrapping_add(8));
        }

        self.request_branch(target, true);
        Ok(())
    }
}
