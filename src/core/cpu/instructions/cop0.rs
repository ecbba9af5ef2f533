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

//! Coprocessor 0 (System Control) instructions
//!
//! MFC0/MTC0 and their doubleword forms go through the generic register
//! transfer in `transfer.rs`.

use super::super::decode::DecodedInstruction;
use super::super::opcode::Op;
use super::super::Interpreter;
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    /// TLBR / TLBWI / TLBWR / TLBP
    ///
    /// The TLB is register storage here; address translation belongs to
    /// the memory collaborator.
    ///
    /// # Example
    ///
    /// ```text
    /// MTC0 $t0, $0   # Index
    /// TLBWI          # Write EntryHi/EntryLo0/EntryLo1/PageMask at Index
    /// ```
    pub(crate) fn op_tlb(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        match decoded.op() {
            Op::Tlbr => self.cop0.tlb_read(),
            Op::Tlbwi => self.cop0.tlb_write(false),
            Op::Tlbwr => self.cop0.tlb_write(true),
            Op::Tlbp => self.cop0.tlb_lookup(),
            _ => {}
        }
        Ok(())
    }

    /// ERET: Return From Exception
    ///
    /// Jumps to ErrorEPC (clearing ERL) or EPC (clearing EXL). ERET has no
    /// delay slot and clears the LL bit.
    pub(crate) fn op_eret(&mut self, _decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        self.exception_return();
        Ok(())
    }
}
