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

//! Per-block register allocation
//!
//! General registers touched most often inside a block are copied into a
//! local array when the block starts and written back when it exits. The
//! remaining registers are read and written in the state file directly.
//! r0 never gets storage: it reads as zero and ignores writes.

use super::block::RuntimeBasicBlock;
use crate::core::cpu::opcode::{ExecutionFlags, OperandType};
use crate::core::cpu::DecodedInstruction;

/// Maximum number of registers a block can keep in locals
pub const MAX_LOCALS: usize = 32;

/// Where a compiled block keeps one general register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// r0
    Zero,
    /// Index into the block's local array
    Local(usize),
    /// Register index in the state file
    State(usize),
}

/// General registers named by an instruction's operand fields
///
/// # Returns
/// Bitmask with bit `n` set when register `n` is read or written
pub fn registers_used(decoded: &DecodedInstruction) -> u32 {
    let inst = decoded.inst;
    let (rs, rt, rd) = (1u32 << inst.rs(), 1u32 << inst.rt(), 1u32 << inst.rd());
    let link = if decoded.opcode.has(ExecutionFlags::LINK) {
        1 << 31
    } else {
        0
    };

    let mask = match decoded.opcode.operands {
        OperandType::Jump => link,
        OperandType::Branch => rs | rt,
        OperandType::BranchZ => rs | link,
        OperandType::ITsi | OperandType::ITis | OperandType::RSt => rs | rt,
        OperandType::ITi => rt,
        OperandType::ISi | OperandType::RS => rs,
        OperandType::RDta => rd | rt,
        OperandType::RDts | OperandType::RDst => rd | rs | rt,
        OperandType::RDs => rd | rs,
        OperandType::RD => rd,
        OperandType::TrapWithCode => rs | rt,
        OperandType::Cop0 | OperandType::Cop1 | OperandType::Cop1Ctl => rt,
        OperandType::IFtis | OperandType::Cache => rs,
        _ => 0,
    };
    mask & !1
}

/// Slot assignment for every general register of one block
#[derive(Debug, Clone)]
pub struct RegisterMap {
    slots: [Slot; 32],
    /// Register held in each local, by local index
    hot: Vec<usize>,
    /// Times each register is named in the block
    usage: [u32; 32],
}

impl RegisterMap {
    /// Give locals to the `max_hot` most used registers
    ///
    /// Only instructions accepted by `counts` contribute; instructions that
    /// run through the interpreter read the state file anyway. Ties keep
    /// the lower register number.
    pub fn allocate<F>(block: &RuntimeBasicBlock, max_hot: usize, counts: F) -> Self
    where
        F: Fn(&DecodedInstruction) -> bool,
    {
        let mut usage = [0u32; 32];
        for decoded in block.instructions.iter().filter(|d| counts(d)) {
            let mask = registers_used(decoded);
            for (reg, count) in usage.iter_mut().enumerate() {
                if mask & (1 << reg) != 0 {
                    *count += 1;
                }
            }
        }

        let mut order: Vec<usize> = (1..32).filter(|&r| usage[r] > 0).collect();
        order.sort_by(|&a, &b| usage[b].cmp(&usage[a]).then(a.cmp(&b)));
        order.truncate(max_hot.min(MAX_LOCALS));

        let mut slots: [Slot; 32] = std::array::from_fn(Slot::State);
        slots[0] = Slot::Zero;
        for (local, &reg) in order.iter().enumerate() {
            slots[reg] = Slot::Local(local);
        }

        Self {
            slots,
            hot: order,
            usage,
        }
    }

    #[inline(always)]
    pub fn slot(&self, reg: usize) -> Slot {
        self.slots[reg & 31]
    }

    /// Registers held in locals, by local index
    pub fn hot(&self) -> &[usize] {
        &self.hot
    }

    pub fn usage(&self, reg: usize) -> u32 {
        self.usage[reg & 31]
    }

    /// `r4 r5 r2`-style list of the hot registers
    pub fn describe(&self) -> String {
        self.hot
            .iter()
            .map(|r| format!("r{}", r))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
