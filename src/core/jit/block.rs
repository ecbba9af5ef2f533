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

//! Basic-block construction
//!
//! A block is a straight run of decoded instructions starting at one
//! address. It closes after a branch and its delay slot, after ERET, after
//! the last instruction of the mapped stream, after an undecodable word, or
//! when it reaches the maximum length. A branch therefore only ever appears
//! as the second-to-last instruction, or as the last one when the stream
//! ends before its delay slot.

use crate::core::cpu::{DecodedInstruction, Decoder};
use crate::core::memory::MemoryBus;

/// Default upper bound on straight-line block length
pub const DEFAULT_MAX_INSTRUCTIONS: usize = 256;

/// Decoded instructions of one block, keyed by its start address
#[derive(Debug, Clone)]
pub struct RuntimeBasicBlock {
    pub start: u64,
    pub instructions: Vec<DecodedInstruction>,
}

impl RuntimeBasicBlock {
    pub fn new(start: u64) -> Self {
        Self {
            start,
            instructions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Address just past the last instruction
    pub fn end(&self) -> u64 {
        self.start.wrapping_add(4 * self.instructions.len() as u64)
    }

    pub fn last(&self) -> Option<&DecodedInstruction> {
        self.instructions.last()
    }

    /// Index of the branch that closes the block, if any
    pub fn branch_index(&self) -> Option<usize> {
        self.instructions.iter().position(|d| d.is_branch())
    }

    /// Whether the block ends in a branch whose delay slot is missing
    pub fn is_truncated(&self) -> bool {
        self.last().is_some_and(|d| d.is_branch())
    }

    /// Drop the last instruction (a delay slot that turned out not to exist)
    pub fn truncate_last(&mut self) -> Option<DecodedInstruction> {
        self.instructions.pop()
    }

    fn push(&mut self, decoded: DecodedInstruction) {
        self.instructions.push(decoded);
    }
}

/// Groups decoded instructions into basic blocks
#[derive(Debug, Clone, Copy)]
pub struct BlockBuilder {
    max_instructions: usize,
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INSTRUCTIONS)
    }
}

impl BlockBuilder {
    pub fn new(max_instructions: usize) -> Self {
        Self {
            max_instructions: max_instructions.max(2),
        }
    }

    /// Decode forward from `start` until a block boundary
    ///
    /// `stop_at` (the boot entry point while in boot mode) ends the block
    /// before that address, so the entry point always starts a block of
    /// its own. When the stop address is a delay slot the block ends after
    /// the branch and the caller finishes the branch itself.
    ///
    /// # Arguments
    ///
    /// * `decoder` - Decoder with the stream's byte order
    /// * `stream` - Instruction memory
    /// * `start` - Block address
    /// * `stop_at` - Address that must begin a new block
    pub fn build(
        &self,
        decoder: &Decoder,
        stream: &mut dyn MemoryBus,
        start: u64,
        stop_at: Option<u64>,
    ) -> RuntimeBasicBlock {
        let mut block = RuntimeBasicBlock::new(start);
        let mut address = start;
        let mut delay_slot = false;

        loop {
            if !block.is_empty() && stop_at == Some(address) {
                break;
            }

            let mut decoded = decoder.decode(stream, address);
            decoded.delay_slot = delay_slot;
            block.push(decoded);

            if delay_slot || decoded.invalid || decoded.last || decoded.is_eret() {
                break;
            }
            if decoded.is_branch() {
                delay_slot = true;
            } else if block.len() >= self.max_instructions {
                break;
            }
            address = decoded.next_address();
        }

        log::trace!(
            "Built block 0x{:016X}: {} instructions{}",
            start,
            block.len(),
            if block.is_truncated() { " (no delay slot)" } else { "" }
        );
        block
    }
}
