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

//! Compiled block cache

use super::compiler::CompiledBlock;
use crate::core::error::{EmulatorError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Segment bits stripped before comparing addresses, so KSEG0 and KSEG1
/// views of the same code overlap
const PHYSICAL_MASK: u64 = 0x1FFF_FFFF;

/// Whether a write of `len` bytes at `start` touches `[block, block + block_len)`
pub(crate) fn overlaps(start: u64, len: u64, block: u64, block_len: u64) -> bool {
    let lo = start & PHYSICAL_MASK;
    let hi = lo + len.max(1);
    let block_lo = block & PHYSICAL_MASK;
    let block_hi = block_lo + block_len;
    block_lo < hi && lo < block_hi
}

/// Address-keyed store of compiled blocks
///
/// The key is the address of the block's first instruction. A block is
/// never replaced in place: inserting a second block at the same address
/// is an error, the old one has to be invalidated first.
#[derive(Debug, Default)]
pub struct BlockCache {
    name: &'static str,
    blocks: HashMap<u64, Arc<CompiledBlock>>,
}

impl BlockCache {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            blocks: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, address: u64) -> Option<Arc<CompiledBlock>> {
        self.blocks.get(&address).cloned()
    }

    pub fn contains(&self, address: u64) -> bool {
        self.blocks.contains_key(&address)
    }

    /// Add a block under its start address
    ///
    /// # Errors
    ///
    /// `DuplicateBlock` if a block with the same start address is cached
    pub fn insert(&mut self, block: CompiledBlock) -> Result<Arc<CompiledBlock>> {
        let address = block.address;
        if self.blocks.contains_key(&address) {
            return Err(EmulatorError::DuplicateBlock { address });
        }
        let block = Arc::new(block);
        self.blocks.insert(address, Arc::clone(&block));
        log::trace!("{} cache: added 0x{:016X}", self.name, address);
        Ok(block)
    }

    /// Drop every block overlapping `[start, start + len)`
    ///
    /// # Returns
    ///
    /// Number of blocks removed
    pub fn invalidate_range(&mut self, start: u64, len: u64) -> usize {
        let before = self.blocks.len();

        self.blocks
            .retain(|_, block| !overlaps(start, len, block.address, block.size as u64 * 4));

        let removed = before - self.blocks.len();
        if removed > 0 {
            log::debug!(
                "{} cache: write to 0x{:016X}+{} invalidated {} block(s)",
                self.name,
                start,
                len,
                removed
            );
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.blocks.is_empty() {
            log::debug!("{} cache: cleared {} block(s)", self.name, self.blocks.len());
        }
        self.blocks.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
