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

//! Flat RAM collaborator
//!
//! A single contiguous buffer at physical address zero. Virtual addresses
//! are translated the same way for every segment: KSEG0 and KSEG1
//! (0x8000_0000-0xBFFF_FFFF, sign-extended or not) mirror physical memory,
//! and any other address is used as-is after the same 29-bit mask.

use super::MemoryBus;
use crate::core::error::{EmulatorError, Result};
use std::fs::File;
use std::io::Read;

/// Physical address mask for the unmapped kernel segments
const PHYSICAL_MASK: u64 = 0x1FFF_FFFF;

pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    /// Create `size` bytes of zeroed memory
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn translate(address: u64) -> u64 {
        address & PHYSICAL_MASK
    }

    fn range(&self, address: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = Self::translate(address) as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }

    /// Copy raw bytes to a physical address
    pub fn load(&mut self, physical: u64, bytes: &[u8]) -> Result<()> {
        let range = self
            .range(physical, bytes.len())
            .ok_or(EmulatorError::MemoryAccess {
                address: physical,
                size: bytes.len(),
            })?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Load an image file to a physical address
    ///
    /// # Returns
    /// Number of bytes loaded
    pub fn load_file(&mut self, physical: u64, path: &str) -> Result<usize> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        self.load(physical, &bytes)?;
        log::info!(
            "Loaded {} bytes from {} at 0x{:08X}",
            bytes.len(),
            path,
            physical
        );
        Ok(bytes.len())
    }

    /// Store big-endian words starting at a physical address
    pub fn load_words(&mut self, physical: u64, words: &[u32]) -> Result<()> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        self.load(physical, &bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl MemoryBus for FlatMemory {
    fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.range(address, buf.len()).ok_or(EmulatorError::MemoryAccess {
            address,
            size: buf.len(),
        })?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, address: u64, data: &[u8]) -> Result<()> {
        let range = self.range(address, data.len()).ok_or(EmulatorError::MemoryAccess {
            address,
            size: data.len(),
        })?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn is_mapped(&self, address: u64, len: usize) -> bool {
        self.range(address, len).is_some()
    }
}
