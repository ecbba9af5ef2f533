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

//! Memory access contract
//!
//! The CPU core never decodes addresses itself. Instruction fetch and data
//! access both go through a [`MemoryBus`] supplied by the host, which resolves
//! the (virtual) address to whatever backs it.
//!
//! [`DataMemory`] wraps a bus with a small scratch register: a load fills the
//! scratch from memory, then the executing instruction reads it through the
//! sized getters; a store fills the scratch through the setters and then
//! writes it out. Values in the scratch are big-endian, matching the VR4300.
//!
//! # Example
//!
//! ```
//! use r4300::core::memory::{ByteOrder, DataMemory, FlatMemory};
//!
//! let mut mem = DataMemory::new(Box::new(FlatMemory::new(0x1000)), ByteOrder::Big);
//!
//! mem.set_data32(0x1234_5678);
//! mem.write_data(0x8000_0010, 4).unwrap();
//!
//! mem.read_data(0xA000_0010, 2).unwrap();
//! assert_eq!(mem.data16(), 0x1234);
//! ```

mod flat;

pub use flat::FlatMemory;

use crate::core::error::Result;
use serde::{Deserialize, Serialize};

/// Byte-addressable memory collaborator
pub trait MemoryBus {
    /// Fill `buf` with the bytes starting at `address`
    fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<()>;

    /// Store `data` starting at `address`
    fn write(&mut self, address: u64, data: &[u8]) -> Result<()>;

    /// Whether `len` bytes starting at `address` are backed by memory
    fn is_mapped(&self, address: u64, len: usize) -> bool;
}

/// Byte order of the backing image
///
/// Images are big-endian on real hardware. Dumps in the other two layouts
/// are handled by swizzling each byte address instead of converting the
/// whole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    /// Every 16-bit half swapped (`.v64` style)
    Swapped16,
    /// Every 32-bit word reversed (`.n64` style)
    Little,
}

impl ByteOrder {
    /// Map a big-endian byte address to its location in the backing image
    #[inline(always)]
    pub fn swizzle(self, address: u64) -> u64 {
        match self {
            ByteOrder::Big => address,
            ByteOrder::Swapped16 => address ^ 1,
            ByteOrder::Little => address ^ 3,
        }
    }

    /// Read bytes in big-endian order
    pub fn read_bytes(self, bus: &mut dyn MemoryBus, address: u64, buf: &mut [u8]) -> Result<()> {
        if self == ByteOrder::Big {
            return bus.read(address, buf);
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            let mut one = [0u8; 1];
            bus.read(self.swizzle(address.wrapping_add(i as u64)), &mut one)?;
            *byte = one[0];
        }
        Ok(())
    }

    /// Write bytes given in big-endian order
    pub fn write_bytes(self, bus: &mut dyn MemoryBus, address: u64, data: &[u8]) -> Result<()> {
        if self == ByteOrder::Big {
            return bus.write(address, data);
        }
        for (i, byte) in data.iter().enumerate() {
            bus.write(self.swizzle(address.wrapping_add(i as u64)), &[*byte])?;
        }
        Ok(())
    }

    pub fn read_u32(self, bus: &mut dyn MemoryBus, address: u64) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(bus, address, &mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Parse a byte order name as used in config files and the environment
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "big" | "z64" => Some(ByteOrder::Big),
            "swapped16" | "v64" => Some(ByteOrder::Swapped16),
            "little" | "n64" => Some(ByteOrder::Little),
            _ => None,
        }
    }
}

/// One recorded data write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    pub address: u64,
    pub size: usize,
    pub value: u64,
}

/// Data-access adapter used by executing instructions
pub struct DataMemory {
    bus: Box<dyn MemoryBus>,
    byte_order: ByteOrder,
    /// Big-endian scratch register, right-aligned for smaller sizes
    scratch: [u8; 8],
    /// Ranges written since the last drain, when write tracking is on
    dirty: Option<Vec<(u64, usize)>>,
    /// Every write in program order, when tracing is on
    trace: Option<Vec<WriteRecord>>,
}

impl DataMemory {
    pub fn new(bus: Box<dyn MemoryBus>, byte_order: ByteOrder) -> Self {
        Self {
            bus,
            byte_order,
            scratch: [0; 8],
            dirty: None,
            trace: None,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn bus(&self) -> &dyn MemoryBus {
        self.bus.as_ref()
    }

    pub fn bus_mut(&mut self) -> &mut dyn MemoryBus {
        self.bus.as_mut()
    }

    /// Load `size` bytes (1, 2, 4 or 8) at `address` into the scratch register
    pub fn read_data(&mut self, address: u64, size: usize) -> Result<()> {
        let size = size.min(8);
        self.scratch = [0; 8];
        let start = 8 - size;
        self.byte_order
            .read_bytes(self.bus.as_mut(), address, &mut self.scratch[start..])
    }

    /// Store the low `size` bytes of the scratch register at `address`
    pub fn write_data(&mut self, address: u64, size: usize) -> Result<()> {
        let size = size.min(8);
        let start = 8 - size;
        self.byte_order
            .write_bytes(self.bus.as_mut(), address, &self.scratch[start..])?;

        if let Some(dirty) = self.dirty.as_mut() {
            dirty.push((address, size));
        }
        if let Some(trace) = self.trace.as_mut() {
            let value = u64::from_be_bytes(self.scratch) & size_mask(size);
            trace.push(WriteRecord {
                address,
                size,
                value,
            });
        }
        Ok(())
    }

    #[inline(always)]
    pub fn data8(&self) -> u8 {
        self.scratch[7]
    }

    #[inline(always)]
    pub fn data16(&self) -> u16 {
        u16::from_be_bytes([self.scratch[6], self.scratch[7]])
    }

    #[inline(always)]
    pub fn data32(&self) -> u32 {
        (u64::from_be_bytes(self.scratch) & 0xFFFF_FFFF) as u32
    }

    #[inline(always)]
    pub fn data64(&self) -> u64 {
        u64::from_be_bytes(self.scratch)
    }

    pub fn set_data8(&mut self, value: u8) {
        self.scratch = (value as u64).to_be_bytes();
    }

    pub fn set_data16(&mut self, value: u16) {
        self.scratch = (value as u64).to_be_bytes();
    }

    pub fn set_data32(&mut self, value: u32) {
        self.scratch = (value as u64).to_be_bytes();
    }

    pub fn set_data64(&mut self, value: u64) {
        self.scratch = value.to_be_bytes();
    }

    /// Read a zero-extended value of `size` bytes
    pub fn load(&mut self, address: u64, size: usize) -> Result<u64> {
        self.read_data(address, size)?;
        Ok(self.data64())
    }

    /// Write the low `size` bytes of `value`
    pub fn store(&mut self, address: u64, size: usize, value: u64) -> Result<()> {
        self.set_data64(value);
        self.write_data(address, size)
    }

    /// Start collecting written ranges for [`Self::drain_dirty`]
    pub fn track_writes(&mut self, enabled: bool) {
        self.dirty = if enabled { Some(Vec::new()) } else { None };
    }

    pub fn is_tracking_writes(&self) -> bool {
        self.dirty.is_some()
    }

    /// Take every range written since the previous drain
    pub fn drain_dirty(&mut self) -> Vec<(u64, usize)> {
        match self.dirty.as_mut() {
            Some(dirty) => std::mem::take(dirty),
            None => Vec::new(),
        }
    }

    /// Ranges written since the previous drain, left in place
    pub fn dirty_ranges(&self) -> &[(u64, usize)] {
        self.dirty.as_deref().unwrap_or(&[])
    }

    pub fn has_dirty(&self) -> bool {
        self.dirty.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Record every write from now on
    pub fn enable_write_trace(&mut self) {
        self.trace = Some(Vec::new());
    }

    pub fn write_trace(&self) -> &[WriteRecord] {
        self.trace.as_deref().unwrap_or(&[])
    }
}

/// Mask covering the low `size` bytes
#[inline(always)]
pub fn size_mask(size: usize) -> u64 {
    if size >= 8 {
        u64::MAX
    } else {
        (1u64 << (size * 8)) - 1
    }
}

impl MemoryBus for DataMemory {
    fn read(&mut self, address: u64, buf: &mut [u8]) -> Result<()> {
        self.bus.read(address, buf)
    }

    fn write(&mut self, address: u64, data: &[u8]) -> Result<()> {
        self.bus.write(address, data)
    }

    fn is_mapped(&self, address: u64, len: usize) -> bool {
        self.bus.is_mapped(address, len)
    }
}

#[cfg(test)]
mod tests;
