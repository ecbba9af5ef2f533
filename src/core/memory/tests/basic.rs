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

use super::*;
use crate::core::error::EmulatorError;

fn memory() -> DataMemory {
    DataMemory::new(Box::new(FlatMemory::new(0x1000)), ByteOrder::Big)
}

#[test]
fn test_segment_mirroring() {
    let mut mem = memory();

    mem.store(0x8000_0100, 4, 0xDEAD_BEEF).unwrap();

    assert_eq!(mem.load(0x0000_0100, 4).unwrap(), 0xDEAD_BEEF);
    assert_eq!(mem.load(0xA000_0100, 4).unwrap(), 0xDEAD_BEEF);
    assert_eq!(mem.load(0xFFFF_FFFF_8000_0100, 4).unwrap(), 0xDEAD_BEEF);
}

#[test]
fn test_scratch_sizes_are_big_endian() {
    let mut mem = memory();

    mem.set_data64(0x0102_0304_0506_0708);
    mem.write_data(0x8000_0000, 8).unwrap();

    mem.read_data(0x8000_0000, 1).unwrap();
    assert_eq!(mem.data8(), 0x01);

    mem.read_data(0x8000_0002, 2).unwrap();
    assert_eq!(mem.data16(), 0x0304);

    mem.read_data(0x8000_0004, 4).unwrap();
    assert_eq!(mem.data32(), 0x0506_0708);

    mem.read_data(0x8000_0000, 8).unwrap();
    assert_eq!(mem.data64(), 0x0102_0304_0506_0708);
}

#[test]
fn test_narrow_read_clears_scratch() {
    let mut mem = memory();
    mem.set_data64(u64::MAX);

    mem.read_data(0x8000_0000, 1).unwrap();

    assert_eq!(mem.data64(), 0);
}

#[test]
fn test_unmapped_access_reports_address() {
    let mut mem = memory();

    let err = mem.load(0x8000_2000, 4).unwrap_err();

    match err {
        EmulatorError::MemoryAccess { address, size } => {
            assert_eq!(address, 0x8000_2000);
            assert_eq!(size, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_is_mapped_boundary() {
    let flat = FlatMemory::new(0x100);

    assert!(flat.is_mapped(0x8000_00FC, 4));
    assert!(!flat.is_mapped(0x8000_00FD, 4));
    assert!(!flat.is_mapped(0x8000_0100, 1));
}

#[test]
fn test_dirty_ranges_only_when_tracking() {
    let mut mem = memory();

    mem.store(0x8000_0000, 4, 1).unwrap();
    assert!(mem.drain_dirty().is_empty());

    mem.track_writes(true);
    mem.store(0x8000_0010, 2, 1).unwrap();
    mem.store(0x8000_0020, 8, 1).unwrap();

    assert!(mem.has_dirty());
    assert_eq!(
        mem.drain_dirty(),
        vec![(0x8000_0010, 2), (0x8000_0020, 8)]
    );
    assert!(!mem.has_dirty());
}

#[test]
fn test_write_trace_records_program_order() {
    let mut mem = memory();
    mem.enable_write_trace();

    mem.store(0x8000_0008, 1, 0x1FF).unwrap();
    mem.store(0x8000_0000, 4, 0x1234).unwrap();

    let trace = mem.write_trace();
    assert_eq!(trace.len(), 2);
    assert_eq!(
        trace[0],
        WriteRecord {
            address: 0x8000_0008,
            size: 1,
            value: 0xFF,
        }
    );
    assert_eq!(trace[1].address, 0x8000_0000);
}
