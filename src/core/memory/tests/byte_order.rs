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

#[test]
fn test_swizzle() {
    assert_eq!(ByteOrder::Big.swizzle(0x11), 0x11);
    assert_eq!(ByteOrder::Swapped16.swizzle(0x11), 0x10);
    assert_eq!(ByteOrder::Little.swizzle(0x11), 0x12);
}

#[test]
fn test_swapped16_word_fetch() {
    let mut flat = FlatMemory::new(0x10);
    // 0x3C01_8000 stored as .v64 halves
    flat.load(0, &[0x01, 0x3C, 0x00, 0x80]).unwrap();

    let word = ByteOrder::Swapped16.read_u32(&mut flat, 0x8000_0000).unwrap();

    assert_eq!(word, 0x3C01_8000);
}

#[test]
fn test_little_word_fetch() {
    let mut flat = FlatMemory::new(0x10);
    flat.load(0, &[0x00, 0x80, 0x01, 0x3C]).unwrap();

    let word = ByteOrder::Little.read_u32(&mut flat, 0x8000_0000).unwrap();

    assert_eq!(word, 0x3C01_8000);
}

#[test]
fn test_little_byte_store_lands_swizzled() {
    let mut mem = DataMemory::new(Box::new(FlatMemory::new(0x10)), ByteOrder::Little);

    mem.store(0x8000_0000, 1, 0xAB).unwrap();

    let mut raw = [0u8; 4];
    mem.bus_mut().read(0, &mut raw).unwrap();
    assert_eq!(raw, [0, 0, 0, 0xAB]);
    assert_eq!(mem.load(0x8000_0000, 1).unwrap(), 0xAB);
}

#[test]
fn test_parse_names() {
    assert_eq!(ByteOrder::parse("z64"), Some(ByteOrder::Big));
    assert_eq!(ByteOrder::parse(" V64 "), Some(ByteOrder::Swapped16));
    assert_eq!(ByteOrder::parse("little"), Some(ByteOrder::Little));
    assert_eq!(ByteOrder::parse("middle"), None);
}
