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

//! VR4300 (64-bit MIPS) CPU core
//!
//! This library provides an interpreter and a block recompiler for the
//! VR4300 instruction set, sharing one opcode catalog, one register file
//! and one set of value semantics. The host supplies memory through the
//! [`core::memory::MemoryBus`] trait.
//!
//! # Example
//!
//! ```
//! use r4300::core::cpu::{Decoder, Interpreter};
//! use r4300::core::memory::{ByteOrder, DataMemory, FlatMemory};
//!
//! let mut flat = FlatMemory::new(0x1000);
//! flat.load_words(0, &[0x2404_0007]).unwrap(); // addiu a0, zero, 7
//!
//! let mut mem = DataMemory::new(Box::new(flat), ByteOrder::Big);
//! let mut cpu = Interpreter::new(Decoder::default(), true);
//! cpu.reset(0xFFFF_FFFF_8000_0000);
//!
//! cpu.step(&mut mem).unwrap();
//! assert_eq!(cpu.state.gpr64(4), 7);
//! ```

pub mod core;
