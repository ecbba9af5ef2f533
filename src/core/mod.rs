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

//! Core emulation components
//!
//! - CPU: opcode catalog, decoder, register file, COP0/COP1, interpreter
//! - JIT: basic-block builder, closure recompiler, block caches, fallback bridge
//! - Memory: the host memory contract and a flat implementation
//! - Configuration, snapshots and the top-level system loop

pub mod config;
pub mod cpu;
pub mod error;
pub mod jit;
pub mod memory;
pub mod snapshot;
pub mod system;

// Re-export commonly used types
pub use config::{CpuConfig, EngineKind};
pub use cpu::Interpreter;
pub use error::{EmulatorError, Result};
pub use jit::{Engine, ExecutionEngine};
pub use memory::{ByteOrder, DataMemory, FlatMemory, MemoryBus};
pub use snapshot::Snapshot;
pub use system::System;
