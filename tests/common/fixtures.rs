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
//! Test fixtures for common test scenarios

use super::test_roms::{EXCEPTION_VECTOR, PROGRAM_BASE};
use r4300::core::config::{canonical_address, CpuConfig, EngineKind};
use r4300::core::system::System;

/// Flat memory size used by the fixtures
pub const MEMORY_SIZE: usize = 0x10_0000;

/// Create a System using `engine`
#[allow(dead_code)]
pub fn create_system(engine: EngineKind) -> System {
    let config = CpuConfig {
        engine,
        ..CpuConfig::default()
    };
    System::new(config, MEMORY_SIZE).expect("Failed to create system")
}

/// Create a System with `program` at [`PROGRAM_BASE`] and PC pointing at it
#[allow(dead_code)]
pub fn create_system_with_program(engine: EngineKind, program: &[u32]) -> System {
    let config = CpuConfig {
        engine,
        ..CpuConfig::default()
    };
    create_configured_system(config, program)
}

/// Like [`create_system_with_program`] with a caller-supplied configuration
#[allow(dead_code)]
pub fn create_configured_system(config: CpuConfig, program: &[u32]) -> System {
    let mut system = System::new(config, MEMORY_SIZE).expect("Failed to create system");
    system
        .load_words(PROGRAM_BASE, program)
        .expect("Failed to load program");
    system.set_pc(PROGRAM_BASE);
    system
}

/// Install an exception handler at the general exception vector
#[allow(dead_code)]
pub fn install_handler(system: &mut System, handler: &[u32]) {
    system
        .load_words(EXCEPTION_VECTOR, handler)
        .expect("Failed to load handler");
}

/// Step until PC reaches `address`, panicking after `limit` steps
#[allow(dead_code)]
pub fn run_to(system: &mut System, address: u64, limit: u64) {
    let target = system.cpu().normalize(canonical_address(address));
    for _ in 0..limit {
        if system.pc() == target {
            return;
        }
        system.step().expect("Execution failed");
    }
    panic!(
        "PC 0x{:016X} did not reach 0x{:016X} within {} steps",
        system.pc(),
        target,
        limit
    );
}
