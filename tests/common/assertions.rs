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
//! Custom assertions for CPU state

use r4300::core::cpu::Interpreter;
use r4300::core::system::System;

/// Assert a general register holds `expected`
#[allow(dead_code)]
pub fn assert_gpr(system: &System, reg: usize, expected: u64) {
    let actual = system.cpu().state.gpr64(reg);
    assert_eq!(
        actual, expected,
        "Register r{} mismatch: expected 0x{:016X}, got 0x{:016X}",
        reg, expected, actual
    );
}

/// Assert PC is at `expected` (given as a 32-bit KSEG address)
#[allow(dead_code)]
pub fn assert_pc(system: &System, expected: u32) {
    let expected = system.cpu().normalize(expected as i32 as i64 as u64);
    let actual = system.pc();
    assert_eq!(
        actual, expected,
        "PC mismatch: expected 0x{:016X}, got 0x{:016X}",
        expected, actual
    );
}

/// Assert memory holds the big-endian word `expected` at `address`
#[allow(dead_code)]
pub fn assert_memory_word(system: &mut System, address: u64, expected: u32) {
    let actual = system
        .memory_mut()
        .load(address, 4)
        .expect("Failed to read memory") as u32;
    assert_eq!(
        actual, expected,
        "Memory at 0x{:016X} mismatch: expected 0x{:08X}, got 0x{:08X}",
        address, expected, actual
    );
}

/// Assert two CPUs hold the same architectural registers
#[allow(dead_code)]
pub fn assert_same_registers(a: &Interpreter, b: &Interpreter) {
    for reg in 0..32 {
        assert_eq!(
            a.state.gpr64(reg),
            b.state.gpr64(reg),
            "Register r{} differs between engines",
            reg
        );
    }
    assert_eq!(a.state.hi(), b.state.hi(), "HI differs between engines");
    assert_eq!(a.state.lo(), b.state.lo(), "LO differs between engines");
    assert_eq!(a.pc(), b.pc(), "PC differs between engines");
}
