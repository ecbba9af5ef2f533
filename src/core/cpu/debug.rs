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

//! Breakpoint hooks
//!
//! The interpreter consults a [`Debugger`] only when one is attached, so an
//! idle debugger never changes execution. Address breakpoints halt before the
//! instruction runs; register-write and branch breakpoints halt after it.

use std::collections::HashSet;

/// Why execution halted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakEvent {
    /// About to execute the instruction at this address
    Address(u64),
    /// A watched general register changed
    RegisterWrite { index: usize, value: u64 },
    /// A branch at `address` resolved
    Branch { address: u64, taken: bool },
}

#[derive(Debug, Default)]
pub struct Debugger {
    addresses: HashSet<u64>,
    /// Bitmask of watched general registers
    watched: u32,
    break_on_taken: bool,
    break_on_not_taken: bool,
    /// Address we already halted at; the next step executes it
    resume_from: Option<u64>,
}

impl Debugger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_breakpoint(&mut self, address: u64) {
        self.addresses.insert(address);
    }

    pub fn remove_breakpoint(&mut self, address: u64) -> bool {
        self.addresses.remove(&address)
    }

    pub fn watch_register(&mut self, index: usize) {
        if index < 32 {
            self.watched |= 1 << index;
        }
    }

    pub fn unwatch_register(&mut self, index: usize) {
        if index < 32 {
            self.watched &= !(1 << index);
        }
    }

    pub fn break_on_branches(&mut self, taken: bool, not_taken: bool) {
        self.break_on_taken = taken;
        self.break_on_not_taken = not_taken;
    }

    pub fn watches_registers(&self) -> bool {
        self.watched != 0
    }

    /// Check for an address breakpoint before executing at `pc`
    pub fn check_address(&mut self, pc: u64) -> Option<BreakEvent> {
        if self.resume_from.take() == Some(pc) || !self.addresses.contains(&pc) {
            return None;
        }
        self.resume_from = Some(pc);
        Some(BreakEvent::Address(pc))
    }

    /// Compare watched registers before and after an instruction
    pub fn check_registers(&self, before: &[u64; 32], after: &[u64; 32]) -> Option<BreakEvent> {
        (0..32)
            .filter(|i| self.watched & (1 << i) != 0)
            .find(|&i| before[i] != after[i])
            .map(|index| BreakEvent::RegisterWrite {
                index,
                value: after[index],
            })
    }

    pub fn check_branch(&self, address: u64, taken: bool) -> Option<BreakEvent> {
        let hit = if taken {
            self.break_on_taken
        } else {
            self.break_on_not_taken
        };
        hit.then_some(BreakEvent::Branch { address, taken })
    }
}
