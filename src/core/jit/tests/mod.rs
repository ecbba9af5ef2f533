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
//! Recompiler test modules
//!
//! - `block`: block boundaries, caching, delay slots inside blocks
//! - `bridge`: interpreter fallback, exception delivery, invalidation
//! - `equivalence`: recompiled execution matches the interpreter

use super::RecompilerEngine;
use crate::core::config::CpuConfig;
use crate::core::cpu::tests::Rig;
use crate::core::cpu::StepEvent;



#[cfg(test)]
mod equivalence;

fn engine() -> RecompilerEngine {
    RecompilerEngine::new(&CpuConfig::default())
}

fn engine_with(configure: impl FnOnce(&mut CpuConfig)) -> RecompilerEngine {
    let mut config = CpuConfig::default();
    configure(&mut config);
    RecompilerEngine::new(&config)
}

/// Step the engine until PC reaches `target`
///
/// Panics after `limit` steps so a runaway program fails the test.
fn run_until(engine: &mut RecompilerEngine, rig: &mut Rig, target: u64, limit: usize) -> Vec<StepEvent> {
    let target = rig.at(target);
    let mut events = Vec::new();
    for _ in 0..limit {
        if rig.cpu.pc() == target {
            return events;
        }
        events.push(engine.step(&mut rig.cpu, &mut rig.mem).unwrap());
    }
    panic!(
        "PC 0x{:016X} did not reach 0x{:016X} in {} steps",
        rig.cpu.pc(),
        target,
        limit
    );
}
