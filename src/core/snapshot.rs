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

//! Register-state snapshots
//!
//! A snapshot holds everything architectural about the CPU: PC with any
//! pending branch, the general and floating-point register files, HI/LO,
//! FCR31, the LL bit and the COP0 registers. Memory is the collaborator's
//! business and is not included.
//!
//! # Format
//!
//! Binary files are bincode encoded and start with a version number;
//! loading a snapshot of a different version fails. JSON is written for
//! fatal-error dumps and is meant for reading, not restoring.
//!
//! # Example
//!
//! ```no_run
//! use r4300::core::cpu::{Decoder, Interpreter};
//! use r4300::core::snapshot::Snapshot;
//!
//! let cpu = Interpreter::new(Decoder::default(), true);
//! let snapshot = Snapshot::capture(&cpu, "interpreter");
//! snapshot.save("cpu.snap").unwrap();
//!
//! let loaded = Snapshot::load("cpu.snap").unwrap();
//! assert_eq!(loaded.cpu.pc, cpu.pc());
//! ```

use crate::core::cpu::state::FpuControl;
use crate::core::cpu::{Interpreter, PendingBranch};
use crate::core::error::{EmulatorError, Result};
use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Snapshot {
    pub version: u32,

    pub metadata: SnapshotMetadata,

    pub cpu: CpuSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct SnapshotMetadata {
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Engine that produced the state
    pub engine: String,

    pub instructions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct CpuSnapshot {
    pub pc: u64,

    pub mode64: bool,

    /// Branch target and decision waiting on the delay slot at `pc`
    pub delay: Option<(u64, bool)>,

    /// The instruction at `pc` is a nullified delay slot
    pub nullify: bool,

    pub gpr: [u64; 32],

    pub hi: u64,

    pub lo: u64,

    pub fpr: [u64; 32],

    pub fcr31: u32,

    pub ll_bit: bool,

    pub cop0: [u64; 32],
}

impl Snapshot {
    /// Capture the state of `cpu`
    pub fn capture(cpu: &Interpreter, engine: &str) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            metadata: SnapshotMetadata {
                timestamp: Utc::now(),
                engine: engine.to_string(),
                instructions: cpu.instructions(),
            },
            cpu: CpuSnapshot {
                pc: cpu.pc(),
                mode64: cpu.mode64(),
                delay: cpu.pending_branch().map(|b| (b.target, b.taken)),
                nullify: cpu.pending_nullify(),
                gpr: *cpu.state.gprs(),
                hi: cpu.state.hi(),
                lo: cpu.state.lo(),
                fpr: *cpu.state.fprs(),
                fcr31: cpu.state.fcr31.0,
                ll_bit: cpu.state.ll_bit,
                cop0: *cpu.cop0.regs(),
            },
        }
    }

    /// Load this state into `cpu`
    ///
    /// Compiled code assumes nothing about register contents, so block
    /// caches stay valid; the caller only has to drop them when the
    /// operating mode changes, which the recompiler engine does itself.
    pub fn restore(&self, cpu: &mut Interpreter) {
        let state = &self.cpu;
        cpu.state.set_mode64(state.mode64);
        cpu.state.restore(state.gpr, state.hi, state.lo, state.fpr);
        cpu.state.fcr31 = FpuControl(state.fcr31);
        cpu.state.ll_bit = state.ll_bit;
        cpu.cop0.restore(state.cop0);

        let delay = state
            .delay
            .map(|(target, taken)| PendingBranch { target, taken });
        cpu.resume_at(state.pc, delay, state.nullify);
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let encoded = bincode::encode_to_vec(self, config::standard())
            .map_err(|e| EmulatorError::Snapshot(e.to_string()))?;
        std::fs::write(path, encoded)?;
        Ok(())
    }

    /// Load a snapshot file and check its version
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let buffer = std::fs::read(path)?;
        let (snapshot, _): (Snapshot, usize) =
            bincode::decode_from_slice(&buffer, config::standard())
                .map_err(|e| EmulatorError::Snapshot(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EmulatorError::Snapshot(format!(
                "Incompatible snapshot version: expected {}, got {}",
                SNAPSHOT_VERSION, snapshot.version
            )));
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EmulatorError::Snapshot(e.to_string()))
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
