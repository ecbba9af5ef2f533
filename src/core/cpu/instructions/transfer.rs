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

//! Cross-bank register moves
//!
//! MFHI/MTHI/MFLO/MTLO, MFC0/MTC0/DMFC0/DMTC0 and the COP1 moves all share
//! one handler. The catalog names the source and target banks and
//! [`ExecutionState::resolve_transfer`] picks the register indices.

use super::super::decode::DecodedInstruction;
use super::super::opcode::RegBank;
use super::super::state::{sign_extend32, ExecutionState};
use super::super::Interpreter;
use crate::core::error::Result;
use crate::core::memory::DataMemory;

impl Interpreter {
    /// Move a value between register banks
    ///
    /// Word-sized moves sign-extend into 64-bit destinations; MTC0 in
    /// particular writes the sign-extended word.
    ///
    /// Format: mfc0 rt, rd / mtc1 rt, fs / mfhi rd
    pub(crate) fn op_transfer(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let transfer = ExecutionState::resolve_transfer(decoded);
        let wide = decoded.opcode.flags.is_64bit();
        let fr = self.cop0.fr();

        let source = transfer.source.index;
        let value = match transfer.source.bank {
            RegBank::Gpr => self.state.gpr64(source),
            RegBank::Hi => self.state.hi(),
            RegBank::Lo => self.state.lo(),
            RegBank::Cp0 => self.cop0.read(source),
            RegBank::Cp1 if wide => self.state.fpr64(source, fr),
            RegBank::Cp1 => self.state.fpr32(source, fr) as u64,
            RegBank::Cp1Ctl => self.state.fcr(source) as u64,
            RegBank::None => 0,
        };

        let target = transfer.target.index;
        match transfer.target.bank {
            RegBank::Gpr => self.state.write_result(target, value, wide),
            RegBank::Hi => self.state.set_hi(value),
            RegBank::Lo => self.state.set_lo(value),
            RegBank::Cp0 => {
                let value = if wide {
                    value
                } else {
                    sign_extend32(value as u32)
                };
                self.cop0.write(target, value);
            }
            RegBank::Cp1 if wide => self.state.set_fpr64(target, fr, value),
            RegBank::Cp1 => self.state.set_fpr32(target, fr, value as u32),
            RegBank::Cp1Ctl => self.state.set_fcr(target, value as u32),
            RegBank::None => {}
        }
        Ok(())
    }
}
