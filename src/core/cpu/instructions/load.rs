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

use super::super::alu;
use super::super::decode::{BinaryInstruction, DecodedInstruction};
use super::super::opcode::ExecutionFlags;
use super::super::{Cop0, ExceptionCause, Interpreter};
use crate::core::error::Result;
use crate::core::memory::DataMemory;

/// Outcome of a data access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access<T> {
    Done(T),
    /// Address not aligned to the access size
    Misaligned,
    /// The memory collaborator rejected the access
    BusError,
}

/// Aligned load, sign- or zero-extended according to the opcode flags
pub(crate) fn read_aligned(flags: ExecutionFlags, mem: &mut DataMemory, address: u64) -> Access<u64> {
    let size = flags.data_size().unwrap_or(4).min(8);
    if address & (size as u64 - 1) != 0 {
        return Access::Misaligned;
    }

    match mem.load(address, size) {
        Ok(raw) => Access::Done(extend(flags, size, raw)),
        Err(e) => {
            log::debug!("Data load failed: {}", e);
            Access::BusError
        }
    }
}

fn extend(flags: ExecutionFlags, size: usize, raw: u64) -> u64 {
    if flags.contains(ExecutionFlags::UNSIGNED) {
        return raw;
    }
    match size {
        1 => raw as u8 as i8 as i64 as u64,
        2 => raw as u16 as i16 as i64 as u64,
        4 => raw as u32 as i32 as i64 as u64,
        _ => raw,
    }
}

impl Interpreter {
    // === Load Instructions ===

    fn data_address(&self, inst: BinaryInstruction) -> u64 {
        alu::effective_address(self.operand(inst.rs()), inst, self.mode64())
    }

    /// LB / LBU / LH / LHU / LW / LWU / LD and the load-linked LL / LLD
    ///
    /// The address must be aligned to the access size. LL/LLD also set the
    /// LL bit and latch LLAddr for a following SC.
    ///
    /// Format: lw rt, offset(rs)
    /// Operation: rt = memory[rs + sign_extend(offset)]
    ///
    /// # Arguments
    ///
    /// * `decoded` - The decoded instruction
    /// * `mem` - Data memory for reading
    ///
    /// # Returns
    ///
    /// Ok(()) on success, triggers AddressErrorLoad exception on misalignment
    pub(crate) fn op_load(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags;
        let address = self.data_address(inst);

        match read_aligned(flags, mem, address) {
            Access::Done(value) => {
                self.set_result(inst.rt(), value);
                if flags.contains(ExecutionFlags::LINK) {
                    self.state.ll_bit = true;
                    self.cop0.write(Cop0::LLADDR, (address & 0xFFFF_FFFF) >> 4);
                }
            }
            Access::Misaligned => self.address_error(address, false),
            Access::BusError => self.raise(ExceptionCause::BusErrorData),
        }
        Ok(())
    }

    /// LWL / LWR / LDL / LDR: unaligned load halves
    ///
    /// Reads the aligned word (or doubleword) containing the address and
    /// merges the addressed bytes into rt.
    ///
    /// Format: lwl rt, offset(rs)
    pub(crate) fn op_load_unaligned(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags;
        let address = self.data_address(inst);
        let rt = inst.rt();
        let left = flags.contains(ExecutionFlags::LEFT);

        if flags.is_64bit() {
            let Ok(dword) = mem.load(address & !7, 8) else {
                self.raise(ExceptionCause::BusErrorData);
                return Ok(());
            };
            let reg = self.state.gpr64(rt);
            let merged = if left {
                alu::merge_ldl(reg, dword, address)
            } else {
                alu::merge_ldr(reg, dword, address)
            };
            self.state.set_gpr64(rt, merged);
        } else {
            let Ok(word) = mem.load(address & !3, 4) else {
                self.raise(ExceptionCause::BusErrorData);
                return Ok(());
            };
            let reg = self.state.gpr32(rt);
            let merged = if left {
                alu::merge_lwl(reg, word as u32, address)
            } else {
                alu::merge_lwr(reg, word as u32, address)
            };
            self.state.writeback32(rt, merged);
        }
        Ok(())
    }

    /// LWC1 / LDC1: Load to FPU register
    ///
    /// Format: lwc1 ft, offset(rs)
    pub(crate) fn op_load_fpu(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags | ExecutionFlags::UNSIGNED;
        let address = self.data_address(inst);
        let fr = self.cop0.fr();

        match read_aligned(flags, mem, address) {
            Access::Done(value) => {
                if flags.is_64bit() {
                    self.state.set_fpr64(inst.ft(), fr, value);
                } else {
                    self.state.set_fpr32(inst.ft(), fr, value as u32);
                }
            }
            Access::Misaligned => self.address_error(address, false),
            Access::BusError => self.raise(ExceptionCause::BusErrorData),
        }
        Ok(())
    }
}
