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
use super::super::decode::DecodedInstruction;
use super::super::opcode::ExecutionFlags;
use super::super::{ExceptionCause, Interpreter};
use super::load::Access;
use crate::core::error::Result;
use crate::core::memory::DataMemory;

/// Aligned store of the low bytes of `value`
pub(crate) fn write_aligned(
    flags: ExecutionFlags,
    mem: &mut DataMemory,
    address: u64,
    value: u64,
) -> Access<()> {
    let size = flags.data_size().unwrap_or(4).min(8);
    if address & (size as u64 - 1) != 0 {
        return Access::Misaligned;
    }

    match mem.store(address, size, value) {
        Ok(()) => Access::Done(()),
        Err(e) => {
            log::debug!("Data store failed: {}", e);
            Access::BusError
        }
    }
}

impl Interpreter {
    // === Store Instructions ===

    fn finish_store(&mut self, access: Access<()>, address: u64) {
        match access {
            Access::Done(()) => {}
            Access::Misaligned => self.address_error(address, true),
            Access::BusError => self.raise(ExceptionCause::BusErrorData),
        }
    }

    /// SB / SH / SW / SD and the store-conditional SC / SCD
    ///
    /// SC only writes memory while the LL bit is still set, then replaces
    /// rt with the LL bit (1 = stored).
    ///
    /// Format: sw rt, offset(rs)
    /// Operation: memory[rs + sign_extend(offset)] = rt
    ///
    /// # Arguments
    ///
    /// * `decoded` - The decoded instruction
    /// * `mem` - Data memory for writing
    ///
    /// # Returns
    ///
    /// Ok(()) on success, triggers AddressErrorStore exception on misalignment
    pub(crate) fn op_store(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags;
        let address = alu::effective_address(self.operand(inst.rs()), inst, self.mode64());
        let value = self.state.gpr64(inst.rt());

        if flags.contains(ExecutionFlags::LINK) {
            let size = flags.data_size().unwrap_or(4) as u64;
            if address & (size - 1) != 0 {
                self.address_error(address, true);
                return Ok(());
            }
            let linked = self.state.ll_bit;
            if linked {
                let access = write_aligned(flags, mem, address, value);
                if access != Access::Done(()) {
                    self.finish_store(access, address);
                    return Ok(());
                }
            }
            self.set_result(inst.rt(), linked as u64);
            return Ok(());
        }

        let access = write_aligned(flags, mem, address, value);
        self.finish_store(access, address);
        Ok(())
    }

    /// SWL / SWR / SDL / SDR: unaligned store halves
    ///
    /// Read-modify-write of the aligned word (or doubleword) containing the
    /// address.
    ///
    /// Format: swl rt, offset(rs)
    pub(crate) fn op_store_unaligned(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags;
        let address = alu::effective_address(self.operand(inst.rs()), inst, self.mode64());
        let reg = self.state.gpr64(inst.rt());
        let left = flags.contains(ExecutionFlags::LEFT);

        let (aligned, size) = if flags.is_64bit() {
            (address & !7, 8)
        } else {
            (address & !3, 4)
        };

        let Ok(old) = mem.load(aligned, size) else {
            self.raise(ExceptionCause::BusErrorData);
            return Ok(());
        };

        let merged = match (size, left) {
            (8, true) => alu::merge_sdl(old, reg, address),
            (8, false) => alu::merge_sdr(old, reg, address),
            (_, true) => alu::merge_swl(old as u32, reg as u32, address) as u64,
            (_, false) => alu::merge_swr(old as u32, reg as u32, address) as u64,
        };

        if mem.store(aligned, size, merged).is_err() {
            self.raise(ExceptionCause::BusErrorData);
        }
        Ok(())
    }

    /// SWC1 / SDC1: Store from FPU register
    ///
    /// Format: swc1 ft, offset(rs)
    pub(crate) fn op_store_fpu(&mut self, decoded: &DecodedInstruction, mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags;
        let address = alu::effective_address(self.operand(inst.rs()), inst, self.mode64());
        let fr = self.cop0.fr();

        let value = if flags.is_64bit() {
            self.state.fpr64(inst.ft(), fr)
        } else {
            self.state.fpr32(inst.ft(), fr) as u64
        };

        let access = write_aligned(flags, mem, address, value);
        self.finish_store(access, address);
        Ok(())
    }
}
