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

//! Architectural register file
//!
//! General registers are stored once as 64-bit values. The 32-bit view is a
//! pair of accessors: [`ExecutionState::gpr32`] truncates, and
//! [`ExecutionState::writeback32`] sign-extends a 32-bit result into the full
//! register when the CPU runs in 64-bit mode (and only touches the low half
//! otherwise).

use super::decode::DecodedInstruction;
use super::opcode::{OperandType, RegBank};

/// Sign-extend a 32-bit value to 64 bits
#[inline(always)]
pub fn sign_extend32(value: u32) -> u64 {
    value as i32 as i64 as u64
}

/// Register contents after writing a result
///
/// In 64-bit mode narrow results are sign-extended into the full register.
/// In 32-bit mode only the low word changes.
#[inline(always)]
pub fn merge_result(mode64: bool, old: u64, value: u64, wide: bool) -> u64 {
    if !mode64 {
        (old & 0xFFFF_FFFF_0000_0000) | (value & 0xFFFF_FFFF)
    } else if wide {
        value
    } else {
        sign_extend32(value as u32)
    }
}

/// FCR31 floating-point control/status register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FpuControl(pub u32);

impl FpuControl {
    /// Condition bit set by C.cond
    pub const CONDITION: u32 = 1 << 23;
    /// Flush denormals to zero
    pub const FLUSH: u32 = 1 << 24;
    /// Bits writable through CTC1
    pub const WRITE_MASK: u32 = 0x0183_FFFF;

    /// Rounding mode: 0 nearest, 1 toward zero, 2 toward +inf, 3 toward -inf
    pub fn rounding_mode(self) -> u32 {
        self.0 & 0x3
    }

    pub fn condition(self) -> bool {
        self.0 & Self::CONDITION != 0
    }

    pub fn set_condition(&mut self, value: bool) {
        if value {
            self.0 |= Self::CONDITION;
        } else {
            self.0 &= !Self::CONDITION;
        }
    }
}

/// Concrete register selected by a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegRef {
    pub bank: RegBank,
    pub index: usize,
}

/// Source and destination of a cross-bank move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub source: RegRef,
    pub target: RegRef,
}

/// Register file of one CPU instance
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    gpr: [u64; 32],
    hi: u64,
    lo: u64,
    fpr: [u64; 32],
    /// FCR0 implementation/revision register (read-only)
    pub fcr0: u32,
    pub fcr31: FpuControl,
    pub ll_bit: bool,
    mode64: bool,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExecutionState {
    /// VR4300 FPU implementation number
    const FCR0_RESET: u32 = 0x0000_0A00;

    pub fn new(mode64: bool) -> Self {
        Self {
            gpr: [0; 32],
            hi: 0,
            lo: 0,
            fpr: [0; 32],
            fcr0: Self::FCR0_RESET,
            fcr31: FpuControl::default(),
            ll_bit: false,
            mode64,
        }
    }

    pub fn mode64(&self) -> bool {
        self.mode64
    }

    pub fn set_mode64(&mut self, mode64: bool) {
        self.mode64 = mode64;
    }

    #[inline(always)]
    pub fn gpr32(&self, index: usize) -> u32 {
        self.gpr[index] as u32
    }

    #[inline(always)]
    pub fn gpr64(&self, index: usize) -> u64 {
        self.gpr[index]
    }

    /// Write the low 32 bits, keeping the upper half
    #[inline(always)]
    pub fn set_gpr32(&mut self, index: usize, value: u32) {
        if index != 0 {
            self.gpr[index] = (self.gpr[index] & 0xFFFF_FFFF_0000_0000) | value as u64;
        }
    }

    #[inline(always)]
    pub fn set_gpr64(&mut self, index: usize, value: u64) {
        if index != 0 {
            self.gpr[index] = value;
        }
    }

    /// Store a 32-bit result, sign-extended in 64-bit mode
    #[inline(always)]
    pub fn writeback32(&mut self, index: usize, value: u32) {
        if self.mode64 {
            self.set_gpr64(index, sign_extend32(value));
        } else {
            self.set_gpr32(index, value);
        }
    }

    /// Store a result of the given width (see [`merge_result`])
    #[inline(always)]
    pub fn write_result(&mut self, index: usize, value: u64, wide: bool) {
        if index != 0 {
            self.gpr[index] = merge_result(self.mode64, self.gpr[index], value, wide);
        }
    }

    /// All 32 general registers
    pub fn gprs(&self) -> &[u64; 32] {
        &self.gpr
    }

    pub fn hi(&self) -> u64 {
        self.hi
    }

    pub fn lo(&self) -> u64 {
        self.lo
    }

    pub fn set_hi(&mut self, value: u64) {
        self.hi = value;
    }

    pub fn set_lo(&mut self, value: u64) {
        self.lo = value;
    }

    /// Store a multiply/divide result pair (see [`merge_result`])
    pub fn write_hilo(&mut self, hi: u64, lo: u64, wide: bool) {
        self.hi = merge_result(self.mode64, self.hi, hi, wide);
        self.lo = merge_result(self.mode64, self.lo, lo, wide);
    }

    /// 32-bit FPR access
    ///
    /// With `fr` clear, odd registers name the upper half of the even
    /// register below them.
    pub fn fpr32(&self, index: usize, fr: bool) -> u32 {
        if fr || index & 1 == 0 {
            self.fpr[index] as u32
        } else {
            (self.fpr[index & !1] >> 32) as u32
        }
    }

    pub fn set_fpr32(&mut self, index: usize, fr: bool, value: u32) {
        if fr || index & 1 == 0 {
            self.fpr[index] = (self.fpr[index] & 0xFFFF_FFFF_0000_0000) | value as u64;
        } else {
            let even = index & !1;
            self.fpr[even] = (self.fpr[even] & 0xFFFF_FFFF) | ((value as u64) << 32);
        }
    }

    pub fn fpr64(&self, index: usize, fr: bool) -> u64 {
        if fr {
            self.fpr[index]
        } else {
            self.fpr[index & !1]
        }
    }

    pub fn set_fpr64(&mut self, index: usize, fr: bool, value: u64) {
        if fr {
            self.fpr[index] = value;
        } else {
            self.fpr[index & !1] = value;
        }
    }

    pub fn fpr_s(&self, index: usize, fr: bool) -> f32 {
        f32::from_bits(self.fpr32(index, fr))
    }

    pub fn fpr_d(&self, index: usize, fr: bool) -> f64 {
        f64::from_bits(self.fpr64(index, fr))
    }

    /// Raw FPR backing store
    pub fn fprs(&self) -> &[u64; 32] {
        &self.fpr
    }

    pub fn fcr(&self, index: usize) -> u32 {
        match index {
            0 => self.fcr0,
            31 => self.fcr31.0,
            _ => 0,
        }
    }

    pub fn set_fcr(&mut self, index: usize, value: u32) {
        if index == 31 {
            self.fcr31 = FpuControl(value & FpuControl::WRITE_MASK);
        }
    }

    /// Resolve which concrete registers a transfer instruction moves between
    ///
    /// The same bit positions mean different things depending on the bank:
    /// COP moves name the GPR in `rt` and the coprocessor register in `rd`,
    /// MFHI/MFLO name the GPR in `rd`, MTHI/MTLO in `rs`.
    pub fn resolve_transfer(decoded: &DecodedInstruction) -> Transfer {
        let inst = decoded.inst;
        let opcode = decoded.opcode;

        let index_for = |bank: RegBank| -> usize {
            match bank {
                RegBank::Gpr => match opcode.operands {
                    OperandType::RD => inst.rd(),
                    OperandType::RS => inst.rs(),
                    _ => inst.rt(),
                },
                RegBank::Cp0 | RegBank::Cp1Ctl => inst.rd(),
                RegBank::Cp1 => inst.fs(),
                RegBank::Hi | RegBank::Lo | RegBank::None => 0,
            }
        };

        Transfer {
            source: RegRef {
                bank: opcode.source,
                index: index_for(opcode.source),
            },
            target: RegRef {
                bank: opcode.target,
                index: index_for(opcode.target),
            },
        }
    }

    /// Reset every register to its power-on value
    pub fn reset(&mut self) {
        *self = Self::new(self.mode64);
    }

    /// Load a full register image (snapshot restore)
    pub fn restore(&mut self, gpr: [u64; 32], hi: u64, lo: u64, fpr: [u64; 32]) {
        self.gpr = gpr;
        self.gpr[0] = 0;
        self.hi = hi;
        self.lo = lo;
        self.fpr = fpr;
    }
}
