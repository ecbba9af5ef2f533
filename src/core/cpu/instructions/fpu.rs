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

//! Coprocessor 1 (FPU) arithmetic
//!
//! Single and double formats are computed with the host's IEEE types.
//! Arithmetic on the fixed-point formats (W, L) is an unimplemented
//! operation and raises a floating-point exception with FCR31 cause E.
//!
//! Every arithmetic operation rewrites the FCR31 cause field with the IEEE
//! conditions it detected and ORs them into the sticky flags. A cause whose
//! enable bit is set traps with a floating-point exception and leaves the
//! destination register untouched.

use super::super::decode::{DecodedInstruction, FMT_D, FMT_L, FMT_S, FMT_W};
use super::super::opcode::{ArithmeticOp, ExecutionFlags};
use super::super::{ExceptionCause, Interpreter};
use crate::core::error::Result;
use crate::core::memory::DataMemory;

/// IEEE condition bits in the order the FCR31 flag, enable and cause fields use
const IEEE_INEXACT: u32 = 1 << 0;
const IEEE_UNDERFLOW: u32 = 1 << 1;
const IEEE_OVERFLOW: u32 = 1 << 2;
const IEEE_DIV_ZERO: u32 = 1 << 3;
const IEEE_INVALID: u32 = 1 << 4;

const FLAG_SHIFT: u32 = 2;
const ENABLE_SHIFT: u32 = 7;
const CAUSE_SHIFT: u32 = 12;

/// FCR31 cause bit E (unimplemented operation)
const CAUSE_UNIMPLEMENTED: u32 = 1 << 17;
/// Whole FCR31 cause field, E included
const CAUSE_MASK: u32 = 0x3F << CAUSE_SHIFT;

/// Round to an integral value with an FCR31-style rounding mode
fn round_with(mode: u32, value: f64) -> f64 {
    match mode & 3 {
        0 => value.round_ties_even(),
        1 => value.trunc(),
        2 => value.ceil(),
        _ => value.floor(),
    }
}

fn rounding_for(op: ArithmeticOp, fcr31_mode: u32) -> u32 {
    match op {
        ArithmeticOp::Round => 0,
        ArithmeticOp::Trunc => 1,
        ArithmeticOp::Ceil => 2,
        ArithmeticOp::Floor => 3,
        _ => fcr31_mode,
    }
}

/// Whether `result` is exactly `a op b`
///
/// Uses error-free transforms in f64, so it also answers for single
/// operands widened to f64 with a single result.
fn is_exact(op: ArithmeticOp, a: f64, b: f64, result: f64) -> bool {
    match op {
        ArithmeticOp::Add | ArithmeticOp::Sub => {
            let b = if op == ArithmeticOp::Sub { -b } else { b };
            let sum = a + b;
            let virtual_b = sum - a;
            let error = (a - (sum - virtual_b)) + (b - virtual_b);
            error == 0.0 && sum == result
        }
        ArithmeticOp::Mul => {
            let product = a * b;
            a.mul_add(b, -product) == 0.0 && product == result
        }
        ArithmeticOp::Div => result.mul_add(b, -a) == 0.0,
        ArithmeticOp::Sqrt => result.mul_add(result, -a) == 0.0,
        _ => true,
    }
}

/// IEEE conditions raised by a float result of finite or NaN operands
///
/// `tiny` is the smallest normal magnitude of the result format.
fn float_conditions(op: ArithmeticOp, a: f64, b: f64, result: f64, tiny: f64) -> u32 {
    if a.is_nan() || b.is_nan() {
        return 0;
    }
    if result.is_nan() {
        return IEEE_INVALID;
    }
    if op == ArithmeticOp::Div && b == 0.0 && a.is_finite() {
        return IEEE_DIV_ZERO;
    }
    if result.is_infinite() {
        return if a.is_finite() && b.is_finite() {
            IEEE_OVERFLOW | IEEE_INEXACT
        } else {
            0
        };
    }

    let mut conditions = 0;
    if !is_exact(op, a, b, result) {
        conditions |= IEEE_INEXACT;
    }
    // tiny results (zero included) underflow only when rounding lost bits
    if result.abs() < tiny && conditions != 0 {
        conditions |= IEEE_UNDERFLOW;
    }
    conditions
}

/// Integer value of `rounded` if it fits in a W (or L with `wide`) result
fn integer_in_range(rounded: f64, wide: bool) -> Option<i64> {
    let (lo, hi) = if wide {
        (i64::MIN as f64, 9_223_372_036_854_775_808.0)
    } else {
        (i32::MIN as f64, 2_147_483_648.0)
    };
    (rounded.is_finite() && rounded >= lo && rounded < hi).then_some(rounded as i64)
}

impl Interpreter {
    fn fpu_unimplemented(&mut self) {
        self.state.fcr31.0 = (self.state.fcr31.0 & !CAUSE_MASK) | CAUSE_UNIMPLEMENTED;
        self.raise(ExceptionCause::FloatingPoint);
    }

    /// Replace the FCR31 cause field with `conditions` and latch the flags
    ///
    /// Returns true when an enabled condition trapped; the caller must not
    /// write its result then.
    fn fpu_signal(&mut self, conditions: u32) -> bool {
        let fcr31 = (self.state.fcr31.0 & !CAUSE_MASK) | (conditions << CAUSE_SHIFT);
        let enabled = (fcr31 >> ENABLE_SHIFT) & 0x1F;
        if conditions & enabled != 0 {
            self.state.fcr31.0 = fcr31;
            self.raise(ExceptionCause::FloatingPoint);
            return true;
        }
        self.state.fcr31.0 = fcr31 | (conditions << FLAG_SHIFT);
        false
    }

    /// Source operand of format `fmt` widened to f64
    fn fpu_source(&self, fmt: u8, index: usize) -> Option<f64> {
        let fr = self.cop0.fr();
        match fmt {
            FMT_S => Some(self.state.fpr_s(index, fr) as f64),
            FMT_D => Some(self.state.fpr_d(index, fr)),
            FMT_W => Some(self.state.fpr32(index, fr) as i32 as f64),
            FMT_L => Some(self.state.fpr64(index, fr) as i64 as f64),
            _ => None,
        }
    }

    /// Store a floating-point result in format `fmt` (S or D)
    fn fpu_store_float(&mut self, fmt: u8, index: usize, value: f64) {
        let fr = self.cop0.fr();
        if fmt == FMT_S {
            self.state.set_fpr32(index, fr, (value as f32).to_bits());
        } else {
            self.state.set_fpr64(index, fr, value.to_bits());
        }
    }

    /// ADD.fmt / SUB.fmt / MUL.fmt / DIV.fmt
    ///
    /// Format: add.s fd, fs, ft
    /// Operation: fd = fs + ft
    pub(crate) fn op_fpu_binary(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let fr = self.cop0.fr();
        let op = decoded.opcode.arith;

        match inst.fmt() {
            FMT_S => {
                let a = self.state.fpr_s(inst.fs(), fr);
                let b = self.state.fpr_s(inst.ft(), fr);
                let result = match op {
                    ArithmeticOp::Add => a + b,
                    ArithmeticOp::Sub => a - b,
                    ArithmeticOp::Mul => a * b,
                    _ => a / b,
                };
                let conditions =
                    float_conditions(op, a as f64, b as f64, result as f64, f32::MIN_POSITIVE as f64);
                if !self.fpu_signal(conditions) {
                    self.state.set_fpr32(inst.fd(), fr, result.to_bits());
                }
            }
            FMT_D => {
                let a = self.state.fpr_d(inst.fs(), fr);
                let b = self.state.fpr_d(inst.ft(), fr);
                let result = match op {
                    ArithmeticOp::Add => a + b,
                    ArithmeticOp::Sub => a - b,
                    ArithmeticOp::Mul => a * b,
                    _ => a / b,
                };
                let conditions = float_conditions(op, a, b, result, f64::MIN_POSITIVE);
                if !self.fpu_signal(conditions) {
                    self.state.set_fpr64(inst.fd(), fr, result.to_bits());
                }
            }
            _ => self.fpu_unimplemented(),
        }
        Ok(())
    }

    /// SQRT.fmt / ABS.fmt / MOV.fmt / NEG.fmt
    ///
    /// MOV copies the raw bits. Only SQRT can raise conditions (V for a
    /// negative operand, I for an irrational root).
    pub(crate) fn op_fpu_unary(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let fr = self.cop0.fr();
        let op = decoded.opcode.arith;

        match inst.fmt() {
            FMT_S => {
                let a = self.state.fpr_s(inst.fs(), fr);
                let result = match op {
                    ArithmeticOp::Sqrt => a.sqrt(),
                    ArithmeticOp::Abs => a.abs(),
                    ArithmeticOp::Neg => -a,
                    _ => a,
                };
                let conditions = match op {
                    ArithmeticOp::Sqrt => {
                        float_conditions(op, a as f64, 0.0, result as f64, f32::MIN_POSITIVE as f64)
                    }
                    _ => 0,
                };
                if !self.fpu_signal(conditions) {
                    self.state.set_fpr32(inst.fd(), fr, result.to_bits());
                }
            }
            FMT_D => {
                let a = self.state.fpr_d(inst.fs(), fr);
                let result = match op {
                    ArithmeticOp::Sqrt => a.sqrt(),
                    ArithmeticOp::Abs => a.abs(),
                    ArithmeticOp::Neg => -a,
                    _ => a,
                };
                let conditions = match op {
                    ArithmeticOp::Sqrt => float_conditions(op, a, 0.0, result, f64::MIN_POSITIVE),
                    _ => 0,
                };
                if !self.fpu_signal(conditions) {
                    self.state.set_fpr64(inst.fd(), fr, result.to_bits());
                }
            }
            _ => self.fpu_unimplemented(),
        }
        Ok(())
    }

    /// ROUND / TRUNC / CEIL / FLOOR to W or L
    ///
    /// NaN, infinities and out-of-range values raise V; the untrapped result
    /// saturates and NaN converts to 0. Any fraction dropped raises I.
    ///
    /// Format: trunc.w.s fd, fs
    pub(crate) fn op_fpu_round(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let fmt = inst.fmt();
        if fmt != FMT_S && fmt != FMT_D {
            self.fpu_unimplemented();
            return Ok(());
        }
        let Some(value) = self.fpu_source(fmt, inst.fs()) else {
            self.fpu_unimplemented();
            return Ok(());
        };

        let mode = rounding_for(decoded.opcode.arith, self.state.fcr31.rounding_mode());
        self.fpu_store_integer(decoded.opcode.flags, inst.fd(), value, mode);
        Ok(())
    }

    /// Round `value` with `mode` into a W or L destination
    fn fpu_store_integer(&mut self, flags: ExecutionFlags, index: usize, value: f64, mode: u32) {
        let rounded = round_with(mode, value);
        let wide = flags.is_64bit();
        let conditions = match integer_in_range(rounded, wide) {
            None => IEEE_INVALID,
            Some(_) if rounded != value => IEEE_INEXACT,
            Some(_) => 0,
        };
        if self.fpu_signal(conditions) {
            return;
        }

        let fr = self.cop0.fr();
        if wide {
            self.state.set_fpr64(index, fr, rounded as i64 as u64);
        } else {
            self.state.set_fpr32(index, fr, rounded as i32 as u32);
        }
    }

    /// CVT.S / CVT.D / CVT.W / CVT.L
    ///
    /// Integer destinations round with the FCR31 rounding mode. Converting
    /// a format to itself is unimplemented.
    ///
    /// Format: cvt.d.s fd, fs
    pub(crate) fn op_fpu_convert(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let flags = decoded.opcode.flags;
        let fmt = inst.fmt();

        let target = if flags.contains(ExecutionFlags::DATA_S) {
            FMT_S
        } else if flags.contains(ExecutionFlags::DATA_D) {
            FMT_D
        } else if flags.is_64bit() {
            FMT_L
        } else {
            FMT_W
        };

        if fmt == target {
            self.fpu_unimplemented();
            return Ok(());
        }

        let fr = self.cop0.fr();
        // L -> S and L -> D convert directly to avoid double rounding
        if fmt == FMT_L && (target == FMT_S || target == FMT_D) {
            let source = self.state.fpr64(inst.fs(), fr) as i64;
            if target == FMT_S {
                let value = source as f32;
                let inexact = value as i128 != source as i128;
                if !self.fpu_signal(if inexact { IEEE_INEXACT } else { 0 }) {
                    self.state.set_fpr32(inst.fd(), fr, value.to_bits());
                }
            } else {
                let value = source as f64;
                let inexact = value as i128 != source as i128;
                if !self.fpu_signal(if inexact { IEEE_INEXACT } else { 0 }) {
                    self.state.set_fpr64(inst.fd(), fr, value.to_bits());
                }
            }
            return Ok(());
        }

        let Some(value) = self.fpu_source(fmt, inst.fs()) else {
            self.fpu_unimplemented();
            return Ok(());
        };

        match target {
            FMT_S => {
                let narrowed = value as f32;
                let conditions = if fmt == FMT_D {
                    float_conditions(ArithmeticOp::Add, value, 0.0, narrowed as f64, f32::MIN_POSITIVE as f64)
                } else if narrowed as f64 != value {
                    IEEE_INEXACT
                } else {
                    0
                };
                if !self.fpu_signal(conditions) {
                    self.fpu_store_float(target, inst.fd(), value);
                }
            }
            FMT_D => {
                if !self.fpu_signal(0) {
                    self.fpu_store_float(target, inst.fd(), value);
                }
            }
            _ => {
                let mode = self.state.fcr31.rounding_mode();
                self.fpu_store_integer(flags, inst.fd(), value, mode);
            }
        }
        Ok(())
    }

    /// C.cond.fmt: compare and set the FCR31 condition bit
    ///
    /// The condition is the OR of the selected relations: unordered, equal,
    /// less-than. The signaling predicates (cond bit 3) raise V on NaN.
    ///
    /// Format: c.lt.s fs, ft
    pub(crate) fn op_fpu_compare(&mut self, decoded: &DecodedInstruction, _mem: &mut DataMemory) -> Result<()> {
        let inst = decoded.inst;
        let fmt = inst.fmt();
        if fmt != FMT_S && fmt != FMT_D {
            self.fpu_unimplemented();
            return Ok(());
        }
        let (Some(a), Some(b)) = (self.fpu_source(fmt, inst.fs()), self.fpu_source(fmt, inst.ft()))
        else {
            self.fpu_unimplemented();
            return Ok(());
        };

        let opcode = decoded.opcode;
        let unordered = a.is_nan() || b.is_nan();
        let signaling = inst.funct() & 0x8 != 0;
        if self.fpu_signal(if signaling && unordered { IEEE_INVALID } else { 0 }) {
            return Ok(());
        }

        let condition = (opcode.has(ExecutionFlags::COND_UN) && unordered)
            || (opcode.has(ExecutionFlags::COND_EQ) && a == b)
            || (opcode.has(ExecutionFlags::COND_LT) && a < b);

        self.state.fcr31.set_condition(condition);
        Ok(())
    }
}
