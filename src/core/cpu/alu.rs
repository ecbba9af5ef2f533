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

//! Pure instruction semantics
//!
//! Every rule that decides a result value (overflow, divide-by-zero
//! sentinels, 128-bit products, unaligned merges, branch and trap
//! conditions) lives here as a plain function. The interpreter handlers and
//! the compiled block operations both call into this module, so the two
//! execution paths cannot drift apart.

use super::decode::{BinaryInstruction, DecodedInstruction};
use super::opcode::{ArithmeticOp, ExecutionFlags, OperandType};
use super::state::sign_extend32;

/// 32-bit add; `None` on signed overflow when `trap` is set
#[inline(always)]
pub fn add32(a: u32, b: u32, trap: bool) -> Option<u32> {
    if trap {
        (a as i32).checked_add(b as i32).map(|v| v as u32)
    } else {
        Some(a.wrapping_add(b))
    }
}

#[inline(always)]
pub fn sub32(a: u32, b: u32, trap: bool) -> Option<u32> {
    if trap {
        (a as i32).checked_sub(b as i32).map(|v| v as u32)
    } else {
        Some(a.wrapping_sub(b))
    }
}

#[inline(always)]
pub fn add64(a: u64, b: u64, trap: bool) -> Option<u64> {
    if trap {
        (a as i64).checked_add(b as i64).map(|v| v as u64)
    } else {
        Some(a.wrapping_add(b))
    }
}

#[inline(always)]
pub fn sub64(a: u64, b: u64, trap: bool) -> Option<u64> {
    if trap {
        (a as i64).checked_sub(b as i64).map(|v| v as u64)
    } else {
        Some(a.wrapping_sub(b))
    }
}

/// ADD/SUB family
///
/// 32-bit forms come back sign-extended. `None` means the trapping form
/// overflowed and the destination must not be written.
#[inline(always)]
pub fn add_sub(op: ArithmeticOp, flags: ExecutionFlags, a: u64, b: u64) -> Option<u64> {
    let trap = !flags.contains(ExecutionFlags::UNSIGNED);
    let sub = op == ArithmeticOp::Sub;
    if flags.is_64bit() {
        if sub {
            sub64(a, b, trap)
        } else {
            add64(a, b, trap)
        }
    } else {
        let result = if sub {
            sub32(a as u32, b as u32, trap)
        } else {
            add32(a as u32, b as u32, trap)
        };
        result.map(sign_extend32)
    }
}

/// AND / OR / XOR / NOR
#[inline(always)]
pub fn logic(op: ArithmeticOp, a: u64, b: u64) -> u64 {
    match op {
        ArithmeticOp::And => a & b,
        ArithmeticOp::Or => a | b,
        ArithmeticOp::Xor => a ^ b,
        ArithmeticOp::Nor => !(a | b),
        _ => 0,
    }
}

/// SLT family: 1 when `a < b`
#[inline(always)]
pub fn set_less(a: u64, b: u64, unsigned: bool) -> u64 {
    let less = if unsigned {
        a < b
    } else {
        (a as i64) < (b as i64)
    };
    less as u64
}

/// Effective shift amount for a shift opcode
///
/// Variable 32-bit shifts use the low five bits of the register, 64-bit
/// shifts the low six; the *32 forms add 32 to the encoded amount.
#[inline(always)]
pub fn shift_amount(flags: ExecutionFlags, sa: u32, rs_value: u64) -> u32 {
    let raw = if flags.contains(ExecutionFlags::VAR_SHIFT) {
        rs_value as u32
    } else {
        sa
    };
    if flags.contains(ExecutionFlags::DATA64) {
        let bias = if flags.contains(ExecutionFlags::SHIFT32) { 32 } else { 0 };
        (raw + bias) & 63
    } else {
        raw & 31
    }
}

#[inline(always)]
pub fn shift32(op: ArithmeticOp, value: u32, amount: u32) -> u32 {
    match op {
        ArithmeticOp::ShiftLeft => value << amount,
        ArithmeticOp::ShiftRight => value >> amount,
        ArithmeticOp::ShiftRightArith => ((value as i32) >> amount) as u32,
        _ => value,
    }
}

#[inline(always)]
pub fn shift64(op: ArithmeticOp, value: u64, amount: u32) -> u64 {
    match op {
        ArithmeticOp::ShiftLeft => value << amount,
        ArithmeticOp::ShiftRight => value >> amount,
        ArithmeticOp::ShiftRightArith => ((value as i64) >> amount) as u64,
        _ => value,
    }
}

/// Any shift opcode; 32-bit forms come back sign-extended
#[inline(always)]
pub fn shift(op: ArithmeticOp, flags: ExecutionFlags, sa: u32, value: u64, rs_value: u64) -> u64 {
    let amount = shift_amount(flags, sa, rs_value);
    if flags.is_64bit() {
        shift64(op, value, amount)
    } else {
        sign_extend32(shift32(op, value as u32, amount))
    }
}

/// MULT/DIV family: new (HI, LO), 32-bit forms sign-extended
pub fn mul_div(op: ArithmeticOp, flags: ExecutionFlags, a: u64, b: u64) -> (u64, u64) {
    let unsigned = flags.contains(ExecutionFlags::UNSIGNED);
    let divide = op == ArithmeticOp::Div;
    if flags.is_64bit() {
        if divide {
            div64(a, b, unsigned)
        } else {
            mul64(a, b, unsigned)
        }
    } else {
        let (hi, lo) = if divide {
            div32(a as u32, b as u32, unsigned)
        } else {
            mul32(a as u32, b as u32, unsigned)
        };
        (sign_extend32(hi), sign_extend32(lo))
    }
}

/// 32x32 multiply, returning (hi, lo)
#[inline(always)]
pub fn mul32(a: u32, b: u32, unsigned: bool) -> (u32, u32) {
    let product = if unsigned {
        (a as u64) * (b as u64)
    } else {
        ((a as i32 as i64) * (b as i32 as i64)) as u64
    };
    ((product >> 32) as u32, product as u32)
}

/// 64x64 multiply into a 128-bit (hi, lo) pair
///
/// Built from four 32x32 partial products; the carry out of the middle
/// column is folded into the high word.
pub fn mul64(a: u64, b: u64, unsigned: bool) -> (u64, u64) {
    let negative = !unsigned && ((a as i64) < 0) != ((b as i64) < 0);
    let (a, b) = if unsigned {
        (a, b)
    } else {
        ((a as i64).unsigned_abs(), (b as i64).unsigned_abs())
    };

    let a_lo = a & 0xFFFF_FFFF;
    let a_hi = a >> 32;
    let b_lo = b & 0xFFFF_FFFF;
    let b_hi = b >> 32;

    let p1 = a_lo * b_lo;
    let p2 = a_hi * b_lo;
    let p3 = a_lo * b_hi;
    let p4 = a_hi * b_hi;

    let carry = ((p1 >> 32) + (p2 & 0xFFFF_FFFF) + (p3 & 0xFFFF_FFFF)) >> 32;
    let lo = p1.wrapping_add(p2 << 32).wrapping_add(p3 << 32);
    let hi = p4
        .wrapping_add(p2 >> 32)
        .wrapping_add(p3 >> 32)
        .wrapping_add(carry);

    if negative {
        // Two's complement negate the 128-bit magnitude
        let lo_neg = (!lo).wrapping_add(1);
        let hi_neg = (!hi).wrapping_add((lo_neg == 0) as u64);
        (hi_neg, lo_neg)
    } else {
        (hi, lo)
    }
}

/// 32-bit divide, returning (hi = remainder, lo = quotient)
///
/// Division by zero yields HI = dividend and LO = -1, except that a signed
/// negative dividend yields LO = 1. `i32::MIN / -1` yields LO = dividend,
/// HI = 0.
pub fn div32(a: u32, b: u32, unsigned: bool) -> (u32, u32) {
    if unsigned {
        if b == 0 {
            return (a, 0xFFFF_FFFF);
        }
        return (a % b, a / b);
    }

    let n = a as i32;
    let d = b as i32;
    if d == 0 {
        let lo = if n < 0 { 1 } else { 0xFFFF_FFFF };
        return (a, lo);
    }
    if n == i32::MIN && d == -1 {
        return (0, a);
    }
    ((n % d) as u32, (n / d) as u32)
}

/// 64-bit divide, same sentinel rules as [`div32`]
pub fn div64(a: u64, b: u64, unsigned: bool) -> (u64, u64) {
    if unsigned {
        if b == 0 {
            return (a, u64::MAX);
        }
        return (a % b, a / b);
    }

    let n = a as i64;
    let d = b as i64;
    if d == 0 {
        let lo = if n < 0 { 1 } else { u64::MAX };
        return (a, lo);
    }
    if n == i64::MIN && d == -1 {
        return (0, a);
    }
    ((n % d) as u64, (n / d) as u64)
}

/// Compare two operands for a branch or trap condition
#[inline(always)]
pub fn condition(op: ArithmeticOp, a: u64, b: u64, unsigned: bool) -> bool {
    if unsigned {
        match op {
            ArithmeticOp::Equal => a == b,
            ArithmeticOp::NotEqual => a != b,
            ArithmeticOp::Gte => a >= b,
            ArithmeticOp::Lte => a <= b,
            ArithmeticOp::Gt => a > b,
            ArithmeticOp::Lt => a < b,
            ArithmeticOp::True => true,
            _ => false,
        }
    } else {
        let (a, b) = (a as i64, b as i64);
        match op {
            ArithmeticOp::Equal => a == b,
            ArithmeticOp::NotEqual => a != b,
            ArithmeticOp::Gte => a >= b,
            ArithmeticOp::Lte => a <= b,
            ArithmeticOp::Gt => a > b,
            ArithmeticOp::Lt => a < b,
            ArithmeticOp::True => true,
            _ => false,
        }
    }
}

/// Target of a PC-relative branch: delay slot address plus the offset
#[inline(always)]
pub fn branch_target(address: u64, inst: BinaryInstruction) -> u64 {
    address.wrapping_add(4).wrapping_add(inst.simm() << 2)
}

/// Target of J/JAL: the 256 MB region of the delay slot
#[inline(always)]
pub fn jump_target(address: u64, inst: BinaryInstruction) -> u64 {
    (address.wrapping_add(4) & !0x0FFF_FFFF) | ((inst.target() as u64) << 2)
}

/// Data address of a load or store: base + sign-extended offset
#[inline(always)]
pub fn effective_address(base: u64, inst: BinaryInstruction, mode64: bool) -> u64 {
    let address = base.wrapping_add(inst.simm());
    if mode64 {
        address
    } else {
        address & 0xFFFF_FFFF
    }
}

/// Statically known target of a decoded branch or jump
///
/// Register jumps have no static target.
pub fn static_target(decoded: &DecodedInstruction) -> Option<u64> {
    match decoded.opcode.operands {
        OperandType::Jump => Some(jump_target(decoded.address, decoded.inst)),
        OperandType::Branch | OperandType::BranchZ | OperandType::Bc1 => {
            Some(branch_target(decoded.address, decoded.inst))
        }
        _ => None,
    }
}

/// LWL: merge the aligned word into the left (high) bytes of `reg`
#[inline(always)]
pub fn merge_lwl(reg: u32, word: u32, offset: u64) -> u32 {
    let shift = (offset & 3) * 8;
    let keep = (1u64 << shift) as u32;
    (reg & keep.wrapping_sub(1)) | (word << shift)
}

/// LWR: merge the aligned word into the right (low) bytes of `reg`
#[inline(always)]
pub fn merge_lwr(reg: u32, word: u32, offset: u64) -> u32 {
    let shift = (3 - (offset & 3)) * 8;
    (reg & !(0xFFFF_FFFFu32 >> shift)) | (word >> shift)
}

/// SWL: new memory word after storing the left bytes of `reg`
#[inline(always)]
pub fn merge_swl(word: u32, reg: u32, offset: u64) -> u32 {
    let shift = (offset & 3) * 8;
    (word & !(0xFFFF_FFFFu32 >> shift)) | (reg >> shift)
}

/// SWR: new memory word after storing the right bytes of `reg`
#[inline(always)]
pub fn merge_swr(word: u32, reg: u32, offset: u64) -> u32 {
    let shift = (3 - (offset & 3)) * 8;
    (word & !(0xFFFF_FFFFu32 << shift)) | (reg << shift)
}

#[inline(always)]
pub fn merge_ldl(reg: u64, dword: u64, offset: u64) -> u64 {
    let shift = (offset & 7) * 8;
    let keep = (1u64 << shift).wrapping_sub(1);
    (reg & keep) | (dword << shift)
}

#[inline(always)]
pub fn merge_ldr(reg: u64, dword: u64, offset: u64) -> u64 {
    let shift = (7 - (offset & 7)) * 8;
    (reg & !(u64::MAX >> shift)) | (dword >> shift)
}

#[inline(always)]
pub fn merge_sdl(dword: u64, reg: u64, offset: u64) -> u64 {
    let shift = (offset & 7) * 8;
    (dword & !(u64::MAX >> shift)) | (reg >> shift)
}

#[inline(always)]
pub fn merge_sdr(dword: u64, reg: u64, offset: u64) -> u64 {
    let shift = (7 - (offset & 7)) * 8;
    (dword & !(u64::MAX << shift)) | (reg << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul64_matches_wide_product() {
        let cases = [
            (0u64, 0u64),
            (u64::MAX, u64::MAX),
            (0xFFFF_FFFF, 0xFFFF_FFFF),
            (0x8000_0000_0000_0000, 2),
            (0x1234_5678_9ABC_DEF0, 0x0FED_CBA9_8765_4321),
        ];
        for (a, b) in cases {
            let wide = (a as u128) * (b as u128);
            assert_eq!(mul64(a, b, true), ((wide >> 64) as u64, wide as u64));

            let wide = ((a as i64 as i128) * (b as i64 as i128)) as u128;
            assert_eq!(mul64(a, b, false), ((wide >> 64) as u64, wide as u64));
        }
    }

    #[test]
    fn test_div32_sentinels() {
        assert_eq!(div32(7, 0, true), (7, 0xFFFF_FFFF));
        assert_eq!(div32(0xFFFF_FFF9, 0, false), (0xFFFF_FFF9, 1));
        assert_eq!(div32(7, 0, false), (7, 0xFFFF_FFFF));
        assert_eq!(div32(0x8000_0000, 0xFFFF_FFFF, false), (0, 0x8000_0000));
        assert_eq!(div32(0xFFFF_FFF9, 2, false), (0xFFFF_FFFF, 0xFFFF_FFFD));
    }

    #[test]
    fn test_unaligned_word_merges() {
        let reg = 0x1122_3344;
        let word = 0xAABB_CCDD;
        assert_eq!(merge_lwl(reg, word, 0), 0xAABB_CCDD);
        assert_eq!(merge_lwl(reg, word, 1), 0xBBCC_DD44);
        assert_eq!(merge_lwl(reg, word, 3), 0xDD22_3344);
        assert_eq!(merge_lwr(reg, word, 0), 0x1122_33AA);
        assert_eq!(merge_lwr(reg, word, 2), 0x11AA_BBCC);
        assert_eq!(merge_lwr(reg, word, 3), 0xAABB_CCDD);
        assert_eq!(merge_swl(word, reg, 1), 0xAA11_2233);
        assert_eq!(merge_swr(word, reg, 1), 0x3344_CCDD);
    }

    #[test]
    fn test_unaligned_dword_merges() {
        let reg = 0x0011_2233_4455_6677;
        let mem = 0x8899_AABB_CCDD_EEFF;
        assert_eq!(merge_ldl(reg, mem, 0), mem);
        assert_eq!(merge_ldl(reg, mem, 7), 0xFF11_2233_4455_6677);
        assert_eq!(merge_ldr(reg, mem, 7), mem);
        assert_eq!(merge_ldr(reg, mem, 0), 0x0011_2233_4455_6688);
        assert_eq!(merge_sdl(mem, reg, 0), reg);
        assert_eq!(merge_sdr(mem, reg, 7), reg);
        assert_eq!(merge_sdr(mem, reg, 0), 0x7799_AABB_CCDD_EEFF);
    }

    #[test]
    fn test_shift_amounts() {
        let var = ExecutionFlags::VAR_SHIFT | ExecutionFlags::DATA32;
        assert_eq!(shift_amount(var, 0, 0x3F), 31);
        let dsll32 = ExecutionFlags::SHIFT32 | ExecutionFlags::DATA64;
        assert_eq!(shift_amount(dsll32, 4, 0), 36);
        let dsllv = ExecutionFlags::VAR_SHIFT | ExecutionFlags::DATA64;
        assert_eq!(shift_amount(dsllv, 0, 0x7F), 63);
    }
}
