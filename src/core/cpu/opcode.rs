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

//! Static opcode catalog
//!
//! Every VR4300 instruction the core knows about is listed exactly once in
//! [`OPCODES`]. Each entry carries the mnemonic, the operand shape used for
//! disassembly, the instruction family, an arithmetic/condition class, the
//! execution flags and the register banks data moves between.
//!
//! The catalog is the single source of truth: the decode tables in
//! [`super::decode`] are derived from each entry's [`Encoding`], and the
//! dense [`Op`] discriminant doubles as the dispatch-table index used by the
//! interpreter.

use bitflags::bitflags;

bitflags! {
    /// Per-opcode execution attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExecutionFlags: u32 {
        /// Second operand is the 16-bit immediate
        const IMMEDIATE = 1 << 0;
        /// Unsigned comparison / no overflow trap / zero extension
        const UNSIGNED = 1 << 1;
        /// Reserved instruction when the CPU runs in 32-bit mode
        const RESERVED32 = 1 << 2;
        /// Reserved instruction when the CPU runs in 64-bit mode
        const RESERVED64 = 1 << 3;
        /// Shift amount comes from a register
        const VAR_SHIFT = 1 << 4;
        /// Shift amount is biased by 32 (DSLL32 and friends)
        const SHIFT32 = 1 << 5;
        const DATA8 = 1 << 6;
        const DATA16 = 1 << 7;
        const DATA32 = 1 << 8;
        const DATA64 = 1 << 9;
        const DATA128 = 1 << 10;
        /// Delay slot is nullified when the branch is not taken
        const LIKELY = 1 << 11;
        /// Return address is written to the link register
        const LINK = 1 << 12;
        /// Jump target comes from a register
        const REGISTER = 1 << 13;
        const LEFT = 1 << 14;
        const RIGHT = 1 << 15;
        const DATA_S = 1 << 16;
        const DATA_D = 1 << 17;
        const COND_LT = 1 << 18;
        const COND_GT = 1 << 19;
        const COND_EQ = 1 << 20;
        const COND_UN = 1 << 21;
        const COND_NOT = 1 << 22;
        const COND_ORD = 1 << 23;
    }
}

impl ExecutionFlags {
    /// Memory access width in bytes, if this opcode carries a data-size flag
    pub fn data_size(self) -> Option<usize> {
        if self.contains(Self::DATA8) {
            Some(1)
        } else if self.contains(Self::DATA16) {
            Some(2)
        } else if self.contains(Self::DATA32) {
            Some(4)
        } else if self.contains(Self::DATA64) {
            Some(8)
        } else if self.contains(Self::DATA128) {
            Some(16)
        } else {
            None
        }
    }

    pub fn is_64bit(self) -> bool {
        self.contains(Self::DATA64)
    }
}

/// Operand shape, used by the disassembler and the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// `target`
    Jump,
    /// `rs, rt, offset`
    Branch,
    /// `rs, offset`
    BranchZ,
    /// `offset` (COP1 condition branches)
    Bc1,
    /// `rt, rs, imm`
    ITsi,
    /// `rt, imm`
    ITi,
    /// `rt, imm(rs)`
    ITis,
    /// `rs, imm`
    ISi,
    /// `ft, imm(rs)`
    IFtis,
    /// `op, imm(rs)`
    Cache,
    /// `rt, cop0[rd]`
    Cop0,
    /// `rt, fs`
    Cop1,
    /// `rt, fcr[rd]`
    Cop1Ctl,
    /// `rd, rt, sa`
    RDta,
    /// `rd, rt, rs`
    RDts,
    /// `rs`
    RS,
    /// `rd, rs`
    RDs,
    /// `rd`
    RD,
    /// `rs, rt`
    RSt,
    /// `rd, rs, rt`
    RDst,
    /// `code`
    Code,
    /// `rs, rt, code`
    TrapWithCode,
    /// `fd, fs, ft`
    FpuBinary,
    /// `fd, fs`
    FpuUnary,
    /// `fs, ft`
    FpuCompare,
    Sync,
    Tlb,
    Empty,
}

/// Instruction family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Null,
    Branch,
    Load,
    Store,
    Reg,
    Cop0,
    Fpu,
    Tlb,
    Trap,
    Synchronize,
    Cache,
    LoadFpu,
    StoreFpu,
}

/// Arithmetic or condition class of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    None,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Nor,
    ShiftLeft,
    ShiftRight,
    ShiftRightArith,
    Equal,
    NotEqual,
    Gte,
    Lte,
    Gt,
    Lt,
    True,
    False,
    Sqrt,
    Abs,
    Mov,
    Neg,
    Round,
    Trunc,
    Ceil,
    Floor,
    Convert,
    Compare,
}

/// Register bank a value is read from or written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegBank {
    None,
    Gpr,
    Hi,
    Lo,
    Cp0,
    Cp1,
    Cp1Ctl,
}

/// Where an opcode lives in the encoding space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    None,
    /// Primary opcode (bits 31..26)
    Primary(u8),
    /// SPECIAL function code (bits 5..0)
    Special(u8),
    /// REGIMM rt field (bits 20..16)
    RegImm(u8),
    /// COP0 rs field
    Cop0(u8),
    /// COP0 with the CO bit set, keyed by function code
    Tlb(u8),
    /// COP1 rs field
    Cop1(u8),
    /// COP1 BC group, keyed by the low rt bits
    Bc1(u8),
    /// COP1 arithmetic, keyed by function code (format in rs)
    Fpu(u8),
}

/// One catalog entry
#[derive(Debug)]
pub struct Opcode {
    pub op: Op,
    pub name: &'static str,
    pub encoding: Encoding,
    pub operands: OperandType,
    pub family: Family,
    pub arith: ArithmeticOp,
    pub flags: ExecutionFlags,
    pub source: RegBank,
    pub target: RegBank,
}

impl Opcode {
    /// Dense dispatch index
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.op as usize
    }

    pub fn is_null(&self) -> bool {
        self.op == Op::Null
    }

    pub fn is_branch(&self) -> bool {
        self.family == Family::Branch
    }

    pub fn has(&self, flags: ExecutionFlags) -> bool {
        self.flags.contains(flags)
    }
}

impl PartialEq for Opcode {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
    }
}

impl Eq for Opcode {}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

macro_rules! opcodes {
    ($(
        $variant:ident => $name:literal, $enc:expr, $operands:ident, $family:ident, $arith:ident,
        [$($flag:ident)*], $src:ident -> $dst:ident;
    )*) => {
        /// Opcode identifier. The discriminant is the dense catalog index.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u16)]
        pub enum Op {
            $($variant),*
        }

        impl Op {
            /// Number of catalogued opcodes (dispatch table size)
            pub const COUNT: usize = [$(Op::$variant),*].len();
        }

        /// The opcode catalog, indexed by `Op as usize`
        pub static OPCODES: [Opcode; Op::COUNT] = [
            $(Opcode {
                op: Op::$variant,
                name: $name,
                encoding: $enc,
                operands: OperandType::$operands,
                family: Family::$family,
                arith: ArithmeticOp::$arith,
                flags: ExecutionFlags::empty()$(.union(ExecutionFlags::$flag))*,
                source: RegBank::$src,
                target: RegBank::$dst,
            }),*
        ];
    };
}

use Encoding::{Bc1, Cop0, Cop1, Fpu, Primary, RegImm, Special, Tlb};

opcodes! {
    Null => "null", Encoding::None, Empty, Null, None, [], None -> None;

    // Jumps and branches
    J => "j", Primary(2), Jump, Branch, True, [], None -> None;
    Jal => "jal", Primary(3), Jump, Branch, True, [LINK], None -> Gpr;
    Jr => "jr", Special(8), RS, Branch, True, [REGISTER], Gpr -> None;
    Jalr => "jalr", Special(9), RDs, Branch, True, [REGISTER LINK], Gpr -> Gpr;
    Beq => "beq", Primary(4), Branch, Branch, Equal, [], Gpr -> None;
    Bne => "bne", Primary(5), Branch, Branch, NotEqual, [], Gpr -> None;
    Blez => "blez", Primary(6), BranchZ, Branch, Lte, [], Gpr -> None;
    Bgtz => "bgtz", Primary(7), BranchZ, Branch, Gt, [], Gpr -> None;
    Beql => "beql", Primary(20), Branch, Branch, Equal, [LIKELY], Gpr -> None;
    Bnel => "bnel", Primary(21), Branch, Branch, NotEqual, [LIKELY], Gpr -> None;
    Blezl => "blezl", Primary(22), BranchZ, Branch, Lte, [LIKELY], Gpr -> None;
    Bgtzl => "bgtzl", Primary(23), BranchZ, Branch, Gt, [LIKELY], Gpr -> None;
    Bltz => "bltz", RegImm(0), BranchZ, Branch, Lt, [], Gpr -> None;
    Bgez => "bgez", RegImm(1), BranchZ, Branch, Gte, [], Gpr -> None;
    Bltzl => "bltzl", RegImm(2), BranchZ, Branch, Lt, [LIKELY], Gpr -> None;
    Bgezl => "bgezl", RegImm(3), BranchZ, Branch, Gte, [LIKELY], Gpr -> None;
    Bltzal => "bltzal", RegImm(16), BranchZ, Branch, Lt, [LINK], Gpr -> Gpr;
    Bgezal => "bgezal", RegImm(17), BranchZ, Branch, Gte, [LINK], Gpr -> Gpr;
    Bltzall => "bltzall", RegImm(18), BranchZ, Branch, Lt, [LINK LIKELY], Gpr -> Gpr;
    Bgezall => "bgezall", RegImm(19), BranchZ, Branch, Gte, [LINK LIKELY], Gpr -> Gpr;
    Bc1f => "bc1f", Bc1(0), Bc1, Branch, False, [], Cp1Ctl -> None;
    Bc1t => "bc1t", Bc1(1), Bc1, Branch, True, [], Cp1Ctl -> None;
    Bc1fl => "bc1fl", Bc1(2), Bc1, Branch, False, [LIKELY], Cp1Ctl -> None;
    Bc1tl => "bc1tl", Bc1(3), Bc1, Branch, True, [LIKELY], Cp1Ctl -> None;

    // Immediate arithmetic and logic
    Addi => "addi", Primary(8), ITsi, Reg, Add, [IMMEDIATE DATA32], Gpr -> Gpr;
    Addiu => "addiu", Primary(9), ITsi, Reg, Add, [IMMEDIATE UNSIGNED DATA32], Gpr -> Gpr;
    Slti => "slti", Primary(10), ITsi, Reg, Lt, [IMMEDIATE], Gpr -> Gpr;
    Sltiu => "sltiu", Primary(11), ITsi, Reg, Lt, [IMMEDIATE UNSIGNED], Gpr -> Gpr;
    Andi => "andi", Primary(12), ITsi, Reg, And, [IMMEDIATE UNSIGNED], Gpr -> Gpr;
    Ori => "ori", Primary(13), ITsi, Reg, Or, [IMMEDIATE UNSIGNED], Gpr -> Gpr;
    Xori => "xori", Primary(14), ITsi, Reg, Xor, [IMMEDIATE UNSIGNED], Gpr -> Gpr;
    Lui => "lui", Primary(15), ITi, Reg, None, [IMMEDIATE], None -> Gpr;
    Daddi => "daddi", Primary(24), ITsi, Reg, Add, [IMMEDIATE DATA64 RESERVED32], Gpr -> Gpr;
    Daddiu => "daddiu", Primary(25), ITsi, Reg, Add, [IMMEDIATE UNSIGNED DATA64 RESERVED32], Gpr -> Gpr;

    // Register arithmetic and logic
    Add => "add", Special(32), RDst, Reg, Add, [DATA32], Gpr -> Gpr;
    Addu => "addu", Special(33), RDst, Reg, Add, [UNSIGNED DATA32], Gpr -> Gpr;
    Sub => "sub", Special(34), RDst, Reg, Sub, [DATA32], Gpr -> Gpr;
    Subu => "subu", Special(35), RDst, Reg, Sub, [UNSIGNED DATA32], Gpr -> Gpr;
    And => "and", Special(36), RDst, Reg, And, [], Gpr -> Gpr;
    Or => "or", Special(37), RDst, Reg, Or, [], Gpr -> Gpr;
    Xor => "xor", Special(38), RDst, Reg, Xor, [], Gpr -> Gpr;
    Nor => "nor", Special(39), RDst, Reg, Nor, [], Gpr -> Gpr;
    Slt => "slt", Special(42), RDst, Reg, Lt, [], Gpr -> Gpr;
    Sltu => "sltu", Special(43), RDst, Reg, Lt, [UNSIGNED], Gpr -> Gpr;
    Dadd => "dadd", Special(44), RDst, Reg, Add, [DATA64 RESERVED32], Gpr -> Gpr;
    Daddu => "daddu", Special(45), RDst, Reg, Add, [UNSIGNED DATA64 RESERVED32], Gpr -> Gpr;
    Dsub => "dsub", Special(46), RDst, Reg, Sub, [DATA64 RESERVED32], Gpr -> Gpr;
    Dsubu => "dsubu", Special(47), RDst, Reg, Sub, [UNSIGNED DATA64 RESERVED32], Gpr -> Gpr;

    // Shifts
    Sll => "sll", Special(0), RDta, Reg, ShiftLeft, [DATA32], Gpr -> Gpr;
    Srl => "srl", Special(2), RDta, Reg, ShiftRight, [DATA32], Gpr -> Gpr;
    Sra => "sra", Special(3), RDta, Reg, ShiftRightArith, [DATA32], Gpr -> Gpr;
    Sllv => "sllv", Special(4), RDts, Reg, ShiftLeft, [VAR_SHIFT DATA32], Gpr -> Gpr;
    Srlv => "srlv", Special(6), RDts, Reg, ShiftRight, [VAR_SHIFT DATA32], Gpr -> Gpr;
    Srav => "srav", Special(7), RDts, Reg, ShiftRightArith, [VAR_SHIFT DATA32], Gpr -> Gpr;
    Dsllv => "dsllv", Special(20), RDts, Reg, ShiftLeft, [VAR_SHIFT DATA64 RESERVED32], Gpr -> Gpr;
    Dsrlv => "dsrlv", Special(22), RDts, Reg, ShiftRight, [VAR_SHIFT DATA64 RESERVED32], Gpr -> Gpr;
    Dsrav => "dsrav", Special(23), RDts, Reg, ShiftRightArith, [VAR_SHIFT DATA64 RESERVED32], Gpr -> Gpr;
    Dsll => "dsll", Special(56), RDta, Reg, ShiftLeft, [DATA64 RESERVED32], Gpr -> Gpr;
    Dsrl => "dsrl", Special(58), RDta, Reg, ShiftRight, [DATA64 RESERVED32], Gpr -> Gpr;
    Dsra => "dsra", Special(59), RDta, Reg, ShiftRightArith, [DATA64 RESERVED32], Gpr -> Gpr;
    Dsll32 => "dsll32", Special(60), RDta, Reg, ShiftLeft, [SHIFT32 DATA64 RESERVED32], Gpr -> Gpr;
    Dsrl32 => "dsrl32", Special(62), RDta, Reg, ShiftRight, [SHIFT32 DATA64 RESERVED32], Gpr -> Gpr;
    Dsra32 => "dsra32", Special(63), RDta, Reg, ShiftRightArith, [SHIFT32 DATA64 RESERVED32], Gpr -> Gpr;

    // Multiply and divide
    Mult => "mult", Special(24), RSt, Reg, Mul, [DATA32], Gpr -> Lo;
    Multu => "multu", Special(25), RSt, Reg, Mul, [UNSIGNED DATA32], Gpr -> Lo;
    Div => "div", Special(26), RSt, Reg, Div, [DATA32], Gpr -> Lo;
    Divu => "divu", Special(27), RSt, Reg, Div, [UNSIGNED DATA32], Gpr -> Lo;
    Dmult => "dmult", Special(28), RSt, Reg, Mul, [DATA64 RESERVED32], Gpr -> Lo;
    Dmultu => "dmultu", Special(29), RSt, Reg, Mul, [UNSIGNED DATA64 RESERVED32], Gpr -> Lo;
    Ddiv => "ddiv", Special(30), RSt, Reg, Div, [DATA64 RESERVED32], Gpr -> Lo;
    Ddivu => "ddivu", Special(31), RSt, Reg, Div, [UNSIGNED DATA64 RESERVED32], Gpr -> Lo;

    // HI/LO transfers
    Mfhi => "mfhi", Special(16), RD, Reg, None, [DATA64], Hi -> Gpr;
    Mthi => "mthi", Special(17), RS, Reg, None, [DATA64], Gpr -> Hi;
    Mflo => "mflo", Special(18), RD, Reg, None, [DATA64], Lo -> Gpr;
    Mtlo => "mtlo", Special(19), RS, Reg, None, [DATA64], Gpr -> Lo;

    // Loads
    Lb => "lb", Primary(32), ITis, Load, None, [DATA8], None -> Gpr;
    Lh => "lh", Primary(33), ITis, Load, None, [DATA16], None -> Gpr;
    Lwl => "lwl", Primary(34), ITis, Load, None, [DATA32 LEFT], None -> Gpr;
    Lw => "lw", Primary(35), ITis, Load, None, [DATA32], None -> Gpr;
    Lbu => "lbu", Primary(36), ITis, Load, None, [DATA8 UNSIGNED], None -> Gpr;
    Lhu => "lhu", Primary(37), ITis, Load, None, [DATA16 UNSIGNED], None -> Gpr;
    Lwr => "lwr", Primary(38), ITis, Load, None, [DATA32 RIGHT], None -> Gpr;
    Lwu => "lwu", Primary(39), ITis, Load, None, [DATA32 UNSIGNED RESERVED32], None -> Gpr;
    Ldl => "ldl", Primary(26), ITis, Load, None, [DATA64 LEFT RESERVED32], None -> Gpr;
    Ldr => "ldr", Primary(27), ITis, Load, None, [DATA64 RIGHT RESERVED32], None -> Gpr;
    Ld => "ld", Primary(55), ITis, Load, None, [DATA64 RESERVED32], None -> Gpr;
    Ll => "ll", Primary(48), ITis, Load, None, [DATA32 LINK], None -> Gpr;
    Lld => "lld", Primary(52), ITis, Load, None, [DATA64 LINK RESERVED32], None -> Gpr;
    Lwc1 => "lwc1", Primary(49), IFtis, LoadFpu, None, [DATA32], None -> Cp1;
    Ldc1 => "ldc1", Primary(53), IFtis, LoadFpu, None, [DATA64], None -> Cp1;

    // Stores
    Sb => "sb", Primary(40), ITis, Store, None, [DATA8], Gpr -> None;
    Sh => "sh", Primary(41), ITis, Store, None, [DATA16], Gpr -> None;
    Swl => "swl", Primary(42), ITis, Store, None, [DATA32 LEFT], Gpr -> None;
    Sw => "sw", Primary(43), ITis, Store, None, [DATA32], Gpr -> None;
    Sdl => "sdl", Primary(44), ITis, Store, None, [DATA64 LEFT RESERVED32], Gpr -> None;
    Sdr => "sdr", Primary(45), ITis, Store, None, [DATA64 RIGHT RESERVED32], Gpr -> None;
    Swr => "swr", Primary(46), ITis, Store, None, [DATA32 RIGHT], Gpr -> None;
    Sd => "sd", Primary(63), ITis, Store, None, [DATA64 RESERVED32], Gpr -> None;
    Sc => "sc", Primary(56), ITis, Store, None, [DATA32 LINK], Gpr -> Gpr;
    Scd => "scd", Primary(60), ITis, Store, None, [DATA64 LINK RESERVED32], Gpr -> Gpr;
    Swc1 => "swc1", Primary(57), IFtis, StoreFpu, None, [DATA32], Cp1 -> None;
    Sdc1 => "sdc1", Primary(61), IFtis, StoreFpu, None, [DATA64], Cp1 -> None;

    // Misc
    Cache => "cache", Primary(47), Cache, Cache, None, [], None -> None;
    Sync => "sync", Special(15), Sync, Synchronize, None, [], None -> None;
    Syscall => "syscall", Special(12), Code, Trap, True, [], None -> None;
    Break => "break", Special(13), Code, Trap, True, [], None -> None;

    // Traps
    Tge => "tge", Special(48), TrapWithCode, Trap, Gte, [], Gpr -> None;
    Tgeu => "tgeu", Special(49), TrapWithCode, Trap, Gte, [UNSIGNED], Gpr -> None;
    Tlt => "tlt", Special(50), TrapWithCode, Trap, Lt, [], Gpr -> None;
    Tltu => "tltu", Special(51), TrapWithCode, Trap, Lt, [UNSIGNED], Gpr -> None;
    Teq => "teq", Special(52), TrapWithCode, Trap, Equal, [], Gpr -> None;
    Tne => "tne", Special(54), TrapWithCode, Trap, NotEqual, [], Gpr -> None;
    Tgei => "tgei", RegImm(8), ISi, Trap, Gte, [IMMEDIATE], Gpr -> None;
    Tgeiu => "tgeiu", RegImm(9), ISi, Trap, Gte, [IMMEDIATE UNSIGNED], Gpr -> None;
    Tlti => "tlti", RegImm(10), ISi, Trap, Lt, [IMMEDIATE], Gpr -> None;
    Tltiu => "tltiu", RegImm(11), ISi, Trap, Lt, [IMMEDIATE UNSIGNED], Gpr -> None;
    Teqi => "teqi", RegImm(12), ISi, Trap, Equal, [IMMEDIATE], Gpr -> None;
    Tnei => "tnei", RegImm(14), ISi, Trap, NotEqual, [IMMEDIATE], Gpr -> None;

    // COP0
    Mfc0 => "mfc0", Cop0(0), Cop0, Cop0, None, [DATA32], Cp0 -> Gpr;
    Dmfc0 => "dmfc0", Cop0(1), Cop0, Cop0, None, [DATA64 RESERVED32], Cp0 -> Gpr;
    Mtc0 => "mtc0", Cop0(4), Cop0, Cop0, None, [DATA32], Gpr -> Cp0;
    Dmtc0 => "dmtc0", Cop0(5), Cop0, Cop0, None, [DATA64 RESERVED32], Gpr -> Cp0;
    Tlbr => "tlbr", Tlb(1), Tlb, Tlb, None, [], None -> None;
    Tlbwi => "tlbwi", Tlb(2), Tlb, Tlb, None, [], None -> None;
    Tlbwr => "tlbwr", Tlb(6), Tlb, Tlb, None, [], None -> None;
    Tlbp => "tlbp", Tlb(8), Tlb, Tlb, None, [], None -> None;
    Eret => "eret", Tlb(24), Empty, Cop0, None, [], None -> None;

    // COP1 transfers
    Mfc1 => "mfc1", Cop1(0), Cop1, Fpu, None, [DATA32], Cp1 -> Gpr;
    Dmfc1 => "dmfc1", Cop1(1), Cop1, Fpu, None, [DATA64], Cp1 -> Gpr;
    Cfc1 => "cfc1", Cop1(2), Cop1Ctl, Fpu, None, [DATA32], Cp1Ctl -> Gpr;
    Mtc1 => "mtc1", Cop1(4), Cop1, Fpu, None, [DATA32], Gpr -> Cp1;
    Dmtc1 => "dmtc1", Cop1(5), Cop1, Fpu, None, [DATA64], Gpr -> Cp1;
    Ctc1 => "ctc1", Cop1(6), Cop1Ctl, Fpu, None, [DATA32], Gpr -> Cp1Ctl;

    // COP1 arithmetic
    FAdd => "add", Fpu(0), FpuBinary, Fpu, Add, [], Cp1 -> Cp1;
    FSub => "sub", Fpu(1), FpuBinary, Fpu, Sub, [], Cp1 -> Cp1;
    FMul => "mul", Fpu(2), FpuBinary, Fpu, Mul, [], Cp1 -> Cp1;
    FDiv => "div", Fpu(3), FpuBinary, Fpu, Div, [], Cp1 -> Cp1;
    FSqrt => "sqrt", Fpu(4), FpuUnary, Fpu, Sqrt, [], Cp1 -> Cp1;
    FAbs => "abs", Fpu(5), FpuUnary, Fpu, Abs, [], Cp1 -> Cp1;
    FMov => "mov", Fpu(6), FpuUnary, Fpu, Mov, [], Cp1 -> Cp1;
    FNeg => "neg", Fpu(7), FpuUnary, Fpu, Neg, [], Cp1 -> Cp1;
    RoundL => "round.l", Fpu(8), FpuUnary, Fpu, Round, [DATA64], Cp1 -> Cp1;
    TruncL => "trunc.l", Fpu(9), FpuUnary, Fpu, Trunc, [DATA64], Cp1 -> Cp1;
    CeilL => "ceil.l", Fpu(10), FpuUnary, Fpu, Ceil, [DATA64], Cp1 -> Cp1;
    FloorL => "floor.l", Fpu(11), FpuUnary, Fpu, Floor, [DATA64], Cp1 -> Cp1;
    RoundW => "round.w", Fpu(12), FpuUnary, Fpu, Round, [DATA32], Cp1 -> Cp1;
    TruncW => "trunc.w", Fpu(13), FpuUnary, Fpu, Trunc, [DATA32], Cp1 -> Cp1;
    CeilW => "ceil.w", Fpu(14), FpuUnary, Fpu, Ceil, [DATA32], Cp1 -> Cp1;
    FloorW => "floor.w", Fpu(15), FpuUnary, Fpu, Floor, [DATA32], Cp1 -> Cp1;
    CvtS => "cvt.s", Fpu(32), FpuUnary, Fpu, Convert, [DATA_S], Cp1 -> Cp1;
    CvtD => "cvt.d", Fpu(33), FpuUnary, Fpu, Convert, [DATA_D], Cp1 -> Cp1;
    CvtW => "cvt.w", Fpu(36), FpuUnary, Fpu, Convert, [DATA32], Cp1 -> Cp1;
    CvtL => "cvt.l", Fpu(37), FpuUnary, Fpu, Convert, [DATA64], Cp1 -> Cp1;

    // COP1 compares: condition bits are unordered / equal / less-than
    CF => "c.f", Fpu(48), FpuCompare, Fpu, Compare, [], Cp1 -> Cp1Ctl;
    CUn => "c.un", Fpu(49), FpuCompare, Fpu, Compare, [COND_UN], Cp1 -> Cp1Ctl;
    CEq => "c.eq", Fpu(50), FpuCompare, Fpu, Compare, [COND_EQ], Cp1 -> Cp1Ctl;
    CUeq => "c.ueq", Fpu(51), FpuCompare, Fpu, Compare, [COND_UN COND_EQ], Cp1 -> Cp1Ctl;
    COlt => "c.olt", Fpu(52), FpuCompare, Fpu, Compare, [COND_LT COND_ORD], Cp1 -> Cp1Ctl;
    CUlt => "c.ult", Fpu(53), FpuCompare, Fpu, Compare, [COND_UN COND_LT], Cp1 -> Cp1Ctl;
    COle => "c.ole", Fpu(54), FpuCompare, Fpu, Compare, [COND_EQ COND_LT COND_ORD], Cp1 -> Cp1Ctl;
    CUle => "c.ule", Fpu(55), FpuCompare, Fpu, Compare, [COND_UN COND_EQ COND_LT], Cp1 -> Cp1Ctl;
    CSf => "c.sf", Fpu(56), FpuCompare, Fpu, Compare, [], Cp1 -> Cp1Ctl;
    CNgle => "c.ngle", Fpu(57), FpuCompare, Fpu, Compare, [COND_UN], Cp1 -> Cp1Ctl;
    CSeq => "c.seq", Fpu(58), FpuCompare, Fpu, Compare, [COND_EQ], Cp1 -> Cp1Ctl;
    CNgl => "c.ngl", Fpu(59), FpuCompare, Fpu, Compare, [COND_UN COND_EQ], Cp1 -> Cp1Ctl;
    CLt => "c.lt", Fpu(60), FpuCompare, Fpu, Compare, [COND_LT], Cp1 -> Cp1Ctl;
    CNge => "c.nge", Fpu(61), FpuCompare, Fpu, Compare, [COND_UN COND_LT], Cp1 -> Cp1Ctl;
    CLe => "c.le", Fpu(62), FpuCompare, Fpu, Compare, [COND_EQ COND_LT], Cp1 -> Cp1Ctl;
    CNgt => "c.ngt", Fpu(63), FpuCompare, Fpu, Compare, [COND_UN COND_EQ COND_LT], Cp1 -> Cp1Ctl;
}

impl Op {
    /// Catalog entry for this opcode
    #[inline(always)]
    pub fn info(self) -> &'static Opcode {
        &OPCODES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

/// Catalog entry for the null (undecodable) opcode
pub fn null_opcode() -> &'static Opcode {
    Op::Null.info()
}
