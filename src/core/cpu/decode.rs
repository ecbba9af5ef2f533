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

//! Instruction decoding
//!
//! A 32-bit word is first wrapped in a [`BinaryInstruction`] bitfield view,
//! then resolved through the decode tables into a catalog [`Opcode`].
//!
//! # Instruction Formats
//!
//! ```text
//! R-type: | op(6) | rs(5) | rt(5) | rd(5) | sa(5) | funct(6) |
//! I-type: | op(6) | rs(5) | rt(5) |        imm(16)           |
//! J-type: | op(6) |              target(26)                  |
//! ```
//!
//! Grouped families (SPECIAL, REGIMM, COP0, COP1) are resolved through
//! secondary tables keyed by the function, rt or rs/format fields.

use super::opcode::{null_opcode, Encoding, Op, Opcode, OperandType, OPCODES};
use crate::core::memory::{ByteOrder, MemoryBus};
use std::sync::OnceLock;

/// Primary opcode of the SPECIAL group
const OP_SPECIAL: u32 = 0x00;
/// Primary opcode of the REGIMM group
const OP_REGIMM: u32 = 0x01;
const OP_COP0: u32 = 0x10;
const OP_COP1: u32 = 0x11;

/// COP1 rs value selecting the BC1 branch group
const COP1_BC: u32 = 0x08;

/// COP1 format field values
pub const FMT_S: u8 = 16;
pub const FMT_D: u8 = 17;
pub const FMT_W: u8 = 20;
pub const FMT_L: u8 = 21;

/// Read-only bitfield view over one instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BinaryInstruction(pub u32);

impl BinaryInstruction {
    #[inline(always)]
    pub fn word(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn op(self) -> u32 {
        self.0 >> 26
    }

    #[inline(always)]
    pub fn rs(self) -> usize {
        ((self.0 >> 21) & 0x1F) as usize
    }

    #[inline(always)]
    pub fn rt(self) -> usize {
        ((self.0 >> 16) & 0x1F) as usize
    }

    #[inline(always)]
    pub fn rd(self) -> usize {
        ((self.0 >> 11) & 0x1F) as usize
    }

    #[inline(always)]
    pub fn sa(self) -> u32 {
        (self.0 >> 6) & 0x1F
    }

    #[inline(always)]
    pub fn funct(self) -> u32 {
        self.0 & 0x3F
    }

    #[inline(always)]
    pub fn imm(self) -> u16 {
        self.0 as u16
    }

    /// Immediate sign-extended to 64 bits
    #[inline(always)]
    pub fn simm(self) -> u64 {
        self.0 as u16 as i16 as i64 as u64
    }

    /// Immediate zero-extended to 64 bits
    #[inline(always)]
    pub fn zimm(self) -> u64 {
        (self.0 & 0xFFFF) as u64
    }

    /// 26-bit jump target field
    #[inline(always)]
    pub fn target(self) -> u32 {
        self.0 & 0x03FF_FFFF
    }

    /// Code field of SYSCALL and BREAK
    pub fn code(self) -> u32 {
        (self.0 >> 6) & 0xF_FFFF
    }

    /// Code field of register traps
    pub fn trap_code(self) -> u32 {
        (self.0 >> 6) & 0x3FF
    }

    /// COP1 format (rs field)
    #[inline(always)]
    pub fn fmt(self) -> u8 {
        self.rs() as u8
    }

    #[inline(always)]
    pub fn fs(self) -> usize {
        self.rd()
    }

    #[inline(always)]
    pub fn ft(self) -> usize {
        self.rt()
    }

    #[inline(always)]
    pub fn fd(self) -> usize {
        self.sa() as usize
    }

    /// `sll r0, r0, 0`, displayed as `nop`
    pub fn is_nop(self) -> bool {
        self.0 == 0
    }
}

/// One decoded instruction, ready for the interpreter or a block
#[derive(Debug, Clone, Copy)]
pub struct DecodedInstruction {
    pub address: u64,
    pub inst: BinaryInstruction,
    pub opcode: &'static Opcode,
    /// Fetch failed or the word does not decode
    pub invalid: bool,
    /// The next word is outside the instruction stream
    pub last: bool,
    /// Set by whichever path schedules this instruction after a branch
    pub delay_slot: bool,
}

impl DecodedInstruction {
    pub fn op(&self) -> Op {
        self.opcode.op
    }

    pub fn name(&self) -> &'static str {
        self.opcode.name
    }

    pub fn is_branch(&self) -> bool {
        self.opcode.is_branch()
    }

    pub fn is_eret(&self) -> bool {
        self.opcode.op == Op::Eret
    }

    /// Address of the instruction that follows
    pub fn next_address(&self) -> u64 {
        self.address.wrapping_add(4)
    }
}

/// Secondary decode tables, derived from the opcode catalog
struct DecodeTables {
    primary: [Op; 64],
    special: [Op; 64],
    regimm: [Op; 32],
    cop0: [Op; 32],
    tlb: [Op; 64],
    cop1: [Op; 32],
    bc1: [Op; 4],
    fpu: [Op; 64],
}

impl DecodeTables {
    fn build() -> Self {
        let mut tables = DecodeTables {
            primary: [Op::Null; 64],
            special: [Op::Null; 64],
            regimm: [Op::Null; 32],
            cop0: [Op::Null; 32],
            tlb: [Op::Null; 64],
            cop1: [Op::Null; 32],
            bc1: [Op::Null; 4],
            fpu: [Op::Null; 64],
        };

        for opcode in OPCODES.iter() {
            let slot = match opcode.encoding {
                Encoding::None => continue,
                Encoding::Primary(n) => &mut tables.primary[n as usize],
                Encoding::Special(n) => &mut tables.special[n as usize],
                Encoding::RegImm(n) => &mut tables.regimm[n as usize],
                Encoding::Cop0(n) => &mut tables.cop0[n as usize],
                Encoding::Tlb(n) => &mut tables.tlb[n as usize],
                Encoding::Cop1(n) => &mut tables.cop1[n as usize],
                Encoding::Bc1(n) => &mut tables.bc1[n as usize],
                Encoding::Fpu(n) => &mut tables.fpu[n as usize],
            };
            debug_assert_eq!(*slot, Op::Null, "encoding collision for {}", opcode.name);
            *slot = opcode.op;
        }

        tables
    }

    fn get() -> &'static DecodeTables {
        static TABLES: OnceLock<DecodeTables> = OnceLock::new();
        TABLES.get_or_init(DecodeTables::build)
    }
}

/// Resolve an instruction word to its catalog entry
///
/// Unknown encodings resolve to the null opcode.
pub fn resolve(inst: BinaryInstruction) -> &'static Opcode {
    let tables = DecodeTables::get();
    let op = match inst.op() {
        OP_SPECIAL => tables.special[inst.funct() as usize],
        OP_REGIMM => tables.regimm[inst.rt()],
        OP_COP0 => {
            if inst.rs() & 0x10 != 0 {
                tables.tlb[inst.funct() as usize]
            } else {
                tables.cop0[inst.rs()]
            }
        }
        OP_COP1 => match inst.rs() as u32 {
            COP1_BC => tables.bc1[inst.rt() & 0x3],
            rs if is_fpu_format(rs as u8) => tables.fpu[inst.funct() as usize],
            rs => tables.cop1[rs as usize],
        },
        op => tables.primary[op as usize],
    };
    op.info()
}

fn is_fpu_format(fmt: u8) -> bool {
    matches!(fmt, FMT_S | FMT_D | FMT_W | FMT_L)
}

/// Instruction decoder
///
/// Holds the byte-order policy used when fetching instruction words from
/// the stream. Decoding is otherwise a pure function of the address and the
/// stream contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    byte_order: ByteOrder,
}

impl Decoder {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self { byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Decode the instruction at `address`
    ///
    /// Fetch failures never error: the instruction comes back flagged
    /// `invalid` and the caller decides whether that is fatal.
    pub fn decode(&self, stream: &mut dyn MemoryBus, address: u64) -> DecodedInstruction {
        let last = !stream.is_mapped(address.wrapping_add(4), 4);

        match self.byte_order.read_u32(stream, address) {
            Ok(word) => {
                let mut decoded = self.decode_word(address, word);
                decoded.last = last;
                decoded
            }
            Err(_) => DecodedInstruction {
                address,
                inst: BinaryInstruction(0),
                opcode: null_opcode(),
                invalid: true,
                last: true,
                delay_slot: false,
            },
        }
    }

    /// Catalog entry for an instruction word
    pub fn resolve(inst: BinaryInstruction) -> &'static Opcode {
        resolve(inst)
    }

    /// Decode an already-fetched word
    pub fn decode_word(&self, address: u64, word: u32) -> DecodedInstruction {
        let inst = BinaryInstruction(word);
        let opcode = resolve(inst);
        DecodedInstruction {
            address,
            inst,
            opcode,
            invalid: opcode.is_null(),
            last: false,
            delay_slot: false,
        }
    }
}

/// Operand fields for [`encode`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fields {
    pub rs: u8,
    pub rt: u8,
    pub rd: u8,
    pub sa: u8,
    pub imm: u16,
    pub target: u32,
    /// COP1 format; only used by arithmetic/compare opcodes
    pub fmt: u8,
}

impl Fields {
    /// Extract every field of an existing word
    pub fn of(inst: BinaryInstruction) -> Self {
        Self {
            rs: inst.rs() as u8,
            rt: inst.rt() as u8,
            rd: inst.rd() as u8,
            sa: inst.sa() as u8,
            imm: inst.imm(),
            target: inst.target(),
            fmt: inst.fmt(),
        }
    }
}

/// Encode an opcode and its operands into an instruction word
///
/// Returns `None` for opcodes without an encoding (the null opcode).
pub fn encode(op: Op, f: Fields) -> Option<u32> {
    let rs = (f.rs as u32 & 0x1F) << 21;
    let rt = (f.rt as u32 & 0x1F) << 16;
    let rd = (f.rd as u32 & 0x1F) << 11;
    let sa = (f.sa as u32 & 0x1F) << 6;
    let imm = f.imm as u32;

    let word = match op.info().encoding {
        Encoding::None => return None,
        Encoding::Primary(p) => {
            let p = (p as u32) << 26;
            if op.info().operands == OperandType::Jump {
                p | (f.target & 0x03FF_FFFF)
            } else {
                p | rs | rt | imm
            }
        }
        Encoding::Special(funct) => rs | rt | rd | sa | funct as u32,
        Encoding::RegImm(r) => (OP_REGIMM << 26) | rs | ((r as u32) << 16) | imm,
        Encoding::Cop0(r) => (OP_COP0 << 26) | ((r as u32) << 21) | rt | rd,
        Encoding::Tlb(funct) => (OP_COP0 << 26) | (0x10 << 21) | funct as u32,
        Encoding::Cop1(r) => (OP_COP1 << 26) | ((r as u32) << 21) | rt | rd,
        Encoding::Bc1(c) => (OP_COP1 << 26) | (COP1_BC << 21) | ((c as u32) << 16) | imm,
        Encoding::Fpu(funct) => {
            let fmt = if is_fpu_format(f.fmt) { f.fmt } else { FMT_S };
            (OP_COP1 << 26) | ((fmt as u32) << 21) | rt | rd | sa | funct as u32
        }
    };
    Some(word)
}
