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

//! CPU test modules
//!
//! Tests are organized into the following categories:
//! - `basic`: construction, reset, register access, PC handling
//! - `decode`: instruction decoding and encoding
//! - `arithmetic`: ALU, shifts, overflow traps
//! - `divide`: multiply/divide and the divide-by-zero results
//! - `branch`: delay slots, likely branches, links
//! - `memory`: loads, stores, unaligned and linked accesses
//! - `exceptions`: exception entry, vectors, interrupts, ERET
//! - `cop0`: COP0 moves and timer
//! - `fpu`: COP1 moves and arithmetic
//!
//! The helpers below are shared with the recompiler tests.

use super::decode::Decoder;
use super::Interpreter;
use crate::core::memory::{ByteOrder, DataMemory, FlatMemory};



#[cfg(test)]
mod branch;







/// KSEG0 base, sign-extended
pub(crate) const BASE: u64 = 0xFFFF_FFFF_8000_0000;
/// Where test programs are placed
pub(crate) const CODE: u64 = BASE + 0x400;
/// General exception vector
pub(crate) const VECTOR: u64 = BASE + 0x180;

pub(crate) const NOP: u32 = 0;
pub(crate) const ERET: u32 = 0x4200_0018;
pub(crate) const SYSCALL: u32 = 0x0000_000C;

// Primary opcodes used by the encoders
pub(crate) const ADDI: u32 = 0x08;
pub(crate) const ADDIU: u32 = 0x09;
pub(crate) const SLTI: u32 = 0x0A;
pub(crate) const ANDI: u32 = 0x0C;
pub(crate) const ORI: u32 = 0x0D;
pub(crate) const LUI: u32 = 0x0F;
pub(crate) const BEQ: u32 = 0x04;
pub(crate) const BNE: u32 = 0x05;
pub(crate) const BLEZ: u32 = 0x06;
pub(crate) const BGTZ: u32 = 0x07;
pub(crate) const BEQL: u32 = 0x14;
pub(crate) const BNEL: u32 = 0x15;
pub(crate) const DADDIU: u32 = 0x19;
pub(crate) const LB: u32 = 0x20;
pub(crate) const LH: u32 = 0x21;
pub(crate) const LWL: u32 = 0x22;
pub(crate) const LW: u32 = 0x23;
pub(crate) const LBU: u32 = 0x24;
pub(crate) const LHU: u32 = 0x25;
pub(crate) const LWR: u32 = 0x26;
pub(crate) const LWU: u32 = 0x27;
pub(crate) const SB: u32 = 0x28;
pub(crate) const SH: u32 = 0x29;
pub(crate) const SW: u32 = 0x2B;
pub(crate) const LL: u32 = 0x30;
pub(crate) const LWC1: u32 = 0x31;
pub(crate) const LD: u32 = 0x37;
pub(crate) const SC: u32 = 0x38;
pub(crate) const SWC1: u32 = 0x39;
pub(crate) const SD: u32 = 0x3F;

// SPECIAL function codes
pub(crate) const SLL: u32 = 0x00;
pub(crate) const SRL: u32 = 0x02;
pub(crate) const SRA: u32 = 0x03;
pub(crate) const SLLV: u32 = 0x04;
pub(crate) const JR: u32 = 0x08;
pub(crate) const JALR: u32 = 0x09;
pub(crate) const BREAK: u32 = 0x0D;
pub(crate) const MFHI: u32 = 0x10;
pub(crate) const MFLO: u32 = 0x12;
pub(crate) const MULT: u32 = 0x18;
pub(crate) const MULTU: u32 = 0x19;
pub(crate) const DIV: u32 = 0x1A;
pub(crate) const DIVU: u32 = 0x1B;
pub(crate) const DMULTU: u32 = 0x1D;
pub(crate) const DDIV: u32 = 0x1E;
pub(crate) const DDIVU: u32 = 0x1F;
pub(crate) const ADD: u32 = 0x20;
pub(crate) const ADDU: u32 = 0x21;
pub(crate) const SUB: u32 = 0x22;
pub(crate) const SUBU: u32 = 0x23;
pub(crate) const AND: u32 = 0x24;
pub(crate) const OR: u32 = 0x25;
pub(crate) const XOR: u32 = 0x26;
pub(crate) const NOR: u32 = 0x27;
pub(crate) const SLT: u32 = 0x2A;
pub(crate) const SLTU: u32 = 0x2B;
pub(crate) const DADD: u32 = 0x2C;
pub(crate) const DADDU: u32 = 0x2D;
pub(crate) const TEQ: u32 = 0x34;
pub(crate) const DSLL32: u32 = 0x3C;

/// I-type word: `op rt, rs, imm`
pub(crate) fn imm(op: u32, rs: usize, rt: usize, imm: u16) -> u32 {
    (op << 26) | ((rs as u32) << 21) | ((rt as u32) << 16) | imm as u32
}

/// SPECIAL R-type word: `funct rd, rs, rt`
pub(crate) fn reg(funct: u32, rs: usize, rt: usize, rd: usize) -> u32 {
    ((rs as u32) << 21) | ((rt as u32) << 16) | ((rd as u32) << 11) | funct
}

/// SPECIAL shift by constant: `funct rd, rt, sa`
pub(crate) fn shift(funct: u32, rt: usize, rd: usize, sa: u32) -> u32 {
    ((rt as u32) << 16) | ((rd as u32) << 11) | ((sa & 0x1F) << 6) | funct
}

/// REGIMM word (BLTZ, BGEZAL, TEQI...)
pub(crate) fn regimm(code: u32, rs: usize, offset: u16) -> u32 {
    (0x01 << 26) | ((rs as u32) << 21) | (code << 16) | offset as u32
}

/// J / JAL to an absolute address in the same 256MB region
pub(crate) fn jump(op: u32, target: u64) -> u32 {
    (op << 26) | ((target >> 2) as u32 & 0x03FF_FFFF)
}

/// COP0 move: `mfc0 rt, rd` (code 0) / `mtc0 rt, rd` (code 4)
pub(crate) fn cop0(code: u32, rt: usize, rd: usize) -> u32 {
    (0x10 << 26) | (code << 21) | ((rt as u32) << 16) | ((rd as u32) << 11)
}

/// COP1 move: `mfc1` (0), `dmfc1` (1), `cfc1` (2), `mtc1` (4), `ctc1` (6)
pub(crate) fn cop1(code: u32, rt: usize, fs: usize) -> u32 {
    (0x11 << 26) | (code << 21) | ((rt as u32) << 16) | ((fs as u32) << 11)
}

/// COP1 arithmetic: `funct.fmt fd, fs, ft`
pub(crate) fn fpu(fmt: u32, funct: u32, fd: usize, fs: usize, ft: usize) -> u32 {
    (0x11 << 26) | (fmt << 21) | ((ft as u32) << 16) | ((fs as u32) << 11) | ((fd as u32) << 6) | funct
}

/// Branch offset field for a branch at `from` reaching `to`
pub(crate) fn offset(from: u64, to: u64) -> u16 {
    ((to.wrapping_sub(from).wrapping_sub(4) as i64) >> 2) as u16
}

/// Big-endian data memory over a 64KB flat store
pub(crate) fn memory() -> DataMemory {
    DataMemory::new(Box::new(FlatMemory::new(0x1_0000)), ByteOrder::Big)
}

/// Interpreter plus memory with a program loaded at [`CODE`]
pub(crate) struct Rig {
    pub cpu: Interpreter,
    pub mem: DataMemory,
}

impl Rig {
    /// 64-bit mode rig running `program`
    pub fn new(program: &[u32]) -> Self {
        Self::with_mode(true, program)
    }

    pub fn with_mode(mode64: bool, program: &[u32]) -> Self {
        let mut rig = Self {
            cpu: Interpreter::new(Decoder::default(), mode64),
            mem: memory(),
        };
        rig.load(CODE, program);
        rig.cpu.reset(CODE);
        rig
    }

    /// Store instruction words starting at `address`
    pub fn load(&mut self, address: u64, words: &[u32]) {
        for (i, &word) in words.iter().enumerate() {
            self.mem
                .store(address + 4 * i as u64, 4, word as u64)
                .unwrap();
        }
    }

    /// Install a handler at the general vector that skips the faulting
    /// instruction and returns
    pub fn install_skip_handler(&mut self) {
        self.load(
            VECTOR,
            &[
                cop0(0, 26, 14),             // mfc0 k0, EPC
                imm(ADDIU, 26, 26, 4),       // addiu k0, k0, 4
                cop0(4, 26, 14),             // mtc0 k0, EPC
                ERET,
            ],
        );
    }

    /// Execute `count` instructions
    pub fn run(&mut self, count: usize) {
        for _ in 0..count {
            self.cpu.step(&mut self.mem).unwrap();
        }
    }

    pub fn gpr(&self, index: usize) -> u64 {
        self.cpu.state.gpr64(index)
    }

    pub fn set_gpr(&mut self, index: usize, value: u64) {
        self.cpu.state.set_gpr64(index, value);
    }

    /// PC as the interpreter stores it for `address`
    pub fn at(&self, address: u64) -> u64 {
        self.cpu.normalize(address)
    }
}
