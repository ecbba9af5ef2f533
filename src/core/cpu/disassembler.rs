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

//! MIPS instruction disassembler for debugging
//!
//! Renders decoded instructions as assembly text. Operand layout comes from
//! the catalog entry's [`OperandType`], so every catalogued opcode
//! disassembles without a per-opcode table.

use super::alu;
use super::decode::{DecodedInstruction, Decoder, FMT_D, FMT_L, FMT_S, FMT_W};
use super::opcode::{Encoding, OperandType};
use crate::core::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// o32 ABI register names
const GPR_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];

/// Address-to-label map consulted for diagnostics only
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: BTreeMap<u64, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u64, name: impl Into<String>) {
        self.symbols.insert(Self::canonical(address), name.into());
    }

    /// Label at `address`, if any
    ///
    /// KSEG1 (uncached) addresses resolve to the KSEG0 label of the same
    /// physical location.
    pub fn lookup(&self, address: u64) -> Option<&str> {
        self.symbols
            .get(&Self::canonical(address))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Parse a symbol file with one `ADDRESS NAME` pair per line
    ///
    /// Addresses are hexadecimal with an optional `0x` prefix. Blank lines
    /// and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(addr), Some(name)) = (parts.next(), parts.next()) else {
                continue;
            };
            let addr = addr.trim_start_matches("0x").trim_start_matches("0X");
            match u64::from_str_radix(addr, 16) {
                Ok(address) => table.insert(address, name),
                Err(_) => log::warn!("Skipping malformed symbol line: {}", line),
            }
        }
        table
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    fn canonical(address: u64) -> u64 {
        let low = address & 0xFFFF_FFFF;
        if low & 0xE000_0000 == 0xA000_0000 {
            (low & 0x1FFF_FFFF) | 0x8000_0000
        } else {
            low
        }
    }
}

/// Instruction disassembler
///
/// # Example
/// ```
/// use r4300::core::cpu::Disassembler;
///
/// assert_eq!(Disassembler::disassemble_word(0x0000_0000, 0x8000_0000), "nop");
/// assert_eq!(
///     Disassembler::disassemble_word(0x3C01_1234, 0x8000_0000),
///     "lui at, 0x1234"
/// );
/// ```
pub struct Disassembler;

impl Disassembler {
    /// Disassemble a decoded instruction without symbol labels
    pub fn disassemble(decoded: &DecodedInstruction) -> String {
        Self::disassemble_with(decoded, None)
    }

    /// Disassemble a raw word as if fetched from `address`
    pub fn disassemble_word(word: u32, address: u64) -> String {
        let decoded = Decoder::default().decode_word(address, word);
        Self::disassemble(&decoded)
    }

    /// Disassemble a decoded instruction
    ///
    /// Statically targeted branches and jumps show their destination as
    /// ` ----> 0xXXXXXXXX` unless the address has a label, in which case
    /// the label is prefixed as `<name> `.
    ///
    /// # Arguments
    ///
    /// * `decoded` - The instruction to render
    /// * `symbols` - Optional symbol table for labels
    pub fn disassemble_with(decoded: &DecodedInstruction, symbols: Option<&SymbolTable>) -> String {
        if decoded.invalid {
            return format!(".word 0x{:08X}", decoded.inst.word());
        }
        if decoded.inst.is_nop() {
            return "nop".to_string();
        }

        let label = symbols.and_then(|s| s.lookup(decoded.address));
        let mnemonic = Self::mnemonic(decoded);
        let operands = Self::operands(decoded);

        let mut text = if operands.is_empty() {
            mnemonic
        } else {
            format!("{} {}", mnemonic, operands)
        };

        match label {
            Some(name) => text = format!("<{}> {}", name, text),
            None => {
                if let Some(target) = alu::static_target(decoded) {
                    text.push_str(&format!(" ----> 0x{:08X}", target as u32));
                }
            }
        }
        text
    }

    /// Mnemonic with the COP1 format suffix appended where one applies
    fn mnemonic(decoded: &DecodedInstruction) -> String {
        let opcode = decoded.opcode;
        if !matches!(opcode.encoding, Encoding::Fpu(_)) {
            return opcode.name.to_string();
        }
        let suffix = match decoded.inst.fmt() {
            FMT_S => "s",
            FMT_D => "d",
            FMT_W => "w",
            FMT_L => "l",
            _ => "?",
        };
        format!("{}.{}", opcode.name, suffix)
    }

    fn operands(decoded: &DecodedInstruction) -> String {
        let inst = decoded.inst;
        let rs = GPR_NAMES[inst.rs()];
        let rt = GPR_NAMES[inst.rt()];
        let rd = GPR_NAMES[inst.rd()];
        let imm = inst.imm();

        match decoded.opcode.operands {
            OperandType::Jump => format!("0x{:07X}", inst.target() << 2),
            OperandType::Branch => format!("{}, {}, 0x{:04X}", rs, rt, imm),
            OperandType::BranchZ => format!("{}, 0x{:04X}", rs, imm),
            OperandType::Bc1 => format!("0x{:04X}", imm),
            OperandType::ITsi => format!("{}, {}, 0x{:04X}", rt, rs, imm),
            OperandType::ITi => format!("{}, 0x{:04X}", rt, imm),
            OperandType::ITis => format!("{}, 0x{:04X}({})", rt, imm, rs),
            OperandType::ISi => format!("{}, 0x{:04X}", rs, imm),
            OperandType::IFtis => format!("f{}, 0x{:04X}({})", inst.ft(), imm, rs),
            OperandType::Cache => format!("0x{:02X}, 0x{:04X}({})", inst.rt(), imm, rs),
            OperandType::Cop0 => format!("{}, cop0[{}]", rt, inst.rd()),
            OperandType::Cop1 => format!("{}, f{}", rt, inst.fs()),
            OperandType::Cop1Ctl => format!("{}, fcr{}", rt, inst.rd()),
            OperandType::RDta => format!("{}, {}, {}", rd, rt, inst.sa()),
            OperandType::RDts => format!("{}, {}, {}", rd, rt, rs),
            OperandType::RS => rs.to_string(),
            OperandType::RDs => format!("{}, {}", rd, rs),
            OperandType::RD => rd.to_string(),
            OperandType::RSt => format!("{}, {}", rs, rt),
            OperandType::RDst => format!("{}, {}, {}", rd, rs, rt),
            OperandType::Code => {
                let code = inst.code();
                if code == 0 {
                    String::new()
                } else {
                    format!("0x{:X}", code)
                }
            }
            OperandType::TrapWithCode => format!("{}, {}", rs, rt),
            OperandType::FpuBinary => format!("f{}, f{}, f{}", inst.fd(), inst.fs(), inst.ft()),
            OperandType::FpuUnary => format!("f{}, f{}", inst.fd(), inst.fs()),
            OperandType::FpuCompare => format!("f{}, f{}", inst.fs(), inst.ft()),
            OperandType::Sync | OperandType::Tlb | OperandType::Empty => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_target_arrow() {
        // beq a0, a1, +4 at 0x80000010 -> 0x80000024
        let text = Disassembler::disassemble_word(0x1085_0004, 0x8000_0010);
        assert_eq!(text, "beq a0, a1, 0x0004 ----> 0x80000024");
    }

    #[test]
    fn test_register_jump_has_no_arrow() {
        // jr ra
        assert_eq!(Disassembler::disassemble_word(0x03E0_0008, 0x8000_0000), "jr ra");
    }

    #[test]
    fn test_fpu_format_suffix() {
        // add.s f0, f1, f2
        let word = (0x11 << 26) | (16 << 21) | (2 << 16) | (1 << 11);
        assert_eq!(
            Disassembler::disassemble_word(word, 0x8000_0000),
            "add.s f0, f1, f2"
        );
    }

    #[test]
    fn test_symbol_label_replaces_arrow() {
        let symbols = SymbolTable::parse("# comment\n80000010 loop\n0xA0000020 other\n");
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.lookup(0x8000_0020), Some("other"));
        assert_eq!(symbols.lookup(0xA000_0010), Some("loop"));

        let decoded = Decoder::default().decode_word(0x8000_0010, 0x1000_FFFF);
        assert_eq!(
            Disassembler::disassemble_with(&decoded, Some(&symbols)),
            "<loop> beq zero, zero, 0xFFFF"
        );
    }
}
