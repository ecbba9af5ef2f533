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
//! Random programs run on the interpreter and on the recompiler must leave
//! the same architectural state behind.
//!
//! Programs only branch forward and end in a `b .` loop, so both engines
//! are run until PC reaches that loop. Faulting instructions are skipped by
//! the handler from [`Rig::install_skip_handler`]; they are never placed in
//! a delay slot, where skipping would re-run the slot.

use super::*;
use crate::core::cpu::tests::*;
use crate::core::memory::WriteRecord;
use proptest::prelude::*;

const DATA: u16 = 0x2000;
const STEP_LIMIT: usize = 20_000;

const J: u32 = 0x02;
const JAL: u32 = 0x03;
const SLTIU: u32 = 0x0B;
const XORI: u32 = 0x0E;
const BLEZL: u32 = 0x16;
const BGTZL: u32 = 0x17;
const SWL: u32 = 0x2A;
const SWR: u32 = 0x2E;

const SRLV: u32 = 0x06;
const SRAV: u32 = 0x07;
const MTHI: u32 = 0x11;
const MTLO: u32 = 0x13;
const DSLLV: u32 = 0x14;
const DSRLV: u32 = 0x16;
const DSRAV: u32 = 0x17;
const DMULT: u32 = 0x1C;
const DSUB: u32 = 0x2E;
const DSUBU: u32 = 0x2F;
const DSLL: u32 = 0x38;
const DSRL: u32 = 0x3A;
const DSRA: u32 = 0x3B;
const DSRL32: u32 = 0x3E;
const DSRA32: u32 = 0x3F;

/// Cause bits compared between engines: BD and ExcCode
const CAUSE_COMPARED: u64 = (1 << 31) | 0x7C;

#[derive(Debug, Clone)]
enum Item {
    Op(u32),
    /// Branch or jump to the item `skip` places after the next one
    Branch {
        word: u32,
        skip: usize,
        slot: u32,
        absolute: bool,
    },
}

fn dest() -> impl Strategy<Value = usize> {
    1usize..26
}

fn src() -> impl Strategy<Value = usize> {
    0usize..32
}

/// Instructions that never raise an exception
fn safe_op() -> impl Strategy<Value = u32> {
    prop_oneof![
        (
            prop::sample::select(vec![ADDU, SUBU, AND, OR, XOR, NOR, SLT, SLTU, SLLV, SRLV, SRAV]),
            src(),
            src(),
            dest()
        )
            .prop_map(|(funct, rs, rt, rd)| reg(funct, rs, rt, rd)),
        (prop::sample::select(vec![SLL, SRL, SRA]), src(), dest(), 0u32..32)
            .prop_map(|(funct, rt, rd, sa)| shift(funct, rt, rd, sa)),
        (
            prop::sample::select(vec![ADDIU, ANDI, ORI, XORI, SLTI, SLTIU]),
            src(),
            dest(),
            any::<u16>()
        )
            .prop_map(|(op, rs, rt, value)| imm(op, rs, rt, value)),
        (dest(), any::<u16>()).prop_map(|(rt, value)| imm(LUI, 0, rt, value)),
        (prop::sample::select(vec![MFHI, MFLO]), dest()).prop_map(|(funct, rd)| reg(funct, 0, 0, rd)),
    ]
}

/// Instructions that may trap, fault, or be reserved in 32-bit mode
fn faulting_op() -> impl Strategy<Value = u32> {
    prop_oneof![
        (
            prop::sample::select(vec![ADD, SUB, DADD, DADDU, DSUB, DSUBU, DSLLV, DSRLV, DSRAV]),
            src(),
            src(),
            dest()
        )
            .prop_map(|(funct, rs, rt, rd)| reg(funct, rs, rt, rd)),
        (
            prop::sample::select(vec![DSLL, DSRL, DSRA, DSLL32, DSRL32, DSRA32]),
            src(),
            dest(),
            0u32..32
        )
            .prop_map(|(funct, rt, rd, sa)| shift(funct, rt, rd, sa)),
        (prop::sample::select(vec![ADDI, DADDIU]), src(), dest(), any::<u16>())
            .prop_map(|(op, rs, rt, value)| imm(op, rs, rt, value)),
        (
            prop::sample::select(vec![MULT, MULTU, DIV, DIVU, DMULT, DMULTU, DDIV, DDIVU]),
            src(),
            src()
        )
            .prop_map(|(funct, rs, rt)| reg(funct, rs, rt, 0)),
        (prop::sample::select(vec![MTHI, MTLO]), src()).prop_map(|(funct, rs)| reg(funct, rs, 0, 0)),
        (
            prop::sample::select(vec![LB, LBU, LH, LHU, LW, LWU, LD, LWL, LWR]),
            dest(),
            0u16..0x100
        )
            .prop_map(|(op, rt, off)| imm(op, 0, rt, DATA + off)),
        (prop::sample::select(vec![SB, SH, SW, SD, SWL, SWR]), src(), 0u16..0x100)
            .prop_map(|(op, rt, off)| imm(op, 0, rt, DATA + off)),
        Just(SYSCALL),
        (src(), src()).prop_map(|(rs, rt)| reg(TEQ, rs, rt, 0)),
        (src(), 0usize..32).prop_map(|(rt, fs)| cop1(4, rt, fs)),
        (dest(), 0usize..32).prop_map(|(rt, fs)| cop1(0, rt, fs)),
    ]
}

/// Conditional branch with its offset field left zero
fn branch_word() -> impl Strategy<Value = u32> {
    prop_oneof![
        (prop::sample::select(vec![BEQ, BNE, BEQL, BNEL]), src(), src())
            .prop_map(|(op, rs, rt)| imm(op, rs, rt, 0)),
        (prop::sample::select(vec![BLEZ, BGTZ, BLEZL, BGTZL]), src())
            .prop_map(|(op, rs)| imm(op, rs, 0, 0)),
        (prop::sample::select(vec![0x00, 0x01, 0x02, 0x03, 0x10, 0x11]), src())
            .prop_map(|(code, rs)| regimm(code, rs, 0)),
    ]
}

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![
        4 => safe_op().prop_map(Item::Op),
        4 => faulting_op().prop_map(Item::Op),
        2 => (branch_word(), 0usize..4, safe_op()).prop_map(|(word, skip, slot)| Item::Branch {
            word,
            skip,
            slot,
            absolute: false,
        }),
        1 => (prop::sample::select(vec![J, JAL]), 0usize..4, safe_op()).prop_map(
            |(op, skip, slot)| Item::Branch {
                word: op,
                skip,
                slot,
                absolute: true,
            }
        ),
    ]
}

/// Lay out `items` at [`CODE`] followed by the final loop
///
/// # Returns
/// The program words and the address of the final loop
fn assemble(items: &[Item]) -> (Vec<u32>, u64) {
    let mut positions = Vec::with_capacity(items.len() + 1);
    let mut at = 0u64;
    for item in items {
        positions.push(at);
        at += match item {
            Item::Op(_) => 1,
            Item::Branch { .. } => 2,
        };
    }
    positions.push(at);
    let end = CODE + 4 * at;

    let mut words = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match *item {
            Item::Op(word) => words.push(word),
            Item::Branch {
                word,
                skip,
                slot,
                absolute,
            } => {
                let from = CODE + 4 * positions[i];
                let to = CODE + 4 * positions[(i + 1 + skip).min(items.len())];
                words.push(if absolute {
                    jump(word, to)
                } else {
                    word | offset(from, to) as u32
                });
                words.push(slot);
            }
        }
    }
    words.push(imm(BEQ, 0, 0, 0xFFFF));
    words.push(NOP);
    (words, end)
}

fn prepare(mode64: bool, words: &[u32], seeds: &[u64], hilo: (u64, u64)) -> Rig {
    let mut rig = Rig::with_mode(mode64, words);
    rig.install_skip_handler();

    for (index, &seed) in seeds.iter().enumerate() {
        let value = if mode64 {
            seed
        } else {
            seed as u32 as i32 as i64 as u64
        };
        rig.set_gpr(index + 1, value);
    }
    rig.cpu.state.set_hi(hilo.0);
    rig.cpu.state.set_lo(hilo.1);

    for i in 0..0x42u64 {
        let word = (i as u32).wrapping_mul(0x9E37_79B9);
        rig.mem.store(BASE + DATA as u64 + 4 * i, 4, word as u64).unwrap();
    }
    rig.mem.enable_write_trace();
    rig
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    gprs: [u64; 32],
    hi: u64,
    lo: u64,
    fprs: [u64; 32],
    epc: u64,
    cause: u64,
    status: u64,
    writes: Vec<WriteRecord>,
}

impl Snapshot {
    fn of(rig: &Rig) -> Self {
        Self {
            gprs: *rig.cpu.state.gprs(),
            hi: rig.cpu.state.hi(),
            lo: rig.cpu.state.lo(),
            fprs: *rig.cpu.state.fprs(),
            epc: rig.cpu.cop0.epc(),
            cause: rig.cpu.cop0.cause() & CAUSE_COMPARED,
            status: rig.cpu.cop0.read(crate::core::cpu::Cop0::STATUS),
            writes: rig.mem.write_trace().to_vec(),
        }
    }
}

fn interpret(rig: &mut Rig, end: u64) {
    let end = rig.at(end);
    for _ in 0..STEP_LIMIT {
        if rig.cpu.pc() == end {
            return;
        }
        rig.cpu.step(&mut rig.mem).unwrap();
    }
    panic!("interpreter did not reach 0x{:016X}", end);
}

fn compare(mode64: bool, items: &[Item], seeds: &[u64], hilo: (u64, u64), engine: &mut RecompilerEngine) {
    let (words, end) = assemble(items);
    compare_program(mode64, &words, end, seeds, hilo, engine);
}

fn compare_program(
    mode64: bool,
    words: &[u32],
    end: u64,
    seeds: &[u64],
    hilo: (u64, u64),
    engine: &mut RecompilerEngine,
) {
    let mut reference = prepare(mode64, words, seeds, hilo);
    interpret(&mut reference, end);

    let mut compiled = prepare(mode64, words, seeds, hilo);
    run_until(engine, &mut compiled, end, STEP_LIMIT);

    assert_eq!(Snapshot::of(&compiled), Snapshot::of(&reference));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_recompiler_matches_interpreter(
        mode64 in any::<bool>(),
        items in prop::collection::vec(item(), 1..48),
        seeds in prop::collection::vec(any::<u64>(), 25),
        hilo in any::<(u64, u64)>(),
        hot in 0usize..=24,
    ) {
        let mut engine = engine_with(|config| {
            config.mode64 = mode64;
            config.hot_registers = hot;
        });
        compare(mode64, &items, &seeds, hilo, &mut engine);
    }

    #[test]
    fn test_fallback_only_matches_interpreter(
        mode64 in any::<bool>(),
        items in prop::collection::vec(item(), 1..32),
        seeds in prop::collection::vec(any::<u64>(), 25),
        hilo in any::<(u64, u64)>(),
    ) {
        let mut engine = engine_with(|config| config.mode64 = mode64).with_fallback_only();
        compare(mode64, &items, &seeds, hilo, &mut engine);
    }

    #[test]
    fn test_short_blocks_match_interpreter(
        items in prop::collection::vec(item(), 1..32),
        seeds in prop::collection::vec(any::<u64>(), 25),
        max in 2usize..6,
    ) {
        let mut engine = engine_with(|config| config.max_block_instructions = max);
        compare(true, &items, &seeds, (0, 0), &mut engine);
    }
}

#[test]
fn test_nullified_slot_then_fault_matches() {
    let items = [
        Item::Branch {
            word: imm(BEQL, 8, 9, 0),
            skip: 0,
            slot: imm(ADDIU, 0, 10, 1),
            absolute: false,
        },
        Item::Op(reg(ADD, 11, 11, 12)),
        Item::Op(SYSCALL),
        Item::Op(imm(SW, 12, 0, 0)),
    ];
    let seeds: Vec<u64> = (1..=25).map(|r| if r == 11 { 0x7FFF_FFFF } else { r }).collect();
    compare(true, &items, &seeds, (0, 0), &mut engine());
}

/// Seeds with t0 holding `word` and t1 pointing at the program
fn code_pointer_seeds(word: u32) -> Vec<u64> {
    (1..=25u64)
        .map(|r| match r {
            8 => word as u64,
            9 => CODE,
            _ => r,
        })
        .collect()
}

#[test]
fn test_store_into_same_block_matches() {
    let items = [
        Item::Op(imm(SW, 9, 8, 12)),
        Item::Op(NOP),
        Item::Op(imm(ADDIU, 11, 11, 1)),
        Item::Op(imm(ADDIU, 0, 10, 1)),
    ];
    let seeds = code_pointer_seeds(imm(ADDIU, 0, 10, 2));
    compare(true, &items, &seeds, (0, 0), &mut engine());
    compare(true, &items, &seeds, (0, 0), &mut engine().with_fallback_only());
}

#[test]
fn test_store_into_cached_block_matches() {
    let sub = CODE + 0x20;
    let words = [
        jump(JAL, sub),
        NOP,
        imm(SW, 9, 8, 0x20), // patch the first word of `sub`
        jump(JAL, sub),
        NOP,
        imm(BEQ, 0, 0, 0xFFFF),
        NOP,
        NOP,
        imm(ADDIU, 10, 10, 1), // sub
        reg(JR, 31, 0, 0),
        NOP,
    ];
    let seeds = code_pointer_seeds(imm(ADDIU, 10, 10, 0x10));
    for max in [2, 256] {
        let mut engine = engine_with(|config| config.max_block_instructions = max);
        compare_program(true, &words, CODE + 0x14, &seeds, (0, 0), &mut engine);
    }

    // Both engines run the patched routine on the second call
    let mut rig = prepare(true, &words, &seeds, (0, 0));
    run_until(&mut engine(), &mut rig, CODE + 0x14, 50);
    assert_eq!(rig.gpr(10), 10 + 1 + 0x10);
}
