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

use super::super::*;
use super::*;

#[test]
fn test_taken_branch_executes_delay_slot() {
    // beq zero, zero, +3 ; addiu t0, zero, 1 ; addiu t1, zero, 1 ; ... target
    let target = CODE + 16;
    let mut rig = Rig::new(&[
        imm(BEQ, 0, 0, offset(CODE, target)),
        imm(ADDIU, 0, 8, 1),
        imm(ADDIU, 0, 9, 1),
        NOP,
        imm(ADDIU, 0, 10, 1),
    ]);

    rig.run(1);
    assert!(rig.cpu.in_delay_slot());
    assert_eq!(rig.cpu.pc(), CODE + 4);

    rig.run(1);
    assert_eq!(rig.gpr(8), 1, "delay slot must execute");
    assert_eq!(rig.cpu.pc(), target);

    rig.run(1);
    assert_eq!(rig.gpr(9), 0, "fall-through must be skipped");
    assert_eq!(rig.gpr(10), 1);
}

#[test]
fn test_untaken_branch_still_executes_delay_slot() {
    let mut rig = Rig::new(&[imm(BNE, 0, 0, 8), imm(ADDIU, 0, 8, 1), imm(ADDIU, 0, 9, 1)]);
    rig.run(3);
    assert_eq!(rig.gpr(8), 1);
    assert_eq!(rig.gpr(9), 1);
    assert_eq!(rig.cpu.pc(), CODE + 12);
}

#[test]
fn test_untaken_likely_branch_nullifies_delay_slot() {
    // beql zero, t0, +8 with t0 != 0
    let mut rig = Rig::new(&[imm(BEQL, 0, 8, 8), imm(ADDIU, 0, 9, 1), imm(ADDIU, 0, 10, 1)]);
    rig.set_gpr(8, 1);

    rig.run(1);
    assert!(rig.cpu.pending_nullify());
    assert_eq!(rig.cpu.step(&mut rig.mem).unwrap(), StepEvent::Nullified);
    assert_eq!(rig.gpr(9), 0);
    assert_eq!(rig.cpu.pc(), CODE + 8);

    rig.run(1);
    assert_eq!(rig.gpr(10), 1);
}

#[test]
fn test_taken_likely_branch_executes_delay_slot() {
    let target = CODE + 12;
    let mut rig = Rig::new(&[
        imm(BNEL, 0, 8, offset(CODE, target)),
        imm(ADDIU, 0, 9, 1),
        NOP,
        imm(ADDIU, 0, 10, 1),
    ]);
    rig.set_gpr(8, 1);

    rig.run(3);
    assert_eq!(rig.gpr(9), 1);
    assert_eq!(rig.gpr(10), 1);
}

#[test]
fn test_blez_bgtz_conditions() {
    for (value, blez_taken) in [(0u64, true), (u64::MAX, true), (1, false)] {
        let mut rig = Rig::new(&[imm(BLEZ, 8, 0, 3), NOP]);
        rig.set_gpr(8, value);
        rig.run(2);
        let expected = if blez_taken { CODE + 16 } else { CODE + 8 };
        assert_eq!(rig.cpu.pc(), expected, "blez with 0x{:X}", value);

        let mut rig = Rig::new(&[imm(BGTZ, 8, 0, 3), NOP]);
        rig.set_gpr(8, value);
        rig.run(2);
        let expected = if blez_taken { CODE + 8 } else { CODE + 16 };
        assert_eq!(rig.cpu.pc(), expected, "bgtz with 0x{:X}", value);
    }
}

#[test]
fn test_bltzal_links_even_when_not_taken() {
    let mut rig = Rig::new(&[regimm(16, 8, 4), NOP]);
    rig.set_gpr(8, 1);
    rig.run(2);
    assert_eq!(rig.gpr(31), CODE + 8);
    assert_eq!(rig.cpu.pc(), CODE + 8);
}

#[test]
fn test_bgezal_reads_ra_before_linking() {
    // bgezal ra, +3 with ra negative: not taken even though the link is positive
    let mut rig = Rig::new(&[regimm(17, 31, 3), NOP]);
    rig.set_gpr(31, u64::MAX);
    rig.run(2);
    assert_eq!(rig.cpu.pc(), CODE + 8);
    assert_eq!(rig.gpr(31), CODE + 8);
}

#[test]
fn test_jal_links_and_jumps() {
    let target = CODE + 0x100;
    let mut rig = Rig::new(&[jump(0x03, target), imm(ADDIU, 0, 8, 1)]);
    rig.run(2);
    assert_eq!(rig.gpr(31), CODE + 8);
    assert_eq!(rig.gpr(8), 1);
    assert_eq!(rig.cpu.pc(), target);
}

#[test]
fn test_jr_uses_register_target() {
    let mut rig = Rig::new(&[reg(JR, 8, 0, 0), NOP]);
    rig.set_gpr(8, CODE + 0x40);
    rig.run(2);
    assert_eq!(rig.cpu.pc(), CODE + 0x40);
}

#[test]
fn test_jalr_same_register_uses_old_value() {
    // jalr t0, t0
    let mut rig = Rig::new(&[reg(JALR, 8, 0, 8), NOP]);
    rig.set_gpr(8, CODE + 0x80);
    rig.run(2);
    assert_eq!(rig.cpu.pc(), CODE + 0x80);
    assert_eq!(rig.gpr(8), CODE + 8);
}

#[test]
fn test_branch_backwards_loop() {
    // loop: addiu t0, t0, 1 ; bne t0, t1, loop ; nop
    let mut rig = Rig::new(&[
        imm(ADDIU, 8, 8, 1),
        imm(BNE, 8, 9, offset(CODE + 4, CODE)),
        NOP,
    ]);
    rig.set_gpr(9, 5);
    rig.run(15);
    assert_eq!(rig.gpr(8), 5);
    assert_eq!(rig.cpu.pc(), CODE + 12);
}

#[test]
fn test_32bit_mode_branch_compares_sign_extended_words() {
    // bltz t0 with only the low word negative
    let mut rig = Rig::with_mode(false, &[regimm(0, 8, 3), NOP]);
    rig.set_gpr(8, 0x0000_0000_8000_0000);
    rig.run(2);
    assert_eq!(rig.cpu.pc(), 0x8000_0410);
}

#[test]
fn test_branch_breakpoint_reports_direction() {
    let mut rig = Rig::new(&[imm(BEQ, 0, 0, 3), NOP]);
    let mut debugger = Debugger::new();
    debugger.break_on_branches(true, false);
    rig.cpu.attach_debugger(debugger);

    assert_eq!(
        rig.cpu.step(&mut rig.mem).unwrap(),
        StepEvent::Breakpoint(BreakEvent::Branch {
            address: CODE,
            taken: true
        })
    );
    // The branch itself has retired; the delay slot is next
    assert!(rig.cpu.in_delay_slot());
}
