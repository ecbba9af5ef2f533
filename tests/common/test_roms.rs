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
//! Small hand-assembled test programs
//!
//! Each program ends in a `b .` loop whose address is returned by the
//! matching `*_done` function.

/// Where programs are loaded
pub const PROGRAM_BASE: u64 = 0x8000_1000;

/// General exception vector
pub const EXCEPTION_VECTOR: u64 = 0x8000_0180;

/// Data area used by the copy program
pub const COPY_SOURCE: u64 = 0x8000_2000;
pub const COPY_DEST: u64 = 0x8000_3000;

/// Sum of 1..=10 into $2
#[allow(dead_code)]
pub fn test_program_sum() -> Vec<u32> {
    vec![
        0x2408000A, // ADDIU $8, $0, 10
        0x00001021, // ADDU  $2, $0, $0
        0x00481021, // ADDU  $2, $2, $8      ; loop
        0x2508FFFF, // ADDIU $8, $8, -1
        0x1500FFFD, // BNE   $8, $0, loop
        0x00000000, // NOP (delay slot)
        0x1000FFFF, // B     .
        0x00000000, // NOP
    ]
}

#[allow(dead_code)]
pub fn test_program_sum_done() -> u64 {
    PROGRAM_BASE + 0x18
}

/// Copy 8 words from COPY_SOURCE to COPY_DEST
#[allow(dead_code)]
pub fn test_program_copy() -> Vec<u32> {
    vec![
        0x3C048000, // LUI   $4, 0x8000
        0x34842000, // ORI   $4, $4, 0x2000  ; source
        0x3C058000, // LUI   $5, 0x8000
        0x34A53000, // ORI   $5, $5, 0x3000  ; destination
        0x24060008, // ADDIU $6, $0, 8       ; word count
        0x8C880000, // LW    $8, 0($4)       ; loop
        0x24840004, // ADDIU $4, $4, 4
        0xACA80000, // SW    $8, 0($5)
        0x24C6FFFF, // ADDIU $6, $6, -1
        0x14C0FFFB, // BNE   $6, $0, loop
        0x24A50004, // ADDIU $5, $5, 4       ; delay slot
        0x1000FFFF, // B     .
        0x00000000, // NOP
    ]
}

#[allow(dead_code)]
pub fn test_program_copy_done() -> u64 {
    PROGRAM_BASE + 0x2C
}

/// Three SYSCALLs in a loop; the handler counts them in $16
#[allow(dead_code)]
pub fn test_program_syscall() -> Vec<u32> {
    vec![
        0x24080003, // ADDIU   $8, $0, 3
        0x0000000C, // SYSCALL               ; loop
        0x2508FFFF, // ADDIU   $8, $8, -1
        0x1500FFFD, // BNE     $8, $0, loop
        0x00000000, // NOP (delay slot)
        0x1000FFFF, // B       .
        0x00000000, // NOP
    ]
}

#[allow(dead_code)]
pub fn test_program_syscall_done() -> u64 {
    PROGRAM_BASE + 0x14
}

/// Handler that skips the faulting instruction and counts in $16
#[allow(dead_code)]
pub fn test_handler_count_and_skip() -> Vec<u32> {
    vec![
        0x401A7000, // MFC0  $26, EPC
        0x275A0004, // ADDIU $26, $26, 4
        0x409A7000, // MTC0  $26, EPC
        0x26100001, // ADDIU $16, $16, 1
        0x42000018, // ERET
    ]
}

/// JAL into a leaf function, then an untaken BEQL over a nullified slot
#[allow(dead_code)]
pub fn test_program_call() -> Vec<u32> {
    vec![
        0x24040005, // ADDIU $4, $0, 5
        0x0C000408, // JAL   func
        0x24050007, // ADDIU $5, $0, 7       ; delay slot
        0x50400002, // BEQL  $2, $0, done
        0x24090001, // ADDIU $9, $0, 1       ; nullified
        0x240A0002, // ADDIU $10, $0, 2
        0x1000FFFF, // B     .               ; done
        0x00000000, // NOP
        0x03E00008, // JR    $31             ; func
        0x00851021, // ADDU  $2, $4, $5      ; delay slot
    ]
}

#[allow(dead_code)]
pub fn test_program_call_done() -> u64 {
    PROGRAM_BASE + 0x18
}

/// ADD overflow, ADDU wrap and a divide by zero
#[allow(dead_code)]
pub fn test_program_faults() -> Vec<u32> {
    vec![
        0x3C087FFF, // LUI   $8, 0x7FFF
        0x3508FFFF, // ORI   $8, $8, 0xFFFF
        0x24090001, // ADDIU $9, $0, 1
        0x01095020, // ADD   $10, $8, $9     ; overflow
        0x01095821, // ADDU  $11, $8, $9
        0x0100001A, // DIV   $8, $0
        0x00006012, // MFLO  $12
        0x00006810, // MFHI  $13
        0x1000FFFF, // B     .
        0x00000000, // NOP
    ]
}

#[allow(dead_code)]
pub fn test_program_faults_done() -> u64 {
    PROGRAM_BASE + 0x20
}
