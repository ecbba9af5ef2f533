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

use bitflags::bitflags;

bitflags! {
    /// Status register (COP0 r12)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        /// Interrupt enable
        const IE = 1 << 0;
        /// Exception level
        const EXL = 1 << 1;
        /// Error level
        const ERL = 1 << 2;
        const KSU_SUPERVISOR = 1 << 3;
        const KSU_USER = 1 << 4;
        const UX = 1 << 5;
        const SX = 1 << 6;
        const KX = 1 << 7;
        /// Interrupt mask (IM0-IM7)
        const IM = 0xFF << 8;
        /// Bootstrap exception vectors
        const BEV = 1 << 22;
        /// 32 addressable 64-bit FPRs
        const FR = 1 << 26;
        const CU0 = 1 << 28;
        const CU1 = 1 << 29;
        const CU2 = 1 << 30;
        const CU3 = 1 << 31;

        const _ = !0;
    }
}

/// Exception codes stored in Cause.ExcCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ExceptionCause {
    /// Interrupt (external, software or timer)
    Interrupt = 0,
    /// TLB modification
    TlbModification = 1,
    /// TLB miss on load or fetch
    TlbLoad = 2,
    /// TLB miss on store
    TlbStore = 3,
    /// Address error on load or fetch
    AddressErrorLoad = 4,
    /// Address error on store
    AddressErrorStore = 5,
    /// Bus error on instruction fetch
    BusErrorInstruction = 6,
    /// Bus error on data access
    BusErrorData = 7,
    /// Syscall instruction executed
    Syscall = 8,
    /// Breakpoint instruction executed
    Breakpoint = 9,
    /// Reserved or illegal instruction
    ReservedInstruction = 10,
    /// Coprocessor unusable
    CoprocessorUnusable = 11,
    /// Arithmetic overflow
    Overflow = 12,
    /// Trap instruction condition met
    Trap = 13,
    /// Floating-point exception
    FloatingPoint = 15,
}

/// One TLB entry as seen through EntryHi/EntryLo0/EntryLo1/PageMask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlbEntry {
    pub page_mask: u64,
    pub entry_hi: u64,
    pub entry_lo0: u64,
    pub entry_lo1: u64,
}

impl TlbEntry {
    /// Global bit is the AND of both EntryLo G bits
    fn global(&self) -> bool {
        self.entry_lo0 & self.entry_lo1 & 1 != 0
    }
}

/// Coprocessor 0 (System Control)
///
/// Holds the exception state (Status, Cause, EPC, ErrorEPC, BadVAddr), the
/// Count/Compare timer and the TLB register file. Address translation is
/// left to the memory collaborator, so the TLB is storage only.
#[derive(Debug, Clone, PartialEq)]
pub struct Cop0 {
    regs: [u64; 32],
    tlb: [TlbEntry; 32],
    /// Count advances every other pipeline cycle
    half_cycle: bool,
}

impl Default for Cop0 {
    fn default() -> Self {
        Self::new()
    }
}

impl Cop0 {
    pub const INDEX: usize = 0;
    pub const RANDOM: usize = 1;
    pub const ENTRY_LO0: usize = 2;
    pub const ENTRY_LO1: usize = 3;
    pub const CONTEXT: usize = 4;
    pub const PAGE_MASK: usize = 5;
    pub const WIRED: usize = 6;
    /// Bad Virtual Address
    pub const BAD_VADDR: usize = 8;
    pub const COUNT: usize = 9;
    pub const ENTRY_HI: usize = 10;
    pub const COMPARE: usize = 11;
    /// Status Register
    pub const STATUS: usize = 12;
    /// Cause Register
    pub const CAUSE: usize = 13;
    /// Exception PC
    pub const EPC: usize = 14;
    /// Processor ID
    pub const PRID: usize = 15;
    pub const CONFIG: usize = 16;
    pub const LLADDR: usize = 17;
    pub const XCONTEXT: usize = 20;
    pub const ERROR_EPC: usize = 30;

    const STATUS_RESET: u32 = Status::CU0.bits() | Status::CU1.bits() | Status::IE.bits();
    const PRID_RESET: u64 = 0x0000_0B22;
    const CONFIG_RESET: u64 = 0x7006_E463;

    /// Cause register fields
    const CAUSE_BD: u64 = 1 << 31;
    const CAUSE_CE_SHIFT: u32 = 28;
    const CAUSE_CE_MASK: u64 = 0x3 << 28;
    const CAUSE_EXC_MASK: u64 = 0x1F << 2;
    /// Software-writable interrupt pending bits (IP0, IP1)
    const CAUSE_SW_MASK: u64 = 0x3 << 8;
    /// Timer interrupt (IP7)
    const CAUSE_IP7: u64 = 1 << 15;

    /// General exception vector (sign-extended KSEG0)
    pub const VECTOR_GENERAL: u64 = 0xFFFF_FFFF_8000_0180;
    /// General exception vector with Status.BEV set (KSEG1)
    pub const VECTOR_GENERAL_BEV: u64 = 0xFFFF_FFFF_BFC0_0380;

    pub fn new() -> Self {
        let mut cop0 = Self {
            regs: [0; 32],
            tlb: [TlbEntry::default(); 32],
            half_cycle: false,
        };
        cop0.reset();
        cop0
    }

    /// Reset registers to their power-on values
    pub fn reset(&mut self) {
        self.regs = [0; 32];
        self.regs[Self::STATUS] = Self::STATUS_RESET as u64;
        self.regs[Self::RANDOM] = 31;
        self.regs[Self::PRID] = Self::PRID_RESET;
        self.regs[Self::CONFIG] = Self::CONFIG_RESET;
        self.tlb = [TlbEntry::default(); 32];
        self.half_cycle = false;
    }

    /// Read a register as MFC0/DMFC0 sees it
    pub fn read(&self, index: usize) -> u64 {
        match index {
            Self::COUNT | Self::COMPARE => self.regs[index] & 0xFFFF_FFFF,
            _ => self.regs[index],
        }
    }

    /// Write a register as MTC0/DMTC0 does
    pub fn write(&mut self, index: usize, value: u64) {
        match index {
            Self::RANDOM | Self::PRID | Self::BAD_VADDR => {
                log::warn!("Ignoring write to read-only COP0 register {}", index);
            }
            Self::COUNT => {
                self.regs[index] = value & 0xFFFF_FFFF;
            }
            Self::COMPARE => {
                self.regs[index] = value & 0xFFFF_FFFF;
                self.regs[Self::CAUSE] &= !Self::CAUSE_IP7;
            }
            Self::CAUSE => {
                let cause = self.regs[Self::CAUSE];
                self.regs[Self::CAUSE] =
                    (cause & !Self::CAUSE_SW_MASK) | (value & Self::CAUSE_SW_MASK);
            }
            Self::WIRED => {
                self.regs[index] = value & 0x3F;
                self.regs[Self::RANDOM] = 31;
            }
            Self::INDEX => {
                self.regs[index] = (self.regs[index] & 0x8000_0000) | (value & 0x3F);
            }
            _ => {
                self.regs[index] = value;
            }
        }
    }

    pub fn status(&self) -> Status {
        Status::from_bits_retain(self.regs[Self::STATUS] as u32)
    }

    pub fn set_status(&mut self, status: Status) {
        self.regs[Self::STATUS] = status.bits() as u64;
    }

    pub fn cause(&self) -> u64 {
        self.regs[Self::CAUSE]
    }

    /// Exception code currently latched in Cause
    pub fn exception_code(&self) -> u32 {
        ((self.regs[Self::CAUSE] & Self::CAUSE_EXC_MASK) >> 2) as u32
    }

    pub fn epc(&self) -> u64 {
        self.regs[Self::EPC]
    }

    /// Whether COP1 instructions may execute
    pub fn cop1_usable(&self) -> bool {
        self.status().contains(Status::CU1)
    }

    /// FR mode for FPR addressing
    pub fn fr(&self) -> bool {
        self.status().contains(Status::FR)
    }

    pub fn set_bad_vaddr(&mut self, address: u64) {
        self.regs[Self::BAD_VADDR] = address;
    }

    /// Latch an exception and return the vector to continue at
    ///
    /// `pc` is the address of the faulting instruction; when it sits in a
    /// delay slot EPC points at the branch instead and Cause.BD is set.
    /// EPC is left untouched if EXL was already set.
    pub fn enter_exception(
        &mut self,
        cause: ExceptionCause,
        pc: u64,
        delay_slot: bool,
        coprocessor: u32,
    ) -> u64 {
        let mut status = self.status();
        let mut reg_cause = self.regs[Self::CAUSE];

        if !status.contains(Status::EXL) {
            if delay_slot {
                self.regs[Self::EPC] = pc.wrapping_sub(4);
                reg_cause |= Self::CAUSE_BD;
            } else {
                self.regs[Self::EPC] = pc;
                reg_cause &= !Self::CAUSE_BD;
            }
        }

        reg_cause &= !(Self::CAUSE_EXC_MASK | Self::CAUSE_CE_MASK);
        reg_cause |= (cause as u64) << 2;
        reg_cause |= ((coprocessor as u64) & 0x3) << Self::CAUSE_CE_SHIFT;
        self.regs[Self::CAUSE] = reg_cause;

        status.insert(Status::EXL);
        self.set_status(status);

        if status.contains(Status::BEV) {
            Self::VECTOR_GENERAL_BEV
        } else {
            Self::VECTOR_GENERAL
        }
    }

    /// Leave exception or error level (ERET)
    ///
    /// # Returns
    /// The address execution resumes at
    pub fn exception_return(&mut self) -> u64 {
        let mut status = self.status();
        let target = if status.contains(Status::ERL) {
            status.remove(Status::ERL);
            self.regs[Self::ERROR_EPC]
        } else {
            status.remove(Status::EXL);
            self.regs[Self::EPC]
        };
        self.set_status(status);
        target
    }

    /// Clear both EXL and ERL
    pub fn clear_exception_level(&mut self) {
        let mut status = self.status();
        status.remove(Status::EXL | Status::ERL);
        self.set_status(status);
    }

    /// Whether an enabled interrupt is pending
    pub fn interrupt_pending(&self) -> bool {
        let status = self.status();
        if !status.contains(Status::IE) || status.intersects(Status::EXL | Status::ERL) {
            return false;
        }
        let pending = (self.regs[Self::CAUSE] >> 8) & 0xFF;
        let mask = ((status.bits() >> 8) & 0xFF) as u64;
        pending & mask != 0
    }

    /// Drive one of the five external interrupt lines (IP2-IP6)
    pub fn set_interrupt_line(&mut self, line: u32, asserted: bool) {
        let bit = 1u64 << (10 + line.min(4));
        if asserted {
            self.regs[Self::CAUSE] |= bit;
        } else {
            self.regs[Self::CAUSE] &= !bit;
        }
    }

    /// Advance the timer by one instruction
    ///
    /// Count increments every other instruction; Random decrements every
    /// instruction, wrapping from Wired back to 31.
    pub fn tick(&mut self) {
        let wired = self.regs[Self::WIRED] & 0x1F;
        let random = self.regs[Self::RANDOM];
        self.regs[Self::RANDOM] = if random <= wired { 31 } else { random - 1 };

        self.half_cycle = !self.half_cycle;
        if self.half_cycle {
            return;
        }

        let count = (self.regs[Self::COUNT] + 1) & 0xFFFF_FFFF;
        self.regs[Self::COUNT] = count;
        if count == self.regs[Self::COMPARE] {
            self.regs[Self::CAUSE] |= Self::CAUSE_IP7;
        }
    }

    /// TLBR: load the entry selected by Index into the entry registers
    pub fn tlb_read(&mut self) {
        let entry = self.tlb[(self.regs[Self::INDEX] & 0x1F) as usize];
        let global = entry.global() as u64;
        self.regs[Self::PAGE_MASK] = entry.page_mask;
        self.regs[Self::ENTRY_HI] = entry.entry_hi;
        self.regs[Self::ENTRY_LO0] = (entry.entry_lo0 & !1) | global;
        self.regs[Self::ENTRY_LO1] = (entry.entry_lo1 & !1) | global;
    }

    /// TLBWI / TLBWR: store the entry registers at Index or Random
    pub fn tlb_write(&mut self, random: bool) {
        let slot = if random {
            self.regs[Self::RANDOM]
        } else {
            self.regs[Self::INDEX]
        } & 0x1F;
        self.tlb[slot as usize] = TlbEntry {
            page_mask: self.regs[Self::PAGE_MASK] & 0x01FF_E000,
            entry_hi: self.regs[Self::ENTRY_HI],
            entry_lo0: self.regs[Self::ENTRY_LO0],
            entry_lo1: self.regs[Self::ENTRY_LO1],
        };
    }

    /// TLBP: search for an entry matching EntryHi, setting Index or its P bit
    pub fn tlb_lookup(&mut self) {
        let entry_hi = self.regs[Self::ENTRY_HI];
        let asid = entry_hi & 0xFF;

        let hit = self.tlb.iter().position(|entry| {
            let vpn_mask = !(entry.page_mask | 0x1FFF) & 0xC000_00FF_FFFF_E000;
            let same_vpn = (entry.entry_hi & vpn_mask) == (entry_hi & vpn_mask);
            same_vpn && (entry.global() || (entry.entry_hi & 0xFF) == asid)
        });

        self.regs[Self::INDEX] = match hit {
            Some(slot) => slot as u64,
            None => 0x8000_0000,
        };
    }

    pub fn tlb_entry(&self, slot: usize) -> TlbEntry {
        self.tlb[slot & 0x1F]
    }

    /// All 32 registers, raw
    pub fn regs(&self) -> &[u64; 32] {
        &self.regs
    }

    /// Overwrite every register (snapshot restore)
    pub fn restore(&mut self, regs: [u64; 32]) {
        self.regs = regs;
    }
}
