// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Machine-mode interrupt state of the modeled hart.
//!
//! Only the CSRs that take part in interrupt delivery are modeled; the
//! service routines themselves run natively on the host.

use crate::snapshot::HartSnapshot;
use rvx_hal::{Csr, IrqLine};

pub const MSTATUS_MIE: u32 = 1 << 3;
pub const MSTATUS_MPIE: u32 = 1 << 7;
const MTVEC_MODE_MASK: u32 = 0b11;
const MTVEC_VECTORED: u32 = 0b01;

/// Where the vector table of the demo image lives.
pub const VECTOR_TABLE: u32 = 0x0000_0100;
/// Address of the spin loop `main` parks in after startup.
pub const IDLE_PC: u32 = 0x0000_0400;

/// A trap the hart has just entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap {
    pub line: IrqLine,
    pub cause: u32,
    pub vector: u32,
    pub vectored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hart {
    pub pc: u32,
    pub mstatus: u32,
    pub mie: u32,
    pub mip: u32,
    pub mtvec: u32,
    pub mepc: u32,
    pub mcause: u32,
}

impl Default for Hart {
    fn default() -> Self {
        Self::new(VECTOR_TABLE)
    }
}

impl Hart {
    /// Reset state: table installed in direct mode, every interrupt masked.
    pub fn new(vector_table: u32) -> Self {
        Self {
            pc: IDLE_PC,
            mstatus: 0,
            mie: 0,
            mip: 0,
            mtvec: vector_table & !MTVEC_MODE_MASK,
            mepc: 0,
            mcause: 0,
        }
    }

    pub fn is_vectored(&self) -> bool {
        self.mtvec & MTVEC_MODE_MASK == MTVEC_VECTORED
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.mstatus & MSTATUS_MIE != 0
    }

    /// Latch interrupt requests into `mip`.
    pub fn pend(&mut self, mask: u32) {
        self.mip |= mask;
    }

    /// Enter the trap for the highest pending and enabled line, if delivery is
    /// globally enabled.
    ///
    /// The taken line's `mip` bit is consumed, `MIE` is saved to `MPIE` and
    /// cleared, so nothing else is delivered until [`Hart::mret`].
    pub fn take_interrupt(&mut self) -> Option<Trap> {
        if !self.interrupts_enabled() {
            return None;
        }
        let pending = self.mip & self.mie;
        if pending == 0 {
            return None;
        }

        let line = IrqLine::new((31 - pending.leading_zeros()) as u8);
        let cause = line.cause();
        let base = self.mtvec & !MTVEC_MODE_MASK;
        let vectored = self.is_vectored();
        let vector = if vectored {
            base + 4 * line.bit() as u32
        } else {
            base
        };

        self.mip &= !line.mask();
        self.mepc = self.pc;
        self.mcause = cause;
        // Only reachable with MIE set, so MPIE records "enabled".
        self.mstatus = (self.mstatus | MSTATUS_MPIE) & !MSTATUS_MIE;
        self.pc = vector;

        tracing::trace!("Trap {:#x} -> {:#x}", cause, vector);
        Some(Trap {
            line,
            cause,
            vector,
            vectored,
        })
    }

    /// Return from the handler: resume at `mepc`, restore `MIE` from `MPIE`.
    pub fn mret(&mut self) {
        self.pc = self.mepc;
        if self.mstatus & MSTATUS_MPIE != 0 {
            self.mstatus |= MSTATUS_MIE;
        } else {
            self.mstatus &= !MSTATUS_MIE;
        }
        self.mstatus |= MSTATUS_MPIE;
    }

    pub fn snapshot(&self) -> HartSnapshot {
        HartSnapshot {
            pc: self.pc,
            mstatus: self.mstatus,
            mie: self.mie,
            mip: self.mip,
            mtvec: self.mtvec,
            mepc: self.mepc,
            mcause: self.mcause,
        }
    }
}

impl Csr for Hart {
    fn enable_vectored_mode(&mut self) {
        self.mtvec = (self.mtvec & !MTVEC_MODE_MASK) | MTVEC_VECTORED;
    }

    fn unmask(&mut self, line: IrqLine) {
        self.mie |= line.mask();
    }

    fn global_enable(&mut self) {
        self.mstatus |= MSTATUS_MIE;
    }
}
