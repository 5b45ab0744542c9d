// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt::Write;
use core::num::NonZeroUsize;
use riscv::register::{mstatus, mtvec, mtvec::TrapMode};
use rvx_hal::board::{CONSOLE_BASE, FLASH_BUS_BASE};
use rvx_hal::registers::{SpiReg, UartReg};
use rvx_hal::{Csr, DispatchError, IrqLine, Mmio, Spi, Uart};

/// SPI clock divider programmed at startup.
pub const FLASH_DIVIDER: u32 = 4;

const fn nonzero(addr: usize) -> NonZeroUsize {
    match NonZeroUsize::new(addr) {
        Some(addr) => addr,
        None => panic!("peripheral base must not be zero"),
    }
}

/// Console driver over the board's UART block.
///
/// # Safety
///
/// At most one live console handle may exist. `main` must drop its handle
/// before arming interrupts; the service routine creates its own per call.
pub unsafe fn console() -> Uart<Mmio<UartReg>> {
    Uart::new(Mmio::new(nonzero(CONSOLE_BASE)))
}

/// Bus controller driver over the board's SPI block.
///
/// # Safety
///
/// Same single-owner rule as [`console`].
pub unsafe fn flash_bus() -> Spi<Mmio<SpiReg>> {
    Spi::new(Mmio::new(nonzero(FLASH_BUS_BASE)))
}

/// Machine-mode CSR access for the interrupt controller.
pub struct MachineCsr {
    table: usize,
}

impl MachineCsr {
    /// # Safety
    ///
    /// Call once, from `main`, before any interrupt can be delivered.
    pub unsafe fn new() -> Self {
        Self {
            table: crate::vectors::table_address(),
        }
    }
}

impl Csr for MachineCsr {
    fn enable_vectored_mode(&mut self) {
        // SAFETY: the table is 256-byte aligned and every slot is a jump.
        unsafe { mtvec::write(self.table, TrapMode::Vectored) }
    }

    fn unmask(&mut self, line: IrqLine) {
        // SAFETY: setting a bit in mie only enables delivery of that line.
        unsafe { core::arch::asm!("csrs mie, {0}", in(reg) line.mask()) }
    }

    fn global_enable(&mut self) {
        // SAFETY: the handler for the only unmasked line is installed.
        unsafe { mstatus::set_mie() }
    }
}

/// Prints a failed service routine on the console and carries on.
pub fn report_failure(console: &mut Uart<Mmio<UartReg>>, error: DispatchError) {
    // A console that cannot transmit has nowhere to report to.
    let _ = writeln!(console, "\n[rvx] interrupt dropped: {}", error);
}

/// Parks the hart once startup is done. All work happens in the handler.
pub fn idle() -> ! {
    loop {
        // SAFETY: wfi only stalls until the next interrupt.
        unsafe { riscv::asm::wfi() }
    }
}
