// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Echoes typed characters back and prompts again on Enter.

#![no_std]
#![no_main]

use panic_halt as _;
use riscv_rt::entry;
use rvx_firmware::platform::{self, MachineCsr};
use rvx_hal::board::{self, CONSOLE_IRQ};
use rvx_hal::{EchoDispatcher, InterruptHandler};

#[no_mangle]
extern "C" fn rvx_fast0_handler() {
    // SAFETY: see spi-demo; the handler owns the console while it runs.
    let mut isr = EchoDispatcher::new(unsafe { platform::console() });
    if let Err(e) = isr.on_interrupt() {
        platform::report_failure(&mut isr.into_console(), e);
    }
}

#[entry]
fn main() -> ! {
    // SAFETY: single-threaded startup, interrupts still disabled.
    let (mut console, csr) = unsafe { (platform::console(), MachineCsr::new()) };

    let started = board::start_echo(&mut console, csr, CONSOLE_IRQ);
    drop(console);
    let _irq = started.irq;

    platform::idle()
}
