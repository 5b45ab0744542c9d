// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Prints the serial flash manufacturer each time Enter is pressed.

#![no_std]
#![no_main]

use panic_halt as _;
use riscv_rt::entry;
use rvx_firmware::platform::{self, MachineCsr, FLASH_DIVIDER};
use rvx_hal::board::{self, CONSOLE_IRQ};
use rvx_hal::{IdentifyDispatcher, InterruptHandler, Mode};

#[no_mangle]
extern "C" fn rvx_fast0_handler() {
    // SAFETY: main dropped its handles before arming; delivery is withheld
    // while this runs, so these are the only live ones.
    let (console, flash) = unsafe { (platform::console(), platform::flash_bus()) };
    let mut isr = IdentifyDispatcher::new(console, flash);
    if let Err(e) = isr.on_interrupt() {
        let (mut console, _) = isr.into_parts();
        platform::report_failure(&mut console, e);
    }
}

#[entry]
fn main() -> ! {
    // SAFETY: single-threaded startup, interrupts still disabled.
    let (mut console, mut flash, csr) =
        unsafe { (platform::console(), platform::flash_bus(), MachineCsr::new()) };
    flash.set_clock_divider(FLASH_DIVIDER);

    let started = board::start_identify(&mut console, &mut flash, Mode::Mode0, csr, CONSOLE_IRQ);
    drop((console, flash));
    // Delivery is armed even if the banner timed out; a dead console has no
    // way to report that, so keep servicing keys.
    let _irq = started.irq;

    platform::idle()
}
