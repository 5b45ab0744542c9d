// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Drivers and interrupt dispatchers for the RVX console/SPI demo.
//!
//! Everything in this crate is `no_std` and allocation free. Peripherals are
//! reached through [`registers::RegisterIo`] backends, so the same drivers run
//! against real memory-mapped hardware ([`registers::Mmio`]) and against the
//! host-side simulator.

#![cfg_attr(not(test), no_std)]

/// Driver-level trace events, compiled out unless the `tracing` feature is on.
macro_rules! hal_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

pub mod board;
pub mod dispatch;
pub mod interrupt;
pub mod registers;
pub mod spi;
pub mod uart;
pub mod vendor;

pub use dispatch::{
    DispatchError, EchoDispatcher, EchoEvent, IdentifyDispatcher, IdentifyEvent, InterruptHandler,
};
pub use interrupt::{Csr, InterruptController, IrqLine};
pub use registers::{Mmio, Register, RegisterIo};
pub use spi::{Mode, Spi, SpiError};
pub use uart::{Uart, UartError};
