// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side harness for the RVX demo service routines.
//!
//! The `rvx-hal` drivers run unchanged against modeled peripherals: register
//! accesses go through a [`window::BusWindow`] onto the [`bus::SystemBus`],
//! and the [`machine::Machine`] plays the hart, delivering console receive
//! events as vectored interrupts.

pub mod bus;
pub mod hart;
pub mod machine;
pub mod peripherals;
pub mod snapshot;
pub mod transaction;
pub mod window;

use std::any::Any;

pub use machine::{IrqEvent, IrqOutcome, Machine, RunState};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Unaligned register access at {0:#x}")]
    Unaligned(u64),
    #[error("Trap {cause:#x} entered {vector:#x} with no handler installed")]
    UnhandledTrap { cause: u32, vector: u32 },
    #[error("Machine has not been booted")]
    NotBooted,
    #[error("Peripheral '{0}' missing from the bus")]
    MissingPeripheral(&'static str),
    #[error("Startup output failed: {0}")]
    Startup(#[from] rvx_hal::UartError),
}

pub type SimResult<T> = Result<T, SimulationError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeripheralTickResult {
    pub irq: bool,
}

/// Trait representing a memory-mapped peripheral with 32-bit registers.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32) -> SimResult<()>;
    fn tick(&mut self) -> PeripheralTickResult {
        PeripheralTickResult::default()
    }
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
