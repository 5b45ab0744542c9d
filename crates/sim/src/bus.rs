// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::spi::SpiController;
use crate::peripherals::spi_flash::SpiFlash;
use crate::peripherals::uart::ConsoleUart;
use crate::{Peripheral, SimResult, SimulationError};
use rvx_config::BoardConfig;
use std::sync::{Arc, Mutex};

pub const CONSOLE: &str = "console";
pub const FLASH_BUS: &str = "flash_bus";

#[derive(Debug)]
pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    /// Machine interrupt bit raised when the device's tick reports an IRQ.
    pub irq: Option<u8>,
    pub dev: Box<dyn Peripheral>,
}

#[derive(Debug)]
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
    pending_irqs: u32,
    ticks: u64,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// The reference board: console, SPI controller and a Macronix flash.
    pub fn new() -> Self {
        // The default config always validates, so this cannot fail.
        Self::from_config(&BoardConfig::default()).unwrap_or_else(|_| Self::empty())
    }

    pub fn empty() -> Self {
        Self {
            peripherals: Vec::new(),
            pending_irqs: 0,
            ticks: 0,
        }
    }

    pub fn from_config(board: &BoardConfig) -> anyhow::Result<Self> {
        board.validate()?;
        let mut bus = Self::empty();

        bus.peripherals.push(PeripheralEntry {
            name: CONSOLE.to_string(),
            base: board.console.base,
            size: board.console_size()?,
            irq: Some(board.console.irq),
            dev: Box::new(ConsoleUart::new()),
        });

        let latency = board.flash.as_ref().map_or(0, |f| f.ready_latency);
        let mut spi = SpiController::new(latency);
        if let Some(flash) = &board.flash {
            tracing::info!(
                "Attaching flash {:02x} {:02x} {:02x} on CS0",
                flash.manufacturer_id,
                flash.memory_type,
                flash.capacity
            );
            spi.attach(
                rvx_hal::dispatch::FLASH_SLAVE,
                Box::new(SpiFlash::new(
                    flash.manufacturer_id,
                    flash.memory_type,
                    flash.capacity,
                )),
            );
            if !flash.responsive {
                tracing::warn!("Flash configured unresponsive; SPI controller will never be ready");
                spi.set_stalled(true);
            }
        }
        bus.peripherals.push(PeripheralEntry {
            name: FLASH_BUS.to_string(),
            base: board.flash_bus.base,
            size: board.flash_bus_size()?,
            irq: None,
            dev: Box::new(spi),
        });

        Ok(bus)
    }

    fn resolve(&self, addr: u64) -> SimResult<(usize, u64)> {
        if addr % 4 != 0 {
            return Err(SimulationError::Unaligned(addr));
        }
        self.peripherals
            .iter()
            .position(|p| addr >= p.base && addr - p.base < p.size)
            .map(|idx| (idx, addr - self.peripherals[idx].base))
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let (idx, offset) = self.resolve(addr)?;
        self.peripherals[idx].dev.read(offset)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        let (idx, offset) = self.resolve(addr)?;
        self.peripherals[idx].dev.write(offset, value)
    }

    /// Advance every peripheral by one tick. Returns the pending interrupt
    /// bits accumulated so far.
    pub fn tick_peripherals(&mut self) -> u32 {
        self.ticks += 1;
        for p in &mut self.peripherals {
            let res = p.dev.tick();
            if res.irq {
                if let Some(irq) = p.irq {
                    tracing::trace!("Bus: {} raised IRQ {}", p.name, irq);
                    self.pending_irqs |= 1 << irq;
                }
            }
        }
        self.pending_irqs
    }

    pub fn take_pending_irqs(&mut self) -> u32 {
        std::mem::take(&mut self.pending_irqs)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn entry(&self, name: &str) -> Option<&PeripheralEntry> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    pub fn peripheral<T: 'static>(&self, name: &str) -> Option<&T> {
        self.entry(name)?.dev.as_any()?.downcast_ref::<T>()
    }

    pub fn peripheral_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)?
            .dev
            .as_any_mut()?
            .downcast_mut::<T>()
    }

    /// Attach a TX capture sink to the console.
    ///
    /// When `echo_stdout` is false, console writes are no longer printed to stdout.
    pub fn attach_console_sink(&mut self, sink: Arc<Mutex<Vec<u8>>>, echo_stdout: bool) {
        for p in &mut self.peripherals {
            let Some(any) = p.dev.as_any_mut() else {
                continue;
            };
            let Some(uart) = any.downcast_mut::<ConsoleUart>() else {
                continue;
            };
            uart.set_sink(Some(sink.clone()), echo_stdout);
        }
    }
}
