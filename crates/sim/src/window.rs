// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::SystemBus;
use rvx_hal::{Register, RegisterIo};
use std::sync::{Arc, Mutex, MutexGuard};

/// [`RegisterIo`] backend that routes a driver's register accesses onto the
/// shared [`SystemBus`].
///
/// Every access advances the bus by one tick, which is how modeled time
/// passes while a driver polls a status register. Faults are logged and read
/// back as zero, like an unmapped load on the real board.
#[derive(Debug, Clone)]
pub struct BusWindow {
    bus: Arc<Mutex<SystemBus>>,
    base: u64,
}

impl BusWindow {
    pub fn new(bus: Arc<Mutex<SystemBus>>, base: u64) -> Self {
        Self { bus, base }
    }

    fn lock(&self) -> MutexGuard<'_, SystemBus> {
        self.bus.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R: Register> RegisterIo<R> for BusWindow {
    fn read(&self, reg: R) -> u32 {
        let addr = self.base + reg.offset() as u64;
        let mut bus = self.lock();
        bus.tick_peripherals();
        match bus.read_u32(addr) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Read of {:?} at {:#x} failed: {}", reg, addr, e);
                0
            }
        }
    }

    fn write(&mut self, reg: R, value: u32) {
        let addr = self.base + reg.offset() as u64;
        let mut bus = self.lock();
        bus.tick_peripherals();
        if let Err(e) = bus.write_u32(addr, value) {
            tracing::error!("Write of {:?} at {:#x} failed: {}", reg, addr, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripherals::spi::SpiController;
    use rvx_hal::registers::{SpiReg, UartReg};

    #[test]
    fn test_window_reaches_peripheral() {
        let bus = Arc::new(Mutex::new(SystemBus::new()));
        let mut spi = BusWindow::new(bus.clone(), 0x8003_0000);
        spi.write(SpiReg::Divider, 8);
        assert_eq!(RegisterIo::<SpiReg>::read(&spi, SpiReg::Divider), 8);

        let guard = bus.lock().unwrap();
        let ctrl = guard.peripheral::<SpiController>("flash_bus").unwrap();
        assert_eq!(ctrl.divider(), 8);
        assert_eq!(guard.ticks(), 2);
    }

    #[test]
    fn test_unmapped_window_reads_zero() {
        let bus = Arc::new(Mutex::new(SystemBus::new()));
        let mut window = BusWindow::new(bus, 0x1000_0000);
        window.write(UartReg::TxData, 0x41);
        assert_eq!(window.read(UartReg::Status), 0);
    }
}
