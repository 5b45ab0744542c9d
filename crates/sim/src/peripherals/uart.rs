// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{PeripheralTickResult, SimResult};
use rvx_hal::registers::{UartReg, UartStatus};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Console UART model.
///
/// A received byte is latched into the receive register and pulses the
/// receive interrupt on the next tick. The transmitter is always ready.
#[derive(Debug, Default, serde::Serialize)]
pub struct ConsoleUart {
    rx: u8,
    rx_pending: bool,
    rx_count: u64,
    tx_count: u64,
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
}

impl ConsoleUart {
    pub fn new() -> Self {
        Self::default()
    }

    /// A byte arrives on the RX pin.
    pub fn receive(&mut self, byte: u8) {
        if self.rx_pending {
            tracing::warn!(
                "Console overrun: {:#04x} replaces unserviced {:#04x}",
                byte,
                self.rx
            );
        }
        self.rx = byte;
        self.rx_pending = true;
        self.rx_count += 1;
        tracing::debug!("Console RX {:#04x}", byte);
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn push_tx(&mut self, value: u8) {
        self.tx_count += 1;
        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }
}

impl crate::Peripheral for ConsoleUart {
    fn read(&self, offset: u64) -> SimResult<u32> {
        Ok(match UartReg::from_offset(offset) {
            Some(UartReg::RxData) => self.rx as u32,
            Some(UartReg::Status) => UartStatus::TX_READY.bits(),
            Some(UartReg::TxData) | None => 0,
        })
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        if UartReg::from_offset(offset) == Some(UartReg::TxData) {
            self.push_tx((value & 0xFF) as u8);
        }
        Ok(())
    }

    fn tick(&mut self) -> PeripheralTickResult {
        let irq = std::mem::take(&mut self.rx_pending);
        PeripheralTickResult { irq }
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
