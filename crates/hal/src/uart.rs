// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::registers::{RegisterIo, UartReg, UartStatus};

/// Default number of status polls before a transmit gives up.
pub const DEFAULT_TX_POLL_LIMIT: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UartError {
    #[error("transmitter not ready after {polls} polls")]
    Timeout { polls: u32 },
}

/// Console driver.
#[derive(Debug)]
pub struct Uart<R> {
    regs: R,
    poll_limit: u32,
}

impl<R: RegisterIo<UartReg>> Uart<R> {
    pub fn new(regs: R) -> Self {
        Self {
            regs,
            poll_limit: DEFAULT_TX_POLL_LIMIT,
        }
    }

    pub fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit.max(1);
        self
    }

    /// Last received byte.
    ///
    /// There is no "data available" check: only call this in response to the
    /// receive interrupt.
    pub fn read(&self) -> u8 {
        (self.regs.read(UartReg::RxData) & 0xFF) as u8
    }

    pub fn write(&mut self, byte: u8) -> Result<(), UartError> {
        let mut polls = 0;
        while !UartStatus::from_bits_truncate(self.regs.read(UartReg::Status))
            .contains(UartStatus::TX_READY)
        {
            polls += 1;
            if polls >= self.poll_limit {
                return Err(UartError::Timeout { polls });
            }
        }
        self.regs.write(UartReg::TxData, byte as u32);
        Ok(())
    }

    /// Sends `bytes` up to, not including, the first zero byte.
    pub fn write_string(&mut self, bytes: &[u8]) -> Result<(), UartError> {
        for &byte in bytes.iter().take_while(|&&b| b != 0) {
            self.write(byte)?;
        }
        Ok(())
    }

    pub fn release(self) -> R {
        self.regs
    }
}

impl<R: RegisterIo<UartReg>> core::fmt::Write for Uart<R> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_string(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}
