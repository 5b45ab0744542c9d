// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! SPI controller driver.
//!
//! The driver exposes the raw transaction steps and does not manage chip
//! select on its own. A well-formed transaction is
//! `wait_ready → select → write/transfer* → deselect`, and keeping that order
//! is the caller's job.

use crate::registers::{RegisterIo, SpiReg, SpiStatus, CS_IDLE};

/// Default number of status polls before a ready wait gives up.
pub const DEFAULT_READY_POLL_LIMIT: u32 = 100_000;

/// Clock polarity / phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    pub const fn bits(self) -> u32 {
        match self {
            Mode::Mode0 => 0b00,
            Mode::Mode1 => 0b01,
            Mode::Mode2 => 0b10,
            Mode::Mode3 => 0b11,
        }
    }

    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Mode::Mode0,
            0b01 => Mode::Mode1,
            0b10 => Mode::Mode2,
            _ => Mode::Mode3,
        }
    }

    pub const fn cpol(self) -> bool {
        self.bits() & 0b10 != 0
    }

    pub const fn cpha(self) -> bool {
        self.bits() & 0b01 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpiError {
    #[error("SPI controller not ready after {polls} polls")]
    Timeout { polls: u32 },
    #[error("chip-select index {0} out of range")]
    InvalidSlave(u8),
}

#[derive(Debug)]
pub struct Spi<R> {
    regs: R,
    poll_limit: u32,
}

impl<R: RegisterIo<SpiReg>> Spi<R> {
    pub fn new(regs: R) -> Self {
        Self {
            regs,
            poll_limit: DEFAULT_READY_POLL_LIMIT,
        }
    }

    /// Bounds every ready wait to `poll_limit` status reads.
    pub fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit.max(1);
        self
    }

    /// Configure CPOL/CPHA. Call once before the first transaction.
    pub fn set_mode(&mut self, mode: Mode) {
        self.regs.write(SpiReg::Mode, mode.bits());
        hal_trace!(cpol = mode.cpol(), cpha = mode.cpha(), "spi mode set");
    }

    pub fn mode(&self) -> Mode {
        Mode::from_bits(self.regs.read(SpiReg::Mode))
    }

    pub fn set_clock_divider(&mut self, divider: u32) {
        self.regs.write(SpiReg::Divider, divider);
    }

    /// Polls the status register until the controller is idle.
    ///
    /// Returns [`SpiError::Timeout`] once `poll_limit` reads have seen it busy.
    pub fn wait_ready(&mut self) -> Result<(), SpiError> {
        for _ in 0..self.poll_limit {
            if SpiStatus::from_bits_truncate(self.regs.read(SpiReg::Status))
                .contains(SpiStatus::READY)
            {
                return Ok(());
            }
        }
        hal_trace!(polls = self.poll_limit, "spi ready wait timed out");
        Err(SpiError::Timeout {
            polls: self.poll_limit,
        })
    }

    /// Assert chip select for slave `index`.
    pub fn select(&mut self, index: u8) -> Result<(), SpiError> {
        if index >= 32 {
            return Err(SpiError::InvalidSlave(index));
        }
        self.regs.write(SpiReg::ChipSelect, !(1u32 << index));
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.regs.write(SpiReg::ChipSelect, CS_IDLE);
    }

    /// Exchange one byte, discarding the reply.
    pub fn write(&mut self, byte: u8) -> Result<(), SpiError> {
        self.transfer(byte).map(|_| ())
    }

    /// Exchange one byte and return the byte shifted in.
    pub fn transfer(&mut self, byte: u8) -> Result<u8, SpiError> {
        self.regs.write(SpiReg::TxData, byte as u32);
        self.wait_ready()?;
        let rx = (self.regs.read(SpiReg::RxData) & 0xFF) as u8;
        hal_trace!(tx = byte, rx, "spi exchange");
        Ok(rx)
    }

    pub fn release(self) -> R {
        self.regs
    }
}
