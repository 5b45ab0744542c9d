// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register access layer.
//!
//! A peripheral's register map is an enum implementing [`Register`]; drivers
//! only ever name registers, never addresses. A [`RegisterIo`] backend turns a
//! register name into an access: [`Mmio`] performs volatile loads and stores
//! relative to a fixed base, the simulator routes the access onto its modeled
//! system bus.

use core::marker::PhantomData;
use core::num::NonZeroUsize;

/// A named 32-bit register inside one peripheral's register block.
pub trait Register: Copy + core::fmt::Debug {
    /// Byte offset from the start of the block.
    fn offset(self) -> usize;
}

/// Word access to one peripheral's register block.
pub trait RegisterIo<R: Register> {
    fn read(&self, reg: R) -> u32;
    fn write(&mut self, reg: R, value: u32);

    /// Read-modify-write helper.
    fn modify(&mut self, reg: R, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

impl<R: Register, T: RegisterIo<R> + ?Sized> RegisterIo<R> for &mut T {
    fn read(&self, reg: R) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: R, value: u32) {
        (**self).write(reg, value)
    }
}

/// Memory-mapped register block at a fixed physical base address.
#[derive(Debug)]
pub struct Mmio<R> {
    base: NonZeroUsize,
    _regs: PhantomData<R>,
}

impl<R: Register> Mmio<R> {
    /// # Safety
    ///
    /// `base` must be the address of a live register block laid out as `R`
    /// describes, and no other `Mmio` for the same block may be used
    /// concurrently.
    pub const unsafe fn new(base: NonZeroUsize) -> Self {
        Self {
            base,
            _regs: PhantomData,
        }
    }

    fn ptr(&self, reg: R) -> *mut u32 {
        (self.base.get() + reg.offset()) as *mut u32
    }
}

impl<R: Register> RegisterIo<R> for Mmio<R> {
    fn read(&self, reg: R) -> u32 {
        // SAFETY: `new` guarantees the block is mapped and word aligned.
        unsafe { core::ptr::read_volatile(self.ptr(reg)) }
    }

    fn write(&mut self, reg: R, value: u32) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(self.ptr(reg), value) }
    }
}

/// Console (UART) register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartReg {
    /// Transmit data. Writing starts a transmission.
    TxData,
    /// Last received byte.
    RxData,
    /// Transmitter ready flags.
    Status,
}

impl Register for UartReg {
    fn offset(self) -> usize {
        match self {
            UartReg::TxData => 0x00,
            UartReg::RxData => 0x04,
            UartReg::Status => 0x08,
        }
    }
}

impl UartReg {
    pub const ALL: [UartReg; 3] = [UartReg::TxData, UartReg::RxData, UartReg::Status];

    pub fn from_offset(offset: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.offset() as u64 == offset)
    }
}

bitflags::bitflags! {
    /// Console status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartStatus: u32 {
        const TX_READY = 1 << 0;
    }
}

/// SPI controller register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiReg {
    /// Clock polarity (bit 1) and phase (bit 0).
    Mode,
    /// Active-low chip-select bitmask, all ones when idle.
    ChipSelect,
    /// SCLK divider.
    Divider,
    /// Writing starts a single-byte exchange.
    TxData,
    /// Byte shifted in by the last exchange.
    RxData,
    /// Ready flags.
    Status,
}

impl Register for SpiReg {
    fn offset(self) -> usize {
        match self {
            SpiReg::Mode => 0x00,
            SpiReg::ChipSelect => 0x04,
            SpiReg::Divider => 0x08,
            SpiReg::TxData => 0x0C,
            SpiReg::RxData => 0x10,
            SpiReg::Status => 0x14,
        }
    }
}

impl SpiReg {
    pub const ALL: [SpiReg; 6] = [
        SpiReg::Mode,
        SpiReg::ChipSelect,
        SpiReg::Divider,
        SpiReg::TxData,
        SpiReg::RxData,
        SpiReg::Status,
    ];

    pub fn from_offset(offset: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.offset() as u64 == offset)
    }
}

bitflags::bitflags! {
    /// SPI controller status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpiStatus: u32 {
        /// Controller idle, no exchange in flight.
        const READY = 1 << 0;
    }
}

/// Chip-select register value with every line deasserted.
pub const CS_IDLE: u32 = u32::MAX;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_offsets_round_trip() {
        for reg in UartReg::ALL {
            assert_eq!(UartReg::from_offset(reg.offset() as u64), Some(reg));
        }
        for reg in SpiReg::ALL {
            assert_eq!(SpiReg::from_offset(reg.offset() as u64), Some(reg));
        }
        assert_eq!(SpiReg::from_offset(0x18), None);
        assert_eq!(UartReg::from_offset(0x02), None);
    }

    #[test]
    fn test_mmio_volatile_access() {
        let mut block = [0u32; 6];
        let base = NonZeroUsize::new(block.as_mut_ptr() as usize).unwrap();
        // SAFETY: `block` outlives `regs` and is only touched through it.
        let mut regs: Mmio<SpiReg> = unsafe { Mmio::new(base) };

        regs.write(SpiReg::Divider, 8);
        regs.modify(SpiReg::Mode, |v| v | 0b11);
        assert_eq!(regs.read(SpiReg::Divider), 8);
        assert_eq!(regs.read(SpiReg::Mode), 0b11);
        drop(regs);
        assert_eq!(block[2], 8);
    }
}
