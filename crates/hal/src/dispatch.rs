// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Interrupt service routine bodies.
//!
//! A handler runs to completion once per console receive event with delivery
//! of further events withheld. It must not allocate and every wait inside it
//! is bounded, so a silent device surfaces as a [`DispatchError`] instead of a
//! frozen hart.

use crate::registers::{RegisterIo, SpiReg, UartReg};
use crate::spi::{Spi, SpiError};
use crate::uart::{Uart, UartError};
use crate::vendor::{decimal3, vendor_name};

/// JEDEC "read identification" opcode.
pub const READ_ID: u8 = 0x9F;
/// Chip-select index of the serial flash.
pub const FLASH_SLAVE: u8 = 0;

/// Key that triggers a report in the identification variant.
pub const IDENTIFY_TERMINATOR: u8 = b'\n';
/// Key that triggers the prompt in the echo variant.
pub const ECHO_TERMINATOR: u8 = b'\r';

pub const ECHO_PROMPT: &[u8] = b"\n\nType something else and press enter: ";

/// Highest byte the echo variant still echoes, exclusive.
const ECHO_LIMIT: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("flash bus: {0}")]
    Bus(#[from] SpiError),
    #[error("console: {0}")]
    Console(#[from] UartError),
}

/// Body of a service routine bound to one interrupt line.
pub trait InterruptHandler {
    /// What one invocation did, for the harness and for logging.
    type Event: core::fmt::Debug;

    fn on_interrupt(&mut self) -> Result<Self::Event, DispatchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyEvent {
    /// The terminator arrived and a report was printed.
    Reported { id: u8, vendor: &'static str },
    /// Any other key; the ID was read and dropped.
    Discarded { id: u8, key: u8 },
}

/// Reads the flash manufacturer ID on every console event and reports it when
/// the event is the terminator key.
///
/// The bus transaction runs for every key, not just the terminator. Gating it
/// on the key would save a transaction per keystroke; left as is pending a
/// decision on whether the early read is wanted.
#[derive(Debug)]
pub struct IdentifyDispatcher<U, S> {
    console: Uart<U>,
    flash: Spi<S>,
    terminator: u8,
}

impl<U, S> IdentifyDispatcher<U, S>
where
    U: RegisterIo<UartReg>,
    S: RegisterIo<SpiReg>,
{
    pub fn new(console: Uart<U>, flash: Spi<S>) -> Self {
        Self {
            console,
            flash,
            terminator: IDENTIFY_TERMINATOR,
        }
    }

    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    pub fn into_parts(self) -> (Uart<U>, Spi<S>) {
        (self.console, self.flash)
    }

    /// One complete read-ID transaction. Chip select is released on every
    /// path that asserted it.
    fn read_manufacturer_id(&mut self) -> Result<u8, SpiError> {
        self.flash.wait_ready()?;
        self.flash.select(FLASH_SLAVE)?;
        let id = self
            .flash
            .write(READ_ID)
            .and_then(|_| self.flash.transfer(0x00));
        self.flash.deselect();
        id
    }

    fn report(&mut self, id: u8) -> Result<&'static str, UartError> {
        let vendor = vendor_name(id);
        self.console.write_string(b"Read out value: ")?;
        self.console.write_string(&decimal3(id))?;
        self.console.write_string(b"\n")?;
        self.console.write_string(b"Manufacturer: ")?;
        self.console.write_string(vendor.as_bytes())?;
        self.console.write_string(b"\n")?;
        Ok(vendor)
    }
}

impl<U, S> InterruptHandler for IdentifyDispatcher<U, S>
where
    U: RegisterIo<UartReg>,
    S: RegisterIo<SpiReg>,
{
    type Event = IdentifyEvent;

    fn on_interrupt(&mut self) -> Result<IdentifyEvent, DispatchError> {
        let id = self.read_manufacturer_id()?;
        let key = self.console.read();
        if key != self.terminator {
            return Ok(IdentifyEvent::Discarded { id, key });
        }
        let vendor = self.report(id)?;
        hal_trace!(id, vendor, "manufacturer id reported");
        Ok(IdentifyEvent::Reported { id, vendor })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEvent {
    Prompted,
    Echoed(u8),
    Ignored(u8),
}

/// Console-only variant: echoes printable input and prompts on enter.
#[derive(Debug)]
pub struct EchoDispatcher<U> {
    console: Uart<U>,
    terminator: u8,
}

impl<U: RegisterIo<UartReg>> EchoDispatcher<U> {
    pub fn new(console: Uart<U>) -> Self {
        Self {
            console,
            terminator: ECHO_TERMINATOR,
        }
    }

    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    pub fn into_console(self) -> Uart<U> {
        self.console
    }
}

impl<U: RegisterIo<UartReg>> InterruptHandler for EchoDispatcher<U> {
    type Event = EchoEvent;

    fn on_interrupt(&mut self) -> Result<EchoEvent, DispatchError> {
        let rx = self.console.read();
        if rx == self.terminator {
            self.console.write_string(ECHO_PROMPT)?;
            Ok(EchoEvent::Prompted)
        } else if rx < ECHO_LIMIT {
            self.console.write(rx)?;
            Ok(EchoEvent::Echoed(rx))
        } else {
            Ok(EchoEvent::Ignored(rx))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{SpiStatus, UartStatus, CS_IDLE};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Select,
        Exchange(u8),
        Deselect,
        ConsoleRead,
    }

    #[derive(Debug, Default)]
    struct Board {
        ops: Vec<Op>,
        rx: u8,
        tx: Vec<u8>,
        id: u8,
        spi_rx: u8,
        ready: bool,
        /// Controller stays busy after the next exchange starts.
        hang_on_exchange: bool,
    }

    #[derive(Debug, Clone)]
    struct Port(Rc<RefCell<Board>>);

    impl RegisterIo<UartReg> for Port {
        fn read(&self, reg: UartReg) -> u32 {
            let mut b = self.0.borrow_mut();
            match reg {
                UartReg::RxData => {
                    b.ops.push(Op::ConsoleRead);
                    b.rx as u32
                }
                UartReg::Status => UartStatus::TX_READY.bits(),
                UartReg::TxData => 0,
            }
        }

        fn write(&mut self, _reg: UartReg, value: u32) {
            self.0.borrow_mut().tx.push(value as u8);
        }
    }

    impl RegisterIo<SpiReg> for Port {
        fn read(&self, reg: SpiReg) -> u32 {
            let b = self.0.borrow();
            match reg {
                SpiReg::Status if b.ready => SpiStatus::READY.bits(),
                SpiReg::RxData => b.spi_rx as u32,
                _ => 0,
            }
        }

        fn write(&mut self, reg: SpiReg, value: u32) {
            let mut b = self.0.borrow_mut();
            match reg {
                SpiReg::ChipSelect if value == CS_IDLE => b.ops.push(Op::Deselect),
                SpiReg::ChipSelect => b.ops.push(Op::Select),
                SpiReg::TxData => {
                    b.ops.push(Op::Exchange(value as u8));
                    if b.hang_on_exchange {
                        b.ready = false;
                    }
                    b.spi_rx = if value as u8 == READ_ID { 0xFF } else { b.id };
                }
                _ => {}
            }
        }
    }

    fn identify(id: u8, key: u8) -> (IdentifyDispatcher<Port, Port>, Rc<RefCell<Board>>) {
        let board = Rc::new(RefCell::new(Board {
            rx: key,
            id,
            ready: true,
            ..Default::default()
        }));
        let port = Port(board.clone());
        let dispatcher = IdentifyDispatcher::new(
            Uart::new(port.clone()),
            Spi::new(port).with_poll_limit(8),
        );
        (dispatcher, board)
    }

    #[test]
    fn test_terminator_reports_vendor() {
        let (mut isr, board) = identify(0xC2, b'\n');
        let event = isr.on_interrupt().unwrap();
        assert_eq!(
            event,
            IdentifyEvent::Reported {
                id: 0xC2,
                vendor: "Macronix"
            }
        );
        assert_eq!(
            String::from_utf8(board.borrow().tx.clone()).unwrap(),
            "Read out value: 194\nManufacturer: Macronix\n"
        );
    }

    #[test]
    fn test_other_key_runs_transaction_without_output() {
        let (mut isr, board) = identify(0x20, b'a');
        assert_eq!(
            isr.on_interrupt().unwrap(),
            IdentifyEvent::Discarded { id: 0x20, key: b'a' }
        );
        let b = board.borrow();
        assert!(b.tx.is_empty());
        assert_eq!(
            b.ops,
            vec![
                Op::Select,
                Op::Exchange(READ_ID),
                Op::Exchange(0x00),
                Op::Deselect,
                Op::ConsoleRead
            ]
        );
    }

    #[test]
    fn test_busy_bus_times_out_without_selecting() {
        let (mut isr, board) = identify(0x01, b'\n');
        board.borrow_mut().ready = false;
        assert_eq!(
            isr.on_interrupt(),
            Err(DispatchError::Bus(SpiError::Timeout { polls: 8 }))
        );
        let b = board.borrow();
        assert!(b.ops.is_empty());
        assert!(b.tx.is_empty());
    }

    #[test]
    fn test_timeout_mid_transaction_releases_chip_select() {
        let (mut isr, board) = identify(0xC2, b'\n');
        board.borrow_mut().hang_on_exchange = true;
        assert_eq!(
            isr.on_interrupt(),
            Err(DispatchError::Bus(SpiError::Timeout { polls: 8 }))
        );
        let b = board.borrow();
        assert_eq!(
            b.ops,
            vec![Op::Select, Op::Exchange(READ_ID), Op::Deselect]
        );
        assert!(b.tx.is_empty());
    }

    #[test]
    fn test_unknown_vendor_report() {
        let (mut isr, board) = identify(0x07, b'\n');
        isr.on_interrupt().unwrap();
        assert_eq!(
            String::from_utf8(board.borrow().tx.clone()).unwrap(),
            "Read out value: 007\nManufacturer: Unknown\n"
        );
    }

    fn echo(key: u8) -> (EchoEvent, Vec<u8>) {
        let board = Rc::new(RefCell::new(Board {
            rx: key,
            ..Default::default()
        }));
        let mut isr = EchoDispatcher::new(Uart::new(Port(board.clone())));
        let event = isr.on_interrupt().unwrap();
        let tx = board.borrow().tx.clone();
        (event, tx)
    }

    #[test]
    fn test_echo_variant() {
        assert_eq!(echo(b'A'), (EchoEvent::Echoed(b'A'), vec![b'A']));
        assert_eq!(echo(0x7F), (EchoEvent::Ignored(0x7F), vec![]));
        assert_eq!(echo(0xC3), (EchoEvent::Ignored(0xC3), vec![]));
        assert_eq!(echo(b'\r'), (EchoEvent::Prompted, ECHO_PROMPT.to_vec()));
    }
}
