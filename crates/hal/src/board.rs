// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Memory map and startup sequences of the RVX demo board.

use crate::dispatch::{ECHO_TERMINATOR, IDENTIFY_TERMINATOR};
use crate::interrupt::{self, state::Armed, Csr, InterruptController, IrqLine};
use crate::registers::{RegisterIo, SpiReg, UartReg};
use crate::spi::{Mode, Spi};
use crate::uart::{Uart, UartError};

pub const CONSOLE_BASE: usize = 0x8000_0000;
pub const FLASH_BUS_BASE: usize = 0x8003_0000;

/// The console receive signal is wired to fast interrupt 0.
pub const CONSOLE_IRQ: IrqLine = IrqLine::FAST0;

/// Which service routine the board runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Read the flash manufacturer ID on each key, report it on enter.
    #[default]
    Identify,
    /// Echo printable keys, prompt on enter.
    Echo,
}

impl Variant {
    pub fn banner(self) -> [&'static [u8]; 2] {
        match self {
            Variant::Identify => [
                b"RVX - SPI demo",
                b"\n\nPress Enter to read the SPI Flash Manufacturer ID.\n",
            ],
            Variant::Echo => [b"RVX - UART demo", b"\n\nType something and press Enter:\n"],
        }
    }

    pub fn terminator(self) -> u8 {
        match self {
            Variant::Identify => IDENTIFY_TERMINATOR,
            Variant::Echo => ECHO_TERMINATOR,
        }
    }
}

fn write_banner<U: RegisterIo<UartReg>>(
    console: &mut Uart<U>,
    variant: Variant,
) -> Result<(), UartError> {
    for line in variant.banner() {
        console.write_string(line)?;
    }
    Ok(())
}

/// Result of a startup sequence. Delivery is armed even when the banner
/// write timed out, so the board still services keys.
#[derive(Debug)]
pub struct Started<C> {
    pub irq: InterruptController<C, Armed>,
    pub banner: Result<(), UartError>,
}

impl<C> Started<C> {
    /// The armed controller, or the banner error for callers that treat a
    /// missing banner as a failed boot.
    pub fn into_result(self) -> Result<InterruptController<C, Armed>, UartError> {
        let Started { irq, banner } = self;
        banner.map(|()| irq)
    }
}

/// Startup for the identification variant: banner, bus clock mode, then
/// interrupt delivery on `line` (normally [`CONSOLE_IRQ`]).
///
/// The mode is programmed before delivery is armed so no service routine can
/// start a transaction on an unconfigured controller.
pub fn start_identify<U, S, C>(
    console: &mut Uart<U>,
    flash: &mut Spi<S>,
    mode: Mode,
    csr: C,
    line: IrqLine,
) -> Started<C>
where
    U: RegisterIo<UartReg>,
    S: RegisterIo<SpiReg>,
    C: Csr,
{
    let banner = write_banner(console, Variant::Identify);
    flash.set_mode(mode);
    Started {
        irq: interrupt::arm(csr, line),
        banner,
    }
}

/// Startup for the echo variant: banner, then interrupt delivery.
pub fn start_echo<U, C>(console: &mut Uart<U>, csr: C, line: IrqLine) -> Started<C>
where
    U: RegisterIo<UartReg>,
    C: Csr,
{
    let banner = write_banner(console, Variant::Echo);
    Started {
        irq: interrupt::arm(csr, line),
        banner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{SpiStatus, UartStatus};

    #[derive(Debug, Default)]
    struct Recorder {
        tx: Vec<u8>,
        log: Vec<&'static str>,
        /// Transmitter never drains.
        stuck: bool,
    }

    impl RegisterIo<UartReg> for Recorder {
        fn read(&self, reg: UartReg) -> u32 {
            match reg {
                UartReg::Status if self.stuck => 0,
                UartReg::Status => UartStatus::TX_READY.bits(),
                _ => 0,
            }
        }

        fn write(&mut self, _reg: UartReg, value: u32) {
            self.tx.push(value as u8);
        }
    }

    #[derive(Debug, Default)]
    struct SpiRecorder {
        mode: Option<u32>,
    }

    impl RegisterIo<SpiReg> for SpiRecorder {
        fn read(&self, reg: SpiReg) -> u32 {
            match reg {
                SpiReg::Status => SpiStatus::READY.bits(),
                _ => 0,
            }
        }

        fn write(&mut self, reg: SpiReg, value: u32) {
            if reg == SpiReg::Mode {
                self.mode = Some(value);
            }
        }
    }

    impl Csr for Recorder {
        fn enable_vectored_mode(&mut self) {
            self.log.push("vectored");
        }

        fn unmask(&mut self, _line: IrqLine) {
            self.log.push("unmask");
        }

        fn global_enable(&mut self) {
            self.log.push("enable");
        }
    }

    #[test]
    fn test_identify_startup() {
        let mut console = Recorder::default();
        let mut csr = Recorder::default();
        let mut flash = Spi::new(SpiRecorder::default());
        {
            let mut uart = Uart::new(&mut console);
            let irq = start_identify(&mut uart, &mut flash, Mode::Mode0, &mut csr, CONSOLE_IRQ)
                .into_result()
                .unwrap();
            assert_eq!(irq.line(), Some(CONSOLE_IRQ));
        }
        let text = String::from_utf8(console.tx).unwrap();
        assert!(text.starts_with("RVX - SPI demo\n\nPress Enter"));
        assert_eq!(flash.release().mode, Some(0));
        assert_eq!(csr.log, vec!["vectored", "unmask", "enable"]);
    }

    #[test]
    fn test_echo_startup() {
        let mut console = Recorder::default();
        let mut csr = Recorder::default();
        {
            let mut uart = Uart::new(&mut console);
            start_echo(&mut uart, &mut csr, IrqLine::new(17))
                .into_result()
                .unwrap();
        }
        assert_eq!(
            String::from_utf8(console.tx).unwrap(),
            "RVX - UART demo\n\nType something and press Enter:\n"
        );
        assert_eq!(csr.log.len(), 3);
    }

    #[test]
    fn test_stuck_console_still_arms_delivery() {
        let mut console = Recorder {
            stuck: true,
            ..Default::default()
        };
        let mut csr = Recorder::default();
        let mut flash = Spi::new(SpiRecorder::default());
        {
            let mut uart = Uart::new(&mut console).with_poll_limit(4);
            let started = start_identify(&mut uart, &mut flash, Mode::Mode3, &mut csr, CONSOLE_IRQ);
            assert_eq!(started.banner, Err(UartError::Timeout { polls: 4 }));
            assert_eq!(started.irq.line(), Some(CONSOLE_IRQ));
        }
        assert!(console.tx.is_empty());
        assert_eq!(flash.release().mode, Some(3));
        assert_eq!(csr.log, vec!["vectored", "unmask", "enable"]);
    }

    #[test]
    fn test_variant_terminators() {
        assert_eq!(Variant::default(), Variant::Identify);
        assert_eq!(Variant::Identify.terminator(), b'\n');
        assert_eq!(Variant::Echo.terminator(), b'\r');
    }
}
