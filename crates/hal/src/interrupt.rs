// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::marker::PhantomData;

/// Machine-level interrupt line, numbered by its bit in `mie`/`mip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IrqLine(u8);

impl IrqLine {
    /// Fast interrupt line 0, wired to the console receive event.
    pub const FAST0: IrqLine = IrqLine(16);

    pub const fn new(bit: u8) -> Self {
        Self(bit)
    }

    pub const fn bit(self) -> u8 {
        self.0
    }

    pub const fn mask(self) -> u32 {
        1 << self.0
    }

    /// `mcause` value hardware reports when this line is taken.
    pub const fn cause(self) -> u32 {
        0x8000_0000 | self.0 as u32
    }
}

/// Privileged interrupt configuration provided by the platform.
///
/// Implementations own the CSR encoding: the firmware writes the real machine
/// registers, the simulator updates its modeled hart.
pub trait Csr {
    /// Switch `mtvec` to vectored dispatch.
    fn enable_vectored_mode(&mut self);
    /// Set the line's bit in `mie`.
    fn unmask(&mut self, line: IrqLine);
    /// Set `mstatus.MIE`.
    fn global_enable(&mut self);
}

impl<T: Csr + ?Sized> Csr for &mut T {
    fn enable_vectored_mode(&mut self) {
        (**self).enable_vectored_mode()
    }

    fn unmask(&mut self, line: IrqLine) {
        (**self).unmask(line)
    }

    fn global_enable(&mut self) {
        (**self).global_enable()
    }
}

/// Lifecycle states of [`InterruptController`].
pub mod state {
    #[derive(Debug)]
    pub struct Unconfigured;
    #[derive(Debug)]
    pub struct Vectored;
    #[derive(Debug)]
    pub struct Unmasked;
    #[derive(Debug)]
    pub struct Armed;
}

/// Process-scoped interrupt controller.
///
/// Startup must run `enable_vectored_mode`, `unmask` and `global_enable` in
/// that order. Each step consumes the controller and returns it in the next
/// state, so skipping or reordering a step does not compile. Once armed,
/// delivery stays on for the lifetime of the program.
#[derive(Debug)]
pub struct InterruptController<C, S = state::Unconfigured> {
    csr: C,
    line: Option<IrqLine>,
    _state: PhantomData<S>,
}

impl<C: Csr, S> InterruptController<C, S> {
    fn transition<N>(self) -> InterruptController<C, N> {
        InterruptController {
            csr: self.csr,
            line: self.line,
            _state: PhantomData,
        }
    }
}

impl<C: Csr> InterruptController<C, state::Unconfigured> {
    pub fn new(csr: C) -> Self {
        Self {
            csr,
            line: None,
            _state: PhantomData,
        }
    }

    pub fn enable_vectored_mode(mut self) -> InterruptController<C, state::Vectored> {
        self.csr.enable_vectored_mode();
        hal_trace!("interrupt delivery switched to vectored mode");
        self.transition()
    }
}

impl<C: Csr> InterruptController<C, state::Vectored> {
    pub fn unmask(mut self, line: IrqLine) -> InterruptController<C, state::Unmasked> {
        self.csr.unmask(line);
        self.line = Some(line);
        hal_trace!(line = line.bit(), "interrupt line unmasked");
        self.transition()
    }
}

impl<C: Csr> InterruptController<C, state::Unmasked> {
    pub fn global_enable(mut self) -> InterruptController<C, state::Armed> {
        self.csr.global_enable();
        hal_trace!("interrupt delivery armed");
        self.transition()
    }
}

impl<C: Csr> InterruptController<C, state::Armed> {
    /// The single line delivery was armed for.
    pub fn line(&self) -> Option<IrqLine> {
        self.line
    }
}

/// Runs the whole startup sequence for one line.
pub fn arm<C: Csr>(csr: C, line: IrqLine) -> InterruptController<C, state::Armed> {
    InterruptController::new(csr)
        .enable_vectored_mode()
        .unmask(line)
        .global_enable()
}
