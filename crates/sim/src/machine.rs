// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::{SystemBus, CONSOLE, FLASH_BUS};
use crate::hart::Hart;
use crate::peripherals::spi::SpiController;
use crate::peripherals::uart::ConsoleUart;
use crate::snapshot::MachineSnapshot;
use crate::transaction::{BusEvent, OrderingViolation, TransactionChecker};
use crate::window::BusWindow;
use crate::{SimResult, SimulationError};
use rvx_config::{BoardConfig, Variant};
use rvx_hal::board;
use rvx_hal::{
    DispatchError, EchoDispatcher, EchoEvent, IdentifyDispatcher, IdentifyEvent,
    InterruptHandler, IrqLine, Mode, Spi, Uart,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// SPI bus events kept for inspection. Older events are still counted by the
/// ordering check.
pub const BUS_LOG_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not booted yet.
    #[default]
    Reset,
    /// Startup done; the main path spins with delivery armed.
    Idle,
    /// A service routine is running.
    Handling,
}

/// The service routine installed at the console's vector slot.
#[derive(Debug)]
enum Routine {
    Identify(IdentifyDispatcher<BusWindow, BusWindow>),
    Echo(EchoDispatcher<BusWindow>),
}

impl Routine {
    fn run(&mut self) -> Result<IrqEvent, DispatchError> {
        match self {
            Routine::Identify(isr) => isr.on_interrupt().map(IrqEvent::Identify),
            Routine::Echo(isr) => isr.on_interrupt().map(IrqEvent::Echo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqEvent {
    Identify(IdentifyEvent),
    Echo(EchoEvent),
}

/// One delivered interrupt and what its service routine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqOutcome {
    pub cause: u32,
    pub vector: u32,
    pub result: Result<IrqEvent, DispatchError>,
}

/// The demo board: hart, bus and the booted service routine.
///
/// Console bytes are fed with [`Machine::press`]; each one raises the console
/// interrupt, which the hart delivers through its vector table to the routine.
pub struct Machine {
    config: BoardConfig,
    bus: Arc<Mutex<SystemBus>>,
    hart: Hart,
    line: IrqLine,
    terminator: Option<u8>,
    routine: Option<Routine>,
    state: RunState,
    console_tx: Arc<Mutex<Vec<u8>>>,
    interrupts: u64,
    reports: u64,
    dispatch_failures: u64,
    bus_log: VecDeque<BusEvent>,
    bus_checker: TransactionChecker,
}

impl Machine {
    pub fn new(config: BoardConfig) -> anyhow::Result<Self> {
        let mut bus = SystemBus::from_config(&config)?;
        let console_tx = Arc::new(Mutex::new(Vec::new()));
        bus.attach_console_sink(console_tx.clone(), false);
        let terminator = config.terminator_byte()?;

        Ok(Self {
            line: IrqLine::new(config.console.irq),
            terminator,
            config,
            bus: Arc::new(Mutex::new(bus)),
            hart: Hart::default(),
            routine: None,
            state: RunState::Reset,
            console_tx,
            interrupts: 0,
            reports: 0,
            dispatch_failures: 0,
            bus_log: VecDeque::with_capacity(BUS_LOG_CAPACITY),
            bus_checker: TransactionChecker::new(),
        })
    }

    /// Print console output to stdout as it is transmitted.
    pub fn echo_console(&mut self, enabled: bool) {
        let sink = self.console_tx.clone();
        self.lock_bus().attach_console_sink(sink, enabled);
    }

    fn lock_bus(&self) -> MutexGuard<'_, SystemBus> {
        self.bus.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run the variant's startup sequence and park in the idle loop.
    pub fn boot(&mut self) -> SimResult<()> {
        if self.routine.is_some() {
            tracing::warn!("Machine already booted; ignoring boot request");
            return Ok(());
        }

        let mut console = Uart::new(BusWindow::new(self.bus.clone(), self.config.console.base))
            .with_poll_limit(self.config.console.tx_poll_limit);

        let routine = match self.config.variant {
            Variant::Identify => {
                let mut flash =
                    Spi::new(BusWindow::new(self.bus.clone(), self.config.flash_bus.base))
                        .with_poll_limit(self.config.flash_bus.ready_poll_limit);
                flash.set_clock_divider(self.config.flash_bus.divider);
                let mode = Mode::from_bits(self.config.flash_bus.mode as u32);
                board::start_identify(&mut console, &mut flash, mode, &mut self.hart, self.line)
                    .into_result()?;

                let isr = IdentifyDispatcher::new(console, flash).with_terminator(
                    self.terminator
                        .unwrap_or(board::Variant::Identify.terminator()),
                );
                Routine::Identify(isr)
            }
            Variant::Echo => {
                board::start_echo(&mut console, &mut self.hart, self.line).into_result()?;
                let isr = EchoDispatcher::new(console)
                    .with_terminator(self.terminator.unwrap_or(board::Variant::Echo.terminator()));
                Routine::Echo(isr)
            }
        };

        tracing::info!(
            "Booted '{}' ({:?}), console IRQ {} armed",
            self.config.name,
            self.config.variant,
            self.line.bit()
        );
        self.routine = Some(routine);
        self.state = RunState::Idle;
        self.drain_bus_events();
        Ok(())
    }

    /// A byte arrives on the console and is serviced.
    pub fn press(&mut self, byte: u8) -> SimResult<Option<IrqOutcome>> {
        if self.routine.is_none() {
            return Err(SimulationError::NotBooted);
        }
        self.lock_bus()
            .peripheral_mut::<ConsoleUart>(CONSOLE)
            .ok_or(SimulationError::MissingPeripheral(CONSOLE))?
            .receive(byte);
        self.service()
    }

    pub fn type_keys(&mut self, bytes: &[u8]) -> SimResult<Vec<IrqOutcome>> {
        let mut outcomes = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            outcomes.extend(self.press(byte)?);
        }
        Ok(outcomes)
    }

    /// Spin the idle loop for `steps` bus ticks, servicing anything that
    /// becomes pending.
    pub fn idle(&mut self, steps: u64) -> SimResult<Vec<IrqOutcome>> {
        if self.routine.is_none() {
            return Err(SimulationError::NotBooted);
        }
        let mut outcomes = Vec::new();
        for _ in 0..steps {
            outcomes.extend(self.service()?);
        }
        Ok(outcomes)
    }

    /// One idle-loop step: advance the bus, latch requests into `mip` and, if
    /// the hart takes a trap, run the routine to completion and return.
    fn service(&mut self) -> SimResult<Option<IrqOutcome>> {
        self.drain_bus_events();
        let pending = {
            let mut bus = self.lock_bus();
            bus.tick_peripherals();
            bus.take_pending_irqs()
        };
        self.hart.pend(pending);

        let Some(trap) = self.hart.take_interrupt() else {
            return Ok(None);
        };
        if !trap.vectored || trap.line != self.line {
            tracing::error!(
                "Trap {:#x} at {:#x} has no routine installed",
                trap.cause,
                trap.vector
            );
            return Err(SimulationError::UnhandledTrap {
                cause: trap.cause,
                vector: trap.vector,
            });
        }
        let routine = self.routine.as_mut().ok_or(SimulationError::NotBooted)?;

        self.state = RunState::Handling;
        let result = routine.run();
        self.drain_bus_events();
        self.hart.mret();
        self.state = RunState::Idle;
        self.interrupts += 1;

        match &result {
            Ok(event) => {
                tracing::debug!("IRQ {:#x} handled: {:?}", trap.cause, event);
                if matches!(event, IrqEvent::Identify(IdentifyEvent::Reported { .. })) {
                    self.reports += 1;
                }
            }
            Err(e) => {
                self.dispatch_failures += 1;
                tracing::warn!("IRQ {:#x} dispatch failed: {}", trap.cause, e);
            }
        }

        Ok(Some(IrqOutcome {
            cause: trap.cause,
            vector: trap.vector,
            result,
        }))
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn hart(&self) -> &Hart {
        &self.hart
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn interrupts(&self) -> u64 {
        self.interrupts
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }

    pub fn dispatch_failures(&self) -> u64 {
        self.dispatch_failures
    }

    pub fn console_output(&self) -> Vec<u8> {
        self.console_tx
            .lock()
            .map(|tx| tx.clone())
            .unwrap_or_default()
    }

    pub fn take_console_output(&self) -> Vec<u8> {
        self.console_tx
            .lock()
            .map(|mut tx| std::mem::take(&mut *tx))
            .unwrap_or_default()
    }

    /// Moves the controller's event log into the machine's bounded history
    /// and the running ordering check.
    fn drain_bus_events(&mut self) {
        let events = self
            .lock_bus()
            .peripheral_mut::<SpiController>(FLASH_BUS)
            .map(|spi| spi.take_events())
            .unwrap_or_default();
        for event in events {
            self.bus_checker.feed(event);
            if self.bus_log.len() == BUS_LOG_CAPACITY {
                self.bus_log.pop_front();
            }
            self.bus_log.push_back(event);
        }
    }

    fn undrained_bus_events(&self) -> Vec<BusEvent> {
        self.lock_bus()
            .peripheral::<SpiController>(FLASH_BUS)
            .map(|spi| spi.events().to_vec())
            .unwrap_or_default()
    }

    /// The most recent SPI bus events, oldest first, at most
    /// [`BUS_LOG_CAPACITY`] of them.
    pub fn bus_events(&self) -> Vec<BusEvent> {
        let mut events: Vec<BusEvent> = self.bus_log.iter().copied().collect();
        events.extend(self.undrained_bus_events());
        let excess = events.len().saturating_sub(BUS_LOG_CAPACITY);
        events.drain(..excess);
        events
    }

    /// Complete select/deselect transactions since power-on, or the first
    /// ordering violation seen.
    pub fn bus_transactions(&self) -> Result<usize, OrderingViolation> {
        let mut checker = self.bus_checker.clone();
        for event in self.undrained_bus_events() {
            checker.feed(event);
        }
        checker.finish()
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        let bus = self.lock_bus();
        let peripherals: HashMap<String, serde_json::Value> = bus
            .peripherals
            .iter()
            .map(|p| (p.name.clone(), p.dev.snapshot()))
            .collect();
        MachineSnapshot {
            board: self.config.name.clone(),
            state: self.state,
            hart: self.hart.snapshot(),
            interrupts: self.interrupts,
            dispatch_failures: self.dispatch_failures,
            bus_ticks: bus.ticks(),
            peripherals,
        }
    }
}
