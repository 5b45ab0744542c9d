// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::transaction::BusEvent;
use crate::{PeripheralTickResult, SimResult};
use rvx_hal::registers::{SpiReg, SpiStatus, CS_IDLE};

/// MISO level when no slave drives the line.
const MISO_IDLE: u8 = 0xFF;

/// A slave device on the SPI bus.
pub trait SpiDevice: std::fmt::Debug + Send {
    /// Chip select asserted.
    fn select(&mut self);
    /// One full-duplex byte; returns what the device shifts out.
    fn exchange(&mut self, mosi: u8) -> u8;
    /// Chip select released.
    fn deselect(&mut self);
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// RVX SPI controller model.
///
/// Writing the transmit register exchanges one byte with every selected slave
/// and keeps the controller busy for `latency` ticks. A stalled controller
/// never reports ready again.
#[derive(Debug, serde::Serialize)]
pub struct SpiController {
    mode: u32,
    chip_select: u32,
    divider: u32,
    rx: u32,
    busy_ticks: u32,
    latency: u32,
    stalled: bool,
    exchanges: u64,
    #[serde(skip)]
    slaves: Vec<(u8, Box<dyn SpiDevice>)>,
    #[serde(skip)]
    log: Vec<BusEvent>,
}

impl Default for SpiController {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SpiController {
    pub fn new(latency: u32) -> Self {
        Self {
            mode: 0,
            chip_select: CS_IDLE,
            divider: 0,
            rx: 0,
            busy_ticks: 0,
            latency,
            stalled: false,
            exchanges: 0,
            slaves: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Wire `device` to chip-select line `slave`.
    pub fn attach(&mut self, slave: u8, device: Box<dyn SpiDevice>) {
        self.slaves.retain(|(s, _)| *s != slave);
        self.slaves.push((slave, device));
    }

    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    pub fn mode_bits(&self) -> u32 {
        self.mode
    }

    pub fn divider(&self) -> u32 {
        self.divider
    }

    pub fn is_ready(&self) -> bool {
        !self.stalled && self.busy_ticks == 0
    }

    pub fn events(&self) -> &[BusEvent] {
        &self.log
    }

    pub fn take_events(&mut self) -> Vec<BusEvent> {
        std::mem::take(&mut self.log)
    }

    fn is_selected(cs: u32, slave: u8) -> bool {
        cs & (1 << slave) == 0
    }

    fn write_chip_select(&mut self, value: u32) {
        let old = self.chip_select;
        self.chip_select = value;
        for slave in 0..32u8 {
            let was = Self::is_selected(old, slave);
            let now = Self::is_selected(value, slave);
            if was == now {
                continue;
            }
            let device = self
                .slaves
                .iter_mut()
                .find(|(s, _)| *s == slave)
                .map(|(_, d)| d);
            if now {
                tracing::debug!("SPI CS{} asserted", slave);
                self.log.push(BusEvent::Select { slave });
                if let Some(device) = device {
                    device.select();
                }
            } else {
                tracing::debug!("SPI CS{} released", slave);
                self.log.push(BusEvent::Deselect { slave });
                if let Some(device) = device {
                    device.deselect();
                }
            }
        }
    }

    fn exchange(&mut self, tx: u8) {
        let cs = self.chip_select;
        let mut rx = MISO_IDLE;
        for (slave, device) in self.slaves.iter_mut() {
            if Self::is_selected(cs, *slave) {
                // Open-drain style: any slave pulling a bit low wins.
                rx &= device.exchange(tx);
            }
        }
        self.rx = rx as u32;
        self.exchanges += 1;
        self.busy_ticks = self.latency;
        self.log.push(BusEvent::Exchange { tx, rx });
    }

    fn read_reg(&self, reg: SpiReg) -> u32 {
        match reg {
            SpiReg::Mode => self.mode,
            SpiReg::ChipSelect => self.chip_select,
            SpiReg::Divider => self.divider,
            SpiReg::TxData => 0,
            SpiReg::RxData => self.rx,
            SpiReg::Status => {
                if self.is_ready() {
                    SpiStatus::READY.bits()
                } else {
                    0
                }
            }
        }
    }

    fn write_reg(&mut self, reg: SpiReg, value: u32) {
        match reg {
            SpiReg::Mode => {
                self.mode = value & 0b11;
                self.log.push(BusEvent::Mode { bits: self.mode });
            }
            SpiReg::ChipSelect => self.write_chip_select(value),
            SpiReg::Divider => self.divider = value,
            SpiReg::TxData => self.exchange((value & 0xFF) as u8),
            SpiReg::RxData | SpiReg::Status => {}
        }
    }
}

impl crate::Peripheral for SpiController {
    fn read(&self, offset: u64) -> SimResult<u32> {
        Ok(SpiReg::from_offset(offset)
            .map(|reg| self.read_reg(reg))
            .unwrap_or(0))
    }

    fn write(&mut self, offset: u64, value: u32) -> SimResult<()> {
        if let Some(reg) = SpiReg::from_offset(offset) {
            self.write_reg(reg, value);
        }
        Ok(())
    }

    fn tick(&mut self) -> PeripheralTickResult {
        self.busy_ticks = self.busy_ticks.saturating_sub(1);
        PeripheralTickResult::default()
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            let slaves: serde_json::Map<String, serde_json::Value> = self
                .slaves
                .iter()
                .map(|(slave, device)| (format!("cs{}", slave), device.snapshot()))
                .collect();
            map.insert("slaves".to_string(), serde_json::Value::Object(slaves));
        }
        value
    }
}
