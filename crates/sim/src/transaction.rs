// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::Serialize;

/// Bus-level activity recorded by the SPI controller model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BusEvent {
    Mode { bits: u32 },
    Select { slave: u8 },
    Exchange { tx: u8, rx: u8 },
    Deselect { slave: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrderingViolation {
    #[error("event {index}: exchange {tx:#04x} with no slave selected")]
    ExchangeOutsideSelect { index: usize, tx: u8 },
    #[error("event {index}: slave {slave} selected inside an open transaction")]
    NestedSelect { index: usize, slave: u8 },
    #[error("event {index}: slave {slave} deselected without a matching select")]
    UnmatchedDeselect { index: usize, slave: u8 },
    #[error("event {index}: mode changed inside a transaction")]
    ModeChangedMidTransaction { index: usize },
    #[error("transaction on slave {slave} never deselected")]
    Unterminated { slave: u8 },
}

/// Incremental form of [`check_transactions`], fed one event at a time so the
/// event log itself can be discarded. The first violation sticks.
#[derive(Debug, Clone, Default)]
pub struct TransactionChecker {
    index: usize,
    open: Option<u8>,
    complete: usize,
    violation: Option<OrderingViolation>,
}

impl TransactionChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, event: BusEvent) {
        let index = self.index;
        self.index += 1;
        if self.violation.is_some() {
            return;
        }
        let violation = match (event, self.open) {
            (BusEvent::Select { slave }, None) => {
                self.open = Some(slave);
                None
            }
            (BusEvent::Select { slave }, Some(_)) => {
                Some(OrderingViolation::NestedSelect { index, slave })
            }
            (BusEvent::Exchange { tx, .. }, None) => {
                Some(OrderingViolation::ExchangeOutsideSelect { index, tx })
            }
            (BusEvent::Exchange { .. }, Some(_)) => None,
            (BusEvent::Deselect { slave }, Some(current)) if slave == current => {
                self.open = None;
                self.complete += 1;
                None
            }
            (BusEvent::Deselect { slave }, _) => {
                Some(OrderingViolation::UnmatchedDeselect { index, slave })
            }
            (BusEvent::Mode { .. }, Some(_)) => {
                Some(OrderingViolation::ModeChangedMidTransaction { index })
            }
            (BusEvent::Mode { .. }, None) => None,
        };
        self.violation = violation;
    }

    /// Complete transactions so far, or the first violation. A transaction
    /// still open counts as unterminated.
    pub fn finish(&self) -> Result<usize, OrderingViolation> {
        if let Some(violation) = self.violation {
            return Err(violation);
        }
        match self.open {
            Some(slave) => Err(OrderingViolation::Unterminated { slave }),
            None => Ok(self.complete),
        }
    }
}

/// Checks that every exchange sits inside one select/deselect pair and that
/// transactions never overlap. Returns the number of complete transactions.
pub fn check_transactions(events: &[BusEvent]) -> Result<usize, OrderingViolation> {
    let mut checker = TransactionChecker::new();
    for event in events {
        checker.feed(*event);
    }
    checker.finish()
}
