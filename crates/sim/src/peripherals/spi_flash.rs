// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::spi::SpiDevice;

/// JEDEC "read identification" opcode.
pub const CMD_READ_ID: u8 = 0x9F;
/// Byte a flash drives while it has nothing to say.
const HIGH_Z: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum FlashState {
    Deselected,
    /// Selected, waiting for the opcode byte.
    Opcode,
    /// Shifting out ID byte `n`.
    ReadId(usize),
    /// Unsupported opcode, ignore the rest of the transaction.
    Ignore,
}

/// Mock serial NOR flash answering the JEDEC read-ID command.
///
/// Only `0x9F` is decoded; after the opcode the device shifts out the
/// manufacturer, memory type and capacity bytes, then repeats them.
#[derive(Debug, serde::Serialize)]
pub struct SpiFlash {
    pub jedec_id: [u8; 3],
    state: FlashState,
    commands: u64,
}

impl SpiFlash {
    pub fn new(manufacturer_id: u8, memory_type: u8, capacity: u8) -> Self {
        Self {
            jedec_id: [manufacturer_id, memory_type, capacity],
            state: FlashState::Deselected,
            commands: 0,
        }
    }

    pub fn manufacturer_id(&self) -> u8 {
        self.jedec_id[0]
    }
}

impl SpiDevice for SpiFlash {
    fn select(&mut self) {
        self.state = FlashState::Opcode;
    }

    fn exchange(&mut self, mosi: u8) -> u8 {
        match self.state {
            FlashState::Deselected | FlashState::Ignore => HIGH_Z,
            FlashState::Opcode => {
                self.commands += 1;
                self.state = if mosi == CMD_READ_ID {
                    FlashState::ReadId(0)
                } else {
                    tracing::debug!("Flash ignoring opcode {:#04x}", mosi);
                    FlashState::Ignore
                };
                HIGH_Z
            }
            FlashState::ReadId(n) => {
                self.state = FlashState::ReadId(n + 1);
                self.jedec_id[n % self.jedec_id.len()]
            }
        }
    }

    fn deselect(&mut self) {
        self.state = FlashState::Deselected;
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_id_sequence() {
        let mut flash = SpiFlash::new(0xC2, 0x20, 0x16);
        flash.select();
        assert_eq!(flash.exchange(CMD_READ_ID), 0xFF);
        assert_eq!(flash.exchange(0x00), 0xC2);
        assert_eq!(flash.exchange(0x00), 0x20);
        assert_eq!(flash.exchange(0x00), 0x16);
        assert_eq!(flash.exchange(0x00), 0xC2);
        flash.deselect();
        assert_eq!(flash.exchange(0x00), 0xFF);
    }

    #[test]
    fn test_reselect_restarts_command() {
        let mut flash = SpiFlash::new(0x01, 0x02, 0x19);
        flash.select();
        flash.exchange(CMD_READ_ID);
        flash.exchange(0x00);
        flash.deselect();

        flash.select();
        flash.exchange(CMD_READ_ID);
        assert_eq!(flash.exchange(0x00), 0x01);
    }

    #[test]
    fn test_other_opcodes_are_ignored() {
        let mut flash = SpiFlash::new(0x20, 0xBA, 0x18);
        flash.select();
        assert_eq!(flash.exchange(0x05), 0xFF);
        assert_eq!(flash.exchange(0x00), 0xFF);
        assert_eq!(flash.manufacturer_id(), 0x20);
    }
}
