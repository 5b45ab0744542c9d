// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// JEDEC manufacturer IDs the demo knows by name.
pub const VENDORS: [(u8, &str); 3] = [(0x01, "Infineon"), (0xC2, "Macronix"), (0x20, "Micron")];

pub const UNKNOWN_VENDOR: &str = "Unknown";

/// Maps the first byte of a read-ID reply to a manufacturer name.
pub fn vendor_name(id: u8) -> &'static str {
    VENDORS
        .iter()
        .find(|(code, _)| *code == id)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_VENDOR)
}

/// Three-digit, zero-padded decimal rendering of `value`.
pub fn decimal3(value: u8) -> [u8; 3] {
    [
        b'0' + value / 100,
        b'0' + (value / 10) % 10,
        b'0' + value % 10,
    ]
}
