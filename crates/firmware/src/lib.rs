// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Board support shared by the RVX demo images.
//!
//! Each image defines `rvx_fast0_handler`, which the vector table reaches
//! through a register-saving trampoline whenever the console receives a byte.

#![no_std]

pub mod platform;
pub mod vectors;
