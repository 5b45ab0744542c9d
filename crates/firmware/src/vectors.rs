// RVX Interrupt Demo - SPI/UART interrupt-driven firmware and simulator
// Copyright (C) 2026 RVX contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Vectored trap table.
//!
//! Slot 16 (fast IRQ 0) saves the caller-saved registers, calls the image's
//! `rvx_fast0_handler` and returns with `mret`. Every other slot, including
//! the synchronous exception slot 0, parks the hart.

core::arch::global_asm!(
    r#"
    .section .trap, "ax"
    .balign 256
    .global rvx_vector_table
rvx_vector_table:
    .rept 16
    j rvx_unexpected_trap
    .endr
    j rvx_fast0_trampoline
    .rept 15
    j rvx_unexpected_trap
    .endr

rvx_fast0_trampoline:
    addi sp, sp, -64
    sw ra, 0(sp)
    sw t0, 4(sp)
    sw t1, 8(sp)
    sw t2, 12(sp)
    sw a0, 16(sp)
    sw a1, 20(sp)
    sw a2, 24(sp)
    sw a3, 28(sp)
    sw a4, 32(sp)
    sw a5, 36(sp)
    sw a6, 40(sp)
    sw a7, 44(sp)
    sw t3, 48(sp)
    sw t4, 52(sp)
    sw t5, 56(sp)
    sw t6, 60(sp)
    call rvx_fast0_handler
    lw ra, 0(sp)
    lw t0, 4(sp)
    lw t1, 8(sp)
    lw t2, 12(sp)
    lw a0, 16(sp)
    lw a1, 20(sp)
    lw a2, 24(sp)
    lw a3, 28(sp)
    lw a4, 32(sp)
    lw a5, 36(sp)
    lw a6, 40(sp)
    lw a7, 44(sp)
    lw t3, 48(sp)
    lw t4, 52(sp)
    lw t5, 56(sp)
    lw t6, 60(sp)
    addi sp, sp, 64
    mret

rvx_unexpected_trap:
    j rvx_unexpected_trap
"#
);

extern "C" {
    fn rvx_vector_table();
}

pub fn table_address() -> usize {
    rvx_vector_table as usize
}
