//! # Register File
//!
//! The architectural state handed to and from the interpreter.
//!
//! - **R0-R7**: Low registers, reachable by every Thumb instruction
//! - **R8-R12**: High registers, only through the Hi register operations
//! - **R13 (SP)**: Stack pointer
//! - **R14 (LR)**: Link register (return address)
//! - **R15 (PC)**: Program counter, reads as the instruction address + 4
//! - **CPSR**: Packed status word, see [`psr`](super::psr)
//!
//! The host owns the register file through a [`RegisterStore`]. The
//! interpreter loads a snapshot at the start of a batch and stores it back
//! once the batch ends, however it ends.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::cpu::psr::StatusFlags;

/// Stack Pointer register index.
pub const REG_SP: usize = 0xD;

/// Link Register index (return address for subroutines).
pub const REG_LR: usize = 0xE;

/// Program Counter register index.
pub const REG_PC: usize = 0xF;

/// Slot holding the packed status word.
pub const REG_CPSR: usize = 0x10;

/// R0..R15 followed by the CPSR.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile([u32; 17]);

impl RegisterFile {
    #[must_use]
    pub const fn new(values: [u32; 17]) -> Self {
        Self(values)
    }

    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.0[REG_PC]
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.0[REG_PC] = new_value;
    }

    #[must_use]
    pub const fn cpsr(&self) -> u32 {
        self.0[REG_CPSR]
    }

    pub const fn set_cpsr(&mut self, new_value: u32) {
        self.0[REG_CPSR] = new_value;
    }

    #[must_use]
    pub const fn flags(&self) -> StatusFlags {
        StatusFlags::from_cpsr(self.cpsr())
    }

    /// Replaces the five condition bits of the CPSR, leaving every other bit alone.
    pub const fn set_flags(&mut self, flags: StatusFlags) {
        self.0[REG_CPSR] = flags.merge_into(self.0[REG_CPSR]);
    }

    /// # Panics
    ///
    /// Panics if `reg` is not a register index (0..=16).
    #[must_use]
    pub fn register_at(&self, reg: usize) -> u32 {
        assert!(reg <= REG_CPSR, "Invalid register index: {reg} (0x{reg:X})");
        self.0[reg]
    }

    /// # Panics
    ///
    /// Panics if `reg` is not a register index (0..=16).
    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        assert!(reg <= REG_CPSR, "Invalid register index: {reg} (0x{reg:X})");
        self.0[reg] = new_value;
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u32> {
        self.0.to_vec()
    }
}

impl Index<usize> for RegisterFile {
    type Output = u32;

    fn index(&self, reg: usize) -> &Self::Output {
        &self.0[reg]
    }
}

impl IndexMut<usize> for RegisterFile {
    fn index_mut(&mut self, reg: usize) -> &mut Self::Output {
        &mut self.0[reg]
    }
}

/// Host-side storage the interpreter borrows its registers from.
pub trait RegisterStore {
    /// Snapshot of the current architectural state.
    fn load(&self) -> RegisterFile;

    /// Commits a whole register file at once.
    fn store(&mut self, registers: RegisterFile);
}

impl RegisterStore for RegisterFile {
    fn load(&self) -> RegisterFile {
        *self
    }

    fn store(&mut self, registers: RegisterFile) {
        *self = registers;
    }
}

impl<T: RegisterStore + ?Sized> RegisterStore for &mut T {
    fn load(&self) -> RegisterFile {
        (**self).load()
    }

    fn store(&mut self, registers: RegisterFile) {
        (**self).store(registers);
    }
}
