//! Architectural state while a batch is running.
//!
//! Loaded once from the host's [`RegisterStore`] when a batch starts, kept in
//! unpacked form while instructions execute, and flushed back on every exit.

use crate::cpu::psr::StatusFlags;
use crate::cpu::registers::{REG_PC, RegisterFile, RegisterStore};

/// Bytes occupied by one Thumb instruction.
pub const SIZE_OF_INSTRUCTION: u32 = 2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkingState {
    /// R0..R14 and the CPSR bits that are not flags. The R15 slot is stale
    /// while the batch runs, `pc` is authoritative.
    pub registers: RegisterFile,
    pub flags: StatusFlags,
    /// Address of the instruction being executed.
    pub pc: u32,
}

impl WorkingState {
    pub fn load<S: RegisterStore + ?Sized>(store: &S) -> Self {
        let registers = store.load();

        Self {
            registers,
            flags: registers.flags(),
            pc: registers.program_counter() & !1,
        }
    }

    /// Packs `pc` and the flags back into the register file and commits it.
    pub fn flush<S: RegisterStore + ?Sized>(&mut self, store: &mut S) {
        self.registers.set_program_counter(self.pc);
        self.registers.set_flags(self.flags);
        store.store(self.registers);
    }

    /// Register read as an instruction operand: R15 reads as the current
    /// instruction address + 4.
    #[must_use]
    pub fn read(&self, reg: usize) -> u32 {
        if reg == REG_PC {
            self.pc.wrapping_add(4)
        } else {
            self.registers[reg]
        }
    }

    /// Writes a general register. R15 is handled by the branching
    /// instructions themselves.
    pub fn write(&mut self, reg: usize, value: u32) {
        debug_assert_ne!(reg, REG_PC);
        self.registers[reg] = value;
    }

    /// Address of the instruction after the current one.
    #[must_use]
    pub const fn next_pc(&self) -> u32 {
        self.pc.wrapping_add(SIZE_OF_INSTRUCTION)
    }
}
