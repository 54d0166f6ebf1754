//! # Execution Conditions
//!
//! Everything that can end a batch early:
//!
//! - [`InvalidMemory`]: raised by the memory collaborator, propagated untouched.
//! - [`Fault`]: permanent conditions raised while decoding or executing.
//! - [`Halt`]: what `Cpu::run` returns when it did not exhaust its budget.
//!   `Pause` and `Stop` are deliberate exits requested by the interrupt handler.

use thiserror::Error;

/// An address (or address range) rejected by the memory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid memory access of {size} byte(s) at 0x{address:08X}")]
pub struct InvalidMemory {
    pub address: u32,
    pub size: u32,
}

impl InvalidMemory {
    #[must_use]
    pub const fn new(address: u32, size: u32) -> Self {
        Self { address, size }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// Reserved or unassigned encoding: this is not Thumb code.
    #[error("unknown instruction 0x{opcode:04X} at 0x{address:08X}")]
    UnknownInstruction { opcode: u16, address: u32 },

    /// Valid Thumb encoding which the interpreter does not implement.
    #[error("unsupported instruction 0x{opcode:04X} at 0x{address:08X}")]
    UnsupportedInstruction { opcode: u16, address: u32 },

    #[error(transparent)]
    InvalidMemory(#[from] InvalidMemory),

    /// An indirect branch asked to switch to ARM state.
    #[error("branch target 0x{target:08X} requests ARM state")]
    InvalidAddress { target: u32 },

    /// A path that the decoder makes unreachable was reached anyway.
    #[error("internal logic error on instruction 0x{opcode:04X}")]
    InternalLogic { opcode: u16 },
}

/// Why a batch returned before running out of budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Halt {
    #[error("execution paused by the interrupt handler")]
    Pause,

    #[error("execution stopped by the interrupt handler")]
    Stop,

    #[error(transparent)]
    Fault(#[from] Fault),
}

impl From<InvalidMemory> for Halt {
    fn from(error: InvalidMemory) -> Self {
        Self::Fault(Fault::InvalidMemory(error))
    }
}

impl Halt {
    /// `Pause` and `Stop` are requested by the host, everything else is a fault.
    #[must_use]
    pub const fn is_signal(&self) -> bool {
        matches!(self, Self::Pause | Self::Stop)
    }
}
