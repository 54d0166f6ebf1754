//! Interpreter for the 16-bit Thumb instruction set.
//!
//! The host owns the registers ([`RegisterStore`]), the address space
//! ([`Memory`]) and the software interrupt callback ([`InterruptHandler`]);
//! [`Cpu::run`] borrows them to execute a batch of instructions.

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
mod bitwise;
pub mod cpu;
pub mod error;

#[allow(clippy::cast_possible_truncation)]
pub mod memory;

pub use cpu::registers::{RegisterFile, RegisterStore};
pub use cpu::{Cpu, InterruptHandler, NoInterrupts};
pub use error::{Fault, Halt, InvalidMemory};
pub use memory::{Memory, MemoryConfig, Region, RegionMemory};
