//! # Software Interrupts
//!
//! `SWI #imm8` is how guest code calls into the host. The interpreter flushes
//! its state, calls the [`InterruptHandler`] with the immediate, then reloads
//! whatever the handler left in the register store.
//!
//! | Handler result      | PC afterwards                  | Batch          |
//! |---------------------|--------------------------------|----------------|
//! | `Ok(())`            | as stored by the handler       | continues      |
//! | `Err(Halt::Pause)`  | as stored by the handler       | ends           |
//! | `Err(Halt::Stop)`   | stored value + 2               | ends           |
//! | any other `Err`     | as stored by the handler       | ends           |
//!
//! The PC is not advanced past the `SWI` on a normal return: a handler that
//! wants execution to continue after it must move the stored PC itself.

use crate::cpu::registers::RegisterStore;
use crate::cpu::state::{SIZE_OF_INSTRUCTION, WorkingState};
use crate::error::Halt;
use crate::memory::Memory;

pub trait InterruptHandler {
    fn invoke(
        &mut self,
        code: u8,
        registers: &mut dyn RegisterStore,
        memory: &mut dyn Memory,
    ) -> Result<(), Halt>;
}

impl<F> InterruptHandler for F
where
    F: FnMut(u8, &mut dyn RegisterStore, &mut dyn Memory) -> Result<(), Halt>,
{
    fn invoke(
        &mut self,
        code: u8,
        registers: &mut dyn RegisterStore,
        memory: &mut dyn Memory,
    ) -> Result<(), Halt> {
        self(code, registers, memory)
    }
}

/// Stops the batch on any `SWI`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoInterrupts;

impl InterruptHandler for NoInterrupts {
    fn invoke(
        &mut self,
        _code: u8,
        _registers: &mut dyn RegisterStore,
        _memory: &mut dyn Memory,
    ) -> Result<(), Halt> {
        Err(Halt::Stop)
    }
}

impl WorkingState {
    pub(crate) fn software_interrupt<S, M, H>(
        &mut self,
        comment: u8,
        store: &mut S,
        memory: &mut M,
        handler: &mut H,
    ) -> Result<(), Halt>
    where
        S: RegisterStore,
        M: Memory,
        H: InterruptHandler + ?Sized,
    {
        self.flush(store);
        let outcome = handler.invoke(comment, store, memory);
        *self = Self::load(&*store);

        match outcome {
            Err(Halt::Stop) => {
                self.pc = self.pc.wrapping_add(SIZE_OF_INSTRUCTION);
                Err(Halt::Stop)
            }
            outcome => outcome,
        }
    }
}
