//! # Batch Interpreter
//!
//! [`Cpu::run`] executes up to `count` instructions:
//!
//! 1. load the registers and flags from the [`RegisterStore`]
//! 2. fetch from the [`CodeCache`], decode, execute, advance the PC
//! 3. flush PC, registers and flags back to the store
//!
//! Step 3 happens on every exit, including pause/stop requests and faults.
//!
//! ## Instruction budget
//!
//! Each retired instruction costs one unit. The first half of a `BL` pair is
//! refunded so the pair costs one unit overall. A fault leaves the faulting
//! instruction uncounted. A `SWI` is counted even when its handler ends the batch.

use serde::{Deserialize, Serialize};
use vecfixed::VecFixed;

use crate::cpu::code_cache::CodeCache;
use crate::cpu::interrupt::InterruptHandler;
use crate::cpu::registers::RegisterStore;
use crate::cpu::state::WorkingState;
use crate::cpu::thumb::instruction::Instruction;
use crate::error::Halt;
use crate::memory::{Memory, Region};

/// Number of recently executed instructions kept for diagnostics.
pub const HISTORY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub address: u32,
    pub opcode: u16,
}

impl std::fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}: {:04X}", self.address, self.opcode)?;
        match Instruction::try_from(self.opcode) {
            Ok(instruction) => write!(f, " {instruction}"),
            Err(_) => f.write_str(" ???"),
        }
    }
}

pub struct Cpu<S: RegisterStore, M: Memory, H: InterruptHandler> {
    pub registers: S,
    pub memory: M,
    pub handler: H,

    code_cache: Option<CodeCache>,
    executed: u64,
    history: VecFixed<HISTORY_LEN, HistoryEntry>,
}

impl<S: RegisterStore, M: Memory, H: InterruptHandler> Cpu<S, M, H> {
    pub fn new(registers: S, memory: M, handler: H) -> Self {
        Self {
            registers,
            memory,
            handler,
            code_cache: None,
            executed: 0,
            history: VecFixed::new(),
        }
    }

    /// Instructions retired since creation, across every batch.
    #[must_use]
    pub const fn executed(&self) -> u64 {
        self.executed
    }

    #[must_use]
    pub const fn history(&self) -> &VecFixed<HISTORY_LEN, HistoryEntry> {
        &self.history
    }

    /// Region cached on the first batch, `None` before that.
    #[must_use]
    pub fn code_region(&self) -> Option<Region> {
        self.code_cache.as_ref().map(CodeCache::region)
    }

    /// Runs up to `count` instructions.
    ///
    /// # Errors
    ///
    /// Returns [`Halt::Pause`] or [`Halt::Stop`] when the interrupt handler
    /// asks for it, [`Halt::Fault`] when an instruction cannot be executed.
    /// The register store is up to date in every case.
    pub fn run(&mut self, count: u32) -> Result<(), Halt> {
        let mut state = WorkingState::load(&self.registers);
        let mut retired = 0;

        let outcome = self.execute_batch(&mut state, count, &mut retired);

        state.flush(&mut self.registers);
        self.executed += retired;

        if let Err(halt) = &outcome {
            if halt.is_signal() {
                tracing::debug!("{halt} at 0x{:08X}", state.pc);
            } else {
                tracing::warn!("{halt}");
            }
            tracing::debug!("recent instructions:\n{}", self.history.join("\n"));
        }

        outcome
    }

    fn execute_batch(
        &mut self,
        state: &mut WorkingState,
        count: u32,
        retired: &mut u64,
    ) -> Result<(), Halt> {
        if count == 0 {
            return Ok(());
        }

        let Self {
            registers,
            memory,
            handler,
            code_cache,
            history,
            ..
        } = self;

        let cache = match code_cache {
            Some(cache) => cache,
            None => code_cache.insert(CodeCache::build(&*memory, state.pc)?),
        };

        let mut budget = count;
        let mut refunded = false;

        while budget > 0 {
            budget -= 1;

            let address = state.pc;
            let op_code = cache.fetch(address)?;
            history.push(HistoryEntry {
                address,
                opcode: op_code,
            });

            let instruction =
                Instruction::try_from(op_code).map_err(|e| e.at(op_code, address))?;
            tracing::trace!("0x{address:08X}: {op_code:04X} {instruction}");

            if let Instruction::Swi { comment } = instruction {
                *retired += 1;
                state.software_interrupt(comment, registers, memory, handler)?;
                continue;
            }

            let bytes_to_advance = state.execute(instruction, op_code, memory)?;
            state.pc = state.pc.wrapping_add(bytes_to_advance.unwrap_or(0));

            // Only one refund in a row, otherwise a run of BL prefixes
            // would never exhaust the budget.
            if matches!(instruction, Instruction::LongBranchLink { h: false, .. }) && !refunded {
                budget += 1;
                refunded = true;
            } else {
                refunded = false;
                *retired += 1;
            }
        }

        Ok(())
    }
}
