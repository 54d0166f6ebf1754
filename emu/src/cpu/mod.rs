#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_lossless)]
pub mod alu_instruction;
#[allow(clippy::cast_possible_truncation)]
mod code_cache;
pub mod condition;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_sign_loss)]
pub mod flags;
mod interpreter;
mod interrupt;
pub mod psr;
pub mod registers;
mod state;
pub mod thumb;

pub use interpreter::{Cpu, HISTORY_LEN, HistoryEntry};
pub use interrupt::{InterruptHandler, NoInterrupts};
pub use state::SIZE_OF_INSTRUCTION;
