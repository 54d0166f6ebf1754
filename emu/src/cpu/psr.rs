//! # Program Status Register
//!
//! Only the condition bits of the CPSR matter to the interpreter:
//!
//! ```text
//! 31 30 29 28 27 26                  0
//! ┌──┬──┬──┬──┬──┬────────────────────┐
//! │N │Z │C │V │Q │   left untouched   │
//! └──┴──┴──┴──┴──┴────────────────────┘
//! ```
//!
//! During a batch they live unpacked in a [`StatusFlags`] value and are
//! packed back into the CPSR word when the batch ends.
//! Q is carried through but never produced by a Thumb instruction.

use serde::{Deserialize, Serialize};

use crate::cpu::alu_instruction::ArithmeticOpResult;
use crate::cpu::condition::Condition;

pub const FLAG_N: u32 = 1 << 31;
pub const FLAG_Z: u32 = 1 << 30;
pub const FLAG_C: u32 = 1 << 29;
pub const FLAG_V: u32 = 1 << 28;
pub const FLAG_Q: u32 = 1 << 27;

const FLAGS_MASK: u32 = FLAG_N | FLAG_Z | FLAG_C | FLAG_V | FLAG_Q;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusFlags {
    /// Negative: bit 31 of the last result.
    pub n: bool,
    /// Zero: the last result was zero.
    pub z: bool,
    /// Carry: unsigned carry out, or "no borrow" for subtractions.
    pub c: bool,
    /// Overflow: signed overflow.
    pub v: bool,
    /// Sticky saturation.
    pub q: bool,
}

impl StatusFlags {
    #[must_use]
    pub const fn from_cpsr(cpsr: u32) -> Self {
        Self {
            n: cpsr & FLAG_N != 0,
            z: cpsr & FLAG_Z != 0,
            c: cpsr & FLAG_C != 0,
            v: cpsr & FLAG_V != 0,
            q: cpsr & FLAG_Q != 0,
        }
    }

    /// Packs the flags into a word with every other bit cleared.
    #[must_use]
    pub const fn to_cpsr(self) -> u32 {
        let mut cpsr = 0;
        if self.n {
            cpsr |= FLAG_N;
        }
        if self.z {
            cpsr |= FLAG_Z;
        }
        if self.c {
            cpsr |= FLAG_C;
        }
        if self.v {
            cpsr |= FLAG_V;
        }
        if self.q {
            cpsr |= FLAG_Q;
        }
        cpsr
    }

    /// Packs the flags into an existing CPSR value.
    #[must_use]
    pub const fn merge_into(self, cpsr: u32) -> u32 {
        (cpsr & !FLAGS_MASK) | self.to_cpsr()
    }

    pub(crate) const fn set_sign_zero(&mut self, result: u32) {
        self.n = result & FLAG_N != 0;
        self.z = result == 0;
    }

    /// N, Z, C and V from an arithmetic result.
    pub(crate) const fn set_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.n = op_result.sign;
        self.z = op_result.zero;
        self.c = op_result.carry;
        self.v = op_result.overflow;
    }

    /// N, Z and C from a shift or logical result, V untouched.
    pub(crate) const fn set_logical_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.n = op_result.sign;
        self.z = op_result.zero;
        self.c = op_result.carry;
    }

    #[must_use]
    pub const fn can_execute(self, cond: Condition) -> bool {
        use Condition::{CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, PL, VC, VS};
        match cond {
            EQ => self.z,
            NE => !self.z,
            CS => self.c,
            CC => !self.c,
            MI => self.n,
            PL => !self.n,
            VS => self.v,
            VC => !self.v,
            HI => self.c && !self.z,
            LS => !self.c || self.z,
            GE => self.n == self.v,
            LT => self.n != self.v,
            GT => !self.z && self.n == self.v,
            LE => self.z || self.n != self.v,
        }
    }
}

impl From<u32> for StatusFlags {
    fn from(cpsr: u32) -> Self {
        Self::from_cpsr(cpsr)
    }
}

impl From<StatusFlags> for u32 {
    fn from(flags: StatusFlags) -> Self {
        flags.to_cpsr()
    }
}
