//! # Flag Engine
//!
//! Pure arithmetic helpers shared by every data-processing format.
//! Each returns the 32-bit result together with the flags it produces;
//! callers decide which of those flags they actually commit.
//!
//! Subtraction is an addition of the two's complement: `left + !right + 1`,
//! so C is set when no borrow occurred.

use crate::cpu::flags::ShiftKind;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

impl ArithmeticOpResult {
    const fn with_carry(result: u32, carry: bool) -> Self {
        Self {
            result,
            carry,
            overflow: false,
            sign: result >> 31 == 1,
            zero: result == 0,
        }
    }
}

/// `left + right + carry_in` computed on 33 bits.
#[must_use]
pub const fn add_with_carry(left: u32, right: u32, carry_in: bool) -> ArithmeticOpResult {
    let wide = left as u64 + right as u64 + carry_in as u64;
    let result = wide as u32;

    ArithmeticOpResult {
        carry: wide > u32::MAX as u64,
        // operands share a sign which the result does not
        overflow: ((left ^ result) & (right ^ result)) >> 31 == 1,
        ..ArithmeticOpResult::with_carry(result, false)
    }
}

/// `left - right - !carry_in` computed as `left + !right + carry_in` on 33 bits.
#[must_use]
pub const fn sub_with_carry(left: u32, right: u32, carry_in: bool) -> ArithmeticOpResult {
    let wide = left as u64 + (!right) as u64 + carry_in as u64;
    let result = wide as u32;

    ArithmeticOpResult {
        carry: wide > u32::MAX as u64,
        // operands differ in sign and the result lost the sign of `left`
        overflow: ((left ^ right) & (left ^ result)) >> 31 == 1,
        ..ArithmeticOpResult::with_carry(result, false)
    }
}

#[must_use]
pub const fn add(left: u32, right: u32) -> ArithmeticOpResult {
    add_with_carry(left, right, false)
}

#[must_use]
pub const fn sub(left: u32, right: u32) -> ArithmeticOpResult {
    sub_with_carry(left, right, true)
}

/// Shift by a 5-bit immediate. An amount of 0 means `#0` for LSL and `#32` for LSR/ASR.
#[must_use]
pub const fn shift_immediate(kind: ShiftKind, amount: u32, value: u32, carry: bool) -> ArithmeticOpResult {
    let (result, carry) = match (kind, amount) {
        (ShiftKind::Lsl, 0) => (value, carry),
        (ShiftKind::Lsl, n) => (value << n, (value >> (32 - n)) & 1 == 1),
        (ShiftKind::Lsr, 0) => (0, value >> 31 == 1),
        (ShiftKind::Lsr, n) => (value >> n, (value >> (n - 1)) & 1 == 1),
        (ShiftKind::Asr, 0) => (((value as i32) >> 31) as u32, value >> 31 == 1),
        (ShiftKind::Asr, n) => (((value as i32) >> n) as u32, (value >> (n - 1)) & 1 == 1),
        (ShiftKind::Ror, 0) => (value, carry),
        (ShiftKind::Ror, n) => (value.rotate_right(n), (value >> (n - 1)) & 1 == 1),
    };

    ArithmeticOpResult::with_carry(result, carry)
}

/// Shift by the low byte of a register.
///
/// | amount | LSL               | LSR                | ASR                 | ROR                    |
/// |--------|-------------------|--------------------|---------------------|------------------------|
/// | 0      | unchanged, C kept | unchanged, C kept  | unchanged, C kept   | unchanged, C kept      |
/// | 1-31   | normal            | normal             | normal              | normal                 |
/// | 32     | 0, C = bit 0      | 0, C = bit 31      | sign fill, C = b31  | by amount & 31         |
/// | > 32   | 0, C = 0          | 0, C = 0           | sign fill, C = b31  | by amount & 31         |
#[must_use]
pub const fn shift_by_register(kind: ShiftKind, amount: u8, value: u32, carry: bool) -> ArithmeticOpResult {
    let amount = amount as u32;
    if amount == 0 {
        return ArithmeticOpResult::with_carry(value, carry);
    }

    let (result, carry) = match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => return shift_immediate(kind, amount, value, carry),
            32 => (0, value & 1 == 1),
            _ => (0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => return shift_immediate(kind, amount, value, carry),
            32 => (0, value >> 31 == 1),
            _ => (0, false),
        },
        ShiftKind::Asr => match amount {
            1..=31 => return shift_immediate(kind, amount, value, carry),
            _ => (((value as i32) >> 31) as u32, value >> 31 == 1),
        },
        ShiftKind::Ror => match amount & 31 {
            0 => (value, value >> 31 == 1),
            n => return shift_immediate(kind, n, value, carry),
        },
    };

    ArithmeticOpResult::with_carry(result, carry)
}

/// 32-bit truncated product.
///
/// The ARM7TDMI leaves C in an unpredictable state after `MUL`. We keep the
/// incoming carry and OR in whether the signed product did not fit in 32 bits.
/// V is always cleared.
#[must_use]
pub const fn multiply(left: u32, right: u32, carry: bool) -> ArithmeticOpResult {
    let result = left.wrapping_mul(right);
    let full = (left as i32 as i64) * (right as i32 as i64);

    ArithmeticOpResult::with_carry(result, carry || (result as i32 as i64) != full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::Rng;

    const BOUNDARIES: [u32; 10] = [
        0,
        1,
        2,
        0x7FFF_FFFE,
        0x7FFF_FFFF,
        0x8000_0000,
        0x8000_0001,
        0xFFFF_FFFE,
        0xFFFF_FFFF,
        0x1234_5678,
    ];

    fn operand_pairs() -> Vec<(u32, u32)> {
        let mut rng = rand::thread_rng();
        let mut pairs = Vec::new();
        for &a in &BOUNDARIES {
            for &b in &BOUNDARIES {
                pairs.push((a, b));
            }
        }
        for _ in 0..2000 {
            pairs.push((rng.r#gen(), rng.r#gen()));
        }
        pairs
    }

    #[test]
    fn add_matches_wide_reference() {
        for (a, b) in operand_pairs() {
            for carry_in in [false, true] {
                let r = add_with_carry(a, b, carry_in);
                let unsigned = u64::from(a) + u64::from(b) + u64::from(carry_in);
                let signed = i64::from(a as i32) + i64::from(b as i32) + i64::from(carry_in);

                assert_eq!(r.result, unsigned as u32, "{a:#x} + {b:#x}");
                assert_eq!(r.carry, unsigned > 0xFFFF_FFFF, "{a:#x} + {b:#x}");
                assert_eq!(r.overflow, signed != i64::from(r.result as i32), "{a:#x} + {b:#x}");
                assert_eq!(r.sign, (r.result as i32) < 0);
                assert_eq!(r.zero, r.result == 0);
            }
        }
    }

    #[test]
    fn sub_matches_wide_reference() {
        for (a, b) in operand_pairs() {
            for carry_in in [false, true] {
                let r = sub_with_carry(a, b, carry_in);
                let borrow = u64::from(!carry_in);
                let signed = i64::from(a as i32) - i64::from(b as i32) - borrow as i64;

                assert_eq!(r.result, a.wrapping_sub(b).wrapping_sub(borrow as u32));
                assert_eq!(r.carry, u64::from(a) >= u64::from(b) + borrow, "{a:#x} - {b:#x}");
                assert_eq!(r.overflow, signed != i64::from(r.result as i32), "{a:#x} - {b:#x}");
            }
        }
    }

    #[test]
    fn sub_from_zero_borrows() {
        let r = sub(0, 1);
        assert_eq!(r.result, 0xFFFF_FFFF);
        assert!(r.sign);
        assert!(!r.zero);
        assert!(!r.carry);
        assert!(!r.overflow);

        let r = sub(5, 5);
        assert!(r.zero);
        assert!(r.carry);
    }

    #[test]
    fn shift_immediate_zero_amounts() {
        let r = shift_immediate(ShiftKind::Lsl, 0, 0x8000_0001, true);
        assert_eq!(r.result, 0x8000_0001);
        assert!(r.carry);

        let r = shift_immediate(ShiftKind::Lsr, 0, 0x8000_0001, false);
        assert_eq!(r.result, 0);
        assert!(r.carry);
        assert!(r.zero);

        let r = shift_immediate(ShiftKind::Asr, 0, 0x8000_0000, false);
        assert_eq!(r.result, 0xFFFF_FFFF);
        assert!(r.carry);

        let r = shift_immediate(ShiftKind::Asr, 0, 0x7FFF_FFFF, true);
        assert_eq!(r.result, 0);
        assert!(!r.carry);
    }

    #[test]
    fn shift_immediate_regular() {
        let r = shift_immediate(ShiftKind::Lsl, 1, 0x8000_0001, false);
        assert_eq!(r.result, 2);
        assert!(r.carry);

        let r = shift_immediate(ShiftKind::Lsr, 4, 0x0000_0018, false);
        assert_eq!(r.result, 1);
        assert!(r.carry);

        let r = shift_immediate(ShiftKind::Asr, 4, 0xF000_0000, true);
        assert_eq!(r.result, 0xFF00_0000);
        assert!(!r.carry);
        assert!(r.sign);
    }

    #[test]
    fn shift_by_register_edge_amounts() {
        let value = 0x8000_0001;

        for kind in [ShiftKind::Lsl, ShiftKind::Lsr, ShiftKind::Asr, ShiftKind::Ror] {
            let r = shift_by_register(kind, 0, value, true);
            assert_eq!(r.result, value, "{kind}");
            assert!(r.carry, "{kind}");
        }

        let r = shift_by_register(ShiftKind::Lsl, 32, value, false);
        assert_eq!((r.result, r.carry), (0, true));
        let r = shift_by_register(ShiftKind::Lsl, 33, value, true);
        assert_eq!((r.result, r.carry), (0, false));

        let r = shift_by_register(ShiftKind::Lsr, 32, value, false);
        assert_eq!((r.result, r.carry), (0, true));
        let r = shift_by_register(ShiftKind::Lsr, 200, value, true);
        assert_eq!((r.result, r.carry), (0, false));

        let r = shift_by_register(ShiftKind::Asr, 32, value, false);
        assert_eq!((r.result, r.carry), (0xFFFF_FFFF, true));
        let r = shift_by_register(ShiftKind::Asr, 255, 0x7000_0000, true);
        assert_eq!((r.result, r.carry), (0, false));

        let r = shift_by_register(ShiftKind::Ror, 32, value, false);
        assert_eq!((r.result, r.carry), (value, true));
        let r = shift_by_register(ShiftKind::Ror, 36, 0x0000_00F8, false);
        assert_eq!((r.result, r.carry), (0x8000_000F, true));
    }

    #[test]
    fn multiply_keeps_carry_and_clears_overflow() {
        let r = multiply(6, 7, false);
        assert_eq!(r.result, 42);
        assert!(!r.carry);
        assert!(!r.overflow);

        let r = multiply(6, 7, true);
        assert!(r.carry);

        let r = multiply(0x1_0000, 0x1_0000, false);
        assert_eq!(r.result, 0);
        assert!(r.zero);
        assert!(r.carry);
        assert!(!r.overflow);

        let r = multiply(0xFFFF_FFFF, 2, false);
        assert_eq!(r.result, 0xFFFF_FFFE);
        assert!(r.sign);
        assert!(!r.carry);
    }
}
