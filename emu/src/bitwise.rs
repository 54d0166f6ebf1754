use std::ops::RangeInclusive;

/// Helpers to pick apart instruction words and register values.
/// Bit indexes go from lsb to msb (right to left).
pub trait Bits: Copy {
    fn get_bit(self, bit_idx: u8) -> bool;

    fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self;

    /// Returns a sign-extended copy of the value.
    /// `number_of_bits` is the width of the two's complement number stored
    /// in the low bits of the value.
    fn sign_extended(self, number_of_bits: u8) -> Self;
}

macro_rules! impl_bits {
    ($unsigned:ty, $signed:ty) => {
        impl Bits for $unsigned {
            #[inline]
            fn get_bit(self, bit_idx: u8) -> bool {
                debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                (self >> bit_idx) & 1 == 1
            }

            #[inline]
            fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self {
                let start = *bits_range.start();
                let length = u32::from(*bits_range.end() - start) + 1;
                debug_assert!(u32::from(start) + length <= <$unsigned>::BITS);

                let value = self >> start;
                if length == <$unsigned>::BITS {
                    value
                } else {
                    value & ((1 << length) - 1)
                }
            }

            #[inline]
            #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
            fn sign_extended(self, number_of_bits: u8) -> Self {
                debug_assert!(number_of_bits > 0 && u32::from(number_of_bits) <= <$unsigned>::BITS);
                // Move the sign bit to the top and let the arithmetic shift drag it back down.
                let unused = <$unsigned>::BITS - u32::from(number_of_bits);
                (((self << unused) as $signed) >> unused) as $unsigned
            }
        }
    };
}

impl_bits!(u8, i8);
impl_bits!(u16, i16);
impl_bits!(u32, i32);
