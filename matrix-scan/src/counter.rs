//! Saturating debounce counters of configurable width.

use core::fmt::{Debug, LowerHex};

/// Unsigned integer usable as a debounce counter.
///
/// Implemented for `u8`, `u16` and `u32`; the width is picked at build time
/// through the matrix configuration type.
pub trait Counter: Copy + Ord + Default + Debug + LowerHex {
    const ZERO: Self;

    /// Add one, never exceeding `threshold`.
    fn bump(self, threshold: Self) -> Self;

    /// Halve the count (right shift by one).
    fn decay(self) -> Self;

    /// Hex digits needed to print the full width.
    const HEX_WIDTH: usize;
}

macro_rules! impl_counter {
    ($($ty:ty),*) => {
        $(
            impl Counter for $ty {
                const ZERO: Self = 0;
                const HEX_WIDTH: usize = core::mem::size_of::<$ty>() * 2;

                #[inline]
                fn bump(self, threshold: Self) -> Self {
                    self.saturating_add(1).min(threshold)
                }

                #[inline]
                fn decay(self) -> Self {
                    self >> 1
                }
            }
        )*
    };
}

impl_counter!(u8, u16, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_saturates_at_threshold() {
        assert_eq!(15u8.bump(16), 16);
        assert_eq!(16u8.bump(16), 16);
        assert_eq!(u8::MAX.bump(u8::MAX), u8::MAX);
        assert_eq!(u32::MAX.bump(u32::MAX), u32::MAX);
    }

    #[test]
    fn test_bump_clamps_values_above_threshold() {
        // Threshold lowered at runtime below an existing count.
        assert_eq!(200u16.bump(16), 16);
    }

    #[test]
    fn test_decay_reaches_zero() {
        let mut c = u16::MAX;
        for _ in 0..16 {
            c = c.decay();
        }
        assert_eq!(c, 0);
        assert_eq!(0u8.decay(), 0);
    }
}
