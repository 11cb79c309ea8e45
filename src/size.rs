//! Bit-width estimation.
//!
//! Both a [`Region`](crate::Region)'s conservative bound and a
//! [`Scalar`](crate::Scalar)'s tight bound are maintained through
//! [`find_size`], seeded with whatever the caller already knows.

/// Smallest `i >= 0` such that `value >> i == 0`.
///
/// Equivalently: the number of bits needed to hold `value`, so that
/// `value < 2^i`. Signed inputs should go through `unsigned_abs` first.
///
/// `guess` seeds a directional scan; any guess in `[0, 63]` yields the same
/// answer, but a guess within a couple of bits of the truth finishes in O(1).
/// Scanning element runs with the previous element's size as the next guess
/// makes whole-region scans cheap.
///
/// # Panics
///
/// Panics if `guess > 63`.
pub fn find_size(value: u64, guess: u32) -> u32 {
    assert!(guess <= 63, "find_size guess {guess} outside [0, 63]");
    let mut size = guess;
    while size < 64 && value >> size != 0 {
        size += 1;
    }
    while size > 0 && value >> (size - 1) == 0 {
        size -= 1;
    }
    size
}

/// Arithmetic shift of a 128-bit intermediate by a signed bit count.
///
/// Negative counts shift right, truncating toward negative infinity; counts
/// past the width saturate to the sign.
#[inline]
pub(crate) fn shift_wide(value: i128, bits: i64) -> i128 {
    if bits >= 0 {
        debug_assert!(bits < 128);
        value << bits
    } else {
        value >> (-bits).min(127)
    }
}

/// Number of magnitude bits of a 128-bit intermediate.
#[inline]
pub(crate) fn wide_bits(value: i128) -> u32 {
    128 - value.unsigned_abs().leading_zeros()
}

/// Bits of growth to budget for summing `n` terms.
#[inline]
pub(crate) fn accum_bits(n: usize) -> u32 {
    usize::BITS - n.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_bound() {
        assert_eq!(find_size(0, 0), 0);
        assert_eq!(find_size(0, 63), 0);
        assert_eq!(find_size(1, 0), 1);
        assert_eq!(find_size(1, 63), 1);
        assert_eq!(find_size(2, 5), 2);
        assert_eq!(find_size(3, 0), 2);
        assert_eq!(find_size(255, 63), 8);
        assert_eq!(find_size(256, 0), 9);
        assert_eq!(find_size(u64::MAX, 0), 64);
        assert_eq!(find_size(1 << 62, 10), 63);
    }

    #[test]
    fn guess_independent() {
        for value in [0u64, 1, 7, 100, 1 << 20, (1 << 40) - 1, u64::MAX] {
            let expected = find_size(value, 0);
            for guess in 0..=63 {
                assert_eq!(find_size(value, guess), expected, "value {value} guess {guess}");
            }
        }
    }

    #[test]
    #[should_panic(expected = "outside [0, 63]")]
    fn rejects_wild_guess() {
        find_size(1, 64);
    }

    #[test]
    fn wide_shift_directions() {
        assert_eq!(shift_wide(5, 2), 20);
        assert_eq!(shift_wide(-5, -1), -3); // floor, not toward zero
        assert_eq!(shift_wide(5, -1), 2);
        assert_eq!(shift_wide(-1, -500), -1);
        assert_eq!(shift_wide(1, -500), 0);
    }

    #[test]
    fn wide_bit_counts() {
        assert_eq!(wide_bits(0), 0);
        assert_eq!(wide_bits(1), 1);
        assert_eq!(wide_bits(-1), 1);
        assert_eq!(wide_bits(-4), 3);
        assert_eq!(wide_bits(i128::MIN), 128);
    }
}
