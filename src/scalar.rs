//! Standalone fixed-point scalars.

use std::fmt;

use crate::size::{find_size, shift_wide, wide_bits};
use crate::{BlockFpError, Result};

/// A standalone fixed-point value representing `data * 2^exponent`.
///
/// Unlike a [`Region`](crate::Region), whose `size` is only an upper bound
/// shared by many elements, a scalar's `size` is tight: the smallest `n >= 0`
/// with `|data| < 2^n`. Scalars are not tied to any region; they carry single
/// numbers between regions and hold intermediate results.
///
/// Arithmetic goes through 128-bit intermediates and narrows the result back
/// under the 63-bit magnitude budget, adjusting the exponent as needed, so no
/// operation here can overflow. Two scalars compare equal only when their
/// representations match bit for bit; use [`Scalar::approx_eq`] to compare
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scalar {
    data: i64,
    exponent: i64,
    size: u32,
}

impl Scalar {
    /// Exact zero.
    pub const ZERO: Scalar = Scalar { data: 0, exponent: 0, size: 0 };

    /// Exact one.
    pub const ONE: Scalar = Scalar { data: 1, exponent: 0, size: 1 };

    /// Builds `data * 2^exponent`, computing the tight size.
    ///
    /// # Panics
    ///
    /// Panics on `data == i64::MIN`: a magnitude of `2^63` does not fit the
    /// 63-bit budget.
    pub fn new(data: i64, exponent: i64) -> Scalar {
        assert!(data != i64::MIN, "magnitude 2^63 exceeds the 63-bit budget");
        Scalar::with_size_guess(data, exponent, 32)
    }

    /// The integer `value`, at exponent 0.
    ///
    /// # Panics
    ///
    /// Panics on `value == i64::MIN`.
    pub fn from_int(value: i64) -> Scalar {
        Scalar::new(value, 0)
    }

    /// Like [`Scalar::from_int`], seeding the size scan with the caller's
    /// guess. `size_hint` must be in `[0, 63]`.
    pub fn from_int_with_hint(value: i64, size_hint: u32) -> Scalar {
        assert!(value != i64::MIN, "magnitude 2^63 exceeds the 63-bit budget");
        assert!(size_hint <= 63, "size hint {size_hint} outside [0, 63]");
        Scalar::with_size_guess(value, 0, size_hint)
    }

    pub(crate) fn with_size_guess(data: i64, exponent: i64, guess: u32) -> Scalar {
        let size = find_size(data.unsigned_abs(), guess.min(63));
        Scalar { data, exponent, size }
    }

    /// Narrows a 128-bit intermediate at `exponent` to a scalar within the
    /// 63-bit budget, truncating low bits toward negative infinity.
    pub(crate) fn from_wide(mut wide: i128, mut exponent: i64) -> Scalar {
        let mut bits = wide_bits(wide);
        // Flooring can bump the magnitude to exactly 2^63, hence the loop;
        // it runs at most twice.
        while bits > 63 {
            let shift = bits - 63;
            wide >>= shift;
            exponent += i64::from(shift);
            bits = wide_bits(wide);
        }
        Scalar { data: wide as i64, exponent, size: bits }
    }

    pub fn data(&self) -> i64 {
        self.data
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Tight magnitude bound: the smallest `n` with `|data| < 2^n`.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// True when the represented value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.data == 0
    }

    /// Divides the stored integer by `2^bits` and compensates the exponent.
    ///
    /// Bits shifted out are lost (truncation toward negative infinity); the
    /// represented value is otherwise unchanged.
    pub fn shift_right(&mut self, bits: u32) {
        self.data >>= bits.min(63);
        self.exponent += i64::from(bits);
        self.size = find_size(self.data.unsigned_abs(), self.size.saturating_sub(bits));
    }

    /// Multiplies the stored integer by `2^bits` and compensates the
    /// exponent. Exact.
    ///
    /// # Panics
    ///
    /// Panics when `size + bits > 63`: the shifted magnitude would not fit.
    pub fn shift_left(&mut self, bits: u32) {
        assert!(self.size + bits <= 63, "left shift by {bits} overflows the 63-bit budget");
        if self.data != 0 {
            self.data <<= bits;
            self.size += bits;
        }
        self.exponent -= i64::from(bits);
    }

    /// In-place sign flip. Exponent and size are unchanged.
    pub fn negate(&mut self) {
        self.data = -self.data;
    }

    /// `self + other`, exact unless the sum needs more than 63 bits, in which
    /// case low bits are truncated.
    pub fn add(&self, other: &Scalar) -> Scalar {
        if self.data == 0 {
            return *other;
        }
        if other.data == 0 {
            return *self;
        }
        let top = (self.exponent + i64::from(self.size))
            .max(other.exponent + i64::from(other.size))
            + 1;
        // Align to the smaller exponent when the spread allows; otherwise
        // drop bits of the smaller operand that the 127-bit intermediate
        // cannot hold anyway.
        let mut exponent = self.exponent.min(other.exponent);
        if top - exponent > 127 {
            exponent = top - 127;
        }
        let wide = shift_wide(i128::from(self.data), self.exponent - exponent)
            + shift_wide(i128::from(other.data), other.exponent - exponent);
        Scalar::from_wide(wide, exponent)
    }

    /// `self - other`.
    pub fn sub(&self, other: &Scalar) -> Scalar {
        let mut negated = *other;
        negated.negate();
        self.add(&negated)
    }

    /// `self * other`. The 126-bit product is narrowed back under the 63-bit
    /// budget.
    pub fn mul(&self, other: &Scalar) -> Scalar {
        let wide = i128::from(self.data) * i128::from(other.data);
        Scalar::from_wide(wide, self.exponent + other.exponent)
    }

    /// `self / other`, with at least 62 significant quotient bits. The
    /// quotient truncates toward zero.
    pub fn div(&self, other: &Scalar) -> Result<Scalar> {
        if other.data == 0 {
            return Err(BlockFpError::DivisionByZero);
        }
        if self.data == 0 {
            return Ok(Scalar::ZERO);
        }
        // Widen the numerator as far as the intermediate permits before
        // dividing, so the quotient keeps full precision.
        let shift = 126 - self.size;
        let wide = i128::from(self.data) << shift;
        let quotient = wide / i128::from(other.data);
        Ok(Scalar::from_wide(
            quotient,
            self.exponent - i64::from(shift) - other.exponent,
        ))
    }

    /// `1 / self`.
    pub fn invert(&self) -> Result<Scalar> {
        Scalar::ONE.div(self)
    }

    /// The nearest `f64` to the represented value. Verification helper, not
    /// part of the arithmetic.
    pub fn to_f64(&self) -> f64 {
        self.data as f64 * (self.exponent as f64).exp2()
    }

    /// Compares the represented values within a relative tolerance, after
    /// conversion to `f64`. Intended for checking code, not for arithmetic.
    pub fn approx_eq(&self, other: &Scalar, tol: f64) -> bool {
        let a = self.to_f64();
        let b = other.to_f64();
        if a == b {
            return true;
        }
        (a - b).abs() <= tol * (a.abs() + b.abs())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
