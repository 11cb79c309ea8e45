//! Cross-region numeric kernels.
//!
//! Every kernel follows the same discipline: bound the output magnitudes
//! from the operand sizes *before* touching data, right-shift the output
//! region if that bound does not fit the 63-bit element budget, then run a
//! straight integer loop through a 128-bit intermediate. Output regions keep
//! a conservative size bound derived from the same arithmetic, with no
//! rescan of the stored data.
//!
//! Outputs are kept within 62 bits rather than 63: alignment shifts truncate
//! toward negative infinity, which can bump a magnitude to exactly the
//! bound, and the spare bit absorbs that.
//!
//! Set `BLOCKFP_TRACE=1` to log renormalization decisions.

use crate::region::Region;
use crate::scalar::Scalar;
use crate::size::{accum_bits, find_size, shift_wide};
use crate::view::{Elem, Matrix, Vector};
use crate::{BlockFpError, Result};

#[inline]
fn trace_enabled() -> bool {
    matches!(std::env::var("BLOCKFP_TRACE"), Ok(ref v) if v == "1")
}

/// Ensures `region` can hold magnitudes up to `2^(top - exponent)`,
/// right-shifting it when headroom is missing, and returns the conservative
/// size bound to grow the region by after the store.
///
/// `top` is the position of the highest magnitude bit the caller may
/// produce, relative to `2^0` (i.e. values are `< 2^top` in real terms).
fn ensure_headroom(region: &mut Region, top: i64, what: &str) -> u32 {
    let needed = top - region.exponent();
    if needed > 62 {
        let bits = (needed - 62) as u32;
        if trace_enabled() {
            eprintln!("blockfp: {what}: renormalizing output region right by {bits} bits");
        }
        region.shift_right(bits);
    }
    // One spare bit over `needed` covers truncation bumping a magnitude to
    // exactly the bound.
    ((top - region.exponent()) + 1).clamp(1, 63) as u32
}

// ============================================================================
// Copy / size maintenance
// ============================================================================

/// Copies `src` (over `src_region`) into `dest` (over `dest_region`),
/// reconciling the two exponents. The regions are necessarily distinct.
///
/// The destination's size bound is taken from the source *region's* bound
/// (the worst case over values the source might hold) rather than from a
/// rescan of the data. Use [`fix_vector_size`] afterwards when a tight bound
/// matters.
pub fn copy_vector(
    src: &Vector,
    src_region: &Region,
    dest: &Vector,
    dest_region: &mut Region,
) -> Result<()> {
    src.validate(src_region)?;
    dest.validate(dest_region)?;
    if src.dim() != dest.dim() {
        return Err(BlockFpError::DimMismatch(src.dim(), dest.dim()));
    }
    if src_region.size() == 0 {
        return zero_vector(dest, dest_region);
    }
    let top = src_region.exponent() + i64::from(src_region.size());
    let bound = ensure_headroom(dest_region, top, "copy_vector");
    let shift = src_region.exponent() - dest_region.exponent();
    for k in 0..src.dim() {
        let value = shift_wide(i128::from(src_region.data()[src.idx(k)]), shift);
        dest_region.buf_mut()[dest.idx(k)] = value as i64;
    }
    dest_region.grow_size(bound);
    Ok(())
}

/// Rescans `vector`'s elements and overwrites the owning region's size with
/// the tight bound.
///
/// The scan only covers `vector`; the caller is asserting that no other
/// element of the region is larger.
pub fn fix_vector_size(vector: &Vector, region: &mut Region) -> Result<()> {
    vector.validate(region)?;
    let mut bound = 0;
    let mut guess = region.size();
    for k in 0..vector.dim() {
        guess = find_size(region.data()[vector.idx(k)].unsigned_abs(), guess.min(63));
        bound = bound.max(guess);
    }
    region.put_size(bound);
    Ok(())
}

/// Sets `vector`'s elements to zero without touching the region's exponent
/// or size bound.
pub fn zero_vector(vector: &Vector, region: &mut Region) -> Result<()> {
    vector.validate(region)?;
    for k in 0..vector.dim() {
        region.buf_mut()[vector.idx(k)] = 0;
    }
    Ok(())
}

// ============================================================================
// Scalar-vector kernels
// ============================================================================

/// `y := a*x + y` (saxpy). `x` and `y` live in different regions.
pub fn add_scalar_vector(
    a: &Scalar,
    x: &Vector,
    x_region: &Region,
    y: &Vector,
    y_region: &mut Region,
) -> Result<()> {
    x.validate(x_region)?;
    y.validate(y_region)?;
    if x.dim() != y.dim() {
        return Err(BlockFpError::DimMismatch(x.dim(), y.dim()));
    }
    if a.is_zero() || x_region.size() == 0 {
        return Ok(());
    }
    let prod_exp = a.exponent() + x_region.exponent();
    let prod_size = a.size() + x_region.size();
    let top = (prod_exp + i64::from(prod_size))
        .max(y_region.exponent() + i64::from(y_region.size()))
        + 1;
    let bound = ensure_headroom(y_region, top, "add_scalar_vector");
    let shift = prod_exp - y_region.exponent();
    let a_wide = i128::from(a.data());
    for k in 0..x.dim() {
        let product = shift_wide(a_wide * i128::from(x_region.data()[x.idx(k)]), shift);
        let index = y.idx(k);
        let sum = i128::from(y_region.data()[index]) + product;
        y_region.buf_mut()[index] = sum as i64;
    }
    y_region.grow_size(bound);
    Ok(())
}

/// `y := a*x`. `x` and `y` live in different regions.
pub fn set_scalar_vector(
    a: &Scalar,
    x: &Vector,
    x_region: &Region,
    y: &Vector,
    y_region: &mut Region,
) -> Result<()> {
    x.validate(x_region)?;
    y.validate(y_region)?;
    if x.dim() != y.dim() {
        return Err(BlockFpError::DimMismatch(x.dim(), y.dim()));
    }
    if a.is_zero() || x_region.size() == 0 {
        return zero_vector(y, y_region);
    }
    let prod_exp = a.exponent() + x_region.exponent();
    let prod_size = a.size() + x_region.size();
    let top = prod_exp + i64::from(prod_size);
    let bound = ensure_headroom(y_region, top, "set_scalar_vector");
    let shift = prod_exp - y_region.exponent();
    let a_wide = i128::from(a.data());
    for k in 0..x.dim() {
        let product = shift_wide(a_wide * i128::from(x_region.data()[x.idx(k)]), shift);
        y_region.buf_mut()[y.idx(k)] = product as i64;
    }
    y_region.grow_size(bound);
    Ok(())
}

/// `y[k] += a` for every element of `y`.
pub fn vector_add_scalar(a: &Scalar, y: &Vector, y_region: &mut Region) -> Result<()> {
    y.validate(y_region)?;
    if a.is_zero() {
        return Ok(());
    }
    let top = (a.exponent() + i64::from(a.size()))
        .max(y_region.exponent() + i64::from(y_region.size()))
        + 1;
    let bound = ensure_headroom(y_region, top, "vector_add_scalar");
    let addend = shift_wide(i128::from(a.data()), a.exponent() - y_region.exponent());
    for k in 0..y.dim() {
        let index = y.idx(k);
        let sum = i128::from(y_region.data()[index]) + addend;
        y_region.buf_mut()[index] = sum as i64;
    }
    y_region.grow_size(bound);
    Ok(())
}

/// `y[k] := a` for every element of `y`. Bits of `a` below the region's
/// final scale are truncated.
pub fn vector_set_scalar(a: &Scalar, y: &Vector, y_region: &mut Region) -> Result<()> {
    y.validate(y_region)?;
    if a.is_zero() {
        return zero_vector(y, y_region);
    }
    let top = a.exponent() + i64::from(a.size());
    let bound = ensure_headroom(y_region, top, "vector_set_scalar");
    let value = shift_wide(i128::from(a.data()), a.exponent() - y_region.exponent()) as i64;
    for k in 0..y.dim() {
        y_region.buf_mut()[y.idx(k)] = value;
    }
    y_region.grow_size(bound);
    Ok(())
}

// ============================================================================
// Reductions and matrix-vector product
// ============================================================================

/// Dot product `a . b` as a fresh [`Scalar`]. The operands may come from the
/// same region or different ones.
///
/// Products accumulate in 128 bits; when `size_a + size_b` plus the
/// accumulation width would overflow even that, products are pre-shifted
/// right (losing bits far below the result's precision).
pub fn dot(a: &Vector, a_region: &Region, b: &Vector, b_region: &Region) -> Result<Scalar> {
    a.validate(a_region)?;
    b.validate(b_region)?;
    if a.dim() != b.dim() {
        return Err(BlockFpError::DimMismatch(a.dim(), b.dim()));
    }
    if a_region.size() == 0 || b_region.size() == 0 {
        return Ok(Scalar::ZERO);
    }
    let prod_size = a_region.size() + b_region.size();
    let pre = (prod_size + accum_bits(a.dim())).saturating_sub(126);
    let mut acc: i128 = 0;
    for k in 0..a.dim() {
        let product =
            i128::from(a_region.data()[a.idx(k)]) * i128::from(b_region.data()[b.idx(k)]);
        acc += product >> pre;
    }
    Ok(Scalar::from_wide(
        acc,
        a_region.exponent() + b_region.exponent() + i64::from(pre),
    ))
}

/// `y := m . x`. The output region is necessarily distinct from both input
/// regions: rows accumulate while `m` and `x` are being read.
pub fn set_matrix_vector(
    m: &Matrix,
    m_region: &Region,
    x: &Vector,
    x_region: &Region,
    y: &Vector,
    y_region: &mut Region,
) -> Result<()> {
    m.validate(m_region)?;
    x.validate(x_region)?;
    y.validate(y_region)?;
    if m.num_cols() != x.dim() {
        return Err(BlockFpError::DimMismatch(m.num_cols(), x.dim()));
    }
    if m.num_rows() != y.dim() {
        return Err(BlockFpError::DimMismatch(m.num_rows(), y.dim()));
    }
    if m_region.size() == 0 || x_region.size() == 0 {
        return zero_vector(y, y_region);
    }
    let prod_size = m_region.size() + x_region.size();
    let pre = (prod_size + accum_bits(m.num_cols())).saturating_sub(126);
    let mut acc_size = prod_size + accum_bits(m.num_cols()) - pre;
    if pre > 0 {
        // Pre-shifted products each truncate by < 1; the sum of those
        // residues costs at most one extra bit.
        acc_size += 1;
    }
    let acc_exp = m_region.exponent() + x_region.exponent() + i64::from(pre);
    let top = acc_exp + i64::from(acc_size);
    let bound = ensure_headroom(y_region, top, "set_matrix_vector");
    let shift = acc_exp - y_region.exponent();
    for r in 0..m.num_rows() {
        let mut acc: i128 = 0;
        for c in 0..m.num_cols() {
            let product =
                i128::from(m_region.data()[m.idx(r, c)]) * i128::from(x_region.data()[x.idx(c)]);
            acc += product >> pre;
        }
        y_region.buf_mut()[y.idx(r)] = shift_wide(acc, shift) as i64;
    }
    y_region.grow_size(bound);
    Ok(())
}

// ============================================================================
// Single-element transfer
// ============================================================================

/// Stores a scalar at a raw region index, aligning exponents. Shared by the
/// elem/vector-elem entry points.
fn store_scalar(s: &Scalar, index: usize, region: &mut Region) {
    if s.is_zero() {
        region.buf_mut()[index] = 0;
        return;
    }
    let top = s.exponent() + i64::from(s.size());
    let bound = ensure_headroom(region, top, "scalar store");
    let value = shift_wide(i128::from(s.data()), s.exponent() - region.exponent());
    region.buf_mut()[index] = value as i64;
    region.grow_size(bound);
}

/// `vector[i] := value`, where `value` is a plain integer (exponent 0).
/// `size_hint` in `[0, 63]` seeds the size scan for `value`.
pub fn copy_int_to_vector_elem(
    i: usize,
    value: i64,
    size_hint: u32,
    vector: &Vector,
    region: &mut Region,
) -> Result<()> {
    let scalar = Scalar::from_int_with_hint(value, size_hint);
    copy_scalar_to_vector_elem(&scalar, i, vector, region)
}

/// `vector[i]` as a fresh [`Scalar`] with a tight size.
pub fn copy_vector_elem_to_scalar(vector: &Vector, region: &Region, i: usize) -> Result<Scalar> {
    vector.validate(region)?;
    vector.check_index(i)?;
    Ok(Scalar::with_size_guess(
        region.data()[vector.idx(i)],
        region.exponent(),
        region.size(),
    ))
}

/// `vector[i] := s`, aligning `s`'s exponent to the region's. Bits below the
/// region's final scale are truncated.
pub fn copy_scalar_to_vector_elem(
    s: &Scalar,
    i: usize,
    vector: &Vector,
    region: &mut Region,
) -> Result<()> {
    vector.validate(region)?;
    vector.check_index(i)?;
    store_scalar(s, vector.idx(i), region);
    Ok(())
}

/// The element behind `elem` as a fresh [`Scalar`] with a tight size.
pub fn copy_elem_to_scalar(elem: &Elem, region: &Region) -> Result<Scalar> {
    elem.validate(region)?;
    Ok(Scalar::with_size_guess(
        region.data()[elem.offset()],
        region.exponent(),
        region.size(),
    ))
}

/// Stores `s` into the element behind `elem`, aligning exponents.
pub fn copy_scalar_to_elem(s: &Scalar, elem: &Elem, region: &mut Region) -> Result<()> {
    elem.validate(region)?;
    store_scalar(s, elem.offset(), region);
    Ok(())
}
