//! Non-owning views over a region's storage.
//!
//! Views are plain index descriptors: an offset into the region plus a
//! shape. They hold no reference to the region, so any number of views can
//! coexist over one region; each kernel takes the view together with the
//! region it was created over. Validation happens at construction and is
//! repeated (cheaply, O(1)) at every kernel entry.

use crate::region::Region;
use crate::{BlockFpError, Result};

// ============================================================================
// Vector
// ============================================================================

/// A strided, dimension-bounded window: logical element `k` lives at region
/// index `offset + k * stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector {
    offset: usize,
    dim: usize,
    stride: isize,
}

impl Vector {
    /// Builds a view of `dim` elements starting at `offset`, `stride` apart
    /// (negative strides walk downward). All addressed indices must lie
    /// within `region`.
    pub fn new(region: &Region, offset: usize, dim: usize, stride: isize) -> Result<Vector> {
        let vector = Vector { offset, dim, stride };
        vector.validate(region)?;
        Ok(vector)
    }

    /// Derives a window onto `self`: logical element `k` of the result is
    /// logical element `offset + k * stride` of `self`. Strides compose, so
    /// a reversed sub-view of a strided view works as expected.
    pub fn subvector(&self, offset: usize, dim: usize, stride: isize) -> Result<Vector> {
        if dim == 0 {
            return Err(BlockFpError::EmptyDim);
        }
        if stride == 0 {
            return Err(BlockFpError::ZeroStride);
        }
        let last = (dim as isize - 1)
            .checked_mul(stride)
            .and_then(|d| d.checked_add(offset as isize))
            .ok_or(BlockFpError::OffsetOverflow)?;
        if offset >= self.dim || last < 0 || last as usize >= self.dim {
            return Err(BlockFpError::OutOfBounds {
                lo: (offset as isize).min(last),
                hi: (offset as isize).max(last),
                dim: self.dim,
            });
        }
        let stride = stride.checked_mul(self.stride).ok_or(BlockFpError::OffsetOverflow)?;
        let offset = (self.offset as isize + offset as isize * self.stride) as usize;
        Ok(Vector { offset, dim, stride })
    }

    /// Number of logical elements.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn stride(&self) -> isize {
        self.stride
    }

    /// Region index of logical element 0.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Conservative memory-overlap test between two views of one region:
    /// compares addressed index ranges, not exact stride patterns, so it may
    /// report overlap for interleaved views that never collide. Views of
    /// different regions never overlap; don't bother calling this on them.
    pub fn overlaps(&self, other: &Vector) -> bool {
        match (self.span(), other.span()) {
            (Ok((lo_a, hi_a)), Ok((lo_b, hi_b))) => lo_a <= hi_b && lo_b <= hi_a,
            _ => true,
        }
    }

    /// Element `i` as an `f64`, for inspection and tests.
    pub fn elem_to_f64(&self, region: &Region, i: usize) -> Result<f64> {
        self.validate(region)?;
        self.check_index(i)?;
        Ok(region.data()[self.idx(i)] as f64 * (region.exponent() as f64).exp2())
    }

    /// Lowest and highest region index addressed.
    fn span(&self) -> Result<(isize, isize)> {
        let first = self.offset as isize;
        let last = (self.dim as isize - 1)
            .checked_mul(self.stride)
            .and_then(|d| d.checked_add(first))
            .ok_or(BlockFpError::OffsetOverflow)?;
        Ok((first.min(last), first.max(last)))
    }

    pub(crate) fn validate(&self, region: &Region) -> Result<()> {
        if self.dim == 0 {
            return Err(BlockFpError::EmptyDim);
        }
        if self.stride == 0 {
            return Err(BlockFpError::ZeroStride);
        }
        let (lo, hi) = self.span()?;
        if lo < 0 || hi as usize >= region.dim() {
            return Err(BlockFpError::OutOfBounds { lo, hi, dim: region.dim() });
        }
        Ok(())
    }

    pub(crate) fn check_index(&self, i: usize) -> Result<()> {
        if i >= self.dim {
            return Err(BlockFpError::IndexOutOfRange { index: i, dim: self.dim });
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn idx(&self, k: usize) -> usize {
        debug_assert!(k < self.dim);
        (self.offset as isize + k as isize * self.stride) as usize
    }
}

// ============================================================================
// Matrix
// ============================================================================

/// A row-major window: element `(r, c)` lives at region index
/// `offset + r * row_stride + c`.
///
/// Only unit column stride is supported; constructors reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matrix {
    offset: usize,
    num_rows: usize,
    num_cols: usize,
    row_stride: usize,
}

impl Matrix {
    /// Builds a `num_rows x num_cols` view at `offset`. `col_stride` is
    /// accepted for symmetry with the row stride but must be 1;
    /// `row_stride` must cover a full row (`row_stride >= num_cols`).
    pub fn new(
        region: &Region,
        offset: usize,
        num_rows: usize,
        num_cols: usize,
        row_stride: usize,
        col_stride: usize,
    ) -> Result<Matrix> {
        if col_stride != 1 {
            return Err(BlockFpError::NonUnitColStride(col_stride));
        }
        let matrix = Matrix { offset, num_rows, num_cols, row_stride };
        matrix.validate(region)?;
        Ok(matrix)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Region index of element `(0, 0)`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Row `r` as a unit-stride vector view.
    pub fn row(&self, r: usize) -> Result<Vector> {
        if r >= self.num_rows {
            return Err(BlockFpError::IndexOutOfRange { index: r, dim: self.num_rows });
        }
        Ok(Vector {
            offset: self.offset + r * self.row_stride,
            dim: self.num_cols,
            stride: 1,
        })
    }

    pub(crate) fn validate(&self, region: &Region) -> Result<()> {
        if self.num_rows == 0 || self.num_cols == 0 {
            return Err(BlockFpError::EmptyDim);
        }
        if self.row_stride < self.num_cols {
            return Err(BlockFpError::RowStrideTooSmall {
                row_stride: self.row_stride,
                num_cols: self.num_cols,
            });
        }
        let hi = (self.num_rows - 1)
            .checked_mul(self.row_stride)
            .and_then(|r| r.checked_add(self.num_cols - 1))
            .and_then(|m| m.checked_add(self.offset))
            .ok_or(BlockFpError::OffsetOverflow)?;
        if hi >= region.dim() {
            return Err(BlockFpError::OutOfBounds {
                lo: self.offset as isize,
                hi: hi as isize,
                dim: region.dim(),
            });
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn idx(&self, r: usize, c: usize) -> usize {
        debug_assert!(r < self.num_rows && c < self.num_cols);
        self.offset + r * self.row_stride + c
    }
}

// ============================================================================
// Elem
// ============================================================================

/// A one-element handle into a region: a scalar that shares the region's
/// exponent. Lighter than a one-element [`Vector`] when moving single
/// numbers in and out of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elem {
    offset: usize,
}

impl Elem {
    pub fn new(region: &Region, offset: usize) -> Result<Elem> {
        let elem = Elem { offset };
        elem.validate(region)?;
        Ok(elem)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn validate(&self, region: &Region) -> Result<()> {
        if self.offset >= region.dim() {
            return Err(BlockFpError::IndexOutOfRange { index: self.offset, dim: region.dim() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(dim: usize) -> Region {
        Region::new((0..dim as i64).collect(), 0, 8).unwrap()
    }

    #[test]
    fn vector_validation() {
        let r = region(10);
        assert!(Vector::new(&r, 0, 10, 1).is_ok());
        assert!(Vector::new(&r, 9, 10, -1).is_ok());
        assert!(Vector::new(&r, 0, 5, 2).is_ok());
        assert!(matches!(Vector::new(&r, 0, 0, 1), Err(BlockFpError::EmptyDim)));
        assert!(matches!(Vector::new(&r, 0, 2, 0), Err(BlockFpError::ZeroStride)));
        assert!(matches!(Vector::new(&r, 0, 11, 1), Err(BlockFpError::OutOfBounds { .. })));
        assert!(matches!(Vector::new(&r, 5, 2, -6), Err(BlockFpError::OutOfBounds { .. })));
    }

    #[test]
    fn negative_stride_addresses_downward() {
        let r = region(6);
        let v = Vector::new(&r, 5, 6, -1).unwrap();
        assert_eq!(v.idx(0), 5);
        assert_eq!(v.idx(5), 0);
        assert_eq!(v.elem_to_f64(&r, 5).unwrap(), 0.0);
        assert_eq!(v.elem_to_f64(&r, 0).unwrap(), 5.0);
    }

    #[test]
    fn subvector_composes_strides() {
        let r = region(12);
        let evens = Vector::new(&r, 0, 6, 2).unwrap(); // 0 2 4 6 8 10
        let sub = evens.subvector(1, 3, 2).unwrap(); // 2 6 10
        assert_eq!(sub.dim(), 3);
        assert_eq!(sub.stride(), 4);
        assert_eq!(sub.offset(), 2);
        assert_eq!(sub.elem_to_f64(&r, 2).unwrap(), 10.0);

        let reversed = evens.subvector(5, 6, -1).unwrap(); // 10 8 6 4 2 0
        assert_eq!(reversed.stride(), -2);
        assert_eq!(reversed.elem_to_f64(&r, 0).unwrap(), 10.0);

        assert!(matches!(evens.subvector(4, 3, 2), Err(BlockFpError::OutOfBounds { .. })));
        assert!(matches!(evens.subvector(0, 2, -1), Err(BlockFpError::OutOfBounds { .. })));
    }

    #[test]
    fn overlap_is_conservative() {
        let r = region(10);
        let head = Vector::new(&r, 0, 4, 1).unwrap();
        let tail = Vector::new(&r, 4, 6, 1).unwrap();
        assert!(!head.overlaps(&tail));
        assert!(head.overlaps(&head));

        // interleaved: ranges intersect although indices never collide
        let evens = Vector::new(&r, 0, 5, 2).unwrap();
        let odds = Vector::new(&r, 1, 5, 2).unwrap();
        assert!(evens.overlaps(&odds));
    }

    #[test]
    fn matrix_validation() {
        let r = region(12);
        assert!(Matrix::new(&r, 0, 3, 4, 4, 1).is_ok());
        assert!(Matrix::new(&r, 1, 2, 3, 5, 1).is_ok());
        assert!(matches!(Matrix::new(&r, 0, 3, 4, 4, 2), Err(BlockFpError::NonUnitColStride(2))));
        assert!(matches!(
            Matrix::new(&r, 0, 3, 4, 3, 1),
            Err(BlockFpError::RowStrideTooSmall { .. })
        ));
        assert!(matches!(Matrix::new(&r, 0, 4, 4, 4, 1), Err(BlockFpError::OutOfBounds { .. })));
        assert!(matches!(Matrix::new(&r, 0, 0, 4, 4, 1), Err(BlockFpError::EmptyDim)));
    }

    #[test]
    fn matrix_rows_are_vectors() {
        let r = region(12);
        let m = Matrix::new(&r, 0, 3, 4, 4, 1).unwrap();
        assert_eq!(m.idx(2, 3), 11);
        let row = m.row(1).unwrap();
        assert_eq!(row.offset(), 4);
        assert_eq!(row.dim(), 4);
        assert_eq!(row.stride(), 1);
        assert!(m.row(3).is_err());
    }

    #[test]
    fn elem_bounds() {
        let r = region(3);
        assert!(Elem::new(&r, 2).is_ok());
        assert!(matches!(Elem::new(&r, 3), Err(BlockFpError::IndexOutOfRange { .. })));
    }
}
