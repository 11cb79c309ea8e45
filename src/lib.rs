//! Deterministic block floating-point arithmetic over shared-exponent regions.
//!
//! Real numbers are stored as signed 64-bit integers that share a single
//! power-of-two exponent per memory [`Region`]: element `i` of a region
//! represents `data[i] * 2^exponent`. Views are strided windows over a
//! region's storage; a [`Scalar`] is a standalone value carrying its own
//! exponent. Every operation is integer arithmetic with explicit
//! renormalization, so results are bit-for-bit reproducible across
//! platforms; no IEEE rounding participates outside the [`Scalar::to_f64`]
//! debug helpers.
//!
//! # Core Types
//!
//! - [`Region`]: backing store owning one exponent and one conservative
//!   magnitude bound (`size`) for all elements it holds
//! - [`Vector`] / [`Matrix`] / [`Elem`]: non-owning strided views into a
//!   region, passed alongside the region they were created over
//! - [`Scalar`]: standalone value with a *tight* size, used for intermediate
//!   results and for moving single numbers between regions
//!
//! # Kernels
//!
//! - [`copy_vector`], [`zero_vector`], [`fix_vector_size`]
//! - [`add_scalar_vector`] (`y := a*x + y`), [`set_scalar_vector`] (`y := a*x`)
//! - [`vector_add_scalar`], [`vector_set_scalar`] (broadcasts)
//! - [`dot`], [`set_matrix_vector`]
//! - [`copy_int_to_vector_elem`], [`copy_vector_elem_to_scalar`],
//!   [`copy_scalar_to_vector_elem`], [`copy_elem_to_scalar`],
//!   [`copy_scalar_to_elem`]
//!
//! # Exponents, sizes, renormalization
//!
//! A region's `size` is an upper bound: `|x| < 2^size` for every element. A
//! scalar's `size` is the smallest such bound. Kernels keep magnitudes inside
//! the 63-bit budget of an `i64`; when an output region lacks headroom, the
//! kernel right-shifts the whole region (raising its exponent), which every
//! view of that region observes at once. The exponent therefore lives on the
//! region, never on a view.
//!
//! Lossy right shifts are arithmetic shifts: they truncate toward negative
//! infinity. Quotients ([`Scalar::div`], [`Scalar::invert`]) truncate toward
//! zero. Neither rounds to nearest.
//!
//! # Aliasing
//!
//! Kernels whose output region must be distinct from their input regions take
//! `&mut Region` for the output and `&Region` for the inputs, so the aliasing
//! contract is enforced by the borrow checker rather than at runtime. Views
//! are plain descriptors; pairing a view with the region it was created over
//! is the caller's responsibility (bounds are re-checked at every entry
//! point, so a mismatched pairing can at worst address the wrong elements of
//! a large-enough region, never out of bounds).
//!
//! # Errors vs panics
//!
//! Shape, stride and bounds violations detectable at an entry point are
//! reported as [`BlockFpError`] values, as is division by a zero-valued
//! scalar. Misuse that would corrupt the representation itself panics:
//! [`find_size`] with a guess outside `[0, 63]`, left shifts without
//! headroom, and magnitudes of `2^63` (`i64::MIN`) which the format cannot
//! hold. The kernel never silently returns a wrong value.
//!
//! # Example
//!
//! ```rust
//! use blockfp::{dot, Region, Vector};
//!
//! // exponent -2: elements are quarters. [3,-5,0,7] is [0.75,-1.25,0,1.75].
//! let a_region = Region::new(vec![3, -5, 0, 7], -2, 3).unwrap();
//! let b_region = Region::new(vec![4, 4, 4, 4], 0, 3).unwrap();
//! let a = Vector::new(&a_region, 0, 4, 1).unwrap();
//! let b = Vector::new(&b_region, 0, 4, 1).unwrap();
//!
//! // (0.75 - 1.25 + 0 + 1.75) * 4 = 5
//! let y = dot(&a, &a_region, &b, &b_region).unwrap();
//! assert_eq!(y.to_f64(), 5.0);
//! ```

mod ops;
mod region;
mod scalar;
mod size;
mod view;

// ============================================================================
// Core types
// ============================================================================
pub use region::Region;
pub use scalar::Scalar;
pub use view::{Elem, Matrix, Vector};

// ============================================================================
// Size estimation
// ============================================================================
pub use size::find_size;

// ============================================================================
// Numeric kernels
// ============================================================================
pub use ops::{
    add_scalar_vector, copy_elem_to_scalar, copy_int_to_vector_elem, copy_scalar_to_elem,
    copy_scalar_to_vector_elem, copy_vector, copy_vector_elem_to_scalar, dot, fix_vector_size,
    set_matrix_vector, set_scalar_vector, vector_add_scalar, vector_set_scalar, zero_vector,
};

// ============================================================================
// Error types
// ============================================================================

/// Errors reported by constructors and kernels.
#[derive(Debug, thiserror::Error)]
pub enum BlockFpError {
    /// Regions and views must address at least one element.
    #[error("empty dimension: regions and views need dim > 0")]
    EmptyDim,

    /// Operand dimensions are incompatible for the operation.
    #[error("dim mismatch: {0} vs {1}")]
    DimMismatch(usize, usize),

    /// Vector strides must be non-zero.
    #[error("invalid stride 0")]
    ZeroStride,

    /// Matrices only support column stride 1.
    #[error("non-unit column stride {0}")]
    NonUnitColStride(usize),

    /// A matrix row must fit within its row stride.
    #[error("row stride {row_stride} shorter than row of {num_cols} columns")]
    RowStrideTooSmall { row_stride: usize, num_cols: usize },

    /// The view addresses elements outside its region.
    #[error("view spans [{lo}, {hi}] outside region of dim {dim}")]
    OutOfBounds { lo: isize, hi: isize, dim: usize },

    /// Logical element index past the end of a view.
    #[error("element index {index} out of range for dim {dim}")]
    IndexOutOfRange { index: usize, dim: usize },

    /// Integer overflow while composing a view's offsets.
    #[error("offset overflow while composing view")]
    OffsetOverflow,

    /// An element's magnitude does not fit the 63-bit budget.
    #[error("element magnitude needs {0} bits, limit is 63")]
    MagnitudeOverflow(u32),

    /// Inversion or division by a scalar representing zero.
    #[error("division by a zero-valued scalar")]
    DivisionByZero,
}

/// Result type for block floating-point operations.
pub type Result<T> = std::result::Result<T, BlockFpError>;
