//! # structmat
//!
//! Structured matrices in packed storage, with LAPACK-style factorizations
//! and orthogonal decompositions, in pure Rust.
//!
//! ## Quick start
//!
//! ```
//! use structmat::{DynVector, Factorization, SymFact, SymMatrix};
//!
//! // [[2, 1, 0], [1, 2, 1], [0, 1, 2]], only the upper triangle is stored
//! let mut a = SymMatrix::<f64>::new(3, 3).unwrap();
//! for i in 0..3 {
//!     a.set(i, i, 2.0).unwrap();
//! }
//! a.set(0, 1, 1.0).unwrap();
//! a.set(1, 2, 1.0).unwrap();
//!
//! let f = SymFact::new(&a, true);
//! assert!(f.good());
//! let x = f.solve(&DynVector::from_slice(&[1.0, 2.0, 3.0])).unwrap();
//! assert!((x[0] - 0.5).abs() < 1e-12);
//! assert!(x[1].abs() < 1e-12);
//! assert!((x[2] - 1.5).abs() < 1e-12);
//! ```
//!
//! ## Modules
//!
//! - [`packed`]: [`Packed<L, T>`](Packed): one contiguous vector holding the
//!   distinct elements of a symmetric, Hermitian, skew, triangular,
//!   tridiagonal or banded matrix, in LAPACK layouts. Element access checks
//!   bounds and structure; writes go through an [`Entry`] that conjugates,
//!   negates or rejects as the shape requires. Storage is shared
//!   copy-on-write.
//!
//! - [`factor`]: one factorization per structure ([`GenFact`], [`SymFact`],
//!   [`HermFact`], [`PdFact`], [`BandFact`], [`PdBandFact`], [`TriDiagFact`]),
//!   all behind the [`Factorization`] trait: `solve`, `inverse`,
//!   `determinant`, and an optional reciprocal condition estimate.
//!
//! - [`decomp`]: [`QrDecomp`], [`CoDecomp`] (complete orthogonal),
//!   [`BalanceDecomp`], [`HessenbergDecomp`], [`SchurDecomp`] with eigenvalue
//!   reordering, and the tridiagonal reductions [`DenseTriDiagDecomp`] and
//!   [`BandTriDiagDecomp`].
//!
//! - [`dynmatrix`]: heap-allocated, column-major [`DynMatrix<T>`] and
//!   [`DynVector<T>`]: the general shape, right-hand sides and explicit factors.
//!
//! - [`traits`]: element trait hierarchy:
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`]: real floats, used by balancing and Schur
//!   - [`LinalgScalar`]: real floats and complex numbers, used by everything else
//!
//! ## Complex matrices
//!
//! Every generic component works for `f32`, `f64`, `Complex<f32>` and
//! `Complex<f64>`. Conjugation is the identity for reals, so one kernel
//! serves both the symmetric and the Hermitian case.
//!
//! ## Logging
//!
//! Factorizations and decompositions report through the [`log`] facade:
//! `debug!` for start and outcome, `trace!` for pivot and deflation decisions,
//! `warn!` for a rejected Schur reordering. No logger is installed.
//!
//! ## Cargo features
//!
//! | Feature   | Default  | Description |
//! |-----------|----------|-------------|
//! | `std`     | yes      | Hardware FPU via system libm |
//! | `libm`    | no       | Pure-Rust software float fallback |
//! | `persist` | yes      | Binary `save_on` / `restore_from` through `serde` + `bincode` |
//! | `all`     | no       | All features: `std` + `persist` |

pub mod decomp;
pub mod dynmatrix;
pub mod error;
pub mod factor;
pub mod packed;
pub mod traits;

pub use decomp::{
    BalanceDecomp, BandTriDiagDecomp, CoDecomp, DenseTriDiagDecomp, DiscardQ, HessenbergDecomp,
    KeepQ, QPolicy, QrDecomp, SchurDecomp, TriDiagDecomp, TriDiagTransform,
};
pub use dynmatrix::{DynMatrix, DynVector};
pub use error::MatrixError;
pub use factor::{
    BandFact, BlockPivot, FactorStatus, Factorization, GenFact, HermFact, IndefiniteFact, PdBandFact,
    PdFact, SymFact, TriDiagFact,
};
pub use packed::{
    BandMatrix, Entry, EntryKind, GeneralBand, HermBandMatrix, HermMatrix, Hermitian, HermitianBand,
    Layout, LowerTriMatrix, Packed, SkewMatrix, SymBandMatrix, SymMatrix, Symmetric, SymmetricBand,
    TriDiagMatrix, TriDiagonal, UpperTriMatrix,
};
pub use traits::{FloatScalar, LinalgScalar, Scalar};

pub use num_complex::Complex;
