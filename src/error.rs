use thiserror::Error;

/// Errors reported by structured-matrix storage, factorizations and
/// decompositions.
///
/// Structural misuse (wrong shape, bad index, wrong length) is reported
/// immediately. A numerically singular factorization is *not* an error; it is
/// recorded in [`FactorStatus`](crate::factor::FactorStatus) and only becomes
/// [`MatrixError::CannotSolve`] when a result that needs the factors is
/// requested.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// Structured matrices are square; `rows != cols` was requested.
    #[error("shape error: {rows}x{cols} is not square")]
    Shape { rows: usize, cols: usize },

    /// A flat data vector has the wrong number of elements for its order.
    #[error("length error: order {order} needs {expected} stored elements, got {got}")]
    Length {
        order: usize,
        expected: usize,
        got: usize,
    },

    /// An element index is outside `[0, n)`.
    #[error("index ({i}, {j}) out of bounds for a {n}x{n} matrix")]
    Bounds { i: usize, j: usize, n: usize },

    /// The element is a structural zero of the matrix shape.
    #[error("element ({i}, {j}) is structurally zero and cannot be set")]
    NotSettable { i: usize, j: usize },

    /// An operand has the wrong size.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    /// The factorization failed (`info > 0`) or was never computed (`info = -1`).
    #[error("cannot solve: factorization is not usable (info = {info})")]
    CannotSolve { info: i64 },

    /// `condition()` was called on a factorization built without an estimate.
    #[error("no condition number estimate was computed for this factorization")]
    NoConditionEstimate,

    /// Restored data does not match the size its header announced.
    #[error("restore size error: order {order} needs {expected} stored elements, stream holds {got}")]
    RestoreSize {
        order: usize,
        expected: usize,
        got: usize,
    },

    /// The persisted stream was written by an unknown format version.
    #[error("unsupported persistence format version {0}")]
    Version(u32),

    /// An element is infinite or NaN where a finite matrix is required.
    #[error("matrix has a non-finite element")]
    NotFinite,

    /// Text could not be scanned as a matrix.
    #[error("parse error: {0}")]
    Parse(String),

    /// Binary encoding or decoding failed.
    #[cfg(feature = "persist")]
    #[error("persistence error: {0}")]
    Persist(#[from] bincode::Error),
}
