use core::fmt;
use core::str::FromStr;

use super::{Layout, Packed};
use crate::dynmatrix::DynMatrix;
use crate::error::MatrixError;
use crate::traits::LinalgScalar;

/// Prints `"<ClassName>, <rows>x<cols> [\n<row0>\n<row1>\n...]"`, every row
/// in full including mirrors and zeros.
impl<L: Layout, T: LinalgScalar + fmt::Display> fmt::Display for Packed<L, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}, {}x{} [", L::NAME, self.n, self.n)?;
        for i in 0..self.n {
            for j in 0..self.n {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.at(i, j))?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

fn leading_count(s: &str) -> Result<(usize, &str), MatrixError> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return Err(MatrixError::Parse("expected a dimension".into()));
    }
    let count = s[..end]
        .parse()
        .map_err(|e| MatrixError::Parse(format!("bad dimension: {e}")))?;
    Ok((count, &s[end..]))
}

/// Read a `rows x cols` header followed by `rows * cols` row-major elements.
fn scan_dense<T: LinalgScalar + FromStr>(text: &str) -> Result<DynMatrix<T>, MatrixError> {
    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| MatrixError::Parse("no dimensions found".into()))?;
    let (rows, rest) = leading_count(&text[start..])?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(&['x', 'X'][..]).unwrap_or(rest).trim_start();
    let (cols, rest) = leading_count(rest)?;

    let mut tokens = rest
        .split(|c: char| c.is_whitespace() || c == '[' || c == ']')
        .filter(|t| !t.is_empty());
    let count = rows
        .checked_mul(cols)
        .ok_or_else(|| MatrixError::Parse(format!("dimensions {rows}x{cols} overflow")))?;

    // the header is untrusted; grow with the elements actually present
    let mut values = Vec::new();
    for _ in 0..count {
        let tok = tokens
            .next()
            .ok_or_else(|| MatrixError::Parse(format!("expected {} elements, found {}", count, values.len())))?;
        let v = tok
            .parse::<T>()
            .map_err(|_| MatrixError::Parse(format!("bad element {tok:?}")))?;
        values.push(v);
    }
    Ok(DynMatrix::from_rows(rows, cols, &values))
}

impl<L: Layout, T: LinalgScalar + FromStr> Packed<L, T> {
    /// Scan the text form written by `Display`.
    ///
    /// Leading non-digit characters (the class name) are skipped, and the
    /// canonical part of the row-major elements is kept. Banded shapes take
    /// the narrowest band that holds every nonzero.
    ///
    /// ```
    /// use structmat::SymMatrix;
    /// let s: SymMatrix<f64> = "SymMatrix, 2x2 [\n4 1\n1 3\n]".parse().unwrap();
    /// assert_eq!(s.value(1, 0).unwrap(), 1.0);
    /// assert_eq!(s.to_string(), "SymMatrix, 2x2 [\n4 1\n1 3\n]");
    /// ```
    pub fn scan(text: &str) -> Result<Self, MatrixError> {
        let dense = scan_dense::<T>(text)?;
        if !dense.is_square() {
            return Err(MatrixError::Shape {
                rows: dense.nrows(),
                cols: dense.ncols(),
            });
        }
        let n = dense.nrows();
        let layout = L::fit(n, &|i, j| dense[(i, j)] != T::zero());
        Self::from_dense_with(layout, &dense)
    }
}

impl<L: Layout, T: LinalgScalar + FromStr> FromStr for Packed<L, T> {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::scan(s)
    }
}
