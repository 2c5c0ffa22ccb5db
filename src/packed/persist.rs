use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::storage::SharedVec;
use super::{real_diagonal, Layout, Packed};
use crate::error::MatrixError;
use crate::traits::LinalgScalar;

/// Version tag written after the header.
const VERSION: u32 = 1;

impl<L: Layout, T: LinalgScalar + Serialize + DeserializeOwned> Packed<L, T> {
    /// Write the order, the bandwidths of banded shapes, a version tag and
    /// the length-prefixed packed data.
    ///
    /// ```
    /// use structmat::SymBandMatrix;
    /// let mut a = SymBandMatrix::<f64>::with_bandwidth(3, 3, 1).unwrap();
    /// a.set(0, 1, 2.0).unwrap();
    /// let mut buf = Vec::new();
    /// a.save_on(&mut buf).unwrap();
    /// let b = SymBandMatrix::<f64>::restore_from(&mut buf.as_slice()).unwrap();
    /// assert_eq!(a, b);
    /// ```
    pub fn save_on<W: Write>(&self, mut w: W) -> Result<(), MatrixError> {
        bincode::serialize_into(&mut w, &(self.n as u64))?;
        if L::BANDED {
            let (lower, upper) = self.layout.bandwidths();
            bincode::serialize_into(&mut w, &(lower as u64, upper as u64))?;
        }
        bincode::serialize_into(&mut w, &VERSION)?;
        bincode::serialize_into(&mut w, self.data())?;
        Ok(())
    }

    /// Read a matrix written by [`save_on`](Self::save_on).
    ///
    /// The data length is checked against the size the header implies.
    pub fn restore_from<R: Read>(mut r: R) -> Result<Self, MatrixError> {
        let order: u64 = bincode::deserialize_from(&mut r)?;
        let bandwidths: (u64, u64) = if L::BANDED {
            bincode::deserialize_from(&mut r)?
        } else {
            (0, 0)
        };
        let version: u32 = bincode::deserialize_from(&mut r)?;
        if version != VERSION {
            return Err(MatrixError::Version(version));
        }
        let mut data: Vec<T> = bincode::deserialize_from(&mut r)?;

        let oversized = MatrixError::RestoreSize {
            order: usize::try_from(order).unwrap_or(usize::MAX),
            expected: usize::MAX,
            got: data.len(),
        };
        let (Ok(n), Ok(lower), Ok(upper)) = (
            usize::try_from(order),
            usize::try_from(bandwidths.0),
            usize::try_from(bandwidths.1),
        ) else {
            return Err(oversized);
        };
        let layout = L::with_bandwidths(lower, upper);
        let Some(expected) = layout.checked_len(n) else {
            return Err(oversized);
        };
        if data.len() != expected {
            return Err(MatrixError::RestoreSize {
                order: n,
                expected,
                got: data.len(),
            });
        }
        real_diagonal(&layout, n, &mut data);
        log::debug!("restored {} of order {}", L::NAME, n);
        Ok(Self {
            data: SharedVec::new(data),
            n,
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::MatrixError;
    use crate::packed::{BandMatrix, HermMatrix, LowerTriMatrix, SymMatrix, TriDiagMatrix};
    use num_complex::Complex;

    #[test]
    fn round_trip_empty() {
        let a = SymMatrix::<f64>::new(0, 0).unwrap();
        let mut buf = Vec::new();
        a.save_on(&mut buf).unwrap();
        let b = SymMatrix::<f64>::restore_from(buf.as_slice()).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.order(), 0);
    }

    #[test]
    fn round_trip_hermitian() {
        let data = vec![
            Complex::new(2.0, 0.0),
            Complex::new(1.0, 1.0),
            Complex::new(3.0, 0.0),
        ];
        let a = HermMatrix::from_vec(data, 2, 2).unwrap();
        let mut buf = Vec::new();
        a.save_on(&mut buf).unwrap();
        let b = HermMatrix::<Complex<f64>>::restore_from(buf.as_slice()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn round_trip_band_keeps_bandwidths() {
        let mut a = BandMatrix::<f64>::with_bandwidths(4, 4, 2, 1).unwrap();
        a.set(3, 1, 7.0).unwrap();
        let mut buf = Vec::new();
        a.save_on(&mut buf).unwrap();
        let b = BandMatrix::<f64>::restore_from(buf.as_slice()).unwrap();
        assert_eq!(b.lower_bandwidth(), 2);
        assert_eq!(b.upper_bandwidth(), 1);
        assert_eq!(b.value(3, 1).unwrap(), 7.0);
    }

    #[test]
    fn restore_size_mismatch() {
        // Header claims order 3 (6 elements) but only 5 follow.
        let mut buf = Vec::new();
        bincode::serialize_into(&mut buf, &3u64).unwrap();
        bincode::serialize_into(&mut buf, &1u32).unwrap();
        bincode::serialize_into(&mut buf, &vec![0.0_f64; 5]).unwrap();
        assert!(matches!(
            LowerTriMatrix::<f64>::restore_from(buf.as_slice()),
            Err(MatrixError::RestoreSize { expected: 6, got: 5, .. })
        ));
    }

    #[test]
    fn restore_header_overflow() {
        let mut buf = Vec::new();
        bincode::serialize_into(&mut buf, &(1u64 << 40)).unwrap();
        bincode::serialize_into(&mut buf, &1u32).unwrap();
        bincode::serialize_into(&mut buf, &vec![0.0_f64; 3]).unwrap();
        assert!(matches!(
            SymMatrix::<f64>::restore_from(buf.as_slice()),
            Err(MatrixError::RestoreSize { got: 3, .. })
        ));

        let mut buf = Vec::new();
        bincode::serialize_into(&mut buf, &4u64).unwrap();
        bincode::serialize_into(&mut buf, &(u64::MAX, 1u64)).unwrap();
        bincode::serialize_into(&mut buf, &1u32).unwrap();
        bincode::serialize_into(&mut buf, &vec![0.0_f64; 4]).unwrap();
        assert!(matches!(
            BandMatrix::<f64>::restore_from(buf.as_slice()),
            Err(MatrixError::RestoreSize { order: 4, .. })
        ));
    }

    #[test]
    fn restore_bad_version() {
        let mut buf = Vec::new();
        bincode::serialize_into(&mut buf, &2u64).unwrap();
        bincode::serialize_into(&mut buf, &99u32).unwrap();
        assert!(matches!(
            TriDiagMatrix::<f64>::restore_from(buf.as_slice()),
            Err(MatrixError::Version(99))
        ));
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let buf = vec![1u8, 0, 0];
        assert!(matches!(
            SymMatrix::<f64>::restore_from(buf.as_slice()),
            Err(MatrixError::Persist(_))
        ));
    }
}
