//! Yates standard order for two-level designs.

use ndarray::Array2;

use crate::error::{Error, Result};

/// Largest factor count accepted by [`StandardOrder`] (2^24 rows).
pub const MAX_STANDARD_ORDER_FACTORS: usize = 24;

/// Generator of the 2^k two-level matrix in Yates standard order.
///
/// Column `i` alternates blocks of `2^(k-i-1)` low and high values, so the first
/// column varies slowest and the last column fastest.
///
/// # Example
///
/// ```
/// use expdesign::construct::StandardOrder;
///
/// let m = StandardOrder::binary(2).unwrap();
/// assert_eq!(m.row(0).to_vec(), vec![0, 0]);
/// assert_eq!(m.row(1).to_vec(), vec![0, 1]);
/// assert_eq!(m.row(2).to_vec(), vec![1, 0]);
/// assert_eq!(m.row(3).to_vec(), vec![1, 1]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOrder;

impl StandardOrder {
    /// The 2^k × k matrix of `0`/`1` values.
    ///
    /// `k = 0` yields a single empty row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRunCount`] if `k` exceeds
    /// [`MAX_STANDARD_ORDER_FACTORS`].
    pub fn binary(k: usize) -> Result<Array2<u8>> {
        if k > MAX_STANDARD_ORDER_FACTORS {
            return Err(Error::invalid_run_count(format!(
                "2^{k} runs exceeds the supported maximum of 2^{MAX_STANDARD_ORDER_FACTORS}"
            )));
        }
        let rows = 1usize << k;
        Ok(Array2::from_shape_fn((rows, k), |(row, col)| {
            ((row >> (k - col - 1)) & 1) as u8
        }))
    }

    /// The 2^k × k matrix coded `-1`/`+1`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`binary`](Self::binary).
    pub fn coded(k: usize) -> Result<Array2<f64>> {
        Ok(Self::binary(k)?.mapv(|bit| if bit == 0 { -1.0 } else { 1.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        for k in 0..8 {
            let m = StandardOrder::binary(k).unwrap();
            assert_eq!(m.dim(), (1 << k, k));
        }
    }

    #[test]
    fn test_column_blocks() {
        let m = StandardOrder::binary(3).unwrap();
        assert_eq!(m.column(0).to_vec(), vec![0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(m.column(1).to_vec(), vec![0, 0, 1, 1, 0, 0, 1, 1]);
        assert_eq!(m.column(2).to_vec(), vec![0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_coded_is_balanced() {
        let m = StandardOrder::coded(4).unwrap();
        for col in m.columns() {
            assert!((col.sum()).abs() < 1e-12);
            assert!(col.iter().all(|&v| v == -1.0 || v == 1.0));
        }
    }

    #[test]
    fn test_too_many_factors() {
        assert!(matches!(
            StandardOrder::binary(MAX_STANDARD_ORDER_FACTORS + 1),
            Err(Error::InvalidRunCount { .. })
        ));
    }
}
