//! Dense linear-algebra helpers layered on top of `nalgebra`.

use nalgebra::{DMatrix, DVector};

use crate::error::{DynamicsError, Result};

/// Solves `a·x = b` by LU decomposition.
///
/// A pivot whose magnitude is at most `tolerance` times the largest entry of
/// `a` marks the system as singular; no pseudo-inverse fallback is attempted.
pub fn solve_dense(a: DMatrix<f64>, b: &DVector<f64>, tolerance: f64) -> Result<DVector<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(DynamicsError::DimensionMismatch {
            expected: n,
            found: a.ncols(),
        });
    }
    if b.len() != n {
        return Err(DynamicsError::DimensionMismatch {
            expected: n,
            found: b.len(),
        });
    }
    if n == 0 {
        return Ok(DVector::zeros(0));
    }

    let singular = || DynamicsError::SingularSystem {
        size: n,
        origin: "numeric solve",
    };
    let scale = a.amax();
    if !scale.is_finite() || scale == 0.0 {
        return Err(singular());
    }

    let lu = a.lu();
    let smallest_pivot = lu.u().diagonal().amin();
    if smallest_pivot <= tolerance * scale {
        return Err(singular());
    }
    lu.solve(b).ok_or_else(singular)
}

/// Keeps the listed rows and columns of a square matrix.
pub fn select_square(a: &DMatrix<f64>, indices: &[usize]) -> DMatrix<f64> {
    a.select_rows(indices).select_columns(indices)
}
