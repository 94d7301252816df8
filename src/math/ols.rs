//! Ordinary least squares solver.
//!
//! The identification lab regresses outputs on `[1, x]`, so the design matrix is
//! always tall and two columns wide. We solve it with SVD: nalgebra's `QR::solve`
//! is meant for square systems, while SVD handles tall and near-singular designs
//! without special casing.

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖Xβ − y‖²` using SVD.
///
/// Returns `None` if no tolerance yields a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Build the `[1, x]` design matrix for a straight-line fit.
pub fn line_design(x: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(x.len(), 2, |r, c| if c == 0 { 1.0 } else { x[r] })
}
