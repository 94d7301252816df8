//! Straight-line fit for the identification lab.
//!
//! The client probes a hidden `y = k·x + b` and submits what it observed; we
//! regress the outputs on `[1, x]` and report the coefficients and the mean
//! absolute error, all rounded to two decimals.

use nalgebra::DVector;
use tracing::debug;

use crate::domain::{LinearFit, TrialPairs};
use crate::error::LabError;
use crate::math::{line_design, round_to, solve_least_squares};
use crate::models::predict_line;

/// Decimals reported for `k`, `b` and MAE.
const REPORT_DECIMALS: u32 = 2;

/// Fit `y = k·x + b` by ordinary least squares.
///
/// With fewer than two distinct inputs the slope is unidentifiable, so the
/// fit degrades to a flat line through the mean output.
pub fn fit_line(trials: &TrialPairs) -> Result<LinearFit, LabError> {
    if trials.x.len() != trials.y.len() {
        return Err(LabError::parse(
            "table_data",
            format!("{} inputs but {} outputs", trials.x.len(), trials.y.len()),
        ));
    }
    if trials.is_empty() {
        return Err(LabError::EmptyInput);
    }

    let n = trials.len();
    let (k, b) = if distinct_count(&trials.x) < 2 {
        (0.0, trials.y.iter().sum::<f64>() / n as f64)
    } else {
        let design = line_design(&trials.x);
        let y = DVector::from_row_slice(&trials.y);
        let beta = solve_least_squares(&design, &y)
            .ok_or_else(|| LabError::Validation("least squares did not converge".into()))?;
        (beta[1], beta[0])
    };

    let mae = trials
        .points()
        .iter()
        .map(|&(x, y)| (predict_line(k, b, x) - y).abs())
        .sum::<f64>()
        / n as f64;

    debug!(n, k, b, mae, "fitted line");

    Ok(LinearFit {
        k: round_to(k, REPORT_DECIMALS),
        b: round_to(b, REPORT_DECIMALS),
        mae: round_to(mae, REPORT_DECIMALS),
        n,
    })
}

fn distinct_count(xs: &[f64]) -> usize {
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}
