//! Closed-form models behind the labs.
//!
//! The fitters and chart renderers rely on two primitive operations per model:
//! - predict y(x) for a single input
//! - sample y over a grid (for plotting)

use crate::domain::{OscillatorTruth, ParabolaTruth};
use crate::math::linspace;

/// Straight line `k·x + b`.
pub fn predict_line(k: f64, b: f64, x: f64) -> f64 {
    k * x + b
}

/// Parabola `a·x² + b·x + c`.
pub fn predict_parabola(p: &ParabolaTruth, x: f64) -> f64 {
    p.a * x * x + p.b * x + p.c
}

/// Damped oscillation `v + exp(-b·x)·cos(w·x)`.
pub fn predict_response(o: &OscillatorTruth, x: f64) -> f64 {
    o.target + (-o.damping * x).exp() * (o.frequency * x).cos()
}

/// Sample `f` on `n` points spanning `[x0, x1]`.
pub fn sample_curve(x0: f64, x1: f64, n: usize, f: impl Fn(f64) -> f64) -> Vec<(f64, f64)> {
    linspace(x0, x1, n).into_iter().map(|x| (x, f(x))).collect()
}
