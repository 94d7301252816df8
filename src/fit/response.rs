//! Regulator response evaluation for the PID lab.
//!
//! The plant's closed-loop response is the damped oscillation
//! `y(x) = v + exp(-b·x)·cos(w·x)`. The client reports how long each tuning
//! attempt took to settle; we evaluate the response at the final attempt's
//! settling time and compare it to the deadline and the tolerance band.

use tracing::debug;

use crate::domain::{OscillatorTruth, PidAttempts, ResponseFit};
use crate::error::LabError;
use crate::math::round_to;
use crate::models::{predict_response, sample_curve};

/// Number of samples in the plotted response.
pub const RESPONSE_SAMPLES: usize = 1000;

/// The plotted window always covers at least this many seconds.
pub const RESPONSE_MIN_SPAN: f64 = 8.0;

pub fn fit_response(truth: &OscillatorTruth, attempts: &PidAttempts) -> Result<ResponseFit, LabError> {
    if truth.damping <= 0.0 {
        return Err(LabError::Validation("damping `b` must be positive".into()));
    }
    if truth.tolerance <= 0.0 {
        return Err(LabError::Validation("tolerance `e` must be positive".into()));
    }
    let final_attempt = *attempts.last().ok_or(LabError::EmptyInput)?;

    let t_last = final_attempt.settling_time;
    let y_last = predict_response(truth, t_last);
    let envelope = (1.0 / truth.tolerance).ln() / truth.damping;

    debug!(t_last, y_last, envelope, attempts = attempts.attempts.len(), "evaluated response");

    Ok(ResponseFit {
        t_last,
        y_last,
        settled_in_time: t_last <= truth.max_time,
        within_tolerance: (y_last - truth.target).abs() <= truth.tolerance,
        envelope_settling_time: round_to(envelope, 2),
        final_attempt,
        settling_times: attempts.attempts.iter().map(|a| a.settling_time).collect(),
    })
}

/// Response samples on `[0, max(t_last, 8)]`.
pub fn response_curve(truth: &OscillatorTruth, t_last: f64) -> Vec<(f64, f64)> {
    let span = t_last.max(RESPONSE_MIN_SPAN);
    sample_curve(0.0, span, RESPONSE_SAMPLES, |x| predict_response(truth, x))
}
