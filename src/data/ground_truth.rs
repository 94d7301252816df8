//! Randomized ground-truth generation.
//!
//! Every GET of a lab page draws a fresh set of hidden coefficients from the
//! ranges in the profile table. Nothing is stored: the client echoes the values
//! back with its trial table.
//!
//! The generator is generic over `Rng` so callers can pass a seeded `StdRng`.

use rand::Rng;
use tracing::debug;

use crate::domain::{
    CoefficientRange, GroundTruth, LinearTruth, OscillatorTruth, ParabolaTruth, SubKind,
    SystemKind, profile,
};
use crate::error::LabError;
use crate::math::round_to;

/// Accepted band for `|vertex|` of the feedback parabola.
pub const VERTEX_ABS_MIN: f64 = 5.0;
pub const VERTEX_ABS_MAX: f64 = 28.0;

/// Upper bound on rejection-sampling draws for the feedback lab.
///
/// With the configured ranges roughly half of all draws are accepted, so this
/// bound is only reachable if the ranges themselves are broken.
pub const MAX_REJECTION_ATTEMPTS: usize = 10_000;

/// Draw ground truth for `sub_kind`.
pub fn generate<R: Rng + ?Sized>(sub_kind: SubKind, rng: &mut R) -> Result<GroundTruth, LabError> {
    let profile = profile(sub_kind)?;
    let ranges = profile.coefficients;

    let truth = match profile.kind {
        SystemKind::Identification => {
            let [slope, intercept, scale] = sample_all::<3, R>(ranges, rng)?;
            GroundTruth::Identification(LinearTruth {
                slope,
                intercept,
                scale,
            })
        }
        SystemKind::Feedback => GroundTruth::Feedback(sample_parabola(ranges, rng)?),
        SystemKind::Pid => {
            let [target, damping, frequency, max_time, tolerance] = sample_all::<5, R>(ranges, rng)?;
            GroundTruth::Pid(OscillatorTruth {
                target,
                damping,
                frequency,
                max_time,
                tolerance,
            })
        }
        SystemKind::Control => GroundTruth::Control,
    };

    debug!(sub_kind = %sub_kind, ?truth, "generated ground truth");
    Ok(truth)
}

/// Whether a parabola's vertex lies in the playable window.
pub fn vertex_in_window(p: &ParabolaTruth) -> bool {
    let v = p.vertex_x().abs();
    v.is_finite() && (VERTEX_ABS_MIN..=VERTEX_ABS_MAX).contains(&v)
}

fn sample_parabola<R: Rng + ?Sized>(
    ranges: &[CoefficientRange],
    rng: &mut R,
) -> Result<ParabolaTruth, LabError> {
    for _ in 0..MAX_REJECTION_ATTEMPTS {
        let [a, b, c] = sample_all::<3, R>(ranges, rng)?;
        let candidate = ParabolaTruth { a, b, c };
        if vertex_in_window(&candidate) {
            return Ok(candidate);
        }
    }

    Err(LabError::Generation(format!(
        "no parabola with |vertex| in [{VERTEX_ABS_MIN}, {VERTEX_ABS_MAX}] after {MAX_REJECTION_ATTEMPTS} draws"
    )))
}

fn sample_all<const N: usize, R: Rng + ?Sized>(
    ranges: &[CoefficientRange],
    rng: &mut R,
) -> Result<[f64; N], LabError> {
    if ranges.len() != N {
        return Err(LabError::Generation(format!(
            "expected {N} coefficient ranges, profile has {}",
            ranges.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, range) in out.iter_mut().zip(ranges) {
        *slot = sample_range(range, rng);
    }
    Ok(out)
}

fn sample_range<R: Rng + ?Sized>(range: &CoefficientRange, rng: &mut R) -> f64 {
    let v = if range.max > range.min {
        rng.gen_range(range.min..=range.max)
    } else {
        range.min
    };
    match range.decimals {
        Some(d) => round_to(v, d),
        None => v,
    }
}
