//! Vertex check for the feedback lab.
//!
//! The hidden parabola's optimum is known in closed form, so there is nothing
//! to estimate: we compare the client's guess against `x0 = -b / 2a`.

use crate::domain::{ParabolaTruth, TrialPairs, VertexFit};
use crate::error::LabError;
use crate::math::round_to;
use crate::models::predict_parabola;

/// A guess within this distance of the vertex counts as found.
pub const MATCH_RADIUS: f64 = 0.7;

/// Absorbs binary rounding of `|x0 - guess|` at the boundary.
const MATCH_EPSILON: f64 = 1e-9;

/// Compare the client's guess with the true vertex.
pub fn fit_vertex(truth: &ParabolaTruth, guess: f64) -> Result<VertexFit, LabError> {
    if truth.a == 0.0 {
        return Err(LabError::Validation(
            "coefficient `a` must be non-zero for a parabola".into(),
        ));
    }
    if !guess.is_finite() {
        return Err(LabError::Validation("guess must be a finite number".into()));
    }

    let x0 = round_to(truth.vertex_x(), 2);
    let distance = (x0 - guess).abs();

    Ok(VertexFit {
        x0,
        y0: predict_parabola(truth, x0),
        guess,
        guess_y: predict_parabola(truth, guess),
        delta: round_to(distance, 2),
        matched: distance <= MATCH_RADIUS + MATCH_EPSILON,
    })
}

/// Place the client's trial inputs on the true curve.
///
/// Submitted outputs are ignored: the client only chooses where to probe.
pub fn project_trials(truth: &ParabolaTruth, trials: &TrialPairs) -> TrialPairs {
    TrialPairs {
        x: trials.x.clone(),
        y: trials.x.iter().map(|&x| predict_parabola(truth, x)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: ParabolaTruth = ParabolaTruth {
        a: 2.0,
        b: -40.0,
        c: 3.0,
    };

    #[test]
    fn match_boundary_is_inclusive() {
        let hit = fit_vertex(&P, 10.7).unwrap();
        assert_eq!(hit.x0, 10.0);
        assert_eq!(hit.delta, 0.7);
        assert!(hit.matched);

        let miss = fit_vertex(&P, 10.71).unwrap();
        assert_eq!(miss.delta, 0.71);
        assert!(!miss.matched);

        assert!(fit_vertex(&P, 9.3).unwrap().matched);
        assert!(!fit_vertex(&P, 9.29).unwrap().matched);
    }

    #[test]
    fn vertex_value_uses_rounded_abscissa() {
        let p = ParabolaTruth {
            a: 3.0,
            b: -20.0,
            c: 1.0,
        };
        let fit = fit_vertex(&p, 0.0).unwrap();
        assert_eq!(fit.x0, 3.33);
        assert!((fit.y0 - (3.0 * 3.33 * 3.33 - 20.0 * 3.33 + 1.0)).abs() < 1e-12);
        assert_eq!(fit.guess_y, 1.0);
    }

    #[test]
    fn degenerate_parabola_is_rejected() {
        let flat = ParabolaTruth { a: 0.0, ..P };
        assert!(matches!(fit_vertex(&flat, 1.0), Err(LabError::Validation(_))));
        assert!(matches!(fit_vertex(&P, f64::NAN), Err(LabError::Validation(_))));
    }

    #[test]
    fn trials_are_recomputed_from_truth() {
        let trials = TrialPairs {
            x: vec![0.0, 10.0],
            y: vec![999.0, -999.0],
        };
        let projected = project_trials(&P, &trials);
        assert_eq!(projected.y, vec![3.0, -197.0]);
    }
}
