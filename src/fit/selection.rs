//! Winner selection for the control lab.
//!
//! Selection rule:
//! 1. Start from the first attempt
//! 2. Walk all attempts in order, taking any score `>=` the running best
//!
//! Ties therefore go to the latest attempt reaching the maximum.

use crate::domain::{ControlAttempt, ControlScore};
use crate::error::LabError;

pub fn select_winner(attempts: Vec<ControlAttempt>) -> Result<ControlScore, LabError> {
    let first = attempts.first().ok_or(LabError::EmptyInput)?;

    let mut best_index = 0;
    let mut best_score = first.score;
    for (i, a) in attempts.iter().enumerate() {
        if a.score >= best_score {
            best_index = i;
            best_score = a.score;
        }
    }

    Ok(ControlScore {
        winner_index: best_index,
        winner: attempts[best_index].clone(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempts(scores: &[i64]) -> Vec<ControlAttempt> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ControlAttempt {
                route: format!("R{}", i + 1),
                entry: 1,
                exit: 2,
                stations: 3,
                fuel: 40,
                score,
            })
            .collect()
    }

    #[test]
    fn last_maximum_wins() {
        let s = select_winner(attempts(&[10, 50, 20, 50, 5])).unwrap();
        assert_eq!(s.winner_index, 3);
        assert_eq!(s.winner.route, "R4");
        assert_eq!(s.attempts.len(), 5);
    }

    #[test]
    fn all_negative_scores_still_pick_a_winner() {
        let s = select_winner(attempts(&[-5, -1, -3])).unwrap();
        assert_eq!(s.winner_index, 1);
    }

    #[test]
    fn single_attempt_wins() {
        assert_eq!(select_winner(attempts(&[0])).unwrap().winner_index, 0);
        assert!(matches!(select_winner(Vec::new()), Err(LabError::EmptyInput)));
    }
}
