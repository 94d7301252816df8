//! Response payloads.
//!
//! - `SetupView`: what a GET returns (profile + freshly drawn ground truth)
//! - `LabResult`: what a POST returns (fit, metrics, echoed data, artifacts)
//! - `format`: control lab report text

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{
    ControlScore, GroundTruth, IoLabels, LinearFit, OscillatorTruth, ParabolaTruth, PidAttempts,
    ResponseFit, SliderBounds, SubKind, SystemKind, SystemProfile, TrialPairs, VertexFit,
};
use crate::plot::ChartRef;

/// SETUP payload for one lab session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupView {
    pub kind: SystemKind,
    pub sub_kind: SubKind,
    pub title: &'static str,
    pub prompt: &'static str,
    /// Where the client posts its trial table.
    pub action: String,
    pub labels: IoLabels,
    pub slider: Option<SliderBounds>,
    pub ground_truth: GroundTruth,
}

impl SetupView {
    /// Identification coefficients are exposed scaled down; the rest verbatim.
    pub fn new(profile: &SystemProfile, truth: GroundTruth) -> Self {
        let ground_truth = match truth {
            GroundTruth::Identification(t) => GroundTruth::Identification(t.exposed()),
            other => other,
        };
        Self {
            kind: profile.kind,
            sub_kind: profile.sub_kind,
            title: profile.title,
            prompt: profile.prompt,
            action: profile.sub_kind.action_path(),
            labels: profile.labels,
            slider: profile.slider,
            ground_truth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentificationResult {
    pub sub_kind: SubKind,
    pub fit: LinearFit,
    pub trials: TrialPairs,
    pub charts: Vec<ChartRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackResult {
    pub sub_kind: SubKind,
    pub truth: ParabolaTruth,
    pub fit: VertexFit,
    /// Trial inputs placed on the true curve.
    pub trials: TrialPairs,
    pub charts: Vec<ChartRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PidResult {
    pub truth: OscillatorTruth,
    pub fit: ResponseFit,
    pub attempts: PidAttempts,
    pub charts: Vec<ChartRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlResult {
    pub student: String,
    pub score: ControlScore,
    pub report: Report,
}

/// RESULT payload, tagged by lab kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LabResult {
    Identification(IdentificationResult),
    Feedback(FeedbackResult),
    Pid(PidResult),
    Control(ControlResult),
}

impl LabResult {
    pub fn kind(&self) -> SystemKind {
        match self {
            LabResult::Identification(_) => SystemKind::Identification,
            LabResult::Feedback(_) => SystemKind::Feedback,
            LabResult::Pid(_) => SystemKind::Pid,
            LabResult::Control(_) => SystemKind::Control,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LinearTruth, profile};

    #[test]
    fn identification_setup_is_scaled() {
        let p = profile(SubKind::Car).unwrap();
        let truth = GroundTruth::Identification(LinearTruth {
            slope: 12.0,
            intercept: 2.4,
            scale: 6.0,
        });
        let view = SetupView::new(p, truth);
        assert_eq!(view.action, "/identification/car/");
        assert!(view.slider.is_some());
        match view.ground_truth {
            GroundTruth::Identification(t) => {
                assert!((t.slope - 10.0).abs() < 1e-12);
                assert!((t.intercept - 2.0).abs() < 1e-12);
                assert!((t.scale - 5.0).abs() < 1e-12);
            }
            other => panic!("unexpected truth: {other:?}"),
        }
    }

    #[test]
    fn setup_json_embeds_tagged_truth() {
        let p = profile(SubKind::Gradient).unwrap();
        let truth = GroundTruth::Feedback(ParabolaTruth {
            a: 2.0,
            b: -40.0,
            c: 3.0,
        });
        let json = serde_json::to_value(SetupView::new(p, truth)).unwrap();
        assert_eq!(json["kind"], "feedback");
        assert_eq!(json["sub_kind"], "gradient");
        assert_eq!(json["ground_truth"]["kind"], "feedback");
        assert_eq!(json["ground_truth"]["b"], -40.0);
        assert!(json["slider"].is_null());
    }
}
