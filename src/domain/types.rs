//! Shared domain types.
//!
//! These types are intentionally small and serializable so they can be:
//!
//! - embedded in the SETUP payload and echoed back by the client
//! - carried through the fit pipeline
//! - returned in RESULT payloads

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which simulation family a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SystemKind {
    /// "Black box": recover a hidden linear law from experiments.
    Identification,
    /// Optimum seeking on a hidden parabola.
    Feedback,
    /// Regulator tuning against a damped oscillation.
    Pid,
    /// Trajectory scoring over a fixed number of attempts.
    Control,
}

impl SystemKind {
    pub const ALL: [SystemKind; 4] = [
        SystemKind::Identification,
        SystemKind::Feedback,
        SystemKind::Pid,
        SystemKind::Control,
    ];

    /// Path segment used by the HTTP surface.
    pub fn slug(self) -> &'static str {
        match self {
            SystemKind::Identification => "identification",
            SystemKind::Feedback => "feedback",
            SystemKind::Pid => "pid",
            SystemKind::Control => "control",
        }
    }

    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == s)
    }

    pub fn sub_kinds(self) -> &'static [SubKind] {
        match self {
            SystemKind::Identification => &[
                SubKind::Phone,
                SubKind::Plant,
                SubKind::Seeds,
                SubKind::Car,
                SubKind::Unknown,
            ],
            SystemKind::Feedback => &[SubKind::Gradient, SubKind::Ternary, SubKind::Simple],
            SystemKind::Pid => &[SubKind::Pid],
            SystemKind::Control => &[SubKind::Track],
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Concrete lab variant inside a `SystemKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubKind {
    Phone,
    Plant,
    Seeds,
    Car,
    Unknown,
    Gradient,
    Ternary,
    Simple,
    Pid,
    Track,
}

impl SubKind {
    pub const ALL: [SubKind; 10] = [
        SubKind::Phone,
        SubKind::Plant,
        SubKind::Seeds,
        SubKind::Car,
        SubKind::Unknown,
        SubKind::Gradient,
        SubKind::Ternary,
        SubKind::Simple,
        SubKind::Pid,
        SubKind::Track,
    ];

    pub fn kind(self) -> SystemKind {
        match self {
            SubKind::Phone | SubKind::Plant | SubKind::Seeds | SubKind::Car | SubKind::Unknown => {
                SystemKind::Identification
            }
            SubKind::Gradient | SubKind::Ternary | SubKind::Simple => SystemKind::Feedback,
            SubKind::Pid => SystemKind::Pid,
            SubKind::Track => SystemKind::Control,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            SubKind::Phone => "phone",
            SubKind::Plant => "plant",
            SubKind::Seeds => "seeds",
            SubKind::Car => "car",
            SubKind::Unknown => "unknown",
            SubKind::Gradient => "gradient",
            SubKind::Ternary => "ternary",
            SubKind::Simple => "simple",
            SubKind::Pid => "pid",
            SubKind::Track => "track",
        }
    }

    /// Resolve a `(kind, sub-kind)` path pair.
    ///
    /// The sub-kind must belong to the kind; `ternary_search` is accepted as an
    /// alias of `ternary` because older lab links use it.
    pub fn resolve(kind: SystemKind, s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        let s = if s == "ternary_search" { "ternary" } else { s.as_str() };
        kind.sub_kinds().iter().copied().find(|sub| sub.slug() == s)
    }

    /// Relative URL the client posts its trial table back to.
    pub fn action_path(self) -> String {
        format!("/{}/{}/", self.kind().slug(), self.slug())
    }
}

impl fmt::Display for SubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Hidden coefficients of a "black box" linear system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearTruth {
    pub slope: f64,
    pub intercept: f64,
    /// Amplitude of the client-side measurement noise.
    pub scale: f64,
}

/// Divisor applied to identification coefficients before they leave the server.
pub const IDENTIFICATION_EXPOSURE_DIVISOR: f64 = 1.2;

impl LinearTruth {
    /// The coefficients as the client sees them.
    pub fn exposed(self) -> Self {
        Self {
            slope: self.slope / IDENTIFICATION_EXPOSURE_DIVISOR,
            intercept: self.intercept / IDENTIFICATION_EXPOSURE_DIVISOR,
            scale: self.scale / IDENTIFICATION_EXPOSURE_DIVISOR,
        }
    }
}

/// Hidden parabola `a·x² + b·x + c` of the feedback lab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParabolaTruth {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl ParabolaTruth {
    /// Unrounded vertex abscissa `-b / (2a)`.
    pub fn vertex_x(self) -> f64 {
        -self.b / (2.0 * self.a)
    }
}

/// Damped oscillation `v + exp(-b·x)·cos(w·x)` plus the regulator targets.
///
/// Field names on the wire match the form fields the client echoes back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorTruth {
    #[serde(rename = "v")]
    pub target: f64,
    #[serde(rename = "b")]
    pub damping: f64,
    #[serde(rename = "w")]
    pub frequency: f64,
    #[serde(rename = "t")]
    pub max_time: f64,
    #[serde(rename = "e")]
    pub tolerance: f64,
}

/// Per-session ground truth; lives for one GET/POST round trip only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GroundTruth {
    Identification(LinearTruth),
    Feedback(ParabolaTruth),
    Pid(OscillatorTruth),
    /// The control lab has no hidden coefficients: the navigation outcome is the truth.
    Control,
}

impl GroundTruth {
    pub fn kind(&self) -> SystemKind {
        match self {
            GroundTruth::Identification(_) => SystemKind::Identification,
            GroundTruth::Feedback(_) => SystemKind::Feedback,
            GroundTruth::Pid(_) => SystemKind::Pid,
            GroundTruth::Control => SystemKind::Control,
        }
    }
}

/// Ordered `(input, output)` observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialPairs {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl TrialPairs {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.x.iter().copied().zip(self.y.iter().copied()).collect()
    }
}

/// One column of the regulator table: the gains tried and the settling time they gave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidAttempt {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub settling_time: f64,
}

/// Regulator attempts in submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PidAttempts {
    pub attempts: Vec<PidAttempt>,
}

impl PidAttempts {
    /// The final attempt; its settling time is the one that gets plotted.
    pub fn last(&self) -> Option<&PidAttempt> {
        self.attempts.last()
    }
}

/// One column of the control lab table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlAttempt {
    pub route: String,
    pub entry: i64,
    pub exit: i64,
    pub stations: i64,
    pub fuel: i64,
    pub score: i64,
}

/// Fitted line of the identification lab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub k: f64,
    pub b: f64,
    /// Mean absolute error between fitted and observed outputs.
    pub mae: f64,
    pub n: usize,
}

/// Closed-form vertex versus the client's guess.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexFit {
    pub x0: f64,
    pub y0: f64,
    pub guess: f64,
    pub guess_y: f64,
    pub delta: f64,
    /// `|x0 - guess| <= 0.7`.
    pub matched: bool,
}

/// Regulator response evaluated at the reported settling time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFit {
    pub t_last: f64,
    pub y_last: f64,
    /// `t_last <= t` (the deadline).
    pub settled_in_time: bool,
    /// `|y(t_last) - v| <= e`.
    pub within_tolerance: bool,
    /// Time after which the decay envelope stays inside the tolerance band.
    pub envelope_settling_time: f64,
    pub final_attempt: PidAttempt,
    pub settling_times: Vec<f64>,
}

/// Winning attempt of the control lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlScore {
    pub winner_index: usize,
    pub winner: ControlAttempt,
    pub attempts: Vec<ControlAttempt>,
}

/// What a stored artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Chart,
    Report,
}

/// Identifier of a stored artifact: request scope plus a random number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId {
    pub scope: String,
    pub number: u32,
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.number)
    }
}

/// A file written as a side effect of a POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub kind: ArtifactKind,
    #[serde(skip)]
    pub path: PathBuf,
    pub url: String,
}
