//! JPEG chart rendering with Plotters.
//!
//! Rendering is split in two steps:
//!
//! 1. a pure *scene* builder per lab computes bounds, series and markers
//! 2. `draw_scene` rasterizes a scene into a freshly allocated artifact
//!
//! Each call owns its `BitMapBackend`, so concurrent requests never share a
//! figure. Charts carry no raster text: axis captions and series names are
//! returned alongside the artifact as a legend.

use std::path::Path;

use plotters::prelude::*;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::domain::{Artifact, LinearFit, OscillatorTruth, ParabolaTruth, ResponseFit, TrialPairs, VertexFit};
use crate::error::LabError;
use crate::fit::{MATCH_RADIUS, response_curve};
use crate::io::Scope;
use crate::math::{finite_bounds, linspace};
use crate::models::{predict_line, predict_parabola, sample_curve};

/// Output size in pixels.
pub const CHART_SIZE: (u32, u32) = (800, 600);

const CURVE_SAMPLES: usize = 1000;
const GRID_LINES: usize = 9;

const BACKGROUND: RGBColor = RGBColor(0x0f, 0x0f, 0x14);
const GRID: RGBColor = RGBColor(0x26, 0x26, 0x30);
const AXIS: RGBColor = RGBColor(0x55, 0x55, 0x66);
const LINE: RGBColor = RGBColor(0x00, 0xd4, 0xff);
const POINTS: RGBColor = RGBColor(0xa8, 0x55, 0xf7);
const ACCENT: RGBColor = RGBColor(0xf8, 0x71, 0x71);
const VERTEX: RGBColor = RGBColor(0x34, 0xd3, 0x99);
const GUESS: RGBColor = RGBColor(0xc0, 0x84, 0xfc);
const DEADLINE: RGBColor = RGBColor(0xfb, 0xbf, 0x24);

/// One legend row shown next to a chart by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    /// `#rrggbb`.
    pub color: String,
}

/// A rendered chart plus the text the image itself does not carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRef {
    #[serde(flatten)]
    pub artifact: Artifact,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend: Vec<LegendEntry>,
}

/// Geometry of a chart, independent of the raster backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Line {
        points: Vec<(f64, f64)>,
        color: RGBColor,
        label: String,
    },
    Markers {
        points: Vec<(f64, f64)>,
        color: RGBColor,
        radius: i32,
        label: String,
    },
    Vertical {
        x: f64,
        color: RGBColor,
        label: Option<String>,
    },
    Horizontal {
        y: f64,
        color: RGBColor,
        label: Option<String>,
    },
}

impl Layer {
    fn legend(&self) -> Option<LegendEntry> {
        let (label, color) = match self {
            Layer::Line { label, color, .. } | Layer::Markers { label, color, .. } => {
                (Some(label), color)
            }
            Layer::Vertical { label, color, .. } | Layer::Horizontal { label, color, .. } => {
                (label.as_ref(), color)
            }
        };
        label.map(|label| LegendEntry {
            label: label.clone(),
            color: hex(color),
        })
    }
}

impl Scene {
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut out: Vec<LegendEntry> = Vec::new();
        for entry in self.layers.iter().filter_map(Layer::legend) {
            if !out.contains(&entry) {
                out.push(entry);
            }
        }
        out
    }
}

/// Identification: fitted line over the observed points.
pub fn identification_scene(trials: &TrialPairs, fit: &LinearFit, labels: (&str, &str)) -> Result<Scene, LabError> {
    let (x_lo, x_hi) = finite_bounds(&trials.x).ok_or(LabError::EmptyInput)?;
    let (y_lo, y_hi) = finite_bounds(&trials.y).ok_or(LabError::EmptyInput)?;
    let (x0, x1) = (x_lo - 5.0, x_hi + 5.0);

    Ok(Scene {
        title: "Identified law".into(),
        x_label: labels.0.into(),
        y_label: labels.1.into(),
        x_range: (x0, x1),
        y_range: (y_lo - 5.0, y_hi + 5.0),
        layers: vec![
            Layer::Line {
                points: sample_curve(x0, x1, 2, |x| predict_line(fit.k, fit.b, x)),
                color: LINE,
                label: format!("y = {:.2}·x + {:.2}", fit.k, fit.b),
            },
            Layer::Markers {
                points: trials.points(),
                color: POINTS,
                radius: 5,
                label: "Observations".into(),
            },
        ],
    })
}

/// Feedback overview: the whole curve on [-30, 30] with trials, vertex and guess.
pub fn feedback_overview_scene(truth: &ParabolaTruth, trials: &TrialPairs, fit: &VertexFit) -> Scene {
    let curve = sample_curve(-30.0, 30.0, CURVE_SAMPLES, |x| predict_parabola(truth, x));
    let mut ys: Vec<f64> = curve.iter().map(|p| p.1).collect();
    ys.extend(trials.y.iter().copied());

    Scene {
        title: "Objective function".into(),
        x_label: "x".into(),
        y_label: "f(x)".into(),
        x_range: (-33.0, 33.0),
        y_range: padded(finite_bounds(&ys).unwrap_or((-1.0, 1.0)), 0.05),
        layers: vec![
            Layer::Line {
                points: curve,
                color: LINE,
                label: "f(x)".into(),
            },
            Layer::Markers {
                points: trials.points(),
                color: POINTS,
                radius: 4,
                label: "Trials".into(),
            },
            Layer::Markers {
                points: vec![(fit.x0, fit.y0)],
                color: VERTEX,
                radius: 6,
                label: format!("Optimum x = {:.2}", fit.x0),
            },
            Layer::Markers {
                points: vec![(fit.guess, fit.guess_y)],
                color: GUESS,
                radius: 6,
                label: format!("Answer x = {}", fit.guess),
            },
        ],
    }
}

/// Feedback zoom: `x0 ± 2` with the acceptance band marked.
pub fn feedback_zoom_scene(truth: &ParabolaTruth, fit: &VertexFit) -> Scene {
    let (x0, x1) = (fit.x0 - 2.0, fit.x0 + 2.0);
    let curve = sample_curve(x0, x1, CURVE_SAMPLES, |x| predict_parabola(truth, x));
    let mut ys: Vec<f64> = curve.iter().map(|p| p.1).collect();
    if (x0..=x1).contains(&fit.guess) {
        ys.push(fit.guess_y);
    }

    Scene {
        title: "Neighbourhood of the optimum".into(),
        x_label: "x".into(),
        y_label: "f(x)".into(),
        x_range: (x0, x1),
        y_range: padded(finite_bounds(&ys).unwrap_or((-1.0, 1.0)), 0.1),
        layers: vec![
            Layer::Line {
                points: curve,
                color: LINE,
                label: "f(x)".into(),
            },
            Layer::Vertical {
                x: fit.x0 - MATCH_RADIUS,
                color: ACCENT,
                label: Some(format!("Tolerance ±{MATCH_RADIUS}")),
            },
            Layer::Vertical {
                x: fit.x0 + MATCH_RADIUS,
                color: ACCENT,
                label: Some(format!("Tolerance ±{MATCH_RADIUS}")),
            },
            Layer::Vertical {
                x: fit.x0,
                color: VERTEX,
                label: None,
            },
            Layer::Vertical {
                x: fit.guess,
                color: GUESS,
                label: None,
            },
            Layer::Markers {
                points: vec![(fit.x0, fit.y0)],
                color: VERTEX,
                radius: 6,
                label: format!("Optimum x = {:.2}", fit.x0),
            },
            Layer::Markers {
                points: vec![(fit.guess, fit.guess_y)],
                color: GUESS,
                radius: 6,
                label: format!("Answer x = {}", fit.guess),
            },
        ],
    }
}

/// PID: the response curve, the achieved point and the target band.
pub fn pid_scene(truth: &OscillatorTruth, fit: &ResponseFit) -> Scene {
    let curve = response_curve(truth, fit.t_last);
    let span = curve.last().map(|p| p.0).unwrap_or(fit.t_last);
    let mut ys: Vec<f64> = curve.iter().map(|p| p.1).collect();
    ys.extend([truth.target + truth.tolerance, truth.target - truth.tolerance]);

    Scene {
        title: "Transient response".into(),
        x_label: "t, s".into(),
        y_label: "y(t)".into(),
        x_range: (0.0, span),
        y_range: padded(finite_bounds(&ys).unwrap_or((0.0, 1.0)), 0.1),
        layers: vec![
            Layer::Horizontal {
                y: truth.target + truth.tolerance,
                color: ACCENT,
                label: Some(format!("v ± e = {} ± {}", truth.target, truth.tolerance)),
            },
            Layer::Horizontal {
                y: truth.target - truth.tolerance,
                color: ACCENT,
                label: Some(format!("v ± e = {} ± {}", truth.target, truth.tolerance)),
            },
            Layer::Vertical {
                x: truth.max_time,
                color: DEADLINE,
                label: Some(format!("Deadline t = {}", truth.max_time)),
            },
            Layer::Line {
                points: curve,
                color: LINE,
                label: "y(t)".into(),
            },
            Layer::Markers {
                points: vec![(fit.t_last, fit.y_last)],
                color: GUESS,
                radius: 6,
                label: format!("Settled at t = {:.2}", fit.t_last),
            },
        ],
    }
}

pub fn render_identification<R: Rng + ?Sized>(
    scope: &mut Scope<'_>,
    rng: &mut R,
    trials: &TrialPairs,
    fit: &LinearFit,
    labels: (&str, &str),
) -> Result<ChartRef, LabError> {
    let scene = identification_scene(trials, fit, labels)?;
    render(scope, rng, scene)
}

pub fn render_feedback<R: Rng + ?Sized>(
    scope: &mut Scope<'_>,
    rng: &mut R,
    truth: &ParabolaTruth,
    trials: &TrialPairs,
    fit: &VertexFit,
) -> Result<Vec<ChartRef>, LabError> {
    Ok(vec![
        render(scope, rng, feedback_overview_scene(truth, trials, fit))?,
        render(scope, rng, feedback_zoom_scene(truth, fit))?,
    ])
}

pub fn render_pid<R: Rng + ?Sized>(
    scope: &mut Scope<'_>,
    rng: &mut R,
    truth: &OscillatorTruth,
    fit: &ResponseFit,
) -> Result<ChartRef, LabError> {
    render(scope, rng, pid_scene(truth, fit))
}

/// Allocate an artifact in `scope` and rasterize `scene` into it.
pub fn render<R: Rng + ?Sized>(scope: &mut Scope<'_>, rng: &mut R, scene: Scene) -> Result<ChartRef, LabError> {
    let artifact = scope.allocate(rng)?;
    draw_scene(&artifact.path, &scene).map_err(|e| LabError::Render(e.to_string()))?;
    debug!(id = %artifact.id, title = %scene.title, "rendered chart");

    Ok(ChartRef {
        legend: scene.legend(),
        artifact,
        title: scene.title,
        x_label: scene.x_label,
        y_label: scene.y_label,
    })
}

fn draw_scene(path: &Path, scene: &Scene) -> Result<(), Box<dyn std::error::Error>> {
    let (x0, x1) = scene.x_range;
    let (y0, y1) = scene.y_range;
    if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
        return Err(format!("invalid chart window x=[{x0}, {x1}] y=[{y0}, {y1}]").into());
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&BACKGROUND)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(24)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    // Plain grid instead of `configure_mesh`, which would need a font.
    for x in linspace(x0, x1, GRID_LINES) {
        chart.draw_series(LineSeries::new([(x, y0), (x, y1)], &GRID))?;
    }
    for y in linspace(y0, y1, GRID_LINES) {
        chart.draw_series(LineSeries::new([(x0, y), (x1, y)], &GRID))?;
    }
    if (x0..=x1).contains(&0.0) {
        chart.draw_series(LineSeries::new([(0.0, y0), (0.0, y1)], AXIS.stroke_width(2)))?;
    }
    if (y0..=y1).contains(&0.0) {
        chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], AXIS.stroke_width(2)))?;
    }

    for layer in &scene.layers {
        match layer {
            Layer::Line { points, color, .. } => {
                chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?;
            }
            Layer::Markers {
                points,
                color,
                radius,
                ..
            } => {
                chart.draw_series(points.iter().map(|&p| Circle::new(p, *radius, color.filled())))?;
            }
            Layer::Vertical { x, color, .. } => {
                chart.draw_series(LineSeries::new([(*x, y0), (*x, y1)], color.stroke_width(1)))?;
            }
            Layer::Horizontal { y, color, .. } => {
                chart.draw_series(LineSeries::new([(x0, *y), (x1, *y)], color.stroke_width(1)))?;
            }
        }
    }

    root.present()?;
    Ok(())
}

/// Widen `(lo, hi)` by `frac` of its span on each side (at least 1.0 total).
fn padded((lo, hi): (f64, f64), frac: f64) -> (f64, f64) {
    let pad = ((hi - lo) * frac).max(0.5);
    (lo - pad, hi + pad)
}

fn hex(c: &RGBColor) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
}
