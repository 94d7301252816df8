//! Shared lab pipeline used by the HTTP handlers and the CLI.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! form fields -> trial table -> fit/score -> charts or report -> result payload
//!
//! Everything here is synchronous; the server runs it on the blocking pool.

use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::data::generate;
use crate::domain::{OscillatorTruth, ParabolaTruth, SubKind, SystemKind, profile};
use crate::error::LabError;
use crate::fit::{fit_line, fit_response, fit_vertex, project_trials, select_winner};
use crate::io::{
    ArtifactStore, Scope, parse_control_attempts, parse_delimited, parse_pairs, parse_pid_attempts,
    parse_scalar,
};
use crate::plot::{render_feedback, render_identification, render_pid};
use crate::report::{
    ControlResult, FeedbackResult, IdentificationResult, LabResult, PidResult, ReportConfig,
    SetupView, normalize_name, write_report,
};

/// Submitted form fields, by name.
pub type Form = HashMap<String, String>;

/// Stores and settings a POST needs.
#[derive(Debug, Clone, Copy)]
pub struct LabContext<'a> {
    pub charts: &'a ArtifactStore,
    pub works: &'a ArtifactStore,
    pub report: &'a ReportConfig,
}

/// Draw fresh ground truth and build the SETUP payload.
pub fn setup<R: Rng + ?Sized>(sub_kind: SubKind, rng: &mut R) -> Result<SetupView, LabError> {
    let profile = profile(sub_kind)?;
    let truth = generate(sub_kind, rng)?;
    debug!(sub_kind = %sub_kind, kind = %truth.kind(), "ground truth drawn");
    Ok(SetupView::new(profile, truth))
}

/// Evaluate a submitted trial table for `sub_kind`.
pub fn run_lab(sub_kind: SubKind, form: &Form, ctx: &LabContext<'_>) -> Result<LabResult, LabError> {
    let result = match sub_kind.kind() {
        SystemKind::Identification => run_identification(sub_kind, form, ctx).map(LabResult::Identification),
        SystemKind::Feedback => run_feedback(sub_kind, form, ctx).map(LabResult::Feedback),
        SystemKind::Pid => run_pid(form, ctx).map(LabResult::Pid),
        SystemKind::Control => run_control(form, ctx).map(LabResult::Control),
    };

    match &result {
        Ok(r) => info!(kind = %r.kind(), sub_kind = %sub_kind, "lab round evaluated"),
        Err(e) => warn!(sub_kind = %sub_kind, error = %e, "lab round rejected"),
    }
    result
}

pub fn run_identification(
    sub_kind: SubKind,
    form: &Form,
    ctx: &LabContext<'_>,
) -> Result<IdentificationResult, LabError> {
    let labels = profile(sub_kind)?.labels;
    let trials = parse_pairs(table_data(form))?;
    let fit = fit_line(&trials)?;

    let chart = in_scope(ctx.charts, |scope, rng| {
        render_identification(scope, rng, &trials, &fit, (labels.input, labels.output))
    })?;

    Ok(IdentificationResult {
        sub_kind,
        fit,
        trials,
        charts: vec![chart],
    })
}

pub fn run_feedback(sub_kind: SubKind, form: &Form, ctx: &LabContext<'_>) -> Result<FeedbackResult, LabError> {
    let truth = parabola_from_form(form)?;
    let guess = scalar(form, "number")?;
    let submitted = parse_pairs(table_data(form))?;

    let fit = fit_vertex(&truth, guess)?;
    let trials = project_trials(&truth, &submitted);

    let charts = in_scope(ctx.charts, |scope, rng| render_feedback(scope, rng, &truth, &trials, &fit))?;

    Ok(FeedbackResult {
        sub_kind,
        truth,
        fit,
        trials,
        charts,
    })
}

pub fn run_pid(form: &Form, ctx: &LabContext<'_>) -> Result<PidResult, LabError> {
    let truth = oscillator_from_form(form)?;
    let attempts = parse_pid_attempts(&parse_delimited(table_data(form))?)?;
    let fit = fit_response(&truth, &attempts)?;

    let chart = in_scope(ctx.charts, |scope, rng| render_pid(scope, rng, &truth, &fit))?;

    Ok(PidResult {
        truth,
        fit,
        attempts,
        charts: vec![chart],
    })
}

pub fn run_control(form: &Form, ctx: &LabContext<'_>) -> Result<ControlResult, LabError> {
    let attempts = parse_control_attempts(&parse_delimited(table_data(form))?)?;
    let student = normalize_name(form.get("text").map(String::as_str).unwrap_or_default())?;
    let score = select_winner(attempts)?;

    let report = in_scope(ctx.works, |scope, rng| write_report(scope, rng, &score, &student, ctx.report))?;

    Ok(ControlResult {
        student,
        score,
        report,
    })
}

/// Parabola echoed back by the client in the `a`, `b`, `c` fields.
fn parabola_from_form(form: &Form) -> Result<ParabolaTruth, LabError> {
    Ok(ParabolaTruth {
        a: scalar(form, "a")?,
        b: scalar(form, "b")?,
        c: scalar(form, "c")?,
    })
}

fn oscillator_from_form(form: &Form) -> Result<OscillatorTruth, LabError> {
    Ok(OscillatorTruth {
        target: scalar(form, "v")?,
        damping: scalar(form, "b")?,
        frequency: scalar(form, "w")?,
        max_time: scalar(form, "t")?,
        tolerance: scalar(form, "e")?,
    })
}

/// Run `f` in a fresh scope of `store`; the scope is discarded if `f` fails.
fn in_scope<T>(
    store: &ArtifactStore,
    f: impl FnOnce(&mut Scope<'_>, &mut rand::rngs::ThreadRng) -> Result<T, LabError>,
) -> Result<T, LabError> {
    let mut scope = store.open_scope()?;
    let mut rng = rand::thread_rng();
    let outcome = scope.begin_batch().and_then(|()| f(&mut scope, &mut rng));
    if outcome.is_err() {
        scope.discard();
    }
    outcome
}

/// The submitted trial table; a missing field counts as no rows at all.
fn table_data(form: &Form) -> &str {
    form.get("table_data").map(String::as_str).unwrap_or_default()
}

fn scalar(form: &Form, name: &str) -> Result<f64, LabError> {
    parse_scalar(name, form.get(name).map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroundTruth, TrialPairs};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    struct Fixture {
        _tmp: tempfile::TempDir,
        charts: ArtifactStore,
        works: ArtifactStore,
        report: ReportConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let ttl = Duration::from_secs(3600);
            Self {
                charts: ArtifactStore::charts(tmp.path().join("graphics"), "/graphics", ttl),
                works: ArtifactStore::reports(tmp.path().join("works"), "/works", ttl),
                report: ReportConfig::default(),
                _tmp: tmp,
            }
        }

        fn ctx(&self) -> LabContext<'_> {
            LabContext {
                charts: &self.charts,
                works: &self.works,
                report: &self.report,
            }
        }
    }

    fn form(pairs: &[(&str, &str)]) -> Form {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn pair_form(trials: &TrialPairs) -> String {
        let row = |label: &str, values: &[f64]| {
            std::iter::once(label.to_string())
                .chain(values.iter().map(f64::to_string))
                .collect::<Vec<_>>()
                .join(",")
        };
        let text = format!("{}\n{}", row("Input", &trials.x), row("Output", &trials.y));
        serde_json::Value::String(text).to_string()
    }

    fn scope_count(store: &ArtifactStore) -> usize {
        std::fs::read_dir(store.root()).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn identification_round_produces_one_chart() {
        let fx = Fixture::new();
        let trials = TrialPairs {
            x: vec![1.0, 2.0, 3.0],
            y: vec![3.0, 5.0, 7.0],
        };
        let table = pair_form(&trials);
        let r = run_identification(SubKind::Phone, &form(&[("table_data", &table)]), &fx.ctx()).unwrap();
        assert_eq!(r.fit.k, 2.0);
        assert_eq!(r.fit.b, 1.0);
        assert_eq!(r.charts.len(), 1);
        assert!(r.charts[0].artifact.path.exists());
    }

    #[test]
    fn feedback_setup_round_trips_to_identical_fit() {
        let fx = Fixture::new();
        let mut rng = StdRng::seed_from_u64(42);
        let view = setup(SubKind::Ternary, &mut rng).unwrap();
        let GroundTruth::Feedback(truth) = view.ground_truth else {
            panic!("expected feedback truth");
        };

        let json = serde_json::to_value(&view).unwrap();
        let gt = &json["ground_truth"];
        let table = pair_form(&TrialPairs {
            x: vec![-5.0, 0.0, 5.0],
            y: vec![0.0, 0.0, 0.0],
        });
        let echoed = form(&[
            ("a", &gt["a"].to_string()),
            ("b", &gt["b"].to_string()),
            ("c", &gt["c"].to_string()),
            ("number", "3,5"),
            ("table_data", &table),
        ]);

        assert_eq!(GroundTruth::Feedback(parabola_from_form(&echoed).unwrap()), view.ground_truth);
        let r = run_feedback(SubKind::Ternary, &echoed, &fx.ctx()).unwrap();
        assert_eq!(r.fit, fit_vertex(&truth, 3.5).unwrap());
        assert_eq!(r.charts.len(), 2);
    }

    #[test]
    fn pid_setup_round_trips_to_identical_fit() {
        let fx = Fixture::new();
        let mut rng = StdRng::seed_from_u64(5);
        let view = setup(SubKind::Pid, &mut rng).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        let gt = &json["ground_truth"];

        let table = "[Parameter,Attempt 1,Attempt 2\\nKp,1,2\\nKi,0.5,0.4\\nKd,0.1,0.2\\nt,Too long,2.4]";
        let mut echoed = form(&[("table_data", table)]);
        for key in ["v", "b", "w", "t", "e"] {
            echoed.insert(key.to_string(), gt[key].to_string());
        }

        let truth = oscillator_from_form(&echoed).unwrap();
        assert_eq!(GroundTruth::Pid(truth), view.ground_truth);

        let r = run_pid(&echoed, &fx.ctx()).unwrap();
        assert_eq!(r.fit.t_last, 2.4);
        assert_eq!(r.fit.settling_times, vec![8.0, 2.4]);
        assert_eq!(r.fit.settled_in_time, 2.4 <= truth.max_time);
    }

    #[test]
    fn control_round_writes_report() {
        let fx = Fixture::new();
        let table = "[route,A,B,C,D,E\\nx1,1,2,3,4,5\\nx2,5,4,3,2,1\\nsv,1,2,3,4,0\\nfuel,90,80,70,60,50\\nscore,10,50,20,50,5]";
        let r = run_control(
            &form(&[("table_data", table), ("text", "Иванов Иван Иванович")]),
            &fx.ctx(),
        )
        .unwrap();
        assert_eq!(r.student, "И. И. Иванов");
        assert_eq!(r.score.winner_index, 3);
        assert_eq!(r.score.winner.route, "D");
        assert!(r.report.text.contains("составил 50 очков"));
        assert!(r.report.text.contains("использования 5 доступных попыток"));
        assert!(r.report.artifact.path.exists());
    }

    #[test]
    fn rejected_rounds_leave_no_scope_behind() {
        let fx = Fixture::new();
        let err = run_lab(
            SubKind::Track,
            &form(&[("table_data", "[route,A\\nx1,1\\nx2,1\\nsv,1\\nfuel,1\\nscore,1]"), ("text", "Иванов")]),
            &fx.ctx(),
        )
        .unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
        assert_eq!(scope_count(&fx.works), 0);

        let err = run_lab(SubKind::Gradient, &form(&[("a", "0"), ("b", "1"), ("c", "1"), ("number", "1"), ("table_data", "\"x,1\\ny,1\"")]), &fx.ctx())
            .unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
        assert_eq!(scope_count(&fx.charts), 0);
    }

    #[test]
    fn missing_fields_are_parse_errors() {
        let fx = Fixture::new();
        let err = run_pid(&form(&[("v", "7")]), &fx.ctx()).unwrap_err();
        assert!(matches!(err, LabError::Parse { .. }));
    }

    #[test]
    fn blank_or_missing_table_is_empty_input() {
        let fx = Fixture::new();
        for fields in [&[("table_data", "")][..], &[][..]] {
            let err = run_identification(SubKind::Phone, &form(fields), &fx.ctx()).unwrap_err();
            assert!(matches!(err, LabError::EmptyInput), "identification {fields:?}");

            let mut control = form(fields);
            control.insert("text".into(), "Иванов Иван".into());
            let err = run_control(&control, &fx.ctx()).unwrap_err();
            assert!(matches!(err, LabError::EmptyInput), "control {fields:?}");
        }
        assert_eq!(scope_count(&fx.charts), 0);
        assert_eq!(scope_count(&fx.works), 0);
    }

    #[test]
    fn evaluated_round_reports_its_kind() {
        let fx = Fixture::new();
        let table = pair_form(&TrialPairs {
            x: vec![0.0, 1.0],
            y: vec![1.0, 3.0],
        });
        let r = run_lab(SubKind::Plant, &form(&[("table_data", &table)]), &fx.ctx()).unwrap();
        assert_eq!(r.kind(), SystemKind::Identification);

        let mut rng = StdRng::seed_from_u64(9);
        let view = setup(SubKind::Track, &mut rng).unwrap();
        assert_eq!(view.ground_truth.kind(), SystemKind::Control);
    }
}
