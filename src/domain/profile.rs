//! Static profile table: one `SystemProfile` per `SubKind`.
//!
//! Coefficient ranges, slider bounds and labels live here rather than being
//! scattered across handlers. `validate_profiles` runs at start-up and refuses
//! to serve if any sub-kind is missing or inconsistent.

use serde::Serialize;

use crate::domain::{SubKind, SystemKind};
use crate::error::LabError;

/// Uniform sampling range of one coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoefficientRange {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    /// Decimal places kept after sampling (`None` = unrounded).
    pub decimals: Option<u32>,
}

impl CoefficientRange {
    const fn raw(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            decimals: None,
        }
    }

    const fn rounded(name: &'static str, min: f64, max: f64, decimals: u32) -> Self {
        Self {
            name,
            min,
            max,
            decimals: Some(decimals),
        }
    }
}

/// Input slider shown by the identification client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliderBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub initial: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IoLabels {
    pub input: &'static str,
    pub output: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemProfile {
    pub kind: SystemKind,
    pub sub_kind: SubKind,
    pub title: &'static str,
    pub prompt: &'static str,
    pub coefficients: &'static [CoefficientRange],
    pub slider: Option<SliderBounds>,
    pub labels: IoLabels,
}

const PHONE: [CoefficientRange; 3] = [
    CoefficientRange::raw("slope", -2.0, -0.5),
    CoefficientRange::raw("intercept", 5.0, 25.0),
    CoefficientRange::raw("scale", 1.0, 6.0),
];

const GROWTH: [CoefficientRange; 3] = [
    CoefficientRange::raw("slope", 1.0, 3.0),
    CoefficientRange::raw("intercept", 5.0, 15.0),
    CoefficientRange::raw("scale", 1.0, 4.0),
];

const CAR: [CoefficientRange; 3] = [
    CoefficientRange::raw("slope", 5.0, 15.0),
    CoefficientRange::raw("intercept", 0.0, 5.0),
    CoefficientRange::raw("scale", 5.0, 20.0),
];

const UNKNOWN: [CoefficientRange; 3] = [
    CoefficientRange::raw("slope", -10.0, 10.0),
    CoefficientRange::raw("intercept", 0.0, 50.0),
    CoefficientRange::raw("scale", 0.0, 30.0),
];

const PARABOLA: [CoefficientRange; 3] = [
    CoefficientRange::rounded("a", 1.0, 7.0, 1),
    CoefficientRange::rounded("b", -20.0, 20.0, 1),
    CoefficientRange::rounded("c", -10.0, 10.0, 1),
];

const OSCILLATOR: [CoefficientRange; 5] = [
    CoefficientRange::rounded("v", 5.0, 10.0, 2),
    CoefficientRange::rounded("b", 0.1, 0.9, 2),
    CoefficientRange::rounded("w", 2.0, 10.0, 2),
    CoefficientRange::rounded("t", 1.0, 3.5, 2),
    CoefficientRange::rounded("e", 0.1, 0.5, 2),
];

const fn slider(min: f64, max: f64, step: f64, initial: f64) -> Option<SliderBounds> {
    Some(SliderBounds {
        min,
        max,
        step,
        initial,
    })
}

static PROFILES: [SystemProfile; 10] = [
    SystemProfile {
        kind: SystemKind::Identification,
        sub_kind: SubKind::Phone,
        title: "Разряд телефона",
        prompt: "📱 Мобильный телефон: как быстро разрядится батарея в зависимости от времени разговора?",
        coefficients: &PHONE,
        slider: slider(0.0, 60.0, 1.0, 30.0),
        labels: IoLabels {
            input: "время разговора",
            output: "оставшийся уровень заряда",
        },
    },
    SystemProfile {
        kind: SystemKind::Identification,
        sub_kind: SubKind::Plant,
        title: "Рост растения",
        prompt: "🌱 Рост растения: какой будет высота растения в зависимости от полива?",
        coefficients: &GROWTH,
        slider: slider(0.0, 100.0, 1.0, 50.0),
        labels: IoLabels {
            input: "объём воды",
            output: "высота растения",
        },
    },
    SystemProfile {
        kind: SystemKind::Identification,
        sub_kind: SubKind::Seeds,
        title: "Вес семян",
        prompt: "🌻 Вес семян: сколько будет весить кучка семян в зависимости от количества семян в ней?",
        coefficients: &GROWTH,
        slider: slider(0.0, 100.0, 1.0, 50.0),
        labels: IoLabels {
            input: "количество семян",
            output: "вес кучки",
        },
    },
    SystemProfile {
        kind: SystemKind::Identification,
        sub_kind: SubKind::Car,
        title: "Скорость автомобиля",
        prompt: "🚗 Скорость автомобиля: с какой скоростью поедет автомобиль в зависимости от силы нажатия на педаль акселерации?",
        coefficients: &CAR,
        slider: slider(0.0, 10.0, 0.1, 5.0),
        labels: IoLabels {
            input: "число",
            output: "число",
        },
    },
    SystemProfile {
        kind: SystemKind::Identification,
        sub_kind: SubKind::Unknown,
        title: "Неведомое создание",
        prompt: "❓ Неведомое: что ответит неведомое создание на вопрос?",
        coefficients: &UNKNOWN,
        slider: slider(-100.0, 100.0, 1.0, 0.0),
        labels: IoLabels {
            input: "значение",
            output: "результат",
        },
    },
    SystemProfile {
        kind: SystemKind::Feedback,
        sub_kind: SubKind::Gradient,
        title: "Градиентный спуск",
        prompt: "🦄 С помощью производной вам нужно найти минимум функции с помощью Градиентного спуска",
        coefficients: &PARABOLA,
        slider: None,
        labels: IoLabels {
            input: "точка",
            output: "Производная в точке",
        },
    },
    SystemProfile {
        kind: SystemKind::Feedback,
        sub_kind: SubKind::Ternary,
        title: "Тернарный поиск",
        prompt: "🔎 Алгоритмы добрались даже сюда. Здесь, ориентируясь по значеням функции нужно найти ее минимум",
        coefficients: &PARABOLA,
        slider: None,
        labels: IoLabels {
            input: "точка",
            output: "Значение",
        },
    },
    SystemProfile {
        kind: SystemKind::Feedback,
        sub_kind: SubKind::Simple,
        title: "Перебор значений",
        prompt: "📊 Через перебор значений нужно подобраться к минимуму как можно ближе",
        coefficients: &PARABOLA,
        slider: None,
        labels: IoLabels {
            input: "точка",
            output: "Расстояние до минимума",
        },
    },
    SystemProfile {
        kind: SystemKind::Pid,
        sub_kind: SubKind::Pid,
        title: "PID-регулятор",
        prompt: "Настройки PID-регулятора слетели. Без него мы не сможем продолжить полёт. Настрой регулятор!",
        coefficients: &OSCILLATOR,
        slider: None,
        labels: IoLabels {
            input: "время",
            output: "выход",
        },
    },
    SystemProfile {
        kind: SystemKind::Control,
        sub_kind: SubKind::Track,
        title: "Подбор траектории",
        prompt: "Подбери идеальную траекторию, чтобы хватило топлива и удалось эвакуировать как можно больше исследовательских станций!",
        coefficients: &[],
        slider: None,
        labels: IoLabels {
            input: "вход/выход",
            output: "очки",
        },
    },
];

/// All profiles, in sub-kind order.
pub fn profiles() -> &'static [SystemProfile] {
    &PROFILES
}

pub fn lookup(sub_kind: SubKind) -> Option<&'static SystemProfile> {
    PROFILES.iter().find(|p| p.sub_kind == sub_kind)
}

/// Like `lookup`, but as a request error.
pub fn profile(sub_kind: SubKind) -> Result<&'static SystemProfile, LabError> {
    lookup(sub_kind)
        .ok_or_else(|| LabError::Validation(format!("no profile registered for `{sub_kind}`")))
}

/// Expected coefficient count for a kind.
fn coefficient_count(kind: SystemKind) -> usize {
    match kind {
        SystemKind::Identification | SystemKind::Feedback => 3,
        SystemKind::Pid => 5,
        SystemKind::Control => 0,
    }
}

/// Check that every sub-kind has exactly one complete, consistent profile.
pub fn validate_profiles() -> Result<(), String> {
    let mut problems = Vec::new();

    for sub in SubKind::ALL {
        let matching: Vec<&SystemProfile> =
            PROFILES.iter().filter(|p| p.sub_kind == sub).collect();
        let p = match matching.as_slice() {
            [p] => *p,
            [] => {
                problems.push(format!("{sub}: missing profile"));
                continue;
            }
            _ => {
                problems.push(format!("{sub}: {} profiles registered", matching.len()));
                continue;
            }
        };

        if p.kind != sub.kind() {
            problems.push(format!("{sub}: registered under kind {}", p.kind));
        }
        if p.coefficients.len() != coefficient_count(p.kind) {
            problems.push(format!(
                "{sub}: expected {} coefficient ranges, found {}",
                coefficient_count(p.kind),
                p.coefficients.len()
            ));
        }
        for range in p.coefficients {
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                problems.push(format!(
                    "{sub}: invalid range for `{}`: [{}, {}]",
                    range.name, range.min, range.max
                ));
            }
        }
        if p.kind == SystemKind::Identification {
            match p.slider {
                Some(s) if s.min < s.max && s.step > 0.0 && (s.min..=s.max).contains(&s.initial) => {}
                Some(_) => problems.push(format!("{sub}: inconsistent slider bounds")),
                None => problems.push(format!("{sub}: identification profile needs a slider")),
            }
        }
        if p.labels.input.trim().is_empty() || p.labels.output.trim().is_empty() {
            problems.push(format!("{sub}: empty input/output labels"));
        }
        if p.title.trim().is_empty() || p.prompt.trim().is_empty() {
            problems.push(format!("{sub}: empty title or prompt"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_is_complete() {
        validate_profiles().unwrap();
    }

    #[test]
    fn every_kind_resolves_its_sub_kinds() {
        for kind in SystemKind::ALL {
            for sub in kind.sub_kinds() {
                let p = lookup(*sub).unwrap();
                assert_eq!(p.kind, kind);
                assert_eq!(SubKind::resolve(kind, sub.slug()), Some(*sub));
            }
        }
    }

    #[test]
    fn ternary_search_alias_resolves() {
        assert_eq!(
            SubKind::resolve(SystemKind::Feedback, "ternary_search"),
            Some(SubKind::Ternary)
        );
        assert_eq!(SubKind::resolve(SystemKind::Pid, "phone"), None);
    }

    #[test]
    fn lab_wording_is_russian() {
        let phone = lookup(SubKind::Phone).unwrap();
        assert_eq!(phone.labels.input, "время разговора");
        assert_eq!(phone.labels.output, "оставшийся уровень заряда");
        assert!(phone.prompt.contains("как быстро разрядится батарея"));
        assert_eq!(lookup(SubKind::Simple).unwrap().labels.output, "Расстояние до минимума");
        assert_eq!(lookup(SubKind::Ternary).unwrap().title, "Тернарный поиск");
    }
}
