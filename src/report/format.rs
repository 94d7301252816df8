//! Control lab report text.
//!
//! The report is a fixed document-markup template filled with the winning
//! attempt and the student's normalized name. Keeping the wording here means
//! the scoring code never touches text.

use std::fs;

use chrono::Datelike;
use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::domain::{Artifact, ControlScore};
use crate::error::LabError;
use crate::io::Scope;

/// Title-page fields that do not come from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// `вышестоящая`: the ministry above the institution.
    pub parent_organization: String,
    pub institution: String,
    /// `сокращенное`: the institution's abbreviation.
    pub institution_short: String,
    pub supervisor_title: String,
    pub supervisor: String,
    pub group: String,
    pub city: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            parent_organization: "Министерство высшего образования Российской Федерации".into(),
            institution: "Национальный исследовательский ядерный университет \"МИФИ\"".into(),
            institution_short: "НИЯУ МИФИ".into(),
            supervisor_title: "Старший преподаватель кафедры 22 «Кибернетика» НИЯУ МИФИ".into(),
            supervisor: "Р.В. Душкин".into(),
            group: "Б24-507".into(),
            city: "Москва".into(),
        }
    }
}

/// A stored report and its text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub text: String,
    #[serde(flatten)]
    pub artifact: Artifact,
}

/// `Surname Name [Patronymic ...]` → `N. P. Surname`.
pub fn normalize_name(raw: &str) -> Result<String, LabError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let Some((surname, given)) = tokens.split_first() else {
        return Err(invalid_name());
    };
    if given.is_empty() {
        return Err(invalid_name());
    }

    let mut out = String::new();
    for token in given {
        // split_whitespace never yields empty tokens
        if let Some(initial) = token.chars().next() {
            out.push(initial);
            out.push_str(". ");
        }
    }
    out.push_str(surname);
    Ok(out)
}

fn invalid_name() -> LabError {
    LabError::Validation("enter a full name: surname followed by at least a first name".into())
}

/// Fill the GOST 7.32 markup template for the winning control attempt.
///
/// The directive keywords (`документ`, `титульный-лист`, `рисунок`, ...) are
/// what the downstream document generator recognizes; keep them verbatim.
pub fn compose_report(score: &ControlScore, student: &str, config: &ReportConfig, year: i32) -> String {
    let w = &score.winner;
    let attempts = score.attempts.len();
    format!(
        "документ(ГОСТ-7-32-2017)
--

титульный-лист()
вышестоящая - {parent}
организация - {institution}
сокращенное - {short}

вид-документа - Лабораторная работа №22
тема - Изучение управления в кибернетике
руководитель - {supervisor_title}
руководитель-фио - {supervisor}
руководитель-темы - Студент группы {group}
руководитель-темы-фио - {student}
город - {city}
год - {year}
--

содержание()


+ Введение
++ Цель работы
Изучить понятие \"управления\" в кибернетике и подобрать оптимальный маршрут космического корабля.
++ Задачи
)) Изучить понятия, которые будут использованы в ходе лабораторной работы.
)) Найти наилучшие точки X1 и Х2 для построения траектории полета корабля.

+ Основные используемые термины
++ Обратная связь
*/Управление/* —  это совокупность менеджмента и организации в сфере кибернетики.
рисунок(управление, 15) Управление


+ Ход работы
++ Выбор изучаемой системы
Для выполнения лабораторной работы была использована специальная платформа.

рисунок(Скрин) Интерфейс лабораторной
рисунок(интерфейс, 18) Интерфейс выбранной системы

++ Ввод входных данных
В интерфейсе платформы был доступен ввод двух значений. Входного и выходного положения корабля. Задачей было потратить наименьшее количество топлива и посетить наибольшее количество синих зон.

рисунок(измерения, 18) Траектория полета

++  Получение результатов
Наилучший результат полета, после использования {attempts} доступных попыток, составил {score} очков. Координаты входа и выхода - {entry} {exit} соответственно. В итоге было посещено {stations} исследовательских станций, а запас топлива после полета составил {fuel} единиц.


рисунок(результат, 18) Итог лабораторной работы

+ Заключение
Вывод: в ходе лабораторной работы было изучено понятие \"управление\" в области кибернетики. После использования {attempts} доступных попыток наилучший результат составил {score} очков.
",
        parent = config.parent_organization,
        institution = config.institution,
        short = config.institution_short,
        supervisor_title = config.supervisor_title,
        supervisor = config.supervisor,
        group = config.group,
        city = config.city,
        score = w.score,
        entry = w.entry,
        exit = w.exit,
        stations = w.stations,
        fuel = w.fuel,
    )
}

/// Compose the report and store it under a fresh number in `scope`.
pub fn write_report<R: Rng + ?Sized>(
    scope: &mut Scope<'_>,
    rng: &mut R,
    score: &ControlScore,
    student: &str,
    config: &ReportConfig,
) -> Result<Report, LabError> {
    let year = chrono::Local::now().year();
    let text = compose_report(score, student, config, year);
    let artifact = scope.allocate(rng)?;
    fs::write(&artifact.path, &text)?;
    info!(id = %artifact.id, winner = score.winner_index, "stored control report");
    Ok(Report { text, artifact })
}
