//! Trial table decoding.
//!
//! Clients submit their experiment history in one of two shapes:
//!
//! 1. **Pair form** (identification, feedback): a JSON string holding exactly two
//!    newline-separated rows, `inputs` then `outputs`.
//! 2. **Delimited blob** (PID, control): `[row\nrow\n...]` where `\n` is the
//!    literal two-character escape, not a newline.
//!
//! In both shapes the first cell of every row is a label and is dropped. Cells
//! are split with the `csv` crate and trimmed.
//!
//! Design goals:
//! - **Strict grammar**: a malformed cell rejects the whole table with its
//!   row/column position; nothing is defaulted
//! - **Empty is not malformed**: a table with no observations is `EmptyInput`
//! - **No fitting logic here**

use crate::domain::{ControlAttempt, PidAttempt, PidAttempts, TrialPairs};
use crate::error::LabError;

/// Row separator inside a delimited blob (backslash followed by `n`).
pub const ROW_SEPARATOR: &str = "\\n";

/// Settling-time cell values meaning "did not settle".
pub const TOO_LONG_SENTINELS: [&str; 2] = ["too long", "слишком долго"];

/// Settling time substituted for a "too long" cell.
pub const TOO_LONG_SECONDS: f64 = 8.0;

/// Rows of the regulator table after the header: Kp, Ki, Kd, settling time.
const PID_ROWS: usize = 5;

/// Rows of the control table: route, entry, exit, stations, fuel, score.
const CONTROL_ROWS: usize = 6;

/// A delimited blob with the label column removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedTable {
    pub rows: Vec<Vec<String>>,
}

impl DelimitedTable {
    /// Ensure every row has the same number of cells and return that width.
    fn uniform_width(&self) -> Result<usize, LabError> {
        let width = self.rows.first().map(Vec::len).unwrap_or(0);
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(LabError::parse(
                    format!("row {}", i + 1),
                    format!("expected {width} attempt columns, found {}", row.len()),
                ));
            }
        }
        Ok(width)
    }
}

/// Decode the pair form used by the identification and feedback labs.
pub fn parse_pairs(raw: &str) -> Result<TrialPairs, LabError> {
    if raw.trim().is_empty() {
        return Err(LabError::EmptyInput);
    }
    let text: String = serde_json::from_str(raw.trim())
        .map_err(|e| LabError::parse("table_data", format!("expected a JSON string: {e}")))?;

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(LabError::EmptyInput);
    }
    if lines.len() != 2 {
        return Err(LabError::parse(
            "table_data",
            format!("expected exactly 2 rows (inputs, outputs), found {}", lines.len()),
        ));
    }

    let x = parse_numeric_row(&split_cells(lines[0], 1)?, 1)?;
    let y = parse_numeric_row(&split_cells(lines[1], 2)?, 2)?;

    if x.len() != y.len() {
        return Err(LabError::parse(
            "table_data",
            format!("{} inputs but {} outputs", x.len(), y.len()),
        ));
    }
    if x.is_empty() {
        return Err(LabError::EmptyInput);
    }

    Ok(TrialPairs { x, y })
}

/// Decode a `[row\nrow...]` blob, dropping each row's label cell.
pub fn parse_delimited(raw: &str) -> Result<DelimitedTable, LabError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LabError::EmptyInput);
    }
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| LabError::parse("table_data", "expected a table wrapped in `[` and `]`"))?;

    if inner.trim().is_empty() {
        return Err(LabError::EmptyInput);
    }

    let rows = inner
        .split(ROW_SEPARATOR)
        .enumerate()
        .map(|(i, line)| {
            let cells = split_cells(line, i + 1)?;
            if cells.is_empty() {
                return Err(LabError::parse(format!("row {}", i + 1), "row has no label cell"));
            }
            Ok(cells[1..].to_vec())
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DelimitedTable { rows })
}

/// Decode the regulator table: header row, then Kp / Ki / Kd / settling time.
///
/// Each column is one attempt; a "too long" settling time becomes
/// [`TOO_LONG_SECONDS`].
pub fn parse_pid_attempts(table: &DelimitedTable) -> Result<PidAttempts, LabError> {
    if table.rows.len() != PID_ROWS {
        return Err(LabError::parse(
            "table_data",
            format!(
                "expected {PID_ROWS} rows (header, Kp, Ki, Kd, time), found {}",
                table.rows.len()
            ),
        ));
    }
    let width = table.uniform_width()?;
    if width == 0 {
        return Err(LabError::EmptyInput);
    }

    let gain = |row: usize, col: usize| parse_number(&table.rows[row][col], row + 1, col + 2);
    let attempts = (0..width)
        .map(|col| {
            Ok(PidAttempt {
                kp: gain(1, col)?,
                ki: gain(2, col)?,
                kd: gain(3, col)?,
                settling_time: parse_settling_time(&table.rows[4][col], 5, col + 2)?,
            })
        })
        .collect::<Result<Vec<_>, LabError>>()?;

    Ok(PidAttempts { attempts })
}

/// Decode the control table: one column per attempt.
pub fn parse_control_attempts(table: &DelimitedTable) -> Result<Vec<ControlAttempt>, LabError> {
    if table.rows.len() != CONTROL_ROWS {
        return Err(LabError::parse(
            "table_data",
            format!(
                "expected {CONTROL_ROWS} rows (route, entry, exit, stations, fuel, score), found {}",
                table.rows.len()
            ),
        ));
    }
    let width = table.uniform_width()?;
    if width == 0 {
        return Err(LabError::EmptyInput);
    }

    let int = |row: usize, col: usize| parse_integer(&table.rows[row][col], row + 1, col + 2);
    (0..width)
        .map(|col| {
            Ok(ControlAttempt {
                route: table.rows[0][col].clone(),
                entry: int(1, col)?,
                exit: int(2, col)?,
                stations: int(3, col)?,
                fuel: int(4, col)?,
                score: int(5, col)?,
            })
        })
        .collect()
}

/// Parse a scalar form field, accepting `,` as the decimal separator.
pub fn parse_scalar(name: &str, raw: Option<&str>) -> Result<f64, LabError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LabError::parse(name, "missing value"))?;
    let normalized = normalize_decimal(raw);
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| LabError::parse(name, format!("`{raw}` is not a number")))
}

fn normalize_decimal(s: &str) -> String {
    s.replace(',', ".")
}

fn split_cells(line: &str, row: usize) -> Result<Vec<String>, LabError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
        Some(Err(e)) => Err(LabError::parse(format!("row {row}"), format!("CSV parse error: {e}"))),
        None => Ok(Vec::new()),
    }
}

/// Drop the label cell and parse the rest as numbers.
fn parse_numeric_row(cells: &[String], row: usize) -> Result<Vec<f64>, LabError> {
    cells
        .iter()
        .enumerate()
        .skip(1)
        .map(|(col, cell)| parse_number(cell, row, col + 1))
        .collect()
}

fn parse_number(cell: &str, row: usize, col: usize) -> Result<f64, LabError> {
    cell.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| cell_error(cell, row, col, "a number"))
}

fn parse_integer(cell: &str, row: usize, col: usize) -> Result<i64, LabError> {
    cell.parse::<i64>()
        .map_err(|_| cell_error(cell, row, col, "an integer"))
}

fn parse_settling_time(cell: &str, row: usize, col: usize) -> Result<f64, LabError> {
    let lowered = cell.trim().to_lowercase();
    if TOO_LONG_SENTINELS.contains(&lowered.as_str()) {
        return Ok(TOO_LONG_SECONDS);
    }
    parse_number(&normalize_decimal(cell), row, col)
}

fn cell_error(cell: &str, row: usize, col: usize, expected: &str) -> LabError {
    LabError::parse(
        format!("row {row}, column {col}"),
        format!("`{cell}` is not {expected}"),
    )
}
