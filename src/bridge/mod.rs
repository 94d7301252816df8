//! Route optimization bridge.
//!
//! The optimizer is an external executable. It reads a distance matrix from a
//! fixed JSON file and prints its answer as JSON on stdout:
//!
//! ```text
//! {"path": [0, 2, 1], "cost": 17.5, ...}
//! ```
//!
//! `RouteSolver` is the seam the HTTP layer depends on; `ProcessSolver` is the
//! production implementation. Because the input file is shared, invocations
//! are serialized, and every run is bounded by a wall-clock timeout after
//! which the child is killed.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Default wall-clock limit for one optimizer run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Square distance matrix.
pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("optimizer executable not found at {0}")]
    MissingExecutable(PathBuf),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("optimizer produced no output")]
    EmptyOutput,

    #[error("optimizer output is not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("optimizer exited with status {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("optimizer did not finish within {0:?}")]
    Timeout(Duration),

    #[error("optimizer I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Optimizer answer. Missing fields default to an empty path and zero cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub path: Vec<Value>,
    pub cost: f64,
    pub full_result: Value,
}

#[derive(Deserialize)]
struct RawSolution {
    #[serde(default)]
    path: Vec<Value>,
    #[serde(default)]
    cost: f64,
}

impl Solution {
    /// Parse the optimizer's stdout.
    pub fn from_stdout(stdout: &str) -> Result<Self, BridgeError> {
        let text = stdout.trim();
        if text.is_empty() {
            return Err(BridgeError::EmptyOutput);
        }
        let full_result: Value =
            serde_json::from_str(text).map_err(|e| BridgeError::MalformedOutput(e.to_string()))?;
        let raw: RawSolution = serde_json::from_value(full_result.clone())
            .map_err(|e| BridgeError::MalformedOutput(e.to_string()))?;
        Ok(Self {
            path: raw.path,
            cost: raw.cost,
            full_result,
        })
    }
}

/// Reject empty and non-square matrices.
pub fn validate_matrix(matrix: &Matrix) -> Result<(), BridgeError> {
    let n = matrix.len();
    if n == 0 {
        return Err(BridgeError::InvalidRequest("matrix is empty".into()));
    }
    if let Some((i, row)) = matrix.iter().enumerate().find(|(_, row)| row.len() != n) {
        return Err(BridgeError::InvalidRequest(format!(
            "matrix must be square: row {i} has {} entries, expected {n}",
            row.len()
        )));
    }
    Ok(())
}

#[async_trait]
pub trait RouteSolver: Send + Sync {
    async fn solve(&self, matrix: Matrix) -> Result<Solution, BridgeError>;
}

/// Runs the optimizer as a child process.
#[derive(Debug)]
pub struct ProcessSolver {
    executable: PathBuf,
    args: Vec<String>,
    input_path: PathBuf,
    timeout: Duration,
    lock: Mutex<()>,
}

impl ProcessSolver {
    pub fn new(executable: impl Into<PathBuf>, input_path: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            input_path: input_path.into(),
            timeout: DEFAULT_TIMEOUT,
            lock: Mutex::new(()),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ProcessSolver {
    /// Write the shared input file and run the executable, one run at a time.
    async fn run_exclusive(&self, matrix: &Matrix) -> Result<Output, BridgeError> {
        let _guard = self.lock.lock().await;

        let body = serde_json::to_vec_pretty(matrix)
            .map_err(|e| BridgeError::InvalidRequest(e.to_string()))?;
        if let Some(parent) = self.input_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.input_path, body).await?;

        let child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child.wait_with_output().await?)
    }
}

#[async_trait]
impl RouteSolver for ProcessSolver {
    async fn solve(&self, matrix: Matrix) -> Result<Solution, BridgeError> {
        validate_matrix(&matrix)?;
        if !tokio::fs::try_exists(&self.executable).await? {
            return Err(BridgeError::MissingExecutable(self.executable.clone()));
        }

        // The deadline covers waiting for earlier runs as well as this one;
        // dropping the future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, self.run_exclusive(&matrix)).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(executable = %self.executable.display(), timeout = ?self.timeout, "optimizer timed out");
                return Err(BridgeError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            return Err(BridgeError::NonZeroExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let solution = Solution::from_stdout(&String::from_utf8_lossy(&output.stdout))?;
        info!(n = matrix.len(), cost = solution.cost, "optimizer finished");
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("solver.sh");
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn solver(dir: &Path, body: &str) -> ProcessSolver {
        ProcessSolver::new("/bin/sh", dir.join("komi/matrix_input.json"))
            .with_args(vec![script(dir, body)])
            .with_timeout(Duration::from_secs(10))
    }

    fn square() -> Matrix {
        vec![vec![0.0, 1.0], vec![1.0, 0.0]]
    }

    #[test]
    fn stdout_defaults_missing_fields() {
        let s = Solution::from_stdout(r#"{"other": 1}"#).unwrap();
        assert!(s.path.is_empty());
        assert_eq!(s.cost, 0.0);
        assert_eq!(s.full_result["other"], 1);

        assert!(matches!(Solution::from_stdout("  \n"), Err(BridgeError::EmptyOutput)));
        assert!(matches!(
            Solution::from_stdout("not json"),
            Err(BridgeError::MalformedOutput(_))
        ));
    }

    #[test]
    fn matrix_must_be_square() {
        assert!(validate_matrix(&square()).is_ok());
        assert!(matches!(validate_matrix(&Vec::new()), Err(BridgeError::InvalidRequest(_))));
        assert!(matches!(
            validate_matrix(&vec![vec![0.0, 1.0], vec![1.0]]),
            Err(BridgeError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn writes_matrix_and_parses_answer() {
        let tmp = tempfile::tempdir().unwrap();
        let s = solver(tmp.path(), "echo '{\"path\": [0, 1], \"cost\": 2.5}'\n");
        let solution = s.solve(square()).await.unwrap();
        assert_eq!(solution.path.len(), 2);
        assert_eq!(solution.cost, 2.5);

        let written = std::fs::read_to_string(tmp.path().join("komi/matrix_input.json")).unwrap();
        let back: Matrix = serde_json::from_str(&written).unwrap();
        assert_eq!(back, square());
    }

    #[tokio::test]
    async fn sleeping_solver_times_out() {
        let tmp = tempfile::tempdir().unwrap();
        let s = solver(tmp.path(), "sleep 5\n").with_timeout(Duration::from_millis(200));
        let err = s.solve(square()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
    }

    #[tokio::test]
    async fn queued_run_times_out_while_waiting_for_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let s = solver(tmp.path(), "echo '{\"cost\": 1}'\n").with_timeout(Duration::from_millis(200));
        let held = s.lock.lock().await;
        let err = s.solve(square()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Timeout(_)));
        assert!(!tmp.path().join("komi/matrix_input.json").exists());

        drop(held);
        assert_eq!(s.solve(square()).await.unwrap().cost, 1.0);
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let tmp = tempfile::tempdir().unwrap();

        let s = solver(tmp.path(), "echo boom >&2\nexit 3\n");
        match s.solve(square()).await.unwrap_err() {
            BridgeError::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let s = solver(tmp.path(), "true\n");
        assert!(matches!(s.solve(square()).await, Err(BridgeError::EmptyOutput)));

        let s = ProcessSolver::new(tmp.path().join("missing"), tmp.path().join("in.json"));
        assert!(matches!(
            s.solve(square()).await,
            Err(BridgeError::MissingExecutable(_))
        ));
    }
}
