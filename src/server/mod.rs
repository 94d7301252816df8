//! HTTP surface.
//!
//! | route                        | purpose                                   |
//! |------------------------------|-------------------------------------------|
//! | `GET  /health`               | liveness                                  |
//! | `GET  /profiles`             | the profile table                         |
//! | `GET  /{kind}/{sub_kind}/`   | SETUP: fresh ground truth for one session |
//! | `POST /{kind}/{sub_kind}/`   | RESULT: evaluate the submitted trials     |
//! | `POST /komi/`                | route optimization bridge                 |
//! | `GET  /graphics/...`         | rendered charts                           |
//! | `GET  /works/...`            | control reports                           |
//!
//! Lab errors are answered with a short plain-text diagnostic; bridge errors
//! with `{"error": ...}`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::app::pipeline::{self, LabContext};
use crate::bridge::{BridgeError, Matrix, ProcessSolver, RouteSolver, Solution};
use crate::domain::{SubKind, SystemKind, SystemProfile, profiles};
use crate::error::{AppError, LabError};
use crate::io::ArtifactStore;
use crate::report::{LabResult, ReportConfig, SetupView};

pub const GRAPHICS_PREFIX: &str = "/graphics";
pub const WORKS_PREFIX: &str = "/works";

/// Everything needed to start the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub graphics_root: PathBuf,
    pub works_root: PathBuf,
    pub artifact_ttl: Duration,
    pub report: ReportConfig,
    pub bridge_executable: PathBuf,
    pub bridge_args: Vec<String>,
    pub bridge_input: PathBuf,
    pub bridge_timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub charts: Arc<ArtifactStore>,
    pub works: Arc<ArtifactStore>,
    pub report: Arc<ReportConfig>,
    pub solver: Arc<dyn RouteSolver>,
}

impl AppState {
    pub fn new(config: &ServerConfig, solver: Arc<dyn RouteSolver>) -> Self {
        Self {
            charts: Arc::new(ArtifactStore::charts(
                &config.graphics_root,
                GRAPHICS_PREFIX,
                config.artifact_ttl,
            )),
            works: Arc::new(ArtifactStore::reports(
                &config.works_root,
                WORKS_PREFIX,
                config.artifact_ttl,
            )),
            report: Arc::new(config.report.clone()),
            solver,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let solver = ProcessSolver::new(&config.bridge_executable, &config.bridge_input)
            .with_args(config.bridge_args.clone())
            .with_timeout(config.bridge_timeout);
        Self::new(config, Arc::new(solver))
    }
}

pub fn build_router(state: AppState) -> Router {
    let graphics = ServeDir::new(state.charts.root());
    let works = ServeDir::new(state.works.root());

    Router::new()
        .route("/health", get(health))
        .route("/profiles", get(list_profiles))
        .route("/komi/", post(komi))
        .route("/:kind/:sub_kind/", get(lab_setup).post(lab_result))
        .route("/:kind/:sub_kind", get(lab_setup).post(lab_result))
        .nest_service(GRAPHICS_PREFIX, graphics)
        .nest_service(WORKS_PREFIX, works)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.listen` and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<(), AppError> {
    let app = build_router(AppState::from_config(&config));
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|e| AppError::new(2, format!("Failed to bind {}: {e}", config.listen)))?;

    info!(
        listen = %config.listen,
        graphics = %config.graphics_root.display(),
        works = %config.works_root.display(),
        bridge = %config.bridge_executable.display(),
        "labkib listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::new(1, format!("Server error: {e}")))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Lab(#[from] LabError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Lab(err) => match err {
                LabError::Parse { .. } => StatusCode::BAD_REQUEST,
                LabError::EmptyInput | LabError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                LabError::Generation(_) | LabError::Render(_) | LabError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Bridge(err) => match err {
                BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                BridgeError::MalformedOutput(_) => StatusCode::BAD_GATEWAY,
                BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                BridgeError::MissingExecutable(_)
                | BridgeError::EmptyOutput
                | BridgeError::NonZeroExit { .. }
                | BridgeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        match self {
            ApiError::Bridge(err) => {
                (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "labkib",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_profiles() -> Json<&'static [SystemProfile]> {
    Json(profiles())
}

fn resolve(kind: &str, sub_kind: &str) -> Result<SubKind, ApiError> {
    let kind = SystemKind::from_slug(kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown lab kind `{kind}`")))?;
    SubKind::resolve(kind, sub_kind)
        .ok_or_else(|| ApiError::NotFound(format!("unknown {kind} lab `{sub_kind}`")))
}

async fn lab_setup(Path((kind, sub_kind)): Path<(String, String)>) -> Result<Json<SetupView>, ApiError> {
    let sub_kind = resolve(&kind, &sub_kind)?;
    let view = pipeline::setup(sub_kind, &mut rand::thread_rng())?;
    Ok(Json(view))
}

async fn lab_result(
    State(state): State<AppState>,
    Path((kind, sub_kind)): Path<(String, String)>,
    Form(form): Form<pipeline::Form>,
) -> Result<Json<LabResult>, ApiError> {
    let sub_kind = resolve(&kind, &sub_kind)?;

    let result = tokio::task::spawn_blocking(move || {
        let ctx = LabContext {
            charts: &state.charts,
            works: &state.works,
            report: &state.report,
        };
        pipeline::run_lab(sub_kind, &form, &ctx)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("lab worker failed: {e}")))??;

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct KomiRequest {
    matrix: Matrix,
}

async fn komi(State(state): State<AppState>, body: Bytes) -> Result<Json<Solution>, ApiError> {
    let request: KomiRequest = serde_json::from_slice(&body)
        .map_err(|e| BridgeError::InvalidRequest(format!("malformed request body: {e}")))?;
    let solution = state.solver.solve(request.matrix).await?;
    Ok(Json(solution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    /// Echoes the matrix size as the cost, or fails on demand.
    struct StubSolver {
        fail_with_timeout: bool,
    }

    #[async_trait]
    impl RouteSolver for StubSolver {
        async fn solve(&self, matrix: Matrix) -> Result<Solution, BridgeError> {
            crate::bridge::validate_matrix(&matrix)?;
            if self.fail_with_timeout {
                return Err(BridgeError::Timeout(Duration::from_secs(30)));
            }
            Ok(Solution {
                path: (0..matrix.len()).map(Value::from).collect(),
                cost: matrix.len() as f64,
                full_result: serde_json::json!({ "ok": true }),
            })
        }
    }

    fn app(tmp: &std::path::Path, fail_with_timeout: bool) -> Router {
        let config = ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            graphics_root: tmp.join("graphics"),
            works_root: tmp.join("works"),
            artifact_ttl: Duration::from_secs(3600),
            report: ReportConfig::default(),
            bridge_executable: tmp.join("komi"),
            bridge_args: Vec::new(),
            bridge_input: tmp.join("matrix_input.json"),
            bridge_timeout: Duration::from_secs(1),
        };
        build_router(AppState::new(&config, Arc::new(StubSolver { fail_with_timeout })))
    }

    /// Minimal `application/x-www-form-urlencoded` encoder.
    fn encode(fields: &[(&str, &str)]) -> String {
        fields
            .iter()
            .map(|(k, v)| format!("{}={}", percent(k), percent(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn percent(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{b:02X}"),
            })
            .collect()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(encode(fields)))
            .unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_profiles() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, body) = send(app(tmp.path(), false), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");

        let (status, body) = send(app(tmp.path(), false), get("/profiles")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.as_array().unwrap().len(), SubKind::ALL.len());
    }

    #[tokio::test]
    async fn setup_returns_ground_truth() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, body) = send(app(tmp.path(), false), get("/feedback/ternary_search/")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["sub_kind"], "ternary");
        assert_eq!(json["action"], "/feedback/ternary/");
        let a = json["ground_truth"]["a"].as_f64().unwrap();
        assert!((1.0..=7.0).contains(&a));

        let (status, _) = send(app(tmp.path(), false), get("/feedback/phone/")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn identification_post_renders_chart_served_from_graphics() {
        let tmp = tempfile::tempdir().unwrap();
        let table = serde_json::to_string("Input,0,10,20\nOutput,5,25,45").unwrap();
        let (status, body) = send(
            app(tmp.path(), false),
            post_form("/identification/plant/", &[("table_data", &table)]),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["kind"], "identification");
        assert_eq!(json["fit"]["k"], 2.0);
        assert_eq!(json["fit"]["b"], 5.0);
        let url = json["charts"][0]["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/graphics/"));

        let (status, bytes) = send(app(tmp.path(), false), get(&url)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!bytes.is_empty());
    }

    #[tokio::test]
    async fn lab_errors_map_to_plain_text_statuses() {
        let tmp = tempfile::tempdir().unwrap();

        let bad_cell = serde_json::to_string("Input,1,x\nOutput,1,2").unwrap();
        let (status, body) = send(
            app(tmp.path(), false),
            post_form("/identification/car/", &[("table_data", &bad_cell)]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("row 1, column 3"));

        let empty = serde_json::to_string("Input\nOutput").unwrap();
        let (status, body) = send(
            app(tmp.path(), false),
            post_form("/identification/car/", &[("table_data", &empty)]),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, b"no data");

        let table = "[route,A\\nx1,1\\nx2,2\\nsv,3\\nfuel,4\\nscore,5]";
        let (status, _) = send(
            app(tmp.path(), false),
            post_form("/control/track/", &[("table_data", table), ("text", "Иванов")]),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn blank_or_missing_table_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let cases: [(&str, &[(&str, &str)]); 4] = [
            ("/identification/phone/", &[("table_data", "")]),
            ("/identification/phone/", &[]),
            ("/control/track/", &[("table_data", ""), ("text", "Иванов Иван")]),
            ("/control/track/", &[("text", "Иванов Иван")]),
        ];
        for (uri, fields) in cases {
            let (status, body) = send(app(tmp.path(), false), post_form(uri, fields)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri} {fields:?}");
            assert_eq!(body, b"no data");
        }
    }

    #[tokio::test]
    async fn control_post_links_report() {
        let tmp = tempfile::tempdir().unwrap();
        let table = "[route,A,B,C,D,E\\nx1,1,2,3,4,5\\nx2,5,4,3,2,1\\nsv,1,2,3,4,0\\nfuel,9,8,7,6,5\\nscore,10,50,20,50,5]";
        let (status, body) = send(
            app(tmp.path(), false),
            post_form("/control/track/", &[("table_data", table), ("text", "Иванов Иван Иванович")]),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["student"], "И. И. Иванов");
        assert_eq!(json["score"]["winner_index"], 3);

        let url = json["report"]["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/works/"));
        let (status, bytes) = send(app(tmp.path(), false), get(&url)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(bytes).unwrap(), json["report"]["text"].as_str().unwrap());
    }

    #[tokio::test]
    async fn komi_contract() {
        let tmp = tempfile::tempdir().unwrap();

        let (status, body) = send(
            app(tmp.path(), false),
            post_json("/komi/", r#"{"matrix": [[0, 1], [1, 0]]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["cost"], 2.0);
        assert_eq!(json["path"], serde_json::json!([0, 1]));
        assert_eq!(json["full_result"]["ok"], true);

        let (status, body) = send(app(tmp.path(), false), post_json("/komi/", "{nope")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());

        let (status, _) = send(
            app(tmp.path(), false),
            post_json("/komi/", r#"{"matrix": [[0, 1]]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            app(tmp.path(), true),
            post_json("/komi/", r#"{"matrix": [[0]]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
