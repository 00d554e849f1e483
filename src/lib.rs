//! Core library for vetgate.  This module wires together the webhook
//! surface, the detached analysis pipeline and the shared application
//! state.  Handlers acknowledge quickly; all heavy work runs in spawned
//! tasks that own their state outright and never borrow from a request.

mod config;

pub mod analyzer;
pub mod error;
pub mod event;
pub mod fetch;
pub mod llm;
pub mod pipeline;
pub mod publish;
pub mod rules;
pub mod signature;

pub use config::{AppConfig, LlmConfig, SourceConfig};

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

use crate::analyzer::{AnalysisRequest, Analyzer};
use crate::error::AnalysisError;
use crate::event::Decision;
use crate::fetch::{DiffFetcher, HttpDiffFetcher};
use crate::llm::{Generator, HttpGenerator};
use crate::pipeline::Pipeline;
use crate::publish::{CommentSink, HttpCommentSink};
use crate::rules::{detect, pii, redact, secrets, Finding};

/// Webhook event-type header.
pub const EVENT_TYPE_HEADER: &str = "x-github-event";

#[derive(Debug, Serialize, Clone)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of a 202 acknowledgment.  The tracking id correlates the spawned
/// pipeline's log lines with this response; no lookup endpoint exists.
#[derive(Debug, Serialize, Clone)]
pub struct AcceptedResponse {
    pub message: String,
    pub tracking_id: String,
    pub pr_number: u64,
    pub action: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request body for the direct analysis endpoint.
#[derive(Debug, Deserialize)]
pub struct AnalyzeApiRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Response of the direct analysis endpoint: the verdict plus what the scan
/// found (categories and line numbers only, never the matched text).
#[derive(Debug, Serialize)]
pub struct AnalyzeApiResponse {
    #[serde(flatten)]
    pub result: analyzer::AnalysisResult,
    pub findings: Vec<Finding>,
    pub redacted: bool,
}

/// Internal application state shared across handlers.  Collaborators sit
/// behind trait objects so tests can substitute in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub webhook_secret: Option<String>,
    /// Maximum accepted raw request body size in bytes (None => unlimited)
    pub max_request_bytes: Option<usize>,
    pub analyzer: Arc<Analyzer>,
    pub pipeline: Arc<Pipeline>,
    // Metrics counters
    pub metric_webhooks_total: Arc<AtomicU64>,
    pub metric_dispatched_total: Arc<AtomicU64>,
    pub metric_pipeline_completed_total: Arc<AtomicU64>,
    pub metric_pipeline_failures_total: Arc<AtomicU64>,
    pub metric_analyze_requests_total: Arc<AtomicU64>,
    tracking_counter: Arc<AtomicU64>,
    pub process_start_instant: Instant,
}

impl AppState {
    /// Assemble state from explicit collaborators.  Production wiring goes
    /// through `build_state_from_env`; tests inject doubles here.
    pub fn new(
        config: &AppConfig,
        fetcher: Arc<dyn DiffFetcher>,
        generator: Arc<dyn Generator>,
        sink: Arc<dyn CommentSink>,
    ) -> Self {
        let analyzer = Arc::new(Analyzer::new(config.prompts.clone(), generator));
        let pipeline = Arc::new(Pipeline::new(fetcher, analyzer.clone(), sink));
        Self {
            webhook_secret: config.webhook_secret.clone(),
            max_request_bytes: config.max_request_bytes,
            analyzer,
            pipeline,
            metric_webhooks_total: Arc::new(AtomicU64::new(0)),
            metric_dispatched_total: Arc::new(AtomicU64::new(0)),
            metric_pipeline_completed_total: Arc::new(AtomicU64::new(0)),
            metric_pipeline_failures_total: Arc::new(AtomicU64::new(0)),
            metric_analyze_requests_total: Arc::new(AtomicU64::new(0)),
            tracking_counter: Arc::new(AtomicU64::new(0)),
            process_start_instant: Instant::now(),
        }
    }

    /// Unique-enough correlation id for one dispatched event: pull request
    /// number, wall-clock millis and a process-local sequence number.
    fn next_tracking_id(&self, pr_number: u64) -> String {
        let seq = self.tracking_counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "analysis-{}-{}-{}",
            pr_number,
            chrono::Utc::now().timestamp_millis(),
            seq
        )
    }
}

/// Build state from environment variables (see `AppConfig::from_env`).
pub fn build_state_from_env() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;
    let fetcher = Arc::new(HttpDiffFetcher::new(&config.source));
    let generator = Arc::new(HttpGenerator::new(&config.llm));
    let sink = Arc::new(HttpCommentSink::new(&config.source));
    Ok(AppState::new(&config, fetcher, generator, sink))
}

/// Build the Axum router and attach handlers.  The router holds a copy
/// of the `AppState` for each invocation.
pub fn app(state: AppState) -> Router {
    let max_request_bytes = state.max_request_bytes;

    let router = Router::new()
        .route("/webhook/github", post(webhook_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/healthz", get(healthz_handler))
        .route("/metrics", get(metrics_handler));

    let router = if let Some(limit) = max_request_bytes {
        router.layer(DefaultBodyLimit::max(limit))
    } else {
        router
    };

    router.with_state(state)
}

fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Handler for `/webhook/github`.  Authenticates the raw body first, then
/// classifies the delivery.  Accepted events are dispatched to a spawned
/// pipeline task and acknowledged with 202 immediately; the response never
/// waits on fetching, analysis or publishing.
async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    state.metric_webhooks_total.fetch_add(1, Ordering::Relaxed);

    let signature = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(err) = signature::validate(&body, signature, state.webhook_secret.as_deref()) {
        tracing::warn!(error = %err, "rejected webhook delivery");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response();
    }

    let Some(event_type) = headers.get(EVENT_TYPE_HEADER).and_then(|v| v.to_str().ok()) else {
        return bad_request("missing X-GitHub-Event header");
    };

    let decision = match event::classify(event_type, &body) {
        Ok(decision) => decision,
        Err(err) => {
            tracing::warn!(event_type, error = %err, "unparseable webhook payload");
            return bad_request(format!("invalid payload: {err}"));
        }
    };

    match decision {
        Decision::Handshake => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "pong".to_string(),
            }),
        )
            .into_response(),
        Decision::Ignore(reason) => {
            tracing::info!(event_type, %reason, "ignoring webhook delivery");
            (
                StatusCode::OK,
                Json(MessageResponse {
                    message: format!("Ignoring {reason}"),
                }),
            )
                .into_response()
        }
        Decision::Process(pr_event) => {
            let pr_number = pr_event.pull_request.number;
            let action = pr_event.action.clone();
            let tracking_id = state.next_tracking_id(pr_number);
            state.metric_dispatched_total.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                %tracking_id,
                pr = pr_number,
                %action,
                repo = %pr_event.repository.full_name,
                "dispatching pull request for analysis"
            );

            // The spawned task owns the event and the shared state outright;
            // it outlives this request and its failure can only be observed
            // through logs and counters.
            let task_state = state.clone();
            let task_tracking_id = tracking_id.clone();
            tokio::spawn(async move {
                match task_state
                    .pipeline
                    .process(&pr_event, &task_tracking_id)
                    .await
                {
                    Ok(()) => {
                        task_state
                            .metric_pipeline_completed_total
                            .fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        task_state
                            .metric_pipeline_failures_total
                            .fetch_add(1, Ordering::Relaxed);
                        tracing::error!(
                            tracking_id = %task_tracking_id,
                            pr = pr_event.pull_request.number,
                            error = %err,
                            "analysis pipeline failed"
                        );
                    }
                }
            });

            (
                StatusCode::ACCEPTED,
                Json(AcceptedResponse {
                    message: "Analysis started".to_string(),
                    tracking_id,
                    pr_number,
                    action,
                }),
            )
                .into_response()
        }
    }
}

/// Handler for `/api/analyze`.  Synchronous counterpart of the webhook
/// pipeline for arbitrary text: scan, redact, analyze, return the verdict
/// in the response body instead of publishing it anywhere.
async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeApiRequest>, JsonRejection>,
) -> axum::response::Response {
    state
        .metric_analyze_requests_total
        .fetch_add(1, Ordering::Relaxed);

    let payload = match payload {
        Ok(Json(inner)) => inner,
        Err(rejection) => return bad_request(format!("invalid request body: {rejection}")),
    };
    if payload.content.trim().is_empty() {
        return bad_request("content must be non-empty");
    }
    if payload.file_path.trim().is_empty() {
        return bad_request("file_path must be non-empty");
    }

    let mut findings = detect(&payload.content, &secrets::SECRET_RULES);
    findings.extend(detect(&payload.content, &pii::PII_RULES));
    let redacted = redact(
        &redact(&payload.content, &secrets::SECRET_RULES),
        &pii::PII_RULES,
    );
    let was_redacted = redacted != payload.content;
    let request = AnalysisRequest {
        content: redacted,
        file_path: payload.file_path,
        language: payload.language,
    };

    match state.analyzer.analyze(&request).await {
        Ok(result) => (
            StatusCode::OK,
            Json(AnalyzeApiResponse {
                result,
                findings,
                redacted: was_redacted,
            }),
        )
            .into_response(),
        Err(err) => {
            let terminal = matches!(err, AnalysisError::MalformedOutput { .. });
            tracing::error!(file_path = %request.file_path, terminal, error = %err, "direct analysis failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Simple health endpoint for container readiness / liveness checks.
async fn healthz_handler() -> axum::response::Response {
    let json = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(json)).into_response()
}

/// Prometheus-style metrics exposition. Text format with simple counters.
async fn metrics_handler(State(state): State<AppState>) -> axum::response::Response {
    use std::fmt::Write as _;
    let mut buf = String::new();
    let counters = [
        (
            "vetgate_webhooks_total",
            "Total webhook deliveries received",
            state.metric_webhooks_total.load(Ordering::Relaxed),
        ),
        (
            "vetgate_dispatched_total",
            "Pull request events dispatched for analysis",
            state.metric_dispatched_total.load(Ordering::Relaxed),
        ),
        (
            "vetgate_pipeline_completed_total",
            "Analysis pipelines completed successfully",
            state.metric_pipeline_completed_total.load(Ordering::Relaxed),
        ),
        (
            "vetgate_pipeline_failures_total",
            "Analysis pipelines terminated by an error",
            state.metric_pipeline_failures_total.load(Ordering::Relaxed),
        ),
        (
            "vetgate_analyze_requests_total",
            "Direct analysis API requests",
            state.metric_analyze_requests_total.load(Ordering::Relaxed),
        ),
    ];
    for (name, help, value) in counters {
        writeln!(&mut buf, "# HELP {} {}", name, help).ok();
        writeln!(&mut buf, "# TYPE {} counter", name).ok();
        writeln!(&mut buf, "{} {}", name, value).ok();
    }
    writeln!(
        &mut buf,
        "# HELP vetgate_build_info Build information\n# TYPE vetgate_build_info gauge"
    )
    .ok();
    writeln!(
        &mut buf,
        "vetgate_build_info{{version=\"{}\"}} 1",
        env!("CARGO_PKG_VERSION")
    )
    .ok();
    writeln!(
        &mut buf,
        "# HELP vetgate_process_uptime_seconds Process uptime seconds\n# TYPE vetgate_process_uptime_seconds gauge"
    )
    .ok();
    writeln!(
        &mut buf,
        "vetgate_process_uptime_seconds {}",
        state.process_start_instant.elapsed().as_secs_f64()
    )
    .ok();
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        buf,
    )
        .into_response()
}
