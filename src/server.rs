use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::Engine;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CheckError;
use crate::pipeline::{is_pdf, CheckResponse, GradeChecker};
use crate::usage::{UsageDecision, UsageNotice, UsageStore, UsageTracker};

pub const CLIENT_ID_HEADER: &str = "x-client-id";
const ANONYMOUS_CLIENT: &str = "anonymous";

pub struct AppState<S> {
    pub checker: Arc<GradeChecker>,
    pub usage: Option<Arc<UsageTracker<S>>>,
    pub max_upload_bytes: usize,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            checker: Arc::clone(&self.checker),
            usage: self.usage.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsageStatus {
    pub remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<UsageNotice>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub result: CheckResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStatus>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub struct ApiError(CheckError);

impl From<CheckError> for ApiError {
    fn from(err: CheckError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            CheckError::MissingInput => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "No file provided",
                    message: None,
                },
            ),
            CheckError::Encoding(_) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid file encoding",
                    message: Some("Send the PDF as raw bytes or as base64 text."),
                },
            ),
            CheckError::Decode(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "Failed to analyze PDF",
                    message: Some("Please ensure you uploaded a valid PDF file with CBC results."),
                },
            ),
            CheckError::TooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    error: "File too large",
                    message: Some("Upload a smaller PDF of the report card."),
                },
            ),
            CheckError::UsageLimitReached { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    error: "Free usage limit reached",
                    message: Some("Create a free account to continue checking grades."),
                },
            ),
            CheckError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Failed to analyze PDF",
                    message: Some("Please ensure you uploaded a valid PDF file with CBC results."),
                },
            ),
        };

        if self.0.is_client_error() {
            warn!(error = %self.0, status = status.as_u16(), "grade check rejected");
        } else {
            error!(error = %self.0, "grade check failed");
        }

        (status, Json(body)).into_response()
    }
}

pub fn router<S: UsageStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_upload::<S>))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve<S: UsageStore + 'static>(
    addr: SocketAddr,
    state: AppState<S>,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(&addr).await?;
    info!("CBC grade checker listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cbc-grade-checker",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
async fn analyze_upload<S: UsageStore + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let body = body.map_err(|rejection| body_error(rejection, state.max_upload_bytes))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let document = decode_payload(content_type, &body)?;

    let usage = match &state.usage {
        Some(tracker) => {
            let client = client_id(&headers);
            let decision = tracker.record_attempt(client).await.map_err(|err| {
                CheckError::internal(format!("usage tracking failed: {err:#}"))
            })?;
            match decision {
                UsageDecision::Allowed {
                    count,
                    remaining,
                    notice,
                } => {
                    debug!(client, count, remaining, "free check recorded");
                    Some(UsageStatus { remaining, notice })
                }
                UsageDecision::Blocked { count } => {
                    info!(client, count, "free usage limit reached");
                    return Err(CheckError::UsageLimitReached {
                        limit: tracker.limit(),
                    }
                    .into());
                }
            }
        }
        None => None,
    };

    let outcome = state.checker.check(document).await?;

    Ok(Json(UploadResponse {
        result: outcome.into(),
        usage,
    }))
}

fn body_error(rejection: BytesRejection, limit: usize) -> CheckError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CheckError::TooLarge { limit }
    } else {
        CheckError::internal(format!("failed to read request body: {rejection}"))
    }
}

fn client_id(headers: &HeaderMap) -> &str {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
}

/// Accepts raw PDF bytes or the base64 text a browser upload function sends.
pub fn decode_payload(content_type: Option<&str>, body: &[u8]) -> Result<Vec<u8>, CheckError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CheckError::MissingInput);
    }

    if is_pdf(content_type, body) {
        return Ok(body.to_vec());
    }

    let encoded: Vec<u8> = body
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
}
