//! HTTP routes for the web service
//!
//! Upload endpoints accept `multipart/form-data` with a `file` part plus the
//! optional cleaning fields `keywords`, `header_h`, `footer_h` and
//! `match_case`. Document work runs on the blocking thread pool.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::usage::{client_ip, AnalyticsEvent, ClientInfo, UsageExport, UsageStats, UsageTracker};
use crate::cleaner::{join_keyword_list, parse_keyword_list, CleanParams, DEFAULT_FOOTER_HEIGHT, DEFAULT_HEADER_HEIGHT};
use crate::cli::OUTPUT_PREFIX;
use crate::detector::{CandidateDetector, DetectorOptions};
use crate::pipeline::{DocumentPipeline, PipelineError, Preview};

/// Fallback name when the upload carries none
const DEFAULT_UPLOAD_NAME: &str = "document.pdf";

/// Application state shared across handlers
pub struct AppState {
    pub version: String,
    pub detector: CandidateDetector,
    pub usage: UsageTracker,
}

impl AppState {
    pub fn new(detector: DetectorOptions) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            detector: CandidateDetector::new(detector),
            usage: UsageTracker::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DetectorOptions::default())
    }
}

/// Build the service router
pub fn service_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/preview", post(preview))
        .route("/process", post(process))
        .route("/analytics/track", post(track_event))
        .route("/analytics/stats", get(usage_stats))
        .route("/analytics/export", get(usage_export))
        .route("/health", get(health_check))
}

// ============ Forms ============

/// Parsed upload form
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub file_name: String,
    pub data: Vec<u8>,
    pub params: CleanParams,
}

/// Form booleans accept the usual HTML spellings
pub fn parse_form_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn parse_form_height(name: &str, value: &str) -> Result<f32, AppError> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| AppError::BadRequest(format!("Invalid number for {name}: {value}")))
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut keywords = Vec::new();
    let mut header_height = DEFAULT_HEADER_HEIGHT;
    let mut footer_height = DEFAULT_FOOTER_HEIGHT;
    let mut match_case = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field
                .file_name()
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_UPLOAD_NAME)
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
            file = Some((file_name, data.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read field {name}: {e}")))?;
        match name.as_str() {
            "keywords" => keywords = parse_keyword_list(&value),
            "header_h" => header_height = parse_form_height("header_h", &value)?,
            "footer_h" => footer_height = parse_form_height("footer_h", &value)?,
            "match_case" => match_case = parse_form_bool(&value),
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let params = CleanParams::builder()
        .keywords(keywords)
        .header_height(header_height)
        .footer_height(footer_height)
        .match_case(match_case)
        .build();

    Ok(UploadForm {
        file_name,
        data,
        params,
    })
}

async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Worker task failed: {e}")))
}

// ============ Document Endpoints ============

/// Detected keywords, joined for display
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub keywords: String,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let form = read_upload(multipart).await?;
    tracing::info!(%request_id, file = %form.file_name, size = form.data.len(), "Analyze request");

    let detector = state.detector.clone();
    let candidates = run_blocking(move || detector.detect(&form.data)).await?;
    tracing::debug!(%request_id, count = candidates.len(), "Analyze finished");

    Ok(Json(AnalyzeResponse {
        keywords: join_keyword_list(&candidates),
    }))
}

async fn preview(multipart: Multipart) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let form = read_upload(multipart).await?;
    tracing::info!(%request_id, file = %form.file_name, size = form.data.len(), "Preview request");

    let UploadForm { data, params, .. } = form;
    let preview = run_blocking(move || DocumentPipeline::new(params).preview(&data)).await??;

    match preview {
        Preview::Image(png) => Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response()),
        Preview::Unavailable => Err(AppError::BadRequest("No preview available".to_string())),
    }
}

/// Cleaned document as an attachment
#[derive(Debug)]
pub struct PdfDownload {
    data: Vec<u8>,
    filename: String,
}

impl IntoResponse for PdfDownload {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", self.filename),
                ),
            ],
            self.data,
        )
            .into_response()
    }
}

async fn process(multipart: Multipart) -> Result<PdfDownload, AppError> {
    let request_id = Uuid::new_v4();
    let form = read_upload(multipart).await?;
    tracing::info!(%request_id, file = %form.file_name, size = form.data.len(), "Process request");

    let UploadForm {
        file_name,
        data,
        params,
    } = form;
    let output = run_blocking(move || DocumentPipeline::new(params).process(&data)).await??;

    let failed = output.failed_pages();
    if !failed.is_empty() {
        tracing::warn!(%request_id, ?failed, "Some pages were left unchanged");
    }

    Ok(PdfDownload {
        data: output.bytes,
        filename: download_name(&file_name),
    })
}

/// `Clean_<name>` with header-unsafe characters removed
pub fn download_name(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != ';')
        .collect();
    format!("{OUTPUT_PREFIX}{safe}")
}

// ============ Analytics ============

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub status: String,
}

async fn track_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(event): Json<AnalyticsEvent>,
) -> Json<TrackResponse> {
    tracing::debug!(event = %event.event_type, session = %event.session_id, "Tracked event");
    state.usage.track(event, client_info(&headers));

    Json(TrackResponse {
        status: "success".to_string(),
    })
}

/// Requesting client; a missing User-Agent is kept empty, a missing address is "unknown"
fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        ip_address: client_ip(
            headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()),
            "unknown",
        ),
    }
}

async fn usage_stats(State(state): State<Arc<AppState>>) -> Json<UsageStats> {
    Json(state.usage.stats())
}

async fn usage_export(State(state): State<Arc<AppState>>) -> Json<UsageExport> {
    Json(state.usage.export())
}

// ============ Health ============

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

// ============ Errors ============

/// API error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unprocessable(String),
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Parse(_) => AppError::Unprocessable(e.to_string()),
            PipelineError::Serialize(_) | PipelineError::Render(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
