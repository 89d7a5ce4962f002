//! API routes for verification upload, status, and admin review.
//!
//! Error mapping follows the core taxonomy: validation and role errors
//! are 400, missing profiles/records 404, state-graph violations and
//! lost review races 409, transient storage failures 502.

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use uuid::Uuid;

use vetmarket_verification::{
    AdminReviewGateway, DecisionNotifier, DocumentUploadPipeline, ProfileRole, ReviewDecision,
    StatusQueryService, SubmissionMetadata, VerificationError, VerificationStatus,
    VerificationStatusView,
};

// Application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocumentUploadPipeline>,
    pub gateway: Arc<AdminReviewGateway>,
    pub status: Arc<StatusQueryService>,
    pub notifier: Arc<dyn DecisionNotifier>,
}

// API types
#[derive(Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: VerificationStatus,
    pub document_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct DecisionRequest {
    pub decision: ReviewDecision,
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

pub struct ApiError(VerificationError);

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use VerificationError::*;
        let status = match &self.0 {
            Validation(_) | RoleMismatch { .. } => StatusCode::BAD_REQUEST,
            ProfileNotFound { .. } | RecordNotFound(_) => StatusCode::NOT_FOUND,
            InvalidTransition { .. } | ConcurrentModification(_) => StatusCode::CONFLICT,
            StorageUpload { transient: true, .. } => StatusCode::BAD_GATEWAY,
            StorageUpload { .. } | Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self.0 {
            ConcurrentModification(_) => "this record was already decided".to_string(),
            StorageUpload { transient: true, .. } => {
                format!("{}, please try again", self.0)
            }
            other => other.to_string(),
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { message })).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/verification/pending", get(list_pending))
        .route("/api/verification/:role/:profile_id/upload", post(upload_document))
        .route("/api/verification/:role/:profile_id/status", get(get_status))
        .route("/api/verification/:role/:profile_id/decision", post(record_decision))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

fn parse_role(role: &str) -> Result<ProfileRole, ApiError> {
    ProfileRole::from_str(role).map_err(|_| {
        ApiError(VerificationError::Validation(format!(
            "unknown role: {role}"
        )))
    })
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(VerificationError::Validation(format!(
        "malformed multipart body: {err}"
    )))
}

// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// Upload a proof document for a profile
async fn upload_document(
    State(state): State<AppState>,
    Path((role, profile_id)): Path<(String, Uuid)>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let role = parse_role(&role)?;

    let mut file: Option<Vec<u8>> = None;
    let mut metadata = SubmissionMetadata::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string).unwrap_or_default();
        match name.as_str() {
            "document" => {
                metadata.content_type = field.content_type().map(str::to_string);
                file = Some(field.bytes().await.map_err(bad_multipart)?.to_vec());
            }
            "license_number" => {
                metadata.license_number = Some(field.text().await.map_err(bad_multipart)?);
            }
            "registration_number" => {
                metadata.registration_number = Some(field.text().await.map_err(bad_multipart)?);
            }
            _ => {}
        }
    }

    let file = file.unwrap_or_default();
    let record = state
        .pipeline
        .submit(profile_id, role, &file, metadata)
        .await?;

    Ok(Json(UploadResponse {
        status: record.status,
        document_url: record.document.map(|d| d.url),
    }))
}

// Verification status for a profile
async fn get_status(
    State(state): State<AppState>,
    Path((role, profile_id)): Path<(String, Uuid)>,
) -> Result<Json<VerificationStatusView>, ApiError> {
    let role = parse_role(&role)?;
    let view = state.status.get_status(profile_id).await?;
    check_role(profile_id, role, &view)?;
    Ok(Json(view))
}

// Record an admin decision (admin-only; identity from x-admin-user)
async fn record_decision(
    State(state): State<AppState>,
    Path((role, profile_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<VerificationStatusView>, ApiError> {
    let role = parse_role(&role)?;

    let current = state.status.get_status(profile_id).await?;
    check_role(profile_id, role, &current)?;

    let decided_by = headers
        .get("x-admin-user")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let record = state
        .gateway
        .decide(profile_id, request.decision, decided_by, request.reason)
        .await?;

    // Fire-and-forget notification to the profile owner
    let notifier = state.notifier.clone();
    let (notify_profile, notify_role) = (record.profile_id, record.role);
    tokio::spawn(async move {
        notifier
            .decision_recorded(notify_profile, notify_role, request.decision)
            .await;
    });

    Ok(Json(VerificationStatusView::from_record(&record)))
}

// Admin review queue
async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<VerificationStatusView>>, ApiError> {
    Ok(Json(state.status.list_pending().await?))
}

fn check_role(
    profile_id: Uuid,
    declared: ProfileRole,
    view: &VerificationStatusView,
) -> Result<(), ApiError> {
    match view.role {
        Some(actual) if actual != declared => Err(ApiError(VerificationError::RoleMismatch {
            id: profile_id,
            declared,
            actual,
        })),
        _ => Ok(()),
    }
}
