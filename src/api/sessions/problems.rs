use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::sessions::helpers::{ensure_writable, load_session, session_response};
use crate::api::validation::{clean_text, validate_image_upload};
use crate::core::state::AppState;
use crate::core::time::now_utc;
use crate::db::models::{Problem, TutoringSession};
use crate::db::types::ProblemSource;
use crate::repositories;
use crate::schemas::problem::{
    ProblemResponse, SimilarProblemsQuery, SimilarProblemsResponse, SubmitProblemRequest,
};
use crate::schemas::session::SessionResponse;
use crate::services::tutor_model::{ProblemClassification, ProblemImage};

const DEFAULT_SIMILAR_COUNT: u32 = 3;

pub(super) async fn submit_problem(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SubmitProblemRequest>,
) -> Result<(StatusCode, Json<ProblemResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let text = clean_text("text", &payload.text, state.settings().tutoring().max_problem_chars)?;

    let session = load_session(&state, &code).await?;
    ensure_writable(&session)?;

    let problem = record_problem(&state, &session, &text, ProblemSource::Text).await?;
    Ok((StatusCode::CREATED, Json(current_problem_response(problem))))
}

/// Multipart upload with a single `file` field holding a photo of the problem.
pub(super) async fn upload_problem_image(
    Path(code): Path<String>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProblemResponse>), ApiError> {
    let session = load_session(&state, &code).await?;
    ensure_writable(&session)?;

    let max_mb = state.settings().storage().max_upload_size_mb;
    let max_bytes = max_mb * 1024 * 1024;
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("problem.jpg").to_string();
        let content_type =
            field.content_type().unwrap_or("application/octet-stream").to_string();
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ApiError::BadRequest(format!("File size exceeds {max_mb}MB limit")));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some((filename, content_type, bytes));
    }

    let (filename, content_type, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    validate_image_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_image_extensions,
    )?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    let image = ProblemImage { bytes, content_type };
    let extracted = state.tutor().extract_problem(&image).await?;
    let text = clean_text(
        "extracted problem",
        &extracted,
        state.settings().tutoring().max_problem_chars,
    )?;
    tracing::info!(
        session_code = %session.code,
        filename = %filename,
        "Problem extracted from image"
    );

    let problem = record_problem(&state, &session, &text, ProblemSource::Image).await?;
    Ok((StatusCode::CREATED, Json(current_problem_response(problem))))
}

fn current_problem_response(problem: Problem) -> ProblemResponse {
    let id = problem.id.clone();
    ProblemResponse::from_problem(problem, Some(&id))
}

/// Classifies the text, appends it to the session's problem list, and makes
/// it the current problem.
async fn record_problem(
    state: &AppState,
    session: &TutoringSession,
    text: &str,
    source: ProblemSource,
) -> Result<Problem, ApiError> {
    let classification = match state.tutor().classify_problem(text).await {
        Ok(classification) => classification,
        Err(err) => {
            tracing::warn!(
                session_code = %session.code,
                error = %err,
                "Problem classification failed; storing unclassified"
            );
            ProblemClassification::unclassified()
        }
    };

    let now = now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start problem transaction"))?;

    let locked = repositories::sessions::lock_by_id(&mut *tx, &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock session"))?;
    ensure_writable(&locked)?;

    let problem = repositories::problems::create(
        &mut *tx,
        repositories::problems::CreateProblem {
            id: &Uuid::new_v4().to_string(),
            session_id: &session.id,
            text,
            source,
            category: &classification.category,
            difficulty: classification.difficulty,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store problem"))?;

    repositories::sessions::touch_active(&mut *tx, &session.id, Some(&problem.id), now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to set current problem"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit problem"))?;

    tracing::info!(
        session_code = %session.code,
        problem_id = %problem.id,
        category = %problem.category,
        "Problem submitted"
    );
    Ok(problem)
}

pub(super) async fn select_problem(
    Path((code, problem_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = load_session(&state, &code).await?;
    ensure_writable(&session)?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start select transaction"))?;
    let locked = repositories::sessions::lock_by_id(&mut *tx, &session.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock session"))?;
    ensure_writable(&locked)?;

    repositories::problems::find_in_session(&mut *tx, &session.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found in this session".to_string()))?;

    let updated =
        repositories::sessions::touch_active(&mut *tx, &session.id, Some(&problem_id), now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to set current problem"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit problem selection"))?;

    Ok(Json(session_response(&state, updated, false).await?))
}

/// Practice problems for the "similar problems" picker. Picking one is an
/// ordinary problem submission, so nothing is stored here.
pub(super) async fn similar_problems(
    Path((code, problem_id)): Path<(String, String)>,
    Query(query): Query<SimilarProblemsQuery>,
    State(state): State<AppState>,
) -> Result<Json<SimilarProblemsResponse>, ApiError> {
    query.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let count = query
        .count
        .unwrap_or(DEFAULT_SIMILAR_COUNT)
        .min(state.settings().tutoring().max_similar_problems);

    let session = load_session(&state, &code).await?;
    let problem = repositories::problems::find_in_session(state.db(), &session.id, &problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found in this session".to_string()))?;

    let problems = state.tutor().similar_problems(&problem.text, count).await?;
    Ok(Json(SimilarProblemsResponse { problem_id: problem.id, problems }))
}
