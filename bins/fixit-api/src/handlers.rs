// HTTP route handlers for the Fixit API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use fixit_common::error::StoreError;
use fixit_common::redis;
use fixit_common::types::{CheckJob, GameMode, QuestionRef, SubmissionPayload, TestCase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

/// Safety limit to keep pathological payloads off the queue
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub source_code: String,
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
    #[serde(default)]
    pub is_async: Option<bool>,
    #[serde(default)]
    pub question: Option<QuestionRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub source_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn store_error_response(context: &str, e: StoreError) -> Response {
    match e {
        StoreError::InvalidSubmission(message) => error_response(StatusCode::BAD_REQUEST, message),
        StoreError::Busy(message) => {
            warn!(error = %message, "{}", context);
            error_response(StatusCode::SERVICE_UNAVAILABLE, message)
        }
        other => {
            error!(error = %other, "{}", context);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{}: {}", context, other),
            )
        }
    }
}

fn parse_mode(mode: &str) -> Result<GameMode, Response> {
    GameMode::from_str(mode).ok_or_else(|| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid game mode: {} (expected quickFire or career)", mode),
        )
    })
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text format
pub async fn export_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /validate - Denylist screening, answered synchronously
pub async fn validate_code(Json(payload): Json<ValidateRequest>) -> Response {
    let verdict = fixit_engine::validate(&payload.source_code);
    let label = if verdict.valid { "accepted" } else { "rejected" };
    metrics::VALIDATIONS.with_label_values(&[label]).inc();
    (StatusCode::OK, Json(verdict)).into_response()
}

/// POST /execute - Queue a submission for the worker
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    if payload.source_code.len() > MAX_SOURCE_CODE_BYTES {
        warn!(
            source_size = payload.source_code.len(),
            "Rejected oversized submission"
        );
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Source code exceeds {} bytes", MAX_SOURCE_CODE_BYTES),
        );
    }

    let mut conn = state.redis.clone();

    // Test cases come from the stored question when one is referenced
    let (test_cases, is_async) = match payload.question {
        Some(question) => match redis::get_question(&mut conn, question).await {
            Ok(Some(stored)) => (
                payload.test_cases.unwrap_or(stored.test_cases),
                payload.is_async.unwrap_or(stored.is_async),
            ),
            Ok(None) => {
                return error_response(StatusCode::NOT_FOUND, "Question not found");
            }
            Err(e) => return store_error_response("Failed to load question", e),
        },
        None => (
            payload.test_cases.unwrap_or_default(),
            payload.is_async.unwrap_or(false),
        ),
    };

    let job = CheckJob {
        id: Uuid::new_v4(),
        source_code: payload.source_code,
        test_cases,
        is_async,
        question: payload.question,
    };

    match redis::push_job(&mut conn, &job).await {
        Ok(_) => {
            metrics::JOBS_QUEUED.inc();
            info!(
                job_id = %job.id,
                test_cases = job.test_cases.len(),
                is_async = job.is_async,
                "Job queued"
            );
            (
                StatusCode::CREATED,
                Json(SubmitResponse {
                    job_id: job.id.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(job_id = %job.id, error = %e, "Failed to queue job");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to queue job: {}", e),
            )
        }
    }
}

/// GET /job/{job_id} - Query check report
pub async fn get_job_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let job_uuid = match Uuid::parse_str(&job_id) {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid job ID format"),
    };

    let mut conn = state.redis.clone();
    match redis::get_result(&mut conn, &job_uuid).await {
        Ok(Some(report)) => {
            info!(job_id = %job_id, solved = report.is_solved(), "Job result retrieved");
            (StatusCode::OK, Json(report)).into_response()
        }
        Ok(None) => {
            // Result not found - job may still be queued/running
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "jobId": job_id,
                    "status": "pending",
                    "message": "Job is queued or still executing"
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to fetch job result");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to query job status: {}", e),
            )
        }
    }
}

/// GET /game/levels/{mode}?userId= - Levels with unlock status
pub async fn get_levels(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    Query(query): Query<LevelsQuery>,
) -> Response {
    let mode = match parse_mode(&mode) {
        Ok(mode) => mode,
        Err(response) => return response,
    };

    let mut conn = state.redis.clone();
    match redis::get_levels(&mut conn, mode, query.user_id.as_deref()).await {
        Ok(levels) => (StatusCode::OK, Json(levels)).into_response(),
        Err(e) => store_error_response("Failed to load levels", e),
    }
}

/// GET /game/questions/{mode}/{level_id}
pub async fn get_questions(
    State(state): State<Arc<AppState>>,
    Path((mode, level_id)): Path<(String, u32)>,
) -> Response {
    let mode = match parse_mode(&mode) {
        Ok(mode) => mode,
        Err(response) => return response,
    };

    let mut conn = state.redis.clone();
    match redis::get_questions(&mut conn, mode, level_id).await {
        Ok(questions) if questions.is_empty() => {
            error_response(StatusCode::NOT_FOUND, "No questions found for this level")
        }
        Ok(questions) => (StatusCode::OK, Json(questions)).into_response(),
        Err(e) => store_error_response("Failed to load questions", e),
    }
}

/// POST /game/submit - Record a solved question
pub async fn submit_solution(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmissionPayload>,
) -> Response {
    let mut conn = state.redis.clone();
    match redis::submit_solution(&mut conn, &payload).await {
        Ok(receipt) => {
            metrics::SUBMISSIONS
                .with_label_values(&[payload.game_mode.as_str()])
                .inc();
            (StatusCode::OK, Json(receipt)).into_response()
        }
        Err(e) => store_error_response("Failed to record solution", e),
    }
}

/// GET /game/progress/{mode}/{user_id}
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((mode, user_id)): Path<(String, String)>,
) -> Response {
    let mode = match parse_mode(&mode) {
        Ok(mode) => mode,
        Err(response) => return response,
    };

    let mut conn = state.redis.clone();
    match redis::get_progress(&mut conn, &user_id, mode).await {
        Ok((progress, stats)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "progress": progress, "stats": stats })),
        )
            .into_response(),
        Err(e) => store_error_response("Failed to load progress", e),
    }
}

/// GET /game/leaderboard/{mode}?limit=
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Path(mode): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Response {
    let mode = match parse_mode(&mode) {
        Ok(mode) => mode,
        Err(response) => return response,
    };

    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let mut conn = state.redis.clone();
    match redis::get_leaderboard(&mut conn, mode, limit).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => store_error_response("Failed to load leaderboard", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_request_shapes() {
        let bare: SubmitRequest = serde_json::from_value(json!({
            "sourceCode": "function f() { return 1; }",
            "testCases": [{ "input": [], "expected": 1 }]
        }))
        .unwrap();
        assert_eq!(bare.test_cases.unwrap().len(), 1);
        assert!(bare.question.is_none());
        assert_eq!(bare.is_async, None);

        let by_question: SubmitRequest = serde_json::from_value(json!({
            "sourceCode": "function f() {}",
            "question": { "gameMode": "career", "levelId": 2, "questionId": 3 }
        }))
        .unwrap();
        let question = by_question.question.unwrap();
        assert_eq!(question.game_mode, GameMode::Career);
        assert_eq!(question.question_id, 3);
        assert!(by_question.test_cases.is_none());
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("quickFire").unwrap(), GameMode::QuickFire);
        let response = parse_mode("arcade").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_submission_maps_to_bad_request() {
        let response = store_error_response(
            "Failed to record solution",
            StoreError::InvalidSubmission("Code is required".to_string()),
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_busy_store_maps_to_unavailable() {
        let response = store_error_response(
            "Failed to record solution",
            StoreError::Busy("lock held".to_string()),
        );
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_validate_endpoint() {
        let response = validate_code(Json(ValidateRequest {
            source_code: "function f() { while(true) {} }".to_string(),
        }))
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
