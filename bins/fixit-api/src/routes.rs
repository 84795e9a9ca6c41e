use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
        .route("/validate", post(handlers::validate_code))
        .route("/execute", post(handlers::submit_job))
        .route("/job/:job_id", get(handlers::get_job_result))
        .route("/game/levels/:mode", get(handlers::get_levels))
        .route("/game/questions/:mode/:level_id", get(handlers::get_questions))
        .route("/game/submit", post(handlers::submit_solution))
        .route("/game/progress/:mode/:user_id", get(handlers::get_progress))
        .route("/game/leaderboard/:mode", get(handlers::get_leaderboard))
}
