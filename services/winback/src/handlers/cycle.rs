use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;

use crate::domain::types::CycleSummary;
use crate::error::WinbackServiceError;
use crate::handlers::scheduler_token::SchedulerCaller;
use crate::state::AppState;

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct RunCycleResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: CycleSummary,
}

// ── POST /winback/run ────────────────────────────────────────────────────────

pub async fn run_cycle(
    _caller: SchedulerCaller,
    State(state): State<AppState>,
) -> Result<Json<RunCycleResponse>, WinbackServiceError> {
    let summary = state.run_cycle_usecase().execute(Utc::now()).await?;
    Ok(Json(RunCycleResponse {
        success: true,
        summary,
    }))
}
