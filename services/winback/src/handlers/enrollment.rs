use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mandate_domain::id::{AttemptId, LeadId, SequenceId};

use crate::error::WinbackServiceError;
use crate::state::AppState;
use crate::usecase::enroll::{EnrollLeadUseCase, EnrollmentTarget};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EnrollRequest {
    pub lead_id: Uuid,
    pub sequence_id: Option<Uuid>,
    pub lost_reason: Option<String>,
}

impl EnrollRequest {
    /// Exactly one of `sequence_id` and `lost_reason` must be present.
    fn target(self) -> Result<(LeadId, EnrollmentTarget), WinbackServiceError> {
        let target = match (self.sequence_id, self.lost_reason) {
            (Some(id), None) => EnrollmentTarget::Sequence(SequenceId(id)),
            (None, Some(reason)) => EnrollmentTarget::LostReason(reason),
            _ => return Err(WinbackServiceError::InvalidEnrollment),
        };
        Ok((LeadId(self.lead_id), target))
    }
}

#[derive(Serialize)]
pub struct EnrollResponse {
    pub attempt_id: AttemptId,
    pub sequence_id: SequenceId,
    #[serde(serialize_with = "mandate_core::serde::to_rfc3339_ms")]
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
}

// ── POST /winback/enrollments ────────────────────────────────────────────────

pub async fn enroll_lead(
    State(state): State<AppState>,
    Json(body): Json<EnrollRequest>,
) -> Result<Response, WinbackServiceError> {
    let (lead_id, target) = body.target()?;
    let usecase = EnrollLeadUseCase {
        attempts: state.attempt_repo(),
        leads: state.lead_repo(),
        sequences: state.sequence_repo(),
    };
    let response = match usecase.execute(lead_id, target, Utc::now()).await? {
        Some(enrollment) => (
            StatusCode::CREATED,
            Json(EnrollResponse {
                attempt_id: enrollment.attempt_id,
                sequence_id: enrollment.sequence_id,
                scheduled_at: enrollment.scheduled_at,
            }),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(response)
}
