use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Winback service error variants.
#[derive(Debug, thiserror::Error)]
pub enum WinbackServiceError {
    #[error("lead not found")]
    LeadNotFound,
    #[error("sequence not found")]
    SequenceNotFound,
    #[error("sequence is inactive")]
    SequenceInactive,
    #[error("sequence has no steps")]
    SequenceHasNoSteps,
    #[error("sequence step offset is out of range")]
    StepOffsetOutOfRange,
    #[error("lead already enrolled in sequence")]
    AlreadyEnrolled,
    #[error("invalid enrollment request")]
    InvalidEnrollment,
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl WinbackServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LeadNotFound => "LEAD_NOT_FOUND",
            Self::SequenceNotFound => "SEQUENCE_NOT_FOUND",
            Self::SequenceInactive => "SEQUENCE_INACTIVE",
            Self::SequenceHasNoSteps => "SEQUENCE_HAS_NO_STEPS",
            Self::StepOffsetOutOfRange => "STEP_OFFSET_OUT_OF_RANGE",
            Self::AlreadyEnrolled => "ALREADY_ENROLLED",
            Self::InvalidEnrollment => "INVALID_ENROLLMENT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for WinbackServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::LeadNotFound | Self::SequenceNotFound => StatusCode::NOT_FOUND,
            Self::SequenceInactive
            | Self::SequenceHasNoSteps
            | Self::StepOffsetOutOfRange
            | Self::InvalidEnrollment => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AlreadyEnrolled => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Internal errors need the anyhow chain logged so the root cause is traceable.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        // `success` lets the cron invoker check a single field for every outcome.
        let body = serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
