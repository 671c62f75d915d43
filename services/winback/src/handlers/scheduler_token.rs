//! Shared-secret check for the scheduler that triggers processor runs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::WinbackServiceError;
use crate::state::AppState;

/// Proof that the caller presented `Authorization: Bearer <secret>`.
///
/// Always extracts when no secret is configured.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerCaller;

impl FromRequestParts<AppState> for SchedulerCaller {
    type Rejection = WinbackServiceError;

    // Same shape as axum-core's trait signature: read synchronously, return a
    // 'static future.
    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let authorized = match state.cron_secret.as_deref() {
            None => true,
            Some(secret) => parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .is_some_and(|token| token.trim() == secret),
        };

        async move {
            if authorized {
                Ok(Self)
            } else {
                Err(WinbackServiceError::Unauthorized)
            }
        }
    }
}
