use axum::{
    Router,
    routing::{get, post},
};

use mandate_core::health::healthz;
use mandate_core::middleware::with_request_tracing;

use crate::handlers::{
    cycle::run_cycle, enrollment::enroll_lead, health::readyz, sequence::list_sequences,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Processor
        .route("/winback/run", post(run_cycle))
        // Enrollment
        .route("/winback/enrollments", post(enroll_lead))
        // Sequences
        .route("/winback/sequences", get(list_sequences))
        .with_state(state);
    with_request_tracing(router)
}
