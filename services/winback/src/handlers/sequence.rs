use axum::{Json, extract::State};
use serde::Serialize;

use mandate_domain::id::SequenceId;

use crate::domain::types::{Sequence, Step};
use crate::error::WinbackServiceError;
use crate::state::AppState;
use crate::usecase::sequence::ListSequencesUseCase;

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SequenceResponse {
    pub id: SequenceId,
    pub name: String,
    pub trigger_condition: Option<String>,
    pub steps: Vec<Step>,
    #[serde(serialize_with = "mandate_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Sequence> for SequenceResponse {
    fn from(sequence: Sequence) -> Self {
        Self {
            id: sequence.id,
            name: sequence.name,
            trigger_condition: sequence.trigger_condition,
            steps: sequence.steps,
            created_at: sequence.created_at,
        }
    }
}

// ── GET /winback/sequences ───────────────────────────────────────────────────

pub async fn list_sequences(
    State(state): State<AppState>,
) -> Result<Json<Vec<SequenceResponse>>, WinbackServiceError> {
    let usecase = ListSequencesUseCase {
        repo: state.sequence_repo(),
    };
    let sequences = usecase.execute().await?;
    Ok(Json(sequences.into_iter().map(Into::into).collect()))
}
