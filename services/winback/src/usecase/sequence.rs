use crate::domain::repository::SequenceRepository;
use crate::domain::types::Sequence;
use crate::error::WinbackServiceError;

// ── ListSequences ────────────────────────────────────────────────────────────

pub struct ListSequencesUseCase<R: SequenceRepository> {
    pub repo: R,
}

impl<R: SequenceRepository> ListSequencesUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<Sequence>, WinbackServiceError> {
        self.repo.list_active().await
    }
}
