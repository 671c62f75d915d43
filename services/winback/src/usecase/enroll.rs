use chrono::{DateTime, Utc};

use mandate_domain::id::{AttemptId, LeadId, SequenceId};

use crate::domain::repository::{AttemptRepository, LeadRepository, SequenceRepository};
use crate::domain::types::{NewAttempt, Sequence};
use crate::error::WinbackServiceError;

// ── EnrollLead ───────────────────────────────────────────────────────────────

/// Which sequence a lead enters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentTarget {
    Sequence(SequenceId),
    /// First active sequence whose trigger condition matches.
    LostReason(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enrollment {
    pub attempt_id: AttemptId,
    pub sequence_id: SequenceId,
    pub scheduled_at: DateTime<Utc>,
}

pub struct EnrollLeadUseCase<A, L, Q>
where
    A: AttemptRepository,
    L: LeadRepository,
    Q: SequenceRepository,
{
    pub attempts: A,
    pub leads: L,
    pub sequences: Q,
}

impl<A, L, Q> EnrollLeadUseCase<A, L, Q>
where
    A: AttemptRepository,
    L: LeadRepository,
    Q: SequenceRepository,
{
    /// Returns `None` when a lost reason matches no active sequence.
    pub async fn execute(
        &self,
        lead_id: LeadId,
        target: EnrollmentTarget,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, WinbackServiceError> {
        self.leads
            .find_by_id(lead_id)
            .await?
            .ok_or(WinbackServiceError::LeadNotFound)?;

        let Some(sequence) = self.resolve_sequence(target).await? else {
            return Ok(None);
        };
        let first = sequence
            .step(0)
            .ok_or(WinbackServiceError::SequenceHasNoSteps)?;
        if self
            .attempts
            .has_open_in_sequence(lead_id, sequence.id)
            .await?
        {
            return Err(WinbackServiceError::AlreadyEnrolled);
        }
        if let Err(e) = sequence.check_offsets(now) {
            tracing::warn!(sequence_id = %sequence.id, error = %e, "unschedulable sequence");
            return Err(WinbackServiceError::StepOffsetOutOfRange);
        }
        let scheduled_at = first
            .due_from(now)
            .ok_or(WinbackServiceError::StepOffsetOutOfRange)?;
        if !sequence.offsets_non_decreasing() {
            tracing::warn!(sequence_id = %sequence.id, "sequence step offsets go backwards");
        }

        let attempt = NewAttempt::step(lead_id, sequence.id, 0, first, scheduled_at, now);
        self.attempts.enqueue(&attempt).await?;
        tracing::info!(
            %lead_id,
            sequence_id = %sequence.id,
            attempt_id = %attempt.id,
            %scheduled_at,
            "lead enrolled in winback sequence"
        );

        Ok(Some(Enrollment {
            attempt_id: attempt.id,
            sequence_id: sequence.id,
            scheduled_at,
        }))
    }

    async fn resolve_sequence(
        &self,
        target: EnrollmentTarget,
    ) -> Result<Option<Sequence>, WinbackServiceError> {
        match target {
            EnrollmentTarget::Sequence(id) => {
                let sequence = self
                    .sequences
                    .find_by_id(id)
                    .await?
                    .ok_or(WinbackServiceError::SequenceNotFound)?;
                if !sequence.active {
                    return Err(WinbackServiceError::SequenceInactive);
                }
                Ok(Some(sequence))
            }
            EnrollmentTarget::LostReason(reason) => {
                if reason.trim().is_empty() {
                    return Err(WinbackServiceError::InvalidEnrollment);
                }
                let active = self.sequences.list_active().await?;
                Ok(active
                    .into_iter()
                    .find(|sequence| sequence.matches_lost_reason(&reason)))
            }
        }
    }
}
