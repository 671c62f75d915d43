#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mandate_domain::id::{AttemptId, LeadId, SequenceId};
use mandate_domain::lead::LeadClassification;

use crate::domain::types::{
    AttemptResult, CycleSummary, DueAttempt, EmailAccount, LeadSnapshot, NewAttempt,
    NewFollowUpTask, NewTrackedEmail, OutgoingEmail, SentEmail, Sequence, StepCompletion,
};
use crate::error::WinbackServiceError;

/// Repository for winback attempts.
pub trait AttemptRepository: Send + Sync {
    /// Atomically move due attempts to `processing` and return them, ordered by
    /// `scheduled_at` then step index. Due means `pending` and scheduled at or
    /// before `now`, or `processing` with a claim older than `lease_cutoff`.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease_cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<DueAttempt>, WinbackServiceError>;

    async fn record_result(
        &self,
        id: AttemptId,
        result: &AttemptResult,
    ) -> Result<(), WinbackServiceError>;

    /// Write back a processed step attempt, touch its lead and enqueue the
    /// follow-up in one transaction. On failure nothing is written and the
    /// attempt stays `processing` until its lease expires.
    async fn complete_step(&self, completion: &StepCompletion) -> Result<(), WinbackServiceError>;

    async fn enqueue(&self, attempt: &NewAttempt) -> Result<(), WinbackServiceError>;

    /// Put a claimed attempt back to `pending` at `at`.
    async fn reschedule(
        &self,
        id: AttemptId,
        at: DateTime<Utc>,
        retry_count: i32,
        notes: &str,
    ) -> Result<(), WinbackServiceError>;

    /// Whether the lead has a `pending` or `processing` attempt in the sequence.
    async fn has_open_in_sequence(
        &self,
        lead_id: LeadId,
        sequence_id: SequenceId,
    ) -> Result<bool, WinbackServiceError>;
}

/// Repository for winback sequences (read-only).
pub trait SequenceRepository: Send + Sync {
    async fn find_by_id(&self, id: SequenceId) -> Result<Option<Sequence>, WinbackServiceError>;

    /// Active sequences, oldest first.
    async fn list_active(&self) -> Result<Vec<Sequence>, WinbackServiceError>;
}

/// Repository for the winback fields of CRM leads.
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: LeadId) -> Result<Option<LeadSnapshot>, WinbackServiceError>;

    async fn classify(
        &self,
        id: LeadId,
        classification: LeadClassification,
        score: i32,
        at: DateTime<Utc>,
    ) -> Result<(), WinbackServiceError>;
}

/// Repository for call / LinkedIn follow-up tasks.
pub trait FollowUpTaskRepository: Send + Sync {
    /// Id of a non-terminal task already created for `attempt_id`.
    async fn find_open_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<Uuid>, WinbackServiceError>;

    async fn create(&self, task: &NewFollowUpTask) -> Result<(), WinbackServiceError>;

    /// Whether a `call` or `linkedin` task for the lead was completed at or after `since`.
    async fn has_completed_outreach_since(
        &self,
        lead_id: LeadId,
        since: DateTime<Utc>,
    ) -> Result<bool, WinbackServiceError>;
}

/// Outbound email accounts and tracked emails.
pub trait MailboxRepository: Send + Sync {
    /// Oldest active account, by creation time then id.
    async fn first_active_account(&self) -> Result<Option<EmailAccount>, WinbackServiceError>;

    async fn record_sent(&self, email: &NewTrackedEmail) -> Result<(), WinbackServiceError>;

    /// Whether an email sent to the lead at or after `since` was opened or clicked.
    async fn has_engagement_since(
        &self,
        lead_id: LeadId,
        since: DateTime<Utc>,
    ) -> Result<bool, WinbackServiceError>;
}

/// External email integration.
pub trait EmailGateway: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentEmail, WinbackServiceError>;
}

/// Operator-facing system log.
pub trait AuditLog: Send + Sync {
    async fn record_cycle(
        &self,
        now: DateTime<Utc>,
        summary: &CycleSummary,
    ) -> Result<(), WinbackServiceError>;
}
