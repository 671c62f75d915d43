use chrono::{DateTime, Utc};
use serde_json::json;

use mandate_domain::lead::LeadClassification;
use mandate_domain::outreach::FollowUpKind;

use crate::domain::repository::{
    AttemptRepository, AuditLog, EmailGateway, FollowUpTaskRepository, LeadRepository,
    MailboxRepository,
};
use crate::domain::types::{
    AttemptResult, AttemptStatus, AttemptTarget, CycleSummary, DueAttempt, LeadSnapshot,
    NewAttempt, Step, StepCompletion, WinbackSettings,
};
use crate::error::WinbackServiceError;
use crate::usecase::dispatch::{Delivery, DispatchError, Dispatcher};
use crate::usecase::review::{RetryPlan, ReviewResolver, retry_plan};

// ── RunCycle ─────────────────────────────────────────────────────────────────

/// One processor run: claim due attempts, execute them in order, write back
/// outcomes, schedule what comes next.
pub struct RunCycleUseCase<A, L, T, M, G, S>
where
    A: AttemptRepository,
    L: LeadRepository,
    T: FollowUpTaskRepository,
    M: MailboxRepository,
    G: EmailGateway,
    S: AuditLog,
{
    pub attempts: A,
    pub leads: L,
    pub tasks: T,
    pub mailbox: M,
    pub gateway: G,
    pub audit: S,
    pub settings: WinbackSettings,
}

impl<A, L, T, M, G, S> RunCycleUseCase<A, L, T, M, G, S>
where
    A: AttemptRepository,
    L: LeadRepository,
    T: FollowUpTaskRepository,
    M: MailboxRepository,
    G: EmailGateway,
    S: AuditLog,
{
    /// Only a failed claim is fatal. Everything after it is attempt-local.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<CycleSummary, WinbackServiceError> {
        let lease_cutoff = now - self.settings.claim_lease;
        let due = self
            .attempts
            .claim_due(now, lease_cutoff, self.settings.batch_size)
            .await?;

        let mut summary = CycleSummary::default();
        if due.is_empty() {
            tracing::debug!(%now, "no winback attempts due");
            return Ok(summary);
        }

        for attempt in &due {
            summary.processed += 1;
            match attempt.target {
                AttemptTarget::Step { index } => {
                    self.process_step(attempt, index, now, &mut summary).await
                }
                AttemptTarget::Review => self.process_review(attempt, now, &mut summary).await,
            }
        }

        if let Err(e) = self.audit.record_cycle(now, &summary).await {
            tracing::warn!(error = %e, "failed to write winback cycle audit entry");
        }
        tracing::info!(
            processed = summary.processed,
            emails_sent = summary.emails_sent,
            call_tasks_created = summary.call_tasks_created,
            linkedin_tasks_created = summary.linkedin_tasks_created,
            errors = summary.errors,
            leads_engaging = summary.leads_engaging,
            leads_irrecoverable = summary.leads_irrecoverable,
            reviews_requeued = summary.reviews_requeued,
            "winback cycle finished"
        );
        Ok(summary)
    }

    async fn process_step(
        &self,
        attempt: &DueAttempt,
        index: usize,
        now: DateTime<Utc>,
        summary: &mut CycleSummary,
    ) {
        let dispatcher = Dispatcher {
            tasks: &self.tasks,
            mailbox: &self.mailbox,
            gateway: &self.gateway,
        };
        let (outcome, plan) = match plan_step(attempt, index) {
            Ok(plan) => (
                dispatcher.dispatch(attempt, plan.lead, plan.step, now).await,
                Some(plan),
            ),
            Err(e) => (Err(e), None),
        };

        let mut error_counted = false;
        let result = match &outcome {
            Ok(delivery) => {
                tally(summary, delivery);
                AttemptResult {
                    status: AttemptStatus::Sent,
                    executed_at: now,
                    notes: Some(delivery.notes()),
                    response: delivery.response(),
                }
            }
            Err(e) => {
                if e.counts_as_error() {
                    summary.errors += 1;
                    error_counted = true;
                    tracing::warn!(
                        attempt_id = %attempt.id,
                        code = e.code(),
                        error = %e.notes(),
                        "winback attempt failed"
                    );
                } else {
                    tracing::info!(
                        attempt_id = %attempt.id,
                        code = e.code(),
                        "winback attempt not delivered"
                    );
                }
                AttemptResult {
                    status: e.status(),
                    executed_at: now,
                    notes: Some(e.notes()),
                    response: e.response(),
                }
            }
        };

        let follow_up = plan.and_then(|plan| self.follow_up(attempt, &plan, result.status, now));
        let completion = StepCompletion {
            attempt_id: attempt.id,
            result,
            touch_lead: attempt.lead.as_ref().map(|lead| lead.id),
            follow_up,
        };
        if let Err(e) = self.attempts.complete_step(&completion).await {
            tracing::error!(
                attempt_id = %attempt.id,
                error = %e,
                "failed to finish winback attempt, left for reclaim"
            );
            if !error_counted {
                summary.errors += 1;
            }
        }
    }

    /// Next step after a `sent` or `skipped` step; the review after a `sent` last step.
    fn follow_up(
        &self,
        attempt: &DueAttempt,
        plan: &StepPlan<'_>,
        status: AttemptStatus,
        now: DateTime<Utc>,
    ) -> Option<NewAttempt> {
        match (status, plan.next) {
            (AttemptStatus::Sent, None) => Some(NewAttempt::review(
                attempt.lead_id,
                attempt.sequence_id,
                now + self.settings.review_delay,
                now,
            )),
            (AttemptStatus::Sent | AttemptStatus::Skipped, Some((index, step, due_at))) => {
                Some(NewAttempt::step(
                    attempt.lead_id,
                    attempt.sequence_id,
                    index,
                    step,
                    due_at,
                    now,
                ))
            }
            _ => None,
        }
    }

    async fn process_review(
        &self,
        attempt: &DueAttempt,
        now: DateTime<Utc>,
        summary: &mut CycleSummary,
    ) {
        let Some(lead) = attempt.lead.as_ref() else {
            summary.errors += 1;
            tracing::warn!(
                attempt_id = %attempt.id,
                "review attempt references a missing lead"
            );
            let result = AttemptResult {
                status: AttemptStatus::Failed,
                executed_at: now,
                notes: Some("lead not found".to_owned()),
                response: json!({ "handler": "review", "error": "LEAD_NOT_FOUND" }),
            };
            if let Err(e) = self.attempts.record_result(attempt.id, &result).await {
                tracing::error!(
                    attempt_id = %attempt.id,
                    error = %e,
                    "failed to record review outcome"
                );
            }
            return;
        };

        let resolver = ReviewResolver {
            leads: &self.leads,
            tasks: &self.tasks,
            mailbox: &self.mailbox,
            settings: &self.settings,
        };
        match resolver.resolve(lead, now).await {
            Ok(decision) => {
                match decision.classification {
                    LeadClassification::Engaging => summary.leads_engaging += 1,
                    LeadClassification::Irrecoverable => summary.leads_irrecoverable += 1,
                }
                let result = AttemptResult {
                    status: AttemptStatus::Completed,
                    executed_at: now,
                    notes: Some(decision.notes()),
                    response: decision.response(),
                };
                if let Err(e) = self.attempts.record_result(attempt.id, &result).await {
                    summary.errors += 1;
                    tracing::error!(
                        attempt_id = %attempt.id,
                        error = %e,
                        "failed to record review outcome"
                    );
                }
            }
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(
                    attempt_id = %attempt.id,
                    lead_id = %lead.id,
                    error = %e,
                    "review resolution failed"
                );
                if self.retry_review(attempt, &e, now).await {
                    summary.reviews_requeued += 1;
                }
            }
        }
    }

    /// Returns `true` when the review was put back in the queue.
    async fn retry_review(
        &self,
        attempt: &DueAttempt,
        cause: &WinbackServiceError,
        now: DateTime<Utc>,
    ) -> bool {
        let cause = describe(cause);
        let written = match retry_plan(attempt.retry_count, now, &self.settings) {
            RetryPlan::Requeue { at, retry_count } => {
                let notes = format!("review failed (attempt {retry_count}), retrying: {cause}");
                self.attempts
                    .reschedule(attempt.id, at, retry_count, &notes)
                    .await
                    .map(|()| true)
            }
            RetryPlan::DeadLetter { retry_count } => {
                let result = AttemptResult {
                    status: AttemptStatus::Failed,
                    executed_at: now,
                    notes: Some(format!(
                        "review abandoned after {retry_count} failed attempts: {cause}"
                    )),
                    response: json!({
                        "handler": "review",
                        "error": "REVIEW_DEAD_LETTER",
                        "retry_count": retry_count,
                    }),
                };
                tracing::error!(attempt_id = %attempt.id, retry_count, "review dead-lettered");
                self.attempts
                    .record_result(attempt.id, &result)
                    .await
                    .map(|()| false)
            }
        };
        written.unwrap_or_else(|e| {
            tracing::error!(attempt_id = %attempt.id, error = %e, "failed to record review retry");
            false
        })
    }
}

/// What a step attempt needs before it is dispatched.
#[derive(Debug)]
struct StepPlan<'a> {
    lead: &'a LeadSnapshot,
    step: &'a Step,
    /// `None` when `step` is the last one.
    next: Option<(usize, &'a Step, DateTime<Utc>)>,
}

/// Lead, step and next step for a step attempt. Dangling references,
/// out-of-range indices and unschedulable offsets are attempt-local failures.
fn plan_step(attempt: &DueAttempt, index: usize) -> Result<StepPlan<'_>, DispatchError> {
    let lead = attempt
        .lead
        .as_ref()
        .ok_or_else(|| DispatchError::InvalidAttempt("lead not found".into()))?;
    let sequence = attempt
        .sequence
        .as_ref()
        .ok_or_else(|| DispatchError::InvalidAttempt("sequence not found".into()))?;
    let step = sequence.step(index).ok_or_else(|| {
        DispatchError::InvalidAttempt(format!(
            "step {index} out of range for sequence `{}` ({} steps)",
            sequence.name,
            sequence.steps.len()
        ))
    })?;
    let next = sequence
        .next_step_due(index, attempt.scheduled_at)
        .map_err(|e| {
            DispatchError::InvalidAttempt(format!("sequence `{}`: {e}", sequence.name))
        })?;
    Ok(StepPlan { lead, step, next })
}

fn tally(summary: &mut CycleSummary, delivery: &Delivery) {
    match delivery {
        Delivery::EmailSent { .. } => summary.emails_sent += 1,
        Delivery::TaskCreated {
            kind: FollowUpKind::Call,
            ..
        } => summary.call_tasks_created += 1,
        Delivery::TaskCreated {
            kind: FollowUpKind::Linkedin,
            ..
        } => summary.linkedin_tasks_created += 1,
        Delivery::TaskReused { .. } => {}
    }
}

fn describe(error: &WinbackServiceError) -> String {
    match error {
        WinbackServiceError::Internal(e) => format!("{e:#}"),
        other => other.to_string(),
    }
}
