use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, Statement,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use mandate_domain::id::{AttemptId, LeadId, SequenceId};
use mandate_domain::lead::LeadClassification;
use mandate_domain::outreach::FollowUpKind;
use mandate_winback_schema::{
    email_accounts, followup_tasks, leads, system_logs, tracked_emails, winback_attempts,
    winback_sequences,
};

use crate::domain::repository::{
    AttemptRepository, AuditLog, FollowUpTaskRepository, LeadRepository, MailboxRepository,
    SequenceRepository,
};
use crate::domain::types::{
    AttemptResult, AttemptStatus, AttemptTarget, CycleSummary, DueAttempt, EmailAccount,
    LeadSnapshot, NewAttempt, NewFollowUpTask, NewTrackedEmail, Sequence, Step, StepCompletion,
};
use crate::error::WinbackServiceError;

const TASK_STATUS_PENDING: &str = "pending";
const TASK_STATUS_COMPLETED: &str = "completed";
const TASK_STATUS_CANCELLED: &str = "cancelled";

const AUDIT_SOURCE: &str = "winback-processor";

// ── Attempt repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAttemptRepository {
    pub db: DatabaseConnection,
}

/// Claims due rows and joins the lead and sequence in one statement. The
/// inner `SKIP LOCKED` select keeps overlapping cycles off each other's rows.
const CLAIM_DUE_SQL: &str = r#"
    WITH claimed AS (
        UPDATE winback_attempts
        SET status = 'processing', claimed_at = $1
        WHERE id IN (
            SELECT id FROM winback_attempts
            WHERE (status = 'pending' AND scheduled_at <= $1)
               OR (status = 'processing' AND claimed_at <= $2)
            ORDER BY scheduled_at, step_index
            LIMIT $3
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, lead_id, sequence_id, step_index, channel, scheduled_at, retry_count
    )
    SELECT
        c.id, c.lead_id, c.sequence_id, c.step_index, c.channel, c.scheduled_at, c.retry_count,
        l.id AS lead_ref, l.name AS lead_name, l.email AS lead_email, l.phone AS lead_phone,
        l.company AS lead_company, l.winback_stage AS lead_stage, l.score AS lead_score,
        s.id AS sequence_ref, s.name AS sequence_name, s.trigger_condition AS sequence_trigger,
        s.active AS sequence_active, s.steps AS sequence_steps,
        s.created_at AS sequence_created_at
    FROM claimed c
    LEFT JOIN leads l ON l.id = c.lead_id
    LEFT JOIN winback_sequences s ON s.id = c.sequence_id
    ORDER BY c.scheduled_at, c.step_index
"#;

#[derive(Debug, FromQueryResult)]
struct ClaimedRow {
    id: Uuid,
    lead_id: Uuid,
    sequence_id: Uuid,
    step_index: i32,
    channel: String,
    scheduled_at: DateTime<Utc>,
    retry_count: i32,
    lead_ref: Option<Uuid>,
    lead_name: Option<String>,
    lead_email: Option<String>,
    lead_phone: Option<String>,
    lead_company: Option<String>,
    lead_stage: Option<String>,
    lead_score: Option<i32>,
    sequence_ref: Option<Uuid>,
    sequence_name: Option<String>,
    sequence_trigger: Option<String>,
    sequence_active: Option<bool>,
    sequence_steps: Option<serde_json::Value>,
    sequence_created_at: Option<DateTime<Utc>>,
}

impl ClaimedRow {
    fn into_due(self) -> DueAttempt {
        let lead = self.lead_ref.map(|id| LeadSnapshot {
            id: LeadId(id),
            name: self.lead_name.unwrap_or_default(),
            email: self.lead_email,
            phone: self.lead_phone,
            company: self.lead_company,
            winback_stage: self.lead_stage,
            score: self.lead_score.unwrap_or_default(),
        });
        let sequence = self.sequence_ref.map(|id| {
            // A malformed steps column leaves the sequence without steps, which
            // fails the attempt instead of the whole cycle.
            let steps = self
                .sequence_steps
                .map(decode_steps)
                .transpose()
                .unwrap_or_else(|e| {
                    tracing::warn!(sequence_id = %id, error = %e, "undecodable sequence steps");
                    None
                })
                .unwrap_or_default();
            Sequence {
                id: SequenceId(id),
                name: self.sequence_name.unwrap_or_default(),
                trigger_condition: self.sequence_trigger,
                active: self.sequence_active.unwrap_or_default(),
                steps,
                created_at: self.sequence_created_at.unwrap_or_default(),
            }
        });
        DueAttempt {
            id: AttemptId(self.id),
            lead_id: LeadId(self.lead_id),
            sequence_id: SequenceId(self.sequence_id),
            target: AttemptTarget::from_step_index(self.step_index),
            channel: self.channel,
            scheduled_at: self.scheduled_at,
            retry_count: self.retry_count,
            lead,
            sequence,
        }
    }
}

impl AttemptRepository for DbAttemptRepository {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease_cutoff: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<DueAttempt>, WinbackServiceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = ClaimedRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            CLAIM_DUE_SQL,
            [now.into(), lease_cutoff.into(), limit.into()],
        ))
        .all(&self.db)
        .await
        .context("claim due winback attempts")?;

        Ok(rows.into_iter().map(ClaimedRow::into_due).collect())
    }

    async fn record_result(
        &self,
        id: AttemptId,
        result: &AttemptResult,
    ) -> Result<(), WinbackServiceError> {
        write_result(&self.db, id, result)
            .await
            .context("record winback attempt result")?;
        Ok(())
    }

    async fn complete_step(&self, completion: &StepCompletion) -> Result<(), WinbackServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let completion = completion.clone();
                Box::pin(async move {
                    write_result(txn, completion.attempt_id, &completion.result).await?;
                    if let Some(lead_id) = completion.touch_lead {
                        touch_lead(txn, lead_id, completion.result.executed_at).await?;
                    }
                    if let Some(next) = &completion.follow_up {
                        insert_attempt(txn, next).await?;
                    }
                    Ok(())
                })
            })
            .await
            .context("complete winback step attempt")?;
        Ok(())
    }

    async fn enqueue(&self, attempt: &NewAttempt) -> Result<(), WinbackServiceError> {
        insert_attempt(&self.db, attempt)
            .await
            .context("enqueue winback attempt")?;
        Ok(())
    }

    async fn reschedule(
        &self,
        id: AttemptId,
        at: DateTime<Utc>,
        retry_count: i32,
        notes: &str,
    ) -> Result<(), WinbackServiceError> {
        winback_attempts::ActiveModel {
            id: Set(id.0),
            status: Set(AttemptStatus::Pending.as_str().to_owned()),
            scheduled_at: Set(at),
            retry_count: Set(retry_count),
            notes: Set(Some(notes.to_owned())),
            claimed_at: Set(None),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("reschedule winback attempt")?;
        Ok(())
    }

    async fn has_open_in_sequence(
        &self,
        lead_id: LeadId,
        sequence_id: SequenceId,
    ) -> Result<bool, WinbackServiceError> {
        let open = winback_attempts::Entity::find()
            .filter(winback_attempts::Column::LeadId.eq(lead_id.0))
            .filter(winback_attempts::Column::SequenceId.eq(sequence_id.0))
            .filter(winback_attempts::Column::Status.is_in([
                AttemptStatus::Pending.as_str(),
                AttemptStatus::Processing.as_str(),
            ]))
            .one(&self.db)
            .await
            .context("find open winback attempt")?;
        Ok(open.is_some())
    }
}

async fn write_result<C: ConnectionTrait>(
    db: &C,
    id: AttemptId,
    result: &AttemptResult,
) -> Result<(), sea_orm::DbErr> {
    winback_attempts::ActiveModel {
        id: Set(id.0),
        status: Set(result.status.as_str().to_owned()),
        executed_at: Set(Some(result.executed_at)),
        notes: Set(result.notes.clone()),
        response: Set(Some(result.response.clone())),
        claimed_at: Set(None),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

async fn insert_attempt<C: ConnectionTrait>(
    db: &C,
    attempt: &NewAttempt,
) -> Result<(), sea_orm::DbErr> {
    winback_attempts::ActiveModel {
        id: Set(attempt.id.0),
        lead_id: Set(attempt.lead_id.0),
        sequence_id: Set(attempt.sequence_id.0),
        step_index: Set(attempt.target.step_index()),
        channel: Set(attempt.channel.clone()),
        scheduled_at: Set(attempt.scheduled_at),
        status: Set(AttemptStatus::Pending.as_str().to_owned()),
        claimed_at: Set(None),
        executed_at: Set(None),
        notes: Set(None),
        response: Set(None),
        retry_count: Set(0),
        created_at: Set(attempt.created_at),
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn touch_lead<C: ConnectionTrait>(
    db: &C,
    id: LeadId,
    at: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    leads::Entity::update_many()
        .col_expr(leads::Column::LastWinbackAttempt, Expr::value(at))
        .col_expr(leads::Column::UpdatedAt, Expr::value(at))
        .filter(leads::Column::Id.eq(id.0))
        .exec(db)
        .await?;
    Ok(())
}

// ── Sequence repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSequenceRepository {
    pub db: DatabaseConnection,
}

impl SequenceRepository for DbSequenceRepository {
    async fn find_by_id(&self, id: SequenceId) -> Result<Option<Sequence>, WinbackServiceError> {
        let model = winback_sequences::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find winback sequence by id")?;
        Ok(model.map(sequence_from_model).transpose()?)
    }

    async fn list_active(&self) -> Result<Vec<Sequence>, WinbackServiceError> {
        let models = winback_sequences::Entity::find()
            .filter(winback_sequences::Column::Active.eq(true))
            .order_by_asc(winback_sequences::Column::CreatedAt)
            .order_by_asc(winback_sequences::Column::Id)
            .all(&self.db)
            .await
            .context("list active winback sequences")?;
        Ok(models
            .into_iter()
            .map(sequence_from_model)
            .collect::<anyhow::Result<_>>()?)
    }
}

fn decode_steps(steps: serde_json::Value) -> anyhow::Result<Vec<Step>> {
    serde_json::from_value(steps).context("decode sequence steps")
}

fn sequence_from_model(model: winback_sequences::Model) -> anyhow::Result<Sequence> {
    Ok(Sequence {
        id: SequenceId(model.id),
        name: model.name,
        trigger_condition: model.trigger_condition,
        active: model.active,
        steps: decode_steps(model.steps)
            .with_context(|| format!("sequence {}", model.id))?,
        created_at: model.created_at,
    })
}

// ── Lead repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLeadRepository {
    pub db: DatabaseConnection,
}

impl LeadRepository for DbLeadRepository {
    async fn find_by_id(&self, id: LeadId) -> Result<Option<LeadSnapshot>, WinbackServiceError> {
        let model = leads::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .context("find lead by id")?;
        Ok(model.map(|m| LeadSnapshot {
            id: LeadId(m.id),
            name: m.name,
            email: m.email,
            phone: m.phone,
            company: m.company,
            winback_stage: m.winback_stage,
            score: m.score,
        }))
    }

    async fn classify(
        &self,
        id: LeadId,
        classification: LeadClassification,
        score: i32,
        at: DateTime<Utc>,
    ) -> Result<(), WinbackServiceError> {
        leads::Entity::update_many()
            .col_expr(
                leads::Column::WinbackStage,
                Expr::value(classification.stage_label()),
            )
            .col_expr(leads::Column::Score, Expr::value(score))
            .col_expr(leads::Column::UpdatedAt, Expr::value(at))
            .filter(leads::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .context("classify lead")?;
        Ok(())
    }
}

// ── Follow-up task repository ────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbFollowUpTaskRepository {
    pub db: DatabaseConnection,
}

impl FollowUpTaskRepository for DbFollowUpTaskRepository {
    async fn find_open_for_attempt(
        &self,
        attempt_id: AttemptId,
    ) -> Result<Option<Uuid>, WinbackServiceError> {
        let model = followup_tasks::Entity::find()
            .filter(followup_tasks::Column::WinbackAttemptId.eq(attempt_id.0))
            .filter(
                followup_tasks::Column::Status
                    .is_not_in([TASK_STATUS_COMPLETED, TASK_STATUS_CANCELLED]),
            )
            .order_by_asc(followup_tasks::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find open follow-up task for attempt")?;
        Ok(model.map(|m| m.id))
    }

    async fn create(&self, task: &NewFollowUpTask) -> Result<(), WinbackServiceError> {
        followup_tasks::ActiveModel {
            id: Set(task.id),
            lead_id: Set(task.lead_id.0),
            task_type: Set(task.kind.as_str().to_owned()),
            title: Set(task.title.clone()),
            description: Set(Some(task.description.clone()).filter(|d| !d.is_empty())),
            priority: Set(task.priority.as_str().to_owned()),
            status: Set(TASK_STATUS_PENDING.to_owned()),
            due_at: Set(task.due_at),
            winback_attempt_id: Set(Some(task.attempt_id.0)),
            created_at: Set(task.created_at),
            updated_at: Set(task.created_at),
        }
        .insert(&self.db)
        .await
        .context("create follow-up task")?;
        Ok(())
    }

    async fn has_completed_outreach_since(
        &self,
        lead_id: LeadId,
        since: DateTime<Utc>,
    ) -> Result<bool, WinbackServiceError> {
        let model = followup_tasks::Entity::find()
            .filter(followup_tasks::Column::LeadId.eq(lead_id.0))
            .filter(followup_tasks::Column::TaskType.is_in([
                FollowUpKind::Call.as_str(),
                FollowUpKind::Linkedin.as_str(),
            ]))
            .filter(followup_tasks::Column::Status.eq(TASK_STATUS_COMPLETED))
            .filter(followup_tasks::Column::UpdatedAt.gte(since))
            .one(&self.db)
            .await
            .context("find completed outreach task")?;
        Ok(model.is_some())
    }
}

// ── Mailbox repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbMailboxRepository {
    pub db: DatabaseConnection,
}

impl MailboxRepository for DbMailboxRepository {
    async fn first_active_account(&self) -> Result<Option<EmailAccount>, WinbackServiceError> {
        let model = email_accounts::Entity::find()
            .filter(email_accounts::Column::IsActive.eq(true))
            .order_by_asc(email_accounts::Column::CreatedAt)
            .order_by_asc(email_accounts::Column::Id)
            .one(&self.db)
            .await
            .context("find active email account")?;
        Ok(model.map(|m| EmailAccount {
            id: m.id,
            address: m.email_address,
            display_name: m.display_name,
        }))
    }

    async fn record_sent(&self, email: &NewTrackedEmail) -> Result<(), WinbackServiceError> {
        tracked_emails::ActiveModel {
            id: Set(email.id),
            lead_id: Set(Some(email.lead_id.0)),
            email_account_id: Set(email.account_id),
            recipient: Set(email.recipient.clone()),
            subject: Set(email.subject.clone()),
            sent_at: Set(email.sent_at),
            open_count: Set(0),
            click_count: Set(0),
            winback_attempt_id: Set(Some(email.attempt_id.0)),
        }
        .insert(&self.db)
        .await
        .context("record tracked email")?;
        Ok(())
    }

    async fn has_engagement_since(
        &self,
        lead_id: LeadId,
        since: DateTime<Utc>,
    ) -> Result<bool, WinbackServiceError> {
        let model = tracked_emails::Entity::find()
            .filter(tracked_emails::Column::LeadId.eq(lead_id.0))
            .filter(tracked_emails::Column::SentAt.gte(since))
            .filter(
                Condition::any()
                    .add(tracked_emails::Column::OpenCount.gt(0))
                    .add(tracked_emails::Column::ClickCount.gt(0)),
            )
            .one(&self.db)
            .await
            .context("find engaged tracked email")?;
        Ok(model.is_some())
    }
}

// ── Audit log ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAuditLog {
    pub db: DatabaseConnection,
}

impl AuditLog for DbAuditLog {
    async fn record_cycle(
        &self,
        now: DateTime<Utc>,
        summary: &CycleSummary,
    ) -> Result<(), WinbackServiceError> {
        let level = if summary.errors > 0 { "warn" } else { "info" };
        let details = serde_json::to_value(summary).context("serialize cycle summary")?;
        system_logs::ActiveModel {
            id: Set(Uuid::now_v7()),
            level: Set(level.to_owned()),
            source: Set(AUDIT_SOURCE.to_owned()),
            message: Set(format!(
                "winback cycle processed {} attempts ({} errors)",
                summary.processed, summary.errors
            )),
            details: Set(details),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await
        .context("write winback audit entry")?;
        Ok(())
    }
}
