use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use mandate_domain::outreach::{Channel, FollowUpKind};

use crate::domain::repository::{EmailGateway, FollowUpTaskRepository, MailboxRepository};
use crate::domain::types::{
    AttemptStatus, DueAttempt, FALLBACK_BODY, FALLBACK_SUBJECT, LeadSnapshot, NewFollowUpTask,
    NewTrackedEmail, OutgoingEmail, Step, render_template,
};
use crate::error::WinbackServiceError;

/// Why a step attempt did not deliver.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no active email account configured")]
    NoChannelAccountConfigured,
    #[error("unsupported channel `{0}`")]
    UnsupportedChannel(String),
    #[error("channel write failed: {0}")]
    ChannelWriteFailure(#[from] WinbackServiceError),
    #[error("{0}")]
    InvalidAttempt(String),
}

impl DispatchError {
    /// Configuration gaps and unsupported channels are expected outcomes,
    /// not cycle errors.
    pub fn counts_as_error(&self) -> bool {
        matches!(self, Self::ChannelWriteFailure(_) | Self::InvalidAttempt(_))
    }

    pub fn status(&self) -> AttemptStatus {
        match self {
            Self::UnsupportedChannel(_) => AttemptStatus::Skipped,
            _ => AttemptStatus::Failed,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NoChannelAccountConfigured => "NO_CHANNEL_ACCOUNT",
            Self::UnsupportedChannel(_) => "UNSUPPORTED_CHANNEL",
            Self::ChannelWriteFailure(_) => "CHANNEL_WRITE_FAILURE",
            Self::InvalidAttempt(_) => "INVALID_ATTEMPT",
        }
    }

    /// Note stored on the attempt. Internal errors keep their context chain.
    pub fn notes(&self) -> String {
        match self {
            Self::ChannelWriteFailure(WinbackServiceError::Internal(e)) => {
                format!("channel write failed: {e:#}")
            }
            other => other.to_string(),
        }
    }

    pub fn response(&self) -> serde_json::Value {
        json!({ "error": self.code() })
    }
}

/// Successful outcome of a step attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    EmailSent {
        account_id: Uuid,
        /// `None` when the send went out but tracking could not be recorded.
        tracked_email_id: Option<Uuid>,
        recipient: String,
        message_id: Option<String>,
    },
    TaskCreated {
        kind: FollowUpKind,
        task_id: Uuid,
    },
    /// An open task already existed for this attempt.
    TaskReused {
        kind: FollowUpKind,
        task_id: Uuid,
    },
}

impl Delivery {
    pub fn notes(&self) -> String {
        match self {
            Self::EmailSent { recipient, .. } => format!("email sent to {recipient}"),
            Self::TaskCreated { kind, .. } => format!("{} task created", kind.as_str()),
            Self::TaskReused { kind, .. } => {
                format!("{} task already open, not duplicated", kind.as_str())
            }
        }
    }

    pub fn response(&self) -> serde_json::Value {
        match self {
            Self::EmailSent {
                account_id,
                tracked_email_id,
                message_id,
                ..
            } => json!({
                "handler": "email",
                "account_id": account_id,
                "tracked_email_id": tracked_email_id,
                "message_id": message_id,
            }),
            Self::TaskCreated { kind, task_id } => json!({
                "handler": kind.as_str(),
                "task_id": task_id,
            }),
            Self::TaskReused { kind, task_id } => json!({
                "handler": kind.as_str(),
                "task_id": task_id,
                "deduplicated": true,
            }),
        }
    }
}

/// Executes one step attempt against its channel.
pub struct Dispatcher<'a, T, M, G>
where
    T: FollowUpTaskRepository,
    M: MailboxRepository,
    G: EmailGateway,
{
    pub tasks: &'a T,
    pub mailbox: &'a M,
    pub gateway: &'a G,
}

impl<T, M, G> Dispatcher<'_, T, M, G>
where
    T: FollowUpTaskRepository,
    M: MailboxRepository,
    G: EmailGateway,
{
    pub async fn dispatch(
        &self,
        attempt: &DueAttempt,
        lead: &LeadSnapshot,
        step: &Step,
        now: DateTime<Utc>,
    ) -> Result<Delivery, DispatchError> {
        let channel: Channel = attempt
            .channel
            .parse()
            .map_err(|_| DispatchError::UnsupportedChannel(attempt.channel.clone()))?;

        match channel {
            Channel::Email => self.send_email(attempt, lead, step, now).await,
            Channel::Call => self.open_task(FollowUpKind::Call, attempt, lead, step, now).await,
            Channel::Linkedin => {
                self.open_task(FollowUpKind::Linkedin, attempt, lead, step, now)
                    .await
            }
            Channel::Whatsapp => Err(DispatchError::UnsupportedChannel(
                channel.as_str().to_owned(),
            )),
        }
    }

    async fn send_email(
        &self,
        attempt: &DueAttempt,
        lead: &LeadSnapshot,
        step: &Step,
        now: DateTime<Utc>,
    ) -> Result<Delivery, DispatchError> {
        let account = self
            .mailbox
            .first_active_account()
            .await?
            .ok_or(DispatchError::NoChannelAccountConfigured)?;
        let recipient = lead
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| DispatchError::InvalidAttempt("lead has no email address".into()))?;

        let email = OutgoingEmail {
            account_id: account.id,
            to: recipient.clone(),
            subject: render_template(step.subject.as_deref().unwrap_or(FALLBACK_SUBJECT), lead),
            body: render_template(step.message.as_deref().unwrap_or(FALLBACK_BODY), lead),
        };
        let sent = self.gateway.send(&email).await?;

        let tracked = NewTrackedEmail {
            id: Uuid::now_v7(),
            lead_id: lead.id,
            account_id: account.id,
            recipient: recipient.clone(),
            subject: email.subject,
            sent_at: now,
            attempt_id: attempt.id,
        };
        // The message is already out; losing the tracking row must not flip the outcome.
        let tracked_email_id = match self.mailbox.record_sent(&tracked).await {
            Ok(()) => Some(tracked.id),
            Err(e) => {
                tracing::warn!(
                    attempt_id = %attempt.id,
                    error = %e,
                    "failed to record tracked email"
                );
                None
            }
        };

        Ok(Delivery::EmailSent {
            account_id: account.id,
            tracked_email_id,
            recipient,
            message_id: sent.message_id,
        })
    }

    async fn open_task(
        &self,
        kind: FollowUpKind,
        attempt: &DueAttempt,
        lead: &LeadSnapshot,
        step: &Step,
        now: DateTime<Utc>,
    ) -> Result<Delivery, DispatchError> {
        if let Some(task_id) = self.tasks.find_open_for_attempt(attempt.id).await? {
            return Ok(Delivery::TaskReused { kind, task_id });
        }

        let task = NewFollowUpTask {
            id: Uuid::now_v7(),
            lead_id: lead.id,
            kind,
            title: task_title(kind, lead),
            description: task_description(kind, lead, step),
            priority: step.priority,
            due_at: now,
            attempt_id: attempt.id,
            created_at: now,
        };
        self.tasks.create(&task).await?;
        Ok(Delivery::TaskCreated {
            kind,
            task_id: task.id,
        })
    }
}

fn task_title(kind: FollowUpKind, lead: &LeadSnapshot) -> String {
    match kind {
        FollowUpKind::Call => format!("Llamada winback: {}", lead.name),
        FollowUpKind::Linkedin => format!("Mensaje LinkedIn winback: {}", lead.name),
    }
}

fn task_description(kind: FollowUpKind, lead: &LeadSnapshot, step: &Step) -> String {
    let content = match kind {
        FollowUpKind::Call => step.script.as_deref().or(step.message.as_deref()),
        FollowUpKind::Linkedin => step.message.as_deref().or(step.script.as_deref()),
    };
    let mut description = content
        .map(|text| render_template(text, lead))
        .unwrap_or_default();
    if kind == FollowUpKind::Call {
        if let Some(phone) = lead.phone.as_deref() {
            if !description.is_empty() {
                description.push_str("\n\n");
            }
            description.push_str("Teléfono: ");
            description.push_str(phone);
        }
    }
    description
}
