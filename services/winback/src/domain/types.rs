use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mandate_domain::id::{AttemptId, LeadId, SequenceId};
use mandate_domain::outreach::{FollowUpKind, Priority};

/// Persisted `step_index` of a review attempt.
pub const REVIEW_STEP_INDEX: i32 = -1;

/// Persisted `channel` of a review attempt.
pub const REVIEW_CHANNEL: &str = "review";

/// Subject used when an email step has none.
pub const FALLBACK_SUBJECT: &str = "¿Retomamos la conversación?";

/// Body used when an email step has none.
pub const FALLBACK_BODY: &str = "Hola {{nombre}},\n\n\
    Hace un tiempo hablamos sobre las opciones para {{empresa}}. \
    Nos encantaría saber cómo están las cosas y si podemos ayudarte ahora.\n\n\
    Un saludo.";

// ── Sequences ────────────────────────────────────────────────────────────────

/// One step of a sequence, as stored in the `steps` JSON column.
///
/// `channel` stays a raw string so a sequence with a channel this service
/// cannot deliver still loads; the processor skips such steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "dias", default)]
    pub day_offset: i64,
    #[serde(rename = "canal")]
    pub channel: String,
    #[serde(rename = "asunto", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "mensaje", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(rename = "prioridad", default)]
    pub priority: Priority,
}

/// Named, ordered outreach template.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub id: SequenceId,
    pub name: String,
    pub trigger_condition: Option<String>,
    pub active: bool,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
}

impl Step {
    /// `start + day_offset` days, or `None` when that falls outside the
    /// representable date range.
    pub fn due_from(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_days(self.day_offset).and_then(|offset| start.checked_add_signed(offset))
    }
}

/// A stored step offset that cannot be turned into a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("step {index} offset of {day_offset} days is out of range")]
pub struct OffsetOutOfRange {
    pub index: usize,
    pub day_offset: i64,
}

impl Sequence {
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Offsets should never go backwards; nothing enforces it at write time.
    pub fn offsets_non_decreasing(&self) -> bool {
        self.steps
            .windows(2)
            .all(|pair| pair[0].day_offset <= pair[1].day_offset)
    }

    /// First step whose offset from `start` is not a valid date.
    pub fn check_offsets(&self, start: DateTime<Utc>) -> Result<(), OffsetOutOfRange> {
        match self
            .steps
            .iter()
            .enumerate()
            .find(|(_, step)| step.due_from(start).is_none())
        {
            Some((index, step)) => Err(OffsetOutOfRange {
                index,
                day_offset: step.day_offset,
            }),
            None => Ok(()),
        }
    }

    /// Trimmed, case-insensitive comparison against the trigger condition.
    pub fn matches_lost_reason(&self, lost_reason: &str) -> bool {
        self.trigger_condition
            .as_deref()
            .is_some_and(|trigger| trigger.trim().eq_ignore_ascii_case(lost_reason.trim()))
    }

    /// Step `index + 1` and when it is due, anchored on the sequence start
    /// implied by step `index`'s schedule. `Ok(None)` after the last step.
    pub fn next_step_due(
        &self,
        index: usize,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Option<(usize, &Step, DateTime<Utc>)>, OffsetOutOfRange> {
        let (Some(current), Some(next)) = (self.step(index), self.step(index + 1)) else {
            return Ok(None);
        };
        let sequence_start = Duration::try_days(current.day_offset)
            .and_then(|offset| scheduled_at.checked_sub_signed(offset))
            .ok_or(OffsetOutOfRange {
                index,
                day_offset: current.day_offset,
            })?;
        let due_at = next.due_from(sequence_start).ok_or(OffsetOutOfRange {
            index: index + 1,
            day_offset: next.day_offset,
        })?;
        Ok(Some((index + 1, next, due_at)))
    }
}

// ── Attempts ─────────────────────────────────────────────────────────────────

/// What an attempt executes: a sequence step or the final review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptTarget {
    Step { index: usize },
    Review,
}

impl AttemptTarget {
    /// Decode the persisted column. Negative values other than the review
    /// sentinel are rejected by a check constraint.
    pub fn from_step_index(step_index: i32) -> Self {
        match usize::try_from(step_index) {
            Ok(index) => Self::Step { index },
            Err(_) => Self::Review,
        }
    }

    pub fn step_index(self) -> i32 {
        match self {
            Self::Step { index } => index as i32,
            Self::Review => REVIEW_STEP_INDEX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Skipped,
    Completed,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Lead fields the processor needs, joined onto a claimed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadSnapshot {
    pub id: LeadId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub winback_stage: Option<String>,
    pub score: i32,
}

/// An attempt claimed by the current cycle, with its lead and sequence.
///
/// `lead` / `sequence` are `None` when the referenced row no longer exists.
#[derive(Debug, Clone)]
pub struct DueAttempt {
    pub id: AttemptId,
    pub lead_id: LeadId,
    pub sequence_id: SequenceId,
    pub target: AttemptTarget,
    pub channel: String,
    pub scheduled_at: DateTime<Utc>,
    pub retry_count: i32,
    pub lead: Option<LeadSnapshot>,
    pub sequence: Option<Sequence>,
}

/// A not-yet-persisted `pending` attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttempt {
    pub id: AttemptId,
    pub lead_id: LeadId,
    pub sequence_id: SequenceId,
    pub target: AttemptTarget,
    pub channel: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewAttempt {
    pub fn step(
        lead_id: LeadId,
        sequence_id: SequenceId,
        index: usize,
        step: &Step,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttemptId(Uuid::now_v7()),
            lead_id,
            sequence_id,
            target: AttemptTarget::Step { index },
            channel: step.channel.clone(),
            scheduled_at,
            created_at: now,
        }
    }

    pub fn review(
        lead_id: LeadId,
        sequence_id: SequenceId,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttemptId(Uuid::now_v7()),
            lead_id,
            sequence_id,
            target: AttemptTarget::Review,
            channel: REVIEW_CHANNEL.to_owned(),
            scheduled_at,
            created_at: now,
        }
    }
}

/// Terminal write-back for a processed attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptResult {
    pub status: AttemptStatus,
    pub executed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub response: serde_json::Value,
}

/// Everything written when a step attempt finishes, applied all or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCompletion {
    pub attempt_id: AttemptId,
    pub result: AttemptResult,
    /// Lead whose `last_winback_attempt` moves to `result.executed_at`.
    pub touch_lead: Option<LeadId>,
    /// Next step or review.
    pub follow_up: Option<NewAttempt>,
}

// ── Outreach side effects ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewFollowUpTask {
    pub id: Uuid,
    pub lead_id: LeadId,
    pub kind: FollowUpKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_at: DateTime<Utc>,
    pub attempt_id: AttemptId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailAccount {
    pub id: Uuid,
    pub address: String,
    pub display_name: Option<String>,
}

/// Message handed to the email integration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub account_id: Uuid,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Provider acknowledgement for a sent email.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SentEmail {
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackedEmail {
    pub id: Uuid,
    pub lead_id: LeadId,
    pub account_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
    pub attempt_id: AttemptId,
}

/// Replace `{{nombre}}` and `{{empresa}}` with the lead's name and company.
pub fn render_template(template: &str, lead: &LeadSnapshot) -> String {
    template
        .replace("{{nombre}}", &lead.name)
        .replace("{{empresa}}", lead.company.as_deref().unwrap_or(&lead.name))
}

// ── Cycle ────────────────────────────────────────────────────────────────────

/// Aggregate counters reported by one processor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub processed: u32,
    pub emails_sent: u32,
    pub call_tasks_created: u32,
    pub linkedin_tasks_created: u32,
    pub errors: u32,
    pub leads_engaging: u32,
    pub leads_irrecoverable: u32,
    pub reviews_requeued: u32,
}

/// Tunables of the processor. Defaults match production behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinbackSettings {
    /// Max attempts claimed per cycle.
    pub batch_size: u64,
    /// Delay between the last step and its review.
    pub review_delay: Duration,
    /// Trailing window searched for engagement signals.
    pub engagement_window: Duration,
    pub engaging_bonus: i32,
    pub irrecoverable_penalty: i32,
    /// A `processing` row older than this is considered abandoned and reclaimed.
    pub claim_lease: Duration,
    /// Failed review resolutions allowed before dead-lettering.
    pub review_max_attempts: i32,
    /// First retry delay; doubles with each failure.
    pub review_retry_base: Duration,
}

impl Default for WinbackSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            review_delay: Duration::days(7),
            engagement_window: Duration::days(30),
            engaging_bonus: 20,
            irrecoverable_penalty: 10,
            claim_lease: Duration::minutes(15),
            review_max_attempts: 3,
            review_retry_base: Duration::hours(1),
        }
    }
}
