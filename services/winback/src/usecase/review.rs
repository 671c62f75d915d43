use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use mandate_domain::lead::{LeadClassification, adjust_score};

use crate::domain::repository::{FollowUpTaskRepository, LeadRepository, MailboxRepository};
use crate::domain::types::{LeadSnapshot, WinbackSettings};
use crate::error::WinbackServiceError;

/// The two engagement signals checked over the trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementSignals {
    /// A tracked email to the lead was opened or clicked.
    pub email_engaged: bool,
    /// A call or LinkedIn task for the lead was completed.
    pub outreach_completed: bool,
}

impl EngagementSignals {
    pub fn any(self) -> bool {
        self.email_engaged || self.outreach_completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewDecision {
    pub classification: LeadClassification,
    pub signals: EngagementSignals,
    pub previous_score: i32,
    pub score: i32,
}

impl ReviewDecision {
    pub fn notes(&self) -> String {
        match self.classification {
            LeadClassification::Engaging => format!(
                "lead re-engaged, marked engaging (score {} -> {})",
                self.previous_score, self.score
            ),
            LeadClassification::Irrecoverable => format!(
                "no engagement in window, marked irrecuperable (score {} -> {})",
                self.previous_score, self.score
            ),
        }
    }

    pub fn response(&self) -> serde_json::Value {
        json!({
            "handler": "review",
            "classification": self.classification,
            "email_engaged": self.signals.email_engaged,
            "outreach_completed": self.signals.outreach_completed,
            "previous_score": self.previous_score,
            "score": self.score,
        })
    }
}

/// Either signal wins: engaging with the bonus; otherwise irrecoverable with
/// the penalty, floored at zero.
pub fn decide(
    signals: EngagementSignals,
    score: i32,
    settings: &WinbackSettings,
) -> ReviewDecision {
    let (classification, delta) = if signals.any() {
        (LeadClassification::Engaging, settings.engaging_bonus)
    } else {
        (
            LeadClassification::Irrecoverable,
            -settings.irrecoverable_penalty,
        )
    };
    ReviewDecision {
        classification,
        signals,
        previous_score: score,
        score: adjust_score(score, delta),
    }
}

/// Reads engagement signals and writes the lead's classification.
pub struct ReviewResolver<'a, L, T, M>
where
    L: LeadRepository,
    T: FollowUpTaskRepository,
    M: MailboxRepository,
{
    pub leads: &'a L,
    pub tasks: &'a T,
    pub mailbox: &'a M,
    pub settings: &'a WinbackSettings,
}

impl<L, T, M> ReviewResolver<'_, L, T, M>
where
    L: LeadRepository,
    T: FollowUpTaskRepository,
    M: MailboxRepository,
{
    pub async fn resolve(
        &self,
        lead: &LeadSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ReviewDecision, WinbackServiceError> {
        let since = now - self.settings.engagement_window;
        let signals = EngagementSignals {
            email_engaged: self.mailbox.has_engagement_since(lead.id, since).await?,
            outreach_completed: self.tasks.has_completed_outreach_since(lead.id, since).await?,
        };
        let decision = decide(signals, lead.score, self.settings);
        self.leads
            .classify(lead.id, decision.classification, decision.score, now)
            .await?;
        Ok(decision)
    }
}

/// What to do with a review whose resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPlan {
    Requeue {
        at: DateTime<Utc>,
        retry_count: i32,
    },
    DeadLetter {
        retry_count: i32,
    },
}

/// `retry_count` is the number of failures before this one.
pub fn retry_plan(retry_count: i32, now: DateTime<Utc>, settings: &WinbackSettings) -> RetryPlan {
    let failures = retry_count.max(0) + 1;
    if failures >= settings.review_max_attempts {
        return RetryPlan::DeadLetter {
            retry_count: failures,
        };
    }
    let factor = 1i32 << retry_count.clamp(0, 20);
    let delay = settings
        .review_retry_base
        .checked_mul(factor)
        .unwrap_or(Duration::days(1));
    RetryPlan::Requeue {
        at: now + delay,
        retry_count: failures,
    }
}
