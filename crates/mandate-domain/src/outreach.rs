//! Outreach vocabulary: channels a sequence step can use and task priorities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Channel a sequence step is delivered through.
///
/// Wire format: lowercase name (`"email"`, `"call"`, `"linkedin"`, `"whatsapp"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Call,
    Linkedin,
    Whatsapp,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Call => "call",
            Self::Linkedin => "linkedin",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel `{0}`")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "call" => Ok(Self::Call),
            "linkedin" => Ok(Self::Linkedin),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(UnknownChannel(other.to_owned())),
        }
    }
}

/// Priority carried from a sequence step onto the follow-up task it creates.
///
/// The CRM stores step priorities in Spanish (`alta`/`media`/`baja`); both
/// spellings are accepted, English is written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "baja")]
    Low,
    #[default]
    #[serde(alias = "media")]
    Medium,
    #[serde(alias = "alta")]
    High,
    #[serde(alias = "urgente")]
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Kind of follow-up task the processor creates for a human to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowUpKind {
    Call,
    Linkedin,
}

impl FollowUpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Linkedin => "linkedin",
        }
    }
}
