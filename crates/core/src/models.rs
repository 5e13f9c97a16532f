use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::validation::MIN_RECIPIENT_DIGITS;

/// Destination number in international format, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    /// Strips every non-digit character and accepts the result when it has
    /// at least [`MIN_RECIPIENT_DIGITS`] digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < MIN_RECIPIENT_DIGITS {
            return None;
        }
        Some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pre-approved template sent ahead of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    pub language: String,
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.language)
    }
}

/// Document uploaded once per run and referenced by every send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub asset_id: String,
    pub mime_type: String,
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Delivered {
        template_message_id: Option<String>,
        document_message_id: String,
    },
    Failed {
        error: String,
    },
}

/// Result of one recipient's iteration in the send loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub recipient: Recipient,
    pub status: OutcomeStatus,
    pub timestamp: DateTime<Utc>,
}

impl DeliveryOutcome {
    pub fn delivered(
        recipient: Recipient,
        template_message_id: Option<String>,
        document_message_id: String,
    ) -> Self {
        Self {
            recipient,
            status: OutcomeStatus::Delivered {
                template_message_id,
                document_message_id,
            },
            timestamp: Utc::now(),
        }
    }

    pub fn failed(recipient: Recipient, error: String) -> Self {
        Self {
            recipient,
            status: OutcomeStatus::Failed { error },
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Delivered { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Failed { error } => Some(error),
            OutcomeStatus::Delivered { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_outcomes(
        outcomes: &[DeliveryOutcome],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let elapsed = (finished_at - started_at).to_std().unwrap_or_default();
        Self {
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            started_at,
            finished_at,
            elapsed,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
