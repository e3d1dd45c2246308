use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParticipantError {
    #[error("Participant id must not be empty")]
    MissingId,
    #[error("Participant {0} has no usable email")]
    MissingEmail(String),
    #[error("Invalid IANA timezone '{0}'")]
    InvalidTimezone(String),
}

/// Sync progress for one participant. `sync_date` is the last fully
/// persisted day; `sync_epoch` is the newest anchor sample timestamp
/// already uploaded. Both only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub start_date: NaiveDate,
    pub sync_date: Option<NaiveDate>,
    pub sync_epoch: i64,
}

impl Watermark {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            sync_date: None,
            sync_epoch: 0,
        }
    }

    /// Day the next walk resumes from.
    pub fn resume_date(&self) -> NaiveDate {
        self.sync_date.unwrap_or(self.start_date)
    }

    /// Moves the watermark forward, ignoring values that would regress it.
    pub fn advance(&mut self, day: NaiveDate, epoch: i64) {
        if self.sync_date.is_none_or(|current| day >= current) {
            self.sync_date = Some(day);
        }
        if epoch > self.sync_epoch {
            self.sync_epoch = epoch;
        }
    }
}

/// A study participant as the engine needs it: identity, vendor account
/// email and the timezone used for local timestamp renderings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub email: String,
    pub timezone: Tz,
    pub watermark: Watermark,
}

impl Participant {
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        timezone: &str,
        watermark: Watermark,
    ) -> Result<Self, ParticipantError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ParticipantError::MissingId);
        }
        let email = email.into();
        if email.trim().is_empty() {
            return Err(ParticipantError::MissingEmail(id));
        }
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| ParticipantError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self {
            id,
            email,
            timezone,
            watermark,
        })
    }
}
