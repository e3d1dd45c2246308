use crate::error::ApiError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use model::participant::{Participant, Watermark};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Custom-field keys the sync reads and writes on directory records.
pub const FIELD_VENDOR_EMAIL: &str = "vendor_email";
pub const FIELD_START_DATE: &str = "start_date";
pub const FIELD_SYNC_DATE: &str = "sync_date";
pub const FIELD_SYNC_EPOCH: &str = "sync_epoch";

/// Wire format of the stored sync epoch.
const EPOCH_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// A participant as the study directory returns it. Custom fields are
/// free-form strings; everything the engine needs is parsed out here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryParticipant {
    #[serde(default)]
    pub participant_identifier: String,
    #[serde(default)]
    pub account_email: Option<String>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub custom_fields: HashMap<String, String>,
    #[serde(default)]
    pub enrollment_date: Option<NaiveDate>,
}

impl DirectoryParticipant {
    fn custom(&self, key: &str) -> Option<&str> {
        self.custom_fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Email the vendor account is registered under. Falls back from the
    /// dedicated custom field to demographics to the account email.
    pub fn preferred_email(&self) -> Result<&str, ApiError> {
        self.custom(FIELD_VENDOR_EMAIL)
            .or(self
                .demographics
                .email
                .as_deref()
                .filter(|v| !v.trim().is_empty()))
            .or(self
                .account_email
                .as_deref()
                .filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| ApiError::MissingField {
                participant_id: self.participant_identifier.clone(),
                field: "email".to_string(),
            })
    }

    /// Reconstructs the watermark from custom fields. Unreadable sync
    /// fields fall back to "never synced" rather than failing the load;
    /// a missing start date is an error because the walk has no origin.
    pub fn watermark(&self) -> Result<Watermark, ApiError> {
        let start_date = self
            .custom(FIELD_START_DATE)
            .and_then(|v| NaiveDate::parse_from_str(v, DATE_FORMAT).ok())
            .or(self.enrollment_date)
            .ok_or_else(|| ApiError::MissingField {
                participant_id: self.participant_identifier.clone(),
                field: FIELD_START_DATE.to_string(),
            })?;

        let sync_date = self
            .custom(FIELD_SYNC_DATE)
            .and_then(|v| NaiveDate::parse_from_str(v, DATE_FORMAT).ok());
        let sync_epoch = self
            .custom(FIELD_SYNC_EPOCH)
            .and_then(parse_epoch)
            .unwrap_or(0);

        Ok(Watermark {
            start_date,
            sync_date,
            sync_epoch,
        })
    }

    pub fn to_participant(&self, default_timezone: &str) -> Result<Participant, ApiError> {
        let email = self.preferred_email()?.to_string();
        let watermark = self.watermark()?;
        let timezone = self
            .demographics
            .time_zone
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default_timezone);
        Ok(Participant::new(
            self.participant_identifier.clone(),
            email,
            timezone,
            watermark,
        )?)
    }
}

/// Renders an epoch for storage; 0 means "never synced" and stays unset.
pub fn render_epoch(epoch: i64) -> Option<String> {
    if epoch <= 0 {
        return None;
    }
    DateTime::from_timestamp(epoch, 0).map(|dt| dt.format(EPOCH_FORMAT).to_string())
}

pub fn parse_epoch(raw: &str) -> Option<i64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, EPOCH_FORMAT) {
        return Some(dt.and_utc().timestamp());
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.timestamp())
}

pub fn render_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
