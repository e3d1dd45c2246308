use crate::directory::types::{
    DirectoryParticipant, FIELD_SYNC_DATE, FIELD_SYNC_EPOCH, render_date, render_epoch,
};
use crate::error::ApiError;
use chrono::NaiveDate;
use model::participant::Watermark;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub project_id: String,
    pub token: String,
}

impl DirectoryConfig {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project_id: project_id.into(),
            token: token.into(),
        }
    }
}

/// Client for the study directory that owns participant records and the
/// custom fields the watermark persists into.
pub struct DirectoryClient {
    client: reqwest::Client,
    config: DirectoryConfig,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn participant_url(&self, participant_id: &str) -> String {
        format!(
            "{}/api/v1/projects/{}/participants/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            participant_id
        )
    }

    pub async fn get_participant(
        &self,
        participant_id: &str,
    ) -> Result<DirectoryParticipant, ApiError> {
        let response = self
            .client
            .get(self.participant_url(participant_id))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Writes the watermark into the participant's custom fields. An epoch
    /// of 0 means nothing was ever uploaded; there is no progress worth
    /// recording, so the call is skipped.
    pub async fn update_watermark(
        &self,
        participant_id: &str,
        day: NaiveDate,
        watermark: &Watermark,
    ) -> Result<(), ApiError> {
        let Some(epoch) = render_epoch(watermark.sync_epoch) else {
            debug!(
                participant_id = %participant_id,
                "Skipping watermark update, no uploaded samples yet"
            );
            return Ok(());
        };

        let body = json!({
            "customFields": {
                FIELD_SYNC_DATE: render_date(day),
                FIELD_SYNC_EPOCH: epoch,
            }
        });
        let response = self
            .client
            .patch(self.participant_url(participant_id))
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!(
            participant_id = %participant_id,
            sync_date = %day,
            "Watermark persisted to directory"
        );
        Ok(())
    }
}
