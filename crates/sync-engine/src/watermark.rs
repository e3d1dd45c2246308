use async_trait::async_trait;
use chrono::NaiveDate;
use connectors::directory::client::DirectoryClient;
use connectors::error::ApiError;
use model::participant::Watermark;
use std::sync::Mutex;

/// Persists a participant's advanced watermark after a day lands.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn update(
        &self,
        participant_id: &str,
        day: NaiveDate,
        watermark: &Watermark,
    ) -> Result<(), ApiError>;
}

#[async_trait]
impl WatermarkStore for DirectoryClient {
    async fn update(
        &self,
        participant_id: &str,
        day: NaiveDate,
        watermark: &Watermark,
    ) -> Result<(), ApiError> {
        self.update_watermark(participant_id, day, watermark).await
    }
}

/// In-memory store for tests and local dry runs where the participant
/// directory should not be written. Keeps every update so callers can
/// assert on persistence order.
#[derive(Default)]
pub struct MemoryWatermarkStore {
    updates: Mutex<Vec<(String, NaiveDate, Watermark)>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest watermark persisted for a participant, if any.
    pub fn get(&self, participant_id: &str) -> Option<Watermark> {
        match self.updates.lock() {
            Ok(updates) => updates
                .iter()
                .rev()
                .find(|(id, _, _)| id == participant_id)
                .map(|(_, _, watermark)| *watermark),
            Err(_) => None,
        }
    }

    pub fn update_count(&self) -> usize {
        match self.updates.lock() {
            Ok(updates) => updates.len(),
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn update(
        &self,
        participant_id: &str,
        day: NaiveDate,
        watermark: &Watermark,
    ) -> Result<(), ApiError> {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push((participant_id.to_string(), day, *watermark));
        }
        Ok(())
    }
}
