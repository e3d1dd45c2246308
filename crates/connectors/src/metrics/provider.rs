use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use model::metric::DailyMetrics;

/// Source of one participant-day of vendor metrics. The HTTP client is
/// the production implementation; the fixture provider serves canned
/// payloads for dry runs and tests. Selected by configuration.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch(&self, email: &str, date: NaiveDate) -> Result<DailyMetrics, ApiError>;
}
