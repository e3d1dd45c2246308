use crate::error::ApiError;
use crate::metrics::provider::MetricsProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use model::metric::{DailyMetrics, MetricsResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Email substituted for every participant when running against the
/// vendor's development environment, which only knows this account.
const DEVELOPMENT_EMAIL: &str = "dev-participant@example.org";

/// Date formats accepted for target dates, tried in order. Slash dates
/// read month-first (US order); datetime forms keep only the date part.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y%m%d",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn from_name(name: &str) -> Option<Environment> {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }

    /// The development environment serves data for a single account only.
    pub fn effective_email<'a>(&self, email: &'a str) -> &'a str {
        match self {
            Environment::Production => email,
            Environment::Development => DEVELOPMENT_EMAIL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub base_url: String,
    pub api_key: String,
    pub environment: Environment,
}

impl VendorConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            environment: Environment::Production,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

/// HTTP client for the vendor's partner metrics endpoint.
pub struct MetricsApi {
    client: reqwest::Client,
    config: VendorConfig,
}

impl MetricsApi {
    pub fn new(config: VendorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetches one day of metrics for a participant email.
    pub async fn get_metrics(&self, email: &str, date: NaiveDate) -> Result<DailyMetrics, ApiError> {
        let email = self.config.environment.effective_email(email);
        let url = format!("{}/metrics", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, date = %date, "Requesting vendor metrics");

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.config.api_key)
            .query(&[("email", email), ("date", &date.format("%Y-%m-%d").to_string())])
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
        let envelope: MetricsResponse = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl MetricsProvider for MetricsApi {
    async fn fetch(&self, email: &str, date: NaiveDate) -> Result<DailyMetrics, ApiError> {
        self.get_metrics(email, date).await
    }
}

/// Parses a user-supplied target date, accepting the handful of formats
/// operators actually type.
pub fn parse_target_date(raw: &str) -> Result<NaiveDate, ApiError> {
    let trimmed = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(ApiError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_date_formats() {
        let expected: NaiveDate = "2025-09-02".parse().unwrap();
        for raw in [
            "2025-09-02",
            "2025-09-02T08:15:00",
            "2025-09-02T08:15:00Z",
            "2025-09-02 08:15:00",
            "09/02/2025",
            "02-09-2025",
            "20250902",
            " 2025-09-02 ",
        ] {
            assert_eq!(parse_target_date(raw).unwrap(), expected, "format {raw}");
        }
    }

    #[test]
    fn slash_dates_read_month_first() {
        let march_fourth: NaiveDate = "2025-03-04".parse().unwrap();
        assert_eq!(parse_target_date("03/04/2025").unwrap(), march_fourth);
    }

    #[test]
    fn rejects_unknown_date_formats() {
        for raw in ["Sep 2 2025", "2025-13-40", "2025/09/02", ""] {
            assert!(matches!(parse_target_date(raw), Err(ApiError::InvalidDate(_))));
        }
    }

    #[test]
    fn development_environment_overrides_email() {
        assert_eq!(
            Environment::Development.effective_email("p@example.org"),
            DEVELOPMENT_EMAIL
        );
        assert_eq!(
            Environment::Production.effective_email("p@example.org"),
            "p@example.org"
        );
    }

    #[test]
    fn environment_from_name() {
        assert_eq!(Environment::from_name("prod"), Some(Environment::Production));
        assert_eq!(Environment::from_name("Development"), Some(Environment::Development));
        assert_eq!(Environment::from_name("staging"), None);
    }
}
