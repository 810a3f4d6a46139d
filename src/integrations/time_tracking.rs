use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use super::{join_url, send_json, IntegrationError};

const PROVIDER: &str = "time tracking provider";

/// One day of tracked time as reported by the provider, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackedDay {
    pub date: NaiveDate,
    pub total_seconds: u64,
    #[serde(default)]
    pub productive_seconds: Option<u64>,
}

impl TrackedDay {
    pub fn total_hours(&self) -> f64 {
        seconds_to_hours(self.total_seconds)
    }

    /// Falls back to the total when the provider did not split out productive time.
    pub fn productive_hours(&self) -> f64 {
        self.productive_seconds
            .map(seconds_to_hours)
            .unwrap_or_else(|| self.total_hours())
            .min(self.total_hours())
    }
}

fn seconds_to_hours(seconds: u64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

#[async_trait]
pub trait TimeTrackingProvider: Send + Sync + 'static {
    async fn time_entries(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrackedDay>, IntegrationError>;
}

#[derive(Deserialize)]
struct TimeTrackingPage {
    data: Vec<TrackedDay>,
}

pub struct InsightfulClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl InsightfulClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl TimeTrackingProvider for InsightfulClient {
    async fn time_entries(
        &self,
        employee_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrackedDay>, IntegrationError> {
        let page: TimeTrackingPage = send_json(
            PROVIDER,
            self.client
                .get(join_url(&self.base_url, "time-tracking"))
                .bearer_auth(&self.api_key)
                .query(&[
                    ("employee_id", employee_id.to_string()),
                    ("date_from", start.format("%Y-%m-%d").to_string()),
                    ("date_to", end.format("%Y-%m-%d").to_string()),
                ]),
        )
        .await?;
        Ok(page.data)
    }
}

pub struct MockTimeTracking;

#[async_trait]
impl TimeTrackingProvider for MockTimeTracking {
    async fn time_entries(
        &self,
        _employee_id: &str,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<TrackedDay>, IntegrationError> {
        Ok(vec![TrackedDay {
            date: start,
            total_seconds: 8 * 3600,
            productive_seconds: Some(7 * 3600),
        }])
    }
}
