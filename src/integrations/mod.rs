//! Adapters for the third-party services the platform delegates to.
//!
//! Each provider is a trait with a live HTTP implementation and a
//! deterministic mock. [`Integrations::from_config`] picks one per provider at
//! startup depending on whether an API key is configured.

pub mod ai;
pub mod background_check;
pub mod payroll;
pub mod time_tracking;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;

use self::{
    ai::{AiProvider, AnthropicAi, MockAi},
    background_check::{BackgroundCheckProvider, CheckrClient, MockBackgroundCheck},
    payroll::{DeelClient, MockPayroll, PayrollProvider},
    time_tracking::{InsightfulClient, MockTimeTracking, TimeTrackingProvider},
};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

#[derive(Clone)]
pub struct Integrations {
    pub payroll: Arc<dyn PayrollProvider>,
    pub background_check: Arc<dyn BackgroundCheckProvider>,
    pub time_tracking: Arc<dyn TimeTrackingProvider>,
    pub ai: Arc<dyn AiProvider>,
}

impl Integrations {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build http client")?;

        let payroll: Arc<dyn PayrollProvider> = match &config.payroll.api_key {
            Some(key) => {
                info!(base_url = %config.payroll.base_url, "payroll provider configured");
                Arc::new(DeelClient::new(client.clone(), &config.payroll.base_url, key))
            }
            None => {
                warn!("DEEL_API_KEY not set; payroll provider running in mock mode");
                Arc::new(MockPayroll)
            }
        };

        let background_check: Arc<dyn BackgroundCheckProvider> =
            match &config.background_check.api_key {
                Some(key) => {
                    info!(base_url = %config.background_check.base_url, "background check provider configured");
                    Arc::new(CheckrClient::new(
                        client.clone(),
                        &config.background_check.base_url,
                        key,
                    ))
                }
                None => {
                    warn!("CHECKR_API_KEY not set; background check provider running in mock mode");
                    Arc::new(MockBackgroundCheck)
                }
            };

        let time_tracking: Arc<dyn TimeTrackingProvider> = match &config.time_tracking.api_key {
            Some(key) => {
                info!(base_url = %config.time_tracking.base_url, "time tracking provider configured");
                Arc::new(InsightfulClient::new(
                    client.clone(),
                    &config.time_tracking.base_url,
                    key,
                ))
            }
            None => {
                warn!("INSIGHTFUL_API_KEY not set; time tracking provider running in mock mode");
                Arc::new(MockTimeTracking)
            }
        };

        let ai: Arc<dyn AiProvider> = match &config.ai.api_key {
            Some(key) => {
                info!(model = %config.ai_model, "ai provider configured");
                Arc::new(AnthropicAi::new(
                    client,
                    &config.ai.base_url,
                    key,
                    &config.ai_model,
                ))
            }
            None => {
                warn!("ANTHROPIC_API_KEY not set; ai provider running in mock mode");
                Arc::new(MockAi)
            }
        };

        Ok(Self {
            payroll,
            background_check,
            time_tracking,
            ai,
        })
    }

    /// Every provider in mock mode.
    pub fn mock() -> Self {
        Self {
            payroll: Arc::new(MockPayroll),
            background_check: Arc::new(MockBackgroundCheck),
            time_tracking: Arc::new(MockTimeTracking),
            ai: Arc::new(MockAi),
        }
    }
}

/// Sends the request and decodes a JSON body, turning non-2xx replies into
/// [`IntegrationError::Status`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, IntegrationError> {
    let response = request
        .send()
        .await
        .map_err(|source| IntegrationError::Transport { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(IntegrationError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|err| IntegrationError::InvalidResponse {
            provider,
            message: err.to_string(),
        })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Mock results are a pure function of the entity they describe.
pub(crate) fn seeded_rng(id: Uuid) -> StdRng {
    let (high, low) = id.as_u64_pair();
    StdRng::seed_from_u64(high ^ low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalises_slashes() {
        assert_eq!(
            join_url("https://api.checkr.com/v1/", "/candidates"),
            "https://api.checkr.com/v1/candidates"
        );
        assert_eq!(join_url("http://localhost:9000", "payments/p1"), "http://localhost:9000/payments/p1");
    }

    #[test]
    fn seeded_rng_is_stable_per_id() {
        use rand::Rng;

        let id = Uuid::new_v4();
        let first: u32 = seeded_rng(id).gen();
        let second: u32 = seeded_rng(id).gen();
        assert_eq!(first, second);
    }
}
