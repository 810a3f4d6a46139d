use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::workflow::CheckStatus;

use super::{join_url, send_json, IntegrationError};

const PROVIDER: &str = "background check provider";

#[derive(Debug, Clone)]
pub struct CandidateRequest {
    pub contractor_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Invitation {
    pub id: String,
    #[serde(default)]
    pub invitation_url: Option<String>,
}

#[async_trait]
pub trait BackgroundCheckProvider: Send + Sync + 'static {
    async fn create_candidate(
        &self,
        request: &CandidateRequest,
    ) -> Result<Candidate, IntegrationError>;

    async fn create_invitation(
        &self,
        candidate_id: &str,
        package: &str,
    ) -> Result<Invitation, IntegrationError>;

    async fn candidate_status(&self, candidate_id: &str) -> Result<CheckStatus, IntegrationError>;
}

/// `dispute` is treated as `consider`; anything unrecognised stays pending.
pub fn map_check_status(raw: &str) -> CheckStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "dispute" => CheckStatus::Consider,
        other => other.parse().unwrap_or(CheckStatus::Pending),
    }
}

pub struct CheckrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CheckrClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl BackgroundCheckProvider for CheckrClient {
    async fn create_candidate(
        &self,
        request: &CandidateRequest,
    ) -> Result<Candidate, IntegrationError> {
        send_json(
            PROVIDER,
            self.client
                .post(join_url(&self.base_url, "candidates"))
                .basic_auth(&self.api_key, Some(""))
                .json(&json!({
                    "email": request.email,
                    "first_name": request.first_name,
                    "last_name": request.last_name,
                    "phone": request.phone,
                    "work_locations": [{ "country": request.country }],
                })),
        )
        .await
    }

    async fn create_invitation(
        &self,
        candidate_id: &str,
        package: &str,
    ) -> Result<Invitation, IntegrationError> {
        send_json(
            PROVIDER,
            self.client
                .post(join_url(&self.base_url, "invitations"))
                .basic_auth(&self.api_key, Some(""))
                .json(&json!({ "candidate_id": candidate_id, "package": package })),
        )
        .await
    }

    async fn candidate_status(&self, candidate_id: &str) -> Result<CheckStatus, IntegrationError> {
        let candidate: Candidate = send_json(
            PROVIDER,
            self.client
                .get(join_url(&self.base_url, &format!("candidates/{candidate_id}")))
                .basic_auth(&self.api_key, Some("")),
        )
        .await?;
        Ok(candidate
            .status
            .as_deref()
            .map(map_check_status)
            .unwrap_or(CheckStatus::Pending))
    }
}

pub struct MockBackgroundCheck;

#[async_trait]
impl BackgroundCheckProvider for MockBackgroundCheck {
    async fn create_candidate(
        &self,
        request: &CandidateRequest,
    ) -> Result<Candidate, IntegrationError> {
        Ok(Candidate {
            id: format!("mock_candidate_{}", request.contractor_id),
            status: Some("pending".to_string()),
        })
    }

    async fn create_invitation(
        &self,
        candidate_id: &str,
        _package: &str,
    ) -> Result<Invitation, IntegrationError> {
        Ok(Invitation {
            id: format!("mock_invitation_{candidate_id}"),
            invitation_url: Some(format!("https://checkr.com/apply/mock/{candidate_id}")),
        })
    }

    async fn candidate_status(&self, _candidate_id: &str) -> Result<CheckStatus, IntegrationError> {
        Ok(CheckStatus::Clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_vendor_statuses() {
        assert_eq!(map_check_status("clear"), CheckStatus::Clear);
        assert_eq!(map_check_status("Consider"), CheckStatus::Consider);
        assert_eq!(map_check_status("suspended"), CheckStatus::Suspended);
        assert_eq!(map_check_status("dispute"), CheckStatus::Consider);
        assert_eq!(map_check_status("complete"), CheckStatus::Pending);
        assert_eq!(map_check_status(""), CheckStatus::Pending);
    }

    #[tokio::test]
    async fn mock_invitation_points_at_candidate() {
        let invitation = MockBackgroundCheck
            .create_invitation("mock_candidate_1", "tasker_standard")
            .await
            .unwrap();
        assert_eq!(
            invitation.invitation_url.as_deref(),
            Some("https://checkr.com/apply/mock/mock_candidate_1")
        );
        assert_eq!(
            MockBackgroundCheck.candidate_status("x").await.unwrap(),
            CheckStatus::Clear
        );
    }
}
