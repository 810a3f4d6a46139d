use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::workflow::PaymentStatus;

use super::{join_url, send_json, IntegrationError};

const PROVIDER: &str = "payroll provider";
const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
pub struct ContractRequest {
    pub contractor_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub job_title: String,
    pub hourly_rate: f64,
    pub country: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub payment_id: Uuid,
    pub contract_id: String,
    pub amount: f64,
    pub description: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalContract {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPayment {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[async_trait]
pub trait PayrollProvider: Send + Sync + 'static {
    async fn create_contract(
        &self,
        request: &ContractRequest,
    ) -> Result<ExternalContract, IntegrationError>;

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<ExternalPayment, IntegrationError>;

    async fn payment_status(&self, payment_id: &str) -> Result<ExternalPayment, IntegrationError>;
}

/// Local status for a provider payment state; `None` when the provider
/// reports something with no local counterpart (e.g. still pending).
pub fn map_payment_status(raw: &str) -> Option<PaymentStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "processing" => Some(PaymentStatus::Processing),
        "in_transit" => Some(PaymentStatus::InTransit),
        "completed" | "paid" => Some(PaymentStatus::Paid),
        "failed" => Some(PaymentStatus::Failed),
        _ => None,
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

pub struct DeelClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl DeelClient {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl PayrollProvider for DeelClient {
    async fn create_contract(
        &self,
        request: &ContractRequest,
    ) -> Result<ExternalContract, IntegrationError> {
        let body = json!({
            "type": "contractor",
            "contractor_details": {
                "email": request.email,
                "first_name": request.first_name,
                "last_name": request.last_name,
            },
            "job_title": request.job_title,
            "rate": {
                "amount": request.hourly_rate,
                "currency": DEFAULT_CURRENCY,
                "scale": "hourly",
            },
            "country": request.country,
            "start_date": request.start_date.format("%Y-%m-%d").to_string(),
        });

        let envelope: Envelope<ExternalContract> = send_json(
            PROVIDER,
            self.client
                .post(join_url(&self.base_url, "contracts"))
                .bearer_auth(&self.api_key)
                .json(&json!({ "data": body })),
        )
        .await?;
        Ok(envelope.data)
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<ExternalPayment, IntegrationError> {
        let body = json!({
            "contract_id": request.contract_id,
            "amount": request.amount,
            "currency": DEFAULT_CURRENCY,
            "description": request.description,
            "date_from": request.period_start.format("%Y-%m-%d").to_string(),
            "date_to": request.period_end.format("%Y-%m-%d").to_string(),
        });

        let envelope: Envelope<ExternalPayment> = send_json(
            PROVIDER,
            self.client
                .post(join_url(&self.base_url, "payments"))
                .bearer_auth(&self.api_key)
                .json(&json!({ "data": body })),
        )
        .await?;
        Ok(envelope.data)
    }

    async fn payment_status(&self, payment_id: &str) -> Result<ExternalPayment, IntegrationError> {
        let envelope: Envelope<ExternalPayment> = send_json(
            PROVIDER,
            self.client
                .get(join_url(&self.base_url, &format!("payments/{payment_id}")))
                .bearer_auth(&self.api_key),
        )
        .await?;
        Ok(envelope.data)
    }
}

pub struct MockPayroll;

#[async_trait]
impl PayrollProvider for MockPayroll {
    async fn create_contract(
        &self,
        request: &ContractRequest,
    ) -> Result<ExternalContract, IntegrationError> {
        Ok(ExternalContract {
            id: format!("mock_contract_{}", request.contractor_id),
            status: "pending".to_string(),
        })
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<ExternalPayment, IntegrationError> {
        Ok(ExternalPayment {
            id: format!("mock_payment_{}", request.payment_id),
            status: "pending".to_string(),
        })
    }

    async fn payment_status(&self, payment_id: &str) -> Result<ExternalPayment, IntegrationError> {
        Ok(ExternalPayment {
            id: payment_id.to_string(),
            status: "completed".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_provider_payment_states() {
        assert_eq!(map_payment_status("processing"), Some(PaymentStatus::Processing));
        assert_eq!(map_payment_status("IN_TRANSIT"), Some(PaymentStatus::InTransit));
        assert_eq!(map_payment_status("completed"), Some(PaymentStatus::Paid));
        assert_eq!(map_payment_status("paid"), Some(PaymentStatus::Paid));
        assert_eq!(map_payment_status("failed"), Some(PaymentStatus::Failed));
        assert_eq!(map_payment_status("pending"), None);
    }

    #[tokio::test]
    async fn mock_ids_derive_from_local_ids() {
        let payment_id = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let payment = MockPayroll
            .create_payment(&PaymentRequest {
                payment_id,
                contract_id: "c1".into(),
                amount: 100.0,
                description: "June".into(),
                period_start: day,
                period_end: day,
            })
            .await
            .unwrap();
        assert_eq!(payment.id, format!("mock_payment_{payment_id}"));

        let status = MockPayroll.payment_status(&payment.id).await.unwrap();
        assert_eq!(map_payment_status(&status.status), Some(PaymentStatus::Paid));
    }
}
