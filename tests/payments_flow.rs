mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use common::{acquire_db_lock, str_field, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;
use workforce::integrations::payroll::{
    ContractRequest, ExternalContract, ExternalPayment, MockPayroll, PaymentRequest,
    PayrollProvider,
};
use workforce::integrations::{IntegrationError, Integrations};

/// Payroll provider whose second payment submission fails.
#[derive(Default)]
struct SecondPaymentFails {
    calls: Mutex<Vec<Uuid>>,
}

impl SecondPaymentFails {
    fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl PayrollProvider for SecondPaymentFails {
    async fn create_contract(
        &self,
        request: &ContractRequest,
    ) -> Result<ExternalContract, IntegrationError> {
        MockPayroll.create_contract(request).await
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<ExternalPayment, IntegrationError> {
        let call = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(request.payment_id);
            calls.len()
        };
        if call == 2 {
            return Err(IntegrationError::Status {
                provider: "payroll provider",
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        MockPayroll.create_payment(request).await
    }

    async fn payment_status(&self, payment_id: &str) -> Result<ExternalPayment, IntegrationError> {
        MockPayroll.payment_status(payment_id).await
    }
}

fn payment_payload(contractor_id: &str, hours: f64) -> Value {
    json!({
        "contractorId": contractor_id,
        "periodStart": "2025-06-01",
        "periodEnd": "2025-06-15",
        "totalHours": hours
    })
}

async fn create_payment(app: &TestApp, token: &str, payload: &Value) -> Result<Value> {
    let (status, payment) = app.post_json("/api/payments", payload, Some(token)).await?;
    assert_eq!(status, StatusCode::CREATED, "{payment}");
    Ok(payment)
}

async fn find_payment(
    app: &TestApp,
    token: &str,
    contractor_id: &str,
    payment_id: &str,
) -> Result<Value> {
    let (status, rows) = app
        .get(&format!("/api/payments?contractor={contractor_id}"), Some(token))
        .await?;
    assert_eq!(status, StatusCode::OK, "{rows}");
    let payment = rows
        .as_array()
        .expect("payments")
        .iter()
        .find(|row| str_field(row, "id") == payment_id)
        .cloned()
        .expect("payment listed");
    Ok(payment)
}

/// Approved, payroll-ready contractor with one approved payment.
async fn approved_payment(app: &TestApp, token: &str, email: &str) -> Result<(String, String)> {
    let contractor_id = app.create_contractor(email, 50.0).await?;
    let (status, _) = app
        .patch_json(
            &format!("/api/contractors/{contractor_id}"),
            &json!({ "paymentEligible": true }),
            Some(token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .post_json(
            &format!("/api/contractors/{contractor_id}/payroll-contract"),
            &json!({}),
            Some(token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let payment = create_payment(app, token, &payment_payload(&contractor_id, 4.0)).await?;
    let payment_id = str_field(&payment, "id").to_string();
    let (status, _) = app
        .post_json(
            "/api/payments/bulk",
            &json!({ "ids": [payment_id], "action": "approve" }),
            Some(token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok((contractor_id, payment_id))
}

#[tokio::test]
async fn payment_amounts_and_links() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let contractor_id = app.create_contractor("grace@example.com", 50.0).await?;
    let other_id = app.create_contractor("linus@example.com", 20.0).await?;
    let project_id = app.create_project("PAY-1", None).await?;

    let payment = create_payment(&app, &token, &payment_payload(&contractor_id, 10.0)).await?;
    assert_eq!(str_field(&payment, "status"), "PENDING");
    assert_eq!(payment["hourlyRate"], json!(50.0));
    assert_eq!(payment["grossAmount"], json!(500.0));
    assert_eq!(payment["netAmount"], json!(500.0));
    assert_eq!(str_field(&payment["contractor"], "email"), "grace@example.com");

    let mut overridden = payment_payload(&contractor_id, 3.0);
    overridden["amount"] = json!(123.456);
    let payment = create_payment(&app, &token, &overridden).await?;
    assert_eq!(payment["grossAmount"], json!(123.46));

    let (status, body) = app
        .post_json(
            "/api/payments",
            &json!({
                "contractorId": contractor_id,
                "periodStart": "2025-06-15",
                "periodEnd": "2025-06-01"
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "periodEnd must not be before periodStart");

    let missing = Uuid::new_v4().to_string();
    let (status, body) = app
        .post_json("/api/payments", &payment_payload(&missing, 1.0), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&body, "error"), "contractor not found");

    let (_, foreign_entry) = app
        .post_json(
            "/api/hours",
            &json!({
                "contractorId": other_id,
                "projectId": project_id,
                "date": "2025-06-02",
                "hours": 5.0
            }),
            Some(&token),
        )
        .await?;
    let mut foreign_link = payment_payload(&contractor_id, 5.0);
    foreign_link["timeEntryIds"] = json!([str_field(&foreign_entry, "id")]);
    let (status, body) = app.post_json("/api/payments", &foreign_link, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        str_field(&body, "error"),
        "timeEntryIds must reference this contractor's time entries"
    );

    let mut own_link = payment_payload(&other_id, 5.0);
    own_link["timeEntryIds"] = json!([str_field(&foreign_entry, "id")]);
    let linked = create_payment(&app, &token, &own_link).await?;
    assert_eq!(linked["grossAmount"], json!(100.0));

    let (_, listed) = app
        .get(&format!("/api/payments?contractor={contractor_id}"), Some(&token))
        .await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(2));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn payroll_submission_and_sync_flow() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let eligible_id = app.create_contractor("grace@example.com", 50.0).await?;
    let ineligible_id = app.create_contractor("linus@example.com", 40.0).await?;

    let payment = create_payment(&app, &token, &payment_payload(&eligible_id, 10.0)).await?;
    let payment_id = str_field(&payment, "id").to_string();
    let other = create_payment(&app, &token, &payment_payload(&ineligible_id, 2.0)).await?;
    let other_id = str_field(&other, "id").to_string();
    let spare = create_payment(&app, &token, &payment_payload(&ineligible_id, 1.0)).await?;
    let spare_id = str_field(&spare, "id").to_string();

    let send = json!({ "ids": [payment_id, other_id] });
    let (status, body) = app
        .post_json("/api/payments/send-to-deel", &send, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "No approved payments found");

    let (status, approved) = app
        .post_json(
            "/api/payments/bulk",
            &json!({ "ids": [payment_id, other_id], "action": "approve" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["updated"], json!(2));

    let (status, body) = app
        .post_json("/api/payments/send-to-deel", &send, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(str_field(&body, "error").starts_with("None of the selected payments are eligible"));

    let (status, _) = app
        .patch_json(
            &format!("/api/contractors/{eligible_id}"),
            &json!({ "paymentEligible": true }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, contractor) = app
        .post_json(
            &format!("/api/contractors/{eligible_id}/payroll-contract"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{contractor}");
    assert_eq!(
        str_field(&contractor, "deelContractId"),
        format!("mock_contract_{eligible_id}")
    );

    let (status, result) = app
        .post_json("/api/payments/send-to-deel", &send, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK, "{result}");
    assert_eq!(result, json!({ "processed": 1, "skipped": 1 }));

    let held = find_payment(&app, &token, &ineligible_id, &other_id).await?;
    assert_eq!(str_field(&held, "status"), "APPROVED");
    assert!(held["processedAt"].is_null());
    assert!(held["externalPaymentId"].is_null());

    let (_, rows) = app
        .get(&format!("/api/payments?contractor={eligible_id}"), Some(&token))
        .await?;
    let sent = &rows.as_array().expect("payments")[0];
    assert_eq!(str_field(sent, "status"), "PROCESSING");
    assert_eq!(
        str_field(sent, "externalPaymentId"),
        format!("mock_payment_{payment_id}")
    );
    assert!(sent["processedAt"].is_string());
    assert!(sent["approvedAt"].is_string());

    let (status, body) = app
        .post_json(&format!("/api/payments/{other_id}/sync"), &json!({}), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "payment has not been sent to payroll yet");

    let (status, synced) = app
        .post_json(&format!("/api/payments/{payment_id}/sync"), &json!({}), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK, "{synced}");
    assert_eq!(str_field(&synced, "status"), "PAID");
    assert!(synced["paidAt"].is_string());

    let (status, body) = app
        .patch_json(
            &format!("/api/payments/{payment_id}"),
            &json!({ "status": "CANCELLED" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "cannot move payment from PAID to CANCELLED");

    let (status, cancelled) = app
        .patch_json(
            &format!("/api/payments/{spare_id}"),
            &json!({ "status": "CANCELLED" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_field(&cancelled, "status"), "CANCELLED");

    let (status, detail) = app
        .get(&format!("/api/contractors/{eligible_id}"), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["totalEarnings"], json!(500.0));
    assert_eq!(detail["pendingEarnings"], json!(0.0));

    let (_, paid) = app.get("/api/payments?status=PAID", Some(&token)).await?;
    assert_eq!(paid.as_array().map(Vec::len), Some(1));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn payroll_failure_keeps_already_sent_payments() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let payroll = Arc::new(SecondPaymentFails::default());
    let app = TestApp::with_integrations(Integrations {
        payroll: payroll.clone(),
        ..Integrations::mock()
    })
    .await?;
    let token = app.team_token()?;

    let (first_contractor, first_id) = approved_payment(&app, &token, "grace@example.com").await?;
    let (second_contractor, second_id) = approved_payment(&app, &token, "linus@example.com").await?;
    let send = json!({ "ids": [first_id, second_id] });

    let (status, body) = app
        .post_json("/api/payments/send-to-deel", &send, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(
        str_field(&body, "error").contains("1 payment(s) were sent before the failure"),
        "{body}"
    );

    let calls = payroll.calls();
    assert_eq!(calls.len(), 2);
    let (sent_id, sent_contractor, held_id, held_contractor) = if calls[0].to_string() == first_id {
        (&first_id, &first_contractor, &second_id, &second_contractor)
    } else {
        (&second_id, &second_contractor, &first_id, &first_contractor)
    };

    let sent = find_payment(&app, &token, sent_contractor, sent_id).await?;
    assert_eq!(str_field(&sent, "status"), "PROCESSING");
    assert_eq!(
        str_field(&sent, "externalPaymentId"),
        format!("mock_payment_{sent_id}")
    );
    let held = find_payment(&app, &token, held_contractor, held_id).await?;
    assert_eq!(str_field(&held, "status"), "APPROVED");
    assert!(held["externalPaymentId"].is_null());

    // The retry only submits what the provider has not seen yet.
    let (status, result) = app
        .post_json("/api/payments/send-to-deel", &send, Some(&token))
        .await?;
    assert_eq!(status, StatusCode::OK, "{result}");
    assert_eq!(result, json!({ "processed": 1, "skipped": 0 }));

    let calls = payroll.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].to_string(), *held_id);
    let held = find_payment(&app, &token, held_contractor, held_id).await?;
    assert_eq!(str_field(&held, "status"), "PROCESSING");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn malformed_requests_report_json_errors() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;

    let (status, body) = app
        .post_json(
            "/api/payments/bulk",
            &json!({ "ids": ["not-a-uuid"], "action": "approve" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = app
        .post_json(
            "/api/payments/bulk",
            &json!({ "ids": null, "action": "approve" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = app
        .patch_json("/api/payments/not-a-uuid", &json!({ "status": "APPROVED" }), Some(&token))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = app.get("/api/payments?startDate=yesterday", Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    app.cleanup().await?;
    Ok(())
}
