use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    aggregates::round_cents,
    error::{AppError, AppResult},
    integrations::payroll::{map_payment_status, PaymentRequest},
    models::{Contractor, NewPayment, NewPaymentTimeEntry, Payment},
    schema::{contractors, payment_time_entries, payments, time_entries},
    state::AppState,
    utils::extract::{Json, Path, Query},
    workflow::{check_transition, parse_filter, PaymentStatus},
};

use super::{contractors::ContractorSummary, to_iso, BulkAction, BulkRequest, BulkResponse};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListQuery {
    pub status: Option<String>,
    pub contractor: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub contractor_id: Option<Uuid>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub total_hours: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub amount: Option<f64>,
    #[serde(default)]
    pub time_entry_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdatePaymentRequest {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct SendToPayrollRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub gross_amount: f64,
    pub net_amount: f64,
    pub status: String,
    pub external_payment_id: Option<String>,
    pub approved_at: Option<String>,
    pub processed_at: Option<String>,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<ContractorSummary>,
}

impl PaymentResponse {
    pub fn with_contractor(mut self, contractor: ContractorSummary) -> Self {
        self.contractor = Some(contractor);
        self
    }
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            contractor_id: payment.contractor_id,
            period_start: payment.period_start,
            period_end: payment.period_end,
            total_hours: payment.total_hours,
            hourly_rate: payment.hourly_rate,
            gross_amount: payment.gross_amount,
            net_amount: payment.net_amount,
            status: payment.status,
            external_payment_id: payment.external_payment_id,
            approved_at: payment.approved_at.map(to_iso),
            processed_at: payment.processed_at.map(to_iso),
            paid_at: payment.paid_at.map(to_iso),
            created_at: to_iso(payment.created_at),
            updated_at: to_iso(payment.updated_at),
            contractor: None,
        }
    }
}

#[derive(Serialize)]
pub struct SendToPayrollResponse {
    pub processed: usize,
    pub skipped: usize,
}

#[derive(AsChangeset)]
#[diesel(table_name = payments)]
struct PaymentChangeset {
    status: String,
    approved_at: Option<Option<NaiveDateTime>>,
    processed_at: Option<Option<NaiveDateTime>>,
    paid_at: Option<Option<NaiveDateTime>>,
    external_payment_id: Option<Option<String>>,
    updated_at: NaiveDateTime,
}

impl PaymentChangeset {
    fn moving_to(next: PaymentStatus, now: NaiveDateTime) -> Self {
        let stamp = |status: PaymentStatus| (next == status).then_some(Some(now));
        Self {
            status: next.as_str().to_string(),
            approved_at: stamp(PaymentStatus::Approved),
            processed_at: stamp(PaymentStatus::Processing),
            paid_at: stamp(PaymentStatus::Paid),
            external_payment_id: None,
            updated_at: now,
        }
    }

    fn with_external_id(mut self, external_id: &str) -> Self {
        self.external_payment_id = Some(Some(external_id.to_string()));
        self
    }
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> AppResult<Json<Vec<PaymentResponse>>> {
    let status = parse_filter::<PaymentStatus>(query.status.as_deref())?;
    let mut conn = state.db()?;

    let mut rows_query = payments::table.inner_join(contractors::table).into_boxed();
    if let Some(status) = status {
        rows_query = rows_query.filter(payments::status.eq(status.as_str()));
    }
    if let Some(contractor_id) = query.contractor {
        rows_query = rows_query.filter(payments::contractor_id.eq(contractor_id));
    }
    if let Some(start) = query.start_date {
        rows_query = rows_query.filter(payments::period_start.ge(start));
    }
    if let Some(end) = query.end_date {
        rows_query = rows_query.filter(payments::period_start.le(end));
    }

    let rows: Vec<(Payment, Contractor)> = rows_query
        .order(payments::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(payment, contractor)| {
                PaymentResponse::from(payment).with_contractor(ContractorSummary::from(&contractor))
            })
            .collect(),
    ))
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<PaymentResponse>)> {
    let contractor_id = payload
        .contractor_id
        .ok_or_else(|| AppError::bad_request("contractorId is required"))?;
    let period_start = payload
        .period_start
        .ok_or_else(|| AppError::bad_request("periodStart is required"))?;
    let period_end = payload
        .period_end
        .ok_or_else(|| AppError::bad_request("periodEnd is required"))?;
    if period_end < period_start {
        return Err(AppError::bad_request("periodEnd must not be before periodStart"));
    }
    let total_hours = payload.total_hours.unwrap_or(0.0);
    if !total_hours.is_finite() || total_hours < 0.0 {
        return Err(AppError::bad_request("totalHours must not be negative"));
    }
    if let Some(amount) = payload.amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::bad_request("amount must not be negative"));
        }
    }

    let mut conn = state.db()?;
    let contractor: Contractor = contractors::table
        .find(contractor_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("contractor"))?;

    // The rate is copied onto the payment; later rate changes do not touch it.
    let hourly_rate = payload.hourly_rate.unwrap_or(contractor.hourly_rate);
    if !hourly_rate.is_finite() || hourly_rate < 0.0 {
        return Err(AppError::bad_request("hourlyRate must not be negative"));
    }
    let gross_amount = round_cents(payload.amount.unwrap_or(total_hours * hourly_rate));

    let mut entry_ids = payload.time_entry_ids;
    entry_ids.sort_unstable();
    entry_ids.dedup();

    let payment = conn.transaction::<Payment, AppError, _>(|conn| {
        if !entry_ids.is_empty() {
            let owned: i64 = time_entries::table
                .filter(time_entries::id.eq_any(&entry_ids))
                .filter(time_entries::contractor_id.eq(contractor_id))
                .count()
                .get_result(conn)?;
            if owned as usize != entry_ids.len() {
                return Err(AppError::bad_request(
                    "timeEntryIds must reference this contractor's time entries",
                ));
            }
        }

        let new_payment = NewPayment {
            id: Uuid::new_v4(),
            contractor_id,
            period_start,
            period_end,
            total_hours,
            hourly_rate,
            gross_amount,
            net_amount: gross_amount,
            status: PaymentStatus::Pending.as_str().to_string(),
        };
        let payment: Payment = diesel::insert_into(payments::table)
            .values(&new_payment)
            .get_result(conn)?;

        let links: Vec<NewPaymentTimeEntry> = entry_ids
            .iter()
            .map(|time_entry_id| NewPaymentTimeEntry {
                payment_id: payment.id,
                time_entry_id: *time_entry_id,
            })
            .collect();
        if !links.is_empty() {
            diesel::insert_into(payment_time_entries::table)
                .values(&links)
                .execute(conn)?;
        }

        Ok(payment)
    })?;

    info!(
        payment_id = %payment.id,
        contractor_id = %contractor_id,
        gross_amount = payment.gross_amount,
        linked_entries = entry_ids.len(),
        "payment created"
    );
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse::from(payment).with_contractor(ContractorSummary::from(&contractor))),
    ))
}

pub async fn update_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    let raw_status = payload
        .status
        .ok_or_else(|| AppError::bad_request("status is required"))?;
    let next: PaymentStatus = raw_status.parse()?;

    let mut conn = state.db()?;
    let existing: Payment = payments::table.find(payment_id).first(&mut conn)?;
    let payment = apply_status(&mut conn, existing, next)?;
    Ok(Json(payment.into()))
}

/// Only rows still PENDING are touched, so repeating a bulk action is a no-op.
pub async fn bulk_update_payments(
    State(state): State<AppState>,
    Json(payload): Json<BulkRequest>,
) -> AppResult<Json<BulkResponse>> {
    let (action, ids) = payload.validate()?;
    let requested = ids.len();
    let next = match action {
        BulkAction::Approve => PaymentStatus::Approved,
        BulkAction::Reject => PaymentStatus::Cancelled,
    };

    let mut conn = state.db()?;
    let updated = diesel::update(
        payments::table
            .filter(payments::id.eq_any(&ids))
            .filter(payments::status.eq(PaymentStatus::Pending.as_str())),
    )
    .set(&PaymentChangeset::moving_to(next, Utc::now().naive_utc()))
    .execute(&mut conn)?;

    info!(action = action.as_str(), requested, updated, "bulk payment update");
    Ok(Json(BulkResponse {
        updated,
        requested,
        action: action.as_str(),
    }))
}

/// Submits approved payments to the payroll provider. Payments whose
/// contractor lacks a payroll contract or eligibility are left untouched.
pub async fn send_to_payroll(
    State(state): State<AppState>,
    Json(payload): Json<SendToPayrollRequest>,
) -> AppResult<Json<SendToPayrollResponse>> {
    if payload.ids.is_empty() {
        return Err(AppError::bad_request("ids must not be empty"));
    }

    let approved: Vec<(Payment, Contractor)> = {
        let mut conn = state.db()?;
        payments::table
            .inner_join(contractors::table)
            .filter(payments::id.eq_any(&payload.ids))
            .filter(payments::status.eq(PaymentStatus::Approved.as_str()))
            .load(&mut conn)?
    };
    if approved.is_empty() {
        return Err(AppError::bad_request("No approved payments found"));
    }

    let (eligible, ineligible): (Vec<_>, Vec<_>) = approved
        .into_iter()
        .partition(|(_, contractor)| contractor.is_payment_eligible());
    if eligible.is_empty() {
        return Err(AppError::bad_request(
            "None of the selected payments are eligible for payroll. Contractors need a payroll contract and payment eligibility.",
        ));
    }

    // Each accepted payment moves to PROCESSING before the next provider call.
    let mut processed = 0;
    let mut raced = 0;
    for (payment, contractor) in &eligible {
        let contract_id = contractor.deel_contract_id.clone().unwrap_or_default();
        let request = PaymentRequest {
            payment_id: payment.id,
            contract_id,
            amount: payment.net_amount,
            description: format!(
                "Contractor payment {} to {}",
                payment.period_start, payment.period_end
            ),
            period_start: payment.period_start,
            period_end: payment.period_end,
        };
        let external = match state.integrations.payroll.create_payment(&request).await {
            Ok(external) => external,
            Err(err) => {
                warn!(payment_id = %payment.id, processed, error = %err, "payroll submission stopped");
                return Err(AppError::bad_gateway(format!(
                    "{err} ({processed} payment(s) were sent before the failure)"
                )));
            }
        };

        let mut conn = state.db()?;
        let changed = diesel::update(
            payments::table
                .filter(payments::id.eq(payment.id))
                .filter(payments::status.eq(PaymentStatus::Approved.as_str())),
        )
        .set(
            &PaymentChangeset::moving_to(PaymentStatus::Processing, Utc::now().naive_utc())
                .with_external_id(&external.id),
        )
        .execute(&mut conn)
        .map_err(|err| {
            error!(payment_id = %payment.id, external_id = %external.id, "failed to record payroll submission");
            AppError::from(err)
        })?;

        if changed == 0 {
            warn!(
                payment_id = %payment.id,
                external_id = %external.id,
                "payment changed status while being sent to payroll"
            );
            raced += 1;
        }
        processed += changed;
    }
    let skipped = ineligible.len() + raced;

    info!(processed, skipped, "payments sent to payroll");
    Ok(Json(SendToPayrollResponse { processed, skipped }))
}

pub async fn sync_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> AppResult<Json<PaymentResponse>> {
    let existing: Payment = {
        let mut conn = state.db()?;
        payments::table.find(payment_id).first(&mut conn)?
    };
    let external_id = existing
        .external_payment_id
        .clone()
        .ok_or_else(|| AppError::bad_request("payment has not been sent to payroll yet"))?;

    let external = state.integrations.payroll.payment_status(&external_id).await?;
    let Some(next) = map_payment_status(&external.status) else {
        info!(payment_id = %payment_id, provider_status = %external.status, "payment status unchanged");
        return Ok(Json(existing.into()));
    };

    let mut conn = state.db()?;
    let payment = apply_status(&mut conn, existing, next)?;
    Ok(Json(payment.into()))
}

/// Moves a payment to `next` with its timestamp side effects; the current
/// status is a no-op.
fn apply_status(conn: &mut PgConnection, payment: Payment, next: PaymentStatus) -> AppResult<Payment> {
    let current: PaymentStatus = payment.status.parse()?;
    check_transition(current, next)?;
    if current == next {
        return Ok(payment);
    }

    let updated: Payment = diesel::update(payments::table.find(payment.id))
        .set(&PaymentChangeset::moving_to(next, Utc::now().naive_utc()))
        .get_result(conn)?;

    info!(payment_id = %payment.id, from = %current, to = %next, "payment status changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn approval_stamps_only_approved_at() {
        let changeset = PaymentChangeset::moving_to(PaymentStatus::Approved, now());
        assert_eq!(changeset.status, "APPROVED");
        assert_eq!(changeset.approved_at, Some(Some(now())));
        assert!(changeset.processed_at.is_none());
        assert!(changeset.paid_at.is_none());
    }

    #[test]
    fn payout_stamps_paid_at() {
        let changeset = PaymentChangeset::moving_to(PaymentStatus::Paid, now());
        assert_eq!(changeset.paid_at, Some(Some(now())));
        assert!(changeset.approved_at.is_none());
    }

    #[test]
    fn cancellation_keeps_existing_timestamps() {
        let changeset = PaymentChangeset::moving_to(PaymentStatus::Cancelled, now());
        assert_eq!(changeset.status, "CANCELLED");
        assert!(changeset.approved_at.is_none());
        assert!(changeset.processed_at.is_none());
        assert!(changeset.paid_at.is_none());
    }
}
