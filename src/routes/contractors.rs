use std::collections::HashMap;

use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDateTime, Utc};
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    aggregates::{paid_earnings, pending_earnings, total_hours},
    auth::TeamMember,
    error::{unique_violation, AppError, AppResult},
    integrations::{background_check::CandidateRequest, payroll::ContractRequest},
    models::{
        Contractor, ContractorNote, Document, NewContractor, NewContractorNote, NewDocument,
        Payment, Project, ProjectAssignment, TimeEntry,
    },
    schema::{
        applications, contractor_notes, contractors, documents, jobs, payments,
        project_assignments, projects, time_entries,
    },
    state::AppState,
    utils::{
        extract::{Json, Path, Query},
        json::{classify_nullable, required_if_present},
    },
    workflow::{
        check_transition, parse_filter, ApplicationStatus, AssignmentStatus, CheckStatus,
        ContractorStatus, DocumentStatus, DocumentType,
    },
};

use super::{
    contains_pattern,
    documents::DocumentResponse,
    hours::TimeEntryResponse,
    optional_text,
    payments::PaymentResponse,
    projects::{AssignmentResponse, ProjectSummary},
    require_text, to_iso, trimmed_list, NoteRequest, NoteResponse,
};

const RECENT_TIME_ENTRIES: usize = 20;
const RECENT_PAYMENTS: usize = 10;

#[derive(Deserialize)]
pub struct ContractorListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub hourly_rate: Option<f64>,
    pub weekly_cap: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[serde(rename = "type")]
    pub doc_type: Option<String>,
    pub title: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub country: String,
    pub timezone: Option<String>,
    pub hourly_rate: f64,
    pub weekly_cap: Option<f64>,
    pub skills: Vec<String>,
    pub bio: Option<String>,
    pub status: String,
    pub checkr_candidate_id: Option<String>,
    pub checkr_status: Option<String>,
    pub payment_eligible: bool,
    pub deel_contract_id: Option<String>,
    pub time_tracking_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Contractor> for ContractorResponse {
    fn from(contractor: Contractor) -> Self {
        Self {
            full_name: contractor.full_name(),
            id: contractor.id,
            first_name: contractor.first_name,
            last_name: contractor.last_name,
            email: contractor.email,
            phone: contractor.phone,
            country: contractor.country,
            timezone: contractor.timezone,
            hourly_rate: contractor.hourly_rate,
            weekly_cap: contractor.weekly_cap,
            skills: contractor.skills,
            bio: contractor.bio,
            status: contractor.status,
            checkr_candidate_id: contractor.checkr_candidate_id,
            checkr_status: contractor.checkr_status,
            payment_eligible: contractor.payment_eligible,
            deel_contract_id: contractor.deel_contract_id,
            time_tracking_id: contractor.time_tracking_id,
            created_at: to_iso(contractor.created_at),
            updated_at: to_iso(contractor.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hourly_rate: f64,
}

impl From<&Contractor> for ContractorSummary {
    fn from(contractor: &Contractor) -> Self {
        Self {
            id: contractor.id,
            first_name: contractor.first_name.clone(),
            last_name: contractor.last_name.clone(),
            email: contractor.email.clone(),
            hourly_rate: contractor.hourly_rate,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorListItem {
    #[serde(flatten)]
    pub contractor: ContractorResponse,
    pub active_projects: Vec<String>,
    pub time_entry_count: i64,
    pub payment_count: i64,
    pub total_hours: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractorDetailResponse {
    pub contractor: ContractorResponse,
    pub documents: Vec<DocumentResponse>,
    pub assignments: Vec<AssignmentResponse>,
    pub recent_time_entries: Vec<TimeEntryResponse>,
    pub recent_payments: Vec<PaymentResponse>,
    pub total_earnings: f64,
    pub pending_earnings: f64,
    pub total_hours: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundCheckResponse {
    pub contractor: ContractorResponse,
    pub invitation_url: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = contractors)]
struct ContractorChangeset {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<Option<String>>,
    country: Option<String>,
    timezone: Option<Option<String>>,
    hourly_rate: Option<f64>,
    weekly_cap: Option<Option<f64>>,
    skills: Option<Vec<String>>,
    bio: Option<Option<String>>,
    status: Option<String>,
    payment_eligible: Option<bool>,
    deel_contract_id: Option<Option<String>>,
    time_tracking_id: Option<Option<String>>,
    updated_at: NaiveDateTime,
}

impl From<ContractorNote> for NoteResponse {
    fn from(note: ContractorNote) -> Self {
        Self {
            id: note.id,
            note_text: note.note_text,
            author_id: note.author_id,
            author_name: note.author_name,
            created_at: to_iso(note.created_at),
        }
    }
}

pub async fn list_contractors(
    State(state): State<AppState>,
    Query(query): Query<ContractorListQuery>,
) -> AppResult<Json<Vec<ContractorListItem>>> {
    let status = parse_filter::<ContractorStatus>(query.status.as_deref())?;
    let mut conn = state.db()?;

    let mut rows_query = contractors::table.into_boxed();
    if let Some(status) = status {
        rows_query = rows_query.filter(contractors::status.eq(status.as_str()));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        rows_query = rows_query.filter(
            contractors::first_name
                .ilike(pattern.clone())
                .or(contractors::last_name.ilike(pattern.clone()))
                .or(contractors::email.ilike(pattern)),
        );
    }
    let rows: Vec<Contractor> = rows_query
        .order(contractors::created_at.desc())
        .load(&mut conn)?;
    let ids: Vec<Uuid> = rows.iter().map(|contractor| contractor.id).collect();

    let mut active_projects: HashMap<Uuid, Vec<String>> = HashMap::new();
    let assignment_rows: Vec<(Uuid, String)> = project_assignments::table
        .inner_join(projects::table)
        .filter(project_assignments::contractor_id.eq_any(&ids))
        .filter(project_assignments::status.eq(AssignmentStatus::Active.as_str()))
        .order(projects::name.asc())
        .select((project_assignments::contractor_id, projects::name))
        .load(&mut conn)?;
    for (contractor_id, name) in assignment_rows {
        active_projects.entry(contractor_id).or_default().push(name);
    }

    let mut hours: HashMap<Uuid, (i64, f64)> = HashMap::new();
    let hour_rows: Vec<(Uuid, f64)> = time_entries::table
        .filter(time_entries::contractor_id.eq_any(&ids))
        .select((time_entries::contractor_id, time_entries::total_hours))
        .load(&mut conn)?;
    for (contractor_id, entry_hours) in hour_rows {
        let slot = hours.entry(contractor_id).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += entry_hours;
    }

    let payment_counts: HashMap<Uuid, i64> = payments::table
        .filter(payments::contractor_id.eq_any(&ids))
        .group_by(payments::contractor_id)
        .select((payments::contractor_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let response = rows
        .into_iter()
        .map(|contractor| {
            let (time_entry_count, total_hours) =
                hours.get(&contractor.id).copied().unwrap_or((0, 0.0));
            ContractorListItem {
                active_projects: active_projects.remove(&contractor.id).unwrap_or_default(),
                payment_count: payment_counts.get(&contractor.id).copied().unwrap_or(0),
                time_entry_count,
                total_hours,
                contractor: contractor.into(),
            }
        })
        .collect();

    Ok(Json(response))
}

pub async fn create_contractor(
    State(state): State<AppState>,
    Json(payload): Json<CreateContractorRequest>,
) -> AppResult<(StatusCode, Json<ContractorResponse>)> {
    let first_name = require_text(payload.first_name, "firstName")?;
    let last_name = require_text(payload.last_name, "lastName")?;
    let email = require_text(payload.email, "email")?.to_lowercase();
    let country = require_text(payload.country, "country")?;
    let hourly_rate = payload
        .hourly_rate
        .ok_or_else(|| AppError::bad_request("hourlyRate is required"))?;
    validate_rate(hourly_rate)?;
    if let Some(cap) = payload.weekly_cap {
        validate_cap(cap)?;
    }

    let mut conn = state.db()?;
    ensure_email_free(&mut conn, &email, None)?;

    let new_contractor = NewContractor {
        id: Uuid::new_v4(),
        first_name,
        last_name,
        email,
        phone: optional_text(payload.phone),
        country,
        timezone: optional_text(payload.timezone),
        hourly_rate,
        weekly_cap: payload.weekly_cap,
        skills: trimmed_list(payload.skills),
        bio: optional_text(payload.bio),
        status: ContractorStatus::Onboarding.as_str().to_string(),
        payment_eligible: false,
    };

    let contractor: Contractor = diesel::insert_into(contractors::table)
        .values(&new_contractor)
        .get_result(&mut conn)
        .map_err(unique_violation("a contractor with this email already exists"))?;

    info!(contractor_id = %contractor.id, "contractor created");
    Ok((StatusCode::CREATED, Json(contractor.into())))
}

pub async fn get_contractor(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
) -> AppResult<Json<ContractorDetailResponse>> {
    let mut conn = state.db()?;
    let contractor: Contractor = contractors::table.find(contractor_id).first(&mut conn)?;

    let document_rows: Vec<Document> = Document::belonging_to(&contractor)
        .order(documents::created_at.desc())
        .load(&mut conn)?;

    let assignment_rows: Vec<(ProjectAssignment, Project)> = project_assignments::table
        .inner_join(projects::table)
        .filter(project_assignments::contractor_id.eq(contractor_id))
        .order(project_assignments::assigned_at.desc())
        .load(&mut conn)?;

    let entry_rows: Vec<(TimeEntry, Project)> = time_entries::table
        .inner_join(projects::table)
        .filter(time_entries::contractor_id.eq(contractor_id))
        .order((time_entries::work_date.desc(), time_entries::created_at.desc()))
        .load(&mut conn)?;

    let payment_rows: Vec<Payment> = Payment::belonging_to(&contractor)
        .order(payments::created_at.desc())
        .load(&mut conn)?;

    let total_hours = total_hours(entry_rows.iter().map(|(entry, _)| entry));
    let total_earnings = paid_earnings(&payment_rows);
    let pending_earnings = pending_earnings(&payment_rows);

    Ok(Json(ContractorDetailResponse {
        documents: document_rows.into_iter().map(Into::into).collect(),
        assignments: assignment_rows
            .into_iter()
            .map(|(assignment, project)| {
                AssignmentResponse::from(assignment).with_project(ProjectSummary::from(&project))
            })
            .collect(),
        recent_time_entries: entry_rows
            .into_iter()
            .take(RECENT_TIME_ENTRIES)
            .map(|(entry, project)| {
                TimeEntryResponse::from(entry).with_project(ProjectSummary::from(&project))
            })
            .collect(),
        recent_payments: payment_rows
            .into_iter()
            .take(RECENT_PAYMENTS)
            .map(Into::into)
            .collect(),
        total_earnings,
        pending_earnings,
        total_hours,
        contractor: contractor.into(),
    }))
}

pub async fn update_contractor(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<ContractorResponse>> {
    let mut conn = state.db()?;
    let existing: Contractor = contractors::table.find(contractor_id).first(&mut conn)?;

    let text_field = |field: &str| -> AppResult<Option<String>> {
        match required_if_present::<String>(&body, field).map_err(AppError::bad_request)? {
            Some(value) => Ok(Some(require_text(Some(value), field)?)),
            None => Ok(None),
        }
    };
    let nullable_text = |field: &str| -> AppResult<Option<Option<String>>> {
        Ok(classify_nullable::<String>(&body, field)
            .map_err(AppError::bad_request)?
            .into_change()
            .map(optional_text))
    };

    let first_name = text_field("firstName")?;
    let last_name = text_field("lastName")?;
    let country = text_field("country")?;
    let email = text_field("email")?.map(|value| value.to_lowercase());
    if let Some(email) = email.as_deref() {
        if email != existing.email {
            ensure_email_free(&mut conn, email, Some(contractor_id))?;
        }
    }

    let hourly_rate =
        required_if_present::<f64>(&body, "hourlyRate").map_err(AppError::bad_request)?;
    if let Some(rate) = hourly_rate {
        validate_rate(rate)?;
    }
    let weekly_cap = classify_nullable::<f64>(&body, "weeklyCap")
        .map_err(AppError::bad_request)?
        .into_change();
    if let Some(Some(cap)) = weekly_cap {
        validate_cap(cap)?;
    }
    let skills = required_if_present::<Vec<String>>(&body, "skills")
        .map_err(AppError::bad_request)?
        .map(trimmed_list);
    let payment_eligible =
        required_if_present::<bool>(&body, "paymentEligible").map_err(AppError::bad_request)?;

    let mut status = None;
    if let Some(raw) = required_if_present::<String>(&body, "status").map_err(AppError::bad_request)? {
        let current: ContractorStatus = existing.status.parse()?;
        let next: ContractorStatus = raw.parse()?;
        check_transition(current, next)?;
        if next != current {
            info!(contractor_id = %contractor_id, from = %current, to = %next, "contractor status changed");
            status = Some(next.as_str().to_string());
        }
    }

    let changeset = ContractorChangeset {
        first_name,
        last_name,
        email,
        phone: nullable_text("phone")?,
        country,
        timezone: nullable_text("timezone")?,
        hourly_rate,
        weekly_cap,
        skills,
        bio: nullable_text("bio")?,
        status,
        payment_eligible,
        deel_contract_id: nullable_text("deelContractId")?,
        time_tracking_id: nullable_text("timeTrackingId")?,
        updated_at: Utc::now().naive_utc(),
    };

    let contractor: Contractor = diesel::update(contractors::table.find(contractor_id))
        .set(&changeset)
        .get_result(&mut conn)
        .map_err(unique_violation("a contractor with this email already exists"))?;

    Ok(Json(contractor.into()))
}

pub async fn delete_contractor(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(contractors::table.find(contractor_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(contractor_id = %contractor_id, "contractor deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_contractor_notes(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
) -> AppResult<Json<Vec<NoteResponse>>> {
    let mut conn = state.db()?;
    let contractor: Contractor = contractors::table.find(contractor_id).first(&mut conn)?;

    let notes: Vec<ContractorNote> = ContractorNote::belonging_to(&contractor)
        .order(contractor_notes::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

pub async fn create_contractor_note(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
    TeamMember(user): TeamMember,
    Json(payload): Json<NoteRequest>,
) -> AppResult<(StatusCode, Json<NoteResponse>)> {
    let note_text = require_text(payload.note_text, "noteText")?;
    let mut conn = state.db()?;
    contractors::table
        .find(contractor_id)
        .select(contractors::id)
        .first::<Uuid>(&mut conn)?;

    let new_note = NewContractorNote {
        id: Uuid::new_v4(),
        contractor_id,
        note_text,
        author_id: optional_text(payload.author_id).unwrap_or_else(|| user.user_id.clone()),
        author_name: optional_text(payload.author_name)
            .unwrap_or_else(|| user.display_name().to_string()),
    };

    let note: ContractorNote = diesel::insert_into(contractor_notes::table)
        .values(&new_note)
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(note.into())))
}

pub async fn create_contractor_document(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
    Json(payload): Json<CreateDocumentRequest>,
) -> AppResult<(StatusCode, Json<DocumentResponse>)> {
    let doc_type: DocumentType = require_text(payload.doc_type, "type")?.parse()?;
    let title = require_text(payload.title, "title")?;

    let mut conn = state.db()?;
    contractors::table
        .find(contractor_id)
        .select(contractors::id)
        .first::<Uuid>(&mut conn)?;

    let new_document = NewDocument {
        id: Uuid::new_v4(),
        contractor_id,
        doc_type: doc_type.as_str().to_string(),
        title,
        status: DocumentStatus::Pending.as_str().to_string(),
        file_url: optional_text(payload.file_url),
    };

    let document: Document = diesel::insert_into(documents::table)
        .values(&new_document)
        .get_result(&mut conn)?;

    info!(document_id = %document.id, contractor_id = %contractor_id, doc_type = %document.doc_type, "document created");
    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn request_background_check(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
) -> AppResult<Json<BackgroundCheckResponse>> {
    let contractor: Contractor = {
        let mut conn = state.db()?;
        contractors::table.find(contractor_id).first(&mut conn)?
    };

    if contractor.checkr_candidate_id.is_some() {
        return Err(AppError::bad_request(
            "a background check has already been requested for this contractor",
        ));
    }
    let current: ContractorStatus = contractor.status.parse()?;
    check_transition(current, ContractorStatus::PendingCheckr)?;

    let candidate = state
        .integrations
        .background_check
        .create_candidate(&CandidateRequest {
            contractor_id,
            email: contractor.email.clone(),
            first_name: contractor.first_name.clone(),
            last_name: contractor.last_name.clone(),
            phone: contractor.phone.clone(),
            country: contractor.country.clone(),
        })
        .await?;
    let invitation = state
        .integrations
        .background_check
        .create_invitation(&candidate.id, &state.config.background_check_package)
        .await?;

    let mut conn = state.db()?;
    let updated: Contractor = diesel::update(contractors::table.find(contractor_id))
        .set((
            contractors::checkr_candidate_id.eq(Some(candidate.id.clone())),
            contractors::checkr_status.eq(Some(CheckStatus::Pending.as_str())),
            contractors::status.eq(ContractorStatus::PendingCheckr.as_str()),
            contractors::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)?;

    info!(contractor_id = %contractor_id, candidate_id = %candidate.id, "background check requested");
    Ok(Json(BackgroundCheckResponse {
        contractor: updated.into(),
        invitation_url: invitation.invitation_url,
    }))
}

pub async fn refresh_background_check(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
) -> AppResult<Json<ContractorResponse>> {
    let contractor: Contractor = {
        let mut conn = state.db()?;
        contractors::table.find(contractor_id).first(&mut conn)?
    };
    let candidate_id = contractor
        .checkr_candidate_id
        .clone()
        .ok_or_else(|| AppError::bad_request("no background check has been requested"))?;

    let check_status = state
        .integrations
        .background_check
        .candidate_status(&candidate_id)
        .await?;

    let current: ContractorStatus = contractor.status.parse()?;
    let next_status = if check_status == CheckStatus::Clear
        && current == ContractorStatus::PendingCheckr
    {
        check_transition(current, ContractorStatus::Active)?;
        ContractorStatus::Active
    } else {
        current
    };

    let mut conn = state.db()?;
    let updated: Contractor = diesel::update(contractors::table.find(contractor_id))
        .set((
            contractors::checkr_status.eq(Some(check_status.as_str())),
            contractors::status.eq(next_status.as_str()),
            contractors::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)?;

    info!(
        contractor_id = %contractor_id,
        check_status = %check_status,
        status = %next_status,
        "background check refreshed"
    );
    Ok(Json(updated.into()))
}

pub async fn create_payroll_contract(
    State(state): State<AppState>,
    Path(contractor_id): Path<Uuid>,
) -> AppResult<Json<ContractorResponse>> {
    let (contractor, job_title) = {
        let mut conn = state.db()?;
        let contractor: Contractor = contractors::table.find(contractor_id).first(&mut conn)?;
        let job_title: Option<String> = applications::table
            .inner_join(jobs::table)
            .filter(applications::email.eq(&contractor.email))
            .filter(applications::status.eq(ApplicationStatus::Hired.as_str()))
            .order(applications::updated_at.desc())
            .select(jobs::title)
            .first(&mut conn)
            .optional()?;
        (contractor, job_title)
    };

    if contractor
        .deel_contract_id
        .as_deref()
        .is_some_and(|value| !value.trim().is_empty())
    {
        return Err(AppError::bad_request(
            "contractor already has a payroll contract",
        ));
    }

    let contract = state
        .integrations
        .payroll
        .create_contract(&ContractRequest {
            contractor_id,
            email: contractor.email.clone(),
            first_name: contractor.first_name.clone(),
            last_name: contractor.last_name.clone(),
            job_title: job_title.unwrap_or_else(|| "Contractor".to_string()),
            hourly_rate: contractor.hourly_rate,
            country: contractor.country.clone(),
            start_date: Utc::now().date_naive(),
        })
        .await?;

    let mut conn = state.db()?;
    let updated: Contractor = diesel::update(contractors::table.find(contractor_id))
        .set((
            contractors::deel_contract_id.eq(Some(contract.id.clone())),
            contractors::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)?;

    info!(contractor_id = %contractor_id, contract_id = %contract.id, "payroll contract created");
    Ok(Json(updated.into()))
}

fn ensure_email_free(
    conn: &mut PgConnection,
    email: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut query = contractors::table
        .filter(contractors::email.eq(email))
        .select(contractors::id)
        .into_boxed();
    if let Some(id) = except {
        query = query.filter(contractors::id.ne(id));
    }
    if query.first::<Uuid>(conn).optional()?.is_some() {
        return Err(AppError::bad_request(
            "a contractor with this email already exists",
        ));
    }
    Ok(())
}

fn validate_rate(rate: f64) -> AppResult<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(AppError::bad_request("hourlyRate must be greater than 0"));
    }
    Ok(())
}

fn validate_cap(cap: f64) -> AppResult<()> {
    if !cap.is_finite() || cap < 0.0 {
        return Err(AppError::bad_request("weeklyCap must not be negative"));
    }
    Ok(())
}
