//! Worker portal: public job board plus the signed-in worker's own
//! applications, interview, payments and documents. Everything personal is
//! scoped to the identity email.

use axum::extract::State;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    aggregates::{paid_earnings, pending_earnings, total_hours},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    integrations::ai::{InterviewAnalysis, InterviewAnswer, InterviewContext, InterviewQuestion},
    models::{
        Application, Contractor, Document, Job, NewApplicationNote, Payment, Project,
        ProjectAssignment, TimeEntry,
    },
    schema::{
        applications, contractors, documents, jobs, payments, project_assignments, projects,
        time_entries,
    },
    state::AppState,
    utils::extract::{Json, Path, Query},
    workflow::{
        check_transition, ApplicationStatus, AssignmentStatus, DocumentStatus, InterviewStatus,
        JobStatus, PayType,
    },
};

use super::{
    applications::{append_note_best_effort, ApplicationResponse, JobSummary, AI_AUTHOR_ID},
    contains_pattern,
    contractors::ContractorResponse,
    documents::{transition_document, DocumentResponse},
    hours::TimeEntryResponse,
    jobs::JobResponse,
    payments::PaymentResponse,
    projects::{AssignmentResponse, ProjectSummary},
};

const AI_INTERVIEW_AUTHOR: &str = "AI Interview";
const DASHBOARD_TIME_ENTRIES: i64 = 5;
const DASHBOARD_PAYMENTS: usize = 3;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicJobQuery {
    pub search: Option<String>,
    pub pay_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestionsRequest {
    pub application_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSubmission {
    pub application_id: Option<Uuid>,
    #[serde(default)]
    pub responses: Vec<InterviewAnswer>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyApplication {
    #[serde(flatten)]
    pub application: ApplicationResponse,
    pub job: JobSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestionsResponse {
    pub application_id: Uuid,
    pub job_title: String,
    pub questions: Vec<InterviewQuestion>,
    pub total_time: u32,
}

#[derive(Serialize)]
pub struct InterviewResultResponse {
    pub application: ApplicationResponse,
    pub analysis: InterviewAnalysis,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub contractor: ContractorResponse,
    pub assignments: Vec<AssignmentResponse>,
    pub recent_time_entries: Vec<TimeEntryResponse>,
    pub recent_payments: Vec<PaymentResponse>,
    pub pending_documents: Vec<DocumentResponse>,
    pub total_hours: f64,
    pub total_earnings: f64,
    pub pending_earnings: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyPaymentsResponse {
    pub payments: Vec<PaymentResponse>,
    pub total_paid: f64,
    pub total_pending: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyDocumentsResponse {
    pub documents: Vec<DocumentResponse>,
    pub signed_count: usize,
    pub outstanding_count: usize,
}

pub async fn list_public_jobs(
    State(state): State<AppState>,
    Query(query): Query<PublicJobQuery>,
) -> AppResult<Json<Vec<JobResponse>>> {
    let pay_type = match query.pay_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) if value.eq_ignore_ascii_case("all") => None,
        Some(value) => Some(value.parse::<PayType>()?),
    };

    let mut conn = state.db()?;
    let mut rows_query = jobs::table
        .filter(jobs::status.eq(JobStatus::Published.as_str()))
        .into_boxed();
    if let Some(pay_type) = pay_type {
        rows_query = rows_query.filter(jobs::pay_type.eq(pay_type.as_str()));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        rows_query = rows_query.filter(
            jobs::title
                .ilike(pattern.clone())
                .or(jobs::short_description.ilike(pattern)),
        );
    }

    let rows: Vec<Job> = rows_query
        .order((jobs::published_at.desc(), jobs::created_at.desc()))
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn get_public_job(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<JobResponse>> {
    let mut conn = state.db()?;
    let job: Job = jobs::table
        .filter(jobs::slug.eq(&slug))
        .filter(jobs::status.eq(JobStatus::Published.as_str()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("job"))?;

    Ok(Json(job.into()))
}

pub async fn my_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<MyApplication>>> {
    let mut conn = state.db()?;
    let rows: Vec<(Application, Job)> = applications::table
        .inner_join(jobs::table)
        .filter(applications::email.eq(&user.email))
        .order(applications::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(application, job)| MyApplication {
                job: JobSummary::from(&job),
                application: application.into(),
            })
            .collect(),
    ))
}

pub async fn interview_questions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<InterviewQuestionsRequest>,
) -> AppResult<Json<InterviewQuestionsResponse>> {
    let application_id = payload
        .application_id
        .ok_or_else(|| AppError::bad_request("applicationId is required"))?;
    let (application, job) = {
        let mut conn = state.db()?;
        own_application(&mut conn, &user, application_id)?
    };

    let questions = state
        .integrations
        .ai
        .interview_questions(&interview_context(&application, &job))
        .await?;
    let total_time = questions.iter().map(|question| question.time_limit).sum();

    Ok(Json(InterviewQuestionsResponse {
        application_id,
        job_title: job.title,
        questions,
        total_time,
    }))
}

pub async fn submit_interview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<InterviewSubmission>,
) -> AppResult<Json<InterviewResultResponse>> {
    let application_id = payload
        .application_id
        .ok_or_else(|| AppError::bad_request("applicationId is required"))?;
    if payload.responses.is_empty() {
        return Err(AppError::bad_request("responses are required"));
    }

    let (application, job) = {
        let mut conn = state.db()?;
        own_application(&mut conn, &user, application_id)?
    };
    let current: ApplicationStatus = application.status.parse()?;
    if !matches!(
        current,
        ApplicationStatus::Shortlisted | ApplicationStatus::Interviewing
    ) {
        return Err(AppError::bad_request(
            "this application is not at the interview stage",
        ));
    }
    check_transition(current, ApplicationStatus::Interviewing)?;

    let analysis = state
        .integrations
        .ai
        .analyze_interview(&interview_context(&application, &job), &payload.responses)
        .await?;

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let updated: Application = diesel::update(applications::table.find(application_id))
        .set((
            applications::interview_score.eq(Some(analysis.overall_score)),
            applications::interview_status.eq(Some(InterviewStatus::Completed.as_str())),
            applications::interview_completed_at.eq(Some(now)),
            applications::status.eq(ApplicationStatus::Interviewing.as_str()),
            applications::updated_at.eq(now),
        ))
        .get_result(&mut conn)?;

    let note = NewApplicationNote {
        id: Uuid::new_v4(),
        application_id,
        note_text: format!(
            "AI Video Interview completed. Overall Score: {}/100. Recommendation: {}",
            analysis.overall_score, analysis.recommendation
        ),
        author_id: AI_AUTHOR_ID.to_string(),
        author_name: AI_INTERVIEW_AUTHOR.to_string(),
    };
    append_note_best_effort(&mut conn, &note);

    info!(
        application_id = %application_id,
        score = analysis.overall_score,
        answers = payload.responses.len(),
        "interview submitted"
    );
    Ok(Json(InterviewResultResponse {
        application: updated.into(),
        analysis,
    }))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    let mut conn = state.db()?;
    let contractor = current_contractor(&mut conn, &user)?;

    let assignment_rows: Vec<(ProjectAssignment, Project)> = project_assignments::table
        .inner_join(projects::table)
        .filter(project_assignments::contractor_id.eq(contractor.id))
        .filter(project_assignments::status.eq(AssignmentStatus::Active.as_str()))
        .order(project_assignments::assigned_at.desc())
        .load(&mut conn)?;

    let all_hours: Vec<TimeEntry> = TimeEntry::belonging_to(&contractor).load(&mut conn)?;
    let recent_entries: Vec<(TimeEntry, Project)> = time_entries::table
        .inner_join(projects::table)
        .filter(time_entries::contractor_id.eq(contractor.id))
        .order((time_entries::work_date.desc(), time_entries::created_at.desc()))
        .limit(DASHBOARD_TIME_ENTRIES)
        .load(&mut conn)?;

    let payment_rows: Vec<Payment> = Payment::belonging_to(&contractor)
        .order(payments::created_at.desc())
        .load(&mut conn)?;

    let pending_documents: Vec<Document> = Document::belonging_to(&contractor)
        .filter(documents::status.eq_any(vec![
            DocumentStatus::Pending.as_str(),
            DocumentStatus::Sent.as_str(),
        ]))
        .order(documents::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(DashboardResponse {
        assignments: assignment_rows
            .into_iter()
            .map(|(assignment, project)| {
                AssignmentResponse::from(assignment).with_project(ProjectSummary::from(&project))
            })
            .collect(),
        recent_time_entries: recent_entries
            .into_iter()
            .map(|(entry, project)| {
                TimeEntryResponse::from(entry).with_project(ProjectSummary::from(&project))
            })
            .collect(),
        total_hours: total_hours(&all_hours),
        total_earnings: paid_earnings(&payment_rows),
        pending_earnings: pending_earnings(&payment_rows),
        recent_payments: payment_rows
            .into_iter()
            .take(DASHBOARD_PAYMENTS)
            .map(Into::into)
            .collect(),
        pending_documents: pending_documents.into_iter().map(Into::into).collect(),
        contractor: contractor.into(),
    }))
}

pub async fn my_payments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<MyPaymentsResponse>> {
    let mut conn = state.db()?;
    let contractor = current_contractor(&mut conn, &user)?;
    let rows: Vec<Payment> = Payment::belonging_to(&contractor)
        .order(payments::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(MyPaymentsResponse {
        total_paid: paid_earnings(&rows),
        total_pending: pending_earnings(&rows),
        payments: rows.into_iter().map(Into::into).collect(),
    }))
}

pub async fn my_documents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<MyDocumentsResponse>> {
    let mut conn = state.db()?;
    let contractor = current_contractor(&mut conn, &user)?;
    let rows: Vec<Document> = Document::belonging_to(&contractor)
        .order(documents::created_at.desc())
        .load(&mut conn)?;

    let signed_count = rows
        .iter()
        .filter(|doc| doc.status == DocumentStatus::Signed.as_str())
        .count();
    let outstanding_count = rows
        .iter()
        .filter(|doc| {
            [DocumentStatus::Pending, DocumentStatus::Sent, DocumentStatus::Viewed]
                .iter()
                .any(|status| doc.status == status.as_str())
        })
        .count();

    Ok(Json(MyDocumentsResponse {
        documents: rows.into_iter().map(Into::into).collect(),
        signed_count,
        outstanding_count,
    }))
}

pub async fn mark_document_viewed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentResponse>> {
    let mut conn = state.db()?;
    let document = own_document(&mut conn, &user, document_id)?;
    let document = transition_document(&mut conn, document, DocumentStatus::Viewed)?;
    Ok(Json(document.into()))
}

pub async fn sign_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentResponse>> {
    let mut conn = state.db()?;
    let document = own_document(&mut conn, &user, document_id)?;
    let document = transition_document(&mut conn, document, DocumentStatus::Signed)?;
    Ok(Json(document.into()))
}

fn current_contractor(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
) -> AppResult<Contractor> {
    contractors::table
        .filter(contractors::email.eq(&user.email))
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("contractor"))
}

/// Someone else's application is reported as missing.
fn own_application(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    application_id: Uuid,
) -> AppResult<(Application, Job)> {
    applications::table
        .inner_join(jobs::table)
        .filter(applications::id.eq(application_id))
        .filter(applications::email.eq(&user.email))
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("application"))
}

fn own_document(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    document_id: Uuid,
) -> AppResult<Document> {
    documents::table
        .inner_join(contractors::table)
        .filter(documents::id.eq(document_id))
        .filter(contractors::email.eq(&user.email))
        .select(documents::all_columns)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("document"))
}

fn interview_context(application: &Application, job: &Job) -> InterviewContext {
    InterviewContext {
        application_id: application.id,
        applicant_name: application.full_name.clone(),
        job_title: job.title.clone(),
        skill_tags: job.skill_tags.clone(),
        responsibilities: job.responsibilities.clone(),
        requirements: job.requirements.clone(),
    }
}
