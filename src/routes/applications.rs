use std::collections::HashMap;

use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, Utc};
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::TeamMember,
    error::{unique_violation, AppError, AppResult},
    integrations::ai::{ScreeningInput, ScreeningResult},
    models::{Application, ApplicationNote, Job, NewApplication, NewApplicationNote},
    schema::{application_notes, applications, jobs},
    state::AppState,
    utils::extract::{Json, Path, Query},
    workflow::{check_transition, parse_filter, ApplicationSource, ApplicationStatus, JobStatus},
};

use super::{
    contains_pattern, optional_text, require_text, to_iso, NoteRequest, NoteResponse,
};

pub(crate) const AI_AUTHOR_ID: &str = "ai-system";
const AI_SCREENING_AUTHOR: &str = "AI Screening";

#[derive(Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    pub job: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    pub job_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
    pub resume_url: Option<String>,
    pub why_interested: Option<String>,
    pub relevant_experience: Option<String>,
    pub expected_rate: Option<f64>,
    pub available_hours: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub source: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateApplicationRequest {
    pub status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub timezone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub github_url: Option<String>,
    pub resume_url: Option<String>,
    pub why_interested: String,
    pub relevant_experience: String,
    pub expected_rate: Option<f64>,
    pub available_hours: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub source: String,
    pub status: String,
    pub ai_score: Option<i32>,
    pub ai_summary: Option<String>,
    pub ai_strengths: Option<Vec<String>>,
    pub ai_weaknesses: Option<Vec<String>>,
    pub ai_screened_at: Option<String>,
    pub interview_score: Option<i32>,
    pub interview_status: Option<String>,
    pub interview_completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            job_id: app.job_id,
            full_name: app.full_name,
            email: app.email,
            phone: app.phone,
            country: app.country,
            timezone: app.timezone,
            linkedin_url: app.linkedin_url,
            portfolio_url: app.portfolio_url,
            github_url: app.github_url,
            resume_url: app.resume_url,
            why_interested: app.why_interested,
            relevant_experience: app.relevant_experience,
            expected_rate: app.expected_rate,
            available_hours: app.available_hours,
            start_date: app.start_date,
            source: app.source,
            status: app.status,
            ai_score: app.ai_score,
            ai_summary: app.ai_summary,
            ai_strengths: app.ai_strengths,
            ai_weaknesses: app.ai_weaknesses,
            ai_screened_at: app.ai_screened_at.map(to_iso),
            interview_score: app.interview_score,
            interview_status: app.interview_status,
            interview_completed_at: app.interview_completed_at.map(to_iso),
            created_at: to_iso(app.created_at),
            updated_at: to_iso(app.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub status: String,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            slug: job.slug.clone(),
            short_description: job.short_description.clone(),
            status: job.status.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationListItem {
    #[serde(flatten)]
    pub application: ApplicationResponse,
    pub job: JobSummary,
    pub note_count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetailResponse {
    pub application: ApplicationResponse,
    pub job: JobSummary,
    pub notes: Vec<NoteResponse>,
}

#[derive(Serialize)]
pub struct ScreeningResponse {
    pub application: ApplicationResponse,
    pub analysis: ScreeningResult,
}

impl From<ApplicationNote> for NoteResponse {
    fn from(note: ApplicationNote) -> Self {
        Self {
            id: note.id,
            note_text: note.note_text,
            author_id: note.author_id,
            author_name: note.author_name,
            created_at: to_iso(note.created_at),
        }
    }
}

pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> AppResult<Json<Vec<ApplicationListItem>>> {
    let status = parse_filter::<ApplicationStatus>(query.status.as_deref())?;
    let mut conn = state.db()?;

    let mut rows_query = applications::table.inner_join(jobs::table).into_boxed();
    if let Some(status) = status {
        rows_query = rows_query.filter(applications::status.eq(status.as_str()));
    }
    if let Some(job_id) = query.job {
        rows_query = rows_query.filter(applications::job_id.eq(job_id));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        rows_query = rows_query.filter(
            applications::full_name
                .ilike(pattern.clone())
                .or(applications::email.ilike(pattern)),
        );
    }

    let rows: Vec<(Application, Job)> = rows_query
        .order(applications::created_at.desc())
        .load(&mut conn)?;

    let ids: Vec<Uuid> = rows.iter().map(|(app, _)| app.id).collect();
    let note_counts: HashMap<Uuid, i64> = application_notes::table
        .filter(application_notes::application_id.eq_any(&ids))
        .group_by(application_notes::application_id)
        .select((application_notes::application_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let response = rows
        .into_iter()
        .map(|(app, job)| {
            let note_count = note_counts.get(&app.id).copied().unwrap_or(0);
            ApplicationListItem {
                job: JobSummary::from(&job),
                application: app.into(),
                note_count,
            }
        })
        .collect();

    Ok(Json(response))
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<ApplicationDetailResponse>> {
    let mut conn = state.db()?;
    let (application, job): (Application, Job) = applications::table
        .inner_join(jobs::table)
        .filter(applications::id.eq(application_id))
        .first(&mut conn)?;

    let notes: Vec<ApplicationNote> = ApplicationNote::belonging_to(&application)
        .order(application_notes::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(ApplicationDetailResponse {
        job: JobSummary::from(&job),
        application: application.into(),
        notes: notes.into_iter().map(Into::into).collect(),
    }))
}

pub async fn update_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(payload): Json<UpdateApplicationRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    let raw_status = payload
        .status
        .ok_or_else(|| AppError::bad_request("status is required"))?;
    let next: ApplicationStatus = raw_status.parse()?;

    let mut conn = state.db()?;
    let existing: Application = applications::table.find(application_id).first(&mut conn)?;
    let current: ApplicationStatus = existing.status.parse()?;
    check_transition(current, next)?;

    if current == next {
        return Ok(Json(existing.into()));
    }

    let updated: Application = diesel::update(applications::table.find(application_id))
        .set((
            applications::status.eq(next.as_str()),
            applications::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)?;

    info!(
        application_id = %application_id,
        from = %current,
        to = %next,
        "application status changed"
    );
    Ok(Json(updated.into()))
}

pub async fn list_application_notes(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<Vec<NoteResponse>>> {
    let mut conn = state.db()?;
    let application: Application = applications::table.find(application_id).first(&mut conn)?;

    let notes: Vec<ApplicationNote> = ApplicationNote::belonging_to(&application)
        .order(application_notes::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

pub async fn create_application_note(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    TeamMember(user): TeamMember,
    Json(payload): Json<NoteRequest>,
) -> AppResult<(StatusCode, Json<NoteResponse>)> {
    let note_text = require_text(payload.note_text, "noteText")?;
    let mut conn = state.db()?;
    applications::table
        .find(application_id)
        .select(applications::id)
        .first::<Uuid>(&mut conn)?;

    let new_note = NewApplicationNote {
        id: Uuid::new_v4(),
        application_id,
        note_text,
        author_id: optional_text(payload.author_id).unwrap_or_else(|| user.user_id.clone()),
        author_name: optional_text(payload.author_name)
            .unwrap_or_else(|| user.display_name().to_string()),
    };

    let note: ApplicationNote = diesel::insert_into(application_notes::table)
        .values(&new_note)
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(note.into())))
}

pub async fn screen_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> AppResult<Json<ScreeningResponse>> {
    let (application, job): (Application, Job) = {
        let mut conn = state.db()?;
        applications::table
            .inner_join(jobs::table)
            .filter(applications::id.eq(application_id))
            .first(&mut conn)?
    };

    let input = ScreeningInput {
        application_id,
        applicant_name: application.full_name.clone(),
        job_title: job.title.clone(),
        job_description: job.full_description.clone(),
        requirements: job.requirements.clone(),
        skill_tags: job.skill_tags.clone(),
        resume_text: resume_text(&application),
    };
    let analysis = state.integrations.ai.screen_application(&input).await?;

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let updated: Application = diesel::update(applications::table.find(application_id))
        .set((
            applications::ai_score.eq(Some(analysis.overall_score)),
            applications::ai_summary.eq(Some(analysis.summary.clone())),
            applications::ai_strengths.eq(Some(analysis.strengths.clone())),
            applications::ai_weaknesses.eq(Some(analysis.weaknesses.clone())),
            applications::ai_screened_at.eq(Some(now)),
            applications::updated_at.eq(now),
        ))
        .get_result(&mut conn)?;

    let note = NewApplicationNote {
        id: Uuid::new_v4(),
        application_id,
        note_text: format!(
            "AI resume screening completed. Score: {}/100. Recommendation: {}",
            analysis.overall_score, analysis.recommendation
        ),
        author_id: AI_AUTHOR_ID.to_string(),
        author_name: AI_SCREENING_AUTHOR.to_string(),
    };
    append_note_best_effort(&mut conn, &note);

    info!(
        application_id = %application_id,
        score = analysis.overall_score,
        recommendation = %analysis.recommendation,
        "application screened"
    );
    Ok(Json(ScreeningResponse {
        application: updated.into(),
        analysis,
    }))
}

/// Public submission from the worker portal.
pub async fn submit_application(
    State(state): State<AppState>,
    Json(payload): Json<SubmitApplicationRequest>,
) -> AppResult<(StatusCode, Json<ApplicationResponse>)> {
    let job_id = payload
        .job_id
        .ok_or_else(|| AppError::bad_request("jobId is required"))?;
    let full_name = require_text(payload.full_name, "fullName")?;
    let email = require_text(payload.email, "email")?.to_lowercase();
    let phone = require_text(payload.phone, "phone")?;
    let country = require_text(payload.country, "country")?;
    let why_interested = require_text(payload.why_interested, "whyInterested")?;
    let relevant_experience = require_text(payload.relevant_experience, "relevantExperience")?;
    let source = match optional_text(payload.source) {
        Some(raw) => raw.parse::<ApplicationSource>()?,
        None => ApplicationSource::Other,
    };

    let mut conn = state.db()?;
    let job: Job = jobs::table
        .find(job_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("job"))?;

    if job.status != JobStatus::Published.as_str() {
        return Err(AppError::bad_request("this job is not accepting applications"));
    }

    let already_applied: bool = diesel::select(diesel::dsl::exists(
        applications::table
            .filter(applications::job_id.eq(job_id))
            .filter(applications::email.eq(&email)),
    ))
    .get_result(&mut conn)?;
    if already_applied {
        return Err(AppError::bad_request("you have already applied to this job"));
    }

    let new_application = NewApplication {
        id: Uuid::new_v4(),
        job_id,
        full_name,
        email,
        phone,
        country,
        timezone: optional_text(payload.timezone),
        linkedin_url: optional_text(payload.linkedin_url),
        portfolio_url: optional_text(payload.portfolio_url),
        github_url: optional_text(payload.github_url),
        resume_url: optional_text(payload.resume_url),
        why_interested,
        relevant_experience,
        expected_rate: payload.expected_rate,
        available_hours: payload.available_hours,
        start_date: payload.start_date,
        source: source.as_str().to_string(),
        status: ApplicationStatus::New.as_str().to_string(),
    };

    let application: Application = diesel::insert_into(applications::table)
        .values(&new_application)
        .get_result(&mut conn)
        .map_err(unique_violation("you have already applied to this job"))?;

    info!(application_id = %application.id, job_id = %job_id, "application submitted");
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// Audit notes written as a side effect never fail the primary operation.
pub(crate) fn append_note_best_effort(conn: &mut PgConnection, note: &NewApplicationNote) {
    if let Err(err) = diesel::insert_into(application_notes::table)
        .values(note)
        .execute(conn)
    {
        warn!(
            application_id = %note.application_id,
            error = %err,
            "failed to append application note"
        );
    }
}

fn resume_text(application: &Application) -> String {
    let mut sections = vec![
        format!("Why interested:\n{}", application.why_interested),
        format!("Relevant experience:\n{}", application.relevant_experience),
    ];
    for (label, link) in [
        ("Resume", &application.resume_url),
        ("Portfolio", &application.portfolio_url),
        ("LinkedIn", &application.linkedin_url),
        ("GitHub", &application.github_url),
    ] {
        if let Some(link) = link {
            sections.push(format!("{label}: {link}"));
        }
    }
    sections.join("\n\n")
}
