use std::collections::HashMap;

use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::{dsl::count_star, prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::TeamMember,
    error::{unique_violation, AppError, AppResult},
    models::{Application, Job, NewJob},
    schema::{applications, jobs},
    slug::unique_slug,
    state::AppState,
    utils::{
        extract::{Json, Path, Query},
        json::{classify_nullable, required_if_present},
    },
    workflow::{check_transition, parse_filter, JobStatus, PayType},
};

use super::{
    applications::ApplicationResponse, optional_text, require_text, to_iso, trimmed_list,
};

/// Each lost slug race means another insert committed, so this bounds how
/// many simultaneous same-title creates are absorbed.
const SLUG_ATTEMPTS: u32 = 5;

#[derive(Deserialize)]
pub struct JobListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub nice_to_have: Option<String>,
    pub pay_min: Option<f64>,
    pub pay_max: Option<f64>,
    pub pay_type: Option<String>,
    pub time_commitment: Option<String>,
    pub remote_worldwide: Option<bool>,
    #[serde(default)]
    pub allowed_countries: Vec<String>,
    #[serde(default)]
    pub skill_tags: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    pub status: Option<String>,
    pub application_deadline: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub full_description: String,
    pub responsibilities: String,
    pub requirements: String,
    pub nice_to_have: Option<String>,
    pub pay_min: f64,
    pub pay_max: f64,
    pub pay_type: String,
    pub time_commitment: String,
    pub remote_worldwide: bool,
    pub allowed_countries: Vec<String>,
    pub skill_tags: Vec<String>,
    pub tools: Vec<String>,
    pub status: String,
    pub application_deadline: Option<NaiveDate>,
    pub published_at: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            slug: job.slug,
            short_description: job.short_description,
            full_description: job.full_description,
            responsibilities: job.responsibilities,
            requirements: job.requirements,
            nice_to_have: job.nice_to_have,
            pay_min: job.pay_min,
            pay_max: job.pay_max,
            pay_type: job.pay_type,
            time_commitment: job.time_commitment,
            remote_worldwide: job.remote_worldwide,
            allowed_countries: job.allowed_countries,
            skill_tags: job.skill_tags,
            tools: job.tools,
            status: job.status,
            application_deadline: job.application_deadline,
            published_at: job.published_at.map(to_iso),
            created_by: job.created_by,
            created_at: to_iso(job.created_at),
            updated_at: to_iso(job.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListItem {
    #[serde(flatten)]
    pub job: JobResponse,
    pub application_count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailResponse {
    pub job: JobResponse,
    pub applications: Vec<ApplicationResponse>,
    pub application_count: usize,
}

#[derive(AsChangeset)]
#[diesel(table_name = jobs)]
struct JobChangeset {
    title: Option<String>,
    short_description: Option<String>,
    full_description: Option<String>,
    responsibilities: Option<String>,
    requirements: Option<String>,
    nice_to_have: Option<Option<String>>,
    pay_min: Option<f64>,
    pay_max: Option<f64>,
    pay_type: Option<String>,
    time_commitment: Option<String>,
    remote_worldwide: Option<bool>,
    allowed_countries: Option<Vec<String>>,
    skill_tags: Option<Vec<String>>,
    tools: Option<Vec<String>>,
    status: Option<String>,
    application_deadline: Option<Option<NaiveDate>>,
    published_at: Option<Option<NaiveDateTime>>,
    updated_at: NaiveDateTime,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> AppResult<Json<Vec<JobListItem>>> {
    let status = parse_filter::<JobStatus>(query.status.as_deref())?;
    let mut conn = state.db()?;

    let mut jobs_query = jobs::table.into_boxed();
    if let Some(status) = status {
        jobs_query = jobs_query.filter(jobs::status.eq(status.as_str()));
    }
    let job_rows: Vec<Job> = jobs_query.order(jobs::created_at.desc()).load(&mut conn)?;

    let counts: HashMap<Uuid, i64> = applications::table
        .group_by(applications::job_id)
        .select((applications::job_id, count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let response = job_rows
        .into_iter()
        .map(|job| {
            let application_count = counts.get(&job.id).copied().unwrap_or(0);
            JobListItem {
                job: job.into(),
                application_count,
            }
        })
        .collect();

    Ok(Json(response))
}

pub async fn create_job(
    State(state): State<AppState>,
    TeamMember(user): TeamMember,
    Json(payload): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<JobResponse>)> {
    let title = require_text(payload.title, "title")?;
    let short_description = require_text(payload.short_description, "shortDescription")?;
    let full_description = require_text(payload.full_description, "fullDescription")?;
    let responsibilities = require_text(payload.responsibilities, "responsibilities")?;
    let requirements = require_text(payload.requirements, "requirements")?;
    let pay_min = payload
        .pay_min
        .ok_or_else(|| AppError::bad_request("payMin is required"))?;
    let pay_max = payload
        .pay_max
        .ok_or_else(|| AppError::bad_request("payMax is required"))?;
    validate_pay_range(pay_min, pay_max)?;

    let pay_type = match payload.pay_type.as_deref() {
        Some(raw) => raw.parse::<PayType>()?,
        None => PayType::Hourly,
    };
    let status = match payload.status.as_deref() {
        Some(raw) => raw.parse::<JobStatus>()?,
        None => JobStatus::Draft,
    };
    if !matches!(status, JobStatus::Draft | JobStatus::Published) {
        return Err(AppError::bad_request(
            "jobs can only be created as DRAFT or PUBLISHED",
        ));
    }

    let nice_to_have = optional_text(payload.nice_to_have);
    let time_commitment =
        optional_text(payload.time_commitment).unwrap_or_else(|| "Part-time".to_string());
    let remote_worldwide = payload.remote_worldwide.unwrap_or(true);
    let allowed_countries = trimmed_list(payload.allowed_countries);
    let skill_tags = trimmed_list(payload.skill_tags);
    let tools = trimmed_list(payload.tools);
    let published_at = (status == JobStatus::Published).then(|| Utc::now().naive_utc());

    let mut conn = state.db()?;
    let job = insert_job(&mut conn, &title, |slug| NewJob {
        id: Uuid::new_v4(),
        title: title.clone(),
        slug,
        short_description: short_description.clone(),
        full_description: full_description.clone(),
        responsibilities: responsibilities.clone(),
        requirements: requirements.clone(),
        nice_to_have: nice_to_have.clone(),
        pay_min,
        pay_max,
        pay_type: pay_type.as_str().to_string(),
        time_commitment: time_commitment.clone(),
        remote_worldwide,
        allowed_countries: allowed_countries.clone(),
        skill_tags: skill_tags.clone(),
        tools: tools.clone(),
        status: status.as_str().to_string(),
        application_deadline: payload.application_deadline,
        published_at,
        created_by: Some(user.user_id.clone()),
    })?;

    info!(job_id = %job.id, slug = %job.slug, status = %job.status, "job created");
    Ok((StatusCode::CREATED, Json(job.into())))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<JobDetailResponse>> {
    let mut conn = state.db()?;
    let job: Job = jobs::table.find(job_id).first(&mut conn)?;

    let application_rows: Vec<Application> = Application::belonging_to(&job)
        .order(applications::created_at.desc())
        .load(&mut conn)?;

    let application_count = application_rows.len();
    Ok(Json(JobDetailResponse {
        job: job.into(),
        applications: application_rows.into_iter().map(Into::into).collect(),
        application_count,
    }))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<JobResponse>> {
    let mut conn = state.db()?;
    let existing: Job = jobs::table.find(job_id).first(&mut conn)?;
    let now = Utc::now().naive_utc();

    let text_field = |field: &str| -> AppResult<Option<String>> {
        match required_if_present::<String>(&body, field).map_err(AppError::bad_request)? {
            Some(value) => Ok(Some(require_text(Some(value), field)?)),
            None => Ok(None),
        }
    };

    let title = text_field("title")?;
    let short_description = text_field("shortDescription")?;
    let full_description = text_field("fullDescription")?;
    let responsibilities = text_field("responsibilities")?;
    let requirements = text_field("requirements")?;
    let time_commitment = text_field("timeCommitment")?;

    let nice_to_have = classify_nullable::<String>(&body, "niceToHave")
        .map_err(AppError::bad_request)?
        .into_change()
        .map(optional_text);
    let application_deadline = classify_nullable::<NaiveDate>(&body, "applicationDeadline")
        .map_err(AppError::bad_request)?
        .into_change();

    let pay_min = required_if_present::<f64>(&body, "payMin").map_err(AppError::bad_request)?;
    let pay_max = required_if_present::<f64>(&body, "payMax").map_err(AppError::bad_request)?;
    if pay_min.is_some() || pay_max.is_some() {
        validate_pay_range(
            pay_min.unwrap_or(existing.pay_min),
            pay_max.unwrap_or(existing.pay_max),
        )?;
    }

    let pay_type = required_if_present::<String>(&body, "payType")
        .map_err(AppError::bad_request)?
        .map(|raw| raw.parse::<PayType>())
        .transpose()?;
    let remote_worldwide =
        required_if_present::<bool>(&body, "remoteWorldwide").map_err(AppError::bad_request)?;
    let list_field = |field: &str| -> AppResult<Option<Vec<String>>> {
        Ok(required_if_present::<Vec<String>>(&body, field)
            .map_err(AppError::bad_request)?
            .map(trimmed_list))
    };
    let allowed_countries = list_field("allowedCountries")?;
    let skill_tags = list_field("skillTags")?;
    let tools = list_field("tools")?;

    let mut status_change = None;
    let mut published_at = None;
    if let Some(raw) = required_if_present::<String>(&body, "status").map_err(AppError::bad_request)? {
        let current: JobStatus = existing.status.parse()?;
        let next: JobStatus = raw.parse()?;
        check_transition(current, next)?;
        if next != current {
            if next == JobStatus::Published {
                published_at = Some(Some(now));
            }
            status_change = Some(next.as_str().to_string());
        }
    }

    let changeset = JobChangeset {
        title,
        short_description,
        full_description,
        responsibilities,
        requirements,
        nice_to_have,
        pay_min,
        pay_max,
        pay_type: pay_type.map(|value| value.as_str().to_string()),
        time_commitment,
        remote_worldwide,
        allowed_countries,
        skill_tags,
        tools,
        status: status_change.clone(),
        application_deadline,
        published_at,
        updated_at: now,
    };

    let job: Job = diesel::update(jobs::table.find(job_id))
        .set(&changeset)
        .get_result(&mut conn)?;

    if let Some(status) = status_change {
        info!(job_id = %job.id, from = %existing.status, to = %status, "job status changed");
    }

    Ok(Json(job.into()))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(jobs::table.find(job_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(job_id = %job_id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn duplicate_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    TeamMember(user): TeamMember,
) -> AppResult<(StatusCode, Json<JobResponse>)> {
    let mut conn = state.db()?;
    let original: Job = jobs::table.find(job_id).first(&mut conn)?;
    let title = format!("{} (Copy)", original.title);

    let copy = insert_job(&mut conn, &title, |slug| NewJob {
        id: Uuid::new_v4(),
        title: title.clone(),
        slug,
        short_description: original.short_description.clone(),
        full_description: original.full_description.clone(),
        responsibilities: original.responsibilities.clone(),
        requirements: original.requirements.clone(),
        nice_to_have: original.nice_to_have.clone(),
        pay_min: original.pay_min,
        pay_max: original.pay_max,
        pay_type: original.pay_type.clone(),
        time_commitment: original.time_commitment.clone(),
        remote_worldwide: original.remote_worldwide,
        allowed_countries: original.allowed_countries.clone(),
        skill_tags: original.skill_tags.clone(),
        tools: original.tools.clone(),
        status: JobStatus::Draft.as_str().to_string(),
        application_deadline: None,
        published_at: None,
        created_by: Some(user.user_id.clone()),
    })?;

    info!(job_id = %job_id, copy_id = %copy.id, slug = %copy.slug, "job duplicated");
    Ok((StatusCode::CREATED, Json(copy.into())))
}

/// Inserts the job built for the first free slug of `title`. A concurrent
/// insert can claim that slug between the lookup and the insert; the clash is
/// retried with a fresh lookup up to `SLUG_ATTEMPTS` times.
fn insert_job<F>(conn: &mut PgConnection, title: &str, build: F) -> AppResult<Job>
where
    F: Fn(String) -> NewJob,
{
    let mut attempt = 1;
    loop {
        let result = conn.transaction::<Job, diesel::result::Error, _>(|conn| {
            let slug = unique_slug(title, |candidate| slug_taken(conn, candidate))?;
            let new_job = build(slug);
            diesel::insert_into(jobs::table)
                .values(&new_job)
                .execute(conn)?;
            jobs::table.find(new_job.id).first(conn)
        });

        match result {
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
                if attempt < SLUG_ATTEMPTS =>
            {
                warn!(title, attempt, "job slug taken concurrently; retrying");
                attempt += 1;
            }
            other => return other.map_err(unique_violation("job slug already exists")),
        }
    }
}

fn slug_taken(conn: &mut PgConnection, candidate: &str) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        jobs::table.filter(jobs::slug.eq(candidate)),
    ))
    .get_result(conn)
}

fn validate_pay_range(pay_min: f64, pay_max: f64) -> AppResult<()> {
    if pay_min < 0.0 || pay_max < 0.0 {
        return Err(AppError::bad_request("pay range must not be negative"));
    }
    if pay_min > pay_max {
        return Err(AppError::bad_request("payMin must not exceed payMax"));
    }
    Ok(())
}
