use std::collections::HashMap;

use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    aggregates::{project_stats, ProjectStats},
    error::{unique_violation, AppError, AppResult},
    models::{Contractor, NewProject, NewProjectAssignment, Project, ProjectAssignment, TimeEntry},
    schema::{contractors, project_assignments, projects, time_entries},
    state::AppState,
    utils::{
        extract::{Json, Path, Query},
        json::{classify_nullable, required_if_present},
    },
    workflow::{check_transition, parse_filter, AssignmentStatus, ProjectStatus},
};

use super::{
    contains_pattern, contractors::ContractorSummary, hours::TimeEntryResponse, optional_text,
    require_text, to_iso,
};

const RECENT_TIME_ENTRIES: usize = 20;

#[derive(Deserialize)]
pub struct ProjectListQuery {
    pub status: Option<String>,
    pub client: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub client: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub contractor_id: Option<Uuid>,
    pub role: Option<String>,
    pub hourly_rate: Option<f64>,
    pub weekly_cap: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            code: project.code,
            client: project.client,
            description: project.description,
            budget: project.budget,
            start_date: project.start_date,
            end_date: project.end_date,
            status: project.status,
            created_at: to_iso(project.created_at),
            updated_at: to_iso(project.updated_at),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub client: Option<String>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            code: project.code.clone(),
            client: project.client.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub contractor_id: Uuid,
    pub role: Option<String>,
    pub hourly_rate: Option<f64>,
    pub weekly_cap: Option<f64>,
    pub status: String,
    pub assigned_at: String,
    pub ended_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<ContractorSummary>,
}

impl AssignmentResponse {
    pub fn with_project(mut self, project: ProjectSummary) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_contractor(mut self, contractor: ContractorSummary) -> Self {
        self.contractor = Some(contractor);
        self
    }
}

impl From<ProjectAssignment> for AssignmentResponse {
    fn from(assignment: ProjectAssignment) -> Self {
        Self {
            id: assignment.id,
            project_id: assignment.project_id,
            contractor_id: assignment.contractor_id,
            role: assignment.role,
            hourly_rate: assignment.hourly_rate,
            weekly_cap: assignment.weekly_cap,
            status: assignment.status,
            assigned_at: to_iso(assignment.assigned_at),
            ended_at: assignment.ended_at.map(to_iso),
            project: None,
            contractor: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListItem {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub active_contractors: Vec<String>,
    pub assignment_count: usize,
    pub time_entry_count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetailResponse {
    pub project: ProjectResponse,
    pub assignments: Vec<AssignmentResponse>,
    pub recent_time_entries: Vec<TimeEntryResponse>,
    pub stats: ProjectStats,
}

#[derive(AsChangeset)]
#[diesel(table_name = projects)]
struct ProjectChangeset {
    name: Option<String>,
    code: Option<String>,
    client: Option<Option<String>>,
    description: Option<Option<String>>,
    budget: Option<Option<f64>>,
    start_date: Option<Option<NaiveDate>>,
    end_date: Option<Option<NaiveDate>>,
    status: Option<String>,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = project_assignments)]
struct AssignmentChangeset {
    role: Option<Option<String>>,
    hourly_rate: Option<Option<f64>>,
    weekly_cap: Option<Option<f64>>,
    status: Option<String>,
    ended_at: Option<Option<NaiveDateTime>>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<Vec<ProjectListItem>>> {
    let status = parse_filter::<ProjectStatus>(query.status.as_deref())?;
    let mut conn = state.db()?;

    let mut rows_query = projects::table.into_boxed();
    if let Some(status) = status {
        rows_query = rows_query.filter(projects::status.eq(status.as_str()));
    }
    if let Some(client) = query.client.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        rows_query = rows_query.filter(projects::client.ilike(contains_pattern(client)));
    }
    let rows: Vec<Project> = rows_query.order(projects::created_at.desc()).load(&mut conn)?;
    let ids: Vec<Uuid> = rows.iter().map(|project| project.id).collect();

    let assignment_rows: Vec<(Uuid, String, String, String)> = project_assignments::table
        .inner_join(contractors::table)
        .filter(project_assignments::project_id.eq_any(&ids))
        .order((contractors::first_name.asc(), contractors::last_name.asc()))
        .select((
            project_assignments::project_id,
            project_assignments::status,
            contractors::first_name,
            contractors::last_name,
        ))
        .load(&mut conn)?;

    let mut assignment_counts: HashMap<Uuid, usize> = HashMap::new();
    let mut active_contractors: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (project_id, status, first_name, last_name) in assignment_rows {
        *assignment_counts.entry(project_id).or_default() += 1;
        if status == AssignmentStatus::Active.as_str() {
            active_contractors
                .entry(project_id)
                .or_default()
                .push(format!("{first_name} {last_name}"));
        }
    }

    let entry_counts: HashMap<Uuid, i64> = time_entries::table
        .filter(time_entries::project_id.eq_any(&ids))
        .group_by(time_entries::project_id)
        .select((time_entries::project_id, diesel::dsl::count_star()))
        .load::<(Uuid, i64)>(&mut conn)?
        .into_iter()
        .collect();

    let response = rows
        .into_iter()
        .map(|project| ProjectListItem {
            active_contractors: active_contractors.remove(&project.id).unwrap_or_default(),
            assignment_count: assignment_counts.get(&project.id).copied().unwrap_or(0),
            time_entry_count: entry_counts.get(&project.id).copied().unwrap_or(0),
            project: project.into(),
        })
        .collect();

    Ok(Json(response))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<ProjectResponse>)> {
    let name = require_text(payload.name, "name")?;
    let code = require_text(payload.code, "code")?;
    if let Some(budget) = payload.budget {
        validate_budget(budget)?;
    }
    validate_dates(payload.start_date, payload.end_date)?;
    let status = match optional_text(payload.status) {
        Some(raw) => raw.parse::<ProjectStatus>()?,
        None => ProjectStatus::Active,
    };

    let mut conn = state.db()?;
    ensure_code_free(&mut conn, &code, None)?;

    let new_project = NewProject {
        id: Uuid::new_v4(),
        name,
        code,
        client: optional_text(payload.client),
        description: optional_text(payload.description),
        budget: payload.budget,
        start_date: payload.start_date,
        end_date: payload.end_date,
        status: status.as_str().to_string(),
    };

    let project: Project = diesel::insert_into(projects::table)
        .values(&new_project)
        .get_result(&mut conn)
        .map_err(unique_violation("a project with this code already exists"))?;

    info!(project_id = %project.id, code = %project.code, "project created");
    Ok((StatusCode::CREATED, Json(project.into())))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<ProjectDetailResponse>> {
    let mut conn = state.db()?;
    let project: Project = projects::table.find(project_id).first(&mut conn)?;

    let assignment_rows: Vec<(ProjectAssignment, Contractor)> = project_assignments::table
        .inner_join(contractors::table)
        .filter(project_assignments::project_id.eq(project_id))
        .order(project_assignments::assigned_at.desc())
        .load(&mut conn)?;

    let entry_rows: Vec<(TimeEntry, Contractor)> = time_entries::table
        .inner_join(contractors::table)
        .filter(time_entries::project_id.eq(project_id))
        .order((time_entries::work_date.desc(), time_entries::created_at.desc()))
        .load(&mut conn)?;

    let stats = project_stats(
        entry_rows
            .iter()
            .map(|(entry, contractor)| (entry, contractor.hourly_rate)),
        project.budget,
    );

    Ok(Json(ProjectDetailResponse {
        assignments: assignment_rows
            .into_iter()
            .map(|(assignment, contractor)| {
                AssignmentResponse::from(assignment)
                    .with_contractor(ContractorSummary::from(&contractor))
            })
            .collect(),
        recent_time_entries: entry_rows
            .into_iter()
            .take(RECENT_TIME_ENTRIES)
            .map(|(entry, contractor)| {
                TimeEntryResponse::from(entry).with_contractor(ContractorSummary::from(&contractor))
            })
            .collect(),
        stats,
        project: project.into(),
    }))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<ProjectResponse>> {
    let mut conn = state.db()?;
    let existing: Project = projects::table.find(project_id).first(&mut conn)?;

    let name = match required_if_present::<String>(&body, "name").map_err(AppError::bad_request)? {
        Some(value) => Some(require_text(Some(value), "name")?),
        None => None,
    };
    let code = match required_if_present::<String>(&body, "code").map_err(AppError::bad_request)? {
        Some(value) => Some(require_text(Some(value), "code")?),
        None => None,
    };
    if let Some(code) = code.as_deref() {
        if code != existing.code {
            ensure_code_free(&mut conn, code, Some(project_id))?;
        }
    }

    let client = classify_nullable::<String>(&body, "client")
        .map_err(AppError::bad_request)?
        .into_change()
        .map(optional_text);
    let description = classify_nullable::<String>(&body, "description")
        .map_err(AppError::bad_request)?
        .into_change()
        .map(optional_text);
    let budget = classify_nullable::<f64>(&body, "budget")
        .map_err(AppError::bad_request)?
        .into_change();
    if let Some(Some(budget)) = budget {
        validate_budget(budget)?;
    }

    let start_date = classify_nullable::<NaiveDate>(&body, "startDate")
        .map_err(AppError::bad_request)?
        .into_change();
    let end_date = classify_nullable::<NaiveDate>(&body, "endDate")
        .map_err(AppError::bad_request)?
        .into_change();
    validate_dates(
        start_date.unwrap_or(existing.start_date),
        end_date.unwrap_or(existing.end_date),
    )?;

    let mut status = None;
    if let Some(raw) = required_if_present::<String>(&body, "status").map_err(AppError::bad_request)? {
        let current: ProjectStatus = existing.status.parse()?;
        let next: ProjectStatus = raw.parse()?;
        check_transition(current, next)?;
        if next != current {
            info!(project_id = %project_id, from = %current, to = %next, "project status changed");
            status = Some(next.as_str().to_string());
        }
    }

    let changeset = ProjectChangeset {
        name,
        code,
        client,
        description,
        budget,
        start_date,
        end_date,
        status,
        updated_at: Utc::now().naive_utc(),
    };

    let project: Project = diesel::update(projects::table.find(project_id))
        .set(&changeset)
        .get_result(&mut conn)
        .map_err(unique_violation("a project with this code already exists"))?;

    Ok(Json(project.into()))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(projects::table.find(project_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(project_id = %project_id, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<AssignmentResponse>>> {
    let mut conn = state.db()?;
    projects::table
        .find(project_id)
        .select(projects::id)
        .first::<Uuid>(&mut conn)?;

    let rows: Vec<(ProjectAssignment, Contractor)> = project_assignments::table
        .inner_join(contractors::table)
        .filter(project_assignments::project_id.eq(project_id))
        .order(project_assignments::assigned_at.desc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter()
            .map(|(assignment, contractor)| {
                AssignmentResponse::from(assignment)
                    .with_contractor(ContractorSummary::from(&contractor))
            })
            .collect(),
    ))
}

pub async fn create_assignment(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    let contractor_id = payload
        .contractor_id
        .ok_or_else(|| AppError::bad_request("contractorId is required"))?;
    if let Some(rate) = payload.hourly_rate {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AppError::bad_request("hourlyRate must be greater than 0"));
        }
    }

    let mut conn = state.db()?;
    projects::table
        .find(project_id)
        .select(projects::id)
        .first::<Uuid>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("project"))?;
    let contractor: Contractor = contractors::table
        .find(contractor_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("contractor"))?;

    let already_assigned: bool = diesel::select(diesel::dsl::exists(
        project_assignments::table
            .filter(project_assignments::project_id.eq(project_id))
            .filter(project_assignments::contractor_id.eq(contractor_id)),
    ))
    .get_result(&mut conn)?;
    if already_assigned {
        return Err(AppError::bad_request(
            "contractor is already assigned to this project",
        ));
    }

    let new_assignment = NewProjectAssignment {
        id: Uuid::new_v4(),
        project_id,
        contractor_id,
        role: optional_text(payload.role),
        hourly_rate: Some(payload.hourly_rate.unwrap_or(contractor.hourly_rate)),
        weekly_cap: payload.weekly_cap,
        status: AssignmentStatus::Active.as_str().to_string(),
    };

    let assignment: ProjectAssignment = diesel::insert_into(project_assignments::table)
        .values(&new_assignment)
        .get_result(&mut conn)
        .map_err(unique_violation(
            "contractor is already assigned to this project",
        ))?;

    info!(
        assignment_id = %assignment.id,
        project_id = %project_id,
        contractor_id = %contractor_id,
        "contractor assigned to project"
    );
    Ok((
        StatusCode::CREATED,
        Json(AssignmentResponse::from(assignment).with_contractor(ContractorSummary::from(&contractor))),
    ))
}

pub async fn update_assignment(
    State(state): State<AppState>,
    Path((project_id, assignment_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<Value>,
) -> AppResult<Json<AssignmentResponse>> {
    let mut conn = state.db()?;
    let existing: ProjectAssignment = project_assignments::table
        .filter(project_assignments::id.eq(assignment_id))
        .filter(project_assignments::project_id.eq(project_id))
        .first(&mut conn)?;

    let role = classify_nullable::<String>(&body, "role")
        .map_err(AppError::bad_request)?
        .into_change()
        .map(optional_text);
    let hourly_rate = classify_nullable::<f64>(&body, "hourlyRate")
        .map_err(AppError::bad_request)?
        .into_change();
    if let Some(Some(rate)) = hourly_rate {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AppError::bad_request("hourlyRate must be greater than 0"));
        }
    }
    let weekly_cap = classify_nullable::<f64>(&body, "weeklyCap")
        .map_err(AppError::bad_request)?
        .into_change();

    let mut status = None;
    let mut ended_at = None;
    if let Some(raw) = required_if_present::<String>(&body, "status").map_err(AppError::bad_request)? {
        let current: AssignmentStatus = existing.status.parse()?;
        let next: AssignmentStatus = raw.parse()?;
        check_transition(current, next)?;
        if next != current {
            status = Some(next.as_str().to_string());
            ended_at = Some(Some(Utc::now().naive_utc()));
        }
    }

    let assignment: ProjectAssignment = if role.is_none()
        && hourly_rate.is_none()
        && weekly_cap.is_none()
        && status.is_none()
    {
        existing
    } else {
        diesel::update(project_assignments::table.find(assignment_id))
            .set(&AssignmentChangeset {
                role,
                hourly_rate,
                weekly_cap,
                status,
                ended_at,
            })
            .get_result(&mut conn)?
    };

    Ok(Json(assignment.into()))
}

fn ensure_code_free(conn: &mut PgConnection, code: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut query = projects::table
        .filter(projects::code.eq(code))
        .select(projects::id)
        .into_boxed();
    if let Some(id) = except {
        query = query.filter(projects::id.ne(id));
    }
    if query.first::<Uuid>(conn).optional()?.is_some() {
        return Err(AppError::bad_request("a project with this code already exists"));
    }
    Ok(())
}

fn validate_budget(budget: f64) -> AppResult<()> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(AppError::bad_request("budget must not be negative"));
    }
    Ok(())
}

fn validate_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> AppResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::bad_request("endDate must not be before startDate"));
        }
    }
    Ok(())
}
