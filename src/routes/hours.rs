use std::collections::HashMap;

use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    aggregates::group_pending,
    error::{AppError, AppResult},
    models::{Contractor, NewTimeEntry, Project, TimeEntry},
    schema::{contractors, projects, time_entries},
    state::AppState,
    utils::{
        extract::{Json, Path, Query},
        json::{classify_nullable, required_if_present},
    },
    workflow::{check_transition, parse_filter, TimeEntrySource, TimeEntryStatus},
};

use super::{
    contractors::ContractorSummary, optional_text, projects::ProjectSummary, to_iso, BulkAction,
    BulkRequest, BulkResponse,
};

const MAX_HOURS_PER_DAY: f64 = 24.0;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryListQuery {
    pub status: Option<String>,
    pub contractor: Option<Uuid>,
    pub project: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeEntryRequest {
    pub contractor_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub hours: Option<f64>,
    pub productive_hours: Option<f64>,
    #[serde(alias = "notes")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub contractor_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryResponse {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub total_hours: f64,
    pub productive_hours: f64,
    pub notes: Option<String>,
    pub status: String,
    pub source: String,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<ContractorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSummary>,
}

impl TimeEntryResponse {
    pub fn with_contractor(mut self, contractor: ContractorSummary) -> Self {
        self.contractor = Some(contractor);
        self
    }

    pub fn with_project(mut self, project: ProjectSummary) -> Self {
        self.project = Some(project);
        self
    }
}

impl From<TimeEntry> for TimeEntryResponse {
    fn from(entry: TimeEntry) -> Self {
        Self {
            id: entry.id,
            contractor_id: entry.contractor_id,
            project_id: entry.project_id,
            date: entry.work_date,
            total_hours: entry.total_hours,
            productive_hours: entry.productive_hours,
            notes: entry.notes,
            status: entry.status,
            source: entry.source,
            approved_at: entry.approved_at.map(to_iso),
            created_at: to_iso(entry.created_at),
            updated_at: to_iso(entry.updated_at),
            contractor: None,
            project: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingGroupResponse {
    pub contractor: ContractorSummary,
    pub entries: Vec<TimeEntryResponse>,
    pub total_hours: f64,
    pub total_amount: f64,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingResponse {
    pub groups: Vec<PendingGroupResponse>,
    pub counts: StatusCounts,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(AsChangeset)]
#[diesel(table_name = time_entries)]
struct TimeEntryChangeset {
    total_hours: Option<f64>,
    productive_hours: Option<f64>,
    notes: Option<Option<String>>,
    status: Option<String>,
    approved_at: Option<Option<NaiveDateTime>>,
    updated_at: NaiveDateTime,
}

pub async fn list_time_entries(
    State(state): State<AppState>,
    Query(query): Query<TimeEntryListQuery>,
) -> AppResult<Json<Vec<TimeEntryResponse>>> {
    let status = parse_filter::<TimeEntryStatus>(query.status.as_deref())?;
    let mut conn = state.db()?;

    let mut rows_query = time_entries::table
        .inner_join(contractors::table)
        .inner_join(projects::table)
        .into_boxed();
    if let Some(status) = status {
        rows_query = rows_query.filter(time_entries::status.eq(status.as_str()));
    }
    if let Some(contractor_id) = query.contractor {
        rows_query = rows_query.filter(time_entries::contractor_id.eq(contractor_id));
    }
    if let Some(project_id) = query.project {
        rows_query = rows_query.filter(time_entries::project_id.eq(project_id));
    }
    if let Some(start) = query.start_date {
        rows_query = rows_query.filter(time_entries::work_date.ge(start));
    }
    if let Some(end) = query.end_date {
        rows_query = rows_query.filter(time_entries::work_date.le(end));
    }

    let rows: Vec<(TimeEntry, Contractor, Project)> = rows_query
        .order((time_entries::work_date.desc(), time_entries::created_at.desc()))
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(entry_with_relations).collect()))
}

pub async fn create_time_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateTimeEntryRequest>,
) -> AppResult<(StatusCode, Json<TimeEntryResponse>)> {
    let contractor_id = payload
        .contractor_id
        .ok_or_else(|| AppError::bad_request("contractorId is required"))?;
    let project_id = payload
        .project_id
        .ok_or_else(|| AppError::bad_request("projectId is required"))?;
    let work_date = payload
        .date
        .ok_or_else(|| AppError::bad_request("date is required"))?;
    let hours = payload
        .hours
        .ok_or_else(|| AppError::bad_request("hours is required"))?;
    let productive_hours = payload.productive_hours.unwrap_or(hours);
    validate_hours(hours, productive_hours)?;

    let mut conn = state.db()?;
    let contractor: Contractor = contractors::table
        .find(contractor_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("contractor"))?;
    let project: Project = projects::table
        .find(project_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::not_found_named("project"))?;

    let new_entry = NewTimeEntry {
        id: Uuid::new_v4(),
        contractor_id,
        project_id,
        work_date,
        total_hours: hours,
        productive_hours,
        notes: optional_text(payload.description),
        status: TimeEntryStatus::Pending.as_str().to_string(),
        source: TimeEntrySource::Manual.as_str().to_string(),
    };

    let entry: TimeEntry = diesel::insert_into(time_entries::table)
        .values(&new_entry)
        .get_result(&mut conn)?;

    info!(
        time_entry_id = %entry.id,
        contractor_id = %contractor_id,
        project_id = %project_id,
        hours,
        "time entry logged"
    );
    Ok((
        StatusCode::CREATED,
        Json(entry_with_relations((entry, contractor, project))),
    ))
}

pub async fn pending_time_entries(
    State(state): State<AppState>,
) -> AppResult<Json<PendingResponse>> {
    let mut conn = state.db()?;

    let rows: Vec<(TimeEntry, Contractor, Project)> = time_entries::table
        .inner_join(contractors::table)
        .inner_join(projects::table)
        .filter(time_entries::status.eq(TimeEntryStatus::Pending.as_str()))
        .order((
            contractors::last_name.asc(),
            contractors::first_name.asc(),
            time_entries::work_date.desc(),
        ))
        .load(&mut conn)?;

    let status_counts: HashMap<String, i64> = time_entries::table
        .group_by(time_entries::status)
        .select((time_entries::status, count_star()))
        .load::<(String, i64)>(&mut conn)?
        .into_iter()
        .collect();
    let count = |status: TimeEntryStatus| status_counts.get(status.as_str()).copied().unwrap_or(0);

    let groups = group_pending(rows)
        .into_iter()
        .map(|group| PendingGroupResponse {
            contractor: ContractorSummary::from(&group.contractor),
            entries: group
                .entries
                .into_iter()
                .map(|(entry, project)| {
                    TimeEntryResponse::from(entry).with_project(ProjectSummary::from(&project))
                })
                .collect(),
            total_hours: group.total_hours,
            total_amount: group.total_amount,
        })
        .collect();

    Ok(Json(PendingResponse {
        groups,
        counts: StatusCounts {
            pending: count(TimeEntryStatus::Pending),
            approved: count(TimeEntryStatus::Approved),
            rejected: count(TimeEntryStatus::Rejected),
        },
    }))
}

pub async fn import_time_entries(
    State(state): State<AppState>,
    Json(payload): Json<ImportRequest>,
) -> AppResult<Json<ImportResponse>> {
    let contractor_id = payload
        .contractor_id
        .ok_or_else(|| AppError::bad_request("contractorId is required"))?;
    let project_id = payload
        .project_id
        .ok_or_else(|| AppError::bad_request("projectId is required"))?;
    let start = payload
        .start_date
        .ok_or_else(|| AppError::bad_request("startDate is required"))?;
    let end = payload
        .end_date
        .ok_or_else(|| AppError::bad_request("endDate is required"))?;
    if end < start {
        return Err(AppError::bad_request("endDate must not be before startDate"));
    }

    let employee_id = {
        let mut conn = state.db()?;
        let contractor: Contractor = contractors::table
            .find(contractor_id)
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_named("contractor"))?;
        projects::table
            .find(project_id)
            .select(projects::id)
            .first::<Uuid>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::not_found_named("project"))?;
        optional_text(contractor.time_tracking_id).ok_or_else(|| {
            AppError::bad_request("contractor is not linked to a time tracking account")
        })?
    };

    let days = state
        .integrations
        .time_tracking
        .time_entries(&employee_id, start, end)
        .await?;

    let mut conn = state.db()?;
    let (imported, skipped) = conn.transaction::<_, AppError, _>(|conn| {
        let existing: Vec<NaiveDate> = time_entries::table
            .filter(time_entries::contractor_id.eq(contractor_id))
            .filter(time_entries::project_id.eq(project_id))
            .filter(time_entries::source.eq(TimeEntrySource::Imported.as_str()))
            .filter(time_entries::work_date.between(start, end))
            .select(time_entries::work_date)
            .load(conn)?;

        let mut imported: usize = 0;
        let mut skipped: usize = 0;
        let mut seen = existing;
        for day in days {
            let hours = day.total_hours().min(MAX_HOURS_PER_DAY);
            if day.date < start || day.date > end || hours <= 0.0 || seen.contains(&day.date) {
                skipped += 1;
                continue;
            }

            let new_entry = NewTimeEntry {
                id: Uuid::new_v4(),
                contractor_id,
                project_id,
                work_date: day.date,
                total_hours: hours,
                productive_hours: day.productive_hours().min(hours),
                notes: None,
                status: TimeEntryStatus::Pending.as_str().to_string(),
                source: TimeEntrySource::Imported.as_str().to_string(),
            };
            diesel::insert_into(time_entries::table)
                .values(&new_entry)
                .execute(conn)?;
            seen.push(day.date);
            imported += 1;
        }
        Ok((imported, skipped))
    })?;

    info!(
        contractor_id = %contractor_id,
        project_id = %project_id,
        imported,
        skipped,
        "time entries imported"
    );
    Ok(Json(ImportResponse { imported, skipped }))
}

pub async fn update_time_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<TimeEntryResponse>> {
    let mut conn = state.db()?;
    let existing: TimeEntry = time_entries::table.find(entry_id).first(&mut conn)?;
    let current: TimeEntryStatus = existing.status.parse()?;

    let hours = required_if_present::<f64>(&body, "hours").map_err(AppError::bad_request)?;
    let productive_hours =
        required_if_present::<f64>(&body, "productiveHours").map_err(AppError::bad_request)?;
    let notes = match classify_nullable::<String>(&body, "notes")
        .map_err(AppError::bad_request)?
        .into_change()
    {
        Some(change) => Some(change),
        None => classify_nullable::<String>(&body, "description")
            .map_err(AppError::bad_request)?
            .into_change(),
    }
    .map(optional_text);

    let edits_fields = hours.is_some() || productive_hours.is_some() || notes.is_some();
    if edits_fields && current != TimeEntryStatus::Pending {
        return Err(AppError::bad_request("only pending time entries can be edited"));
    }
    if hours.is_some() || productive_hours.is_some() {
        let total = hours.unwrap_or(existing.total_hours);
        // Shrinking hours without a new productive figure keeps productive within bounds.
        let productive = productive_hours.unwrap_or(existing.productive_hours.min(total));
        validate_hours(total, productive)?;
    }

    let now = Utc::now().naive_utc();
    let mut changeset = TimeEntryChangeset {
        total_hours: hours,
        productive_hours: match (hours, productive_hours) {
            (_, Some(productive)) => Some(productive),
            (Some(total), None) if existing.productive_hours > total => Some(total),
            _ => None,
        },
        notes,
        status: None,
        approved_at: None,
        updated_at: now,
    };

    if let Some(raw) = required_if_present::<String>(&body, "status").map_err(AppError::bad_request)? {
        let next: TimeEntryStatus = raw.parse()?;
        check_transition(current, next)?;
        if next != current {
            changeset.status = Some(next.as_str().to_string());
            changeset.approved_at = Some((next == TimeEntryStatus::Approved).then_some(now));
            info!(time_entry_id = %entry_id, from = %current, to = %next, "time entry status changed");
        }
    }

    let entry: TimeEntry = diesel::update(time_entries::table.find(entry_id))
        .set(&changeset)
        .get_result(&mut conn)?;

    Ok(Json(entry.into()))
}

pub async fn delete_time_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(time_entries::table.find(entry_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(time_entry_id = %entry_id, "time entry deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Only rows still PENDING are touched, so repeating a bulk action is a no-op.
pub async fn bulk_update_time_entries(
    State(state): State<AppState>,
    Json(payload): Json<BulkRequest>,
) -> AppResult<Json<BulkResponse>> {
    let (action, ids) = payload.validate()?;
    let requested = ids.len();

    let mut conn = state.db()?;
    let now = Utc::now().naive_utc();
    let pending = time_entries::table
        .filter(time_entries::id.eq_any(&ids))
        .filter(time_entries::status.eq(TimeEntryStatus::Pending.as_str()));

    let updated = match action {
        BulkAction::Approve => diesel::update(pending)
            .set((
                time_entries::status.eq(TimeEntryStatus::Approved.as_str()),
                time_entries::approved_at.eq(Some(now)),
                time_entries::updated_at.eq(now),
            ))
            .execute(&mut conn)?,
        BulkAction::Reject => diesel::update(pending)
            .set((
                time_entries::status.eq(TimeEntryStatus::Rejected.as_str()),
                time_entries::approved_at.eq(None::<NaiveDateTime>),
                time_entries::updated_at.eq(now),
            ))
            .execute(&mut conn)?,
    };

    info!(action = action.as_str(), requested, updated, "bulk time entry update");
    Ok(Json(BulkResponse {
        updated,
        requested,
        action: action.as_str(),
    }))
}

fn entry_with_relations((entry, contractor, project): (TimeEntry, Contractor, Project)) -> TimeEntryResponse {
    TimeEntryResponse::from(entry)
        .with_contractor(ContractorSummary::from(&contractor))
        .with_project(ProjectSummary::from(&project))
}

fn validate_hours(hours: f64, productive_hours: f64) -> AppResult<()> {
    if !hours.is_finite() || hours <= 0.0 || hours > MAX_HOURS_PER_DAY {
        return Err(AppError::bad_request(
            "hours must be greater than 0 and at most 24",
        ));
    }
    if !productive_hours.is_finite() || productive_hours < 0.0 {
        return Err(AppError::bad_request("productiveHours must not be negative"));
    }
    if productive_hours > hours {
        return Err(AppError::bad_request(
            "productiveHours cannot exceed hours",
        ));
    }
    Ok(())
}
