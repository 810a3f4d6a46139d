use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::TeamMember,
    error::{AppError, AppResult},
    state::AppState,
};

pub mod applications;
pub mod contractors;
pub mod documents;
pub mod health;
pub mod hours;
pub mod jobs;
pub mod payments;
pub mod projects;
pub mod work;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = build_cors(state.config.cors_allowed_origin.as_deref());

    let job_routes = Router::new()
        .route("/", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/:id",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route("/:id/duplicate", post(jobs::duplicate_job));

    let application_routes = Router::new()
        .route("/", get(applications::list_applications))
        .route(
            "/:id",
            get(applications::get_application).patch(applications::update_application),
        )
        .route(
            "/:id/notes",
            get(applications::list_application_notes).post(applications::create_application_note),
        )
        .route("/:id/screen", post(applications::screen_application));

    let contractor_routes = Router::new()
        .route(
            "/",
            get(contractors::list_contractors).post(contractors::create_contractor),
        )
        .route(
            "/:id",
            get(contractors::get_contractor)
                .patch(contractors::update_contractor)
                .delete(contractors::delete_contractor),
        )
        .route(
            "/:id/notes",
            get(contractors::list_contractor_notes).post(contractors::create_contractor_note),
        )
        .route("/:id/documents", post(contractors::create_contractor_document))
        .route(
            "/:id/background-check",
            post(contractors::request_background_check),
        )
        .route(
            "/:id/background-check/refresh",
            post(contractors::refresh_background_check),
        )
        .route(
            "/:id/payroll-contract",
            post(contractors::create_payroll_contract),
        );

    let document_routes = Router::new().route(
        "/:id",
        patch(documents::update_document).delete(documents::delete_document),
    );

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/:id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/:id/assignments",
            get(projects::list_assignments).post(projects::create_assignment),
        )
        .route(
            "/:id/assignments/:assignment_id",
            patch(projects::update_assignment),
        );

    let hour_routes = Router::new()
        .route("/", get(hours::list_time_entries).post(hours::create_time_entry))
        .route("/pending", get(hours::pending_time_entries))
        .route("/import", post(hours::import_time_entries))
        .route("/bulk", post(hours::bulk_update_time_entries))
        .route(
            "/:id",
            patch(hours::update_time_entry).delete(hours::delete_time_entry),
        );

    let payment_routes = Router::new()
        .route("/", get(payments::list_payments).post(payments::create_payment))
        .route("/bulk", post(payments::bulk_update_payments))
        .route("/send-to-deel", post(payments::send_to_payroll))
        .route("/:id", patch(payments::update_payment))
        .route("/:id/sync", post(payments::sync_payment));

    let team_routes = Router::new()
        .nest("/api/jobs", job_routes)
        .nest("/api/applications", application_routes)
        .nest("/api/contractors", contractor_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/projects", project_routes)
        .nest("/api/hours", hour_routes)
        .nest("/api/payments", payment_routes)
        .layer(middleware::from_extractor_with_state::<TeamMember, _>(
            state.clone(),
        ));

    // Worker handlers take `AuthenticatedUser` directly; listings and submission stay public.
    let work_routes = Router::new()
        .route("/jobs", get(work::list_public_jobs))
        .route("/jobs/:slug", get(work::get_public_job))
        .route(
            "/applications",
            get(work::my_applications).post(applications::submit_application),
        )
        .route("/interview/questions", post(work::interview_questions))
        .route("/interview/submit", post(work::submit_interview))
        .route("/dashboard", get(work::dashboard))
        .route("/payments", get(work::my_payments))
        .route("/documents", get(work::my_documents))
        .route("/documents/:id/viewed", post(work::mark_document_viewed))
        .route("/documents/:id/sign", post(work::sign_document));

    Router::new()
        .merge(team_routes)
        .nest("/api/work", work_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

fn build_cors(allowed: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        warn!(origin = %value, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub(crate) fn to_iso(value: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc).to_rfc3339()
}

/// Trims a required text field, rejecting missing or blank values.
pub(crate) fn require_text(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{field} is required")))
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// `%term%` for `ILIKE`, with the term's own wildcards and escape character
/// matched literally.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn trimmed_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    pub note_text: Option<String>,
    pub author_name: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    pub note_text: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Approve,
    Reject,
}

impl BulkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BulkAction::Approve => "approve",
            BulkAction::Reject => "reject",
        }
    }
}

impl BulkRequest {
    /// Validates the action and id list shared by the bulk endpoints.
    pub fn validate(self) -> AppResult<(BulkAction, Vec<Uuid>)> {
        let action = match self.action.as_deref().map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("approve") => BulkAction::Approve,
            Some(raw) if raw.eq_ignore_ascii_case("reject") => BulkAction::Reject,
            _ => {
                return Err(AppError::bad_request(
                    "action must be either approve or reject",
                ))
            }
        };
        if self.ids.is_empty() {
            return Err(AppError::bad_request("ids must not be empty"));
        }
        let mut ids = self.ids;
        ids.sort_unstable();
        ids.dedup();
        Ok((action, ids))
    }
}

#[derive(Serialize)]
pub struct BulkResponse {
    pub updated: usize,
    pub requested: usize,
    pub action: &'static str,
}
