use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Document,
    schema::documents,
    state::AppState,
    utils::{
        extract::{Json, Path},
        json::{classify_nullable, required_if_present},
    },
    workflow::{check_transition, DocumentStatus},
};

use super::{optional_text, require_text, to_iso};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub contractor_id: Uuid,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub status: String,
    pub file_url: Option<String>,
    pub sent_at: Option<String>,
    pub signed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            contractor_id: document.contractor_id,
            doc_type: document.doc_type,
            title: document.title,
            status: document.status,
            file_url: document.file_url,
            sent_at: document.sent_at.map(to_iso),
            signed_at: document.signed_at.map(to_iso),
            created_at: to_iso(document.created_at),
            updated_at: to_iso(document.updated_at),
        }
    }
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = documents)]
struct DocumentChangeset {
    title: Option<String>,
    status: Option<String>,
    file_url: Option<Option<String>>,
    sent_at: Option<Option<NaiveDateTime>>,
    signed_at: Option<Option<NaiveDateTime>>,
    updated_at: Option<NaiveDateTime>,
}

impl DocumentChangeset {
    /// Records the status move and the timestamp it implies.
    fn with_status(mut self, next: DocumentStatus, now: NaiveDateTime) -> Self {
        self.status = Some(next.as_str().to_string());
        match next {
            DocumentStatus::Sent => self.sent_at = Some(Some(now)),
            DocumentStatus::Signed => self.signed_at = Some(Some(now)),
            _ => {}
        }
        self
    }
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<DocumentResponse>> {
    let mut conn = state.db()?;
    let existing: Document = documents::table.find(document_id).first(&mut conn)?;
    let now = Utc::now().naive_utc();

    let mut changeset = DocumentChangeset {
        updated_at: Some(now),
        ..Default::default()
    };

    if let Some(title) = required_if_present::<String>(&body, "title").map_err(AppError::bad_request)? {
        changeset.title = Some(require_text(Some(title), "title")?);
    }
    changeset.file_url = classify_nullable::<String>(&body, "fileUrl")
        .map_err(AppError::bad_request)?
        .into_change()
        .map(optional_text);

    if let Some(raw) = required_if_present::<String>(&body, "status").map_err(AppError::bad_request)? {
        let current: DocumentStatus = existing.status.parse()?;
        let next: DocumentStatus = raw.parse()?;
        check_transition(current, next)?;
        if next != current {
            changeset = changeset.with_status(next, now);
            info!(document_id = %document_id, from = %current, to = %next, "document status changed");
        }
    }

    let document: Document = diesel::update(documents::table.find(document_id))
        .set(&changeset)
        .get_result(&mut conn)?;

    Ok(Json(document.into()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let deleted = diesel::delete(documents::table.find(document_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(document_id = %document_id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Moves a document to `next`, applying timestamp side effects. Moving to the
/// current status returns the document unchanged.
pub(crate) fn transition_document(
    conn: &mut PgConnection,
    document: Document,
    next: DocumentStatus,
) -> AppResult<Document> {
    let current: DocumentStatus = document.status.parse()?;
    check_transition(current, next)?;
    if current == next {
        return Ok(document);
    }

    let now = Utc::now().naive_utc();
    let changeset = DocumentChangeset {
        updated_at: Some(now),
        ..Default::default()
    }
    .with_status(next, now);

    let updated: Document = diesel::update(documents::table.find(document.id))
        .set(&changeset)
        .get_result(conn)?;

    info!(document_id = %document.id, from = %current, to = %next, "document status changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn sending_stamps_sent_at() {
        let changeset = DocumentChangeset::default().with_status(DocumentStatus::Sent, now());
        assert_eq!(changeset.status.as_deref(), Some("SENT"));
        assert_eq!(changeset.sent_at, Some(Some(now())));
        assert!(changeset.signed_at.is_none());
    }

    #[test]
    fn signing_stamps_signed_at() {
        let changeset = DocumentChangeset::default().with_status(DocumentStatus::Signed, now());
        assert_eq!(changeset.signed_at, Some(Some(now())));
        assert!(changeset.sent_at.is_none());
    }

    #[test]
    fn viewing_touches_no_timestamp() {
        let changeset = DocumentChangeset::default().with_status(DocumentStatus::Viewed, now());
        assert_eq!(changeset.status.as_deref(), Some("VIEWED"));
        assert!(changeset.sent_at.is_none());
        assert!(changeset.signed_at.is_none());
    }
}
