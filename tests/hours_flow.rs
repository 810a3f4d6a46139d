mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, str_field, TestApp};
use serde_json::{json, Value};

fn entry_payload(contractor_id: &str, project_id: &str, date: &str, hours: f64) -> Value {
    json!({
        "contractorId": contractor_id,
        "projectId": project_id,
        "date": date,
        "hours": hours,
        "description": "Labelled batch"
    })
}

#[tokio::test]
async fn manual_entries_and_pending_review() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let contractor_id = app.create_contractor("grace@example.com", 40.0).await?;
    let project_id = app.create_project("ANN-1", None).await?;

    let (status, body) = app
        .post_json(
            "/api/hours",
            &entry_payload(&contractor_id, &project_id, "2025-03-03", 25.0),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        str_field(&body, "error"),
        "hours must be greater than 0 and at most 24"
    );

    let mut too_productive = entry_payload(&contractor_id, &project_id, "2025-03-03", 4.0);
    too_productive["productiveHours"] = json!(5.0);
    let (status, body) = app.post_json("/api/hours", &too_productive, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "productiveHours cannot exceed hours");

    let missing = uuid::Uuid::new_v4().to_string();
    let (status, body) = app
        .post_json(
            "/api/hours",
            &entry_payload(&missing, &project_id, "2025-03-03", 4.0),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&body, "error"), "contractor not found");

    let mut ids = Vec::new();
    for (date, hours) in [("2025-03-03", 6.0), ("2025-03-04", 3.5)] {
        let (status, entry) = app
            .post_json(
                "/api/hours",
                &entry_payload(&contractor_id, &project_id, date, hours),
                Some(&token),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{entry}");
        assert_eq!(str_field(&entry, "status"), "PENDING");
        assert_eq!(str_field(&entry, "source"), "MANUAL");
        assert_eq!(entry["productiveHours"], json!(hours));
        assert_eq!(str_field(&entry, "notes"), "Labelled batch");
        assert_eq!(str_field(&entry["project"], "code"), "ANN-1");
        ids.push(str_field(&entry, "id").to_string());
    }

    let (status, pending) = app.get("/api/hours/pending", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    let groups = pending["groups"].as_array().expect("groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["totalHours"], json!(9.5));
    assert_eq!(groups[0]["totalAmount"], json!(380.0));
    assert_eq!(groups[0]["entries"].as_array().map(Vec::len), Some(2));
    assert_eq!(pending["counts"]["pending"], json!(2));

    let (status, edited) = app
        .patch_json(
            &format!("/api/hours/{}", ids[1]),
            &json!({ "hours": 2.0, "notes": null }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{edited}");
    assert_eq!(edited["totalHours"], json!(2.0));
    assert_eq!(edited["productiveHours"], json!(2.0));
    assert!(edited["notes"].is_null());

    let (status, approved) = app
        .patch_json(
            &format!("/api/hours/{}", ids[0]),
            &json!({ "status": "APPROVED" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_field(&approved, "status"), "APPROVED");
    assert!(approved["approvedAt"].is_string());

    let (status, body) = app
        .patch_json(
            &format!("/api/hours/{}", ids[0]),
            &json!({ "hours": 1.0 }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "only pending time entries can be edited");

    let (status, _) = app
        .patch_json(
            &format!("/api/hours/{}", ids[0]),
            &json!({ "status": "REJECTED" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = app
        .get(
            &format!("/api/hours?status=APPROVED&contractor={contractor_id}"),
            Some(&token),
        )
        .await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (_, ranged) = app
        .get(
            "/api/hours?startDate=2025-03-04&endDate=2025-03-31",
            Some(&token),
        )
        .await?;
    assert_eq!(ranged.as_array().map(Vec::len), Some(1));

    let (status, _) = app.delete(&format!("/api/hours/{}", ids[1]), Some(&token)).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete(&format!("/api/hours/{}", ids[1]), Some(&token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn bulk_review_is_idempotent() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let contractor_id = app.create_contractor("grace@example.com", 30.0).await?;
    let project_id = app.create_project("ANN-2", None).await?;

    let mut ids = Vec::new();
    for date in ["2025-04-01", "2025-04-02", "2025-04-03"] {
        let (_, entry) = app
            .post_json(
                "/api/hours",
                &entry_payload(&contractor_id, &project_id, date, 4.0),
                Some(&token),
            )
            .await?;
        ids.push(str_field(&entry, "id").to_string());
    }

    let (status, body) = app
        .post_json(
            "/api/hours/bulk",
            &json!({ "ids": ids, "action": "archive" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "action must be either approve or reject");

    let (status, body) = app
        .post_json(
            "/api/hours/bulk",
            &json!({ "ids": [], "action": "approve" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "ids must not be empty");

    let first_two = json!({ "ids": [ids[0], ids[1]], "action": "approve" });
    let (status, result) = app.post_json("/api/hours/bulk", &first_two, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["updated"], json!(2));
    assert_eq!(result["requested"], json!(2));

    let (_, repeat) = app.post_json("/api/hours/bulk", &first_two, Some(&token)).await?;
    assert_eq!(repeat["updated"], json!(0));

    let (_, rejected) = app
        .post_json(
            "/api/hours/bulk",
            &json!({ "ids": ids, "action": "reject" }),
            Some(&token),
        )
        .await?;
    assert_eq!(rejected["updated"], json!(1));
    assert_eq!(rejected["requested"], json!(3));

    let (_, pending) = app.get("/api/hours/pending", Some(&token)).await?;
    assert_eq!(pending["groups"], json!([]));
    assert_eq!(pending["counts"]["approved"], json!(2));
    assert_eq!(pending["counts"]["rejected"], json!(1));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn import_requires_link_and_skips_known_days() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let contractor_id = app.create_contractor("grace@example.com", 30.0).await?;
    let project_id = app.create_project("ANN-3", None).await?;

    let import = json!({
        "contractorId": contractor_id,
        "projectId": project_id,
        "startDate": "2025-05-05",
        "endDate": "2025-05-05"
    });

    let (status, body) = app.post_json("/api/hours/import", &import, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        str_field(&body, "error"),
        "contractor is not linked to a time tracking account"
    );

    let (status, _) = app
        .patch_json(
            &format!("/api/contractors/{contractor_id}"),
            &json!({ "timeTrackingId": "emp-42" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, first) = app.post_json("/api/hours/import", &import, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first, json!({ "imported": 1, "skipped": 0 }));

    let (_, second) = app.post_json("/api/hours/import", &import, Some(&token)).await?;
    assert_eq!(second, json!({ "imported": 0, "skipped": 1 }));

    let (_, entries) = app
        .get(&format!("/api/hours?contractor={contractor_id}"), Some(&token))
        .await?;
    let entries = entries.as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(str_field(&entries[0], "source"), "IMPORTED");
    assert_eq!(str_field(&entries[0], "date"), "2025-05-05");
    assert_eq!(entries[0]["totalHours"], json!(8.0));
    assert_eq!(entries[0]["productiveHours"], json!(7.0));

    let mut reversed = import.clone();
    reversed["endDate"] = json!("2025-05-01");
    let (status, _) = app.post_json("/api/hours/import", &reversed, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}
