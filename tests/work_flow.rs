mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, str_field, TestApp};
use serde_json::json;

async fn shortlisted_application(app: &TestApp, token: &str, email: &str) -> Result<String> {
    let (status, job) = app
        .post_json(
            "/api/jobs",
            &json!({
                "title": "Speech Evaluator",
                "shortDescription": "Rate synthetic speech",
                "fullDescription": "Listen to clips and rate naturalness",
                "responsibilities": "Rate clips",
                "requirements": "Good ears",
                "payMin": 18.0,
                "payMax": 26.0,
                "skillTags": ["audio", "linguistics"],
                "status": "PUBLISHED"
            }),
            Some(token),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{job}");

    let (status, application) = app
        .post_json(
            "/api/work/applications",
            &json!({
                "jobId": str_field(&job, "id"),
                "fullName": "Grace Hopper",
                "email": email,
                "phone": "+1 555 0100",
                "country": "United States",
                "whyInterested": "Audio research",
                "relevantExperience": "Phonetics"
            }),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{application}");
    let application_id = str_field(&application, "id").to_string();

    let (status, _) = app
        .patch_json(
            &format!("/api/applications/{application_id}"),
            &json!({ "status": "SHORTLISTED" }),
            Some(token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(application_id)
}

#[tokio::test]
async fn ai_interview_flow() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let application_id = shortlisted_application(&app, &token, "grace@example.com").await?;
    let worker = app.worker_token("grace@example.com")?;
    let stranger = app.worker_token("mallory@example.com")?;

    let (status, _) = app
        .post_json(
            "/api/work/interview/questions",
            &json!({ "applicationId": application_id }),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post_json(
            "/api/work/interview/questions",
            &json!({ "applicationId": application_id }),
            Some(&stranger),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&body, "error"), "application not found");

    let (status, questions) = app
        .post_json(
            "/api/work/interview/questions",
            &json!({ "applicationId": application_id }),
            Some(&worker),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{questions}");
    assert_eq!(str_field(&questions, "jobTitle"), "Speech Evaluator");
    assert_eq!(questions["totalTime"], json!(750));
    let list = questions["questions"].as_array().expect("questions");
    assert_eq!(list.len(), 5);

    let responses: Vec<_> = list
        .iter()
        .map(|question| {
            json!({
                "questionId": str_field(question, "id"),
                "question": str_field(question, "question"),
                "transcription": "I would start by listening closely",
                "duration": 90
            })
        })
        .collect();

    let (status, body) = app
        .post_json(
            "/api/work/interview/submit",
            &json!({ "applicationId": application_id, "responses": [] }),
            Some(&worker),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(str_field(&body, "error"), "responses are required");

    let submission = json!({ "applicationId": application_id, "responses": responses });
    let (status, _) = app
        .post_json("/api/work/interview/submit", &submission, Some(&stranger))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, result) = app
        .post_json("/api/work/interview/submit", &submission, Some(&worker))
        .await?;
    assert_eq!(status, StatusCode::OK, "{result}");
    let score = result["analysis"]["overallScore"].as_i64().expect("score");
    assert!((75..=99).contains(&score), "score {score}");
    let application = &result["application"];
    assert_eq!(str_field(application, "status"), "INTERVIEWING");
    assert_eq!(str_field(application, "interviewStatus"), "COMPLETED");
    assert_eq!(application["interviewScore"], json!(score));
    assert!(application["interviewCompletedAt"].is_string());

    let (_, notes) = app
        .get(&format!("/api/applications/{application_id}/notes"), Some(&token))
        .await?;
    let notes = notes.as_array().expect("notes");
    assert_eq!(notes.len(), 1);
    assert_eq!(str_field(&notes[0], "authorName"), "AI Interview");
    assert!(str_field(&notes[0], "noteText")
        .starts_with(&format!("AI Video Interview completed. Overall Score: {score}/100")));

    // Once the team moves it on, the interview is closed.
    let (status, _) = app
        .patch_json(
            &format!("/api/applications/{application_id}"),
            &json!({ "status": "OFFERED" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .post_json("/api/work/interview/submit", &submission, Some(&worker))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        str_field(&body, "error"),
        "this application is not at the interview stage"
    );

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn worker_dashboard_and_documents() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.team_token()?;
    let worker = app.worker_token("grace@example.com")?;
    let stranger = app.worker_token("mallory@example.com")?;

    let (status, body) = app.get("/api/work/dashboard", Some(&worker)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&body, "error"), "contractor not found");

    let contractor_id = app.create_contractor("grace@example.com", 50.0).await?;
    app.create_contractor("mallory@example.com", 10.0).await?;
    let project_id = app.create_project("WRK-1", None).await?;
    let (status, _) = app
        .post_json(
            &format!("/api/projects/{project_id}/assignments"),
            &json!({ "contractorId": contractor_id }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post_json(
            "/api/hours",
            &json!({
                "contractorId": contractor_id,
                "projectId": project_id,
                "date": "2025-07-01",
                "hours": 6.0
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post_json(
            "/api/payments",
            &json!({
                "contractorId": contractor_id,
                "periodStart": "2025-07-01",
                "periodEnd": "2025-07-15",
                "totalHours": 6.0
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, document) = app
        .post_json(
            &format!("/api/contractors/{contractor_id}/documents"),
            &json!({ "type": "TERMS_OF_WORK", "title": "Terms of Work" }),
            Some(&token),
        )
        .await?;
    let document_id = str_field(&document, "id").to_string();

    let (status, dashboard) = app.get("/api/work/dashboard", Some(&worker)).await?;
    assert_eq!(status, StatusCode::OK, "{dashboard}");
    assert_eq!(str_field(&dashboard["contractor"], "email"), "grace@example.com");
    assert_eq!(dashboard["assignments"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        str_field(&dashboard["assignments"][0]["project"], "code"),
        "WRK-1"
    );
    assert_eq!(dashboard["recentTimeEntries"].as_array().map(Vec::len), Some(1));
    assert_eq!(dashboard["recentPayments"].as_array().map(Vec::len), Some(1));
    assert_eq!(dashboard["pendingDocuments"].as_array().map(Vec::len), Some(1));
    assert_eq!(dashboard["totalHours"], json!(6.0));
    assert_eq!(dashboard["totalEarnings"], json!(0.0));
    assert_eq!(dashboard["pendingEarnings"], json!(300.0));

    let (status, payments) = app.get("/api/work/payments", Some(&worker)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments["totalPending"], json!(300.0));
    assert_eq!(payments["totalPaid"], json!(0.0));

    let viewed_path = format!("/api/work/documents/{document_id}/viewed");
    let sign_path = format!("/api/work/documents/{document_id}/sign");

    // Still PENDING: the team has not sent it yet.
    let (status, _) = app.post_json(&sign_path, &json!({}), Some(&worker)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch_json(
            &format!("/api/documents/{document_id}"),
            &json!({ "status": "SENT" }),
            Some(&token),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post_json(&viewed_path, &json!({}), Some(&stranger)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(str_field(&body, "error"), "document not found");

    let (status, viewed) = app.post_json(&viewed_path, &json!({}), Some(&worker)).await?;
    assert_eq!(status, StatusCode::OK, "{viewed}");
    assert_eq!(str_field(&viewed, "status"), "VIEWED");

    let (status, _) = app.post_json(&sign_path, &json!({}), Some(&stranger)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, signed) = app.post_json(&sign_path, &json!({}), Some(&worker)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_field(&signed, "status"), "SIGNED");
    assert!(signed["signedAt"].is_string());

    let (status, documents) = app.get("/api/work/documents", Some(&worker)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(documents["signedCount"], json!(1));
    assert_eq!(documents["outstandingCount"], json!(0));

    let (_, mallory_docs) = app.get("/api/work/documents", Some(&stranger)).await?;
    assert_eq!(mallory_docs["documents"], json!([]));

    app.cleanup().await?;
    Ok(())
}
