//! KYC and release review over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use mintgate_core::Email;
use mintgate_integration_tests::{ADMIN_CODE, CREATOR_CODE, TestApp};

const DOCUMENT: &[u8] = b"%PDF-1.7 passport scan";
const FACE: &[u8] = b"\x89PNG face";

async fn submit_kyc(app: &TestApp, token: &str, email: &str) -> i64 {
    let response = app
        .multipart(
            "/api/kyc",
            Some(token),
            &[
                ("legal_name", "Alice Liddell"),
                ("address", "1 Rabbit Hole"),
                ("country", "GB"),
                ("email", email),
                ("phone", "+44 20 7946 0000"),
                ("date_of_birth", "1990-05-04"),
            ],
            &[
                ("document", "passport.pdf", DOCUMENT),
                ("face_image", "face.png", FACE),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["id"].as_i64().unwrap()
}

async fn submit_release(app: &TestApp, token: &str, title: &str) -> (StatusCode, Value) {
    let response = app
        .multipart(
            "/api/releases",
            Some(token),
            &[
                ("title", title),
                ("release_date", "2026-12-01"),
                ("estimated_count", "250"),
                ("notes", "first drop"),
            ],
            &[("media", "cover.png", b"\x89PNG cover")],
        )
        .await;
    (response.status, response.body)
}

async fn admin(app: &TestApp) -> String {
    app.privileged_session("root", "root@mintgate.test", "admin", ADMIN_CODE)
        .await
}

#[tokio::test]
async fn test_kyc_approve_marks_account_verified() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;
    let admin = admin(&app).await;

    let id = submit_kyc(&app, &alice, "alice@example.com").await;

    let pending = app.get("/api/kyc/pending", Some(&admin)).await;
    assert_eq!(pending.status, StatusCode::OK);
    let rows = pending.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["username"], "alice");
    assert!(rows[0]["document_ref"].as_str().unwrap().contains("kyc-verification-requests"));

    let response = app
        .post(&format!("/api/kyc/{id}/approve"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "approved");

    let profile = app.get("/api/account/profile", Some(&alice)).await;
    assert_eq!(profile.body["kyc_verified"], true);

    let pending = app.get("/api/kyc/pending", Some(&admin)).await;
    assert!(pending.body.as_array().unwrap().is_empty());

    // Already handled.
    let response = app
        .post(&format!("/api/kyc/{id}/approve"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_kyc_decline_notifies_submission_contact() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;
    let admin = admin(&app).await;

    let id = submit_kyc(&app, &alice, "alice.kyc@example.com").await;
    let response = app
        .post(&format!("/api/kyc/{id}/decline"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "declined");

    let notices = app
        .notifier
        .sent_to(&Email::parse("alice.kyc@example.com").unwrap());
    assert_eq!(notices.len(), 1);
    assert!(notices[0].subject.contains("declined"));

    let profile = app.get("/api/account/profile", Some(&alice)).await;
    assert_eq!(profile.body["kyc_verified"], false);
    let pending = app.get("/api/kyc/pending", Some(&admin)).await;
    assert!(pending.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_kyc_decline_with_explicit_contact() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;
    let admin = admin(&app).await;

    let id = submit_kyc(&app, &alice, "alice.kyc@example.com").await;
    let response = app
        .post(
            &format!("/api/kyc/{id}/decline"),
            Some(&admin),
            &json!({ "notify_contact": "compliance@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.sent_count("compliance@example.com"), 1);
    assert_eq!(app.sent_count("alice.kyc@example.com"), 0);
}

#[tokio::test]
async fn test_failed_decline_notice_keeps_submission() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;
    let admin = admin(&app).await;
    let id = submit_kyc(&app, &alice, "alice@example.com").await;

    app.notifier.set_failing(true);
    let response = app
        .post(&format!("/api/kyc/{id}/decline"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    app.notifier.set_failing(false);
    let pending = app.get("/api/kyc/pending", Some(&admin)).await;
    assert_eq!(pending.body.as_array().unwrap().len(), 1);

    let response = app
        .post(&format!("/api/kyc/{id}/decline"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_review_endpoints_are_admin_only() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;
    let id = submit_kyc(&app, &alice, "alice@example.com").await;

    assert_eq!(
        app.get("/api/kyc/pending", Some(&alice)).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get("/api/releases/pending", Some(&alice)).await.status,
        StatusCode::FORBIDDEN
    );
    let response = app
        .post(&format!("/api/kyc/{id}/approve"), Some(&alice), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.get("/api/kyc/pending", None).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_kyc_submit_requires_documents() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;

    let response = app
        .multipart(
            "/api/kyc",
            Some(&alice),
            &[
                ("legal_name", "Alice Liddell"),
                ("address", "1 Rabbit Hole"),
                ("country", "GB"),
                ("email", "alice@example.com"),
                ("phone", "+44 20 7946 0000"),
                ("date_of_birth", "1990-05-04"),
            ],
            &[("document", "passport.pdf", DOCUMENT)],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plain_user_cannot_submit_release() {
    let app = TestApp::new();
    let alice = app.session_for("alice", "alice@example.com").await;

    let (status, _) = submit_release(&app, &alice, "Genesis").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_release_approval_enqueues_one_mint() {
    let app = TestApp::new();
    let creator = app
        .privileged_session("studio", "studio@example.com", "creator", CREATOR_CODE)
        .await;
    let admin = admin(&app).await;

    let (status, body) = submit_release(&app, &creator, "Genesis").await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let pending = app.get("/api/releases/pending", Some(&admin)).await;
    let rows = pending.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Genesis");
    assert_eq!(rows[0]["estimated_count"], 250);

    let response = app
        .post(&format!("/api/releases/{id}/approve"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let jobs = app.store.mint_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(i64::from(jobs[0].source_release.as_i32()), id);
    assert_eq!(jobs[0].release_name, "Genesis");
    assert_eq!(jobs[0].owner_address, "studio");

    let response = app
        .post(&format!("/api/releases/{id}/approve"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.mint_jobs().len(), 1);
}

#[tokio::test]
async fn test_release_approval_survives_transient_cleanup_failure() {
    let app = TestApp::new();
    let creator = app
        .privileged_session("studio", "studio@example.com", "creator", CREATOR_CODE)
        .await;
    let admin = admin(&app).await;
    let (_, body) = submit_release(&app, &creator, "Genesis").await;
    let id = body["id"].as_i64().unwrap();

    app.store.fail_next_deletes(1);
    let response = app
        .post(&format!("/api/releases/{id}/approve"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let pending = app.get("/api/releases/pending", Some(&admin)).await;
    assert!(pending.body.as_array().unwrap().is_empty());
    assert_eq!(app.store.mint_jobs().len(), 1);
}

#[tokio::test]
async fn test_release_decline_notifies_account_email() {
    let app = TestApp::new();
    let creator = app
        .privileged_session("studio", "studio@example.com", "creator", CREATOR_CODE)
        .await;
    let admin = admin(&app).await;
    let (_, body) = submit_release(&app, &creator, "Genesis").await;
    let id = body["id"].as_i64().unwrap();
    let before = app.sent_count("studio@example.com");

    let response = app
        .post(&format!("/api/releases/{id}/decline"), Some(&admin), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.sent_count("studio@example.com"), before + 1);
    assert!(app.store.mint_jobs().is_empty());
}

#[tokio::test]
async fn test_release_submit_validates_count() {
    let app = TestApp::new();
    let admin = admin(&app).await;

    let response = app
        .multipart(
            "/api/releases",
            Some(&admin),
            &[
                ("title", "Zero"),
                ("release_date", "2026-12-01"),
                ("estimated_count", "0"),
            ],
            &[("media", "cover.png", b"\x89PNG cover")],
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
