//! Audit capture rules: what gets persisted, what gets discarded

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{spawn_app, spawn_app_with_audit_store, FailingAuditStore, TestApp};
use serde_json::json;

async fn submit_application(app: &TestApp, name: &str) -> serde_json::Value {
    let response = app
        .client
        .post(app.api("/api/memberships"))
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .header("user-agent", "membership-kiosk")
        .json(&json!({
            "applicant_name": name,
            "email": format!("{}@example.org", name.to_lowercase()),
            "motivation": "I would like to join",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn public_submission_audits_with_null_actor_and_transport_facts() {
    let app = spawn_app().await;
    let application = submit_application(&app, "Ada").await;

    let events = app.wait_for_audit("membership.submit", 1).await;
    let event = &events[0];
    assert_eq!(event.actor_id, None);
    assert_eq!(event.entity, "membership");
    assert_eq!(event.entity_id.as_deref(), application["id"].as_str());
    // First X-Forwarded-For entry wins over the proxy hop.
    assert_eq!(event.ip_address.as_deref(), Some("203.0.113.9"));
    assert_eq!(event.user_agent.as_deref(), Some("membership-kiosk"));
}

#[tokio::test]
async fn approval_writes_exactly_one_event_with_the_actor() {
    let app = spawn_app().await;
    let application = submit_application(&app, "Bea").await;
    let id = application["id"].as_str().unwrap();

    let reviewer = app.user_with_roles("rev", &["REVIEWER"]).await;
    let me: serde_json::Value = app
        .client
        .get(app.api("/api/auth/me"))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .post(app.api(&format!("/api/memberships/{}/approve", id)))
        .bearer_auth(&reviewer)
        .json(&json!({ "note": "welcome aboard" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let events = app.wait_for_audit("membership.approve", 1).await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.actor_id.as_deref(), me["id"].as_str());
    assert_eq!(event.entity, "membership");
    assert_eq!(event.entity_id.as_deref(), Some(id));
    assert_eq!(event.metadata, Some(json!({ "note": "welcome aboard" })));

    // Still exactly one after the write has settled.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.audit_events("membership.approve").await.len(), 1);
}

#[tokio::test]
async fn failed_operations_leave_no_event_behind() {
    let app = spawn_app().await;
    let reviewer = app.user_with_roles("rev", &["REVIEWER"]).await;

    // Unknown id: handler fails before recording an intent.
    let response = app
        .client
        .post(app.api("/api/memberships/no-such-id/approve"))
        .bearer_auth(&reviewer)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // A 4xx response never spawns a write, so no waiting is needed.
    assert!(app.audit_events("membership.approve").await.is_empty());
}

#[tokio::test]
async fn validation_failures_are_not_audited() {
    let app = spawn_app().await;
    let editor = app.user_with_roles("ed", &["EDITOR"]).await;

    let response = app
        .client
        .post(app.api("/api/news"))
        .bearer_auth(&editor)
        .json(&json!({ "title": "   ", "body": "text" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    assert!(app.audit_events("news.create").await.is_empty());
}

#[tokio::test]
async fn denied_requests_are_not_audited() {
    let app = spawn_app().await;
    let reviewer = app.user_with_roles("rev", &["REVIEWER"]).await;

    let response = app
        .client
        .post(app.api("/api/news"))
        .bearer_auth(&reviewer)
        .json(&json!({ "title": "Sneaky", "body": "text" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    assert!(app.audit_events("news.create").await.is_empty());
}

#[tokio::test]
async fn read_only_requests_write_nothing() {
    let app = spawn_app().await;
    let reviewer = app.user_with_roles("rev", &["REVIEWER"]).await;

    // Let the setup writes land first so the total is stable.
    let baseline_logins = app.wait_for_audit("auth.login", 2).await.len();
    app.wait_for_audit("user.create", 1).await;
    let total_before = app.audit_total().await;

    let response = app
        .client
        .get(app.api("/api/memberships"))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.audit_total().await, total_before);
    assert_eq!(
        app.audit_events("auth.login").await.len(),
        baseline_logins
    );
}

#[tokio::test]
async fn audit_store_failures_never_touch_the_response() {
    let store = FailingAuditStore::default();
    let app = spawn_app_with_audit_store(Arc::new(store.clone())).await;

    // Three audited operations: admin login, public submission, and
    // an approval. Every response must succeed as if auditing worked.
    let admin = app.admin_token().await;
    let application = submit_application(&app, "Cleo").await;
    let id = application["id"].as_str().unwrap();

    let response = app
        .client
        .post(app.api(&format!("/api/memberships/{}/approve", id)))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The writer did try, once per audited operation.
    for _ in 0..100 {
        if store.attempts() >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.attempts(), 3);
}
