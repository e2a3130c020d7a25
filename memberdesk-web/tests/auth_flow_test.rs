//! Login, refresh, and session endpoints over HTTP

mod helpers;

use helpers::spawn_app;
use serde_json::json;

#[tokio::test]
async fn health_and_openapi_are_public() {
    let app = spawn_app().await;

    let health = app
        .client
        .get(app.api("/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let doc = app
        .client
        .get(app.api("/api/openapi.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(doc.status(), 200);
    let body: serde_json::Value = doc.json().await.unwrap();
    assert!(body["paths"]["/api/auth/login"].is_object());
}

#[tokio::test]
async fn login_returns_principal_and_tokens() {
    let app = spawn_app().await;

    let body = app.login("admin", "admin123").await;
    assert_eq!(body["user"]["username"], "admin");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_in"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn wrong_password_is_rejected_without_detail() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.api("/api/auth/login"))
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    // Unknown users produce the same error as wrong passwords.
    let response = app
        .client
        .post(app.api("/api/auth/login"))
        .json(&json!({ "username": "ghost", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn me_reflects_the_resolved_principal() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let response = app
        .client
        .get(app.api("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], "admin");
    assert!(body["roles"]
        .as_array()
        .unwrap()
        .contains(&json!("SUPER_ADMIN")));
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = spawn_app().await;

    let response = app.client.get(app.api("/api/auth/me")).send().await.unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "authentication_required");
}

#[tokio::test]
async fn refresh_exchanges_tokens() {
    let app = spawn_app().await;
    let login = app.login("admin", "admin123").await;

    let response = app
        .client
        .post(app.api("/api/auth/refresh"))
        .json(&json!({ "refresh_token": login["refresh_token"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let pair: serde_json::Value = response.json().await.unwrap();
    let fresh_access = pair["access_token"].as_str().unwrap();

    // The fresh access token works.
    let me = app
        .client
        .get(app.api("/api/auth/me"))
        .bearer_auth(fresh_access)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
}

#[tokio::test]
async fn access_token_cannot_refresh() {
    let app = spawn_app().await;
    let login = app.login("admin", "admin123").await;

    let response = app
        .client
        .post(app.api("/api/auth/refresh"))
        .json(&json!({ "refresh_token": login["access_token"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token_type");
}

#[tokio::test]
async fn refresh_token_is_not_accepted_as_a_bearer_credential() {
    let app = spawn_app().await;
    let login = app.login("admin", "admin123").await;

    // A refresh token in the Authorization header must not
    // authenticate a request.
    let response = app
        .client
        .get(app.api("/api/auth/me"))
        .bearer_auth(login["refresh_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn garbage_bearer_token_is_anonymous_not_an_error() {
    let app = spawn_app().await;

    // Public routes keep working with a broken token attached.
    let response = app
        .client
        .get(app.api("/api/health"))
        .bearer_auth("garbage.token.here")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Protected routes treat it as no credentials at all.
    let response = app
        .client
        .get(app.api("/api/auth/me"))
        .bearer_auth("garbage.token.here")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn login_and_logout_are_audited_with_the_actor() {
    let app = spawn_app().await;
    let login = app.login("admin", "admin123").await;
    let user_id = login["user"]["id"].as_str().unwrap().to_string();

    let events = app.wait_for_audit("auth.login", 1).await;
    assert_eq!(events[0].actor_id.as_deref(), Some(user_id.as_str()));
    assert_eq!(events[0].entity, "user");

    let response = app
        .client
        .post(app.api("/api/auth/logout"))
        .bearer_auth(login["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let events = app.wait_for_audit("auth.logout", 1).await;
    assert_eq!(events[0].actor_id.as_deref(), Some(user_id.as_str()));
}
