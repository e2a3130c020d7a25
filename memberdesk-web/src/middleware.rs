//! Request middleware
//!
//! Three layers wrap the API, outermost first: audit completion (opens
//! the trail, persists after the response), authentication (resolves an
//! optional principal from the bearer token), and the authorization
//! guard (checks the route policy before the handler runs).

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use memberdesk_core::{evaluate, AuditEvent, Principal};

use crate::audit::trail::AuditTrail;
use crate::auth::jwt::{JwtService, TokenType};
use crate::state::AppState;

/// Guard verdicts that stop a request before its handler
#[derive(Debug)]
pub enum GuardRejection {
    /// No usable credentials on a non-public route
    Unauthenticated,
    /// Authenticated but lacking a required permission. The body stays
    /// constant; which permission was missing is logged server side only.
    Forbidden,
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            GuardRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication_required",
                "Authentication required",
            ),
            GuardRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                "Insufficient permissions",
            ),
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Resolve the caller's identity from the Authorization header.
///
/// This layer never rejects: a missing, expired, or malformed token
/// simply leaves the request anonymous and lets the guard decide
/// whether that matters for the route.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match JwtService::verify_token(&token) {
            Ok(claims) if claims.token_type == TokenType::Access => {
                if let Some(principal) = state.resolve_principal(&claims.sub).await {
                    let trail = request.extensions().get::<AuditTrail>().cloned();
                    if let Some(trail) = trail {
                        trail.set_actor(principal.clone());
                    }
                    request.extensions_mut().insert(principal);
                }
            }
            Ok(_) => {
                tracing::debug!("Ignoring non-access token on API request");
            }
            Err(e) => {
                tracing::debug!("Ignoring invalid bearer token: {}", e);
            }
        }
    }

    next.run(request).await
}

/// Enforce the route policy before the handler runs.
///
/// Unauthenticated callers on protected routes get 401; authenticated
/// callers missing a permission get 403 with a constant body. Requests
/// that matched no route pass through so the router can answer 404.
pub async fn authorize(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GuardRejection> {
    let pattern = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => return Ok(next.run(request).await),
    };

    let policy = state.policy.resolve(request.method(), &pattern);
    if policy.public {
        return Ok(next.run(request).await);
    }

    let principal = match request.extensions().get::<Principal>() {
        Some(principal) => principal.clone(),
        None => {
            tracing::debug!("Rejected anonymous {} {}", request.method(), pattern);
            return Err(GuardRejection::Unauthenticated);
        }
    };

    if !evaluate(&policy.required, Some(&principal)) {
        let missing: Vec<String> = policy
            .required
            .iter()
            .filter(|p| !principal.has_permission(p))
            .map(|p| p.to_string())
            .collect();
        tracing::warn!(
            "Denied {} {} for user {}: missing {}",
            request.method(),
            pattern,
            principal.username,
            missing.join(", ")
        );
        return Err(GuardRejection::Forbidden);
    }

    Ok(next.run(request).await)
}

/// Open an audit trail for the request and persist any recorded intent
/// once the final status is known.
///
/// Only responses below 400 produce an audit event; a handler that
/// recorded an intent and then failed leaves nothing behind. The write
/// itself runs on a detached task so a slow or broken audit store can
/// never change what the caller receives.
pub async fn audit_completion(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let trail = AuditTrail::new();
    let ip_address = extract_client_ip(request.headers());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    request.extensions_mut().insert(trail.clone());
    let response = next.run(request).await;

    let (actor, intent) = trail.take();
    if let Some(intent) = intent {
        if response.status().as_u16() < 400 {
            let event = AuditEvent::from_intent(
                intent,
                actor.map(|p| p.id),
                ip_address,
                user_agent,
            );
            let store = state.audit_store.clone();
            tokio::spawn(async move {
                if let Err(e) = store.append(&event).await {
                    tracing::warn!("Failed to persist audit event {}: {}", event.action, e);
                }
            });
        } else {
            tracing::debug!(
                "Discarding audit intent {} after {} response",
                intent.action,
                response.status()
            );
        }
    }

    response
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Best-effort client address for audit records, trusting the usual
/// reverse proxy headers
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use tower::ServiceExt;

    use crate::auth::users::CreateUserRequest;
    use crate::{create_app, WebConfig};

    async fn test_state() -> AppState {
        AppState::new(WebConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn guard_rejects_anonymous_callers_on_protected_routes() {
        let app = create_app(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/news")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn guard_denies_a_missing_permission_with_403() {
        let state = test_state().await;
        let account = state
            .user_service
            .create_user(CreateUserRequest {
                username: "viewer".to_string(),
                password: "password123".to_string(),
                display_name: None,
                roles: vec!["REVIEWER".to_string()],
            })
            .await
            .unwrap();
        let pair =
            JwtService::generate_token_pair(&account.id, &account.username, &account.roles)
                .unwrap();

        let app = create_app(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/news")
                    .header("authorization", format!("Bearer {}", pair.access_token))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"title":"T","body":"B"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn public_routes_bypass_the_guard() {
        let app = create_app(test_state().await);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/memberships")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"applicant_name":"Ada","email":"ada@example.org","motivation":"join"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(extract_client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(extract_client_ip(&headers), Some("198.51.100.4".to_string()));
    }

    #[test]
    fn no_proxy_headers_means_no_address() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
    }
}
