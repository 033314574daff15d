//! Magic link authentication routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{jwt, validators::is_valid_email},
    domain::entities::user_account::UserAccount,
};

#[derive(Deserialize)]
struct RequestLinkPayload {
    email: String,
}

#[derive(Serialize)]
struct RequestLinkResponse {
    message: &'static str,
    /// Raw link, only populated outside production for local testing.
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

#[derive(Deserialize)]
struct VerifyLinkPayload {
    token: String,
}

#[derive(Serialize)]
struct SessionUser {
    id: String,
    email: String,
    role: String,
}

impl From<&UserAccount> for SessionUser {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.to_string(),
        }
    }
}

#[derive(Serialize)]
struct VerifyLinkResponse {
    session_token: String,
    user: SessionUser,
}

#[derive(Deserialize)]
struct CheckLinkPayload {
    email: String,
}

#[derive(Serialize)]
struct CheckLinkResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/magic-link", post(request_magic_link))
        .route("/verify-magic-link", post(verify_magic_link))
        .route("/check-magic-link", post(check_magic_link))
}

/// POST /auth/magic-link
/// Emails a single-use sign-in link; any earlier pending link is invalidated.
async fn request_magic_link(
    State(app_state): State<AppState>,
    Json(payload): Json<RequestLinkPayload>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        return Err(AppError::InvalidEmailFormat);
    }

    app_state.rate_limiter.check_email(email).await?;

    let issued = app_state
        .auth_use_cases
        .request_magic_link(email, app_state.config.magic_link_ttl_minutes)
        .await?;

    let link = (!app_state.config.is_production()).then_some(issued.link);

    Ok((
        StatusCode::ACCEPTED,
        Json(RequestLinkResponse {
            message: "Check your inbox for a sign-in link",
            link,
        }),
    ))
}

/// POST /auth/verify-magic-link
/// Exchanges a link token for a session credential; a token verifies at most
/// once, and the rejection reason is never disclosed.
async fn verify_magic_link(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyLinkPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .auth_use_cases
        .verify_magic_link(&payload.token)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    let session_token = jwt::issue_session(
        &user,
        &app_state.config.jwt_secret,
        app_state.config.session_token_ttl,
    )?;

    Ok((
        StatusCode::OK,
        Json(VerifyLinkResponse {
            session_token,
            user: SessionUser::from(&user),
        }),
    ))
}

/// POST /auth/check-magic-link
/// Poll endpoint for clients waiting on a link clicked on another device.
async fn check_magic_link(
    State(app_state): State<AppState>,
    Json(payload): Json<CheckLinkPayload>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        return Err(AppError::InvalidEmailFormat);
    }

    let user = app_state
        .auth_use_cases
        .check_link_status(email, app_state.config.status_window_minutes)
        .await?;

    let response = match user {
        Some(user) => {
            let session_token = jwt::issue_session(
                &user,
                &app_state.config.jwt_secret,
                app_state.config.session_token_ttl,
            )?;
            CheckLinkResponse {
                authenticated: true,
                session_token: Some(session_token),
            }
        }
        None => CheckLinkResponse {
            authenticated: false,
            session_token: None,
        },
    };

    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    use crate::adapters::http::routes;
    use crate::test_utils::{
        FailingEmailSender, InMemoryRateLimiter, TestAppStateBuilder, token_from_link,
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        routes::router().with_state(app_state)
    }

    // =========================================================================
    // POST /auth/magic-link
    // =========================================================================

    #[tokio::test]
    async fn request_magic_link_invalid_email_returns_400() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "not-an-email" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"].as_str(), Some("INVALID_EMAIL_FORMAT"));
    }

    #[tokio::test]
    async fn request_magic_link_success_sends_email_and_returns_202() {
        let (app_state, _tokens, _users, email_sender) =
            TestAppStateBuilder::new().build_with_mocks();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;

        response.assert_status(StatusCode::ACCEPTED);

        let emails = email_sender.captured_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "user@example.com");
        assert!(emails[0].html.contains("/auth/magic?token="));
        assert!(emails[0].text.contains("/auth/magic?token="));
    }

    #[tokio::test]
    async fn request_magic_link_trims_email_whitespace() {
        let (app_state, _tokens, _users, email_sender) =
            TestAppStateBuilder::new().build_with_mocks();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "  user@example.com  " }))
            .await;

        response.assert_status(StatusCode::ACCEPTED);

        let emails = email_sender.captured_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "user@example.com");
    }

    #[tokio::test]
    async fn request_magic_link_exposes_link_outside_production_only() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        let body = response.json::<serde_json::Value>();
        assert!(body["link"].as_str().is_some());

        let app_state = TestAppStateBuilder::new()
            .with_environment("production")
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        let body = response.json::<serde_json::Value>();
        assert!(body["link"].is_null());
    }

    #[tokio::test]
    async fn request_magic_link_per_email_limit_returns_429() {
        let app_state = TestAppStateBuilder::new()
            .with_rate_limiter(Arc::new(InMemoryRateLimiter::new(u64::MAX, 1)))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        response.assert_status(StatusCode::TOO_MANY_REQUESTS);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"].as_str(), Some("RATE_LIMITED"));
    }

    #[tokio::test]
    async fn request_magic_link_delivery_failure_still_returns_202() {
        let app_state = TestAppStateBuilder::new()
            .with_email_sender(Arc::new(FailingEmailSender))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);

        // The issued (but undelivered) link is still honored.
        let body = response.json::<serde_json::Value>();
        let link = body["link"].as_str().unwrap().to_string();

        let response = server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token_from_link(&link) }))
            .await;
        response.assert_status(StatusCode::OK);
    }

    // =========================================================================
    // POST /auth/verify-magic-link
    // =========================================================================

    async fn request_and_extract_link(server: &TestServer, email: &str) -> String {
        let response = server
            .post("/auth/magic-link")
            .json(&json!({ "email": email }))
            .await;
        response.assert_status(StatusCode::ACCEPTED);
        let body = response.json::<serde_json::Value>();
        body["link"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn verify_magic_link_returns_session_and_user() {
        let app_state = TestAppStateBuilder::new().build();
        let jwt_secret = app_state.config.jwt_secret.clone();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let link = request_and_extract_link(&server, "user@example.com").await;

        let response = server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token_from_link(&link) }))
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["user"]["email"].as_str(), Some("user@example.com"));
        assert_eq!(body["user"]["role"].as_str(), Some("candidate"));

        // The credential must be a verifiable session token.
        let token = body["session_token"].as_str().unwrap();
        let claims = jwt::verify_session(token, &jwt_secret).unwrap();
        assert_eq!(claims.email, "user@example.com");
    }

    #[tokio::test]
    async fn verify_magic_link_second_attempt_returns_400() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let link = request_and_extract_link(&server, "user@example.com").await;
        let token = token_from_link(&link);

        server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token }))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"].as_str(), Some("INVALID_OR_EXPIRED_TOKEN"));
    }

    #[tokio::test]
    async fn verify_magic_link_unknown_token_uses_same_error_code() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"].as_str(), Some("INVALID_OR_EXPIRED_TOKEN"));
    }

    #[tokio::test]
    async fn newer_link_supersedes_older_one() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let first = request_and_extract_link(&server, "user@example.com").await;
        let second = request_and_extract_link(&server, "user@example.com").await;

        server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token_from_link(&first) }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token_from_link(&second) }))
            .await
            .assert_status(StatusCode::OK);
    }

    // =========================================================================
    // POST /auth/check-magic-link
    // =========================================================================

    #[tokio::test]
    async fn check_magic_link_flips_after_verification() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let link = request_and_extract_link(&server, "user@example.com").await;

        let response = server
            .post("/auth/check-magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["authenticated"].as_bool(), Some(false));
        assert!(body["session_token"].is_null());

        server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token_from_link(&link) }))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .post("/auth/check-magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        response.assert_status(StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["authenticated"].as_bool(), Some(true));
        assert!(body["session_token"].as_str().is_some());
    }

    #[tokio::test]
    async fn check_magic_link_outside_window_is_unauthenticated() {
        // Zero-width window: even an immediate re-check misses it.
        let app_state = TestAppStateBuilder::new()
            .with_status_window_minutes(0)
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let link = request_and_extract_link(&server, "user@example.com").await;
        server
            .post("/auth/verify-magic-link")
            .json(&json!({ "token": token_from_link(&link) }))
            .await
            .assert_status(StatusCode::OK);

        let response = server
            .post("/auth/check-magic-link")
            .json(&json!({ "email": "user@example.com" }))
            .await;
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["authenticated"].as_bool(), Some(false));
    }

    #[tokio::test]
    async fn check_magic_link_invalid_email_returns_400() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/auth/check-magic-link")
            .json(&json!({ "email": "nope" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
