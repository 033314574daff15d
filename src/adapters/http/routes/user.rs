use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    routing::get,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[derive(Serialize)]
struct MeResponse {
    id: String,
    email: String,
    role: String,
}

/// GET /user/me
/// Resolves the bearer session credential back to the account it names.
async fn get_me(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<MeResponse>> {
    let token = bearer_token(&headers).ok_or(AppError::InvalidCredentials)?;
    let claims = jwt::verify_session(token, &app_state.config.jwt_secret)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;
    let user = app_state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    Ok(Json(MeResponse {
        id: user.id.to_string(),
        email: user.email,
        role: user.role.to_string(),
    }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};
    use axum_test::TestServer;
    use time::Duration;

    use crate::adapters::http::routes;
    use crate::test_utils::{TestAppStateBuilder, create_test_user};

    fn build_test_router(app_state: AppState) -> Router<()> {
        routes::router().with_state(app_state)
    }

    #[tokio::test]
    async fn me_returns_profile_for_valid_token() {
        let user = create_test_user(|u| {
            u.email = "alice@example.com".to_string();
        });

        let app_state = TestAppStateBuilder::new().with_user(user.clone()).build();
        let token =
            jwt::issue_session(&user, &app_state.config.jwt_secret, Duration::hours(1)).unwrap();

        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/user/me")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            )
            .await;

        response.assert_status(StatusCode::OK);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["email"].as_str(), Some("alice@example.com"));
        assert_eq!(body["role"].as_str(), Some("candidate"));
    }

    #[tokio::test]
    async fn me_rejects_missing_and_garbage_tokens() {
        let app_state = TestAppStateBuilder::new().build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.get("/user/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .get("/user/me")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_static("Bearer not-a-jwt"),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["code"].as_str(), Some("INVALID_CREDENTIALS"));
    }

    #[tokio::test]
    async fn me_rejects_token_for_deleted_account() {
        let user = create_test_user(|_| {});

        // Account never added to the repo: a valid token alone is not enough.
        let app_state = TestAppStateBuilder::new().build();
        let token =
            jwt::issue_session(&user, &app_state.config.jwt_secret, Duration::hours(1)).unwrap();

        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/user/me")
            .add_header(
                header::AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
