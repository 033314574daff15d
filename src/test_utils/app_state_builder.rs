//! Test app state builder for HTTP-level integration testing.
//!
//! Provides `TestAppStateBuilder`, which creates an `AppState` wired to
//! in-memory mocks so route handlers can be exercised with axum-test.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    domain::entities::user_account::UserAccount,
    infra::{config::AppConfig, rate_limit::RateLimiter},
    test_utils::{InMemoryAuthTokenRepo, InMemoryEmailSender, InMemoryRateLimiter,
        InMemoryUserAccountRepo},
    use_cases::auth::{AuthUseCases, EmailSender},
};

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let user = create_test_user(|u| u.email = "alice@example.com".to_string());
///
/// let app_state = TestAppStateBuilder::new()
///     .with_user(user)
///     .with_environment("production")
///     .build();
/// ```
pub struct TestAppStateBuilder {
    users: Vec<UserAccount>,
    environment: String,
    status_window_minutes: i64,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    email_sender: Option<Arc<dyn EmailSender>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            environment: "development".to_string(),
            status_window_minutes: 5,
            rate_limiter: None,
            email_sender: None,
        }
    }

    /// Seed an account into the user repo.
    pub fn with_user(mut self, user: UserAccount) -> Self {
        self.users.push(user);
        self
    }

    /// Override the configured environment (default "development").
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Override the check-magic-link trailing window (default 5 minutes).
    pub fn with_status_window_minutes(mut self, minutes: i64) -> Self {
        self.status_window_minutes = minutes;
        self
    }

    /// Replace the permissive default rate limiter.
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Replace the capturing default email sender (e.g. with a failing one).
    pub fn with_email_sender(mut self, email_sender: Arc<dyn EmailSender>) -> Self {
        self.email_sender = Some(email_sender);
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Build the app state and hand back the installed mocks for assertions.
    /// A sender set via `with_email_sender` takes precedence; the returned
    /// `InMemoryEmailSender` then simply captures nothing.
    pub fn build_with_mocks(
        self,
    ) -> (
        AppState,
        Arc<InMemoryAuthTokenRepo>,
        Arc<InMemoryUserAccountRepo>,
        Arc<InMemoryEmailSender>,
    ) {
        let config = test_config(&self.environment, self.status_window_minutes);

        let tokens = Arc::new(InMemoryAuthTokenRepo::new());
        let users = Arc::new(InMemoryUserAccountRepo::with_users(self.users));
        let capturing_sender = Arc::new(InMemoryEmailSender::new());
        let email: Arc<dyn EmailSender> = match self.email_sender {
            Some(sender) => sender,
            None => capturing_sender.clone(),
        };
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(InMemoryRateLimiter::permissive()));

        let auth_use_cases = AuthUseCases::new(
            tokens.clone(),
            users.clone(),
            email,
            config.app_origin.to_string(),
        );

        let app_state = AppState {
            config: Arc::new(config),
            auth_use_cases: Arc::new(auth_use_cases),
            user_repo: users.clone(),
            rate_limiter,
        };

        (app_state, tokens, users, capturing_sender)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config(environment: &str, status_window_minutes: i64) -> AppConfig {
    AppConfig {
        jwt_secret: SecretString::new("test-jwt-secret-0123456789".into()),
        session_token_ttl: Duration::hours(1),
        app_origin: Url::parse("https://app.jobmatch.test").expect("valid test origin"),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        magic_link_ttl_minutes: 15,
        status_window_minutes,
        bind_addr: "127.0.0.1:0".parse().expect("valid test bind addr"),
        database_url: String::new(),
        redis_url: String::new(),
        rate_limit_window_secs: 60,
        rate_limit_per_ip: u64::MAX,
        rate_limit_per_email: u64::MAX,
        trust_proxy: false,
        resend_api_key: SecretString::new("test-resend-key".into()),
        email_from: "login@jobmatch.test".to_string(),
        environment: environment.to_string(),
        token_purge_interval_secs: 3_600,
    }
}
