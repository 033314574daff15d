use std::env;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub session_token_ttl: Duration,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub magic_link_ttl_minutes: i64,
    /// Trailing window within which a consumed link still answers the
    /// check-magic-link poll.
    pub status_window_minutes: i64,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub rate_limit_per_email: u64,
    /// Whether to trust X-Forwarded-For headers. Set to true when behind a reverse proxy (Caddy, nginx).
    /// SECURITY: Only enable this when the API is not directly exposed to the internet.
    pub trust_proxy: bool,
    pub resend_api_key: SecretString,
    pub email_from: String,
    /// "production" suppresses the raw link in the magic-link response.
    pub environment: String,
    pub token_purge_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString =
            SecretString::new(require("JWT_SECRET").into());

        let session_token_ttl_secs: i64 = parse_default("SESSION_TOKEN_TTL_SECS", 86_400);
        let magic_link_ttl_minutes: i64 = parse_default("MAGIC_LINK_TTL_MINUTES", 15);
        let status_window_minutes: i64 = parse_default("MAGIC_LINK_STATUS_WINDOW_MINUTES", 5);

        let app_origin: Url = require("APP_ORIGIN")
            .parse()
            .expect("APP_ORIGIN must be a valid URL");
        let cors_origin: HeaderValue = env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");

        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3001".to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        let database_url = require("DATABASE_URL");
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let rate_limit_window_secs: u64 = parse_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = parse_default("RATE_LIMIT_PER_IP", 60);
        let rate_limit_per_email: u64 = parse_default("RATE_LIMIT_PER_EMAIL", 30);

        // Default to false for security - must explicitly enable when behind a trusted proxy
        let trust_proxy: bool = parse_default("TRUST_PROXY", false);

        let resend_api_key: SecretString =
            SecretString::new(require("RESEND_API_KEY").into());
        let email_from = require("EMAIL_FROM");

        let environment =
            env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let token_purge_interval_secs: u64 = parse_default("TOKEN_PURGE_INTERVAL_SECS", 3_600);

        Self {
            jwt_secret,
            session_token_ttl: Duration::seconds(session_token_ttl_secs),
            app_origin,
            cors_origin,
            magic_link_ttl_minutes,
            status_window_minutes,
            bind_addr,
            database_url,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            rate_limit_per_email,
            trust_proxy,
            resend_api_key,
            email_from,
            environment,
            token_purge_interval_secs,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn require(var: &'static str) -> String {
    env::var(var).unwrap_or_else(|_| panic!("{var} must be set"))
}

fn parse_default<T: std::str::FromStr>(var: &'static str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{var} must be a valid value")),
        Err(_) => default,
    }
}
