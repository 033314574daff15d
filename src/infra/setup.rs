use crate::{
    adapters::{email::resend::ResendEmailSender, http::app_state::AppState,
        persistence::PostgresPersistence},
    infra::{config::AppConfig, db::init_db, rate_limit::RedisRateLimiter},
    use_cases::auth::{AuthTokenRepo, AuthUseCases, UserAccountRepo},
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres = Arc::new(PostgresPersistence::new(init_db(&config.database_url).await?));

    let rate_limiter = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
            config.rate_limit_per_email,
        )
        .await?,
    );

    let email = Arc::new(ResendEmailSender::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));

    let auth_use_cases = AuthUseCases::new(
        postgres.clone() as Arc<dyn AuthTokenRepo>,
        postgres.clone() as Arc<dyn UserAccountRepo>,
        email,
        config.app_origin.to_string(),
    );

    Ok(AppState {
        config: Arc::new(config),
        auth_use_cases: Arc::new(auth_use_cases),
        user_repo: postgres as Arc<dyn UserAccountRepo>,
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "jobmatch_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don't show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
