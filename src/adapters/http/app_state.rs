use std::sync::Arc;

use crate::{
    infra::{config::AppConfig, rate_limit::RateLimiter},
    use_cases::auth::{AuthUseCases, UserAccountRepo},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_use_cases: Arc<AuthUseCases>,
    pub user_repo: Arc<dyn UserAccountRepo>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}
