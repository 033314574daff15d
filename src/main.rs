use dotenvy::dotenv;
use tracing::info;

use jobmatch_api::infra::{app::create_app, setup::init_app_state};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let app_state = init_app_state().await?;

    // Read bind address from config before moving app_state
    let bind_addr = app_state.config.bind_addr;

    spawn_token_purge(app_state.clone());

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn spawn_token_purge(app_state: jobmatch_api::adapters::http::app_state::AppState) {
    let purge_every = app_state.config.token_purge_interval_secs;
    // Consumed rows stay visible to the check-magic-link poll for the full
    // status window, so expiry alone is not enough to delete them.
    let retain_minutes = app_state.config.status_window_minutes;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(purge_every.max(60)));
        loop {
            interval.tick().await;
            match app_state.auth_use_cases.purge_expired(retain_minutes).await {
                Ok(removed) if removed > 0 => {
                    tracing::debug!(removed, "purged expired magic link tokens")
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = ?err, "token purge failed"),
            }
        }
    });
}
