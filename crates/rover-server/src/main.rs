mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::SessionAuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(rover_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = rover_db::PoolConfig::from_app_config(&config);
    let pool = rover_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = rover_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending database migrations");
    }

    let maps = build_maps_client(&config)?;
    let auth = SessionAuthState::new(pool.clone(), config.session_ttl_hours);
    let state = AppState {
        pool,
        config: Arc::clone(&config),
        maps,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "rover-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_maps_client(
    config: &rover_core::AppConfig,
) -> anyhow::Result<Option<Arc<rover_maps::DrivingTimesClient>>> {
    let Some(api_key) = config.maps_api_key.as_deref() else {
        tracing::warn!("MAPS_API_KEY not set; driving time lookups disabled");
        return Ok(None);
    };

    let client = match config.maps_base_url.as_deref() {
        Some(base_url) => rover_maps::DrivingTimesClient::with_base_url(
            api_key,
            config.maps_request_timeout_secs,
            &config.maps_user_agent,
            base_url,
        )?,
        None => rover_maps::DrivingTimesClient::new(
            api_key,
            config.maps_request_timeout_secs,
            &config.maps_user_agent,
        )?,
    };

    Ok(Some(Arc::new(client)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
