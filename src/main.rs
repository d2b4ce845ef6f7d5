use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beylerbeyi_leads::api;
use beylerbeyi_leads::config::Config;
use beylerbeyi_leads::handlers::AppState;

/// Main entry point.
///
/// Initializes tracing, loads configuration, wires the lead store and
/// notification channels, then serves the form endpoints.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beylerbeyi_leads=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let port = config.port;
    let app_state = Arc::new(AppState::from_config(config).await?);

    // Rate limiter: 5 requests/second per IP, burst of 10
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("invalid rate limiter configuration"))?,
    );

    // Health check bypasses rate limiting
    let protected_routes = api::form_routes().layer(GovernorLayer {
        config: governor_conf,
    });
    let app = api::with_health(protected_routes, app_state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
