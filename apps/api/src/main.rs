mod ai;
mod config;
mod data_url;
mod errors;
mod export;
mod layout;
mod models;
mod routes;
mod state;
mod store;
mod text;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::AiClient;
use crate::config::Config;
use crate::layout::default_page_config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::spawn_idle_reaper;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Forge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize AI client
    let mut ai = AiClient::new(config.anthropic_api_key.clone(), config.ai_timeout)?;
    if let Some(url) = &config.anthropic_api_url {
        ai = ai.with_api_url(url.clone());
    }
    if ai.is_configured() {
        info!("AI client initialized (model: {})", ai::MODEL);
    } else {
        warn!("ANTHROPIC_API_KEY is not set; enhance and import endpoints will answer 503");
    }

    let page_config = default_page_config(config.resume_font);
    info!(
        "Export page config: {:?} {}pt, {}x{}mm",
        page_config.font,
        page_config.base_font_size_pt,
        page_config.page_width_mm,
        page_config.page_height_mm
    );

    let state = AppState::new(config.clone(), ai, page_config);
    spawn_idle_reaper(state.sessions.clone());
    info!(
        "Idle sessions expire after {}s",
        config.session_idle.as_secs()
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
