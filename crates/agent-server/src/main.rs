//! agent-server
//!
//! Axum-based server exposing the agent loop over HTTP.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{Agent, AgentConfig};
use agent_tools::{local_tools, WebToolSource};

use crate::handlers::{delete_thread, health_check, list_models, query_handler};
use crate::state::AppState;

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        .route("/api/query", post(query_handler))
        .route("/api/threads/{thread_id}", delete(delete_thread))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = agent_runtime::provider_from_env()?;
    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("Connected to model backend");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => tracing::warn!("Model backend not reachable, queries will fail until it is"),
    }

    let config = AgentConfig::from_env()?;
    let search = agent_tools::client_from_lookup(|key| std::env::var(key).ok())?;
    let tools = local_tools(search);
    tracing::info!(tools = tools.len(), model = %config.generation.model, "Agent configured");

    let agent = Agent::builder()
        .provider(provider.clone())
        .tools(tools)
        .source(Arc::new(WebToolSource::default()))
        .config(config)
        .build()?;
    let agent = Arc::new(agent);

    let capacity = match std::env::var("SESSION_CAPACITY") {
        Ok(raw) => raw.parse::<usize>()?,
        Err(_) => agent_core::MemorySessionStore::DEFAULT_CAPACITY,
    };
    let app = router(AppState::with_session_capacity(agent.clone(), provider, capacity));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("agent-server running on http://{}", addr);
    tracing::info!("  GET  /health     - Health check");
    tracing::info!("  GET  /api/models - List available models");
    tracing::info!("  POST /api/query  - Run the agent on a prompt");
    tracing::info!("  DELETE /api/threads/{{id}} - Forget a conversation thread");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    agent.toolbox().shutdown().await?;
    tracing::info!("Tool box shut down");
    Ok(())
}
