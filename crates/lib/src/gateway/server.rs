//! Gateway HTTP server and bootstrap (Discord connector + dispatcher + facade).

use crate::bot::{Dispatcher, HttpWebhookSink, Relay, WebhookSink};
use crate::channels::{ChannelRegistry, DiscordChannel, InboundMessage};
use crate::config::{self, Config};
use crate::gateway::api::{ApiError, PromptRequest};
use crate::llm::{GeminiClient, TextGenerator};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared state for the HTTP facade.
#[derive(Clone)]
pub struct GatewayState {
    pub port: u16,
    pub generator: Arc<dyn TextGenerator>,
    /// Whether a Discord session was started (reported by the health probe).
    pub discord_enabled: bool,
}

/// Routes: `GET /` health, `POST /gemini` prompt.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/gemini", post(generate_http))
        .with_state(state)
}

/// Run the bot: Gemini client, Discord connector (when a token is configured), dispatcher, and the HTTP facade
/// on config.gateway.bind:config.gateway.port. Blocks until shutdown (e.g. Ctrl+C).
/// Fails fast when no Gemini API key is configured.
pub async fn run_gateway(config: Config) -> Result<()> {
    let api_key = config::resolve_gemini_api_key(&config).ok_or_else(|| {
        anyhow::anyhow!("no Gemini API key configured (set GEMINI_API_KEY or gemini.apiKey)")
    })?;
    let gemini = GeminiClient::new(
        api_key,
        Some(config.gemini.model.clone()),
        Some(config.gemini.base_url.clone()),
    );
    log::info!("using gemini model {}", gemini.model());
    let generator: Arc<dyn TextGenerator> = Arc::new(gemini);

    let channel_registry = Arc::new(ChannelRegistry::new());
    let mut channel_tasks: Vec<JoinHandle<()>> = Vec::new();

    let discord_config = &config.channels.discord;
    let discord_enabled = if let Some(token) = config::resolve_discord_token(&config) {
        let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(64);
        let discord = Arc::new(DiscordChannel::new(
            token,
            Some(discord_config.gateway_url.clone()),
            Some(discord_config.api_base.clone()),
        ));
        channel_registry.register(discord.clone()).await;

        let sink: Option<Arc<dyn WebhookSink>> = match config::resolve_webhook_url(&config) {
            Some(url) => {
                log::info!("webhook sink enabled");
                Some(Arc::new(HttpWebhookSink::new(url)))
            }
            None => {
                log::debug!("webhook sink disabled (no DISCORD_WEBHOOK_URL)");
                None
            }
        };
        let max_length = config::resolve_max_response_length(&config);
        let relay = Relay::new(generator.clone(), sink, max_length);
        let dispatcher = Arc::new(Dispatcher::new(
            discord_config.command_prefix.clone(),
            relay,
            channel_registry.clone(),
        ));
        channel_tasks.push(dispatcher.spawn(inbound_rx));
        channel_tasks.push(discord.start_inbound(inbound_tx));
        log::info!(
            "discord channel registered (prefix {:?}, max response length {})",
            discord_config.command_prefix,
            max_length
        );
        true
    } else {
        log::warn!("no Discord bot token configured (DISCORD_BOT_TOKEN); serving the HTTP facade only");
        false
    };

    let state = GatewayState {
        port: config.gateway.port,
        generator,
        discord_enabled,
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(channel_registry, channel_tasks))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Stops channel connectors, then awaits the connector and dispatcher tasks.
async fn shutdown_signal(channel_registry: Arc<ChannelRegistry>, channel_tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channels");

    channel_registry.stop_all().await;
    for h in channel_tasks {
        let _ = h.await;
    }
    log::info!("channel tasks finished");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
        "discord": state.discord_enabled,
    }))
}

/// POST /gemini: `{ "prompt": "..." }` in, raw generated text out.
async fn generate_http(
    State(state): State<GatewayState>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let text = state.generator.generate(&req.prompt).await?;
    Ok(text)
}
