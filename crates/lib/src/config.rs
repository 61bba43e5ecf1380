//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.gembot/config.json`) and environment.
//! Secrets (bot token, API key) normally come from the environment or a `.env` file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (Discord).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// HTTP bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the HTTP facade (default 3000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub discord: DiscordChannelConfig,
}

/// Discord channel config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordChannelConfig {
    /// Bot token. Overridden by DISCORD_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
    /// Literal prefix that marks a message as a prompt command (default "!prompt").
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Longest response (in characters) that is relayed to the channel. Overridden by DISCORD_MAX_LENGTH.
    #[serde(default = "default_max_response_length")]
    pub max_response_length: usize,
    /// When set, each delivered exchange is mirrored to this URL. Overridden by DISCORD_WEBHOOK_URL.
    pub webhook_url: Option<String>,
    /// Gateway WebSocket URL; override for tests or proxies.
    #[serde(default = "default_discord_gateway_url")]
    pub gateway_url: String,
    /// REST API base URL; override for tests or proxies.
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

fn default_command_prefix() -> String {
    "!prompt".to_string()
}

fn default_max_response_length() -> usize {
    2000
}

fn default_discord_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Default for DiscordChannelConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            command_prefix: default_command_prefix(),
            max_response_length: default_max_response_length(),
            webhook_url: None,
            gateway_url: default_discord_gateway_url(),
            api_base: default_discord_api_base(),
        }
    }
}

/// Gemini generative-text API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API key. Overridden by GEMINI_API_KEY env when set.
    pub api_key: Option<String>,
    /// Model id passed as-is to the API (default "gemini-1.5-flash").
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// API root (default https://generativelanguage.googleapis.com).
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
        }
    }
}

/// Non-empty trimmed env var, if set.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the Discord bot token: env DISCORD_BOT_TOKEN overrides config.
pub fn resolve_discord_token(config: &Config) -> Option<String> {
    env_non_empty("DISCORD_BOT_TOKEN").or_else(|| non_empty(config.channels.discord.bot_token.as_ref()))
}

/// Resolve the Gemini API key: env GEMINI_API_KEY overrides config.
pub fn resolve_gemini_api_key(config: &Config) -> Option<String> {
    env_non_empty("GEMINI_API_KEY").or_else(|| non_empty(config.gemini.api_key.as_ref()))
}

/// Resolve the webhook URL: env DISCORD_WEBHOOK_URL overrides config. None disables the webhook sink.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    env_non_empty("DISCORD_WEBHOOK_URL").or_else(|| non_empty(config.channels.discord.webhook_url.as_ref()))
}

/// Resolve the maximum response length: env DISCORD_MAX_LENGTH overrides config.
pub fn resolve_max_response_length(config: &Config) -> usize {
    let configured = config.channels.discord.max_response_length;
    match env_non_empty("DISCORD_MAX_LENGTH") {
        Some(raw) => parse_max_length(&raw).unwrap_or_else(|| {
            log::warn!(
                "ignoring DISCORD_MAX_LENGTH={:?} (not a non-negative integer), using {}",
                raw,
                configured
            );
            configured
        }),
        None => configured,
    }
}

fn parse_max_length(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("GEMBOT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".gembot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (GEMBOT_CONFIG_PATH or ~/.gembot/config.json).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
