//! Discord channel: gateway WebSocket session for MESSAGE_CREATE events, REST for sending replies.

use crate::channels::inbound::{InboundMessage, MessageAuthor};
use crate::channels::registry::ChannelHandle;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
const DISCORD_CDN_BASE: &str = "https://cdn.discordapp.com";

/// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
pub const GATEWAY_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 15);

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const DEFAULT_HEARTBEAT_MS: u64 = 41_250;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Close codes after which reconnecting cannot succeed (bad token, intents not enabled, ...).
const FATAL_CLOSE_CODES: &[u16] = &[4004, 4010, 4011, 4012, 4013, 4014];

/// Gateway frame: `{ "op", "d", "s", "t" }`.
#[derive(Debug, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

/// MESSAGE_CREATE payload (subset).
#[derive(Debug, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    /// ISO-8601 creation time.
    pub timestamp: String,
    pub author: DiscordUser,
}

#[derive(Debug, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar hash; None when the user has the default avatar.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
struct ReadyEvent {
    user: DiscordUser,
}

impl DiscordUser {
    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("{}/avatars/{}/{}.png", DISCORD_CDN_BASE, self.id, hash))
    }

    /// `name#1234`, or just the username for accounts without a legacy discriminator.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" && !d.is_empty() => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}

impl DiscordMessage {
    pub fn into_inbound(self, channel_id: &str) -> InboundMessage {
        let created_at = match chrono::DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(t) => t.with_timezone(&chrono::Utc),
            Err(e) => {
                log::debug!("discord: bad message timestamp {:?}: {}", self.timestamp, e);
                chrono::Utc::now()
            }
        };
        let author = MessageAuthor {
            display_name: self.author.display_name().to_string(),
            avatar_url: self.author.avatar_url(),
            id: self.author.id,
            bot: self.author.bot,
        };
        InboundMessage {
            channel_id: channel_id.to_string(),
            conversation_id: self.channel_id,
            message_id: self.id,
            text: self.content,
            author,
            created_at,
        }
    }
}

/// How a gateway session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Channel stopped or inbound receiver gone.
    Stopped,
    Reconnect(String),
    Fatal(String),
}

/// Discord channel connector: keeps a gateway session open and sends replies via the REST API.
pub struct DiscordChannel {
    id: String,
    token: String,
    gateway_url: String,
    api_base: String,
    running: AtomicBool,
    shutdown: Notify,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(token: String, gateway_url: Option<String>, api_base: Option<String>) -> Self {
        Self {
            id: "discord".to_string(),
            token,
            gateway_url: gateway_url.unwrap_or_else(|| DISCORD_GATEWAY_URL.to_string()),
            api_base: api_base
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DISCORD_API_BASE.to_string()),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the gateway session loop and forward messages to the dispatcher. Returns a handle to await on shutdown.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("discord channel: starting gateway session");
        tokio::spawn(async move {
            run_gateway_loop(self, inbound_tx).await;
        })
    }

    /// One gateway connection: hello, identify, then heartbeat and dispatch until it drops.
    async fn run_session(&self, inbound_tx: &mpsc::Sender<InboundMessage>) -> SessionEnd {
        let (ws, _) = match tokio_tungstenite::connect_async(self.gateway_url.as_str()).await {
            Ok(c) => c,
            Err(e) => return SessionEnd::Reconnect(format!("connect failed: {}", e)),
        };
        let (mut sink, mut stream) = ws.split();

        let hello = loop {
            let frame = tokio::select! {
                _ = self.shutdown.notified() => {
                    let _ = sink.close().await;
                    return SessionEnd::Stopped;
                }
                frame = stream.next() => frame,
            };
            match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<GatewayPayload>(&text) {
                    Ok(p) if p.op == OP_HELLO => break p,
                    Ok(p) => {
                        return SessionEnd::Reconnect(format!("expected hello, got op {}", p.op))
                    }
                    Err(e) => return SessionEnd::Reconnect(format!("bad hello frame: {}", e)),
                },
                Some(Ok(Message::Close(frame))) => return close_end(frame),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return SessionEnd::Reconnect(format!("gateway read failed: {}", e)),
                None => return SessionEnd::Reconnect("gateway closed before hello".to_string()),
            }
        };
        let interval_ms = hello
            .d
            .get("heartbeat_interval")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_HEARTBEAT_MS)
            .max(1);

        if let Err(e) = sink
            .send(Message::Text(identify_payload(&self.token).to_string()))
            .await
        {
            return SessionEnd::Reconnect(format!("identify failed: {}", e));
        }

        let mut heartbeat = tokio::time::interval(Duration::from_millis(interval_ms));
        heartbeat.tick().await;
        let mut seq: Option<u64> = None;
        // Set when a heartbeat goes out, cleared by op 11. Still set at the next tick means a zombie connection.
        let mut awaiting_ack = false;

        loop {
            if !self.running() {
                let _ = sink.close().await;
                return SessionEnd::Stopped;
            }
            tokio::select! {
                _ = self.shutdown.notified() => {
                    let _ = sink.close().await;
                    return SessionEnd::Stopped;
                }
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        return SessionEnd::Reconnect("heartbeat not acknowledged".to_string());
                    }
                    if let Err(e) = sink.send(Message::Text(heartbeat_payload(seq).to_string())).await {
                        return SessionEnd::Reconnect(format!("heartbeat failed: {}", e));
                    }
                    awaiting_ack = true;
                }
                frame = stream.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => return close_end(frame),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return SessionEnd::Reconnect(format!("gateway read failed: {}", e)),
                        None => return SessionEnd::Reconnect("gateway stream ended".to_string()),
                    };
                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(p) => p,
                        Err(e) => {
                            log::debug!("discord: skipping unparsable gateway frame: {}", e);
                            continue;
                        }
                    };
                    if payload.s.is_some() {
                        seq = payload.s;
                    }
                    match payload.op {
                        OP_DISPATCH => {
                            if !self.handle_dispatch(payload, inbound_tx).await {
                                let _ = sink.close().await;
                                return SessionEnd::Stopped;
                            }
                        }
                        OP_HEARTBEAT => {
                            if let Err(e) = sink.send(Message::Text(heartbeat_payload(seq).to_string())).await {
                                return SessionEnd::Reconnect(format!("heartbeat failed: {}", e));
                            }
                        }
                        OP_RECONNECT => return SessionEnd::Reconnect("server requested reconnect".to_string()),
                        OP_INVALID_SESSION => return SessionEnd::Reconnect("invalid session".to_string()),
                        OP_HEARTBEAT_ACK => awaiting_ack = false,
                        op => log::debug!("discord: ignoring gateway op {}", op),
                    }
                }
            }
        }
    }

    /// Handle one dispatch event. Returns false when the inbound receiver is gone.
    async fn handle_dispatch(
        &self,
        payload: GatewayPayload,
        inbound_tx: &mpsc::Sender<InboundMessage>,
    ) -> bool {
        match payload.t.as_deref() {
            Some("READY") => match serde_json::from_value::<ReadyEvent>(payload.d) {
                Ok(ready) => log::info!("discord: logged in as {}", ready.user.tag()),
                Err(e) => log::debug!("discord: unparsable READY: {}", e),
            },
            Some("MESSAGE_CREATE") => match serde_json::from_value::<DiscordMessage>(payload.d) {
                Ok(msg) => {
                    if inbound_tx.send(msg.into_inbound(&self.id)).await.is_err() {
                        log::debug!("discord: inbound channel closed, stopping session");
                        return false;
                    }
                }
                Err(e) => log::debug!("discord: skipping malformed MESSAGE_CREATE: {}", e),
            },
            _ => {}
        }
        true
    }

    /// Send a text message to a Discord channel via the REST API.
    pub async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), String> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let body = json!({ "content": text });
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("create message failed: {} {}", status, body));
        }
        Ok(())
    }
}

async fn run_gateway_loop(channel: Arc<DiscordChannel>, inbound_tx: mpsc::Sender<InboundMessage>) {
    while channel.running() {
        match channel.run_session(&inbound_tx).await {
            SessionEnd::Stopped => break,
            SessionEnd::Fatal(reason) => {
                log::error!("discord gateway refused the session: {}", reason);
                break;
            }
            SessionEnd::Reconnect(reason) => {
                if !channel.running() {
                    break;
                }
                log::warn!("discord gateway session ended: {}; reconnecting", reason);
                tokio::select! {
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    _ = channel.shutdown.notified() => break,
                }
            }
        }
    }
    log::info!("discord channel: gateway loop stopped");
}

fn close_end(frame: Option<CloseFrame<'_>>) -> SessionEnd {
    match frame {
        Some(f) => {
            let code = u16::from(f.code);
            let reason = format!("closed with {} {}", code, f.reason);
            if FATAL_CLOSE_CODES.contains(&code) {
                SessionEnd::Fatal(reason)
            } else {
                SessionEnd::Reconnect(reason)
            }
        }
        None => SessionEnd::Reconnect("closed".to_string()),
    }
}

fn identify_payload(token: &str) -> serde_json::Value {
    json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "gembot",
                "device": "gembot"
            }
        }
    })
}

fn heartbeat_payload(seq: Option<u64>) -> serde_json::Value {
    json!({ "op": OP_HEARTBEAT, "d": seq })
}

#[async_trait]
impl ChannelHandle for DiscordChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), String> {
        DiscordChannel::send_message(self, conversation_id, text).await
    }
}
