//! Telegram channel source.
//!
//! Long-polls the Bot API `getUpdates` method for channel posts and turns
//! each post from the configured channel into a [`RawEvent`]. The post URL
//! comes from the first `text_link` entity carrying one.
//!
//! Transport failures are logged and the poll is retried after a fixed
//! pause; the offset only advances past updates that were received.

use std::time::Duration;

use postboard_core::RawEvent;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{deliver, Delivery, EventSource, SourceMetadata, SourceStats};
use crate::pipeline::Relay;
use crate::shutdown::Shutdown;
use crate::{Error, Result};

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Configuration for the Telegram source.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    pub token: String,

    /// Channel to accept posts from; posts from any other chat are dropped.
    pub chat_id: i64,

    /// Bot API base URL.
    pub api_base: String,

    /// Server-side long-poll timeout.
    pub poll_timeout: Duration,

    /// Pause before retrying a failed poll.
    pub retry_delay: Duration,
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            token: token.into(),
            chat_id,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout: Duration::from_secs(60),
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::Config("TELEGRAM_TOKEN is required".to_string()));
        }
        if self.chat_id == 0 {
            return Err(Error::Config(
                "TELEGRAM_CHAT_ID is required and must be a valid integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// One entry of a `getUpdates` result.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub channel_post: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

/// Convert a channel post into a raw event.
///
/// Returns `None` for updates that are not channel posts and for posts from
/// any chat other than `chat_id`. Empty text is passed through; the relay
/// helper skips it.
pub fn event_from_update(update: &Update, chat_id: i64) -> Option<RawEvent> {
    let post = update.channel_post.as_ref()?;

    if post.chat.id != chat_id {
        tracing::warn!(
            chat_id = post.chat.id,
            "Received message from unexpected channel"
        );
        return None;
    }

    let text = post.text.clone().unwrap_or_default();
    let url = if text.is_empty() {
        None
    } else {
        first_text_link(&post.entities)
    };

    Some(RawEvent::new(text, url, post.chat.id))
}

fn first_text_link(entities: &[MessageEntity]) -> Option<String> {
    entities
        .iter()
        .filter(|entity| entity.kind == "text_link")
        .find_map(|entity| entity.url.clone().filter(|url| !url.is_empty()))
}

/// Long-polling Telegram channel source.
pub struct TelegramSource {
    config: TelegramConfig,
    client: reqwest::Client,
    offset: i64,
}

impl TelegramSource {
    /// Validate the configuration and check the token with `getMe`.
    pub async fn connect(config: TelegramConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(15))
            .build()?;

        let source = Self {
            config,
            client,
            offset: 0,
        };

        let me: BotUser = source.call("getMe", &json!({})).await?;
        tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or("-"),
            chat_id = source.config.chat_id,
            "Authorized on Telegram"
        );

        Ok(source)
    }

    /// Next update id to request.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &serde_json::Value) -> Result<T> {
        let url = format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.token,
            method
        );

        let response: ApiResponse<T> = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(Error::Telegram(
                response
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }

        response
            .result
            .ok_or_else(|| Error::Telegram(format!("{method} returned no result")))
    }

    /// Fetch the next batch of channel posts and advance the offset.
    pub async fn poll(&mut self) -> Result<Vec<Update>> {
        let body = json!({
            "offset": self.offset,
            "timeout": self.config.poll_timeout.as_secs(),
            "allowed_updates": ["channel_post"],
        });

        let updates: Vec<Update> = self.call("getUpdates", &body).await?;
        if let Some(last) = updates.iter().map(|update| update.update_id).max() {
            self.offset = last + 1;
        }
        Ok(updates)
    }
}

impl EventSource for TelegramSource {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn run(&mut self, relay: Relay<RawEvent>, shutdown: Shutdown) -> Result<SourceStats> {
        let mut stats = SourceStats::default();
        let mut polls = 0usize;
        let mut poll_failures = 0usize;
        let chat_id = self.config.chat_id;
        let retry_delay = self.config.retry_delay;

        tracing::info!(chat_id, "Bot started, listening for channel posts");

        'poll: loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                result = self.poll() => result,
            };

            match result {
                Ok(updates) => {
                    polls += 1;
                    for update in &updates {
                        let Some(event) = event_from_update(update, chat_id) else {
                            stats.total_events += 1;
                            stats.skipped += 1;
                            continue;
                        };
                        if deliver(&relay, event, &mut stats) == Delivery::Stop {
                            break 'poll;
                        }
                    }
                }
                Err(e) => {
                    poll_failures += 1;
                    tracing::warn!(
                        error = %e,
                        retry_in = ?retry_delay,
                        "Failed to get updates, retrying"
                    );
                    tokio::select! {
                        _ = shutdown.wait() => break,
                        _ = tokio::time::sleep(retry_delay) => {}
                    }
                }
            }
        }

        tracing::info!("Bot stopped");
        stats.source_metadata = SourceMetadata {
            polls: Some(polls),
            poll_failures: Some(poll_failures),
            ..Default::default()
        };
        Ok(stats)
    }
}
