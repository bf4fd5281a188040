use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{DispatchError, NotificationDispatcher};
use crate::database::{OwnerStore, TargetStore};
use crate::monitoring::types::{StatusTransition, TargetStatus};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Thin Bot API client that only knows how to send a message
pub struct TelegramClient {
    token: Option<String>,
    api_base: String,
    http: reqwest::Client,
}

impl TelegramClient {
    /// A missing or empty token yields a client that sends nothing
    pub fn new(token: Option<String>, api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(token, api_base, http))
    }

    pub fn with_client(token: Option<String>, api_base: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            token: token.filter(|token| !token.trim().is_empty()),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DispatchError> {
        let Some(token) = &self.token else {
            debug!("Telegram token not configured, skipping message to chat {}", chat_id);
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/bot{}/sendMessage", self.api_base, token))
            .json(&SendMessageRequest { chat_id, text, parse_mode: "HTML" })
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(DispatchError::Status(response.status().as_u16()));
        }

        let body: SendMessageResponse = response.json().await?;
        if !body.ok {
            debug!("Telegram rejected message: {}", body.description.unwrap_or_default());
            return Err(DispatchError::Rejected);
        }

        info!("Telegram message sent to chat {}", chat_id);
        Ok(())
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// HTML body announcing a status change
pub fn format_status_message(url: &str, transition: &StatusTransition) -> String {
    let (emoji, headline) = match transition.new_status {
        TargetStatus::Up => ("✅", "BACK ONLINE"),
        TargetStatus::Down => ("❌", "UNREACHABLE"),
        TargetStatus::Unknown => ("❓", "UNKNOWN"),
    };

    format!(
        "{emoji} <b>{headline}</b>\n\n🌐 <b>Site:</b> {}\n📊 <b>Status:</b> {} → {}\n⏰ <b>Time:</b> {}",
        escape_html(url),
        transition.old_status,
        transition.new_status,
        transition.observed_at.format("%H:%M:%S %d.%m.%Y UTC"),
    )
}

/// Resolves target -> owner -> chat and delivers through [`TelegramClient`]
pub struct TelegramNotifier {
    targets: Arc<dyn TargetStore>,
    owners: Arc<dyn OwnerStore>,
    client: TelegramClient,
}

impl TelegramNotifier {
    pub fn new(targets: Arc<dyn TargetStore>, owners: Arc<dyn OwnerStore>, client: TelegramClient) -> Self {
        Self { targets, owners, client }
    }
}

#[async_trait]
impl NotificationDispatcher for TelegramNotifier {
    async fn notify(&self, transition: &StatusTransition) -> Result<(), DispatchError> {
        if !self.client.is_configured() {
            debug!("Telegram not configured, dropping {}", transition);
            return Ok(());
        }

        let Some(target) = self.targets.read_one(transition.target_id).await? else {
            debug!("Target {} not found, nothing to notify", transition.target_id);
            return Ok(());
        };

        let Some(owner) = self.owners.get_owner(target.owner_id).await? else {
            debug!("Owner {} of target {} not found", target.owner_id, target.id);
            return Ok(());
        };

        let Some(chat_id) = owner.telegram_chat_id else {
            debug!("Owner {} has no Telegram chat linked", owner.id);
            return Ok(());
        };

        self.client.send_message(chat_id, &format_status_message(&target.url, transition)).await
    }
}
