// src/notify/telegram.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{build_run_message, Notifier};
use crate::pipeline::RunSummary;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_base: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    /// TELEGRAM_BOT_TOKEN + TELEGRAM_CHAT_ID; disabled when either is unset.
    pub fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Self {
            bot_token: var("TELEGRAM_BOT_TOKEN"),
            chat_id: var("TELEGRAM_CHAT_ID"),
            api_base: API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token: Some(bot_token),
            chat_id: Some(chat_id),
            ..Self::from_env()
        }
    }

    /// Point at a different Bot API host (local test server).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    async fn post(&self, url: &str, body: &SendMessage<'_>) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(url)
                .timeout(self.timeout)
                .json(body)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("telegram HTTP error: {}", e.without_url()),
                },
                Err(e) => anyhow!("telegram request failed: {}", e.without_url()),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "intake", attempt, error = %err, "telegram retry");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, summary: &RunSummary) -> Result<()> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            tracing::debug!(target: "intake", "Telegram disabled (no TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID)");
            return Ok(());
        };

        let text = build_run_message(summary);
        let body = SendMessage {
            chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        self.post(&url, &body).await.context("telegram sendMessage")
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
