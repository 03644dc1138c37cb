//! Solve notifications
//!
//! A solve is announced with one GET to the Telegram bot API. The response
//! body is ignored and nothing is retried.

use crate::{Result, TimerConfig, TimerError};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Something that can deliver a chat message
pub trait Notifier: Send + Sync {
    fn send(&self, text: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Build the chat message for a solved problem.
///
/// `title` is the file name; its extension is dropped.
pub fn compose_message(title: &str, elapsed: &str) -> String {
    format!("题号：{}\n用时:{}", strip_extension(title), elapsed)
}

fn strip_extension(title: &str) -> &str {
    match title.rfind('.') {
        Some(pos) => &title[..pos],
        None => title,
    }
}

/// Sends messages through `GET <api_base>/bot<token>/sendMessage`
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: Option<String>,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TimerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("leetcode-timer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TimerError::Notify(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// The request that [`Notifier::send`] would issue, if a token is set.
    pub fn build_request(&self, text: &str) -> Result<Option<reqwest::Request>> {
        let Some(token) = &self.token else {
            return Ok(None);
        };
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let request = self
            .client
            .get(url)
            .query(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .build()
            .map_err(|e| TimerError::Notify(e.to_string()))?;
        Ok(Some(request))
    }
}

impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let Some(request) = self.build_request(text)? else {
            warn!("No bot token configured, skipping notification");
            return Ok(());
        };

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| TimerError::Notify(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TimerError::Notify(format!("bot API returned {status}")));
        }
        debug!("Notification delivered ({})", status);
        Ok(())
    }
}
