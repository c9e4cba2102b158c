//! Telegram notification channel — sendMessage via Bot API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use guardpost_core::config::TelegramConfig;
use guardpost_core::error::{GuardPostError, Result};
use guardpost_core::traits::Notifier;

/// Escape Telegram MarkdownV2 special characters.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '_' | '*'
                | '['
                | ']'
                | '('
                | ')'
                | '~'
                | '`'
                | '>'
                | '#'
                | '+'
                | '-'
                | '='
                | '|'
                | '{'
                | '}'
                | '.'
                | '!'
                | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends text messages to one configured chat.
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "MarkdownV2",
            }))
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| GuardPostError::Channel(format!("Telegram send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GuardPostError::Channel(format!(
                "Telegram API error {status}: {body}"
            )));
        }
        let body: TelegramApiResponse = resp
            .json()
            .await
            .map_err(|e| GuardPostError::Channel(format!("Invalid Telegram response: {e}")))?;
        if !body.ok {
            return Err(GuardPostError::Channel(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }
        tracing::debug!("Telegram notification sent to {}", self.chat_id);
        Ok(())
    }
}

/// No-op notifier used when no channel is configured. Logs what it
/// drops so disabled notifications stay visible in traces.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        tracing::debug!("Notification channel disabled, dropping: {text}");
        Ok(())
    }
}

/// Build the notifier from config; missing or disabled configuration
/// yields the no-op.
pub fn notifier_from_config(config: Option<&TelegramConfig>) -> Arc<dyn Notifier> {
    match config {
        Some(tg) if tg.enabled && !tg.bot_token.is_empty() && !tg.chat_id.is_empty() => {
            Arc::new(TelegramNotifier::new(tg.bot_token.clone(), tg.chat_id.clone()))
        }
        _ => Arc::new(NullNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(
            escape_markdown_v2("a_b*c[d]e(f)g~h`i>j#k+l-m=n|o{p}q.r!s"),
            "a\\_b\\*c\\[d\\]e\\(f\\)g\\~h\\`i\\>j\\#k\\+l\\-m\\=n\\|o\\{p\\}q\\.r\\!s"
        );
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
        assert_eq!(escape_markdown_v2("back\\slash"), "back\\\\slash");
    }

    #[tokio::test]
    async fn null_notifier_accepts_everything() {
        assert!(NullNotifier.send_text("dropped").await.is_ok());
    }

    #[tokio::test]
    async fn disabled_or_missing_config_yields_the_noop() {
        let tg = TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: "-100".into(),
            enabled: false,
        };
        // The no-op accepts anything without touching the network; a
        // real TelegramNotifier with this token would fail the send.
        assert!(notifier_from_config(Some(&tg)).send_text("x").await.is_ok());
        assert!(notifier_from_config(None).send_text("x").await.is_ok());
        let empty = TelegramConfig { bot_token: String::new(), enabled: true, ..tg };
        assert!(notifier_from_config(Some(&empty)).send_text("x").await.is_ok());
    }
}
