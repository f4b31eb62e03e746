//! Telegram dispatcher: fans one message out to every configured chat.
//!
//! Each chat gets its own `sendMessage` request. Requests run concurrently
//! and are joined all-settled: a failing or slow chat never cancels its
//! siblings, and failures are logged rather than returned. There are no
//! retries.

use futures::future::join_all;
use serde::Serialize;

use mailwatch_common::error::AppError;
use mailwatch_common::types::DestinationConfig;

use crate::compose::RenderedMessage;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    parse_mode: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup<'a>>,
}

#[derive(Debug, Serialize)]
struct ReplyMarkup<'a> {
    inline_keyboard: Vec<Vec<InlineButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    web_app: WebAppInfo<'a>,
}

#[derive(Debug, Serialize)]
struct WebAppInfo<'a> {
    url: &'a str,
}

impl<'a> SendMessageRequest<'a> {
    fn new(chat_id: &'a str, message: &'a RenderedMessage) -> Self {
        Self {
            chat_id,
            parse_mode: "HTML",
            text: message.text(),
            reply_markup: message.button().map(|button| ReplyMarkup {
                inline_keyboard: vec![vec![InlineButton {
                    text: &button.label,
                    web_app: WebAppInfo { url: &button.url },
                }]],
            }),
        }
    }
}

/// Result of delivering to one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { chat_id: String },
    /// Telegram answered with a non-success status
    Rejected {
        chat_id: String,
        status: u16,
        body: String,
    },
    /// The request never got an answer
    Failed { chat_id: String, error: String },
}

impl DeliveryOutcome {
    pub fn chat_id(&self) -> &str {
        match self {
            DeliveryOutcome::Delivered { chat_id }
            | DeliveryOutcome::Rejected { chat_id, .. }
            | DeliveryOutcome::Failed { chat_id, .. } => chat_id,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Sends rendered messages through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramDispatcher {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramDispatcher {
    pub fn new(api_base: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Http(format!("Failed to build Telegram client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Deliver `message` to every chat in `destination`.
    ///
    /// Does nothing when the destination has no bot token or no chats.
    /// Completes once every request has settled and never reports failure.
    pub async fn dispatch(&self, destination: &DestinationConfig, message: &RenderedMessage) {
        let Some(token) = destination.active_token() else {
            tracing::debug!("Telegram notifications disabled, skipping dispatch");
            return;
        };

        let outcomes = self
            .deliver_all(token, &destination.chat_ids, message)
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_delivered()).count();
        tracing::debug!(
            destinations = outcomes.len(),
            failed,
            "Telegram dispatch settled"
        );
    }

    /// Send to each chat concurrently and collect every outcome.
    pub async fn deliver_all(
        &self,
        token: &str,
        chat_ids: &[String],
        message: &RenderedMessage,
    ) -> Vec<DeliveryOutcome> {
        let endpoint = format!("{}/bot{}/sendMessage", self.api_base, token);

        let deliveries = chat_ids
            .iter()
            .map(|chat_id| self.deliver_one(&endpoint, chat_id.trim(), message));

        join_all(deliveries).await
    }

    async fn deliver_one(
        &self,
        endpoint: &str,
        chat_id: &str,
        message: &RenderedMessage,
    ) -> DeliveryOutcome {
        let body = SendMessageRequest::new(chat_id, message);

        match self.client.post(endpoint).json(&body).send().await {
            Ok(response) if response.status().is_success() => DeliveryOutcome::Delivered {
                chat_id: chat_id.to_string(),
            },
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    chat_id,
                    status,
                    response = %body,
                    "Failed to send Telegram notification"
                );
                DeliveryOutcome::Rejected {
                    chat_id: chat_id.to_string(),
                    status,
                    body,
                }
            }
            Err(e) => {
                // the request URL embeds the bot token
                let error = e.without_url().to_string();
                tracing::error!(chat_id, error = %error, "Failed to send Telegram notification");
                DeliveryOutcome::Failed {
                    chat_id: chat_id.to_string(),
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::compose::ActionButton;

    const TOKEN: &str = "123:abc";

    fn dispatcher(server: &MockServer) -> TelegramDispatcher {
        TelegramDispatcher::new(server.base_url()).unwrap()
    }

    fn destination(chats: &str) -> DestinationConfig {
        DestinationConfig::new(Some(TOKEN.to_string()), Some(chats), None)
    }

    #[tokio::test]
    async fn test_fans_out_to_trimmed_chat_ids() {
        let server = MockServer::start();
        let mocks: Vec<_> = ["1", "2", "3"]
            .iter()
            .map(|id| {
                server.mock(|when, then| {
                    when.method(POST)
                        .path(format!("/bot{}/sendMessage", TOKEN))
                        .json_body(json!({
                            "chat_id": id,
                            "parse_mode": "HTML",
                            "text": "<b>hello</b>"
                        }));
                    then.status(200).json_body(json!({"ok": true}));
                })
            })
            .collect();

        let message = RenderedMessage::new("<b>hello</b>".to_string());
        let dest = destination("1, 2,3");
        let outcomes = dispatcher(&server)
            .deliver_all(TOKEN, &dest.chat_ids, &message)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(DeliveryOutcome::is_delivered));
        for mock in &mocks {
            mock.assert_calls(1);
        }
    }

    #[tokio::test]
    async fn test_failed_chat_does_not_block_others() {
        let server = MockServer::start();
        let ok_one = server.mock(|when, then| {
            when.method(POST).json_body(json!({"chat_id": "1", "parse_mode": "HTML", "text": "hi"}));
            then.status(200).json_body(json!({"ok": true}));
        });
        let failing = server.mock(|when, then| {
            when.method(POST).json_body(json!({"chat_id": "2", "parse_mode": "HTML", "text": "hi"}));
            then.status(400)
                .body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#);
        });
        let ok_three = server.mock(|when, then| {
            when.method(POST).json_body(json!({"chat_id": "3", "parse_mode": "HTML", "text": "hi"}));
            then.status(200).json_body(json!({"ok": true}));
        });

        let message = RenderedMessage::new("hi".to_string());
        let client = dispatcher(&server);
        let dest = destination("1, 2,3");

        // dispatch itself must not surface the failure
        client.dispatch(&dest, &message).await;
        ok_one.assert_calls(1);
        failing.assert_calls(1);
        ok_three.assert_calls(1);

        let outcomes = client.deliver_all(TOKEN, &dest.chat_ids, &message).await;
        let rejected: Vec<_> = outcomes.iter().filter(|o| !o.is_delivered()).collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].chat_id(), "2");
        assert!(matches!(
            rejected[0],
            DeliveryOutcome::Rejected { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_captured() {
        // nothing listens on port 9 of the loopback interface
        let client = TelegramDispatcher::new("http://127.0.0.1:9").unwrap();
        let message = RenderedMessage::new("hi".to_string());
        let outcomes = client
            .deliver_all(TOKEN, &["1".to_string()], &message)
            .await;
        assert!(matches!(outcomes[0], DeliveryOutcome::Failed { .. }));
        if let DeliveryOutcome::Failed { error, .. } = &outcomes[0] {
            assert!(!error.contains(TOKEN));
        }
    }

    #[tokio::test]
    async fn test_slow_destination_still_delivered() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.method(POST).path(format!("/bot{}/sendMessage", TOKEN));
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({"ok": true}));
        });

        let outcomes = dispatcher(&server)
            .deliver_all(
                TOKEN,
                &["1".to_string()],
                &RenderedMessage::new("hi".to_string()),
            )
            .await;

        assert!(outcomes[0].is_delivered());
        slow.assert_calls(1);
    }

    #[tokio::test]
    async fn test_empty_token_sends_nothing() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let dest = DestinationConfig::new(Some(String::new()), Some("1,2"), None);
        dispatcher(&server)
            .dispatch(&dest, &RenderedMessage::new("hi".to_string()))
            .await;

        let dest = DestinationConfig::new(None, Some("1,2"), None);
        dispatcher(&server)
            .dispatch(&dest, &RenderedMessage::new("hi".to_string()))
            .await;

        any.assert_calls(0);
    }

    #[tokio::test]
    async fn test_button_serialized_as_web_app() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).json_body(json!({
                "chat_id": "77",
                "parse_mode": "HTML",
                "text": "mail",
                "reply_markup": {
                    "inline_keyboard": [[
                        { "text": "Check", "web_app": { "url": "https://mail.example.com/x" } }
                    ]]
                }
            }));
            then.status(200);
        });

        let message = RenderedMessage::new("mail".to_string()).with_button(ActionButton {
            label: "Check".to_string(),
            url: "https://mail.example.com/x".to_string(),
        });
        dispatcher(&server)
            .dispatch(&destination("77"), &message)
            .await;

        mock.assert_calls(1);
    }
}
