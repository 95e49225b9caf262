//! Bot API HTTP client.
//!
//! Every method is a JSON `POST` to `{api_url}/bot{token}/{method}`. The
//! token is part of the URL, so it is stripped from transport errors before
//! they are reported.

use crate::error::TelegramError;
use crate::types::{ApiResponse, Message, ParseMode, ReplyKeyboardMarkup, Update, User};
use rootcause::Report;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Public Bot API server.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Timeout for calls that return immediately.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Slack added on top of the long-poll timeout before giving up on a call.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Parameters of `sendMessage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessage {
    /// Target chat.
    pub chat_id: i64,
    /// Message text.
    pub text: String,
    /// Message to reply to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
    /// Formatting mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    /// Custom keyboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyKeyboardMarkup>,
}

impl SendMessage {
    /// Creates a plain text message.
    #[must_use]
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            reply_to_message_id: None,
            parse_mode: None,
            reply_markup: None,
        }
    }

    /// Sends the message as a reply.
    #[must_use]
    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = Some(message_id);
        self
    }

    /// Sets the formatting mode.
    #[must_use]
    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }

    /// Attaches a custom keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: ReplyKeyboardMarkup) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct EditMessageText<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct NoParams {}

/// Client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    token: String,
    api_url: String,
}

impl TelegramClient {
    /// Creates a client for the public Bot API server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, Report<TelegramError>> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TelegramError::RequestFailed {
                method: "client",
                details: e.without_url().to_string(),
            })?;

        Ok(Self {
            client,
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Points the client at a different Bot API server.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the bot's own account.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the token is rejected.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<User, Report<TelegramError>> {
        self.call("getMe", &NoParams {}, REQUEST_TIMEOUT).await
    }

    /// Long-polls for message updates newer than `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self))]
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, Report<TelegramError>> {
        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };
        self.call(
            "getUpdates",
            &params,
            Duration::from_secs(timeout_secs) + POLL_GRACE,
        )
        .await
    }

    /// Sends a text message.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, message), fields(chat_id = message.chat_id))]
    pub async fn send_message(&self, message: &SendMessage) -> Result<Message, Report<TelegramError>> {
        self.call("sendMessage", message, REQUEST_TIMEOUT).await
    }

    /// Replaces the text of a message the bot sent earlier.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    #[instrument(skip(self, text))]
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<Message, Report<TelegramError>> {
        let params = EditMessageText {
            chat_id,
            message_id,
            text,
        };
        self.call("editMessageText", &params, REQUEST_TIMEOUT).await
    }

    async fn call<P, T>(
        &self,
        method: &'static str,
        params: &P,
        timeout: Duration,
    ) -> Result<T, Report<TelegramError>>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{method}", self.api_url, self.token);
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(|e| TelegramError::RequestFailed {
                method,
                details: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelegramError::RequestFailed {
                method,
                details: e.without_url().to_string(),
            })?;
        debug!(method, status = status.as_u16(), "bot api response");

        parse_envelope(method, &body)
    }
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Unwraps the `{ok, result}` envelope.
fn parse_envelope<T: DeserializeOwned>(
    method: &'static str,
    body: &str,
) -> Result<T, Report<TelegramError>> {
    let envelope: ApiResponse<T> =
        serde_json::from_str(body).map_err(|e| TelegramError::InvalidResponse {
            method,
            details: e.to_string(),
        })?;

    if !envelope.ok {
        return Err(TelegramError::Api {
            method,
            code: envelope.error_code,
            description: envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        }
        .into());
    }

    envelope.result.ok_or_else(|| {
        TelegramError::InvalidResponse {
            method,
            details: "ok response without result".to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_test_support::{CannedResponse, closed_port_url, serve_once};

    const TOKEN: &str = "123456:secret-token";

    fn client_for(api_url: String) -> TelegramClient {
        TelegramClient::new(TOKEN).unwrap().with_api_url(api_url)
    }

    #[test]
    fn send_message_omits_unset_fields() {
        let json = serde_json::to_value(SendMessage::new(42, "hi")).unwrap();
        assert_eq!(json, serde_json::json!({"chat_id": 42, "text": "hi"}));
    }

    #[test]
    fn send_message_with_keyboard_and_reply() {
        let message = SendMessage::new(42, "hi")
            .reply_to(7)
            .with_parse_mode(ParseMode::Markdown)
            .with_keyboard(ReplyKeyboardMarkup::single_row(["RESET"]));
        let json = serde_json::to_value(message).unwrap();
        assert_eq!(json["reply_to_message_id"], 7);
        assert_eq!(json["parse_mode"], "Markdown");
        assert_eq!(json["reply_markup"]["keyboard"][0][0]["text"], "RESET");
    }

    #[test]
    fn debug_redacts_token() {
        let client = TelegramClient::new(TOKEN).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("api.telegram.org"));
    }

    #[test]
    fn envelope_error_carries_retry_after() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 3","parameters":{"retry_after":3}}"#;
        let err = parse_envelope::<User>("sendMessage", body).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("429"));
        assert!(rendered.contains("Too Many Requests"));
    }

    #[test]
    fn envelope_without_result_is_invalid() {
        let err = parse_envelope::<User>("getMe", r#"{"ok":true}"#).unwrap_err();
        assert!(err.to_string().contains("without result"));
    }

    #[tokio::test]
    async fn get_updates_posts_offset_to_method_url() {
        let (url, server) = serve_once(CannedResponse::json(
            "HTTP/1.1 200 OK",
            r#"{"ok":true,"result":[{"update_id":10,"message":{"message_id":1,"chat":{"id":42,"type":"private"},"date":0,"text":"hello"}}]}"#,
        ))
        .await;

        let updates = client_for(url).get_updates(Some(10), 0).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /bot123456:secret-token/getUpdates "));
        assert!(request.contains(r#""offset":10"#));
        assert!(request.contains(r#""allowed_updates":["message"]"#));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn api_rejection_becomes_error() {
        let (url, server) = serve_once(CannedResponse::json(
            "HTTP/1.1 400 Bad Request",
            r#"{"ok":false,"error_code":400,"description":"Bad Request: message text is empty"}"#,
        ))
        .await;

        let result = client_for(url).send_message(&SendMessage::new(42, "")).await;
        server.await.unwrap();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("message text is empty"));
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_token() {
        let err = client_for(closed_port_url().await).get_me().await.unwrap_err();
        assert!(!err.to_string().contains("secret-token"));
    }
}
