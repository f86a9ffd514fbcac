//! Message delivery for the check-in tracker.
//!
//! Provides two [`Notifier`] implementations:
//! - [`WebhookNotifier`]: posts to a Slack-compatible incoming webhook
//! - [`LogNotifier`]: writes messages to the log, used when no webhook is configured

use std::fmt;
use std::time::Duration;

use checkin_core::{Notifier, NotifyError, Recipient};
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Runtime;

/// Default request timeout for webhook calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Webhook client errors.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The configured webhook URL is unusable.
    #[error("invalid webhook URL: {reason}")]
    InvalidUrl { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to start the runtime driving requests.
    #[error("failed to initialize tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The webhook answered with a non-success status.
    #[error("webhook error: status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Slack-compatible incoming-webhook notifier.
///
/// # Thread Safety
///
/// `send` blocks the calling thread on an internal single-threaded runtime,
/// so it must not be called from within an async context. Concurrent
/// callers share the HTTP connection pool.
pub struct WebhookNotifier {
    http: reqwest::Client,
    runtime: Runtime,
    url: reqwest::Url,
}

impl fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("url", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or not http(s), or if the HTTP
    /// client or runtime fails to build.
    pub fn new(url: &str) -> Result<Self, WebhookError> {
        if url.trim().is_empty() {
            return Err(WebhookError::InvalidUrl {
                reason: "URL cannot be empty",
            });
        }
        let url = reqwest::Url::parse(url.trim()).map_err(|_| WebhookError::InvalidUrl {
            reason: "URL does not parse",
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WebhookError::InvalidUrl {
                reason: "URL must use http or https",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(WebhookError::ClientBuild)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(WebhookError::Runtime)?;

        Ok(Self { http, runtime, url })
    }

    async fn post(&self, message: &WebhookMessage) -> Result<(), WebhookError> {
        let response = self.http.post(self.url.clone()).json(message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = build_message(recipient, subject, body)?;
        self.runtime
            .block_on(self.post(&message))
            .map_err(|err| NotifyError::Delivery(Box::new(err)))?;
        tracing::debug!(recipient = recipient.label(), subject, "webhook message sent");
        Ok(())
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct WebhookMessage {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

/// Renders a message: people are mentioned in the text, bare addresses
/// become the target channel.
fn build_message(
    recipient: &Recipient,
    subject: &str,
    body: &str,
) -> Result<WebhookMessage, NotifyError> {
    match recipient {
        Recipient::Person(person) => {
            let mention = person
                .slack_handle
                .as_deref()
                .map_or_else(|| person.name.clone(), |handle| format!("<@{handle}>"));
            Ok(WebhookMessage {
                text: format!("*{subject}*\n{mention}\n{body}"),
                channel: None,
            })
        }
        Recipient::Address(address) if address.trim().is_empty() => Err(NotifyError::NoAddress {
            recipient: "empty address".to_string(),
        }),
        Recipient::Address(address) => Ok(WebhookMessage {
            text: format!("*{subject}*\n{body}"),
            channel: Some(address.clone()),
        }),
    }
}

/// Notifier that only logs. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = recipient.label(),
            subject,
            lines = body.lines().count(),
            "notification (no webhook configured)"
        );
        Ok(())
    }
}

/// Either notifier, chosen at startup from configuration.
#[derive(Debug)]
pub enum AnyNotifier {
    Webhook(Box<WebhookNotifier>),
    Log(LogNotifier),
}

impl AnyNotifier {
    /// A webhook notifier when `url` is set, the log notifier otherwise.
    pub fn from_url(url: Option<&str>) -> Result<Self, WebhookError> {
        match url {
            Some(url) => Ok(Self::Webhook(Box::new(WebhookNotifier::new(url)?))),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for AnyNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            Self::Webhook(notifier) => notifier.send(recipient, subject, body),
            Self::Log(notifier) => notifier.send(recipient, subject, body),
        }
    }
}
