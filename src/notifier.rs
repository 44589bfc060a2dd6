// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound webhook notifications.
//!
//! Messages are POSTed as `{ "content": "..." }`. A single attempt is made;
//! a transport error or non-success status is a delivery failure.

use crate::models::Submission;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Provider limit on message content, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Delivery error types.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status code {0}")]
    Status(u16),

    #[error("{0}")]
    Rejected(String),
}

/// Webhook request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub content: String,
}

/// The notifications the relay sends.
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    /// Direct submission, to the operator
    Direct(&'a Submission),
    /// Submission through a directory page, to the directory owner
    DirectoryOwner {
        directory: &'a str,
        submission: &'a Submission,
    },
    /// Submission through a directory page, to the operator
    DirectoryOperator {
        directory: &'a str,
        submission: &'a Submission,
    },
    /// Registration confirmation, to the new directory owner
    Confirmation { url: &'a str },
}

impl Notice<'_> {
    /// Render the notice into a webhook message.
    pub fn render(&self) -> WebhookMessage {
        let content = match self {
            Notice::Direct(submission) => {
                format!("New submission\n\n{}", submission_lines(submission))
            }
            Notice::DirectoryOwner {
                directory,
                submission,
            } => format!(
                "New submission via your page /{directory}\n\n{}",
                submission_lines(submission)
            ),
            Notice::DirectoryOperator {
                directory,
                submission,
            } => format!(
                "New submission via page /{directory}\n\n{}",
                submission_lines(submission)
            ),
            Notice::Confirmation { url } => format!(
                "Your page is ready: {url}\n\
                 Submissions made through it are forwarded to this webhook \
                 and to the site operator."
            ),
        };
        WebhookMessage {
            content: truncate_chars(content, MAX_CONTENT_CHARS),
        }
    }
}

fn submission_lines(submission: &Submission) -> String {
    format!(
        "Source URL: {}\nMessage: {}",
        submission.source_url, submission.message
    )
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text,
        Some(_) => {
            let mut truncated: String = text.chars().take(max - 1).collect();
            truncated.push('…');
            truncated
        }
    }
}

/// Sends a message to a webhook endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, endpoint: &str, message: &WebhookMessage) -> Result<(), DeliveryError>;
}

/// `reqwest`-backed notifier.
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    /// Create a notifier whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("webhook-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, endpoint: &str, message: &WebhookMessage) -> Result<(), DeliveryError> {
        let response = self.client.post(endpoint).json(message).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Webhook delivered");
            Ok(())
        } else {
            warn!(status = status.as_u16(), "Webhook rejected delivery");
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

/// In-memory notifier that records every delivery.
///
/// Used by tests to observe outbound traffic without a network.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, WebhookMessage)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `endpoint` fail.
    pub fn fail_on(&self, endpoint: &str) {
        lock(&self.failing).insert(endpoint.to_string());
    }

    /// Deliveries recorded so far, in order.
    pub fn sent(&self) -> Vec<(String, WebhookMessage)> {
        lock(&self.sent).clone()
    }

    /// Deliveries recorded for `endpoint`.
    pub fn sent_to(&self, endpoint: &str) -> Vec<WebhookMessage> {
        lock(&self.sent)
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, endpoint: &str, message: &WebhookMessage) -> Result<(), DeliveryError> {
        if lock(&self.failing).contains(endpoint) {
            return Err(DeliveryError::Rejected(format!(
                "delivery to {endpoint} refused"
            )));
        }
        lock(&self.sent).push((endpoint.to_string(), message.clone()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
