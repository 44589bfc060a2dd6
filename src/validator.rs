// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Submission and registration validator.
//!
//! Implements the shared input schema:
//! - Webhook URLs restricted to the allow-listed provider prefix
//! - Message length bounds
//! - Directory name charset and reserved path segments

use crate::models::{Submission, SubmissionRequest};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Longest accepted directory name, in characters.
pub const MAX_DIRECTORY_NAME_CHARS: usize = 64;

/// Path segments owned by the service's own routing.
pub const RESERVED_SEGMENTS: &[&str] = &["api", "assets", "_app", "metrics", "health", "healthz"];

const ALLOWED_WEBHOOK_PREFIXES: &[&str] = &[
    "https://discord.com/api/webhooks/",
    "https://discordapp.com/api/webhooks/",
];

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required")]
    Missing,

    #[error("Must be a valid Discord webhook URL")]
    InvalidWebhookUrl,

    #[error("Message is required")]
    MessageRequired,

    #[error("Message too long")]
    MessageTooLong { length: usize },

    #[error("Directory name may only contain letters, digits, '-' and '_' (max 64)")]
    InvalidDirectoryName,

    #[error("This directory name is reserved")]
    ReservedDirectoryName,
}

/// A validation error tagged with the offending field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
    #[serde(skip)]
    pub kind: ValidationError,
}

impl FieldError {
    pub fn new(field: &'static str, kind: ValidationError) -> Self {
        Self {
            field,
            message: kind.to_string(),
            kind,
        }
    }
}

/// True iff `url` is an absolute URL under an allow-listed webhook prefix.
pub fn is_allowed_webhook(url: &str) -> bool {
    if !ALLOWED_WEBHOOK_PREFIXES.iter().any(|p| url.starts_with(p)) {
        return false;
    }
    Url::parse(url).is_ok()
}

/// True iff `segment` belongs to the service's own routing.
pub fn is_reserved_segment(segment: &str) -> bool {
    RESERVED_SEGMENTS.contains(&segment)
}

/// Validate a submission body, collecting every field error.
pub fn validate_submission(req: &SubmissionRequest) -> Result<Submission, Vec<FieldError>> {
    let mut errors = Vec::new();

    match req.source_url.as_deref() {
        None => errors.push(FieldError::new("sourceUrl", ValidationError::Missing)),
        Some(url) if !is_allowed_webhook(url) => {
            debug!(source_url = %url, "Source URL not allowed");
            errors.push(FieldError::new("sourceUrl", ValidationError::InvalidWebhookUrl));
        }
        Some(_) => {}
    }

    match req.message.as_deref() {
        None => errors.push(FieldError::new("message", ValidationError::Missing)),
        Some(message) => {
            if let Err(kind) = validate_message(message) {
                errors.push(FieldError::new("message", kind));
            }
        }
    }

    match (&req.source_url, &req.message) {
        (Some(source_url), Some(message)) if errors.is_empty() => Ok(Submission {
            source_url: source_url.clone(),
            message: message.clone(),
        }),
        _ => Err(errors),
    }
}

/// Validate message length bounds.
pub fn validate_message(message: &str) -> Result<(), ValidationError> {
    let length = message.chars().count();
    if length == 0 {
        Err(ValidationError::MessageRequired)
    } else if length > MAX_MESSAGE_CHARS {
        Err(ValidationError::MessageTooLong { length })
    } else {
        Ok(())
    }
}

/// Validate a directory name chosen by a registrant.
pub fn validate_directory_name(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length == 0
        || length > MAX_DIRECTORY_NAME_CHARS
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidDirectoryName);
    }
    if is_reserved_segment(name) {
        return Err(ValidationError::ReservedDirectoryName);
    }
    Ok(())
}
