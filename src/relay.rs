// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission relay.
//!
//! Owns the directory registry, the submission throttle and the outbound
//! notifier. Every operation passes the throttle before it looks at input.

use crate::config::Config;
use crate::error::{DeliveryContext, RelayError, Result};
use crate::metrics::RelayMetrics;
use crate::models::{Ack, RegistrationRequest, RegistrationResult, SubmissionRequest};
use crate::notifier::{Notice, Notifier};
use crate::registry::DirectoryRegistry;
use crate::throttle::{SubmissionThrottle, ThrottleResult};
use crate::validator::{is_allowed_webhook, validate_directory_name, validate_submission};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The relay service shared by all request handlers.
pub struct RelayService {
    operator_endpoint: String,
    registry: Arc<DirectoryRegistry>,
    throttle: SubmissionThrottle,
    notifier: Arc<dyn Notifier>,
    metrics: RelayMetrics,
}

impl RelayService {
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>, metrics: RelayMetrics) -> Self {
        Self {
            operator_endpoint: config.operator_webhook_url.clone(),
            registry: Arc::new(DirectoryRegistry::new()),
            throttle: SubmissionThrottle::new(&config.throttle),
            notifier,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<DirectoryRegistry> {
        &self.registry
    }

    pub fn throttle(&self) -> &SubmissionThrottle {
        &self.throttle
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Relay a submission to the operator endpoint.
    pub async fn submit_direct(&self, client: IpAddr, req: &SubmissionRequest) -> Result<Ack> {
        self.admit(client, "direct").await?;
        let submission = validate_submission(req).map_err(RelayError::invalid_fields)?;

        self.deliver(
            &self.operator_endpoint,
            Notice::Direct(&submission),
            DeliveryContext::Forward,
        )
        .await?;

        debug!(ip = %client, "Direct submission relayed");
        Ok(Ack::ok())
    }

    /// Relay a submission made through a directory page.
    ///
    /// The directory owner is notified when the directory is registered; the
    /// operator is notified either way.
    pub async fn submit_via_directory(
        &self,
        client: IpAddr,
        directory: &str,
        req: &SubmissionRequest,
    ) -> Result<Ack> {
        self.admit(client, "directory").await?;
        let submission = validate_submission(req).map_err(RelayError::invalid_fields)?;

        match self.registry.lookup(directory).await {
            Some(owner) => {
                self.deliver(
                    &owner,
                    Notice::DirectoryOwner {
                        directory,
                        submission: &submission,
                    },
                    DeliveryContext::Forward,
                )
                .await?;
            }
            None => debug!(directory = %directory, "Directory not registered, operator only"),
        }

        self.deliver(
            &self.operator_endpoint,
            Notice::DirectoryOperator {
                directory,
                submission: &submission,
            },
            DeliveryContext::Forward,
        )
        .await?;

        Ok(Ack::ok())
    }

    /// Register a directory and confirm to its endpoint.
    ///
    /// `page_base` is the origin the page URL is built on. A failed
    /// confirmation is reported but the directory stays registered.
    pub async fn register_directory(
        &self,
        client: IpAddr,
        req: &RegistrationRequest,
        page_base: &str,
    ) -> Result<RegistrationResult> {
        self.admit(client, "register").await?;

        let (name, endpoint) = match (req.directory_name.as_deref(), req.webhook.as_deref()) {
            (Some(name), Some(endpoint)) if !name.is_empty() && !endpoint.is_empty() => {
                (name, endpoint)
            }
            _ => {
                return Err(RelayError::invalid(
                    "Directory name and webhook URL are required",
                ))
            }
        };

        if !is_allowed_webhook(endpoint) {
            return Err(RelayError::invalid("Must be a valid Discord webhook URL"));
        }
        validate_directory_name(name).map_err(|e| RelayError::invalid(e.to_string()))?;

        self.registry
            .register(name, endpoint)
            .await
            .map_err(|_| RelayError::AlreadyExists)?;
        self.metrics.directories_registered.inc();

        let url = format!("{}/{}", page_base.trim_end_matches('/'), name);
        info!(directory = %name, url = %url, "Directory created");

        self.deliver(
            endpoint,
            Notice::Confirmation { url: &url },
            DeliveryContext::Confirmation,
        )
        .await?;

        Ok(RegistrationResult {
            name: name.to_string(),
            url,
        })
    }

    /// Sweep idle throttle entries.
    pub async fn sweep(&self, now: Instant) -> usize {
        let removed = self.throttle.sweep(now).await;
        let remaining = self.throttle.len().await;
        self.metrics
            .throttle_entries
            .set(i64::try_from(remaining).unwrap_or(i64::MAX));
        removed
    }

    async fn admit(&self, client: IpAddr, route: &'static str) -> Result<()> {
        match self.throttle.try_accept(client, Instant::now()).await {
            ThrottleResult::Accepted => {
                self.metrics.submissions.with_label_values(&[route]).inc();
                Ok(())
            }
            ThrottleResult::Limited { retry_after_secs } => {
                warn!(ip = %client, route, retry_after_secs, "Request rate limited");
                self.metrics.rate_limited.inc();
                Err(RelayError::RateLimited { retry_after_secs })
            }
        }
    }

    async fn deliver(
        &self,
        endpoint: &str,
        notice: Notice<'_>,
        context: DeliveryContext,
    ) -> Result<()> {
        let message = notice.render();
        let outcome = self.notifier.send(endpoint, &message).await;
        self.metrics.record_delivery(outcome.is_ok());

        outcome.map_err(|e| {
            warn!(error = %e, "Webhook delivery failed");
            RelayError::DeliveryFailed {
                context,
                error: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingNotifier;
    use std::net::Ipv4Addr;

    const OPERATOR: &str = "https://discord.com/api/webhooks/1/operator";
    const OWNER: &str = "https://discordapp.com/api/webhooks/2/owner";
    const SOURCE: &str = "https://discord.com/api/webhooks/3/source";

    fn service() -> (RelayService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = RelayService::new(
            &Config::with_operator(OPERATOR),
            notifier.clone(),
            RelayMetrics::new().unwrap(),
        );
        (service, notifier)
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 0, last))
    }

    fn submission(source_url: &str, message: &str) -> SubmissionRequest {
        SubmissionRequest {
            source_url: Some(source_url.to_string()),
            message: Some(message.to_string()),
        }
    }

    fn registration(name: &str, webhook: &str) -> RegistrationRequest {
        RegistrationRequest {
            directory_name: Some(name.to_string()),
            webhook: Some(webhook.to_string()),
        }
    }

    #[tokio::test]
    async fn test_submit_direct_notifies_operator_once() {
        let (service, notifier) = service();

        let ack = service
            .submit_direct(ip(1), &submission(SOURCE, "hello"))
            .await
            .unwrap();

        assert!(ack.success);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, OPERATOR);
        assert!(sent[0].1.content.contains(SOURCE));
        assert!(sent[0].1.content.contains("hello"));
    }

    #[tokio::test]
    async fn test_disallowed_url_rejected_before_any_send() {
        let (service, notifier) = service();

        let err = service
            .submit_direct(ip(1), &submission("https://evil.example.com/hook", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::InvalidInput { ref errors, .. } if errors[0].field == "sourceUrl"));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_throttle_short_circuits_before_validation() {
        let (service, notifier) = service();
        service
            .submit_direct(ip(1), &submission(SOURCE, "first"))
            .await
            .unwrap();

        // Invalid body, but the throttle answers first
        let err = service
            .submit_direct(ip(1), &SubmissionRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::RateLimited { retry_after_secs } if retry_after_secs > 0));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_directory_submission_notifies_owner_and_operator() {
        let (service, notifier) = service();
        service
            .register_directory(ip(1), &registration("promo", OWNER), "https://relay.example.org")
            .await
            .unwrap();

        service
            .submit_via_directory(ip(2), "promo", &submission(SOURCE, "hi"))
            .await
            .unwrap();

        let owner = notifier.sent_to(OWNER);
        assert_eq!(owner.len(), 2, "confirmation plus submission");
        assert!(owner[1].content.contains("via your page /promo"));

        let operator = notifier.sent_to(OPERATOR);
        assert_eq!(operator.len(), 1);
        assert!(operator[0].content.contains("via page /promo"));
    }

    #[tokio::test]
    async fn test_unregistered_directory_still_notifies_operator() {
        let (service, notifier) = service();

        service
            .submit_via_directory(ip(1), "ghost", &submission(SOURCE, "hi"))
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, OPERATOR);
        assert!(!service.registry().exists("ghost").await);
    }

    #[tokio::test]
    async fn test_owner_failure_reported() {
        let (service, notifier) = service();
        service
            .register_directory(ip(1), &registration("promo", OWNER), "https://relay.example.org")
            .await
            .unwrap();
        notifier.fail_on(OWNER);

        let err = service
            .submit_via_directory(ip(2), "promo", &submission(SOURCE, "hi"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::DeliveryFailed {
                context: DeliveryContext::Forward,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_register_returns_page_url_and_confirms() {
        let (service, notifier) = service();

        let result = service
            .register_directory(ip(1), &registration("promo", OWNER), "https://relay.example.org/")
            .await
            .unwrap();

        assert_eq!(result.url, "https://relay.example.org/promo");
        let confirmations = notifier.sent_to(OWNER);
        assert_eq!(confirmations.len(), 1);
        assert!(confirmations[0].content.contains("https://relay.example.org/promo"));
        assert_eq!(
            service.registry().lookup("promo").await.as_deref(),
            Some(OWNER)
        );
    }

    #[tokio::test]
    async fn test_name_taken_contacts_nobody() {
        let (service, notifier) = service();
        service
            .register_directory(ip(1), &registration("promo", OWNER), "https://r")
            .await
            .unwrap();

        let other = "https://discord.com/api/webhooks/9/other";
        let err = service
            .register_directory(ip(2), &registration("promo", other), "https://r")
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::AlreadyExists));
        assert!(notifier.sent_to(other).is_empty());
        assert_eq!(service.registry().lookup("promo").await.as_deref(), Some(OWNER));
    }

    #[tokio::test]
    async fn test_failed_confirmation_keeps_registration() {
        let (service, notifier) = service();
        notifier.fail_on(OWNER);

        let err = service
            .register_directory(ip(1), &registration("promo", OWNER), "https://r")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RelayError::DeliveryFailed {
                context: DeliveryContext::Confirmation,
                ..
            }
        ));
        assert!(service.registry().exists("promo").await);
    }

    #[tokio::test]
    async fn test_registration_input_checks() {
        let (service, notifier) = service();

        let missing = service
            .register_directory(ip(1), &RegistrationRequest::default(), "https://r")
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "Directory name and webhook URL are required");

        let bad_hook = service
            .register_directory(
                ip(2),
                &registration("promo", "https://evil.example.com/hook"),
                "https://r",
            )
            .await
            .unwrap_err();
        assert_eq!(bad_hook.to_string(), "Must be a valid Discord webhook URL");

        let reserved = service
            .register_directory(ip(3), &registration("api", OWNER), "https://r")
            .await
            .unwrap_err();
        assert!(matches!(reserved, RelayError::InvalidInput { .. }));

        assert!(notifier.sent().is_empty());
        assert!(service.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_updates_gauge() {
        let (service, _) = service();
        service
            .submit_direct(ip(1), &submission(SOURCE, "hi"))
            .await
            .unwrap();

        assert_eq!(service.sweep(Instant::now()).await, 0);
        assert_eq!(service.metrics().throttle_entries.get(), 1);
    }
}
