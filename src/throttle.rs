// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client submission throttle.
//!
//! Each client may have one submission accepted per cooldown period. Entries
//! are swept once they have been idle longer than the retention window.
//!
//! The client key is the peer address, which is easy to rotate; this bounds
//! accidental resubmission, it is not an abuse control.

use crate::config::ThrottleConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Result of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleResult {
    /// Submission accepted; the cooldown restarts now
    Accepted,
    /// Submission rejected
    Limited {
        /// Whole seconds until the cooldown elapses, rounded up
        retry_after_secs: u64,
    },
}

impl ThrottleResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ThrottleResult::Accepted)
    }
}

/// Thread-safe last-submission tracker.
#[derive(Debug)]
pub struct SubmissionThrottle {
    cooldown: Duration,
    retention: Duration,
    last_accepted: RwLock<HashMap<IpAddr, Instant>>,
}

impl SubmissionThrottle {
    /// Create a new throttle with the given configuration.
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            cooldown: config.cooldown(),
            retention: config.retention(),
            last_accepted: RwLock::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Accept or reject a submission from `client` at `now`.
    ///
    /// Check and update run under a single write lock.
    pub async fn try_accept(&self, client: IpAddr, now: Instant) -> ThrottleResult {
        let mut last_accepted = self.last_accepted.write().await;

        if let Some(last) = last_accepted.get(&client) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.cooldown {
                let retry_after_secs = ceil_secs(self.cooldown - elapsed);
                debug!(ip = %client, retry_after_secs, "Submission within cooldown");
                return ThrottleResult::Limited { retry_after_secs };
            }
        }

        last_accepted.insert(client, now);
        ThrottleResult::Accepted
    }

    /// Evict entries idle for longer than the retention window.
    ///
    /// Retention is never shorter than the cooldown, so an entry still in its
    /// cooldown is never evicted. Returns the number of entries removed.
    pub async fn sweep(&self, now: Instant) -> usize {
        let mut last_accepted = self.last_accepted.write().await;
        let before = last_accepted.len();
        last_accepted.retain(|_, last| now.saturating_duration_since(*last) <= self.retention);
        let removed = before - last_accepted.len();
        if removed > 0 {
            info!(removed, remaining = last_accepted.len(), "Swept throttle entries");
        }
        removed
    }

    /// Number of tracked clients.
    pub async fn len(&self) -> usize {
        self.last_accepted.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn ceil_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_nanos().div_ceil(1_000_000_000);
    u64::try_from(secs).unwrap_or(u64::MAX)
}
