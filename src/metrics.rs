// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the relay.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Relay counters, registered on a private registry.
#[derive(Clone)]
pub struct RelayMetrics {
    registry: Registry,
    pub submissions: IntCounterVec,
    pub rate_limited: IntCounter,
    pub deliveries: IntCounterVec,
    pub directories_registered: IntCounter,
    pub throttle_entries: IntGauge,
}

impl RelayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new("relay_submissions_total", "Accepted relay requests by route"),
            &["route"],
        )?;
        let rate_limited =
            IntCounter::new("relay_rate_limited_total", "Requests rejected by the throttle")?;
        let deliveries = IntCounterVec::new(
            Opts::new("relay_deliveries_total", "Outbound webhook deliveries by outcome"),
            &["outcome"],
        )?;
        let directories_registered = IntCounter::new(
            "relay_directories_registered_total",
            "Directories registered since start",
        )?;
        let throttle_entries =
            IntGauge::new("relay_throttle_entries", "Clients tracked by the throttle")?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;
        registry.register(Box::new(deliveries.clone()))?;
        registry.register(Box::new(directories_registered.clone()))?;
        registry.register(Box::new(throttle_entries.clone()))?;

        Ok(Self {
            registry,
            submissions,
            rate_limited,
            deliveries,
            directories_registered,
            throttle_entries,
        })
    }

    pub fn record_delivery(&self, ok: bool) {
        let outcome = if ok { "success" } else { "failure" };
        self.deliveries.with_label_values(&[outcome]).inc();
    }

    /// Render all metrics in the text exposition format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
