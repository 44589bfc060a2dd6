// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook Relay
//!
//! Validates form submissions and forwards them to webhook endpoints:
//!
//! - Direct submissions go to the operator's endpoint
//! - Visitors can register a named directory page with their own endpoint;
//!   submissions through that page go to both endpoints
//! - One accepted submission per client per cooldown (25s default)
//! - Webhook URLs restricted to an allow-listed provider prefix

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod registry;
pub mod relay;
pub mod resolver;
pub mod throttle;
pub mod validator;

pub use config::Config;
pub use error::RelayError;
pub use registry::{AlreadyExists, DirectoryRegistry};
pub use relay::RelayService;
pub use resolver::{DirectoryContext, DirectoryResolver};
pub use throttle::{SubmissionThrottle, ThrottleResult};
