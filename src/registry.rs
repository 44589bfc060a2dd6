// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory directory registry.
//!
//! Maps a registrant-chosen directory name to its forwarding endpoint.
//! Entries live for the lifetime of the process and are never removed.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The name is already registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Directory already exists: {0}")]
pub struct AlreadyExists(pub String);

/// Thread-safe directory registry.
///
/// Endpoint format is not checked here; callers validate before registering.
#[derive(Debug, Default)]
pub struct DirectoryRegistry {
    directories: RwLock<HashMap<String, String>>,
}

impl DirectoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `name` has been registered.
    pub async fn exists(&self, name: &str) -> bool {
        self.directories.read().await.contains_key(name)
    }

    /// Record `name -> endpoint` unless `name` is taken.
    ///
    /// The existence check and insert happen under one write lock, so of two
    /// racing registrations for the same name exactly one succeeds.
    pub async fn register(&self, name: &str, endpoint: &str) -> Result<(), AlreadyExists> {
        let mut directories = self.directories.write().await;
        match directories.entry(name.to_string()) {
            Entry::Occupied(_) => {
                debug!(directory = %name, "Directory name already taken");
                Err(AlreadyExists(name.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(endpoint.to_string());
                info!(directory = %name, "Directory registered");
                Ok(())
            }
        }
    }

    /// Endpoint registered for `name`, if any.
    pub async fn lookup(&self, name: &str) -> Option<String> {
        self.directories.read().await.get(name).cloned()
    }

    /// Number of registered directories.
    pub async fn len(&self) -> usize {
        self.directories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
