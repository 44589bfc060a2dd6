// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Directory page resolution and shell injection.

use crate::registry::DirectoryRegistry;
use crate::validator::is_reserved_segment;
use std::sync::Arc;

/// Default submission route referenced by the application shell.
pub const DEFAULT_SUBMIT_PATH: &str = "/api/webhook";

/// A resolved directory page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryContext {
    pub name: String,
}

impl DirectoryContext {
    /// Submission route for this directory.
    pub fn submit_path(&self) -> String {
        format!("/api/{}/webhook", self.name)
    }

    /// Inject this directory into the application shell.
    ///
    /// The first `<title>` element becomes `{site_title} - {name}` and every
    /// reference to the default submission route is pointed at this
    /// directory's route.
    pub fn inject(&self, shell: &str, site_title: &str) -> String {
        let titled = replace_title(shell, &format!("{} - {}", site_title, self.name));
        titled.replace(DEFAULT_SUBMIT_PATH, &self.submit_path())
    }
}

fn replace_title(html: &str, title: &str) -> String {
    const OPEN: &str = "<title>";
    const CLOSE: &str = "</title>";

    let Some(start) = html.find(OPEN) else {
        return html.to_string();
    };
    let Some(len) = html[start..].find(CLOSE) else {
        return html.to_string();
    };
    let end = start + len + CLOSE.len();
    format!("{}{OPEN}{title}{CLOSE}{}", &html[..start], &html[end..])
}

/// Maps the first path segment of a request to a directory.
#[derive(Clone)]
pub struct DirectoryResolver {
    registry: Arc<DirectoryRegistry>,
}

impl DirectoryResolver {
    pub fn new(registry: Arc<DirectoryRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve `segment` iff it is a registered, non-reserved directory.
    ///
    /// Read-only: resolution never creates a registry entry.
    pub async fn resolve(&self, segment: &str) -> Option<DirectoryContext> {
        if is_reserved_segment(segment) {
            return None;
        }
        self.registry
            .exists(segment)
            .await
            .then(|| DirectoryContext {
                name: segment.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHELL: &str = "<html><head><title>Relay</title></head>\
        <body><script>fetch(\"/api/webhook\")</script></body></html>";

    #[tokio::test]
    async fn test_resolves_registered_directory() {
        let registry = Arc::new(DirectoryRegistry::new());
        registry.register("promo", "https://e").await.unwrap();
        let resolver = DirectoryResolver::new(registry);

        assert_eq!(
            resolver.resolve("promo").await,
            Some(DirectoryContext {
                name: "promo".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unregistered_does_not_register() {
        let registry = Arc::new(DirectoryRegistry::new());
        let resolver = DirectoryResolver::new(registry.clone());

        assert_eq!(resolver.resolve("nobody").await, None);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_reserved_segments_never_resolve() {
        let registry = Arc::new(DirectoryRegistry::new());
        // Registered behind the validator's back
        registry.register("assets", "https://e").await.unwrap();
        let resolver = DirectoryResolver::new(registry);

        assert_eq!(resolver.resolve("assets").await, None);
        assert_eq!(resolver.resolve("api").await, None);
    }

    #[test]
    fn test_inject_rewrites_title_and_route() {
        let ctx = DirectoryContext {
            name: "promo".to_string(),
        };
        let html = ctx.inject(SHELL, "Webhook Relay");

        assert!(html.contains("<title>Webhook Relay - promo</title>"));
        assert!(html.contains("fetch(\"/api/promo/webhook\")"));
        assert!(!html.contains("\"/api/webhook\""));
    }

    #[test]
    fn test_inject_without_title() {
        let ctx = DirectoryContext {
            name: "promo".to_string(),
        };
        assert_eq!(ctx.inject("<p>/api/webhook</p>", "T"), "<p>/api/promo/webhook</p>");
    }
}
