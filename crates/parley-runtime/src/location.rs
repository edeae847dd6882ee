// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Backing collaborator for `LoopCapabilities::lookup_location` (§4.7).
use async_trait::async_trait;
use parley_model::Location;

#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// Resolve a named place (e.g. a search string typed by the user, or
    /// `"here"`/`"home"`/`"work"`) to coordinates. Returns `None` when the
    /// resolver has no opinion and the loop should fall back to asking.
    async fn resolve(&self, query: &str) -> anyhow::Result<Option<Location>>;
}

/// Resolves a fixed set of named places (home/work/here) plus whatever an
/// operator seeds it with; returns `None` for anything else so the caller
/// falls back to `LoopCapabilities::ask`.
#[derive(Debug, Default)]
pub struct StaticLocationResolver {
    places: std::collections::HashMap<String, Location>,
}

impl StaticLocationResolver {
    pub fn new(places: std::collections::HashMap<String, Location>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl LocationResolver for StaticLocationResolver {
    async fn resolve(&self, query: &str) -> anyhow::Result<Option<Location>> {
        Ok(self.places.get(&query.trim().to_lowercase()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_place() {
        let mut places = std::collections::HashMap::new();
        places.insert("home".to_string(), Location { display: "Home".into(), latitude: 1.0, longitude: 2.0 });
        let resolver = StaticLocationResolver::new(places);
        let loc = resolver.resolve("Home").await.unwrap();
        assert_eq!(loc.unwrap().display, "Home");
    }

    #[tokio::test]
    async fn unknown_place_returns_none() {
        let resolver = StaticLocationResolver::default();
        assert!(resolver.resolve("atlantis").await.unwrap().is_none());
    }
}
