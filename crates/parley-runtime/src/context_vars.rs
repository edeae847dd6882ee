// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Backing collaborator for `LoopCapabilities::resolve_user_context`
//! (§4.7): resolves `$context.*` variables (home/work locations,
//! morning/evening times) against the persisted preference store (§6),
//! falling back to asking the user and, when `save_to_context` is set,
//! writing the answer back so it isn't asked again.
use std::sync::Arc;

use parley_config::{PreferenceStore, KEY_CONTEXT_EVENING, KEY_CONTEXT_HOME, KEY_CONTEXT_MORNING, KEY_CONTEXT_WORK};

/// Maps a `$context.*` variable name to its persisted-preference key.
/// Returns `None` for variables this resolver doesn't recognize, in which
/// case the caller should fall back to some other resolution strategy
/// (the loop, in practice, falls back to `ask`).
pub fn preference_key_for(var_name: &str) -> Option<&'static str> {
    match var_name {
        "$context.location.home" => Some(KEY_CONTEXT_HOME),
        "$context.location.work" => Some(KEY_CONTEXT_WORK),
        "$context.time.morning" => Some(KEY_CONTEXT_MORNING),
        "$context.time.evening" => Some(KEY_CONTEXT_EVENING),
        _ => None,
    }
}

pub struct ContextVarResolver {
    prefs: Arc<dyn PreferenceStore>,
}

impl ContextVarResolver {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Returns the previously-saved value for a recognized `$context.*`
    /// variable, or `Ok(None)` if it's unrecognized or never saved.
    pub async fn lookup(&self, var_name: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let Some(key) = preference_key_for(var_name) else {
            return Ok(None);
        };
        self.prefs.get(key).await
    }

    pub async fn save(&self, var_name: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let Some(key) = preference_key_for(var_name) else {
            anyhow::bail!("unrecognized context variable: {var_name}");
        };
        self.prefs.set(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::InMemoryPreferenceStore;

    #[test]
    fn maps_known_variables() {
        assert_eq!(preference_key_for("$context.location.home"), Some(KEY_CONTEXT_HOME));
        assert_eq!(preference_key_for("$context.time.evening"), Some(KEY_CONTEXT_EVENING));
        assert_eq!(preference_key_for("$context.unknown"), None);
    }

    #[tokio::test]
    async fn save_then_lookup_round_trips() {
        let resolver = ContextVarResolver::new(Arc::new(InMemoryPreferenceStore::default()));
        resolver.save("$context.location.work", serde_json::json!("Acme HQ")).await.unwrap();
        let found = resolver.lookup("$context.location.work").await.unwrap();
        assert_eq!(found, Some(serde_json::json!("Acme HQ")));
    }

    #[tokio::test]
    async fn lookup_unset_variable_returns_none() {
        let resolver = ContextVarResolver::new(Arc::new(InMemoryPreferenceStore::default()));
        assert_eq!(resolver.lookup("$context.location.home").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_unrecognized_variable_errors() {
        let resolver = ContextVarResolver::new(Arc::new(InMemoryPreferenceStore::default()));
        assert!(resolver.save("$context.bogus", serde_json::json!(1)).await.is_err());
    }
}
