// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Persisted key/value state (§6): onboarding flags, resolved context
//! variables (home/work locations, morning/evening times), and learned
//! preferences such as a preferred temperature unit. Distinct from
//! `Config` (operator-supplied, read-mostly) — this store is written by
//! the dialogue loop itself as it learns things about the user.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

pub const KEY_INITIALIZED: &str = "parley-initialized";
pub const KEY_CONTEXT_HOME: &str = "context-$context.location.home";
pub const KEY_CONTEXT_WORK: &str = "context-$context.location.work";
pub const KEY_CONTEXT_MORNING: &str = "context-$context.time.morning";
pub const KEY_CONTEXT_EVENING: &str = "context-$context.time.evening";
pub const KEY_PREFERRED_TEMPERATURE: &str = "preferred-temperature";

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Process-lifetime store, useful for tests and for a CLI shell run with
/// no `--state-dir`.
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    values: RwLock<HashMap<String, Value>>,
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.values.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.values.write().unwrap().remove(key);
        Ok(())
    }
}

/// Flat JSON-file-backed store. Reads the whole file on `get`/`set` —
/// adequate for the handful of keys this protocol persists, and it keeps
/// the on-disk format legible for operators inspecting `state.json` by
/// hand.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, Value>>,
}

impl JsonFilePreferenceStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let cache = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, cache: RwLock::new(cache) })
    }

    fn flush(&self) -> anyhow::Result<()> {
        let snapshot = self.cache.read().unwrap();
        let text = serde_json::to_string_pretty(&*snapshot)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.cache.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.cache.write().unwrap().insert(key.to_string(), value);
        self.flush()
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.cache.write().unwrap().remove(key);
        self.flush()
    }
}
