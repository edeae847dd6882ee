// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
mod loader;
mod prefs;
mod schema;

pub use loader::load;
pub use prefs::{
    InMemoryPreferenceStore, JsonFilePreferenceStore, PreferenceStore, KEY_CONTEXT_EVENING,
    KEY_CONTEXT_HOME, KEY_CONTEXT_MORNING, KEY_CONTEXT_WORK, KEY_INITIALIZED,
    KEY_PREFERRED_TEMPERATURE,
};
pub use schema::{Config, HandlersConfig, LocaleConfig, PermissionsConfig, RuleBuilderConfig, SessionConfig};
