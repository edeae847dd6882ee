// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_page_size() -> usize {
    5
}

fn default_compaction_threshold() -> f32 {
    0.8
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub handlers: HandlersConfig,
    #[serde(default)]
    pub rulebuilder: RuleBuilderConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Locale, timezone, and unit defaults a handler's formatter (C9) draws on
/// (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub locale: String,
    pub timezone: String,
    pub temperature_unit: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self { locale: "en-US".into(), timezone: "America/Los_Angeles".into(), temperature_unit: "F".into() }
    }
}

/// Which FAQ/skill handler ids are active for a session and their relative
/// priority (§4.5, §4.6 R4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlersConfig {
    pub faq_priority: i32,
    pub skill_priority: i32,
    pub formal_priority: i32,
}

/// Pagination knobs for the `makerule` rule builder's "more" paging (§4.4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleBuilderConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for RuleBuilderConfig {
    fn default() -> Self {
        Self { page_size: default_page_size() }
    }
}

/// Defaults for the permission consent card (§4.4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default = "default_true")]
    pub remember_decisions: bool,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self { remember_decisions: true }
    }
}

/// Session-scope knobs not named by the protocol but needed by any real
/// deployment: an inactivity timeout an external caller can use to invoke
/// `reset()` (§5 Timeouts), and the near-limit threshold for proactive
/// compaction-style housekeeping a long session might need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub inactivity_timeout_secs: Option<u64>,
    #[serde(default = "default_compaction_threshold")]
    pub near_limit_threshold: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { inactivity_timeout_secs: Some(300), near_limit_threshold: default_compaction_threshold() }
    }
}
