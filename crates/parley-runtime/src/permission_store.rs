// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Installed permission rules backing the "always allow" branch of the
//! five-option consent card (§4.4.7): once a user grants a program
//! permanently (optionally narrowed with an only-if filter), future
//! identical requests skip the card entirely.
use std::sync::RwLock;

use regex::Regex;

/// A conjunctive filter over a program's JSON parameters: every `(path,
/// pattern)` pair must match for the rule to apply. `path` is a flat key
/// into the top-level object (e.g. `"recipient"`); `pattern` is a glob
/// matched against the stringified value.
#[derive(Debug, Clone)]
pub struct ProgramFilter {
    pub path: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone)]
pub struct PermissionRule {
    pub source_pattern: String,
    pub identity_pattern: String,
    pub filters: Vec<ProgramFilter>,
    pub decision: Decision,
}

/// Thread-safe store of installed rules, consulted by
/// `LoopCapabilities::ask_for_permission` before presenting the consent
/// card. First matching rule wins, in insertion order.
#[derive(Debug, Default)]
pub struct PermissionStore {
    rules: RwLock<Vec<PermissionRule>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, rule: PermissionRule) {
        self.rules.write().unwrap().push(rule);
    }

    /// Remove every rule exactly matching `source`/`identity`, used when a
    /// user revokes a previously granted permission.
    pub fn revoke(&self, source: &str, identity: &str) {
        self.rules.write().unwrap().retain(|r| !(r.source_pattern == source && r.identity_pattern == identity));
    }

    /// Look up a stored decision for this source/identity/program triple.
    /// Returns `None` when no installed rule applies, meaning the caller
    /// must fall back to the interactive consent card.
    pub fn evaluate(&self, source: &str, identity: &str, program: &serde_json::Value) -> Option<Decision> {
        let rules = self.rules.read().unwrap();
        rules
            .iter()
            .find(|rule| {
                glob_match(&rule.source_pattern, source)
                    && glob_match(&rule.identity_pattern, identity)
                    && rule.filters.iter().all(|f| filter_matches(f, program))
            })
            .map(|rule| rule.decision)
    }
}

fn filter_matches(filter: &ProgramFilter, program: &serde_json::Value) -> bool {
    let Some(value) = program.get(&filter.path) else {
        return false;
    };
    let as_string = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    glob_match(&filter.pattern, &as_string)
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    glob_to_regex(pattern).map(|re| re.is_match(candidate)).unwrap_or(false)
}

/// Only `*` (match anything) and `?` (match one char) are supported, as
/// is sufficient for principal and parameter filters.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_rule_returns_none() {
        let store = PermissionStore::new();
        assert_eq!(store.evaluate("com.example.skill", "alice", &serde_json::json!({})), None);
    }

    #[test]
    fn wildcard_source_rule_matches() {
        let store = PermissionStore::new();
        store.install(PermissionRule {
            source_pattern: "com.example.*".into(),
            identity_pattern: "*".into(),
            filters: vec![],
            decision: Decision::Allow,
        });
        assert_eq!(store.evaluate("com.example.skill", "alice", &serde_json::json!({})), Some(Decision::Allow));
    }

    #[test]
    fn only_if_filter_narrows_the_rule() {
        let store = PermissionStore::new();
        store.install(PermissionRule {
            source_pattern: "*".into(),
            identity_pattern: "*".into(),
            filters: vec![ProgramFilter { path: "recipient".into(), pattern: "alice".into() }],
            decision: Decision::Allow,
        });
        assert_eq!(store.evaluate("x", "y", &serde_json::json!({"recipient": "alice"})), Some(Decision::Allow));
        assert_eq!(store.evaluate("x", "y", &serde_json::json!({"recipient": "bob"})), None);
    }

    #[test]
    fn revoke_removes_matching_rule() {
        let store = PermissionStore::new();
        store.install(PermissionRule {
            source_pattern: "src".into(),
            identity_pattern: "id".into(),
            filters: vec![],
            decision: Decision::Deny,
        });
        store.revoke("src", "id");
        assert_eq!(store.evaluate("src", "id", &serde_json::json!({})), None);
    }

    #[test]
    fn first_matching_rule_wins() {
        let store = PermissionStore::new();
        store.install(PermissionRule { source_pattern: "*".into(), identity_pattern: "*".into(), filters: vec![], decision: Decision::Deny });
        store.install(PermissionRule { source_pattern: "*".into(), identity_pattern: "*".into(), filters: vec![], decision: Decision::Allow });
        assert_eq!(store.evaluate("x", "y", &serde_json::json!({})), Some(Decision::Deny));
    }
}
