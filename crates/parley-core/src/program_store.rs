// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Installed standing rules and remote programs (§4.4.6, §4.4.8): once the
//! formal-program handler finishes a non-one-shot program, it has to land
//! somewhere retrievable instead of being computed and dropped. Mirrors
//! `parley_runtime::PermissionStore`'s shape: an in-memory `Vec` behind a
//! lock, append-only from the handler's point of view.
use std::sync::RwLock;

use crate::program::ProgramAst;

/// One program that outlived its single turn: a local standing rule
/// (`principal: None`) from the rule builder (§4.4.6), or one half of a
/// remote split (§4.4.8) — the local monitor or the program sent to
/// `principal` for it to run.
#[derive(Debug, Clone)]
pub struct InstalledProgram {
    pub principal: Option<String>,
    pub ast: ProgramAst,
}

/// Thread-safe store of installed programs. Nothing currently evaluates
/// against it the way `PermissionStore` evaluates incoming requests against
/// its rules — there's no trigger/notify runtime in scope (§1) — so this is
/// intentionally just an append-and-list store, kept so installed programs
/// are retrievable (e.g. for `/state` introspection or a future notify
/// runtime) instead of being silently discarded.
#[derive(Debug, Default)]
pub struct ProgramStore {
    installed: RwLock<Vec<InstalledProgram>>,
}

impl ProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, principal: Option<String>, ast: ProgramAst) {
        self.installed.write().expect("program store poisoned").push(InstalledProgram { principal, ast });
    }

    /// Snapshot of every installed program, in installation order.
    pub fn installed(&self) -> Vec<InstalledProgram> {
        self.installed.read().expect("program store poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.installed.read().expect("program store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installing_a_local_standing_rule_is_retrievable() {
        let store = ProgramStore::new();
        store.install(None, ProgramAst::new("com.xkcd.get_comic"));
        let installed = store.installed();
        assert_eq!(installed.len(), 1);
        assert!(installed[0].principal.is_none());
        assert_eq!(installed[0].ast.function_name, "com.xkcd.get_comic");
    }

    #[test]
    fn installing_a_remote_split_keeps_both_halves_in_order() {
        let store = ProgramStore::new();
        store.install(None, ProgramAst::new("com.xkcd.get_comic.receive"));
        store.install(Some("alice".into()), ProgramAst::new("com.xkcd.get_comic"));
        assert_eq!(store.len(), 2);
        let installed = store.installed();
        assert!(installed[0].principal.is_none());
        assert_eq!(installed[1].principal.as_deref(), Some("alice"));
    }

    #[test]
    fn empty_store_reports_empty() {
        let store = ProgramStore::new();
        assert!(store.is_empty());
    }
}
