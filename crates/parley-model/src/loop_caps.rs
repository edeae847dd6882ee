// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DialogueError;
use crate::input::UserInput;
use crate::message::ReplyMessage;
use crate::value::ValueCategory;

/// A contact record returned by `lookup_contact` (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub display_name: String,
    pub value: String,
    pub kind: String,
}

/// A resolved location returned by `lookup_location` (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub display: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// The narrow "loop capabilities" object design note §9 calls for: passed
/// by reference into `Handler::get_reply` so a handler can drive the §4.7
/// sub-dialogue primitives without owning (or being owned by) the loop.
///
/// Implemented by `parley_core::LoopHandle`; kept here (not in
/// `parley-core`) so that `Handler::get_reply` can take `&dyn
/// LoopCapabilities` without the model crate depending on the loop crate.
#[async_trait]
pub trait LoopCapabilities: Send + Sync {
    /// Suspend until a `UserInput` of the matching category arrives
    /// (§4.7 `ask`).
    async fn ask(&self, category: ValueCategory, prompt: ReplyMessage) -> Result<UserInput, DialogueError>;

    /// Suspend until a `["bookkeeping","choice",i]` with `0 <= i < len` is
    /// received (§4.7 `askChoices`).
    async fn ask_choices(&self, prompt: ReplyMessage, choices: Vec<String>) -> Result<usize, DialogueError>;

    /// Like `ask`, but scoped to a particular skill's question (§4.7
    /// `askQuestion`).
    async fn ask_question(&self, skill: &str, category: ValueCategory, prompt: ReplyMessage) -> Result<UserInput, DialogueError>;

    /// Drive a device-specific interactive configuration flow to
    /// completion (§4.7 `interactiveConfigure`).
    async fn interactive_configure(&self, kind: Option<String>) -> Result<(), DialogueError>;

    /// Present the five-option consent card and, on `only-if`, the filter
    /// builder (§4.4.7, §4.7). Returns the granted program or `None` on
    /// refusal.
    async fn ask_for_permission(&self, source: &str, identity: &str, program: serde_json::Value) -> Result<Option<serde_json::Value>, DialogueError>;

    /// API call — no suspension (§4.7 `lookupContact`).
    async fn lookup_contact(&self, category: &str, name: &str) -> Vec<Contact>;

    /// May recurse through `ask` (§4.7 `lookupLocation`).
    async fn lookup_location(&self, key: &str, previous: Option<Location>) -> Result<Location, DialogueError>;

    /// May recurse; persists the value when the caller marks it
    /// `save_to_context` (§4.7 `resolveUserContext`).
    async fn resolve_user_context(&self, var_name: &str, save_to_context: bool) -> Result<serde_json::Value, DialogueError>;

    /// Emit an intermediate batch of messages mid-`get_reply` (used by
    /// execution result streaming, §4.4.5) without ending the turn.
    async fn emit(&self, messages: Vec<ReplyMessage>) -> Result<(), DialogueError>;

    /// Build a conjunctive `(path, operator, value)` filter list by
    /// repeatedly prompting until the user says "done" (§4.4.6, §4.4.7).
    /// Returned as plain tuples rather than a typed filter struct so this
    /// crate stays independent of the program-AST representation.
    async fn build_filter_list(&self) -> Result<Vec<(String, String, String)>, DialogueError>;
}
