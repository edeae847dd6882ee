// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::analysis::CommandAnalysisResult;
use crate::input::UserInput;
use crate::message::ReplyMessage;
use crate::value::ValueCategory;

/// What `Handler::get_reply` (and `initialize`) produce (§3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyResult {
    pub messages: Vec<ReplyMessage>,
    pub expecting: Option<ValueCategory>,
    pub end: bool,
    /// For logs only — never inspected by the loop for control flow.
    pub context: Option<String>,
    pub agent_target: Option<String>,
}

impl ReplyResult {
    pub fn text(s: impl Into<String>) -> Self {
        Self { messages: vec![ReplyMessage::text(s)], ..Default::default() }
    }

    pub fn with_expecting(mut self, category: ValueCategory) -> Self {
        self.expecting = Some(category);
        self
    }

    pub fn ending(mut self) -> Self {
        self.end = true;
        self
    }
}

/// The uniform contract every dialogue handler implements (§2 C3, §4.3).
///
/// `analyze_command` is pure classification — it performs no emission and
/// (besides the external NLU/NLG calls already out of scope) mutates no
/// handler state. `get_reply` is the side-effectful, possibly multi-turn
/// routine and is the only place a sub-dialogue primitive may be invoked.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Stable identifier, unique within a session (§3).
    fn unique_id(&self) -> &str;

    /// Higher wins arbiter ties (§4.6, R4).
    fn priority(&self) -> i32;

    fn icon(&self) -> Option<&str> {
        None
    }

    /// Produce an optional welcome reply. Called once per handler at
    /// session start (§4.3).
    async fn initialize(&mut self, prev_state: Option<serde_json::Value>, show_welcome: bool) -> anyhow::Result<Option<ReplyResult>>;

    async fn analyze_command(&self, input: &UserInput) -> anyhow::Result<CommandAnalysisResult>;

    /// May mutate handler state and invoke the §4.7 sub-dialogue
    /// primitives through `loop_handle`.
    async fn get_reply(
        &mut self,
        analysis: CommandAnalysisResult,
        loop_handle: &(dyn crate::loop_caps::LoopCapabilities + Send + Sync),
    ) -> anyhow::Result<ReplyResult>;

    fn get_state(&self) -> serde_json::Value;

    fn reset(&mut self);
}
