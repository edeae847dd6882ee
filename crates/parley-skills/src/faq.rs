// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The simplest handler in the system (§4.5): a closed list of
//! keyword-triggered question/answer pairs with no sub-dialogue and no
//! persisted state. A reasonable template for anything that only ever
//! needs `analyze_command` + a one-shot `get_reply`.
use async_trait::async_trait;
use parley_model::{AnalysisType, CommandAnalysisResult, Handler, LoopCapabilities, ReplyResult, UserInput};

#[derive(Debug, Clone)]
pub struct FaqEntry {
    pub keywords: Vec<String>,
    pub answer: String,
}

pub struct FaqHandler {
    unique_id: String,
    priority: i32,
    entries: Vec<FaqEntry>,
}

impl FaqHandler {
    pub fn new(unique_id: impl Into<String>, priority: i32, entries: Vec<FaqEntry>) -> Self {
        Self { unique_id: unique_id.into(), priority, entries }
    }

    fn best_match(&self, utterance: &str) -> Option<&FaqEntry> {
        let lower = utterance.to_lowercase();
        self.entries.iter().find(|e| e.keywords.iter().any(|k| lower.contains(&k.to_lowercase())))
    }
}

#[async_trait]
impl Handler for FaqHandler {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn initialize(&mut self, _prev_state: Option<serde_json::Value>, _show_welcome: bool) -> anyhow::Result<Option<ReplyResult>> {
        Ok(None)
    }

    async fn analyze_command(&self, input: &UserInput) -> anyhow::Result<CommandAnalysisResult> {
        let utterance = match input {
            UserInput::Command { utterance, .. } => utterance.clone(),
            _ => return Ok(CommandAnalysisResult::out_of_domain(String::new())),
        };
        match self.best_match(&utterance) {
            Some(_) => Ok(CommandAnalysisResult::new(AnalysisType::ConfidentInDomainCommand, utterance)),
            None => Ok(CommandAnalysisResult::out_of_domain(utterance)),
        }
    }

    async fn get_reply(
        &mut self,
        analysis: CommandAnalysisResult,
        _loop_handle: &(dyn LoopCapabilities + Send + Sync),
    ) -> anyhow::Result<ReplyResult> {
        match self.best_match(&analysis.utterance) {
            Some(entry) => Ok(ReplyResult::text(entry.answer.clone()).ending()),
            None => Ok(ReplyResult::text("Sorry, I don't have an answer for that.").ending()),
        }
    }

    fn get_state(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn reset(&mut self) {}
}
