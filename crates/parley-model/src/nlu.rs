// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Narrow trait boundaries for the NLU/NLG network clients the
//! specification treats as external collaborators (§1 Non-goals, §2 C4).
//! No real network driver lives in this workspace — only the seam and a
//! mock good enough to drive the formal-program handler end to end.
use async_trait::async_trait;

use crate::errors::DialogueError;

/// Result of sending a free-form utterance through the NLU service: a
/// ranked list of candidate parses, each a bookkeeping-style token array
/// plus resolved entities.
#[derive(Debug, Clone, PartialEq)]
pub struct NluParse {
    pub code: Vec<String>,
    pub entities: std::collections::HashMap<String, serde_json::Value>,
    pub score: f32,
}

#[async_trait]
pub trait NluClient: Send + Sync {
    async fn parse(&self, utterance: &str, locale: &str) -> Result<Vec<NluParse>, DialogueError>;
}

#[async_trait]
pub trait NlgClient: Send + Sync {
    /// Render a program-result tuple into natural language prose.
    async fn describe(&self, template: &str, args: &std::collections::HashMap<String, serde_json::Value>) -> Result<String, DialogueError>;
}

/// Deterministic stand-in used by tests and the CLI shell in the absence of
/// a real NLU/NLG backend. Recognizes a fixed vocabulary of greetings and
/// otherwise reports zero confidence, matching the "didn't understand"
/// fallback (§4.6 R5).
#[derive(Debug, Default)]
pub struct MockNlu;

#[async_trait]
impl NluClient for MockNlu {
    async fn parse(&self, utterance: &str, _locale: &str) -> Result<Vec<NluParse>, DialogueError> {
        let lower = utterance.trim().to_lowercase();
        if lower.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![NluParse {
            code: vec!["bookkeeping".into(), "command".into()],
            entities: std::collections::HashMap::new(),
            score: if lower.len() > 2 { 0.6 } else { 0.1 },
        }])
    }
}

#[async_trait]
impl NlgClient for MockNlu {
    async fn describe(&self, template: &str, args: &std::collections::HashMap<String, serde_json::Value>) -> Result<String, DialogueError> {
        let mut out = template.to_string();
        for (k, v) in args {
            let needle = format!("${{{k}}}");
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out = out.replace(&needle, &value);
        }
        Ok(out)
    }
}
