// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The formal-program AST and its parser seam (§4.4). The real
//! parser/type-checker is out of scope (§1); this module defines the
//! narrow value type and the `ProgramParser` trait the formal-program
//! handler drives, plus a mock good enough to exercise slot filling,
//! disambiguation, confirmation, execution, and rule building end to end.
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use parley_model::{DialogueError, UserInput, ValueCategory};

/// A device candidate offered during disambiguation (§4.4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCandidate {
    pub device_id: String,
    pub display_name: String,
}

/// One device slot in a program that may need disambiguation. `resolved`
/// is `None` until the user picks (or there's only one candidate, in
/// which case `ProgramAst::new` auto-resolves it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceChoice {
    pub slot_name: String,
    pub candidates: Vec<DeviceCandidate>,
    pub resolved: Option<usize>,
}

impl DeviceChoice {
    pub fn resolved_device_id(&self) -> Option<&str> {
        self.resolved.and_then(|i| self.candidates.get(i)).map(|c| c.device_id.as_str())
    }
}

/// A conjunctive predicate over a program parameter, used by both the
/// rule builder's optional filter step (§4.4.6) and the permission
/// only-if path (§4.4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramFilter {
    pub path: String,
    pub operator: String,
    pub value: String,
}

/// The out-of-scope parser/type-checker's output (§1, §4.4): a typed
/// program with its device slots, parameter slots (in declared order),
/// and optional trigger filters, sufficient to drive the rest of §4.4
/// without re-implementing NLU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramAst {
    pub function_name: String,
    /// `None` for a local program; `Some(principal)` for a remote program
    /// composed by §4.4.8.
    pub executor: Option<String>,
    pub device_choices: Vec<DeviceChoice>,
    pub param_order: Vec<String>,
    pub params: HashMap<String, Option<Value>>,
    pub param_categories: HashMap<String, ValueCategory>,
    pub filters: Vec<ProgramFilter>,
    /// `true` for a `now =>` one-shot; `false` for a standing `=> notify`
    /// rule installed by the rule builder (§4.4.6).
    pub is_one_shot: bool,
}

impl ProgramAst {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            executor: None,
            device_choices: Vec::new(),
            param_order: Vec::new(),
            params: HashMap::new(),
            param_categories: HashMap::new(),
            filters: Vec::new(),
            is_one_shot: true,
        }
    }

    pub fn with_device_choice(mut self, slot_name: impl Into<String>, candidates: Vec<DeviceCandidate>) -> Self {
        let resolved = if candidates.len() == 1 { Some(0) } else { None };
        self.device_choices.push(DeviceChoice { slot_name: slot_name.into(), candidates, resolved });
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, category: ValueCategory, value: Option<Value>) -> Self {
        let name = name.into();
        self.param_order.push(name.clone());
        self.param_categories.insert(name.clone(), category);
        self.params.insert(name, value);
        self
    }

    pub fn remote(mut self, principal: impl Into<String>) -> Self {
        self.executor = Some(principal.into());
        self
    }

    /// First device slot still awaiting disambiguation, in declaration
    /// order (§4.4.3's "slot elicitation order" applies to device slots
    /// the same as parameter slots).
    pub fn next_unresolved_device(&self) -> Option<&DeviceChoice> {
        self.device_choices.iter().find(|d| d.resolved.is_none())
    }

    pub fn resolve_device(&mut self, slot_name: &str, choice_index: usize) -> anyhow::Result<()> {
        let slot = self
            .device_choices
            .iter_mut()
            .find(|d| d.slot_name == slot_name)
            .ok_or_else(|| anyhow::anyhow!("no such device slot: {slot_name}"))?;
        if choice_index >= slot.candidates.len() {
            anyhow::bail!("choice {choice_index} out of range for slot {slot_name}");
        }
        slot.resolved = Some(choice_index);
        Ok(())
    }

    /// First declared parameter still undefined (§4.4.2's elicitation
    /// order: "the program's declared slot order; repeat until none
    /// remain undefined").
    pub fn next_missing_param(&self) -> Option<(&str, ValueCategory)> {
        self.param_order.iter().find_map(|name| match self.params.get(name) {
            Some(None) => Some((name.as_str(), self.param_categories[name])),
            _ => None,
        })
    }

    pub fn set_param(&mut self, name: &str, value: Value) {
        self.params.insert(name.to_string(), Some(value));
    }

    pub fn all_devices_resolved(&self) -> bool {
        self.next_unresolved_device().is_none()
    }

    pub fn all_params_filled(&self) -> bool {
        self.next_missing_param().is_none()
    }

    pub fn add_filter(&mut self, filter: ProgramFilter) {
        self.filters.push(filter);
    }

    /// Deterministic prose rendering of the program, given its resolved
    /// devices and filled parameters — used both for the pre-execution
    /// confirmation (§4.4.4) and the rule-builder summary (§4.4.6). Must
    /// match, up to device-id assignment, what is subsequently submitted
    /// to the executor (§8 round-trip law).
    pub fn confirmation_prose(&self) -> String {
        let mut parts = Vec::new();
        if let Some(principal) = &self.executor {
            parts.push(format!("send to {principal}"));
        }
        parts.push(self.function_name.clone());
        for slot in &self.device_choices {
            if let Some(id) = slot.resolved_device_id() {
                parts.push(format!("on {id}"));
            }
        }
        for name in &self.param_order {
            if let Some(Some(value)) = self.params.get(name) {
                parts.push(format!("{name}={}", display_value(value)));
            }
        }
        for filter in &self.filters {
            parts.push(format!("{} {} \"{}\"", filter.path, filter.operator, filter.value));
        }
        if !self.is_one_shot {
            parts.push("=> notify".to_string());
        }
        parts.join(", ")
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The out-of-scope parser/type-checker boundary (§1, §2 C4). No real
/// grammar lives here — only enough of a mock to drive the handler.
#[async_trait]
pub trait ProgramParser: Send + Sync {
    async fn parse(&self, input: &UserInput) -> Result<Option<ProgramAst>, DialogueError>;
}

/// Deterministic, keyword-driven stand-in for the real NLU-backed parser.
/// Recognizes a small fixed vocabulary sufficient to reach every branch of
/// §4.4: a function needing device disambiguation, one needing a raw
/// string parameter, and a pre-typed `UserInput::Program` passthrough used
/// when a prior sub-dialogue already produced a full AST (e.g. the rule
/// builder resubmitting its result).
#[derive(Debug, Default)]
pub struct MockProgramParser;

#[async_trait]
impl ProgramParser for MockProgramParser {
    async fn parse(&self, input: &UserInput) -> Result<Option<ProgramAst>, DialogueError> {
        match input {
            UserInput::Program { program, .. } => {
                let ast: ProgramAst = serde_json::from_value(program.clone()).map_err(|e| DialogueError::Parse(e.to_string()))?;
                Ok(Some(ast))
            }
            UserInput::Command { utterance, .. } => Ok(Self::parse_utterance(utterance)),
            UserInput::Parsed { code, .. } => Ok(Self::parse_tokens(code)),
        }
    }
}

impl MockProgramParser {
    fn parse_utterance(utterance: &str) -> Option<ProgramAst> {
        let lower = utterance.to_lowercase();
        if lower.contains("tweet") || lower.contains("post") {
            Some(
                ProgramAst::new("com.twitter.post")
                    .with_device_choice(
                        "twitter_account",
                        vec![
                            DeviceCandidate { device_id: "twitter-foo".into(), display_name: "@foo".into() },
                            DeviceCandidate { device_id: "twitter-bar".into(), display_name: "@bar".into() },
                        ],
                    )
                    .with_param("status", ValueCategory::RawString, None),
            )
        } else if lower.contains("comic") || lower.contains("xkcd") {
            Some(ProgramAst::new("com.xkcd.get_comic"))
        } else if lower.contains("weather") {
            Some(ProgramAst::new("org.thingpedia.weather").with_param("location", ValueCategory::Location, None))
        } else {
            None
        }
    }

    fn parse_tokens(code: &[String]) -> Option<ProgramAst> {
        if code.first().map(String::as_str) == Some("now") {
            Self::parse_utterance(&code.join(" "))
        } else {
            None
        }
    }
}
