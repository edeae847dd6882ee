// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-supplied context carried on every `UserInput` (§3): contacts,
/// locale, and the speaker id when the session runs on a multi-speaker
/// device. Optional end to end — the loop never requires it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformData {
    pub contacts: Vec<serde_json::Value>,
    pub locale: Option<String>,
    pub speaker_id: Option<String>,
}

/// Tagged sum describing the shape a turn arrived in (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserInput {
    /// A raw, free-form utterance routed through NLU.
    Command { utterance: String, platform_data: PlatformData },
    /// Parsed UI tokens plus already-resolved entities (the "bookkeeping"
    /// control vocabulary of §6).
    Parsed {
        code: Vec<String>,
        entities: HashMap<String, serde_json::Value>,
        platform_data: PlatformData,
    },
    /// A pre-typed program (e.g. produced by a prior sub-dialogue).
    Program { program: serde_json::Value, platform_data: PlatformData },
}

impl UserInput {
    pub fn platform_data(&self) -> &PlatformData {
        match self {
            UserInput::Command { platform_data, .. } => platform_data,
            UserInput::Parsed { platform_data, .. } => platform_data,
            UserInput::Program { platform_data, .. } => platform_data,
        }
    }

    /// Construct a plain-text command with default platform data —
    /// the common case for tests and the CLI shell.
    pub fn command(utterance: impl Into<String>) -> Self {
        UserInput::Command { utterance: utterance.into(), platform_data: PlatformData::default() }
    }

    /// Construct a bookkeeping token array, e.g. `["bookkeeping","special","special:yes"]`.
    pub fn parsed(code: Vec<impl Into<String>>) -> Self {
        UserInput::Parsed {
            code: code.into_iter().map(Into::into).collect(),
            entities: HashMap::new(),
            platform_data: PlatformData::default(),
        }
    }

    /// Parse one line of the CLI shell's bookkeeping wire format (§6): a
    /// JSON array of strings, with an optional trailing number carrying a
    /// choice index, e.g. `["bookkeeping","special","special:yes"]` or
    /// `["bookkeeping","choice",2]`. Returns `None` for anything that isn't
    /// that shape, so the caller can fall back to treating the line as a
    /// plain free-form command.
    pub fn from_bookkeeping_line(line: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        let items = value.as_array()?;
        if items.is_empty() {
            return None;
        }
        let mut code = Vec::new();
        let mut entities = HashMap::new();
        for item in items {
            match item {
                serde_json::Value::String(s) => code.push(s.clone()),
                serde_json::Value::Number(_) => {
                    entities.insert("choice".to_string(), item.clone());
                }
                _ => return None,
            }
        }
        if code.first().map(String::as_str) != Some("bookkeeping") {
            return None;
        }
        Some(UserInput::Parsed { code, entities, platform_data: PlatformData::default() })
    }

    /// True when this is the `special:nevermind` bookkeeping token, the
    /// universal sub-dialogue cancel signal (§6, §7).
    pub fn is_nevermind(&self) -> bool {
        matches!(self, UserInput::Parsed { code, .. } if code.as_slice() == ["bookkeeping", "special", "special:nevermind"])
    }

    /// Extract a `["bookkeeping","choice", i]` selection, if this input is one.
    pub fn as_choice(&self) -> Option<usize> {
        match self {
            UserInput::Parsed { code, entities, .. }
                if code.len() >= 2 && code[0] == "bookkeeping" && code[1] == "choice" =>
            {
                entities.get("choice").and_then(|v| v.as_u64()).map(|n| n as usize)
            }
            _ => None,
        }
    }

    /// Extract the special token name (`yes`, `no`, `back`, `more`, ...) if
    /// this is a `["bookkeeping","special","special:X"]` input.
    pub fn as_special(&self) -> Option<&str> {
        match self {
            UserInput::Parsed { code, .. } if code.len() == 3 && code[0] == "bookkeeping" && code[1] == "special" => {
                code[2].strip_prefix("special:")
            }
            _ => None,
        }
    }
}
