// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// The `kind` carried by an `AskSpecial` reply frame (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskSpecialKind {
    YesNo,
    Choice,
    Command,
    Generic,
    RawString,
    Password,
    Number,
    Location,
    PhoneNumber,
    EmailAddress,
    Null,
}

/// Tagged sum of everything the agent can emit through the [`Delegate`]
/// (§3). Every agent reply ends with exactly one `AskSpecial` — the loop
/// enforces that ordering, not this type.
///
/// [`Delegate`]: trait not defined in this crate; see `parley_core::Delegate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyMessage {
    Text { s: String },
    Picture { url: String },
    Rdl { display_title: String, web_callback: String },
    Button { title: String, json: serde_json::Value },
    Link { title: String, url: String },
    Choice { index: usize, title: String },
    AskSpecial { kind: AskSpecialKind },
}

impl ReplyMessage {
    pub fn text(s: impl Into<String>) -> Self {
        ReplyMessage::Text { s: s.into() }
    }

    pub fn ask_special(kind: AskSpecialKind) -> Self {
        ReplyMessage::AskSpecial { kind }
    }

    /// True for the one frame type that must terminate every agent reply.
    pub fn is_ask_special(&self) -> bool {
        matches!(self, ReplyMessage::AskSpecial { .. })
    }
}
