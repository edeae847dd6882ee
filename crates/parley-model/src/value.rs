// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Closed enumeration used to constrain what shape of `UserInput` a
/// sub-dialogue primitive will accept next (§3, `ValueCategory`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
    YesNo,
    Choice,
    Command,
    Number,
    Location,
    Time,
    Date,
    RawString,
    Password,
    PhoneNumber,
    EmailAddress,
    Contact,
    Generic,
}

impl ValueCategory {
    /// Whether an `AskSpecial` frame tagged with this category is satisfied
    /// by a bare `special:null` (i.e. "anything goes").
    pub fn is_generic(self) -> bool {
        matches!(self, ValueCategory::Generic)
    }
}
