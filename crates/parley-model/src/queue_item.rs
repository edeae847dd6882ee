// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

use crate::input::UserInput;

/// What flows through the notify queue (§3, C1): a user turn envelope, a
/// notification from a long-running skill program, or an out-of-band error
/// from one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueItem {
    UserInput { command: UserInput },
    Notification { app_id: String, app_name: String, output_type: String, output_value: serde_json::Value },
    Error { app_id: String, app_name: String, error: String },
}

impl QueueItem {
    pub fn user_input(command: UserInput) -> Self {
        QueueItem::UserInput { command }
    }

    pub fn is_user_input(&self) -> bool {
        matches!(self, QueueItem::UserInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_constructor_roundtrips() {
        let item = QueueItem::user_input(UserInput::command("hi"));
        assert!(item.is_user_input());
    }

    #[test]
    fn notification_is_not_user_input() {
        let item = QueueItem::Notification {
            app_id: "a1".into(),
            app_name: "xkcd".into(),
            output_type: "com.xkcd:get_comic".into(),
            output_value: serde_json::json!({"title": "foo"}),
        };
        assert!(!item.is_user_input());
    }
}
