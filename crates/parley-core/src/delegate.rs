// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The outbound sink (§2 C2, §6 outbound API). Implemented by the outer
//! shell (the `parley` CLI binary); the loop only depends on this trait.
use async_trait::async_trait;

use parley_model::{AskSpecialKind, ReplyMessage};

/// Idempotent, side-effect-free-to-serialize sink for each `ReplyMessage`
/// variant, matching the literal outbound method names in §6. The loop
/// guarantees ordering (§4.2); this trait only has to deliver.
#[async_trait]
pub trait Delegate: Send + Sync {
    async fn send(&self, text: &str, icon: Option<&str>) -> anyhow::Result<()>;
    async fn send_picture(&self, url: &str, icon: Option<&str>) -> anyhow::Result<()>;
    async fn send_rdl(&self, display_title: &str, web_callback: &str, icon: Option<&str>) -> anyhow::Result<()>;
    async fn send_button(&self, title: &str, json: serde_json::Value) -> anyhow::Result<()>;
    async fn send_link(&self, title: &str, url: &str) -> anyhow::Result<()>;
    async fn send_choice(&self, index: usize, title: &str) -> anyhow::Result<()>;
    async fn send_ask_special(&self, kind: AskSpecialKind) -> anyhow::Result<()>;
}

/// Dispatch a single [`ReplyMessage`] to the matching `Delegate` method.
/// `icon` is carried alongside text/picture/RDL sends per §6; it is not
/// part of `ReplyMessage` itself (it's session-scope state, §3).
pub async fn deliver_one(delegate: &dyn Delegate, message: &ReplyMessage, icon: Option<&str>) -> anyhow::Result<()> {
    match message {
        ReplyMessage::Text { s } => delegate.send(s, icon).await,
        ReplyMessage::Picture { url } => delegate.send_picture(url, icon).await,
        ReplyMessage::Rdl { display_title, web_callback } => delegate.send_rdl(display_title, web_callback, icon).await,
        ReplyMessage::Button { title, json } => delegate.send_button(title, json.clone()).await,
        ReplyMessage::Link { title, url } => delegate.send_link(title, url).await,
        ReplyMessage::Choice { index, title } => delegate.send_choice(*index, title).await,
        ReplyMessage::AskSpecial { kind } => delegate.send_ask_special(*kind).await,
    }
}

/// Deliver a whole message batch in order (§4.2, §5 ordering guarantees).
pub async fn deliver_all(delegate: &dyn Delegate, messages: &[ReplyMessage], icon: Option<&str>) -> anyhow::Result<()> {
    for message in messages {
        deliver_one(delegate, message, icon).await?;
    }
    Ok(())
}

/// Convert a `ValueCategory` into the `AskSpecialKind` the outbound API
/// expects as the trailing frame of every agent reply (§3, §8).
pub fn ask_special_kind_for(category: Option<parley_model::ValueCategory>) -> AskSpecialKind {
    use parley_model::ValueCategory as VC;
    match category {
        None => AskSpecialKind::Null,
        Some(VC::YesNo) => AskSpecialKind::YesNo,
        Some(VC::Choice) => AskSpecialKind::Choice,
        Some(VC::Command) => AskSpecialKind::Command,
        Some(VC::Number) => AskSpecialKind::Number,
        Some(VC::Location) => AskSpecialKind::Location,
        Some(VC::Time) | Some(VC::Date) => AskSpecialKind::Generic,
        Some(VC::RawString) => AskSpecialKind::RawString,
        Some(VC::Password) => AskSpecialKind::Password,
        Some(VC::PhoneNumber) => AskSpecialKind::PhoneNumber,
        Some(VC::EmailAddress) => AskSpecialKind::EmailAddress,
        Some(VC::Contact) => AskSpecialKind::Generic,
        Some(VC::Generic) => AskSpecialKind::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDelegate {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Delegate for RecordingDelegate {
        async fn send(&self, text: &str, _icon: Option<&str>) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("text:{text}"));
            Ok(())
        }
        async fn send_picture(&self, url: &str, _icon: Option<&str>) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("picture:{url}"));
            Ok(())
        }
        async fn send_rdl(&self, display_title: &str, _web_callback: &str, _icon: Option<&str>) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("rdl:{display_title}"));
            Ok(())
        }
        async fn send_button(&self, title: &str, _json: serde_json::Value) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("button:{title}"));
            Ok(())
        }
        async fn send_link(&self, title: &str, _url: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("link:{title}"));
            Ok(())
        }
        async fn send_choice(&self, index: usize, title: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("choice:{index}:{title}"));
            Ok(())
        }
        async fn send_ask_special(&self, kind: AskSpecialKind) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(format!("ask_special:{kind:?}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn deliver_all_preserves_order() {
        let delegate = RecordingDelegate::default();
        let messages = vec![
            ReplyMessage::text("hi"),
            ReplyMessage::Picture { url: "http://x/y.png".into() },
            ReplyMessage::ask_special(AskSpecialKind::YesNo),
        ];
        deliver_all(&delegate, &messages, None).await.unwrap();
        let sent = delegate.sent.lock().unwrap();
        assert_eq!(&*sent, &["text:hi", "picture:http://x/y.png", "ask_special:YesNo"]);
    }

    #[test]
    fn ask_special_kind_maps_none_to_null() {
        assert_eq!(ask_special_kind_for(None), AskSpecialKind::Null);
    }

    #[test]
    fn ask_special_kind_maps_yes_no() {
        assert_eq!(ask_special_kind_for(Some(parley_model::ValueCategory::YesNo)), AskSpecialKind::YesNo);
    }
}
