// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The concrete [`Delegate`] (§2 C2) for the CLI shell: prints every
//! outbound `ReplyMessage` to stdout. This is the "outer shell" the core
//! spec treats as external — nothing here is load-bearing for the loop.
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use parley_core::Delegate;
use parley_model::AskSpecialKind;

/// Counts emitted turns so the CLI can print a stable `[n]` prefix; purely
/// cosmetic, carries no session state.
#[derive(Default)]
pub struct StdoutDelegate {
    turn: AtomicUsize,
}

impl StdoutDelegate {
    fn prefix(&self, icon: Option<&str>) -> String {
        match icon {
            Some(icon) => format!("[{icon}]"),
            None => "parley>".to_string(),
        }
    }
}

#[async_trait]
impl Delegate for StdoutDelegate {
    async fn send(&self, text: &str, icon: Option<&str>) -> anyhow::Result<()> {
        println!("{} {text}", self.prefix(icon));
        Ok(())
    }

    async fn send_picture(&self, url: &str, icon: Option<&str>) -> anyhow::Result<()> {
        println!("{} [picture] {url}", self.prefix(icon));
        Ok(())
    }

    async fn send_rdl(&self, display_title: &str, web_callback: &str, icon: Option<&str>) -> anyhow::Result<()> {
        println!("{} [card] {display_title} -> {web_callback}", self.prefix(icon));
        Ok(())
    }

    async fn send_button(&self, title: &str, json: serde_json::Value) -> anyhow::Result<()> {
        println!("parley> [button] {title} {json}");
        Ok(())
    }

    async fn send_link(&self, title: &str, url: &str) -> anyhow::Result<()> {
        println!("parley> [link] {title} ({url})");
        Ok(())
    }

    async fn send_choice(&self, index: usize, title: &str) -> anyhow::Result<()> {
        println!("parley>   {index}. {title}");
        Ok(())
    }

    async fn send_ask_special(&self, kind: AskSpecialKind) -> anyhow::Result<()> {
        self.turn.fetch_add(1, Ordering::Relaxed);
        if !matches!(kind, AskSpecialKind::Null) {
            println!("parley> (expecting: {kind:?})");
        }
        std::io::stdout().flush().ok();
        Ok(())
    }
}
