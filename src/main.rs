// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The CLI shell (C11): a minimal outer shell that reads lines from stdin
//! as commands, prints every `ReplyMessage` the loop emits, and drives
//! `dispatchNotify`/`reset`/`stop` through a couple of built-in slash
//! commands. The protocol itself (everything in `parley-core`) treats this
//! binary as external — nothing here is load-bearing for the dialogue
//! engine, it only has to exercise it end to end.
mod cli;
mod delegate;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use parley_config::{InMemoryPreferenceStore, JsonFilePreferenceStore, PreferenceStore};
use parley_core::{DialogueLoop, FormalProgramHandler, IntentQueue, LoopHandle, MockExecutor, MockProgramParser, ProgramStore, RuleBuilderCatalog};
use parley_model::{QueueItem, UserInput};
use parley_runtime::{ContextVarResolver, DeviceView, InMemoryContactProvider, PermissionStore, StaticLocationResolver};
use parley_skills::{FaqEntry, FaqHandler, SkillRegistry};

use cli::Cli;
use delegate::StdoutDelegate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Arc::new(parley_config::load(cli.config.as_deref())?);

    let prefs: Arc<dyn PreferenceStore> = match &cli.state_file {
        Some(path) => Arc::new(JsonFilePreferenceStore::open(path)?),
        None => Arc::new(InMemoryPreferenceStore::default()),
    };

    let user_queue = Arc::new(IntentQueue::<UserInput>::new());
    let notify_queue = Arc::new(IntentQueue::<QueueItem>::new());
    let delegate = Arc::new(StdoutDelegate::default());

    let loop_handle = Arc::new(LoopHandle::new(
        user_queue.clone(),
        delegate.clone(),
        Arc::new(InMemoryContactProvider::default()),
        Arc::new(StaticLocationResolver::default()),
        Arc::new(ContextVarResolver::new(prefs)),
        Arc::new(PermissionStore::new()),
    ));

    let faq = FaqHandler::new(
        "faq",
        config.handlers.faq_priority,
        vec![
            FaqEntry { keywords: vec!["hours".into(), "open".into()], answer: "We're open 9 to 5 every day.".into() },
            FaqEntry { keywords: vec!["who are you".into(), "what are you".into()], answer: "I'm Parley, your dialogue agent.".into() },
        ],
    );
    let formal = FormalProgramHandler::new(
        "formal",
        config.handlers.formal_priority,
        Arc::new(MockProgramParser),
        Arc::new(MockExecutor),
        RuleBuilderCatalog::default(),
        config.rulebuilder.page_size,
        Arc::new(ProgramStore::new()),
    );

    let static_handlers = parley_model::handler_entries(vec![Box::new(faq), Box::new(formal)]);

    let device_view = Arc::new(DeviceView::new(vec![]));
    let skill_factory: Arc<parley_skills::HandlerFactory> = Arc::new(|device| {
        Box::new(FaqHandler::new(
            device.unique_id.clone(),
            0,
            vec![FaqEntry { keywords: vec![device.name.clone()], answer: format!("This is the {} skill.", device.name) }],
        ))
    });
    let registry = Arc::new(SkillRegistry::new(device_view, skill_factory));

    let dialogue_loop = Arc::new(DialogueLoop::new(
        delegate,
        loop_handle,
        user_queue,
        notify_queue.clone(),
        static_handlers,
        Some(registry),
    ));

    dialogue_loop.start(true, None).await?;

    let runner = {
        let dialogue_loop = dialogue_loop.clone();
        tokio::spawn(async move { dialogue_loop.run().await })
    };

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "/reset" => dialogue_loop.reset().await?,
            "/quit" | "/stop" => break,
            "/state" => dump_state_json(&dialogue_loop.get_state().await)?,
            "/notify" => dialogue_loop.dispatch_notify(
                "demo-xkcd",
                "xkcd",
                "com.xkcd.get_comic",
                serde_json::json!({"title": "Python", "link": "https://xkcd.com/353/"}),
            ),
            _ => {
                let input = UserInput::from_bookkeeping_line(line).unwrap_or_else(|| UserInput::command(line));
                dialogue_loop.handle_command(input).await?;
            }
        }
    }

    dialogue_loop.stop().await?;
    runner.await??;
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn dump_state_json(state: &serde_json::Value) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", serde_json::to_string_pretty(state)?)?;
    Ok(())
}
