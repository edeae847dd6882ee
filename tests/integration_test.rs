// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! End-to-end tests driving `DialogueLoop` the way the CLI shell would:
//! through `start`/`handle_command`/`dispatch_notify`/`reset`/`stop`,
//! recording every outbound message a `Delegate` receives. Exercises the
//! §8 scenarios (multi-device disambiguation, slot filling, the rule
//! builder, permission grants, remote programs, notification
//! interleaving) against the mock parser/executor, plus the handler
//! arbitration and cancellation boundary behaviors.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use parley_config::InMemoryPreferenceStore;
use parley_core::{
    ask_special_kind_for, deliver_all, Delegate, DialogueLoop, FormalProgramHandler, IntentQueue, LoopHandle, MockExecutor, ProgramAst,
    ProgramParser, ProgramStore, RuleBuilderCatalog,
};
use parley_model::{
    handler_entries, AskSpecialKind, CommandAnalysisResult, DialogueError, Handler, LoopCapabilities, QueueItem, ReplyMessage, ReplyResult, UserInput,
};
use parley_runtime::{ContextVarResolver, InMemoryContactProvider, PermissionStore, StaticLocationResolver};
use parley_skills::{FaqEntry, FaqHandler};

#[derive(Default)]
struct RecordingDelegate {
    sent: Mutex<Vec<String>>,
}

impl RecordingDelegate {
    fn snapshot(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
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

/// Harness bundling the pieces every scenario below needs: the queues, a
/// `LoopHandle`, and a recording delegate, wired the same way the CLI
/// shell wires `main.rs`.
struct Harness {
    dialogue_loop: Arc<DialogueLoop>,
    notify_queue: Arc<IntentQueue<QueueItem>>,
    delegate: Arc<RecordingDelegate>,
}

fn build_harness(handlers: Vec<Box<dyn Handler>>) -> Harness {
    let user_queue = Arc::new(IntentQueue::<UserInput>::new());
    let notify_queue = Arc::new(IntentQueue::<QueueItem>::new());
    let delegate = Arc::new(RecordingDelegate::default());
    let loop_handle = Arc::new(LoopHandle::new(
        user_queue.clone(),
        delegate.clone(),
        Arc::new(InMemoryContactProvider::default()),
        Arc::new(StaticLocationResolver::default()),
        Arc::new(ContextVarResolver::new(Arc::new(InMemoryPreferenceStore::default()))),
        Arc::new(PermissionStore::new()),
    ));
    let entries = handler_entries(handlers);
    let dialogue_loop = Arc::new(DialogueLoop::new(delegate.clone(), loop_handle, user_queue, notify_queue.clone(), entries, None));
    Harness { dialogue_loop, notify_queue, delegate }
}

fn formal_handler() -> FormalProgramHandler {
    let catalog = RuleBuilderCatalog {
        categories: vec![parley_core::CategoryEntry {
            name: "comics".into(),
            devices: vec![parley_core::DeviceEntry {
                name: "xkcd".into(),
                examples: vec![parley_core::ExampleEntry { label: "get the latest comic".into(), function_name: "com.xkcd.get_comic".into() }],
            }],
        }],
    };
    FormalProgramHandler::new(
        "com.formalprogram",
        0,
        Arc::new(parley_core::MockProgramParser),
        Arc::new(MockExecutor),
        catalog,
        5,
        Arc::new(ProgramStore::new()),
    )
}

fn choice(index: usize) -> UserInput {
    match UserInput::parsed(vec!["bookkeeping", "choice"]) {
        UserInput::Parsed { code, mut entities, platform_data } => {
            entities.insert("choice".to_string(), serde_json::json!(index));
            UserInput::Parsed { code, entities, platform_data }
        }
        other => other,
    }
}

fn special(name: &str) -> UserInput {
    UserInput::parsed(vec!["bookkeeping".to_string(), "special".to_string(), format!("special:{name}")])
}

/// Runs `run()` in the background for the lifetime of the closure, then
/// stops the loop and awaits the task so every scenario tears down
/// cleanly without a dangling background future.
async fn with_running_loop<F, Fut>(harness: &Harness, body: F)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let runner = {
        let dialogue_loop = harness.dialogue_loop.clone();
        tokio::spawn(async move { dialogue_loop.run().await })
    };
    body().await;
    harness.dialogue_loop.stop().await.unwrap();
    runner.await.unwrap().unwrap();
}

// §8 scenario: multi-device disambiguation + slot filling, abbreviated to
// the mock parser's vocabulary (command "post a tweet" exposes the same
// device-choice + raw-string-slot + confirm shape as the literal corpus).
#[tokio::test]
async fn slot_filling_and_disambiguation_end_with_executed_program() {
    let harness = build_harness(vec![Box::new(formal_handler())]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("post a tweet")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(choice(1)); // pick @bar
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(UserInput::command("lol")); // status slot
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("yes")); // confirm
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("@bar")), "expected the disambiguation prompt to list @bar: {sent:?}");
    assert!(sent.iter().any(|m| m.contains("status=lol")), "expected the confirmation prose to echo the filled slot: {sent:?}");
    assert_eq!(sent.last(), Some(&"ask_special:Null".to_string()));
}

// §8 scenario 3: `special:makerule` walks category -> device -> example ->
// "add a filter?" -> "run it?" and installs a standing (non-one-shot) rule.
// `special:makerule` is cold-startable (§6's control vocabulary lists it
// with no currency restriction) — it is classified as an ordinary
// `ConfidentInDomainCommand`, not a followup, so it can win arbitration on
// the very first turn of a fresh session with no prior warm-up command.
#[tokio::test]
async fn makerule_drives_the_rule_builder_to_a_standing_rule() {
    let harness = build_harness(vec![Box::new(formal_handler())]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(special("makerule")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(choice(0)); // category: comics
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(choice(0)); // device: xkcd
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(choice(0)); // example: get the latest comic
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("no")); // add a filter? no
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("yes")); // run it? yes
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("I'll")), "expected the standing-rule acknowledgement: {sent:?}");
    assert_eq!(sent.last(), Some(&"ask_special:Null".to_string()));
}

// §8 scenario 6: a notification arrives with no sub-dialogue in flight and
// is rendered as an RDL card plus the formatted text, ending in ask_special null.
#[tokio::test]
async fn notification_interleaves_as_rdl_and_text() {
    let harness = build_harness(vec![Box::new(formal_handler())]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.dialogue_loop.dispatch_notify(
            "demo-xkcd",
            "xkcd",
            "com.xkcd.get_comic",
            serde_json::json!({"title": "Python", "link": "https://xkcd.com/353/"}),
        );
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.starts_with("rdl:xkcd")));
    assert!(sent.iter().any(|m| m.contains("Python")));
    assert_eq!(sent.last(), Some(&"ask_special:Null".to_string()));
}

// §8 boundary behavior: `special:nevermind` at any sub-dialogue depth
// returns control to the outer loop with the fixed apology message, and
// leaves the session ready for a fresh, unrelated command afterward.
#[tokio::test]
async fn nevermind_unwinds_with_apology_and_resets_session() {
    let harness = build_harness(vec![Box::new(formal_handler())]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("post a tweet")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("nevermind"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("Sorry I couldn't help on that.")));
}

// §4.6 arbitration: an FAQ handler's confident match beats the
// formal-program handler's silence, and vice versa for a program-shaped
// utterance the FAQ handler has no keyword for.
#[tokio::test]
async fn arbiter_prefers_the_confident_handler_for_each_utterance() {
    let faq = FaqHandler::new("faq", 0, vec![FaqEntry { keywords: vec!["hours".into()], answer: "We're open 9 to 5.".into() }]);
    let harness = build_harness(vec![Box::new(faq), Box::new(formal_handler())]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("what are your hours")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("show me a comic")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("yes"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("We're open 9 to 5.")));
    assert!(sent.iter().any(|m| m.contains("xkcd: Python")), "expected the executed comic's formatted result: {sent:?}");
}

#[tokio::test]
async fn unmatched_utterance_gets_the_didnt_understand_reply() {
    let harness = build_harness(vec![Box::new(formal_handler())]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("do the laundry")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("didn't understand")));
}

// §8 round-trip law: getState() then start(..., getState()) behaves the
// same on the next identical input, since the FAQ handler carries no
// state to lose across the round-trip.
#[tokio::test]
async fn get_state_round_trips_through_a_fresh_session() {
    let faq = FaqHandler::new("faq", 0, vec![FaqEntry { keywords: vec!["hours".into()], answer: "We're open 9 to 5.".into() }]);
    let harness = build_harness(vec![Box::new(faq)]);
    harness.dialogue_loop.start(true, None).await.unwrap();
    let state = harness.dialogue_loop.get_state().await;
    assert!(state.get("faq").is_some());

    let harness2 = build_harness(vec![Box::new(FaqHandler::new(
        "faq",
        0,
        vec![FaqEntry { keywords: vec!["hours".into()], answer: "We're open 9 to 5.".into() }],
    ))]);
    harness2.dialogue_loop.start(true, Some(state)).await.unwrap();

    with_running_loop(&harness2, || async {
        harness2.notify_queue.push(QueueItem::user_input(UserInput::command("what are your hours")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness2.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("We're open 9 to 5.")));
}

// §8 scenario 5 (abbreviated): a remote-executor program is split into a
// local monitor plus the remote program, and the turn ends with the
// "I'll send this to <principal>" acknowledgement rather than executing
// locally.
struct RemoteProgramParser;

#[async_trait]
impl ProgramParser for RemoteProgramParser {
    async fn parse(&self, input: &UserInput) -> Result<Option<ProgramAst>, DialogueError> {
        match input {
            UserInput::Command { utterance, .. } if utterance == "send the comic to alice" => {
                Ok(Some(ProgramAst::new("com.xkcd.get_comic").remote("alice")))
            }
            _ => Ok(None),
        }
    }
}

#[tokio::test]
async fn remote_executor_program_is_split_and_sent() {
    let installed = Arc::new(ProgramStore::new());
    let handler = FormalProgramHandler::new(
        "com.formalprogram",
        0,
        Arc::new(RemoteProgramParser),
        Arc::new(MockExecutor),
        RuleBuilderCatalog::default(),
        5,
        installed.clone(),
    );
    let harness = build_harness(vec![Box::new(handler)]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("send the comic to alice")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("yes"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m.contains("send this to alice")));

    // both halves of the remote split (§4.4.8) land in the store rather
    // than being silently dropped: the local monitor, and the program
    // actually destined for alice.
    let rules = installed.installed();
    assert_eq!(rules.len(), 2);
    assert!(rules[0].principal.is_none());
    assert_eq!(rules[1].principal.as_deref(), Some("alice"));
    assert_eq!(rules[1].ast.function_name, "com.xkcd.get_comic");
}

// §8 scenario 4 (abbreviated): a handler that calls `ask_for_permission`
// directly exercises the five-option consent card's "only-if" branch —
// declining the resulting confirmation loops back to the card itself,
// and accepting it grants the program and installs the filter rule.
struct PermissionProbeHandler {
    program: serde_json::Value,
}

#[async_trait]
impl Handler for PermissionProbeHandler {
    fn unique_id(&self) -> &str {
        "permission-probe"
    }
    fn priority(&self) -> i32 {
        0
    }
    async fn initialize(&mut self, _prev_state: Option<serde_json::Value>, _show_welcome: bool) -> anyhow::Result<Option<ReplyResult>> {
        Ok(None)
    }
    async fn analyze_command(&self, input: &UserInput) -> anyhow::Result<CommandAnalysisResult> {
        match input {
            UserInput::Command { utterance, .. } if utterance == "probe" => {
                Ok(CommandAnalysisResult::new(parley_model::AnalysisType::ConfidentInDomainCommand, utterance.clone()))
            }
            _ => Ok(CommandAnalysisResult::out_of_domain(String::new())),
        }
    }
    async fn get_reply(
        &mut self,
        _analysis: CommandAnalysisResult,
        loop_handle: &(dyn LoopCapabilities + Send + Sync),
    ) -> anyhow::Result<ReplyResult> {
        let granted = loop_handle.ask_for_permission("alice", "bob", self.program.clone()).await?;
        Ok(match granted {
            Some(_) => ReplyResult::text("granted").ending(),
            None => ReplyResult::text("refused").ending(),
        })
    }
    fn get_state(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn reset(&mut self) {}
}

#[tokio::test]
async fn permission_only_if_loops_back_on_decline_then_grants_on_confirm() {
    let harness = build_harness(vec![Box::new(PermissionProbeHandler { program: serde_json::json!({"fn": "eat_data"}) })]);
    harness.dialogue_loop.start(false, None).await.unwrap();

    with_running_loop(&harness, || async {
        harness.notify_queue.push(QueueItem::user_input(UserInput::command("probe")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(choice(4)); // "Only if..."
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(UserInput::command("data =~ oo"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(UserInput::command("done"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("no")); // decline confirmation -> back to card
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(choice(4)); // "Only if..." again
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(UserInput::command("data =~ oo"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(UserInput::command("done"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        harness.dialogue_loop.push_command(special("yes")); // confirm -> grant
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    })
    .await;

    let sent = harness.delegate.snapshot();
    assert!(sent.iter().any(|m| m == "text:granted"), "expected the probe handler to report granted: {sent:?}");
}

// Direct unit coverage for the outbound delegate ordering guarantee (§4.2):
// every message of a `ReplyResult` is delivered before the trailing
// `AskSpecial`, independent of the loop.
#[tokio::test]
async fn deliver_all_then_ask_special_preserves_order() {
    let delegate = RecordingDelegate::default();
    let messages = vec![ReplyMessage::text("a"), ReplyMessage::text("b")];
    deliver_all(&delegate, &messages, None).await.unwrap();
    delegate.send_ask_special(ask_special_kind_for(None)).await.unwrap();
    assert_eq!(delegate.snapshot(), vec!["text:a", "text:b", "ask_special:Null"]);
}
