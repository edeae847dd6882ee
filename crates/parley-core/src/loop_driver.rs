// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The dialogue loop itself (§2 C8, §4.8, §5): the top-level driver that
//! arbitrates among every attached handler, drives the winner's
//! `get_reply`, and interleaves out-of-band notifications with user turns
//! under the single-threaded cooperative scheduling contract of §5.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use parley_model::{
    DialogueError, DynamicHandlerSource, HandlerEntry, QueueItem, ReplyResult, UserInput, ValueCategory,
};

use crate::arbiter::{arbitrate, Decision};
use crate::delegate::Delegate;
use crate::executor::ExecutionOutput;
use crate::formatter::{default_template_for, format_execution_output};
use crate::intent_queue::IntentQueue;
use crate::primitives::LoopHandle;

/// Session-scope state the Invariants section (§3) calls out as living
/// outside any single handler.
#[derive(Default)]
struct SessionState {
    current_handler: Option<String>,
    expecting: Option<ValueCategory>,
}

/// The cooperative "ready for a new turn" handshake §5 calls `mgrPromise` /
/// `mgrResolve`: external callers await `ready()` before assuming a pushed
/// command will be picked up promptly; `run()` flips it closed while a turn
/// is in flight and reopens it once it's back at the top of the loop.
#[derive(Default)]
struct Handshake {
    accepting: AtomicBool,
    notify: Notify,
}

impl Handshake {
    fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
        if accepting {
            self.notify.notify_waiters();
        }
    }

    async fn ready(&self) {
        while !self.accepting.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
    }
}

/// §2 C8: the top-level driver. Owns both intent queues, every statically
/// configured handler, an optional dynamic handler source (§4.5), and the
/// `LoopHandle` passed by reference into every `get_reply` call.
pub struct DialogueLoop {
    user_queue: Arc<IntentQueue<UserInput>>,
    notify_queue: Arc<IntentQueue<QueueItem>>,
    delegate: Arc<dyn Delegate>,
    loop_handle: Arc<LoopHandle>,
    static_handlers: Vec<HandlerEntry>,
    dynamic_handlers: Option<Arc<dyn DynamicHandlerSource>>,
    state: Mutex<SessionState>,
    handshake: Handshake,
    stopped: AtomicBool,
}

impl DialogueLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        delegate: Arc<dyn Delegate>,
        loop_handle: Arc<LoopHandle>,
        user_queue: Arc<IntentQueue<UserInput>>,
        notify_queue: Arc<IntentQueue<QueueItem>>,
        static_handlers: Vec<HandlerEntry>,
        dynamic_handlers: Option<Arc<dyn DynamicHandlerSource>>,
    ) -> Self {
        Self {
            user_queue,
            notify_queue,
            delegate,
            loop_handle,
            static_handlers,
            dynamic_handlers,
            state: Mutex::new(SessionState::default()),
            handshake: Handshake::default(),
            stopped: AtomicBool::new(false),
        }
    }

    async fn all_handlers(&self) -> Vec<HandlerEntry> {
        let mut entries = self.static_handlers.clone();
        if let Some(source) = &self.dynamic_handlers {
            entries.extend(source.current_handlers().await);
        }
        entries
    }

    fn find_handler<'a>(entries: &'a [HandlerEntry], id: &str) -> Option<&'a HandlerEntry> {
        entries.iter().find(|(hid, _)| hid == id)
    }

    /// §6 `start(showWelcome, initialState)`: runs every handler's
    /// `initialize`, emits the highest-priority non-empty welcome reply,
    /// and opens the handshake for the first `run()` iteration.
    pub async fn start(&self, show_welcome: bool, initial_state: Option<serde_json::Value>) -> anyhow::Result<()> {
        let entries = self.all_handlers().await;
        let mut best: Option<(i32, Option<String>, ReplyResult)> = None;
        for (id, handler) in &entries {
            let mut guard = handler.lock().await;
            let prev = initial_state.as_ref().and_then(|s| s.get(id).cloned());
            if let Some(reply) = guard.initialize(prev, show_welcome).await? {
                let priority = guard.priority();
                let better = best.as_ref().map(|(p, _, _)| priority > *p).unwrap_or(true);
                if better {
                    best = Some((priority, guard.icon().map(str::to_string), reply));
                }
            }
        }
        if let Some((_, icon, reply)) = best {
            self.loop_handle.set_icon(icon);
            self.deliver(reply).await?;
        }
        self.handshake.set_accepting(true);
        Ok(())
    }

    /// §6 `handleCommand`: routes `input` the way `pushCommand` would, then
    /// waits for the handshake to reopen, i.e. for the resulting turn
    /// (including any multi-turn sub-dialogue it starts) to finish.
    pub async fn handle_command(&self, input: UserInput) -> anyhow::Result<()> {
        self.push_command(input);
        self.handshake.ready().await;
        Ok(())
    }

    /// §6 `pushCommand`: fire-and-forget. Goes straight to the user queue
    /// when a sub-dialogue primitive is currently parked on it; otherwise
    /// enters through the notify queue like any other `QueueItem` (§5 —
    /// push rights mirror pop rights, so only whichever queue the loop is
    /// actually waiting on may receive a raw `UserInput`).
    pub fn push_command(&self, input: UserInput) {
        if self.user_queue.is_waiting() {
            self.user_queue.push(input);
        } else {
            self.notify_queue.push(QueueItem::user_input(input));
        }
    }

    /// §6 `dispatchNotify`.
    pub fn dispatch_notify(&self, app_id: impl Into<String>, app_name: impl Into<String>, output_type: impl Into<String>, output_value: serde_json::Value) {
        self.notify_queue.push(QueueItem::Notification {
            app_id: app_id.into(),
            app_name: app_name.into(),
            output_type: output_type.into(),
            output_value,
        });
    }

    /// §6 `dispatchNotifyError`.
    pub fn dispatch_notify_error(&self, app_id: impl Into<String>, app_name: impl Into<String>, error: impl Into<String>) {
        self.notify_queue.push(QueueItem::Error { app_id: app_id.into(), app_name: app_name.into(), error: error.into() });
    }

    /// §6 `reset()`: interrupts whichever queue currently has a parked
    /// waiter (cancelling an in-flight sub-dialogue, if any) and clears
    /// session state (§3 Invariants). An inactivity timer (§5 Timeouts,
    /// `SessionConfig::inactivity_timeout_secs`) calls this the same way an
    /// explicit reset request does, without tearing the loop down.
    pub async fn reset(&self) -> anyhow::Result<()> {
        self.cancel_current_wait(DialogueError::Cancelled);
        self.reset_session_state().await;
        Ok(())
    }

    /// §6 `stop()`: marks the loop stopped, waits for the current turn to
    /// finish, then cancels whichever queue has a waiter so `run()` unwinds
    /// out of its final `pop`.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.handshake.ready().await;
        self.cancel_current_wait(DialogueError::Cancelled);
        Ok(())
    }

    /// §6 `getState()`: per-handler opaque state keyed by `uniqueId`.
    pub async fn get_state(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (id, handler) in &self.all_handlers().await {
            map.insert(id.clone(), handler.lock().await.get_state());
        }
        serde_json::Value::Object(map)
    }

    fn cancel_current_wait(&self, err: DialogueError) {
        if self.user_queue.is_waiting() {
            self.user_queue.cancel_wait(err);
        } else {
            self.notify_queue.cancel_wait(err);
        }
    }

    async fn reset_session_state(&self) {
        for (_, handler) in &self.all_handlers().await {
            handler.lock().await.reset();
        }
        let mut state = self.state.lock().await;
        state.current_handler = None;
        state.expecting = None;
        self.loop_handle.set_icon(None);
    }

    /// §4.8's outer `while not stopped` loop: wait for the next notify-queue
    /// item, dispatch it, and recover from whatever it throws per §7.
    pub async fn run(&self) -> anyhow::Result<()> {
        while !self.stopped.load(Ordering::SeqCst) {
            self.handshake.set_accepting(true);
            let item = self.notify_queue.pop().await;
            self.handshake.set_accepting(false);

            match item {
                Ok(QueueItem::UserInput { command }) => {
                    if let Err(err) = self.handle_user_input(command).await {
                        self.handle_loop_error(err, false).await;
                    }
                }
                Ok(QueueItem::Notification { app_id, app_name, output_type, output_value }) => {
                    if let Err(err) = self.handle_notification(&app_id, &app_name, &output_type, output_value).await {
                        self.handle_loop_error(err, true).await;
                    }
                }
                Ok(QueueItem::Error { app_id, app_name, error }) => {
                    if let Err(err) = self.handle_api_error(&app_id, &app_name, &error).await {
                        self.handle_loop_error(err, true).await;
                    }
                }
                Err(DialogueError::Cancelled) => {
                    self.reset_session_state().await;
                }
                Err(other) => {
                    tracing::warn!(error = %other, "error waiting for next queue item");
                }
            }
        }
        Ok(())
    }

    /// §4.8 `handleUserInput`: analyze every handler, arbitrate, dispatch
    /// STOP/DEBUG, otherwise invoke the winner and loop directly on the
    /// user queue while `expecting` stays set (§4.8, §5 ordering
    /// guarantees — no notification interleaves during that inner loop).
    async fn handle_user_input(&self, mut input: UserInput) -> anyhow::Result<()> {
        loop {
            let entries = self.all_handlers().await;
            let current = self.state.lock().await.current_handler.clone();

            let mut candidates = Vec::with_capacity(entries.len());
            for (id, handler) in &entries {
                let guard = handler.lock().await;
                let analysis = guard.analyze_command(&input).await?;
                candidates.push(crate::arbiter::HandlerCandidate {
                    unique_id: id.clone(),
                    priority: guard.priority(),
                    is_current: current.as_deref() == Some(id.as_str()),
                    analysis,
                });
            }

            match arbitrate(&candidates) {
                Decision::Stop => {
                    self.reset_session_state().await;
                    self.deliver(ReplyResult::default()).await?;
                    return Ok(());
                }
                Decision::Debug(id) => {
                    let state = self.get_state().await;
                    tracing::info!(handler = %id, state = %state, "debug dump requested");
                    self.deliver(ReplyResult::text(format!("state: {state}")).ending()).await?;
                    return Ok(());
                }
                Decision::NoMatch => {
                    self.deliver(ReplyResult::text("Sorry, I didn't understand that.").ending()).await?;
                    return Ok(());
                }
                Decision::Handler(id) => {
                    let (_, handler) = Self::find_handler(&entries, &id)
                        .ok_or_else(|| anyhow::anyhow!("arbiter picked unknown handler id: {id}"))?;
                    let analysis = candidates.into_iter().find(|c| c.unique_id == id).expect("winner is among candidates").analysis;

                    {
                        let mut state = self.state.lock().await;
                        state.current_handler = Some(id.clone());
                    }

                    let reply = {
                        let mut guard = handler.lock().await;
                        self.loop_handle.set_icon(guard.icon().map(str::to_string));
                        guard.get_reply(analysis, self.loop_handle.as_ref()).await
                    };

                    match reply {
                        Ok(reply) => {
                            let expecting = reply.expecting;
                            self.deliver(reply).await?;
                            self.state.lock().await.expecting = expecting;
                            if expecting.is_none() {
                                return Ok(());
                            }
                            input = match self.user_queue.pop().await {
                                Ok(next) => next,
                                Err(DialogueError::Cancelled) => {
                                    self.deliver(ReplyResult::text("Sorry I couldn't help on that.").ending()).await?;
                                    self.reset_session_state().await;
                                    return Ok(());
                                }
                                Err(other) => return Err(other.into()),
                            };
                        }
                        Err(err) => return self.recover_get_reply_error(err).await,
                    }
                }
            }
        }
    }

    /// §7's error taxonomy as seen from `get_reply`. `Cancelled` is the
    /// `special:nevermind` path (§6 — literal apology text, then reset);
    /// `ServiceOutage` apologizes and resets the same way; `Parse` ends the
    /// turn without losing the session; anything else is logged and
    /// reported, also without a reset (§7's "unexpected exception" row).
    async fn recover_get_reply_error(&self, err: anyhow::Error) -> anyhow::Result<()> {
        match err.downcast::<DialogueError>() {
            Ok(DialogueError::Cancelled) => {
                self.deliver(ReplyResult::text("Sorry I couldn't help on that.").ending()).await?;
                self.reset_session_state().await;
                Ok(())
            }
            Ok(DialogueError::ServiceOutage(msg)) => {
                self.deliver(ReplyResult::text(format!("Sorry, I'm having trouble reaching that service right now: {msg}.")).ending()).await?;
                self.reset_session_state().await;
                Ok(())
            }
            Ok(DialogueError::Parse(_)) => {
                self.deliver(ReplyResult::text("Sorry, I don't know how to do that yet.").ending()).await?;
                Ok(())
            }
            Ok(other) => {
                tracing::error!(error = %other, "unexpected error inside get_reply");
                self.deliver(ReplyResult::text(format!("Sorry, I had an error processing your command: {other}.")).ending()).await?;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "unexpected error inside get_reply");
                self.deliver(ReplyResult::text(format!("Sorry, I had an error processing your command: {err}.")).ending()).await?;
                Ok(())
            }
        }
    }

    /// §4.4.5 / §8 scenario 6: render a skill's out-of-band result as an
    /// RDL card plus the same text/picture rendering the formatter gives a
    /// synchronous execution, ending with `ask_special null` since no
    /// sub-dialogue is in flight to keep listening.
    async fn handle_notification(&self, app_id: &str, app_name: &str, output_type: &str, output_value: serde_json::Value) -> anyhow::Result<()> {
        let output = ExecutionOutput { output_type: output_type.to_string(), output_value };
        let mut messages = vec![parley_model::ReplyMessage::Rdl {
            display_title: app_name.to_string(),
            web_callback: format!("https://thingpedia.example/devices/{app_id}"),
        }];
        messages.extend(format_execution_output(&output, default_template_for(output_type)));
        self.deliver(ReplyResult { messages, expecting: None, end: true, context: Some(app_id.to_string()), agent_target: None }).await
    }

    /// §7: an out-of-band executor failure becomes a per-notification
    /// apology; it never touches session state since no sub-dialogue owns
    /// this turn.
    async fn handle_api_error(&self, app_id: &str, app_name: &str, error: &str) -> anyhow::Result<()> {
        tracing::warn!(app_id, app_name, error, "notification delivery reported an error");
        self.deliver(ReplyResult::text(format!("Sorry, that did not work: {error}.")).ending()).await
    }

    /// §7's catch-all: something in `dispatch`'s own handling (not
    /// `get_reply`) failed unexpectedly. Logged and reported best-effort;
    /// the loop keeps running either way.
    async fn handle_loop_error(&self, err: anyhow::Error, is_api_item: bool) {
        tracing::error!(error = %err, "unexpected error in dialogue loop");
        let text = if is_api_item {
            format!("Sorry, that did not work: {err}.")
        } else {
            format!("Sorry, I had an error processing your command: {err}.")
        };
        let _ = self.deliver(ReplyResult::text(text).ending()).await;
    }

    async fn deliver(&self, reply: ReplyResult) -> anyhow::Result<()> {
        crate::delegate::deliver_all(self.delegate.as_ref(), &reply.messages, self.loop_handle.icon().as_deref()).await?;
        self.delegate.send_ask_special(crate::delegate::ask_special_kind_for(reply.expecting)).await
    }
}
