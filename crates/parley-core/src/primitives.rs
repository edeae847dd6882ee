// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! `LoopHandle`: the "narrow loop capabilities object" (§9 design notes)
//! passed by reference into `Handler::get_reply`, implementing every §4.7
//! sub-dialogue primitive. Keeping this separate from `DialogueLoop`
//! avoids a handler → loop ownership cycle — a handler only ever borrows
//! `&dyn LoopCapabilities`.
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;

use parley_model::{Contact, DialogueError, Location, LoopCapabilities, ReplyMessage, UserInput, ValueCategory};
use parley_runtime::{ContactProvider, ContextVarResolver, Decision, LocationResolver, PermissionRule, PermissionStore, ProgramFilter};

use crate::delegate::{ask_special_kind_for, deliver_all, Delegate};
use crate::intent_queue::IntentQueue;

/// Shape-check used to decide whether a freshly arrived `UserInput`
/// satisfies the category a primitive is currently waiting on (§4.7, and
/// the Invariants section's "a mismatching input is coerced into
/// OUT_OF_DOMAIN_COMMAND"). `Generic` accepts anything (§3
/// `ValueCategory::is_generic`).
pub fn matches_category(input: &UserInput, category: ValueCategory) -> bool {
    if category.is_generic() {
        return true;
    }
    match category {
        ValueCategory::YesNo => matches!(input.as_special(), Some("yes") | Some("no") | Some("maybe")),
        ValueCategory::Choice => input.as_choice().is_some(),
        ValueCategory::Command => matches!(input, UserInput::Command { .. }),
        ValueCategory::Number => raw_answer(input).map(|s| s.trim().parse::<f64>().is_ok()).unwrap_or(false),
        ValueCategory::RawString | ValueCategory::Password | ValueCategory::PhoneNumber | ValueCategory::EmailAddress => {
            raw_answer(input).is_some()
        }
        ValueCategory::Location | ValueCategory::Time | ValueCategory::Date | ValueCategory::Contact => raw_answer(input).is_some(),
        ValueCategory::Generic => true,
    }
}

/// Pull a plain string answer out of whichever `UserInput` shape carries
/// one — a free-form command, or a `["bookkeeping","answer",...]` token
/// with a string entity.
fn raw_answer(input: &UserInput) -> Option<String> {
    match input {
        UserInput::Command { utterance, .. } => Some(utterance.clone()),
        UserInput::Parsed { code, entities, .. } if code.first().map(String::as_str) == Some("bookkeeping") => {
            entities.get("answer").and_then(|v| v.as_str()).map(str::to_string)
        }
        _ => None,
    }
}

pub struct LoopHandle {
    user_queue: Arc<IntentQueue<UserInput>>,
    delegate: Arc<dyn Delegate>,
    icon: StdMutex<Option<String>>,
    contacts: Arc<dyn ContactProvider>,
    locations: Arc<dyn LocationResolver>,
    context_vars: Arc<ContextVarResolver>,
    permissions: Arc<PermissionStore>,
}

impl LoopHandle {
    pub fn new(
        user_queue: Arc<IntentQueue<UserInput>>,
        delegate: Arc<dyn Delegate>,
        contacts: Arc<dyn ContactProvider>,
        locations: Arc<dyn LocationResolver>,
        context_vars: Arc<ContextVarResolver>,
        permissions: Arc<PermissionStore>,
    ) -> Self {
        Self { user_queue, delegate, icon: StdMutex::new(None), contacts, locations, context_vars, permissions }
    }

    pub fn set_icon(&self, icon: Option<String>) {
        *self.icon.lock().expect("icon lock poisoned") = icon;
    }

    pub(crate) fn icon(&self) -> Option<String> {
        self.icon.lock().expect("icon lock poisoned").clone()
    }

    async fn prompt(&self, messages: &[ReplyMessage], category: ValueCategory) -> anyhow::Result<()> {
        deliver_all(self.delegate.as_ref(), messages, self.icon().as_deref()).await?;
        self.delegate.send_ask_special(ask_special_kind_for(Some(category))).await
    }

    /// Shared loop for `ask`/`ask_question`: prompt, wait for a matching
    /// answer, re-prompt on mismatch, unwind on `special:nevermind` (§4.7,
    /// §8 boundary behaviors — "Empty/unrecognized yes-no answer is
    /// re-prompted ... and keeps expecting=YesNo").
    async fn ask_loop(&self, category: ValueCategory, prompt: ReplyMessage, reprompt: &str) -> Result<UserInput, DialogueError> {
        self.prompt(&[prompt], category).await.map_err(DialogueError::Other)?;
        loop {
            let input = self.user_queue.pop().await?;
            if input.is_nevermind() {
                return Err(DialogueError::Cancelled);
            }
            if matches_category(&input, category) {
                return Ok(input);
            }
            self.prompt(&[ReplyMessage::text(reprompt)], category).await.map_err(DialogueError::Other)?;
        }
    }
}

#[async_trait]
impl LoopCapabilities for LoopHandle {
    async fn ask(&self, category: ValueCategory, prompt: ReplyMessage) -> Result<UserInput, DialogueError> {
        let reprompt = match category {
            ValueCategory::YesNo => "Yes what?",
            _ => "Sorry, I didn't get that.",
        };
        self.ask_loop(category, prompt, reprompt).await
    }

    async fn ask_choices(&self, prompt: ReplyMessage, choices: Vec<String>) -> Result<usize, DialogueError> {
        let mut messages = vec![prompt];
        messages.extend(choices.iter().enumerate().map(|(i, title)| ReplyMessage::Choice { index: i, title: title.clone() }));
        self.prompt(&messages, ValueCategory::Choice).await.map_err(DialogueError::Other)?;
        loop {
            let input = self.user_queue.pop().await?;
            if input.is_nevermind() {
                return Err(DialogueError::Cancelled);
            }
            if let Some(i) = input.as_choice() {
                if i < choices.len() {
                    return Ok(i);
                }
            }
            self.prompt(&[ReplyMessage::text("Please pick one of the options above.")], ValueCategory::Choice)
                .await
                .map_err(DialogueError::Other)?;
        }
    }

    async fn ask_question(&self, _skill: &str, category: ValueCategory, prompt: ReplyMessage) -> Result<UserInput, DialogueError> {
        self.ask(category, prompt).await
    }

    async fn interactive_configure(&self, kind: Option<String>) -> Result<(), DialogueError> {
        let what = kind.unwrap_or_else(|| "a device".to_string());
        let answer = self
            .ask(ValueCategory::YesNo, ReplyMessage::text(format!("Let's set up {what}. Ready to continue?")))
            .await?;
        match answer.as_special() {
            Some("yes") => Ok(()),
            _ => Err(DialogueError::Cancelled),
        }
    }

    async fn ask_for_permission(&self, source: &str, identity: &str, program: serde_json::Value) -> Result<Option<serde_json::Value>, DialogueError> {
        if let Some(decision) = self.permissions.evaluate(source, identity, &program) {
            return Ok(match decision {
                Decision::Allow => Some(program),
                Decision::Deny => None,
            });
        }
        // Open Question #3 (SPEC_FULL §9): a cancelled waiter inside this
        // primitive is best-effort and resolves to refusal rather than
        // propagating `Cancelled` through the permission flow.
        match self.run_permission_card(source, identity, program).await {
            Ok(result) => Ok(result),
            Err(DialogueError::Cancelled) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn lookup_contact(&self, category: &str, name: &str) -> Vec<Contact> {
        self.contacts.lookup(category, name).await
    }

    async fn lookup_location(&self, key: &str, previous: Option<Location>) -> Result<Location, DialogueError> {
        if let Some(loc) = self.locations.resolve(key).await.map_err(DialogueError::Other)? {
            return Ok(loc);
        }
        if let Some(loc) = previous {
            return Ok(loc);
        }
        let answer = self
            .ask(ValueCategory::Location, ReplyMessage::text(format!("What location do you mean by \"{key}\"?")))
            .await?;
        let query = raw_answer(&answer).unwrap_or_default();
        self.locations
            .resolve(&query)
            .await
            .map_err(DialogueError::Other)?
            .ok_or_else(|| DialogueError::Other(anyhow::anyhow!("could not resolve location: {query}")))
    }

    async fn resolve_user_context(&self, var_name: &str, save_to_context: bool) -> Result<serde_json::Value, DialogueError> {
        if let Some(value) = self.context_vars.lookup(var_name).await.map_err(DialogueError::Other)? {
            return Ok(value);
        }
        let answer = self
            .ask(ValueCategory::RawString, ReplyMessage::text(format!("What should I use for {var_name}?")))
            .await?;
        let value = serde_json::Value::String(raw_answer(&answer).unwrap_or_default());
        if save_to_context {
            self.context_vars.save(var_name, value.clone()).await.map_err(DialogueError::Other)?;
        }
        Ok(value)
    }

    async fn emit(&self, messages: Vec<ReplyMessage>) -> Result<(), DialogueError> {
        deliver_all(self.delegate.as_ref(), &messages, self.icon().as_deref()).await.map_err(DialogueError::Other)
    }

    async fn build_filter_list(&self) -> Result<Vec<(String, String, String)>, DialogueError> {
        let filters = self.run_filter_builder().await?;
        Ok(filters.into_iter().map(|f| (f.path, f.operator, f.value)).collect())
    }
}

impl LoopHandle {
    /// The five-option consent card and, on `only-if`, the filter builder
    /// (§4.4.7). Loops back to the card itself when the only-if
    /// confirmation is declined, per spec.
    async fn run_permission_card(&self, source: &str, identity: &str, program: serde_json::Value) -> Result<Option<serde_json::Value>, DialogueError> {
        let options = vec![
            "Yes, just this once".to_string(),
            "Yes, always from anyone".to_string(),
            format!("Yes, always from {identity}"),
            "No".to_string(),
            "Only if...".to_string(),
        ];
        loop {
            let choice = self
                .ask_choices(ReplyMessage::text(format!("{source} wants to run this program for {identity}. Allow it?")), options.clone())
                .await?;
            match choice {
                0 => return Ok(Some(program)),
                1 => {
                    self.permissions.install(PermissionRule {
                        source_pattern: "*".into(),
                        identity_pattern: "*".into(),
                        filters: vec![],
                        decision: Decision::Allow,
                    });
                    return Ok(Some(program));
                }
                2 => {
                    self.permissions.install(PermissionRule {
                        source_pattern: source.to_string(),
                        identity_pattern: identity.to_string(),
                        filters: vec![],
                        decision: Decision::Allow,
                    });
                    return Ok(Some(program));
                }
                3 => return Ok(None),
                _ => {
                    let filters = self.run_filter_builder().await?;
                    let prose = filters.iter().map(|f| format!("{} {} \"{}\"", f.path, f.operator, f.value)).collect::<Vec<_>>().join(" and ");
                    let confirm = self
                        .ask(ValueCategory::YesNo, ReplyMessage::text(format!("Install this rule: {source} may run this when {prose}?")))
                        .await?;
                    if confirm.as_special() == Some("yes") {
                        self.permissions.install(PermissionRule {
                            source_pattern: source.to_string(),
                            identity_pattern: identity.to_string(),
                            filters: filters.into_iter().map(|f| ProgramFilter { path: f.path, pattern: f.value }).collect(),
                            decision: Decision::Allow,
                        });
                        return Ok(Some(program));
                    }
                    // "on 'no' it loops back to the consent card" (§4.4.7)
                    continue;
                }
            }
        }
    }

    /// Builds a conjunctive filter list by repeatedly asking for `path op
    /// value` triples until the user answers "done" (§4.4.6, §4.4.7).
    pub async fn run_filter_builder(&self) -> Result<Vec<crate::program::ProgramFilter>, DialogueError> {
        let mut filters = Vec::new();
        loop {
            let answer = self
                .ask(
                    ValueCategory::RawString,
                    ReplyMessage::text("Add a filter as \"field operator value\" (e.g. title =~ lol), or say \"done\"."),
                )
                .await?;
            let text = raw_answer(&answer).unwrap_or_default();
            if text.trim().eq_ignore_ascii_case("done") {
                return Ok(filters);
            }
            match parse_filter_triple(&text) {
                Some(filter) => filters.push(filter),
                None => {
                    self.prompt(&[ReplyMessage::text("I didn't understand that filter, try again.")], ValueCategory::RawString)
                        .await
                        .map_err(DialogueError::Other)?;
                }
            }
        }
    }
}

fn parse_filter_triple(text: &str) -> Option<crate::program::ProgramFilter> {
    let parts: Vec<&str> = text.splitn(3, ' ').collect();
    if parts.len() != 3 {
        return None;
    }
    Some(crate::program::ProgramFilter { path: parts[0].to_string(), operator: parts[1].to_string(), value: parts[2].to_string() })
}
