// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The formal-program handler (§2 C4, §4.4): the one handler that drives a
//! parsed program through disambiguation, slot filling, confirmation,
//! execution, and formatting, plus the two side entrances into that same
//! pipeline — the guided rule builder (`special:makerule`) and remote
//! program composition.
use std::sync::Mutex as StdMutex;
use std::sync::Arc;

use async_trait::async_trait;

use parley_model::{
    AnalysisType, CommandAnalysisResult, DialogueError, Handler, LoopCapabilities, ReplyMessage, ReplyResult, UserInput,
};

use crate::executor::Executor;
use crate::pipeline;
use crate::program::{ProgramAst, ProgramParser};
use crate::program_store::ProgramStore;
use crate::remote::split_remote_program;
use crate::rulebuilder::{run_rule_builder, RuleBuilderCatalog};

/// Bridges a bookkeeping `UserInput` into the short synthetic utterance
/// string carried on `CommandAnalysisResult` — `analyze_command` is pure,
/// so it cannot stash the original `UserInput`; this string plus the
/// handler's own memoized parse (see `pending`) is everything `get_reply`
/// gets to work with.
fn describe(input: &UserInput) -> String {
    if input.is_nevermind() {
        return "special:nevermind".to_string();
    }
    if let Some(i) = input.as_choice() {
        return format!("choice:{i}");
    }
    if let Some(special) = input.as_special() {
        return format!("special:{special}");
    }
    match input {
        UserInput::Command { utterance, .. } => utterance.clone(),
        UserInput::Program { .. } => "program".to_string(),
        UserInput::Parsed { code, .. } => code.join(" "),
    }
}

/// Implements the `Handler` contract for the out-of-scope formal
/// parser/type-checker's output (§1, §4.4). `pending` memoizes the AST
/// `analyze_command` just parsed so `get_reply`, called immediately after
/// on the same turn if this handler wins arbitration, doesn't reparse.
pub struct FormalProgramHandler {
    unique_id: String,
    priority: i32,
    parser: Arc<dyn ProgramParser>,
    executor: Arc<dyn Executor>,
    catalog: RuleBuilderCatalog,
    page_size: usize,
    installed: Arc<ProgramStore>,
    pending: StdMutex<Option<(String, ProgramAst)>>,
}

impl FormalProgramHandler {
    pub fn new(
        unique_id: impl Into<String>,
        priority: i32,
        parser: Arc<dyn ProgramParser>,
        executor: Arc<dyn Executor>,
        catalog: RuleBuilderCatalog,
        page_size: usize,
        installed: Arc<ProgramStore>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            priority,
            parser,
            executor,
            catalog,
            page_size,
            installed,
            pending: StdMutex::new(None),
        }
    }

    /// The store backing §4.4.6/§4.4.8's "installed" programs — standing
    /// rules from the rule builder, and both halves of a remote split.
    /// Exposed so callers (e.g. `/state`) can inspect what's been installed.
    pub fn installed_programs(&self) -> Arc<ProgramStore> {
        self.installed.clone()
    }

    fn take_pending(&self, utterance: &str) -> Option<ProgramAst> {
        let mut guard = self.pending.lock().expect("pending lock poisoned");
        match guard.take() {
            Some((cached_utterance, ast)) if cached_utterance == utterance => Some(ast),
            other => {
                *guard = other;
                None
            }
        }
    }

    /// Drive a fully-parsed program through disambiguation, slot filling,
    /// confirmation, and either execution (one-shot) or installation as a
    /// standing rule / remote program (§4.4.3-§4.4.5, §4.4.8). `confirmed`
    /// skips the final yes/no when the caller already obtained one — the
    /// rule builder's own "Run it: ...?" step doubles as that confirmation
    /// (§4.4.6), so asking again would repeat the prompt.
    async fn finish_program(
        &self,
        mut ast: ProgramAst,
        loop_handle: &(dyn LoopCapabilities + Send + Sync),
        confirmed: bool,
    ) -> Result<ReplyResult, DialogueError> {
        pipeline::disambiguate_devices(&mut ast, loop_handle).await?;
        pipeline::fill_slots(&mut ast, loop_handle).await?;

        if !confirmed && !pipeline::confirm(&ast, loop_handle).await? {
            return Ok(ReplyResult::text("Ok, never mind.").ending());
        }

        if let Some(split) = split_remote_program(&ast) {
            self.installed.install(None, split.local_monitor);
            self.installed.install(Some(split.principal.clone()), split.remote);
            loop_handle.emit(vec![ReplyMessage::text(format!("Ok, I'll send this to {}.", split.principal))]).await?;
            return Ok(ReplyResult { end: true, agent_target: Some(split.principal), ..Default::default() });
        }

        if !ast.is_one_shot {
            let prose = ast.confirmation_prose();
            self.installed.install(None, ast);
            return Ok(ReplyResult::text(format!("Ok, I'll {prose} from now on.")).ending());
        }

        let messages = pipeline::execute_and_format(&ast, self.executor.as_ref()).await;
        Ok(ReplyResult { messages, end: true, ..Default::default() })
    }

    async fn run_program(&self, ast: ProgramAst, loop_handle: &(dyn LoopCapabilities + Send + Sync)) -> Result<ReplyResult, DialogueError> {
        self.finish_program(ast, loop_handle, false).await
    }

    async fn run_makerule(&self, loop_handle: &(dyn LoopCapabilities + Send + Sync)) -> Result<ReplyResult, DialogueError> {
        match run_rule_builder(loop_handle, &self.catalog, self.page_size).await? {
            Some(ast) => self.finish_program(ast, loop_handle, true).await,
            None => Ok(ReplyResult::text("Ok, never mind.").ending()),
        }
    }
}

#[async_trait]
impl Handler for FormalProgramHandler {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn initialize(&mut self, _prev_state: Option<serde_json::Value>, _show_welcome: bool) -> anyhow::Result<Option<ReplyResult>> {
        Ok(None)
    }

    /// Pure classification (§4.3). Most bookkeeping tokens (choice
    /// answers, `special:yes`/`no`/`back`/`more`/`nevermind`, ...) are only
    /// ever continuations of this handler's own in-flight sub-dialogue, so
    /// they're reported as `ConfidentInDomainFollowup` — the arbiter's R3
    /// rule (§4.6) discards them unless this handler is already current.
    /// `special:makerule` is different: per §6's control vocabulary it must
    /// be selectable from a cold session (there is no in-progress rule
    /// builder yet for it to be a followup *of*), so it's reported as an
    /// ordinary `ConfidentInDomainCommand` instead. A fresh free-form
    /// utterance is classified by attempting the (out-of-scope) parse; a
    /// successful parse is memoized for the immediately following
    /// `get_reply` call.
    async fn analyze_command(&self, input: &UserInput) -> anyhow::Result<CommandAnalysisResult> {
        let utterance = describe(input);

        if utterance == "special:makerule" {
            return Ok(CommandAnalysisResult::new(AnalysisType::ConfidentInDomainCommand, utterance));
        }

        if matches!(input, UserInput::Parsed { code, .. } if code.first().map(String::as_str) == Some("bookkeeping")) {
            return Ok(CommandAnalysisResult::new(AnalysisType::ConfidentInDomainFollowup, utterance));
        }

        match self.parser.parse(input).await {
            Ok(Some(ast)) => {
                *self.pending.lock().expect("pending lock poisoned") = Some((utterance.clone(), ast));
                Ok(CommandAnalysisResult::new(AnalysisType::ConfidentInDomainCommand, utterance))
            }
            Ok(None) => Ok(CommandAnalysisResult::out_of_domain(utterance)),
            Err(_) => Ok(CommandAnalysisResult::out_of_domain(utterance)),
        }
    }

    async fn get_reply(
        &mut self,
        analysis: CommandAnalysisResult,
        loop_handle: &(dyn LoopCapabilities + Send + Sync),
    ) -> anyhow::Result<ReplyResult> {
        if analysis.utterance == "special:makerule" {
            return Ok(self.run_makerule(loop_handle).await?);
        }

        let ast = match self.take_pending(&analysis.utterance) {
            Some(ast) => ast,
            None => {
                // Defensive: only reachable if `analyze_command` wasn't
                // called for this exact turn (a loop-driver bug, not a
                // user-facing condition).
                return Ok(ReplyResult::text("Sorry, I lost track of that request.").ending());
            }
        };

        Ok(self.run_program(ast, loop_handle).await?)
    }

    fn get_state(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    fn reset(&mut self) {
        *self.pending.lock().expect("pending lock poisoned") = None;
    }
}
