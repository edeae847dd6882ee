// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The standard program pipeline (§4.4 steps 1-5): slot filling,
//! disambiguation, confirmation, execution, and result formatting. Shared
//! by the plain-command path and the rule-builder/remote-program paths
//! once they've produced a `ProgramAst`.
use parley_model::{DialogueError, LoopCapabilities, ReplyMessage, ValueCategory};

use crate::executor::Executor;
use crate::formatter::{default_template_for, format_execution_output};
use crate::program::{DeviceCandidate, ProgramAst};

/// Ask the user to disambiguate every device slot that has more than one
/// candidate, in declaration order (§4.4.3). Slots with a single
/// candidate are already auto-resolved by `ProgramAst::with_device_choice`.
pub async fn disambiguate_devices(ast: &mut ProgramAst, loop_handle: &(dyn LoopCapabilities + Send + Sync)) -> Result<(), DialogueError> {
    loop {
        let Some(slot) = ast.next_unresolved_device() else { return Ok(()) };
        let slot_name = slot.slot_name.clone();
        let titles: Vec<String> = slot.candidates.iter().map(|c: &DeviceCandidate| c.display_name.clone()).collect();
        let prompt = ReplyMessage::text(format!("Which {slot_name} do you mean?"));
        let index = loop_handle.ask_choices(prompt, titles).await?;
        ast.resolve_device(&slot_name, index).map_err(DialogueError::Other)?;
    }
}

/// Ask for every undefined required parameter, in the program's declared
/// slot order, deriving each question's `ValueCategory` from the
/// parameter's own declared category (§4.4.2).
pub async fn fill_slots(ast: &mut ProgramAst, loop_handle: &(dyn LoopCapabilities + Send + Sync)) -> Result<(), DialogueError> {
    loop {
        let Some((name, category)) = ast.next_missing_param() else { return Ok(()) };
        let name = name.to_string();
        let value = ask_for_value(name.as_str(), category, loop_handle).await?;
        ast.set_param(&name, value);
    }
}

async fn ask_for_value(name: &str, category: ValueCategory, loop_handle: &(dyn LoopCapabilities + Send + Sync)) -> Result<serde_json::Value, DialogueError> {
    match category {
        ValueCategory::Contact => {
            let input = loop_handle.ask(category, ReplyMessage::text(format!("Who should I use for {name}?"))).await?;
            let query = raw_text(&input).unwrap_or_default();
            let matches = loop_handle.lookup_contact("phone_number", &query).await;
            match matches.len() {
                0 => Ok(serde_json::json!(query)),
                1 => Ok(serde_json::json!(matches[0].value)),
                _ => {
                    let titles: Vec<String> = matches.iter().map(|c| c.display_name.clone()).collect();
                    let idx = loop_handle.ask_choices(ReplyMessage::text("Which one?"), titles).await?;
                    Ok(serde_json::json!(matches[idx].value))
                }
            }
        }
        ValueCategory::Location => {
            let input = loop_handle.ask(category, ReplyMessage::text(format!("What location for {name}?"))).await?;
            let query = raw_text(&input).unwrap_or_default();
            let loc = loop_handle.lookup_location(&query, None).await?;
            Ok(serde_json::to_value(loc).unwrap_or(serde_json::Value::Null))
        }
        _ => {
            let input = loop_handle.ask(category, ReplyMessage::text(format!("What should {name} be?"))).await?;
            Ok(raw_text(&input).map(serde_json::Value::String).unwrap_or(serde_json::Value::Null))
        }
    }
}

fn raw_text(input: &parley_model::UserInput) -> Option<String> {
    match input {
        parley_model::UserInput::Command { utterance, .. } => Some(utterance.clone()),
        parley_model::UserInput::Parsed { entities, .. } => entities.get("answer").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

/// Render the finished program as prose and ask yes/no before enqueueing
/// it for execution (§4.4.4). Returns `false` on a plain "no" (the caller
/// ends the turn without executing); unwinds with `Cancelled` on
/// `special:nevermind`, same as every other primitive.
pub async fn confirm(ast: &ProgramAst, loop_handle: &(dyn LoopCapabilities + Send + Sync)) -> Result<bool, DialogueError> {
    let prose = ast.confirmation_prose();
    let answer = loop_handle.ask(ValueCategory::YesNo, ReplyMessage::text(format!("Ok, so: {prose}. Is that right?"))).await?;
    Ok(answer.as_special() == Some("yes"))
}

/// Execute a confirmed program and format every result (§4.4.5). Executor
/// errors become per-result apology messages (§7) and do not abort the
/// remaining results.
pub async fn execute_and_format(ast: &ProgramAst, executor: &dyn Executor) -> Vec<ReplyMessage> {
    match executor.execute(ast).await {
        Ok(outputs) => outputs
            .iter()
            .flat_map(|output| format_execution_output(output, default_template_for(&ast.function_name)))
            .collect(),
        Err(DialogueError::Executor(msg)) => vec![ReplyMessage::text(format!("Sorry, that did not work: {msg}."))],
        Err(_) => vec![ReplyMessage::text("Sorry, that did not work.")],
    }
}
