// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The executor boundary (§4.4.5): runs a confirmed program and streams
//! back result tuples for the formatter to render. Real skill execution
//! is out of scope (§1); this is a narrow trait plus a deterministic mock.
use async_trait::async_trait;
use serde_json::Value;

use parley_model::DialogueError;

use crate::program::ProgramAst;

/// One `{outputType, outputValue}` pair produced by a running program
/// (§4.4.5, §3 `QueueItem::Notification` shares this shape for the
/// out-of-band case).
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutput {
    pub output_type: String,
    pub output_value: Value,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `program` to completion and return every result tuple it
    /// produced. A `DialogueError::Executor` here becomes a per-result
    /// "that did not work" reply (§7) without cancelling the session.
    async fn execute(&self, program: &ProgramAst) -> Result<Vec<ExecutionOutput>, DialogueError>;
}

/// Canned results keyed by function name, enough to drive the formatter
/// and the executor-error path end to end without a real skill runtime.
#[derive(Debug, Default)]
pub struct MockExecutor;

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, program: &ProgramAst) -> Result<Vec<ExecutionOutput>, DialogueError> {
        match program.function_name.as_str() {
            "com.xkcd.get_comic" => Ok(vec![ExecutionOutput {
                output_type: "com.xkcd:get_comic".into(),
                output_value: serde_json::json!({
                    "title": "Python",
                    "link": "https://xkcd.com/353/",
                    "picture_url": "https://imgs.xkcd.com/comics/python.png",
                }),
            }]),
            "com.twitter.post" | "com.twitter.post_picture" => {
                Ok(vec![ExecutionOutput { output_type: "com.twitter:post".into(), output_value: serde_json::json!({"status": "ok"}) }])
            }
            "org.thingpedia.weather" => {
                Ok(vec![ExecutionOutput { output_type: "org.thingpedia:weather".into(), output_value: serde_json::json!({"temperature": 68}) }])
            }
            "com.broken.fail" => Err(DialogueError::Executor("service returned 500".into())),
            other => Err(DialogueError::Executor(format!("no mock result for {other}"))),
        }
    }
}
