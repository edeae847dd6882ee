// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Error taxonomy shared by sub-dialogue primitives, handlers, and the loop
/// (§7). Handlers never see another handler's errors — each `get_reply`
/// call only ever observes errors raised by primitives it invoked itself.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// `ECANCELLED` — voluntary abort of the current sub-dialogue (§7).
    #[error("cancelled")]
    Cancelled,
    /// NLU/NLG or other network collaborator outage (§7).
    #[error("service unavailable: {0}")]
    ServiceOutage(String),
    /// The formal-program parser/type-checker rejected the input (§7).
    #[error("parse error: {0}")]
    Parse(String),
    /// An executor reported a failure while delivering a result (§7).
    #[error("executor error: {0}")]
    Executor(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DialogueError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DialogueError::Cancelled)
    }
}
