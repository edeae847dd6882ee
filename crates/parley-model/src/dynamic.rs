// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The seam the dialogue loop uses to pull in handlers that come and go at
//! runtime (§2 C5, §4.5) without depending on whatever crate actually
//! builds them. Kept in this crate (rather than alongside the loop) for the
//! same reason as `LoopCapabilities`: the concrete registry lives one layer
//! over, and the loop should only ever see the trait.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::handler::Handler;

/// A handler plus the lock serializing its `&mut self` methods — `get_reply`
/// may suspend across `.await` points inside a sub-dialogue primitive, so a
/// `std::sync::Mutex` would hold its guard across a suspension point.
pub type SharedHandler = Arc<Mutex<Box<dyn Handler>>>;

/// `(unique_id, handler)`, matching how the loop keys its handler list and
/// its `current_handler` bookkeeping (§3).
pub type HandlerEntry = (String, SharedHandler);

/// Implemented by whatever attaches/detaches handlers as devices come and
/// go (§4.5's device-view-driven registry). The loop polls this once per
/// arbitration round rather than subscribing to change events, keeping its
/// own control flow free of a second event source (§5 — "pick one
/// concurrency style and commit").
#[async_trait]
pub trait DynamicHandlerSource: Send + Sync {
    async fn current_handlers(&self) -> Vec<HandlerEntry>;
}

/// Wrap a batch of statically-constructed handlers into the `(unique_id,
/// shared handler)` entries `DialogueLoop::new` expects, keying each by its
/// own `Handler::unique_id()` rather than asking the caller to repeat it.
pub fn handler_entries(handlers: Vec<Box<dyn Handler>>) -> Vec<HandlerEntry> {
    handlers
        .into_iter()
        .map(|handler| (handler.unique_id().to_string(), Arc::new(Mutex::new(handler))))
        .collect()
}
