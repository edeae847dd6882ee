// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The intent queue (§2 C1, §4.1): a FIFO with an "at most one parked
//! waiter" invariant and a `cancel_wait` escape hatch used by `stop()` and
//! `reset()` (§5) to wake a suspended `pop` without consuming an item.
use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

use parley_model::DialogueError;

enum Waiter<T> {
    None,
    Parked(oneshot::Sender<Result<T, DialogueError>>),
}

struct State<T> {
    items: VecDeque<T>,
    waiter: Waiter<T>,
}

/// Two of these back §2 C1: the user-input queue and the notify queue.
/// Push is non-blocking; `pop` parks the caller when empty. The single
/// parked-waiter slot is a runtime-checked invariant — a second concurrent
/// `pop` call panics rather than silently queuing, since that would signal
/// a bug in the loop, not a malformed user session (§4.1).
pub struct IntentQueue<T> {
    state: Mutex<State<T>>,
}

impl<T> Default for IntentQueue<T> {
    fn default() -> Self {
        Self { state: Mutex::new(State { items: VecDeque::new(), waiter: Waiter::None }) }
    }
}

impl<T: Send + 'static> IntentQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking. Wakes a parked waiter directly (preserving FIFO order,
    /// since a waiter only exists when `items` is empty) rather than
    /// enqueuing and waking separately.
    pub fn push(&self, item: T) {
        let mut state = self.state.lock().expect("intent queue poisoned");
        match std::mem::replace(&mut state.waiter, Waiter::None) {
            Waiter::Parked(tx) => {
                // Receiver may already be gone (e.g. the loop is
                // shutting down); dropping the item silently matches
                // "an unserved item at stop is discarded" (§3).
                let _ = tx.send(Ok(item));
            }
            Waiter::None => state.items.push_back(item),
        }
    }

    /// Returns the front item immediately if present, otherwise parks this
    /// caller until `push` or `cancel_wait` resolves it.
    pub async fn pop(&self) -> Result<T, DialogueError> {
        let rx = {
            let mut state = self.state.lock().expect("intent queue poisoned");
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            if matches!(state.waiter, Waiter::Parked(_)) {
                panic!("IntentQueue::pop called with a waiter already parked");
            }
            let (tx, rx) = oneshot::channel();
            state.waiter = Waiter::Parked(tx);
            rx
        };
        rx.await.unwrap_or(Err(DialogueError::Cancelled))
    }

    /// Wakes the parked waiter, if any, with `err` instead of an item. A
    /// no-op when nothing is parked.
    pub fn cancel_wait(&self, err: DialogueError) {
        let mut state = self.state.lock().expect("intent queue poisoned");
        if let Waiter::Parked(tx) = std::mem::replace(&mut state.waiter, Waiter::None) {
            let _ = tx.send(Err(err));
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state.lock().expect("intent queue poisoned").waiter, Waiter::Parked(_))
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("intent queue poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_returns_immediately_when_item_present() {
        let q: IntentQueue<i32> = IntentQueue::new();
        q.push(1);
        assert_eq!(q.pop().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let q: IntentQueue<i32> = IntentQueue::new();
        q.push(1);
        q.push(2);
        assert_eq!(q.pop().await.unwrap(), 1);
        assert_eq!(q.pop().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pop_parks_until_push() {
        use std::sync::Arc;
        let q: Arc<IntentQueue<i32>> = Arc::new(IntentQueue::new());
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.pop().await });
        // give the spawned task a chance to park
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(q.is_waiting());
        q.push(42);
        assert_eq!(handle.await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn cancel_wait_wakes_parked_pop_with_error() {
        use std::sync::Arc;
        let q: Arc<IntentQueue<i32>> = Arc::new(IntentQueue::new());
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.pop().await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        q.cancel_wait(DialogueError::Cancelled);
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DialogueError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_wait_is_noop_without_a_waiter() {
        let q: IntentQueue<i32> = IntentQueue::new();
        q.cancel_wait(DialogueError::Cancelled);
        q.push(1);
        assert_eq!(q.pop().await.unwrap(), 1);
    }

    #[test]
    #[should_panic(expected = "waiter already parked")]
    fn double_pop_without_executor_panics_on_second_waiter() {
        // Constructs the panic path directly: simulate a second parked
        // waiter by manipulating state, since a real double-`.await` needs
        // two tasks (covered by the concurrent test above in spirit).
        let q: IntentQueue<i32> = IntentQueue::new();
        {
            let mut state = q.state.lock().unwrap();
            let (tx, _rx) = oneshot::channel();
            state.waiter = Waiter::Parked(tx);
        }
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(q.pop()).ok();
    }
}
