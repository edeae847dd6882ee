// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Thread-safe, live-refreshable ordered list, used to hold the set of
//! attached dynamic skill handlers (§4.5) so that a device-view change can
//! replace the whole collection without the dialogue loop task restarting
//! or holding a lock across an `.await`.

use std::sync::{Arc, RwLock};

pub struct Shared<T: Send + Sync + 'static>(Arc<RwLock<Arc<[T]>>>);

impl<T: Send + Sync + 'static> Shared<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self(Arc::new(RwLock::new(items.into_boxed_slice().into())))
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Cheap snapshot, valid until the next `set` call.
    #[must_use]
    pub fn get(&self) -> Arc<[T]> {
        self.0.read().expect("Shared lock poisoned").clone()
    }

    pub fn set(&self, items: Vec<T>) {
        let new: Arc<[T]> = items.into_boxed_slice().into();
        *self.0.write().expect("Shared lock poisoned") = new;
    }
}

impl<T: Send + Sync + 'static> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.0.read().map(|g| g.len()).unwrap_or(0);
        write!(f, "Shared({len} items)")
    }
}

impl<T: Send + Sync + 'static> Default for Shared<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_snapshot_without_invalidating_old_one() {
        let shared = Shared::new(vec![1, 2, 3]);
        let old = shared.get();
        shared.set(vec![4, 5]);
        assert_eq!(&*old, &[1, 2, 3]);
        assert_eq!(&*shared.get(), &[4, 5]);
    }

    #[test]
    fn empty_starts_with_no_items() {
        let shared: Shared<i32> = Shared::empty();
        assert!(shared.get().is_empty());
    }
}
