// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Backing collaborator for `LoopCapabilities::lookup_contact` (§4.7). No
//! real address-book integration lives in this workspace; the in-memory
//! provider is sufficient to drive disambiguation flows end to end.
use async_trait::async_trait;
use parley_model::Contact;

#[async_trait]
pub trait ContactProvider: Send + Sync {
    /// Candidates whose display name fuzzily matches `name`, filtered to
    /// `category` (e.g. `"phone_number"`, `"email_address"`).
    async fn lookup(&self, category: &str, name: &str) -> Vec<Contact>;
}

#[derive(Debug, Default)]
pub struct InMemoryContactProvider {
    contacts: Vec<Contact>,
}

impl InMemoryContactProvider {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl ContactProvider for InMemoryContactProvider {
    async fn lookup(&self, category: &str, name: &str) -> Vec<Contact> {
        let needle = name.trim().to_lowercase();
        self.contacts
            .iter()
            .filter(|c| c.kind == category && c.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryContactProvider {
        InMemoryContactProvider::new(vec![
            Contact { display_name: "Alice Smith".into(), value: "+15551234".into(), kind: "phone_number".into() },
            Contact { display_name: "Alicia Keys".into(), value: "alicia@example.com".into(), kind: "email_address".into() },
        ])
    }

    #[tokio::test]
    async fn lookup_filters_by_category_and_name() {
        let provider = sample();
        let matches = provider.lookup("phone_number", "alic").await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].display_name, "Alice Smith");
    }

    #[tokio::test]
    async fn lookup_returns_empty_on_no_match() {
        let provider = sample();
        assert!(provider.lookup("phone_number", "zzz").await.is_empty());
    }
}
