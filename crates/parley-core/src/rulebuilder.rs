// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The guided rule builder (§4.4.6, `special:makerule`): category → device
//! → example → optional filter → run. `Back` and `More` are first-class
//! transitions at every level (§6); paging uses a deterministic block
//! size (`RuleBuilderConfig::page_size`, §4 C10).
use parley_model::{LoopCapabilities, ReplyMessage, ValueCategory};

use crate::program::ProgramAst;

type Handle = dyn LoopCapabilities + Send + Sync;

#[derive(Debug, Clone)]
pub struct ExampleEntry {
    pub label: String,
    pub function_name: String,
}

#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub name: String,
    pub examples: Vec<ExampleEntry>,
}

#[derive(Debug, Clone)]
pub struct CategoryEntry {
    pub name: String,
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleBuilderCatalog {
    pub categories: Vec<CategoryEntry>,
}

/// Page through `items` with `More…`/`Back` appended after the data
/// choices (§4.4's "Choice numbering" rule). Returns `Ok(None)` when the
/// user presses `Back` on the first page — the caller's cue to return to
/// the previous level without re-querying (§4.4).
async fn paged_pick(handle: &Handle, prompt: &str, items: &[String], page_size: usize) -> Result<Option<usize>, parley_model::DialogueError> {
    let mut page = 0usize;
    loop {
        let start = page * page_size;
        let end = (start + page_size).min(items.len());
        let mut choices: Vec<String> = items[start..end].to_vec();
        let has_more = end < items.len();
        if has_more {
            choices.push("More…".to_string());
        }
        choices.push("Back".to_string());

        let idx = handle.ask_choices(ReplyMessage::text(prompt), choices.clone()).await?;
        let back_idx = choices.len() - 1;
        let more_idx = if has_more { Some(choices.len() - 2) } else { None };

        if Some(idx) == more_idx {
            page += 1;
            continue;
        }
        if idx == back_idx {
            if page == 0 {
                return Ok(None);
            }
            page -= 1;
            continue;
        }
        return Ok(Some(start + idx));
    }
}

/// Drive the full builder to completion. Returns `Ok(None)` if the user
/// backs all the way out of the category list (abandons the builder);
/// otherwise the finished, not-yet-installed rule `ProgramAst` (the
/// caller installs it, matching the §8 scenario 3 end state of `... =>
/// notify`).
pub async fn run_rule_builder(
    handle: &Handle,
    catalog: &RuleBuilderCatalog,
    page_size: usize,
) -> Result<Option<ProgramAst>, parley_model::DialogueError> {
    'category: loop {
        let category_names: Vec<String> = catalog.categories.iter().map(|c| c.name.clone()).collect();
        let cat_idx = match paged_pick(handle, "Pick a category:", &category_names, page_size).await? {
            None => return Ok(None),
            Some(i) => i,
        };
        let category = &catalog.categories[cat_idx];

        loop {
            let device_names: Vec<String> = category.devices.iter().map(|d| d.name.clone()).collect();
            let dev_idx = match paged_pick(handle, &format!("Pick a device in {}:", category.name), &device_names, page_size).await? {
                None => continue 'category,
                Some(i) => i,
            };
            let device = &category.devices[dev_idx];

            loop {
                let example_labels: Vec<String> = device.examples.iter().map(|e| e.label.clone()).collect();
                let ex_idx = match paged_pick(handle, &format!("Pick a command for {}:", device.name), &example_labels, page_size).await? {
                    None => break,
                    Some(i) => i,
                };
                let example = &device.examples[ex_idx];

                let mut ast = ProgramAst::new(example.function_name.clone());
                ast.is_one_shot = false;

                let add_filter = handle.ask(ValueCategory::YesNo, ReplyMessage::text("Add a filter?")).await?;
                if add_filter.as_special() == Some("yes") {
                    for (path, operator, value) in handle.build_filter_list().await? {
                        ast.add_filter(crate::program::ProgramFilter { path, operator, value });
                    }
                }

                let run_it = handle
                    .ask(ValueCategory::YesNo, ReplyMessage::text(format!("Run it: {}?", ast.confirmation_prose())))
                    .await?;
                if run_it.as_special() == Some("yes") {
                    return Ok(Some(ast));
                }
                // "no" at confirm re-offers the example list at this device (§4.4.6 back semantics).
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_config::InMemoryPreferenceStore;
    use parley_model::UserInput;
    use parley_runtime::{ContextVarResolver, InMemoryContactProvider, PermissionStore, StaticLocationResolver};

    use super::*;
    use crate::delegate::Delegate;
    use crate::intent_queue::IntentQueue;
    use crate::primitives::LoopHandle;

    struct NullDelegate;
    #[async_trait::async_trait]
    impl Delegate for NullDelegate {
        async fn send(&self, _text: &str, _icon: Option<&str>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send_picture(&self, _url: &str, _icon: Option<&str>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send_rdl(&self, _t: &str, _w: &str, _icon: Option<&str>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send_button(&self, _title: &str, _json: serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send_link(&self, _title: &str, _url: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send_choice(&self, _index: usize, _title: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn send_ask_special(&self, _kind: parley_model::AskSpecialKind) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn sample_catalog() -> RuleBuilderCatalog {
        RuleBuilderCatalog {
            categories: vec![CategoryEntry {
                name: "comics".into(),
                devices: vec![DeviceEntry {
                    name: "xkcd".into(),
                    examples: vec![ExampleEntry { label: "get the latest comic".into(), function_name: "com.xkcd.get_comic".into() }],
                }],
            }],
        }
    }

    fn make_handle() -> (Arc<LoopHandle>, Arc<IntentQueue<UserInput>>) {
        let queue = Arc::new(IntentQueue::new());
        let handle = Arc::new(LoopHandle::new(
            queue.clone(),
            Arc::new(NullDelegate),
            Arc::new(InMemoryContactProvider::default()),
            Arc::new(StaticLocationResolver::default()),
            Arc::new(ContextVarResolver::new(Arc::new(InMemoryPreferenceStore::default()))),
            Arc::new(PermissionStore::new()),
        ));
        (handle, queue)
    }

    #[tokio::test]
    async fn builder_walks_category_device_example_and_confirms() {
        let (handle, queue) = make_handle();
        let catalog = sample_catalog();
        let builder = tokio::spawn({
            let handle = handle.clone();
            async move { run_rule_builder(handle.as_ref(), &catalog, 5).await }
        });

        // category choice 0 ("comics")
        queue.push(UserInput::parsed(vec!["bookkeeping", "choice"]).with_choice(0));
        // device choice 0 ("xkcd")
        queue.push(UserInput::parsed(vec!["bookkeeping", "choice"]).with_choice(0));
        // example choice 0
        queue.push(UserInput::parsed(vec!["bookkeeping", "choice"]).with_choice(0));
        // "add a filter?" -> no
        queue.push(UserInput::parsed(vec!["bookkeeping", "special", "special:no"]));
        // "run it?" -> yes
        queue.push(UserInput::parsed(vec!["bookkeeping", "special", "special:yes"]));

        let result = builder.await.unwrap().unwrap().unwrap();
        assert_eq!(result.function_name, "com.xkcd.get_comic");
        assert!(!result.is_one_shot);
    }

    #[tokio::test]
    async fn back_at_top_level_abandons_builder() {
        let (handle, queue) = make_handle();
        let catalog = sample_catalog();
        let builder = tokio::spawn({
            let handle = handle.clone();
            async move { run_rule_builder(handle.as_ref(), &catalog, 5).await }
        });
        queue.push(UserInput::parsed(vec!["bookkeeping", "choice"]).with_choice(1)); // "Back" is index 1 (after 1 category)
        let result = builder.await.unwrap().unwrap();
        assert!(result.is_none());
    }

    /// Attach a `choice` entity to a bookkeeping `["bookkeeping","choice"]`
    /// input so scripted test sequences read naturally.
    trait WithChoice {
        fn with_choice(self, index: usize) -> Self;
    }

    impl WithChoice for UserInput {
        fn with_choice(self, index: usize) -> Self {
            match self {
                UserInput::Parsed { code, mut entities, platform_data } => {
                    entities.insert("choice".to_string(), serde_json::json!(index));
                    UserInput::Parsed { code, entities, platform_data }
                }
                other => other,
            }
        }
    }
}
