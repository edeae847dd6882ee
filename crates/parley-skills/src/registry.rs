// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The dynamic handler registry (§4.5): attaches a handler for every
//! currently-known `org.thingpedia.dialogue-handler` device and detaches it
//! again once the device view stops reporting that device. Implements
//! `parley_model::DynamicHandlerSource` so `parley-core`'s `DialogueLoop`
//! can poll it without depending on this crate.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_model::{DynamicHandlerSource, Handler, HandlerEntry, SharedHandler};
use parley_runtime::{DeviceDescriptor, DeviceView};

const DIALOGUE_HANDLER_KIND: &str = "org.thingpedia.dialogue-handler";

/// Builds the `Handler` a device of this kind should run behind. Boxed so
/// the registry doesn't need a generic parameter per skill type.
pub type HandlerFactory = dyn Fn(&DeviceDescriptor) -> Box<dyn Handler> + Send + Sync;

/// Tracks one live `SharedHandler` per attached device, resynchronized
/// against a `DeviceView` snapshot each time the loop asks for the current
/// set (§5 — polled once per arbitration round, no separate event source).
pub struct SkillRegistry {
    devices: Arc<DeviceView>,
    factory: Arc<HandlerFactory>,
    attached: Mutex<HashMap<String, SharedHandler>>,
}

impl SkillRegistry {
    pub fn new(devices: Arc<DeviceView>, factory: Arc<HandlerFactory>) -> Self {
        Self { devices, factory, attached: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl DynamicHandlerSource for SkillRegistry {
    async fn current_handlers(&self) -> Vec<HandlerEntry> {
        let snapshot = self.devices.devices().get();
        let live: Vec<&DeviceDescriptor> = snapshot.iter().filter(|d| d.kind == DIALOGUE_HANDLER_KIND).collect();

        let mut attached = self.attached.lock().await;
        let live_ids: std::collections::HashSet<&str> = live.iter().map(|d| d.unique_id.as_str()).collect();
        attached.retain(|id, _| live_ids.contains(id.as_str()));

        for device in &live {
            attached
                .entry(device.unique_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new((self.factory)(device))));
        }

        attached.iter().map(|(id, handler)| (id.clone(), handler.clone())).collect()
    }
}
