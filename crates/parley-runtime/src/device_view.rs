// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The live "device view" driving dynamic skill handler attach/detach
//! (§4.5). A device's appearance or disappearance changes which handlers
//! are in scope for the session; this module models that collection as a
//! [`Shared`] list that a background discovery task can refresh.
use crate::shared::Shared;

/// Enough about a device to decide which dynamic skill handler backs it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub unique_id: String,
    pub kind: String,
    pub name: String,
}

/// Holds the current device set and lets a discovery task replace it
/// atomically; handler attach/detach logic (parley-skills) reads
/// `view.devices().get()` to decide which dynamic handlers should exist.
#[derive(Debug, Default)]
pub struct DeviceView {
    devices: Shared<DeviceDescriptor>,
}

impl DeviceView {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self { devices: Shared::new(devices) }
    }

    pub fn devices(&self) -> &Shared<DeviceDescriptor> {
        &self.devices
    }

    pub fn refresh(&self, devices: Vec<DeviceDescriptor>) {
        self.devices.set(devices);
    }
}
