// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
mod contacts;
mod context_vars;
mod device_view;
mod location;
mod permission_store;
mod shared;

pub use contacts::{ContactProvider, InMemoryContactProvider};
pub use context_vars::{preference_key_for, ContextVarResolver};
pub use device_view::{DeviceDescriptor, DeviceView};
pub use location::{LocationResolver, StaticLocationResolver};
pub use permission_store::{Decision, PermissionRule, PermissionStore, ProgramFilter};
pub use shared::Shared;
