// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Built-in dialogue handlers (§4.5) plus the registry that attaches and
//! detaches the dynamic ones as devices come and go.
mod faq;
mod registry;

pub use faq::{FaqEntry, FaqHandler};
pub use registry::{HandlerFactory, SkillRegistry};
