// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
mod analysis;
mod dynamic;
mod errors;
mod handler;
mod input;
mod loop_caps;
mod message;
mod nlu;
mod queue_item;
mod value;

pub use analysis::{AnalysisType, CommandAnalysisResult};
pub use dynamic::{handler_entries, DynamicHandlerSource, HandlerEntry, SharedHandler};
pub use errors::DialogueError;
pub use handler::{Handler, ReplyResult};
pub use input::{PlatformData, UserInput};
pub use loop_caps::{Contact, Location, LoopCapabilities};
pub use message::{AskSpecialKind, ReplyMessage};
pub use nlu::{MockNlu, NlgClient, NluClient, NluParse};
pub use queue_item::QueueItem;
pub use value::ValueCategory;
