// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The dialogue engine itself (§2 C1, C2, C4, C6-C9): the intent queues, the
//! handler arbiter, the formal-program handler and its pipeline, the
//! sub-dialogue primitives, the formatter, and the top-level `DialogueLoop`
//! that drives all of it. `Handler`, `LoopCapabilities`, and every other
//! type a handler implementation needs live in `parley-model` so that crate
//! stays free of this one.
mod arbiter;
mod delegate;
mod executor;
mod formal_handler;
mod formatter;
mod intent_queue;
mod loop_driver;
mod pipeline;
mod primitives;
mod program;
mod program_store;
mod remote;
mod rulebuilder;

pub use arbiter::{arbitrate, Decision, HandlerCandidate};
pub use delegate::{ask_special_kind_for, deliver_all, deliver_one, Delegate};
pub use executor::{ExecutionOutput, Executor, MockExecutor};
pub use formal_handler::FormalProgramHandler;
pub use formatter::{default_template_for, format_execution_output, interpolate};
pub use intent_queue::IntentQueue;
pub use loop_driver::DialogueLoop;
pub use pipeline::{confirm, disambiguate_devices, execute_and_format, fill_slots};
pub use primitives::{matches_category, LoopHandle};
pub use program::{DeviceCandidate, DeviceChoice, MockProgramParser, ProgramAst, ProgramFilter, ProgramParser};
pub use program_store::{InstalledProgram, ProgramStore};
pub use remote::{split_remote_program, RemoteSplit};
pub use rulebuilder::{run_rule_builder, CategoryEntry, DeviceEntry, ExampleEntry, RuleBuilderCatalog};

pub use parley_model::QueueItem;
