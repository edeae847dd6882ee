// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Command-line arguments for the `parley` shell binary (C11).
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "parley",
    about = "A multi-handler conversational dialogue agent",
    version,
    long_about = None
)]
pub struct Cli {
    /// Path to a YAML config file (overrides layered auto-discovery).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Path to a JSON file used to persist `SharedPreferences` across runs.
    /// Without this the session starts with an empty in-memory store.
    #[arg(long, short = 's')]
    pub state_file: Option<PathBuf>,

    /// Increase verbosity (-v = info, -vv = debug, -vvv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}
